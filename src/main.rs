mod ai;
mod app;
mod cli;
mod config;
mod error;
mod git;
mod output;

use clap::Parser;

use app::App;
use cli::Cli;
use error::AppError;

fn main() {
    let cli = Cli::parse();

    let app = match App::new(&cli) {
        Ok(app) => app,
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run(&cli) {
        // Gitリポジトリでない場合はメッセージだけ表示して正常終了
        if matches!(e, AppError::NotGitRepository) {
            output::error(&e.to_string());
            std::process::exit(0);
        }
        output::error(&format!("Critical Failure: {}", e));
        std::process::exit(1);
    }
}
