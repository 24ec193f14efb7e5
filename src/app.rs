use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::ai::{AiService, CommitSuggestion, ReplyInterpreter};
use crate::cli::Cli;
use crate::config::Config;
use crate::error::AppError;
use crate::git::{Baseline, ExclusionSpec, GitService};
use crate::output;

/// APIキーを読む環境変数
const API_KEY_ENV: &str = "GROQ_API_KEY";

/// アプリケーションのメインオーケストレーター
pub struct App {
    git: GitService,
    ai: AiService,
    extra_excludes: Vec<String>,
    enrich_short_titles: bool,
    min_description_len: usize,
    verbose: bool,
}

impl App {
    /// 新しいAppインスタンスを作成
    ///
    /// APIキーの確認はリポジトリやネットワークに触れる前に行う。
    pub fn new(cli: &Cli) -> Result<Self, AppError> {
        // .env があれば読み込む（既存の環境変数は上書きしない）
        if let Some(warning) = Self::dotenv_warning(dotenvy::from_path(".env")) {
            output::warn(&warning);
        }
        let api_key = Self::require_api_key(std::env::var(API_KEY_ENV).ok())?;

        let config = Config::load()?;
        let mut ai = AiService::from_config(&config, api_key)?;

        // CLIで応答形式が指定されていれば上書き
        if let Some(format) = cli.format {
            ai.set_format(format);
        }

        Ok(Self {
            git: GitService::new(),
            ai,
            extra_excludes: config.extra_excludes,
            enrich_short_titles: config.enrich_short_titles,
            min_description_len: config.min_description_len,
            verbose: cli.verbose,
        })
    }

    /// .env の読み込み結果を警告文に変換。ファイルがないだけなら何も出さない
    fn dotenv_warning(result: Result<(), dotenvy::Error>) -> Option<String> {
        match result {
            Ok(()) => None,
            Err(dotenvy::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => Some(format!("Failed to load .env: {}", e)),
        }
    }

    /// 空でないAPIキーを要求
    fn require_api_key(value: Option<String>) -> Result<String, AppError> {
        value
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(AppError::MissingApiKey)
    }

    fn debug(&self, msg: &str) {
        if self.verbose {
            output::debug(msg);
        }
    }

    /// メインワークフローを実行
    pub fn run(&self, cli: &Cli) -> Result<(), AppError> {
        self.git.verify_repository()?;
        self.debug("Git repository verified.");

        output::info("Analyzing modified files...");
        self.git.mark_intent_to_add()?;

        let mut spec = ExclusionSpec::resolve(self.git.repo_path());
        spec.extend(&self.extra_excludes);
        self.debug(&format!(
            "{} exclusion patterns resolved.",
            spec.patterns().len()
        ));

        let diff = self.git.get_diff(&spec)?;
        if diff.is_empty() {
            output::success("No changes detected.");
            return Ok(());
        }

        let baseline = match diff.baseline {
            Baseline::Head => "HEAD",
            Baseline::EmptyTree => "empty tree",
        };
        self.debug(&format!(
            "Diff generated against {} ({} chars{}).",
            baseline,
            diff.text.chars().count(),
            if diff.truncated { ", truncated" } else { "" }
        ));

        output::ai(&format!(
            "Generating commit suggestion with {}...",
            self.ai.model()
        ));
        let reply = self.ai.generate(&diff.text)?;

        if self.verbose {
            println!();
            println!("{}", "--- RAW AI RESPONSE ---".dimmed());
            println!("{}", reply.dimmed());
            println!("{}", "-----------------------".dimmed());
            println!();
        }

        let interpreter = ReplyInterpreter::detect(&reply);
        self.debug(&format!("Interpreting reply as {}.", interpreter.name()));

        let mut suggestion = interpreter.interpret(&reply);
        if self.enrich_short_titles {
            suggestion = suggestion.enrich(self.min_description_len);
        }

        output::framed("AI SUGGESTION", &Self::format_suggestion(&suggestion));

        if !cli.commit {
            output::info("Run with '-c' to perform the actual commit.");
            return Ok(());
        }

        if !(cli.auto_confirm || self.confirm_commit()?) {
            output::warn("Commit aborted.");
            return Ok(());
        }

        self.git.stage_all()?;
        self.git.commit(&suggestion.title, &suggestion.report)?;
        output::success(&format!(
            "Changes committed: {}",
            suggestion.title.dimmed()
        ));

        Ok(())
    }

    /// 提案の表示用テキスト
    fn format_suggestion(suggestion: &CommitSuggestion) -> String {
        format!(
            "{}\n{}\n\n{} {}",
            "REPORT:".white().bold(),
            suggestion.report,
            "COMMIT_MESSAGE:".white().bold(),
            suggestion.title
        )
    }

    /// コミット確認プロンプトを表示（stdinのロックはこの関数の中だけで保持）
    fn confirm_commit(&self) -> Result<bool, AppError> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stdout();
        Self::confirm_prompt(&mut input, &mut out, "Use this commit message? (y/n): ")
    }

    /// 1行読み、`y` のときだけ true
    fn confirm_prompt<R: BufRead, W: Write>(
        input: &mut R,
        out: &mut W,
        prompt: &str,
    ) -> Result<bool, AppError> {
        write!(out, "{}", output::prompt_label(prompt))
            .and_then(|_| out.flush())
            .map_err(|e| AppError::PromptError(e.to_string()))?;

        let mut answer = String::new();
        input
            .read_line(&mut answer)
            .map_err(|e| AppError::PromptError(e.to_string()))?;

        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }
}
