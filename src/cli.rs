use clap::{ArgAction, Parser};

use crate::config::ReplyFormat;

/// AIを使ったGit差分の解析と自動コミットツール
#[derive(Parser, Debug)]
#[command(name = "commit-ai")]
#[command(about = "AI-powered git analysis and auto-committer")]
#[command(version, disable_version_flag = true)]
pub struct Cli {
    /// コミットモードを有効化（提案されたメッセージでコミット）
    #[arg(short = 'c', long = "commit")]
    pub commit: bool,

    /// 確認プロンプトをスキップ
    #[arg(short = 'y', long = "yes")]
    pub auto_confirm: bool,

    /// AIの応答形式（設定ファイルを上書き）
    #[arg(long = "format", value_enum)]
    pub format: Option<ReplyFormat>,

    /// デバッグ出力を表示
    #[arg(long = "verbose")]
    pub verbose: bool,

    /// バージョンを表示
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,
}
