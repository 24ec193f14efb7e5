use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use ignore::gitignore::Gitignore;

use crate::error::AppError;
use crate::git::ExclusionSpec;

/// 差分の最大文字数
pub const MAX_DIFF_CHARS: usize = 5000;

/// 切り詰めた差分の末尾に付けるマーカー
pub const TRUNCATION_MARKER: &str = "\n\n...[TRUNCATED]...";

/// 空ツリーのオブジェクトID（コミットがまだないリポジトリの比較元）
pub const EMPTY_TREE_HASH: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// 差分の比較元
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    /// 最新のコミット
    Head,
    /// 空ツリー
    EmptyTree,
}

impl Baseline {
    fn revision(&self) -> &'static str {
        match self {
            Baseline::Head => "HEAD",
            Baseline::EmptyTree => EMPTY_TREE_HASH,
        }
    }
}

/// 除外と切り詰めを適用済みの差分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub text: String,
    pub baseline: Baseline,
    pub truncated: bool,
}

impl DiffResult {
    /// 差分がない（空白のみも含む）かどうか
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Git操作サービス
pub struct GitService {
    repo_path: PathBuf,
}

impl GitService {
    /// 現在のディレクトリに対するGitServiceを作成
    pub fn new() -> Self {
        Self::at(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// 指定したディレクトリに対するGitServiceを作成
    pub fn at(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// gitコマンドを実行（起動失敗のみエラー）
    fn git(&self, args: &[&str]) -> Result<Output, AppError> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| AppError::GitError(e.to_string()))
    }

    fn stderr_of(output: &Output) -> String {
        String::from_utf8_lossy(&output.stderr).trim().to_string()
    }

    /// 現在のディレクトリがGitリポジトリであることを確認
    pub fn verify_repository(&self) -> Result<(), AppError> {
        if self.repo_path.join(".git").exists() {
            return Ok(());
        }

        // Gitリポジトリのサブディレクトリにいる場合もチェック
        let output = self.git(&["rev-parse", "--git-dir"])?;
        if output.status.success() {
            Ok(())
        } else {
            Err(AppError::NotGitRepository)
        }
    }

    /// 未追跡ファイルを intent-to-add としてマーク（差分に新規ファイルを含めるため）
    pub fn mark_intent_to_add(&self) -> Result<(), AppError> {
        let output = self.git(&["add", "--intent-to-add", "."])?;
        if !output.status.success() {
            return Err(AppError::GitError(Self::stderr_of(&output)));
        }
        Ok(())
    }

    /// 指定した比較元と作業ツリーの差分を取得
    fn diff_against(&self, baseline: Baseline, pathspecs: &[String]) -> Result<String, AppError> {
        let mut args = vec![
            "diff",
            "--no-color",
            "--no-ext-diff",
            baseline.revision(),
            "--",
            ".",
        ];
        args.extend(pathspecs.iter().map(String::as_str));

        let output = self.git(&args)?;
        if !output.status.success() {
            return Err(AppError::DiffFailed(Self::stderr_of(&output)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// 除外パターンを適用した差分を取得
    ///
    /// HEAD との比較に失敗した場合（コミットがまだない等）は空ツリーと比較する。
    pub fn get_diff(&self, spec: &ExclusionSpec) -> Result<DiffResult, AppError> {
        let pathspecs = spec.to_pathspecs();

        let (raw, baseline) = match self.diff_against(Baseline::Head, &pathspecs) {
            Ok(diff) => (diff, Baseline::Head),
            Err(_) => (
                self.diff_against(Baseline::EmptyTree, &pathspecs)?,
                Baseline::EmptyTree,
            ),
        };

        let filtered = match spec.matcher(&self.repo_path) {
            Some(matcher) => Self::filter_excluded_files(&raw, &matcher),
            None => raw,
        };

        let truncated = filtered.chars().count() > MAX_DIFF_CHARS;
        Ok(DiffResult {
            text: Self::truncate_diff(&filtered),
            baseline,
            truncated,
        })
    }

    /// diffから除外パターンにマッチするファイルのブロックを取り除く
    fn filter_excluded_files(diff_text: &str, matcher: &Gitignore) -> String {
        let mut filtered = String::with_capacity(diff_text.len());
        let mut skipping = false;

        for line in diff_text.split_inclusive('\n') {
            if line.starts_with("diff --git") {
                skipping = Self::extract_file_path_from_diff_header(line)
                    .map(|p| matcher.matched_path_or_any_parents(p, false).is_ignore())
                    .unwrap_or(false);
            }
            if !skipping {
                filtered.push_str(line);
            }
        }

        filtered
    }

    /// diffヘッダーからファイルパスを抽出
    fn extract_file_path_from_diff_header(header: &str) -> Option<&str> {
        // "diff --git a/path/to/file b/path/to/file" から "path/to/file" を抽出
        let parts: Vec<&str> = header.split_whitespace().collect();
        if parts.len() >= 4 {
            return parts[2].strip_prefix("a/");
        }
        None
    }

    /// diffを最大文字数で切り詰めてマーカーを付ける（行の途中でも切る）
    pub fn truncate_diff(diff: &str) -> String {
        match diff.char_indices().nth(MAX_DIFF_CHARS) {
            Some((cut, _)) => format!("{}{}", &diff[..cut], TRUNCATION_MARKER),
            None => diff.to_string(),
        }
    }

    /// カレントディレクトリ以下の全ての変更をステージング
    pub fn stage_all(&self) -> Result<(), AppError> {
        let output = self
            .git(&["add", "-A", "."])
            .map_err(|e| AppError::StageFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(AppError::StageFailed(Self::stderr_of(&output)));
        }

        Ok(())
    }

    /// タイトルと本文でコミットを作成
    pub fn commit(&self, title: &str, body: &str) -> Result<(), AppError> {
        let mut args = vec!["commit", "-m", title];
        if !body.trim().is_empty() {
            args.extend(["-m", body]);
        }

        let output = self
            .git(&args)
            .map_err(|e| AppError::CommitFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = Self::stderr_of(&output);
            let reason = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            return Err(AppError::CommitFailed(reason));
        }

        Ok(())
    }
}

impl Default for GitService {
    fn default() -> Self {
        Self::new()
    }
}
