use std::fs;
use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// 常に差分から除外する生成物
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "package-lock.json",
    "bun.lockb",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "node_modules",
    "dist",
    "target",
    "*.log",
];

/// 作業ディレクトリ直下から読み込むignoreファイル
pub const IGNORE_FILE: &str = ".gitignore";

/// git pathspec の除外マジック
const EXCLUDE_MAGIC: &str = ":(exclude)";

/// 差分から除外するパターンの集合（重複なし）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionSpec {
    patterns: Vec<String>,
}

impl ExclusionSpec {
    /// デフォルトの除外パターンのみを持つ集合
    pub fn defaults() -> Self {
        let mut spec = Self {
            patterns: Vec::with_capacity(DEFAULT_EXCLUDES.len()),
        };
        spec.extend(DEFAULT_EXCLUDES.iter().copied());
        spec
    }

    /// デフォルトと `dir/.gitignore` の内容を合わせた集合を構築
    ///
    /// ignoreファイルが読めない場合（存在しない、権限がない等）はデフォルトのみを返す。
    pub fn resolve(dir: &Path) -> Self {
        let mut spec = Self::defaults();
        if let Ok(content) = fs::read_to_string(dir.join(IGNORE_FILE)) {
            spec.extend(content.lines());
        }
        spec
    }

    /// パターンを追加する。前後の空白を除去し、空行と `#` で始まるコメント行は捨てる
    pub fn extend<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() || pattern.starts_with('#') {
                continue;
            }
            if !self.contains(pattern) {
                self.patterns.push(pattern.to_string());
            }
        }
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.patterns.iter().any(|p| p == pattern)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// `git diff` に渡す除外pathspecに変換
    ///
    /// 否定パターン（`!`）は除外として表現できないため出力しない。
    /// 先頭の `/` は絶対パスと解釈されないよう取り除く。
    pub fn to_pathspecs(&self) -> Vec<String> {
        self.patterns
            .iter()
            .filter(|p| !p.starts_with('!'))
            .map(|p| p.trim_start_matches('/'))
            .filter(|p| !p.is_empty())
            .map(|p| format!("{}{}", EXCLUDE_MAGIC, p))
            .collect()
    }

    /// gitignore と同じ意味論のマッチャーを構築
    ///
    /// pathspec では拾えないネストしたパス（`packages/app/yarn.lock` など）の除外に使う。
    /// 不正なglobは無視する。
    pub fn matcher(&self, root: &Path) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in &self.patterns {
            // 不正な行はスキップ
            let _ = builder.add_line(None, pattern);
        }
        builder.build().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    fn default_patterns() -> Vec<String> {
        DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_defaults_contains_all_default_patterns() {
        let spec = ExclusionSpec::defaults();
        assert_eq!(spec.patterns(), default_patterns().as_slice());
    }

    #[test]
    fn test_resolve_without_ignore_file() {
        let dir = TempDir::new().unwrap();
        let spec = ExclusionSpec::resolve(dir.path());
        assert_eq!(spec, ExclusionSpec::defaults());
    }

    #[test]
    fn test_resolve_with_ignore_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(IGNORE_FILE),
            "# build output\n\n  coverage  \n*.tmp\r\n\n# trailing comment\n",
        )
        .unwrap();

        let spec = ExclusionSpec::resolve(dir.path());

        assert_eq!(spec.patterns().len(), DEFAULT_EXCLUDES.len() + 2);
        assert!(spec.contains("coverage"));
        assert!(spec.contains("*.tmp"));
        assert!(!spec.patterns().iter().any(|p| p.starts_with('#')));
        assert!(!spec.patterns().iter().any(|p| p.is_empty()));
    }

    #[test]
    fn test_resolve_collapses_duplicates_with_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(IGNORE_FILE),
            "node_modules\ndist\n*.log\nnode_modules\n",
        )
        .unwrap();

        let spec = ExclusionSpec::resolve(dir.path());

        assert_eq!(spec, ExclusionSpec::defaults());
    }

    #[test]
    fn test_resolve_unreadable_ignore_path_falls_back() {
        // ディレクトリは文字列として読めないので失敗扱い
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(IGNORE_FILE)).unwrap();

        let spec = ExclusionSpec::resolve(dir.path());

        assert_eq!(spec, ExclusionSpec::defaults());
    }

    #[rstest]
    #[case("")]
    #[case("# only a comment")]
    #[case("foo\nbar\n# c\nfoo")]
    #[case("target/\n/build\n!keep.log\n")]
    fn test_resolve_is_superset_of_defaults(#[case] content: &str) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(IGNORE_FILE), content).unwrap();

        let spec = ExclusionSpec::resolve(dir.path());

        for pattern in DEFAULT_EXCLUDES {
            assert!(spec.contains(pattern), "missing default {}", pattern);
        }
        let mut unique = spec.patterns().to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), spec.patterns().len());
    }

    #[test]
    fn test_to_pathspecs_uses_exclude_magic() {
        let spec = ExclusionSpec::defaults();
        let pathspecs = spec.to_pathspecs();

        assert_eq!(pathspecs.len(), DEFAULT_EXCLUDES.len());
        assert!(pathspecs.contains(&":(exclude)package-lock.json".to_string()));
        assert!(pathspecs.contains(&":(exclude)*.log".to_string()));
        assert!(pathspecs.iter().all(|p| p.starts_with(":(exclude)")));
    }

    #[test]
    fn test_to_pathspecs_strips_root_anchor_and_skips_negation() {
        let mut spec = ExclusionSpec::defaults();
        spec.extend(["/build", "!important.log", "/"]);

        let pathspecs = spec.to_pathspecs();

        assert!(pathspecs.contains(&":(exclude)build".to_string()));
        assert!(!pathspecs.iter().any(|p| p.contains('!')));
        assert!(!pathspecs.iter().any(|p| p == ":(exclude)"));
        // 否定パターン自体は集合に残る
        assert!(spec.contains("!important.log"));
    }

    #[test]
    fn test_extend_trims_and_filters() {
        let mut spec = ExclusionSpec::defaults();
        spec.extend(["  *.snap ", "", "   ", "# comment", "*.snap"]);

        assert_eq!(spec.patterns().len(), DEFAULT_EXCLUDES.len() + 1);
        assert!(spec.contains("*.snap"));
    }

    #[rstest]
    #[case("package-lock.json", true)]
    #[case("packages/app/package-lock.json", true)]
    #[case("node_modules/react/index.js", true)]
    #[case("logs/server.log", true)]
    #[case("src/main.rs", false)]
    #[case("docs/dist.md", false)]
    fn test_matcher_gitignore_semantics(#[case] path: &str, #[case] ignored: bool) {
        let dir = TempDir::new().unwrap();
        let matcher = ExclusionSpec::defaults().matcher(dir.path()).unwrap();

        assert_eq!(
            matcher.matched_path_or_any_parents(path, false).is_ignore(),
            ignored,
            "path: {}",
            path
        );
    }
}
