use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// AIに要求する応答の形式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReplyFormat {
    /// REPORT / COMMIT_MESSAGE / COMMIT_BODY のラベル付きテキスト
    #[default]
    Text,
    /// report / title / body を持つJSONオブジェクト
    Json,
}

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 使用するモデル名
    #[serde(default = "default_model")]
    pub model: String,
    /// chat completions エンドポイント
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// サンプリング温度
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// 応答形式
    #[serde(default)]
    pub reply_format: ReplyFormat,
    /// JSON応答時の最大トークン数
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// HTTPリクエストのタイムアウト（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 短いタイトルを本文の抜粋で補うかどうか
    #[serde(default = "default_enrich_short_titles")]
    pub enrich_short_titles: bool,
    /// 補完を行う説明部分の最小文字数
    #[serde(default = "default_min_description_len")]
    pub min_description_len: usize,
    /// 追加の除外パターン
    #[serde(default)]
    pub extra_excludes: Vec<String>,
}

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_api_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_enrich_short_titles() -> bool {
    true
}

fn default_min_description_len() -> usize {
    15
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_url: default_api_url(),
            temperature: default_temperature(),
            reply_format: ReplyFormat::default(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            enrich_short_titles: default_enrich_short_titles(),
            min_description_len: default_min_description_len(),
            extra_excludes: Vec::new(),
        }
    }
}

impl Config {
    /// グローバル設定ファイルのパスを取得（~/.commit-ai）
    pub fn global_config_path() -> Result<PathBuf, AppError> {
        dirs::home_dir()
            .map(|home| home.join(".commit-ai"))
            .ok_or_else(|| AppError::ConfigError("Could not find home directory".to_string()))
    }

    /// プロジェクト設定ファイルのパスを取得（Git root の .commit-ai）
    pub fn project_config_path() -> Option<PathBuf> {
        use std::process::Command;

        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let path = PathBuf::from(root).join(".commit-ai");
        path.exists().then_some(path)
    }

    /// 設定ファイルを読み込む。構文エラーの場合は警告を出してスキップ
    fn load_file(path: &Path, label: &str) -> Result<Option<Self>, AppError> {
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::ConfigError(format!("Failed to read {} config: {}", label, e)))?;

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                crate::output::warn(&format!(
                    "Syntax error in {} config ({}): {}",
                    label,
                    path.display(),
                    e
                ));
                Ok(None)
            }
        }
    }

    /// 2つの設定をマージ（other が優先）
    pub fn merge_with(&mut self, other: Self) {
        let defaults = Config::default();

        if other.model != defaults.model {
            self.model = other.model;
        }
        if other.api_url != defaults.api_url {
            self.api_url = other.api_url;
        }
        if other.temperature != defaults.temperature {
            self.temperature = other.temperature;
        }
        if other.reply_format != defaults.reply_format {
            self.reply_format = other.reply_format;
        }
        if other.max_tokens != defaults.max_tokens {
            self.max_tokens = other.max_tokens;
        }
        if other.timeout_secs != defaults.timeout_secs {
            self.timeout_secs = other.timeout_secs;
        }
        if other.enrich_short_titles != defaults.enrich_short_titles {
            self.enrich_short_titles = other.enrich_short_titles;
        }
        if other.min_description_len != defaults.min_description_len {
            self.min_description_len = other.min_description_len;
        }

        // 除外パターンは置換ではなく和集合
        for pattern in other.extra_excludes {
            if !self.extra_excludes.contains(&pattern) {
                self.extra_excludes.push(pattern);
            }
        }
    }

    /// 階層的に設定を読み込む（グローバル → プロジェクトでマージ）
    pub fn load() -> Result<Self, AppError> {
        let global_path = Self::global_config_path()?;

        let mut config = if global_path.exists() {
            Self::load_file(&global_path, "global")?.unwrap_or_default()
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        if let Some(project_path) = Self::project_config_path() {
            if let Some(project_config) = Self::load_file(&project_path, "project")? {
                config.merge_with(project_config);
            }
        }

        Ok(config)
    }

    /// 設定をファイルに保存
    pub fn save(&self) -> Result<(), AppError> {
        let path = Self::global_config_path()?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(&path, content)
            .map_err(|e| AppError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}

/// テスト用ヘルパー関数
#[cfg(test)]
impl Config {
    /// 文字列から設定を読み込み（テスト用）
    pub fn from_str(content: &str) -> Result<Self, AppError> {
        toml::from_str(content)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse config: {}", e)))
    }
}
