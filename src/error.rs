use thiserror::Error;

/// アプリケーションエラーの種類
#[derive(Debug, Error)]
pub enum AppError {
    #[error("GROQ_API_KEY is missing.")]
    MissingApiKey,

    #[error("Not a Git repository.")]
    NotGitRepository,

    #[error("Git command failed: {0}")]
    GitError(String),

    #[error("Failed to compute diff: {0}")]
    DiffFailed(String),

    #[error("AI request failed: {0}")]
    AiRequestError(String),

    #[error("Failed to stage changes, nothing was committed: {0}")]
    StageFailed(String),

    #[error("Changes were staged but the commit failed: {0}")]
    CommitFailed(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Failed to read confirmation: {0}")]
    PromptError(String),
}
