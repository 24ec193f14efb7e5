mod reply;
mod service;

pub use reply::{CommitSuggestion, ReplyInterpreter};
pub use service::AiService;
