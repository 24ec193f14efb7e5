mod exclude;
mod service;

pub use exclude::ExclusionSpec;
pub use service::{Baseline, GitService};
