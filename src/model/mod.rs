mod repo;
mod summary;
mod token;

pub use repo::{CommitId, RepositoryDescriptor};
pub use summary::{RepoOutcome, RunSummary, ScanStatus};
pub use token::Token;
