pub mod booking;
pub mod identity;
pub mod ledger;
pub mod notify;
pub mod repository;

/// Fallible repository/collaborator plumbing result.
pub type RepoResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
