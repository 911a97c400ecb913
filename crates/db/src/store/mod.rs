use async_trait::async_trait;
use thiserror::Error;

use expensebot_core::domain::request::{DraftRequest, ExpenseRequest};

pub mod memory;
pub mod request;

pub use memory::InMemoryRequestStore;
pub use request::SqlRequestStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only log of submitted expense requests. The store assigns id,
/// status (`Pending`) and submission timestamp at append time; it carries no
/// uniqueness constraint on content, so identical drafts append as
/// independent rows.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn append(&self, draft: &DraftRequest) -> Result<ExpenseRequest, RepositoryError>;

    /// All submitted requests, most recent first. Display-only; the dialogue
    /// never reads it.
    async fn list_all(&self) -> Result<Vec<ExpenseRequest>, RepositoryError>;
}
