use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use expensebot_core::chrono::Utc;
use expensebot_core::domain::request::{DraftRequest, ExpenseRequest, RequestId, RequestStatus};

use super::{RepositoryError, RequestStore};

/// In-memory store double for tests and offline development. The failure
/// toggle exercises the persistence-failure path of the dialogue surfaces.
#[derive(Default)]
pub struct InMemoryRequestStore {
    rows: Mutex<Vec<ExpenseRequest>>,
    fail_appends: AtomicBool,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn append(&self, draft: &DraftRequest) -> Result<ExpenseRequest, RepositoryError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("request store is unavailable".to_string()));
        }

        let mut rows = self
            .rows
            .lock()
            .map_err(|_| RepositoryError::Unavailable("request store lock is poisoned".to_string()))?;

        let request = ExpenseRequest {
            id: RequestId(format!("req-mem-{}", rows.len() + 1)),
            project_name: draft.project_name.clone(),
            project_number: draft.project_number.clone(),
            amount: draft.amount,
            currency: draft.currency,
            reason: draft.reason.clone(),
            submitted_at: Utc::now(),
            status: RequestStatus::Pending,
        };
        rows.push(request.clone());
        Ok(request)
    }

    async fn list_all(&self) -> Result<Vec<ExpenseRequest>, RepositoryError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| RepositoryError::Unavailable("request store lock is poisoned".to_string()))?;

        // Rows append in submission order; reversing yields most recent first.
        Ok(rows.iter().rev().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use expensebot_core::domain::request::DraftRequest;

    use super::InMemoryRequestStore;
    use crate::store::RequestStore;

    #[tokio::test]
    async fn appends_are_listed_most_recent_first() {
        let store = InMemoryRequestStore::new();
        let mut draft = DraftRequest { reason: Some("first".to_string()), ..Default::default() };
        store.append(&draft).await.expect("first append");

        draft.reason = Some("second".to_string());
        store.append(&draft).await.expect("second append");

        let listed = store.list_all().await.expect("list");
        assert_eq!(listed[0].reason.as_deref(), Some("second"));
        assert_eq!(listed[1].reason.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn failure_toggle_rejects_appends_without_dropping_rows() {
        let store = InMemoryRequestStore::new();
        store.append(&DraftRequest::default()).await.expect("append");

        store.set_fail_appends(true);
        let error = store.append(&DraftRequest::default()).await.expect_err("toggled failure");
        assert!(matches!(error, crate::RepositoryError::Unavailable(_)));

        store.set_fail_appends(false);
        assert_eq!(store.list_all().await.expect("list").len(), 1);
    }
}
