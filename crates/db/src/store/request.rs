use async_trait::async_trait;
use expensebot_core::chrono::{DateTime, Utc};
use expensebot_core::domain::request::{
    Currency, DraftRequest, ExpenseRequest, RequestId, RequestStatus,
};
use expensebot_core::rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use expensebot_core::rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use super::{RepositoryError, RequestStore};
use crate::DbPool;

/// SQLite-backed request store.
pub struct SqlRequestStore {
    pool: DbPool,
}

impl SqlRequestStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for SqlRequestStore {
    async fn append(&self, draft: &DraftRequest) -> Result<ExpenseRequest, RepositoryError> {
        let id = RequestId(format!("req-{}", uuid::Uuid::new_v4()));
        let submitted_at = Utc::now();
        let status = RequestStatus::Pending;

        sqlx::query(
            r#"
            INSERT INTO requests (
                id, project_name, project_number, amount, currency, reason,
                submitted_at, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id.0)
        .bind(draft.project_name.as_deref())
        .bind(draft.project_number.as_deref())
        .bind(draft.amount.and_then(|amount| amount.to_f64()))
        .bind(draft.currency.map(|currency| currency.as_str()))
        .bind(draft.reason.as_deref())
        .bind(submitted_at)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(ExpenseRequest {
            id,
            project_name: draft.project_name.clone(),
            project_number: draft.project_number.clone(),
            amount: draft.amount,
            currency: draft.currency,
            reason: draft.reason.clone(),
            submitted_at,
            status,
        })
    }

    async fn list_all(&self) -> Result<Vec<ExpenseRequest>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, project_name, project_number, amount, currency, reason,
                   submitted_at, status
            FROM requests
            ORDER BY submitted_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_request).collect()
    }
}

fn decode_request(row: SqliteRow) -> Result<ExpenseRequest, RepositoryError> {
    let amount = row
        .try_get::<Option<f64>, _>("amount")?
        .map(|value| {
            Decimal::from_f64(value).ok_or_else(|| {
                RepositoryError::Decode(format!("stored amount `{value}` is not a valid decimal"))
            })
        })
        .transpose()?;

    let currency = row
        .try_get::<Option<String>, _>("currency")?
        .map(|value| {
            Currency::from_token(&value).ok_or_else(|| {
                RepositoryError::Decode(format!("stored currency `{value}` is not recognized"))
            })
        })
        .transpose()?;

    let status_text = row.try_get::<String, _>("status")?;
    let status = RequestStatus::parse_str(&status_text)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(ExpenseRequest {
        id: RequestId(row.try_get::<String, _>("id")?),
        project_name: row.try_get("project_name")?,
        project_number: row.try_get("project_number")?,
        amount,
        currency,
        reason: row.try_get("reason")?,
        submitted_at: row.try_get::<DateTime<Utc>, _>("submitted_at")?,
        status,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use expensebot_core::domain::request::{Currency, DraftRequest, RequestStatus};
    use expensebot_core::rust_decimal::Decimal;

    use super::SqlRequestStore;
    use crate::store::RequestStore;
    use crate::{connect_with_settings, migrations};

    async fn store() -> SqlRequestStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        SqlRequestStore::new(pool)
    }

    fn completed_draft() -> DraftRequest {
        DraftRequest {
            project_name: Some("prj-4021".to_string()),
            project_number: Some("4021".to_string()),
            amount: Some(Decimal::new(12_050, 2)),
            currency: Some(Currency::Eur),
            reason: Some("client dinner with partners".to_string()),
        }
    }

    #[tokio::test]
    async fn appended_request_round_trips() {
        let store = store().await;

        let appended = store.append(&completed_draft()).await.expect("append");
        assert_eq!(appended.status, RequestStatus::Pending);
        assert!(appended.id.0.starts_with("req-"));

        let listed = store.list_all().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, appended.id);
        assert_eq!(listed[0].project_name.as_deref(), Some("prj-4021"));
        assert_eq!(listed[0].project_number.as_deref(), Some("4021"));
        assert_eq!(listed[0].amount, Some(Decimal::new(12_050, 2)));
        assert_eq!(listed[0].currency, Some(Currency::Eur));
        assert_eq!(listed[0].reason.as_deref(), Some("client dinner with partners"));
        assert_eq!(listed[0].status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn listing_is_most_recent_first() {
        let store = store().await;

        let mut draft = completed_draft();
        draft.project_number = Some("first".to_string());
        store.append(&draft).await.expect("append first");

        // Submission timestamps carry sub-second precision; a short pause
        // keeps the two rows distinguishable.
        tokio::time::sleep(Duration::from_millis(10)).await;

        draft.project_number = Some("second".to_string());
        store.append(&draft).await.expect("append second");

        let listed = store.list_all().await.expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].project_number.as_deref(), Some("second"));
        assert_eq!(listed[1].project_number.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn identical_drafts_append_as_independent_rows() {
        let store = store().await;
        let draft = completed_draft();

        let first = store.append(&draft).await.expect("first append");
        let second = store.append(&draft).await.expect("second append");

        assert_ne!(first.id, second.id);
        assert_eq!(store.list_all().await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn empty_fields_persist_as_nulls() {
        let store = store().await;

        store.append(&DraftRequest::default()).await.expect("append empty draft");

        let listed = store.list_all().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert!(listed[0].project_number.is_none());
        assert!(listed[0].amount.is_none());
        assert!(listed[0].currency.is_none());
        assert_eq!(listed[0].status, RequestStatus::Pending);
    }
}
