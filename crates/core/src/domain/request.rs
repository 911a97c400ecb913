use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

/// Currency tokens the extractor recognizes. Spoken aliases ("dollars",
/// "euros", "pounds") normalize to their ISO code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "usd" | "dollars" => Some(Self::Usd),
            "eur" | "euros" => Some(Self::Eur),
            "gbp" | "pounds" => Some(Self::Gbp),
            _ => None,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    pub fn parse_str(value: &str) -> Result<Self, DomainError> {
        match value {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            other => {
                Err(DomainError::InvariantViolation(format!("unknown request status `{other}`")))
            }
        }
    }
}

/// The in-progress request being assembled one field at a time. Fields fill
/// strictly in dialogue order (project, then amount, then reason) and only a
/// full reset clears them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftRequest {
    pub project_name: Option<String>,
    pub project_number: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub reason: Option<String>,
}

impl DraftRequest {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_complete(&self) -> bool {
        self.project_number.is_some()
            && self.amount.is_some()
            && self.currency.is_some()
            && self.reason.is_some()
    }
}

/// Immutable snapshot of a submitted request. The store assigns the id and
/// timestamp at append time; status transitions past `Pending` belong to
/// whatever reviews these requests, not to this crate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRequest {
    pub id: RequestId,
    pub project_name: Option<String>,
    pub project_number: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub status: RequestStatus,
}

#[cfg(test)]
mod tests {
    use super::{Currency, DraftRequest, RequestStatus};
    use rust_decimal::Decimal;

    #[test]
    fn spoken_currency_aliases_normalize_to_iso_codes() {
        assert_eq!(Currency::from_token("Dollars"), Some(Currency::Usd));
        assert_eq!(Currency::from_token("euros"), Some(Currency::Eur));
        assert_eq!(Currency::from_token("POUNDS"), Some(Currency::Gbp));
        assert_eq!(Currency::from_token("yen"), None);
        assert_eq!(Currency::Eur.as_str(), "EUR");
    }

    #[test]
    fn status_round_trips_through_storage_text() {
        for status in [RequestStatus::Pending, RequestStatus::Approved, RequestStatus::Rejected] {
            assert_eq!(RequestStatus::parse_str(status.as_str()).expect("known status"), status);
        }
        assert!(RequestStatus::parse_str("Archived").is_err());
    }

    #[test]
    fn draft_completeness_requires_every_collected_field() {
        let mut draft = DraftRequest {
            project_name: Some("office-move".to_string()),
            project_number: Some("4021".to_string()),
            amount: Some(Decimal::new(30_000, 2)),
            currency: Some(Currency::Usd),
            reason: None,
        };
        assert!(!draft.is_complete());

        draft.reason = Some("movers for the new office".to_string());
        assert!(draft.is_complete());

        draft.clear();
        assert_eq!(draft, DraftRequest::default());
    }
}
