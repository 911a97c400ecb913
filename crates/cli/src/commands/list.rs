use expensebot_core::config::{AppConfig, LoadOptions};
use expensebot_core::domain::request::ExpenseRequest;
use expensebot_db::{connect_with_settings, migrations, RequestStore, SqlRequestStore};

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "list",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "list",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let store = SqlRequestStore::new(pool);
        store.list_all().await.map_err(|error| ("store_read", error.to_string(), 6u8))
    });

    match result {
        Ok(requests) => CommandResult { exit_code: 0, output: render(&requests) },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("list", error_class, message, exit_code)
        }
    }
}

fn render(requests: &[ExpenseRequest]) -> String {
    if requests.is_empty() {
        return "no expense requests recorded yet".to_string();
    }

    let mut lines = vec![format!("{} request(s), most recent first:", requests.len())];
    for request in requests {
        lines.push(render_request(request));
    }
    lines.join("\n")
}

fn render_request(request: &ExpenseRequest) -> String {
    let amount = match (&request.amount, &request.currency) {
        (Some(amount), Some(currency)) => format!("{amount} {currency}"),
        (Some(amount), None) => amount.to_string(),
        _ => "-".to_string(),
    };

    format!(
        "- {} | {} | {} | {} ({}) | {} | {}",
        request.id.0,
        request.submitted_at.format("%Y-%m-%d %H:%M:%S UTC"),
        request.status.as_str(),
        request.project_name.as_deref().unwrap_or("-"),
        request.project_number.as_deref().unwrap_or("-"),
        amount,
        request.reason.as_deref().unwrap_or("-"),
    )
}

#[cfg(test)]
mod tests {
    use expensebot_core::chrono::{TimeZone, Utc};
    use expensebot_core::domain::request::{
        Currency, ExpenseRequest, RequestId, RequestStatus,
    };
    use expensebot_core::rust_decimal::Decimal;

    use super::render;

    #[test]
    fn render_covers_filled_and_empty_rows() {
        let filled = ExpenseRequest {
            id: RequestId("req-1".to_string()),
            project_name: Some("office renovation".to_string()),
            project_number: Some("4021".to_string()),
            amount: Some(Decimal::new(12_050, 2)),
            currency: Some(Currency::Eur),
            reason: Some("new desks".to_string()),
            submitted_at: Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).single().expect("timestamp"),
            status: RequestStatus::Pending,
        };
        let empty = ExpenseRequest {
            id: RequestId("req-2".to_string()),
            project_name: None,
            project_number: None,
            amount: None,
            currency: None,
            reason: None,
            submitted_at: Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 1).single().expect("timestamp"),
            status: RequestStatus::Pending,
        };

        let output = render(&[filled, empty]);
        assert!(output.starts_with("2 request(s)"));
        assert!(output.contains("office renovation (4021)"));
        assert!(output.contains("120.50 EUR"));
        assert!(output.contains("req-2 | 2026-08-30 12:00:01 UTC | Pending | - (-) | - | -"));
    }

    #[test]
    fn render_reports_empty_store() {
        assert_eq!(render(&[]), "no expense requests recorded yet");
    }
}
