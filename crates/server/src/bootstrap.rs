use std::sync::Arc;

use expensebot_core::config::{AppConfig, ConfigError, LoadOptions};
use expensebot_db::{connect_with_settings, migrations, DbPool};
use expensebot_speech::{HttpTranscriber, TranscribeError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub transcriber: Option<Arc<HttpTranscriber>>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("transcriber initialization failed: {0}")]
    Speech(#[source] TranscribeError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let transcriber =
        HttpTranscriber::from_config(&config.speech).map_err(BootstrapError::Speech)?.map(Arc::new);
    info!(
        event_name = "system.bootstrap.speech_capability",
        available = transcriber.is_some(),
        "speech capability resolved"
    );

    Ok(Application { config, db_pool, transcriber })
}

#[cfg(test)]
mod tests {
    use expensebot_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn memory_options(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_resolves_capabilities() {
        let app = bootstrap(memory_options("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'requests'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected requests table to be available after bootstrap");
        assert_eq!(table_count, 1, "bootstrap should expose the requests table");

        assert!(app.transcriber.is_none(), "speech is off by default");

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_when_speech_enabled_without_endpoint() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                speech_enabled: Some(true),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("speech.endpoint"));
    }
}
