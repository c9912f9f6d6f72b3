use async_trait::async_trait;
use serde_json::json;

use crate::config::DbPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// Best-effort audit trail. Implementations must swallow their own failures:
/// a journal entry is never worth failing the operation that produced it.
#[async_trait]
pub trait Journal: Send + Sync {
    async fn record(
        &self,
        module: &str,
        component: &str,
        level: LogLevel,
        message: &str,
        data: Option<serde_json::Value>,
    );
}

/// Persists journal entries to the `journal_entries` table, behind an enable
/// flag. Write failures are reported on the process log and discarded.
pub struct MySqlJournal {
    pool: DbPool,
    enabled: bool,
}

impl MySqlJournal {
    pub fn new(pool: DbPool, enabled: bool) -> Self {
        Self { pool, enabled }
    }
}

#[async_trait]
impl Journal for MySqlJournal {
    async fn record(
        &self,
        module: &str,
        component: &str,
        level: LogLevel,
        message: &str,
        data: Option<serde_json::Value>,
    ) {
        if !self.enabled {
            return;
        }

        let line = format!("{} [{module}/{component}] {message}", level.as_str().to_uppercase());
        let data = json!({ "module": module, "component": component, "extra": data });

        let result = sqlx::query(
            r#"
            INSERT INTO journal_entries (id, level, message, data, created_at)
            VALUES (?, ?, ?, ?, NOW(3))
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(level.as_str())
        .bind(&line)
        .bind(data.to_string())
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            tracing::error!(%err, "journal write failed");
        }
    }
}

/// Forwards journal entries to the tracing subscriber. Used in tests and in
/// deployments that have no journal database.
pub struct TracingJournal;

#[async_trait]
impl Journal for TracingJournal {
    async fn record(
        &self,
        module: &str,
        component: &str,
        level: LogLevel,
        message: &str,
        data: Option<serde_json::Value>,
    ) {
        let data = data.unwrap_or(serde_json::Value::Null);
        match level {
            LogLevel::Error => tracing::error!(module, component, %data, "{message}"),
            LogLevel::Warn => tracing::warn!(module, component, %data, "{message}"),
            LogLevel::Info => tracing::info!(module, component, %data, "{message}"),
            LogLevel::Debug => tracing::debug!(module, component, %data, "{message}"),
        }
    }
}
