//! Import log repository for PostgreSQL.
//!
//! Logs are append-only: the repository can insert and read them, nothing
//! else.

use leadsync_core::error::AppError;
use leadsync_core::models::{ImportLog, NewImportLog};
use leadsync_core::ImportLogStore;
use sqlx::{PgPool, Pool, Postgres};
use std::future::Future;
use tracing::debug;
use uuid::Uuid;

/// Column list for SELECT queries. Must remain a const literal to ensure SQL safety
/// since format!() bypasses sqlx compile-time validation.
const IMPORT_LOG_COLUMNS: &str =
    "id, total_rows, created_count, updated_count, error_count, details, errors, created_at";

/// Repository for import log persistence in PostgreSQL.
///
/// # Examples
///
/// ```no_run
/// use sqlx::postgres::PgPoolOptions;
/// use leadsync_db::ImportLogRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = PgPoolOptions::new()
///     .max_connections(5)
///     .connect("postgresql://localhost/leadsync")
///     .await?;
///
/// let repo = ImportLogRepository::new(pool);
/// repo.migrate().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ImportLogRepository {
    pool: Pool<Postgres>,
}

impl ImportLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations (creates `import_logs`).
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.into()))
    }

    /// Inserts a log entry. Returns the UUID the database assigned to it.
    pub async fn insert(&self, log: &NewImportLog) -> Result<Uuid, AppError> {
        let rec: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO import_logs (
                total_rows,
                created_count,
                updated_count,
                error_count,
                details,
                errors
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(log.total_rows)
        .bind(log.created_count)
        .bind(log.updated_count)
        .bind(log.error_count)
        .bind(&log.details)
        .bind(&log.errors)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        debug!("Inserted import log {}", rec.0);
        Ok(rec.0)
    }

    /// Retrieves an import log by UUID.
    pub async fn get(&self, id: Uuid) -> Result<Option<ImportLog>, AppError> {
        let query = format!("SELECT {} FROM import_logs WHERE id = $1", IMPORT_LOG_COLUMNS);
        let result = sqlx::query_as::<_, ImportLog>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(result)
    }

    /// Lists the most recent import logs, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<ImportLog>, AppError> {
        let query = format!(
            "SELECT {} FROM import_logs ORDER BY created_at DESC LIMIT $1",
            IMPORT_LOG_COLUMNS
        );
        let logs = sqlx::query_as::<_, ImportLog>(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(logs)
    }
}

impl ImportLogStore for ImportLogRepository {
    fn insert(&self, log: &NewImportLog) -> impl Future<Output = Result<Uuid, AppError>> + Send {
        ImportLogRepository::insert(self, log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadsync_core::sync::{aggregate, ChunkOutcome, RejectionGroup};
    use leadsync_core::Record;
    use serde_json::json;

    const MIGRATION: &str = include_str!("../migrations/20250815000000_create_import_logs.sql");

    #[test]
    fn test_columns_exist_in_migration() {
        for column in IMPORT_LOG_COLUMNS.split(", ") {
            assert!(
                MIGRATION.contains(&format!("    {column} ")),
                "column {column} missing from migration"
            );
        }
    }

    #[test]
    fn test_new_import_log_from_summary() {
        let summary = aggregate(
            vec![(RejectionGroup::EmptyEmail, vec![Record::new("")])],
            vec![ChunkOutcome::failure(
                vec![Record::new("a@x.com")],
                json!({"data": "rate limited"}),
            )],
        );

        let log = NewImportLog::from_summary(2, &summary).unwrap();
        assert_eq!(log.total_rows, 2);
        assert_eq!(log.created_count, 0);
        assert_eq!(log.updated_count, 0);
        assert_eq!(log.error_count, 2);
        assert_eq!(log.details, json!({"response": []}));
        assert_eq!(
            log.errors,
            json!({
                "empty_email": [{"email": ""}],
                "upstream_error": [{"error": {"data": "rate limited"}, "data": [{"email": "a@x.com"}]}]
            })
        );
    }
}
