//! Reconciliation of verification results into the persistent status table
//!
//! Incoming results are staged into a transient holding table
//! (`<status_table>_staging`, full-replace), then applied to the status
//! table in a single `INSERT ... ON CONFLICT DO UPDATE` statement. The
//! five-column unique index on the status table backs the conflict target,
//! so reconciling the same key twice in rapid succession can never produce
//! a duplicate row. The holding table is dropped best-effort afterwards,
//! whether the upsert succeeded or not.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info, instrument, warn};

use crate::models::VerificationResult;

/// Rows per staged INSERT statement, bounded by the Postgres bind
/// parameter limit (8 binds per row).
const STAGING_INSERT_BATCH_SIZE: usize = 1000;

/// Outcome of one reconciliation run
#[derive(Debug, Clone, Copy)]
pub struct ReconcileOutcome {
    /// Rows staged into the holding table
    pub staged_rows: u64,
    /// Rows inserted or updated in the status table
    pub rows_affected: u64,
}

/// Upserts verification results into the persistent address-status table.
pub struct Reconciler {
    pool: PgPool,
    status_table: String,
}

impl Reconciler {
    pub fn new(pool: PgPool, status_table: impl Into<String>) -> Self {
        Self {
            pool,
            status_table: status_table.into(),
        }
    }

    fn staging_table(&self) -> String {
        format!("{}_staging", self.status_table)
    }

    /// Reconcile one run's verification results.
    ///
    /// Matching is exact string equality on the full five-field key; no
    /// normalization happens here. A result carrying a corrected address
    /// therefore lands as a new row rather than updating the old one.
    ///
    /// `run_at` is the job's captured run timestamp and is stamped onto
    /// every write this run performs: `last_attempted_update` on every
    /// observed key, `last_updated` only where `ncoa_status` actually
    /// changed (`IS DISTINCT FROM`, so a status arriving for a previously
    /// status-less row counts as a change).
    #[instrument(skip(self, results), fields(results = results.len()))]
    pub async fn reconcile(
        &self,
        results: &[VerificationResult],
        run_at: DateTime<Utc>,
    ) -> ncoa_common::Result<ReconcileOutcome> {
        let staging = self.staging_table();

        self.replace_staging(&staging, results).await?;

        let upsert = self.apply_upsert(&staging, run_at).await;

        // Best-effort cleanup so a failed run cannot leak rows into the
        // next reconciliation.
        if let Err(e) = self.drop_staging(&staging).await {
            warn!(error = %e, table = %staging, "Failed to drop staging table");
        }

        let rows_affected = upsert?;

        info!(
            staged_rows = results.len(),
            rows_affected, "Reconciliation merge complete"
        );

        Ok(ReconcileOutcome {
            staged_rows: results.len() as u64,
            rows_affected,
        })
    }

    /// Recreate the holding table and load exactly this run's results.
    async fn replace_staging(
        &self,
        staging: &str,
        results: &[VerificationResult],
    ) -> ncoa_common::Result<()> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", staging))
            .execute(&self.pool)
            .await?;

        sqlx::query(&format!(
            "CREATE TABLE {} (
                vr_program_id   TEXT NOT NULL,
                address_line_1  TEXT NOT NULL,
                address_city    TEXT NOT NULL,
                address_zipcode TEXT NOT NULL,
                address_state   TEXT NOT NULL,
                first_name      TEXT NOT NULL,
                last_name       TEXT NOT NULL,
                ncoa_status     TEXT
            )",
            staging
        ))
        .execute(&self.pool)
        .await?;

        for chunk in results.chunks(STAGING_INSERT_BATCH_SIZE) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {} (vr_program_id, address_line_1, address_city, \
                 address_zipcode, address_state, first_name, last_name, ncoa_status) ",
                staging
            ));

            builder.push_values(chunk, |mut row, result| {
                row.push_bind(&result.individual_id)
                    .push_bind(&result.address_line_1)
                    .push_bind(&result.address_city)
                    .push_bind(&result.address_zipcode)
                    .push_bind(&result.address_state)
                    .push_bind(&result.first_name)
                    .push_bind(&result.last_name)
                    .push_bind(&result.ncoa_status);
            });

            builder.build().execute(&self.pool).await?;
        }

        debug!(rows = results.len(), table = %staging, "Staged verification results");

        Ok(())
    }

    /// Single atomic matched/unmatched resolution against the status table.
    async fn apply_upsert(
        &self,
        staging: &str,
        run_at: DateTime<Utc>,
    ) -> ncoa_common::Result<u64> {
        let query = format!(
            "INSERT INTO {status} AS target (
                vr_program_id, address_line_1, address_city, address_zipcode, address_state,
                first_name, last_name, ncoa_status, last_updated, last_attempted_update
            )
            SELECT
                s.vr_program_id, s.address_line_1, s.address_city, s.address_zipcode, s.address_state,
                s.first_name, s.last_name, s.ncoa_status, $1, $1
            FROM {staging} AS s
            ON CONFLICT (vr_program_id, address_line_1, address_city, address_zipcode, address_state)
            DO UPDATE SET
                last_attempted_update = EXCLUDED.last_attempted_update,
                ncoa_status = CASE
                    WHEN target.ncoa_status IS DISTINCT FROM EXCLUDED.ncoa_status
                        THEN EXCLUDED.ncoa_status
                    ELSE target.ncoa_status
                END,
                last_updated = CASE
                    WHEN target.ncoa_status IS DISTINCT FROM EXCLUDED.ncoa_status
                        THEN EXCLUDED.last_updated
                    ELSE target.last_updated
                END",
            status = self.status_table,
            staging = staging,
        );

        let done = sqlx::query(&query)
            .bind(run_at)
            .execute(&self.pool)
            .await?;

        Ok(done.rows_affected())
    }

    /// Idempotent holding-table drop.
    async fn drop_staging(&self, staging: &str) -> ncoa_common::Result<()> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", staging))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AddressStatusRecord;
    use chrono::TimeZone;

    fn run_time(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 27, hour, 0, 0).unwrap()
    }

    fn result(id: &str, addr1: &str, city: &str, status: Option<&str>) -> VerificationResult {
        VerificationResult {
            individual_id: id.to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            address_line_1: addr1.to_string(),
            address_city: city.to_string(),
            address_state: "NC".to_string(),
            address_zipcode: "27601".to_string(),
            ncoa_status: status.map(|s| s.to_string()),
        }
    }

    async fn fetch_statuses(pool: &PgPool) -> Vec<AddressStatusRecord> {
        sqlx::query_as::<_, AddressStatusRecord>(
            "SELECT * FROM ncoa_address_statuses ORDER BY vr_program_id, address_line_1",
        )
        .fetch_all(pool)
        .await
        .unwrap()
    }

    async fn staging_table_exists(pool: &PgPool) -> bool {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT to_regclass('ncoa_address_statuses_staging')::text",
        )
        .fetch_one(pool)
        .await
        .unwrap()
        .is_some()
    }

    #[sqlx::test]
    async fn test_unmatched_key_inserts_new_record(pool: PgPool) -> sqlx::Result<()> {
        let reconciler = Reconciler::new(pool.clone(), "ncoa_address_statuses");
        let t1 = run_time(10);

        let outcome = reconciler
            .reconcile(&[result("V123", "1 Main St", "Raleigh", Some("VALID"))], t1)
            .await
            .unwrap();

        assert_eq!(outcome.staged_rows, 1);
        assert_eq!(outcome.rows_affected, 1);

        let rows = fetch_statuses(&pool).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vr_program_id, "V123");
        assert_eq!(rows[0].ncoa_status.as_deref(), Some("VALID"));
        assert_eq!(rows[0].last_updated, t1);
        assert_eq!(rows[0].last_attempted_update, t1);
        Ok(())
    }

    #[sqlx::test]
    async fn test_reconcile_is_idempotent_for_unchanged_status(pool: PgPool) -> sqlx::Result<()> {
        let reconciler = Reconciler::new(pool.clone(), "ncoa_address_statuses");
        let (t1, t2) = (run_time(10), run_time(11));
        let results = [result("V123", "1 Main St", "Raleigh", Some("VALID"))];

        reconciler.reconcile(&results, t1).await.unwrap();
        reconciler.reconcile(&results, t2).await.unwrap();

        let rows = fetch_statuses(&pool).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ncoa_status.as_deref(), Some("VALID"));
        // Status unchanged, so last_updated stays at the first run.
        assert_eq!(rows[0].last_updated, t1);
        // The attempt timestamp always advances.
        assert_eq!(rows[0].last_attempted_update, t2);
        Ok(())
    }

    #[sqlx::test]
    async fn test_status_change_advances_last_updated(pool: PgPool) -> sqlx::Result<()> {
        let reconciler = Reconciler::new(pool.clone(), "ncoa_address_statuses");
        let (t1, t2) = (run_time(10), run_time(11));

        reconciler
            .reconcile(&[result("V123", "1 Main St", "Raleigh", Some("A"))], t1)
            .await
            .unwrap();
        reconciler
            .reconcile(&[result("V123", "1 Main St", "Raleigh", Some("B"))], t2)
            .await
            .unwrap();

        let rows = fetch_statuses(&pool).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ncoa_status.as_deref(), Some("B"));
        assert_eq!(rows[0].last_updated, t2);
        assert_eq!(rows[0].last_attempted_update, t2);
        Ok(())
    }

    #[sqlx::test]
    async fn test_status_arriving_for_statusless_row_counts_as_change(
        pool: PgPool,
    ) -> sqlx::Result<()> {
        let reconciler = Reconciler::new(pool.clone(), "ncoa_address_statuses");
        let (t1, t2) = (run_time(10), run_time(11));

        reconciler
            .reconcile(&[result("V123", "1 Main St", "Raleigh", None)], t1)
            .await
            .unwrap();
        reconciler
            .reconcile(&[result("V123", "1 Main St", "Raleigh", Some("VALID"))], t2)
            .await
            .unwrap();

        let rows = fetch_statuses(&pool).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ncoa_status.as_deref(), Some("VALID"));
        assert_eq!(rows[0].last_updated, t2);
        Ok(())
    }

    #[sqlx::test]
    async fn test_corrected_address_inserts_new_row(pool: PgPool) -> sqlx::Result<()> {
        let reconciler = Reconciler::new(pool.clone(), "ncoa_address_statuses");
        let (t1, t2) = (run_time(10), run_time(11));

        reconciler
            .reconcile(&[result("V123", "1 Main St", "Raleigh", Some("VALID"))], t1)
            .await
            .unwrap();
        // The service corrected the address: exact key matching treats this
        // as a previously unseen key.
        reconciler
            .reconcile(&[result("V123", "2 Oak Ave", "Durham", Some("MOVED_RIGHT"))], t2)
            .await
            .unwrap();

        let rows = fetch_statuses(&pool).await;
        assert_eq!(rows.len(), 2);

        let old = rows.iter().find(|r| r.address_line_1 == "1 Main St").unwrap();
        let new = rows.iter().find(|r| r.address_line_1 == "2 Oak Ave").unwrap();

        // The old-address row is untouched by the second run.
        assert_eq!(old.last_attempted_update, t1);
        assert_eq!(old.ncoa_status.as_deref(), Some("VALID"));

        assert_eq!(new.address_city, "Durham");
        assert_eq!(new.ncoa_status.as_deref(), Some("MOVED_RIGHT"));
        assert_eq!(new.last_updated, t2);
        assert_eq!(new.last_attempted_update, t2);
        Ok(())
    }

    #[sqlx::test]
    async fn test_no_duplicate_keys_across_runs(pool: PgPool) -> sqlx::Result<()> {
        let reconciler = Reconciler::new(pool.clone(), "ncoa_address_statuses");

        for (hour, status) in [(9, "A"), (10, "B"), (11, "B"), (12, "C")] {
            reconciler
                .reconcile(
                    &[result("V123", "1 Main St", "Raleigh", Some(status))],
                    run_time(hour),
                )
                .await
                .unwrap();
        }

        let rows = fetch_statuses(&pool).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ncoa_status.as_deref(), Some("C"));
        Ok(())
    }

    #[sqlx::test]
    async fn test_holding_table_is_dropped_after_success(pool: PgPool) -> sqlx::Result<()> {
        let reconciler = Reconciler::new(pool.clone(), "ncoa_address_statuses");

        reconciler
            .reconcile(&[result("V123", "1 Main St", "Raleigh", Some("VALID"))], run_time(10))
            .await
            .unwrap();

        assert!(!staging_table_exists(&pool).await);
        Ok(())
    }

    #[sqlx::test]
    async fn test_holding_table_is_dropped_after_failure(pool: PgPool) -> sqlx::Result<()> {
        // Point the reconciler at a missing status table so the upsert
        // fails after staging succeeded.
        let reconciler = Reconciler::new(pool.clone(), "missing_status_table");

        let outcome = reconciler
            .reconcile(&[result("V123", "1 Main St", "Raleigh", Some("VALID"))], run_time(10))
            .await;
        assert!(outcome.is_err());

        let leftover = sqlx::query_scalar::<_, Option<String>>(
            "SELECT to_regclass('missing_status_table_staging')::text",
        )
        .fetch_one(&pool)
        .await?;
        assert!(leftover.is_none());
        Ok(())
    }

    #[sqlx::test]
    async fn test_empty_result_set_is_a_no_op(pool: PgPool) -> sqlx::Result<()> {
        let reconciler = Reconciler::new(pool.clone(), "ncoa_address_statuses");

        let outcome = reconciler.reconcile(&[], run_time(10)).await.unwrap();

        assert_eq!(outcome.staged_rows, 0);
        assert_eq!(outcome.rows_affected, 0);
        assert!(fetch_statuses(&pool).await.is_empty());
        Ok(())
    }
}
