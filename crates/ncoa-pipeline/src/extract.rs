//! Dataset extraction from the warehouse source table

use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::models::PersonAddressRecord;

/// Extraction options
///
/// `limit` caps the number of extracted rows. Production runs leave it
/// unset; it is also the seam for adding chunked extraction against larger
/// sources without changing the output contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub limit: Option<i64>,
}

/// Fully materialized extraction result
#[derive(Debug, Clone)]
pub struct ExtractedDataset {
    rows: Vec<PersonAddressRecord>,
}

impl ExtractedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[PersonAddressRecord] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<PersonAddressRecord> {
        self.rows
    }
}

/// Reads the person/address source table and projects it into
/// [`PersonAddressRecord`] shape.
pub struct Extractor {
    pool: PgPool,
    source_table: String,
    state_code: String,
}

impl Extractor {
    pub fn new(pool: PgPool, source_table: impl Into<String>, state_code: impl Into<String>) -> Self {
        Self {
            pool,
            source_table: source_table.into(),
            state_code: state_code.into(),
        }
    }

    /// Fetch all rows with a non-null identity.
    ///
    /// The nullable secondary address line is coalesced to an empty string
    /// in the projection, so downstream CSV serialization is uniform. Any
    /// query failure is fatal; no partial dataset is returned.
    #[instrument(skip(self))]
    pub async fn fetch(&self, opts: ExtractOptions) -> ncoa_common::Result<ExtractedDataset> {
        let mut query = format!(
            "SELECT \
                vr_program_id AS individual_id, \
                first_name, \
                last_name, \
                mail_addr1 AS address_line_1, \
                COALESCE(mail_addr2, '') AS address_line_2, \
                mail_city AS address_city, \
                $1::text AS address_state, \
                mail_zipcode AS address_zipcode \
             FROM {} \
             WHERE vr_program_id IS NOT NULL",
            self.source_table
        );

        if let Some(limit) = opts.limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }

        debug!(source_table = %self.source_table, "Executing person dataset query:\n{}", query);

        let rows = sqlx::query_as::<_, PersonAddressRecord>(&query)
            .bind(&self.state_code)
            .fetch_all(&self.pool)
            .await?;

        info!(
            rows = rows.len(),
            source_table = %self.source_table,
            "Person dataset query executed successfully"
        );

        Ok(ExtractedDataset { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_source_table(pool: &PgPool) -> sqlx::Result<()> {
        sqlx::query(
            "CREATE TABLE vf_nc_partial (
                vr_program_id TEXT,
                first_name TEXT,
                last_name TEXT,
                mail_addr1 TEXT,
                mail_addr2 TEXT,
                mail_city TEXT,
                mail_zipcode TEXT
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn insert_person(
        pool: &PgPool,
        id: Option<&str>,
        addr2: Option<&str>,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO vf_nc_partial
                (vr_program_id, first_name, last_name, mail_addr1, mail_addr2, mail_city, mail_zipcode)
             VALUES ($1, 'Jane', 'Doe', '1 Main St', $2, 'Raleigh', '27601')",
        )
        .bind(id)
        .bind(addr2)
        .execute(pool)
        .await?;
        Ok(())
    }

    #[sqlx::test]
    async fn test_fetch_projects_and_filters_null_identities(pool: PgPool) -> sqlx::Result<()> {
        create_source_table(&pool).await?;
        insert_person(&pool, Some("V123"), Some("Apt 4")).await?;
        insert_person(&pool, None, None).await?;

        let extractor = Extractor::new(pool, "vf_nc_partial", "NC");
        let dataset = extractor.fetch(ExtractOptions::default()).await.unwrap();

        assert_eq!(dataset.len(), 1);
        let row = &dataset.rows()[0];
        assert_eq!(row.individual_id, "V123");
        assert_eq!(row.address_line_2, "Apt 4");
        assert_eq!(row.address_state, "NC");
        Ok(())
    }

    #[sqlx::test]
    async fn test_fetch_normalizes_null_secondary_line_to_empty(pool: PgPool) -> sqlx::Result<()> {
        create_source_table(&pool).await?;
        insert_person(&pool, Some("V124"), None).await?;

        let extractor = Extractor::new(pool, "vf_nc_partial", "NC");
        let dataset = extractor.fetch(ExtractOptions::default()).await.unwrap();

        assert_eq!(dataset.rows()[0].address_line_2, "");
        Ok(())
    }

    #[sqlx::test]
    async fn test_fetch_honors_row_limit(pool: PgPool) -> sqlx::Result<()> {
        create_source_table(&pool).await?;
        insert_person(&pool, Some("V1"), None).await?;
        insert_person(&pool, Some("V2"), None).await?;
        insert_person(&pool, Some("V3"), None).await?;

        let extractor = Extractor::new(pool, "vf_nc_partial", "NC");
        let dataset = extractor
            .fetch(ExtractOptions { limit: Some(2) })
            .await
            .unwrap();

        assert_eq!(dataset.len(), 2);
        Ok(())
    }

    #[sqlx::test]
    async fn test_fetch_fails_on_missing_table(pool: PgPool) -> sqlx::Result<()> {
        let extractor = Extractor::new(pool, "no_such_table", "NC");
        let result = extractor.fetch(ExtractOptions::default()).await;
        assert!(result.is_err());
        Ok(())
    }
}
