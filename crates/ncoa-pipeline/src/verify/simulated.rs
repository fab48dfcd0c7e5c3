//! Fixture-backed verification adapter

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::models::{PersonAddressRecord, VerificationResult};

use super::{NcoaVerifier, VerifyError};

/// One row of the sample NCOA output fixture.
#[derive(Debug, Deserialize)]
struct FixtureRow {
    record_id: String,
    record_type: String,
}

/// Simulated NCOA service backed by a static `record_id,record_type`
/// lookup table.
pub struct SimulatedNcoa {
    statuses: HashMap<String, String>,
}

impl SimulatedNcoa {
    /// Load the lookup table from a fixture CSV with `record_id` and
    /// `record_type` columns.
    pub fn from_fixture(path: impl AsRef<Path>) -> Result<Self, VerifyError> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path).map_err(|e| {
            VerifyError::Fixture(format!("Failed to open fixture {}: {}", path.display(), e))
        })?;

        let mut statuses = HashMap::new();
        for row in reader.deserialize::<FixtureRow>() {
            let row = row?;
            statuses.insert(row.record_id, row.record_type);
        }

        info!(entries = statuses.len(), fixture = %path.display(), "Loaded NCOA fixture");

        Ok(Self { statuses })
    }

    /// Build the lookup table from in-memory pairs. Test constructor.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            statuses: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl NcoaVerifier for SimulatedNcoa {
    async fn verify(
        &self,
        input: &[PersonAddressRecord],
    ) -> Result<Vec<VerificationResult>, VerifyError> {
        let results: Vec<VerificationResult> = input
            .iter()
            .map(|record| VerificationResult {
                individual_id: record.individual_id.clone(),
                first_name: record.first_name.clone(),
                last_name: record.last_name.clone(),
                address_line_1: record.address_line_1.clone(),
                address_city: record.address_city.clone(),
                address_state: record.address_state.clone(),
                address_zipcode: record.address_zipcode.clone(),
                ncoa_status: self.statuses.get(&record.individual_id).cloned(),
            })
            .collect();

        let matched = results.iter().filter(|r| r.ncoa_status.is_some()).count();
        debug!(
            input = input.len(),
            matched,
            unmatched = input.len() - matched,
            "Simulated NCOA lookup complete"
        );

        Ok(results)
    }
}
