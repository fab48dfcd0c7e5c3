//! Job identity and pipeline orchestration

use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::extract::{ExtractOptions, Extractor};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::staging;
use crate::storage::Storage;
use crate::verify::NcoaVerifier;

/// Identity of one pipeline run
///
/// `job_id` namespaces the staged request/response files; `run_at` is
/// stamped onto every reconciliation write of this run.
#[derive(Debug, Clone, Copy)]
pub struct NcoaJob {
    pub job_id: Uuid,
    pub run_at: DateTime<Utc>,
}

impl NcoaJob {
    pub fn new() -> Self {
        let job = Self {
            job_id: Uuid::new_v4(),
            run_at: Utc::now(),
        };
        info!(job_id = %job.job_id, run_at = %job.run_at, "Initiated NCOA job");
        job
    }
}

impl Default for NcoaJob {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a completed pipeline run
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub extracted_rows: usize,
    pub verified_rows: usize,
    pub request_key: String,
    pub response_key: String,
    pub reconcile: ReconcileOutcome,
}

/// Run the five pipeline steps in strict sequence.
///
/// Each step's output feeds the next; any failure aborts the run with no
/// retry. Clients arrive as explicit parameters so each component can be
/// exercised against mock stores in isolation.
#[instrument(skip_all, fields(job_id = %job.job_id))]
pub async fn run_job(
    job: &NcoaJob,
    extractor: &Extractor,
    storage: &Storage,
    verifier: &dyn NcoaVerifier,
    reconciler: &Reconciler,
    opts: ExtractOptions,
) -> ncoa_common::Result<JobSummary> {
    // Step 1: extract the person dataset from the warehouse.
    let dataset = extractor.fetch(opts).await?;
    info!(rows = dataset.len(), "Extracted person dataset");

    // Step 2: stage the request file to object storage.
    let request = staging::stage_request(storage, job.job_id, dataset.rows()).await?;
    info!(key = %request.key, bytes = request.size, "Staged request file");

    // Step 3: submit to the verification service.
    let results = verifier.verify(dataset.rows()).await.map_err(ncoa_common::NcoaError::from)?;
    info!(rows = results.len(), "Received verification results");

    // Step 4: stage the response file.
    let response = staging::stage_response(storage, job.job_id, &results).await?;
    info!(key = %response.key, bytes = response.size, "Staged response file");

    // Step 5: reconcile statuses into the warehouse.
    let reconcile = reconciler.reconcile(&results, job.run_at).await?;

    info!(
        extracted = dataset.len(),
        reconciled = reconcile.rows_affected,
        "NCOA job complete"
    );

    Ok(JobSummary {
        job_id: job.job_id,
        extracted_rows: dataset.len(),
        verified_rows: results.len(),
        request_key: request.key,
        response_key: response.key,
        reconcile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_jobs_have_distinct_ids() {
        let a = NcoaJob::new();
        let b = NcoaJob::new();
        assert_ne!(a.job_id, b.job_id);
    }
}
