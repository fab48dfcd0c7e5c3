//! CSV staging of request and response datasets to object storage
//!
//! Both writers share one contract: serialize the dataset to delimited
//! text with a header row and full-overwrite upload it under a job-scoped
//! key. Re-running the same job id overwrites the same blobs.

use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::models::{PersonAddressRecord, VerificationResult};
use crate::storage::{Storage, UploadResult};

/// Staging prefix for submitted request files.
pub const REQUEST_KEY_PREFIX: &str = "ncoa_request_files";

/// Staging prefix for verification response files.
pub const RESPONSE_KEY_PREFIX: &str = "ncoa_response_files";

const CSV_CONTENT_TYPE: &str = "text/csv";

pub fn request_key(job_id: Uuid) -> String {
    format!("{}/job_request_input_id_{}.csv", REQUEST_KEY_PREFIX, job_id)
}

pub fn response_key(job_id: Uuid) -> String {
    format!("{}/job_request_response_id_{}.csv", RESPONSE_KEY_PREFIX, job_id)
}

/// Serialize records to CSV with a header row.
///
/// Absent values (e.g. a missing `ncoa_status`) serialize as empty fields,
/// never as a null marker.
pub fn to_csv<T: Serialize>(records: &[T]) -> ncoa_common::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| ncoa_common::NcoaError::Io(e.into_error()))
}

/// Upload the extracted request dataset under the job's request key.
#[instrument(skip(storage, records))]
pub async fn stage_request(
    storage: &Storage,
    job_id: Uuid,
    records: &[PersonAddressRecord],
) -> ncoa_common::Result<UploadResult> {
    let body = to_csv(records)?;
    storage.upload(&request_key(job_id), body, CSV_CONTENT_TYPE).await
}

/// Upload the verification response dataset under the job's response key.
#[instrument(skip(storage, results))]
pub async fn stage_response(
    storage: &Storage,
    job_id: Uuid,
    results: &[VerificationResult],
) -> ncoa_common::Result<UploadResult> {
    let body = to_csv(results)?;
    storage.upload(&response_key(job_id), body, CSV_CONTENT_TYPE).await
}
