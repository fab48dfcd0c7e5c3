//! NCOA verification adapters
//!
//! The pipeline talks to the verification service through [`NcoaVerifier`]
//! so swapping the fixture-backed simulation for the real integration does
//! not touch the reconciler or orchestration code.

use async_trait::async_trait;
use ncoa_common::NcoaError;
use thiserror::Error;

use crate::models::{PersonAddressRecord, VerificationResult};

mod live;
mod simulated;

pub use live::LiveNcoa;
pub use simulated::SimulatedNcoa;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Live NCOA access is not provisioned")]
    NotProvisioned,
}

impl From<VerifyError> for NcoaError {
    fn from(e: VerifyError) -> Self {
        NcoaError::Verification(e.to_string())
    }
}

/// Address verification service interface
///
/// Implementations return one [`VerificationResult`] per input record
/// (left-join semantics): identities the service omitted come back with
/// `ncoa_status: None`, never a fabricated status. Delivered address
/// fields are passed through as received; a corrected address from the
/// service (the "moved" case) must not be overwritten with the submitted
/// one.
#[async_trait]
pub trait NcoaVerifier: Send + Sync {
    async fn verify(
        &self,
        input: &[PersonAddressRecord],
    ) -> Result<Vec<VerificationResult>, VerifyError>;
}
