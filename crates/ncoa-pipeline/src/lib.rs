//! NCOA address verification pipeline
//!
//! A five-step batch workflow:
//!
//! 1. **extract** — pull the person/address dataset from the warehouse
//! 2. **staging** — upload the request dataset to object storage as CSV
//! 3. **verify** — submit to the NCOA service (simulated until provisioned)
//! 4. **staging** — upload the verification response as CSV
//! 5. **reconcile** — atomically upsert verified statuses into the
//!    persistent `ncoa_address_statuses` table
//!
//! Steps run strictly in sequence; any failure aborts the run. Clients are
//! constructed once per run and passed into each component explicitly so
//! the extractor and reconciler stay independently testable.

pub mod config;
pub mod db;
pub mod extract;
pub mod job;
pub mod models;
pub mod reconcile;
pub mod staging;
pub mod storage;
pub mod verify;

pub use config::PipelineConfig;
pub use extract::{ExtractOptions, ExtractedDataset, Extractor};
pub use job::{run_job, JobSummary, NcoaJob};
pub use models::{AddressStatusRecord, PersonAddressRecord, VerificationResult};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use storage::Storage;
pub use verify::{LiveNcoa, NcoaVerifier, SimulatedNcoa, VerifyError};
