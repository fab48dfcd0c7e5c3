//! Pipeline configuration
//!
//! Loaded from the environment at process start. Two separate service
//! identities are configured here: warehouse credentials travel in
//! `DATABASE_URL` (see [`crate::db::DbConfig`]) and object-storage
//! credentials in the `NCOA_S3_*` variables.

use ncoa_common::NcoaError;
use serde::{Deserialize, Serialize};
use std::env;

use crate::db::DbConfig;

// ============================================================================
// Pipeline Configuration Constants
// ============================================================================

/// Default warehouse table holding the person/address source dataset.
pub const DEFAULT_SOURCE_TABLE: &str = "vf_nc_partial";

/// Default persistent address-status table targeted by reconciliation.
pub const DEFAULT_STATUS_TABLE: &str = "ncoa_address_statuses";

/// Fixed state code stamped onto every extracted record for this job.
pub const DEFAULT_STATE_CODE: &str = "NC";

/// Default S3 region.
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Default S3 bucket for request/response staging files.
pub const DEFAULT_S3_BUCKET: &str = "ncoa_data";

/// Default fixture file backing the simulated verification adapter.
pub const DEFAULT_FIXTURE_PATH: &str = "sample_ncoa_output.csv";

/// Default overall job deadline in seconds.
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 1800;

/// Verification adapter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    /// Fixture-backed simulation (live NCOA access not yet provisioned)
    #[default]
    Simulated,
    /// Real third-party service
    Live,
}

impl std::str::FromStr for VerifyMode {
    type Err = NcoaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simulated" | "sim" | "test" => Ok(VerifyMode::Simulated),
            "live" => Ok(VerifyMode::Live),
            other => Err(NcoaError::config(format!("Invalid verify mode: {}", other))),
        }
    }
}

/// Object storage configuration (separate identity from the warehouse)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("NCOA_S3_ENDPOINT").ok(),
            region: env::var("NCOA_S3_REGION").unwrap_or_else(|_| DEFAULT_S3_REGION.to_string()),
            bucket: env::var("NCOA_S3_BUCKET").unwrap_or_else(|_| DEFAULT_S3_BUCKET.to_string()),
            access_key: env::var("NCOA_S3_ACCESS_KEY")
                .or_else(|_| env::var("AWS_ACCESS_KEY_ID"))
                .unwrap_or_default(),
            secret_key: env::var("NCOA_S3_SECRET_KEY")
                .or_else(|_| env::var("AWS_SECRET_ACCESS_KEY"))
                .unwrap_or_default(),
            path_style: env::var("NCOA_S3_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

/// NCOA job-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NcoaConfig {
    /// Warehouse table to extract person/address rows from
    pub source_table: String,
    /// Persistent table reconciled into
    pub status_table: String,
    /// Fixed state code for this job's dataset
    pub state_code: String,
    /// Optional extraction row cap (dormant in production, chunking seam)
    pub query_limit: Option<i64>,
    /// Which verification adapter to construct
    pub verify_mode: VerifyMode,
    /// Fixture CSV for the simulated adapter
    pub fixture_path: String,
    /// Live service endpoint (required in live mode)
    pub api_url: Option<String>,
    /// Live service API key (required in live mode)
    pub api_key: Option<String>,
}

impl NcoaConfig {
    pub fn from_env() -> ncoa_common::Result<Self> {
        let verify_mode = match env::var("NCOA_VERIFY_MODE") {
            Ok(v) => v.parse()?,
            Err(_) => VerifyMode::default(),
        };

        Ok(Self {
            source_table: env::var("NCOA_SOURCE_TABLE")
                .unwrap_or_else(|_| DEFAULT_SOURCE_TABLE.to_string()),
            status_table: env::var("NCOA_STATUS_TABLE")
                .unwrap_or_else(|_| DEFAULT_STATUS_TABLE.to_string()),
            state_code: env::var("NCOA_STATE_CODE")
                .unwrap_or_else(|_| DEFAULT_STATE_CODE.to_string()),
            query_limit: env::var("NCOA_QUERY_LIMIT").ok().and_then(|s| s.parse().ok()),
            verify_mode,
            fixture_path: env::var("NCOA_FIXTURE_PATH")
                .unwrap_or_else(|_| DEFAULT_FIXTURE_PATH.to_string()),
            api_url: env::var("NCOA_API_URL").ok(),
            api_key: env::var("NCOA_API_KEY").ok(),
        })
    }
}

/// Job execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Overall deadline for one pipeline run
    pub timeout_secs: u64,
}

impl JobConfig {
    pub fn from_env() -> Self {
        Self {
            timeout_secs: env::var("NCOA_JOB_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_JOB_TIMEOUT_SECS),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub database: DbConfig,
    pub storage: StorageConfig,
    pub ncoa: NcoaConfig,
    pub job: JobConfig,
}

impl PipelineConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> ncoa_common::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database: DbConfig::from_env()?,
            storage: StorageConfig::from_env(),
            ncoa: NcoaConfig::from_env()?,
            job: JobConfig::from_env(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ncoa_common::Result<()> {
        if self.storage.bucket.is_empty() {
            return Err(NcoaError::config("S3 bucket cannot be empty"));
        }

        if !is_safe_table_name(&self.ncoa.source_table) {
            return Err(NcoaError::config(format!(
                "Source table name '{}' contains unsupported characters",
                self.ncoa.source_table
            )));
        }

        if !is_safe_table_name(&self.ncoa.status_table) {
            return Err(NcoaError::config(format!(
                "Status table name '{}' contains unsupported characters",
                self.ncoa.status_table
            )));
        }

        if self.ncoa.verify_mode == VerifyMode::Live
            && (self.ncoa.api_url.is_none() || self.ncoa.api_key.is_none())
        {
            return Err(NcoaError::config(
                "Live verify mode requires NCOA_API_URL and NCOA_API_KEY",
            ));
        }

        if self.job.timeout_secs == 0 {
            return Err(NcoaError::config("Job timeout must be greater than 0"));
        }

        Ok(())
    }
}

/// Table names are interpolated into SQL, so restrict them to
/// schema-qualified identifiers.
pub(crate) fn is_safe_table_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}
