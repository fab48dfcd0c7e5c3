//! Live NCOA service adapter
//!
//! Placeholder for the real third-party integration. Constructing the
//! adapter is supported so configuration can be validated end to end, but
//! `verify` refuses to run until service access exists.

use async_trait::async_trait;
use tracing::warn;

use crate::models::{PersonAddressRecord, VerificationResult};

use super::{NcoaVerifier, VerifyError};

pub struct LiveNcoa {
    // TODO: submit the staged request file and poll for results once
    // TrueNCOA access is approved.
    #[allow(dead_code)]
    client: reqwest::Client,
    #[allow(dead_code)]
    api_url: String,
    #[allow(dead_code)]
    api_key: String,
}

impl LiveNcoa {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl NcoaVerifier for LiveNcoa {
    async fn verify(
        &self,
        _input: &[PersonAddressRecord],
    ) -> Result<Vec<VerificationResult>, VerifyError> {
        warn!("Live NCOA verification requested but service access is not provisioned");
        Err(VerifyError::NotProvisioned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_live_adapter_is_not_provisioned() {
        let verifier = LiveNcoa::new("https://api.truencoa.com", "key");
        let result = verifier.verify(&[]).await;
        assert!(matches!(result, Err(VerifyError::NotProvisioned)));
    }
}
