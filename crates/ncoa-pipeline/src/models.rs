//! Domain records exchanged between pipeline steps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One person/address row extracted from the warehouse.
///
/// Immutable once read. `address_line_2` is normalized to an empty string
/// at extraction time so the staged CSV never carries a null marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PersonAddressRecord {
    pub individual_id: String,
    pub first_name: String,
    pub last_name: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub address_city: String,
    pub address_state: String,
    pub address_zipcode: String,
}

/// One verification outcome, keyed by `individual_id`.
///
/// The address fields carry whatever the verification service delivered,
/// which may differ from the submitted address (the "moved" case).
/// `ncoa_status` is `None` when the service omitted this identity from its
/// response; a missing status is never fabricated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub individual_id: String,
    pub first_name: String,
    pub last_name: String,
    pub address_line_1: String,
    pub address_city: String,
    pub address_state: String,
    pub address_zipcode: String,
    pub ncoa_status: Option<String>,
}

/// One row of the persistent `ncoa_address_statuses` table.
///
/// The match key is `(vr_program_id, address_line_1, address_city,
/// address_zipcode, address_state)`, unique in the table. `last_updated`
/// advances only when `ncoa_status` actually changes;
/// `last_attempted_update` advances on every reconciliation that observes
/// the key. Rows are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AddressStatusRecord {
    pub vr_program_id: String,
    pub address_line_1: String,
    pub address_city: String,
    pub address_zipcode: String,
    pub address_state: String,
    pub first_name: String,
    pub last_name: String,
    pub ncoa_status: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub last_attempted_update: DateTime<Utc>,
}
