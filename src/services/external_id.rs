//! External id resolution.
//!
//! Every source invents its own identifier field; the catalog needs exactly
//! one stable id per (source, item). The probe order below is a contract:
//! changing it re-keys existing catalogs and turns updates into duplicates.

use serde_json::Value;

use crate::services::normalizer::item_field;

/// Candidate fields, probed in this exact order.
pub const EXTERNAL_ID_FIELDS: [&str; 4] = ["guid", "id", "link", "url"];

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("no external id: none of guid, id, link, url yielded a value")]
pub struct MissingExternalId;

/// Resolve the stable external id for a raw feed item: the first of
/// guid, id, link, url that extracts to a non-empty string.
pub fn resolve_external_id(item: &Value) -> Result<String, MissingExternalId> {
    EXTERNAL_ID_FIELDS
        .iter()
        .map(|field| item_field(item, field))
        .find(|text| !text.is_empty())
        .ok_or(MissingExternalId)
}
