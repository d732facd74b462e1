//! Scan record model.
//!
//! A record is created once per accepted scan and never mutated afterwards;
//! the history store hands out clones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::{classify, ContentTag};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: String,
    /// Decoded text exactly as the scanner produced it.
    pub payload: String,
    pub category: ContentTag,
    pub captured_at: DateTime<Utc>,
}

impl ScanRecord {
    /// Build a record for a fresh scan: new id, classification of the trimmed
    /// text, untouched payload, current time.
    pub fn capture(payload: String) -> Self {
        Self::capture_at(payload, Utc::now())
    }

    pub fn capture_at(payload: String, captured_at: DateTime<Utc>) -> Self {
        let category = classify(&payload);
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            category,
            captured_at,
        }
    }
}
