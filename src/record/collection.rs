use crate::record::BucketRecord;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Description written into every checkpoint
pub const COLLECTION_DESCRIPTION: &str = "Merged and deduplicated buckets from scraping sessions";

/// Persisted checkpoint document
///
/// Older checkpoints may omit the metadata fields, so everything except the
/// record list defaults when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCollection {
    /// When the checkpoint was written
    #[serde(
        rename = "last_updated",
        alias = "lastUpdated",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<DateTime<Utc>>,

    /// Number of records, always equal to `records.len()` when written by us
    #[serde(rename = "total_buckets", alias = "totalCount", default)]
    pub total_count: usize,

    /// Free-form description of the document
    #[serde(default)]
    pub description: String,

    /// Records in discovery order
    #[serde(rename = "buckets", alias = "records", default)]
    pub records: Vec<BucketRecord>,
}

impl BucketCollection {
    /// Builds a collection snapshot stamped at `now`
    pub fn new(records: Vec<BucketRecord>, now: DateTime<Utc>) -> Self {
        Self {
            last_updated: Some(now.trunc_subsecs(0)),
            total_count: records.len(),
            description: COLLECTION_DESCRIPTION.to_string(),
            records,
        }
    }
}
