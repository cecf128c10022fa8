//! Record types for discovered buckets
//!
//! - `BucketRecord`: one discovered bucket, keyed by its decoded identity
//! - `DiscoveryTime`: a record's timestamp, kept verbatim when unparseable
//! - `BucketCollection`: the persisted checkpoint document wrapping the records

mod bucket;
mod collection;

// Re-export main types
pub use bucket::{BucketRecord, DiscoveryTime};
pub use collection::{BucketCollection, COLLECTION_DESCRIPTION};
