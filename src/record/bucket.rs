//! Bucket record definition
//!
//! A record is created once per newly discovered bucket and never mutated.
//! Records loaded from older checkpoints may carry values this tool would
//! never write, so loading is lenient: such values are normalized or kept
//! verbatim instead of rejecting the record.
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// When a bucket was first seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryTime {
    /// A valid RFC 3339 timestamp
    At(DateTime<Utc>),

    /// Text from a checkpoint that is not RFC 3339, written back unchanged
    Verbatim(String),
}

impl DiscoveryTime {
    /// Parses RFC 3339 text; anything else is kept as-is
    pub fn parse(text: &str) -> Self {
        match DateTime::parse_from_rfc3339(text.trim()) {
            Ok(at) => Self::At(at.with_timezone(&Utc)),
            Err(_) => Self::Verbatim(text.to_string()),
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(at) => Some(*at),
            Self::Verbatim(_) => None,
        }
    }
}

impl Default for DiscoveryTime {
    fn default() -> Self {
        Self::Verbatim(String::new())
    }
}

impl Serialize for DiscoveryTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::At(at) => serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Verbatim(text) => serializer.serialize_str(text),
        }
    }
}

/// One discovered bucket
///
/// Two records with the same `identity` are the same logical bucket, even if
/// their file counts differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRecord {
    /// Decoded bucket reference, the deduplication key
    #[serde(rename = "full_bucket_url", alias = "identity")]
    identity: String,

    /// Number of files listed for the bucket at discovery time
    #[serde(
        rename = "file_count",
        alias = "fileCount",
        default,
        deserialize_with = "deserialize_file_count"
    )]
    file_count: u64,

    /// When the bucket was first seen
    #[serde(
        rename = "scraped_at",
        alias = "discoveredAt",
        default,
        deserialize_with = "deserialize_discovery_time"
    )]
    discovered_at: DiscoveryTime,
}

impl BucketRecord {
    /// Creates a record; the timestamp is truncated to whole seconds
    pub fn new(identity: impl Into<String>, file_count: u64, discovered_at: DateTime<Utc>) -> Self {
        Self {
            identity: identity.into(),
            file_count,
            discovered_at: DiscoveryTime::At(discovered_at.trunc_subsecs(0)),
        }
    }

    /// Creates a record stamped with the current time
    pub fn discovered_now(identity: impl Into<String>, file_count: u64) -> Self {
        Self::new(identity, file_count, Utc::now())
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn file_count(&self) -> u64 {
        self.file_count
    }

    /// Discovery time, or `None` if the checkpoint held unparseable text
    pub fn discovered_at(&self) -> Option<DateTime<Utc>> {
        self.discovered_at.as_datetime()
    }

    pub fn discovery_time(&self) -> &DiscoveryTime {
        &self.discovered_at
    }
}

/// Accepts signed, fractional, or textual counts; negatives clamp to 0
fn deserialize_file_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
            (Some(count), _, _) => count,
            (None, Some(_), _) => 0,
            (None, None, Some(f)) if f > 0.0 => f as u64,
            _ => 0,
        },
        Some(Value::String(text)) => text
            .replace(',', "")
            .trim()
            .parse::<i64>()
            .map(|count| count.max(0) as u64)
            .unwrap_or(0),
        _ => 0,
    })
}

/// Accepts any timestamp text; null becomes an empty value
fn deserialize_discovery_time<'de, D>(deserializer: D) -> Result<DiscoveryTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(text)) => DiscoveryTime::parse(&text),
        Some(Value::Null) | None => DiscoveryTime::default(),
        Some(other) => DiscoveryTime::Verbatim(other.to_string()),
    })
}
