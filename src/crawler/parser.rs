//! HTML parser for the bucket listing table
//!
//! The listing page is a `table.table-bordered` whose rows carry the bucket
//! link in the second column and the file count in the third. Rows that do
//! not fit that shape are skipped silently.

use crate::record::BucketRecord;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use url::form_urlencoded;

const ROW_SELECTOR: &str = "table.table-bordered tbody tr";
const BUCKET_PARAM: &str = "bucket=";
const MIN_COLUMNS: usize = 4;

/// Row acceptance rules applied while parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFilter {
    /// Rows listing fewer files are dropped; equal is kept
    pub min_file_count: u64,

    /// Lower-cased keywords; a row is kept if its identity contains any
    keywords: Vec<String>,
}

impl ListingFilter {
    /// Creates a filter; keywords are matched case-insensitively
    ///
    /// An empty keyword (or an empty list) accepts every identity.
    pub fn new(min_file_count: u64, keywords: &[String]) -> Self {
        Self {
            min_file_count,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Filter that only applies the file-count threshold
    pub fn accept_all(min_file_count: u64) -> Self {
        Self {
            min_file_count,
            keywords: vec![String::new()],
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn matches_keywords(&self, identity: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let lowered = identity.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// A row that passed every filter, not yet checked against history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketCandidate {
    /// Decoded bucket reference
    pub identity: String,

    /// Parsed file count
    pub file_count: u64,
}

impl BucketCandidate {
    pub fn into_record(self, discovered_at: DateTime<Utc>) -> BucketRecord {
        BucketRecord::new(self.identity, self.file_count, discovered_at)
    }
}

/// Extracts bucket candidates from a listing page
///
/// # Row Rules
///
/// | Condition | Result |
/// |-----------|--------|
/// | Fewer than 4 columns | skipped |
/// | No link in column 2, or no `bucket=` in its href | skipped |
/// | `bucket=` value fails to decode | raw value used |
/// | Identity matches no keyword | skipped |
/// | File count below threshold | skipped |
///
/// Candidates come back in document order. Repeats within one page are kept;
/// deduplication happens at insert time.
///
/// # Example
///
/// ```
/// use s3eker::crawler::{parse_listing, ListingFilter};
///
/// let html = r#"<table class="table table-bordered"><tbody><tr>
///     <td>1</td><td><a href="/files?bucket=logs.s3.amazonaws.com">logs</a></td>
///     <td>2,500</td><td>aws</td>
/// </tr></tbody></table>"#;
/// let found = parse_listing(html, &ListingFilter::accept_all(1000));
/// assert_eq!(found[0].identity, "logs.s3.amazonaws.com");
/// assert_eq!(found[0].file_count, 2500);
/// ```
pub fn parse_listing(html: &str, filter: &ListingFilter) -> Vec<BucketCandidate> {
    let (Ok(row_selector), Ok(cell_selector), Ok(link_selector)) = (
        Selector::parse(ROW_SELECTOR),
        Selector::parse("td"),
        Selector::parse("a"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);

    document
        .select(&row_selector)
        .filter_map(|row| parse_row(row, &cell_selector, &link_selector, filter))
        .collect()
}

fn parse_row(
    row: ElementRef<'_>,
    cell_selector: &Selector,
    link_selector: &Selector,
    filter: &ListingFilter,
) -> Option<BucketCandidate> {
    let cells: Vec<ElementRef<'_>> = row.select(cell_selector).collect();
    if cells.len() < MIN_COLUMNS {
        return None;
    }

    let href = cells[1].select(link_selector).next()?.value().attr("href")?;
    let raw = extract_bucket_param(href)?;
    let identity = decode_bucket_param(raw);

    if !filter.matches_keywords(&identity) {
        tracing::trace!("Skipping {}: no keyword match", identity);
        return None;
    }

    let count_text: String = cells[2].text().collect();
    let file_count = parse_file_count(&count_text);
    if file_count < filter.min_file_count {
        tracing::trace!("Skipping {}: {} files", identity, file_count);
        return None;
    }

    Some(BucketCandidate {
        identity,
        file_count,
    })
}

/// Returns the text between `bucket=` and the next `&` (or the end)
///
/// `None` when the parameter is absent or empty.
pub fn extract_bucket_param(href: &str) -> Option<&str> {
    let start = href.find(BUCKET_PARAM)? + BUCKET_PARAM.len();
    let rest = &href[start..];
    let value = match rest.find('&') {
        Some(end) => &rest[..end],
        None => rest,
    };
    (!value.is_empty()).then_some(value)
}

/// Query-unescapes a bucket parameter (`+` is a space, `%XX` a byte)
///
/// A value with a malformed escape is returned unchanged.
pub fn decode_bucket_param(raw: &str) -> String {
    if !has_valid_escapes(raw) {
        tracing::debug!("Keeping undecodable bucket parameter as-is: {}", raw);
        return raw.to_string();
    }

    // Prefix a key so any '=' inside the value stays in the value
    let query = [b"v=".as_slice(), raw.as_bytes()].concat();
    form_urlencoded::parse(&query)
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| raw.to_string())
}

fn has_valid_escapes(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some(hex) if hex.iter().all(u8::is_ascii_hexdigit) => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

/// Parses a file count cell such as `"12,345"` or `"1,200 files"`
///
/// Falls back to the leading integer, then to zero. Negative values count as
/// zero.
pub fn parse_file_count(text: &str) -> u64 {
    let cleaned = text.replace(',', "");
    let cleaned = cleaned.trim();

    if let Ok(count) = cleaned.parse::<i64>() {
        return count.max(0) as u64;
    }

    leading_integer(cleaned)
}

fn leading_integer(text: &str) -> u64 {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    match digits[..end].parse::<u64>() {
        Ok(count) if !negative => count,
        _ => 0,
    }
}
