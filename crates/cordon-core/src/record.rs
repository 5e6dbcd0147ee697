//! Canonical line and index-member codecs.
//!
//! Two pipe-delimited wire forms flow through the pipeline:
//!
//! - **Staging line** (plugin -> merger): `<start_int>|<end_int>|<tag_json>`.
//!   If the tag JSON itself contains `|`, the plugin wraps it `~...~` and the
//!   parser treats `~` as a quote character.
//! - **Index member** (loader -> store): `<start_int>|<end_int>|<payload_json>`
//!   stored in the sorted index at score `end_int`.
//!
//! The first two fields never contain `|`, so parsing splits on the first
//! two delimiters and takes the remainder verbatim.

use crate::error::{CoreError, Result};
use crate::tag::{Payload, Tag};

/// Header line of the merged intermediate file.
pub const MERGED_HEADER: &str = "start_int|end_int|list";

/// Quote character used when a tag JSON contains the field delimiter.
pub const QUOTE: char = '~';

/// One range as a feed plugin emits it: a closed interval plus its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRange {
    /// First covered address, inclusive
    pub start: u32,
    /// Last covered address, inclusive
    pub end: u32,
    /// The source's tag for this range
    pub tag: Tag,
}

impl SourceRange {
    /// Create a range, normalizing a reversed interval.
    #[must_use]
    pub fn new(start: u32, end: u32, tag: Tag) -> Self {
        if start <= end {
            Self { start, end, tag }
        } else {
            Self {
                start: end,
                end: start,
                tag,
            }
        }
    }

    /// Serialize to the canonical staging line (no trailing newline).
    #[must_use]
    pub fn to_line(&self) -> String {
        format_line(self.start, self.end, &self.tag.canonical())
    }

    /// Parse a canonical staging line.
    pub fn from_line(line: &str) -> Result<Self> {
        let (start, end, json) = split_line(line)?;
        Ok(Self {
            start,
            end,
            tag: Tag::from_json(&json)?,
        })
    }
}

/// One flattened interval as stored in the index: a closed interval plus the
/// grouped payload of every tag covering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalRecord {
    /// First covered address, inclusive
    pub start: u32,
    /// Last covered address, inclusive
    pub end: u32,
    /// Tags covering this interval, grouped by type
    pub payload: Payload,
}

impl IntervalRecord {
    /// The index score for this record.
    #[must_use]
    pub fn score(&self) -> u64 {
        u64::from(self.end)
    }

    /// Serialize to the index member string.
    #[must_use]
    pub fn to_member(&self) -> String {
        format_line(self.start, self.end, &self.payload.to_json())
    }

    /// Parse an index member string.
    pub fn from_member(member: &str) -> Result<Self> {
        let (start, end, json) = split_line(member)?;
        Ok(Self {
            start,
            end,
            payload: Payload::from_json(&json)?,
        })
    }

    /// Containment check for a lookup coordinate.
    #[must_use]
    pub fn contains(&self, q: u32) -> bool {
        self.start <= q && q <= self.end
    }
}

fn format_line(start: u32, end: u32, json: &str) -> String {
    if json.contains('|') {
        format!("{start}|{end}|{QUOTE}{json}{QUOTE}")
    } else {
        format!("{start}|{end}|{json}")
    }
}

/// Split a pipe-delimited line into `(start, end, json)`, honoring the `~`
/// quote around the JSON field.
fn split_line(line: &str) -> Result<(u32, u32, String)> {
    let malformed = |reason: &str| CoreError::Line {
        reason: reason.into(),
        line: truncate(line),
    };

    let mut parts = line.splitn(3, '|');
    let start = parts
        .next()
        .ok_or_else(|| malformed("missing start field"))?;
    let end = parts.next().ok_or_else(|| malformed("missing end field"))?;
    let rest = parts.next().ok_or_else(|| malformed("missing tag field"))?;

    let start: u32 = start
        .trim()
        .parse()
        .map_err(|_| malformed("start is not a u32"))?;
    let end: u32 = end
        .trim()
        .parse()
        .map_err(|_| malformed("end is not a u32"))?;

    let rest = rest.trim_end_matches(['\r', '\n']);
    let json = if rest.len() >= 2 && rest.starts_with(QUOTE) && rest.ends_with(QUOTE) {
        &rest[1..rest.len() - 1]
    } else {
        rest
    };

    Ok((start, end, json.to_string()))
}

fn truncate(line: &str) -> String {
    const MAX: usize = 120;
    if line.len() > MAX {
        format!("{}...", &line[..MAX])
    } else {
        line.to_string()
    }
}
