//! Source tags and interval payloads.
//!
//! A tag is the metadata a feed attaches to one of its ranges. Tags are
//! free-form JSON objects preserved opaquely end-to-end; only two fields are
//! semantically mandatory: `type` (the tag family, e.g. `list`, `cloud`,
//! `asn`) and `source` (which feed produced it). Everything else
//! (provider, service, region, scope, ...) rides along untouched, so adding
//! a new feed is a data change, not a schema change.
//!
//! Because the underlying map is key-sorted, a tag's serialized JSON is
//! canonical: two tags are the same tag iff their serialized forms are
//! byte-equal. The flattener relies on this for deduplication.

use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// A single source tag: a JSON object with mandatory `type` and `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag(Map<String, Value>);

impl Tag {
    /// Create a tag with the two mandatory fields.
    #[must_use]
    pub fn new(tag_type: impl Into<String>, source: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("type".into(), Value::String(tag_type.into()));
        map.insert("source".into(), Value::String(source.into()));
        Self(map)
    }

    /// Attach an additional field (builder style).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Build a tag from an arbitrary JSON value, validating the mandatory
    /// fields are present and are strings.
    pub fn from_value(value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(CoreError::Line {
                    reason: "tag is not a JSON object".into(),
                    line: other.to_string(),
                })
            }
        };
        for field in ["type", "source"] {
            if !map.get(field).is_some_and(Value::is_string) {
                return Err(CoreError::TagField {
                    field,
                    tag: Value::Object(map.clone()).to_string(),
                });
            }
        }
        Ok(Self(map))
    }

    /// Parse a tag from its serialized JSON form.
    pub fn from_json(s: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(s)?)
    }

    /// The tag's `type` field.
    #[must_use]
    pub fn tag_type(&self) -> &str {
        self.0
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The tag's `source` field.
    #[must_use]
    pub fn source(&self) -> &str {
        self.0
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Canonical serialized form; tag identity for dedup and counting.
    #[must_use]
    pub fn canonical(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// The tag object with its `type` field stripped, as stored in payloads.
    #[must_use]
    pub fn without_type(&self) -> Map<String, Value> {
        let mut map = self.0.clone();
        map.remove("type");
        map
    }
}

/// An interval payload: tag `type` -> ordered list of tag objects (with the
/// `type` field stripped). This is what a lookup returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Group a set of (already deduplicated) tags by their `type`.
    #[must_use]
    pub fn from_tags<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> Self {
        let mut grouped = Map::new();
        for tag in tags {
            let entry = grouped
                .entry(tag.tag_type().to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(list) = entry {
                list.push(Value::Object(tag.without_type()));
            }
        }
        Self(grouped)
    }

    /// Parse a payload from its serialized JSON form.
    pub fn from_json(s: &str) -> Result<Self> {
        match serde_json::from_str(s)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CoreError::Line {
                reason: "payload is not a JSON object".into(),
                line: other.to_string(),
            }),
        }
    }

    /// Serialized JSON form, as stored in the index member string.
    #[must_use]
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// True if no tag of any type is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The tag objects recorded under one type, if any.
    #[must_use]
    pub fn get(&self, tag_type: &str) -> Option<&Vec<Value>> {
        match self.0.get(tag_type) {
            Some(Value::Array(list)) => Some(list),
            _ => None,
        }
    }

    /// Append a tag object under a type; used when merging external DNSBL
    /// results into a lookup response.
    pub fn push(&mut self, tag_type: &str, tag: Map<String, Value>) {
        let entry = self
            .0
            .entry(tag_type.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = entry {
            list.push(Value::Object(tag));
        }
    }

    /// The underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}
