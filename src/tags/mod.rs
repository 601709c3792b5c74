//! Dimension keys and values used to group aggregates.
//!
//! A [`TagContext`] carries the ambient set of dimensions at the point a
//! measurement is recorded. Views project a context onto their column keys
//! to decide which aggregation row a value folds into.

use crate::core::{Result, SightlineError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum byte length for tag keys and values.
pub const MAX_TAG_LENGTH: usize = 255;

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (32..=126).contains(&b))
}

/// A validated dimension key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagKey(String);

impl TagKey {
    /// Creates a new TagKey after validation.
    ///
    /// Keys must be non-empty printable ASCII of at most
    /// [`MAX_TAG_LENGTH`] bytes.
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(SightlineError::invalid_name("TagKey cannot be empty"));
        }
        if name.len() > MAX_TAG_LENGTH {
            return Err(SightlineError::invalid_name(format!(
                "TagKey cannot exceed {} bytes, got {}",
                MAX_TAG_LENGTH,
                name.len()
            )));
        }
        if !is_printable_ascii(&name) {
            return Err(SightlineError::invalid_name(
                "TagKey must be printable ASCII",
            ));
        }
        Ok(TagKey(name))
    }

    /// Returns the string representation of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the inner string value.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated dimension value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagValue(String);

impl TagValue {
    /// Creates a new TagValue after validation.
    ///
    /// Values may be empty but must be printable ASCII of at most
    /// [`MAX_TAG_LENGTH`] bytes.
    pub fn new<S: Into<String>>(value: S) -> Result<Self> {
        let value = value.into();
        if value.len() > MAX_TAG_LENGTH {
            return Err(SightlineError::invalid_name(format!(
                "TagValue cannot exceed {} bytes, got {}",
                MAX_TAG_LENGTH,
                value.len()
            )));
        }
        if !is_printable_ascii(&value) {
            return Err(SightlineError::invalid_name(
                "TagValue must be printable ASCII",
            ));
        }
        Ok(TagValue(value))
    }

    /// Returns the string representation of the value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the inner string value.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single dimension key-value pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    /// The dimension key.
    pub key: TagKey,
    /// The dimension value.
    pub value: TagValue,
}

impl Tag {
    /// Creates a new tag from a key and value.
    pub fn new(key: TagKey, value: TagValue) -> Self {
        Tag { key, value }
    }
}

/// The set of dimensions active at the point a measurement is recorded.
///
/// Keys are unique and insertion order is irrelevant; iteration is in key
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagContext {
    tags: BTreeMap<TagKey, TagValue>,
}

impl TagContext {
    /// Returns an empty context.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a builder for assembling a context.
    pub fn builder() -> TagContextBuilder {
        TagContextBuilder::default()
    }

    /// Returns the value for a key, if present.
    pub fn get(&self, key: &TagKey) -> Option<&TagValue> {
        self.tags.get(key)
    }

    /// Returns the number of tags in the context.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns true if the context carries no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterates over the tags in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&TagKey, &TagValue)> {
        self.tags.iter()
    }
}

/// Builder for [`TagContext`].
#[derive(Debug, Default)]
pub struct TagContextBuilder {
    tags: BTreeMap<TagKey, TagValue>,
}

impl TagContextBuilder {
    /// Inserts a tag, replacing any existing value for the same key.
    pub fn put(mut self, key: TagKey, value: TagValue) -> Self {
        self.tags.insert(key, value);
        self
    }

    /// Removes the tag for a key if present.
    pub fn remove(mut self, key: &TagKey) -> Self {
        self.tags.remove(key);
        self
    }

    /// Builds the context.
    pub fn build(self) -> TagContext {
        TagContext { tags: self.tags }
    }
}
