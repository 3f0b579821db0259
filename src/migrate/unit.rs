//! Source-side data model: one transferable unit and its decoded payload.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The structural kind of a key-value record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    /// Plain string value
    String,
    /// Ordered list of strings
    List,
    /// Field → value map
    Hash,
    /// Unordered member set
    Set,
    /// Member → score map, ordered by score
    SortedSet,
}

impl Shape {
    /// Map a `TYPE` reply onto a shape. Returns `None` for anything the
    /// transcoder does not know how to reproduce (streams, modules, ...).
    pub fn from_type_reply(reply: &str) -> Option<Shape> {
        match reply {
            "string" => Some(Shape::String),
            "list" => Some(Shape::List),
            "hash" => Some(Shape::Hash),
            "set" => Some(Shape::Set),
            "zset" => Some(Shape::SortedSet),
            _ => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::String => write!(f, "string"),
            Shape::List => write!(f, "list"),
            Shape::Hash => write!(f, "hash"),
            Shape::Set => write!(f, "set"),
            Shape::SortedSet => write!(f, "zset"),
        }
    }
}

/// A decoded source value, tagged by shape.
///
/// Payloads are never carried as untyped blobs: every variant holds the
/// fully decoded form the transcoder dispatches on. Sorted-set scores stay
/// opaque text all the way through; the source treats them as key-value
/// pairs and the target parses them on `ZADD`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A single string.
    Str(String),
    /// An ordered sequence of elements.
    List(Vec<String>),
    /// Field/value pairs in source order.
    Hash(Vec<(String, String)>),
    /// Set members; order is whatever the source returned.
    Set(Vec<String>),
    /// (member, score) pairs in source rank order.
    SortedSet(Vec<(String, String)>),
}

impl Value {
    /// The shape this payload decodes.
    pub fn shape(&self) -> Shape {
        match self {
            Value::Str(_) => Shape::String,
            Value::List(_) => Shape::List,
            Value::Hash(_) => Shape::Hash,
            Value::Set(_) => Shape::Set,
            Value::SortedSet(_) => Shape::SortedSet,
        }
    }

    /// Whether the payload holds no elements.
    ///
    /// A string is never empty in this sense: an empty string is still a
    /// real value that must reach the target. Only collection shapes can
    /// be empty, and empty collections produce no target writes.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Str(_) => false,
            Value::List(items) => items.is_empty(),
            Value::Hash(fields) => fields.is_empty(),
            Value::Set(members) => members.is_empty(),
            Value::SortedSet(pairs) => pairs.is_empty(),
        }
    }
}

/// One source-side record to be migrated.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceUnit {
    /// A key from the key-value source.
    Kv {
        /// The source key, reused verbatim as the target key.
        key: String,
        /// Decoded payload.
        value: Value,
        /// Raw TTL probe result. `None` for shapes where the probe is not
        /// taken; a non-positive value means no expiry.
        ttl_seconds: Option<i64>,
    },
    /// A document from the document source.
    Document {
        /// Source collection name.
        collection: String,
        /// Stringified `_id`.
        document_id: String,
        /// Remaining fields after `_id` exclusion, stringified, in
        /// document order.
        fields: Vec<(String, String)>,
    },
}

impl SourceUnit {
    /// The key this unit materializes under on the target. Documents are
    /// synthesized as `{collection}:{document_id}`; keys pass through.
    /// Also used as the unit identifier in error reports.
    pub fn target_key(&self) -> String {
        match self {
            SourceUnit::Kv { key, .. } => key.clone(),
            SourceUnit::Document {
                collection,
                document_id,
                ..
            } => format!("{}:{}", collection, document_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_from_type_reply() {
        assert_eq!(Shape::from_type_reply("string"), Some(Shape::String));
        assert_eq!(Shape::from_type_reply("zset"), Some(Shape::SortedSet));
        assert_eq!(Shape::from_type_reply("stream"), None);
        assert_eq!(Shape::from_type_reply("none"), None);
    }

    #[test]
    fn test_empty_string_is_not_empty() {
        assert!(!Value::Str(String::new()).is_empty());
    }

    #[test]
    fn test_empty_collections() {
        assert!(Value::List(vec![]).is_empty());
        assert!(Value::Hash(vec![]).is_empty());
        assert!(Value::Set(vec![]).is_empty());
        assert!(Value::SortedSet(vec![]).is_empty());
        assert!(!Value::List(vec!["a".into()]).is_empty());
    }

    #[test]
    fn test_document_target_key() {
        let unit = SourceUnit::Document {
            collection: "posts".into(),
            document_id: "5f1".into(),
            fields: vec![],
        };
        assert_eq!(unit.target_key(), "posts:5f1");
    }
}
