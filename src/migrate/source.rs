//! Source enumeration: listing transferable units and materializing
//! their payloads.
//!
//! Enumeration is single-pass and non-restartable. Key-value mode takes
//! two round trips per key (type probe, then the shape-specific read)
//! plus a TTL probe for strings. Document mode materializes one whole
//! collection per call.

use tracing::debug;

use super::progress::UnitError;
use super::unit::{Shape, SourceUnit, Value};
use super::{MigrateError, Result};
use crate::client::KvClient;
use crate::mongo::{self, DocumentSource};

/// List every key the run will consider.
///
/// A failure here is fatal: without the key list there is nothing to
/// migrate.
pub async fn list_keys(source: &mut KvClient, pattern: &str) -> Result<Vec<String>> {
    source
        .keys(pattern)
        .await
        .map_err(|e| MigrateError::Enumeration(format!("KEYS {}: {}", pattern, e)))
}

/// Probe one key's shape and materialize its payload.
///
/// Returns `Ok(None)` for keys whose payload is an empty collection:
/// those are skipped before they count as attempted. A shape the
/// transcoder cannot reproduce, a key that vanished between listing and
/// reading, or a failed read all surface as per-unit errors; the run
/// continues past them.
pub async fn fetch_kv_unit(
    source: &mut KvClient,
    key: &str,
) -> std::result::Result<Option<SourceUnit>, UnitError> {
    let type_reply = source
        .key_type(key)
        .await
        .map_err(|e| unit_err(key, format!("TYPE: {}", e)))?;
    let Some(shape) = Shape::from_type_reply(&type_reply) else {
        return Err(unit_err(
            key,
            format!("unsupported source type '{}'", type_reply),
        ));
    };

    let (value, ttl_seconds) = match shape {
        Shape::String => {
            let value = source
                .get(key)
                .await
                .map_err(|e| unit_err(key, format!("GET: {}", e)))?
                .ok_or_else(|| unit_err(key, "key disappeared during enumeration".into()))?;
            let ttl = source
                .ttl(key)
                .await
                .map_err(|e| unit_err(key, format!("TTL: {}", e)))?;
            (Value::Str(value), Some(ttl))
        }
        Shape::List => {
            let items = source
                .lrange_all(key)
                .await
                .map_err(|e| unit_err(key, format!("LRANGE: {}", e)))?;
            (Value::List(items), None)
        }
        Shape::Hash => {
            let fields = source
                .hgetall(key)
                .await
                .map_err(|e| unit_err(key, format!("HGETALL: {}", e)))?;
            (Value::Hash(fields), None)
        }
        Shape::Set => {
            let members = source
                .smembers(key)
                .await
                .map_err(|e| unit_err(key, format!("SMEMBERS: {}", e)))?;
            (Value::Set(members), None)
        }
        Shape::SortedSet => {
            let pairs = source
                .zrange_all_withscores(key)
                .await
                .map_err(|e| unit_err(key, format!("ZRANGE: {}", e)))?;
            (Value::SortedSet(pairs), None)
        }
    };

    if value.is_empty() {
        debug!(key, shape = %shape, "skipping empty collection value");
        return Ok(None);
    }

    Ok(Some(SourceUnit::Kv {
        key: key.to_string(),
        value,
        ttl_seconds,
    }))
}

/// Fetch every document of one collection as source units, `_id`
/// extracted and excluded, remaining fields stringified.
pub async fn fetch_document_units(
    source: &DocumentSource,
    collection: &str,
) -> Result<Vec<SourceUnit>> {
    let docs = source
        .find_all(collection)
        .await
        .map_err(|e| MigrateError::Enumeration(format!("collection '{}': {}", collection, e)))?;

    Ok(docs
        .iter()
        .map(|document| SourceUnit::Document {
            collection: collection.to_string(),
            document_id: mongo::document_id(document),
            fields: mongo::document_fields(document),
        })
        .collect())
}

fn unit_err(key: &str, message: String) -> UnitError {
    UnitError {
        unit: key.to_string(),
        message,
    }
}
