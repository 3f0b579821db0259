//! Type-dispatched transcoding of source units into target write plans.
//!
//! The transcoder is a pure function from one [`SourceUnit`] to the ordered
//! sequence of primitive writes that reproduces it on the target. For
//! collection shapes it always deletes the target key before repopulating,
//! so re-running a migration against a partially populated target never
//! appends duplicates. That rule is what makes the whole tool safe to
//! re-run from the top after a crash.

use super::unit::{SourceUnit, Value};

/// One idempotent primitive applied to the target store.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// `SET key value`
    SetString { key: String, value: String },
    /// `DEL key`
    DeleteKey { key: String },
    /// `RPUSH key value...`
    AppendList { key: String, values: Vec<String> },
    /// `HSET key field value...`
    PopulateHash {
        key: String,
        fields: Vec<(String, String)>,
    },
    /// `SADD key member...`
    AddSetMembers { key: String, members: Vec<String> },
    /// `ZADD key score member...` — scores carried as opaque text.
    AddSortedSetMembers {
        key: String,
        members: Vec<(String, String)>,
    },
    /// `EXPIRE key seconds`
    SetExpiry { key: String, seconds: i64 },
}

/// Plan the ordered write sequence that reproduces `unit` on the target.
///
/// Empty collection payloads plan to nothing: an empty list/hash/set/zset
/// at the source yields no key at the target. This mirrors the fact that
/// the target store has no representation for an empty collection — a
/// known limitation, not an error.
pub fn plan(unit: &SourceUnit) -> Vec<WriteOp> {
    match unit {
        SourceUnit::Kv {
            key,
            value,
            ttl_seconds,
        } => plan_kv(key, value, *ttl_seconds),
        SourceUnit::Document {
            collection,
            document_id,
            fields,
        } => {
            if fields.is_empty() {
                return Vec::new();
            }
            vec![WriteOp::PopulateHash {
                key: format!("{}:{}", collection, document_id),
                fields: fields.clone(),
            }]
        }
    }
}

fn plan_kv(key: &str, value: &Value, ttl_seconds: Option<i64>) -> Vec<WriteOp> {
    if value.is_empty() {
        return Vec::new();
    }

    let mut ops = match value {
        Value::Str(s) => vec![WriteOp::SetString {
            key: key.to_string(),
            value: s.clone(),
        }],
        Value::List(items) => vec![
            WriteOp::DeleteKey {
                key: key.to_string(),
            },
            WriteOp::AppendList {
                key: key.to_string(),
                values: items.clone(),
            },
        ],
        Value::Hash(fields) => vec![
            WriteOp::DeleteKey {
                key: key.to_string(),
            },
            WriteOp::PopulateHash {
                key: key.to_string(),
                fields: fields.clone(),
            },
        ],
        Value::Set(members) => vec![
            WriteOp::DeleteKey {
                key: key.to_string(),
            },
            WriteOp::AddSetMembers {
                key: key.to_string(),
                members: members.clone(),
            },
        ],
        Value::SortedSet(pairs) => vec![
            WriteOp::DeleteKey {
                key: key.to_string(),
            },
            WriteOp::AddSortedSetMembers {
                key: key.to_string(),
                members: dedup_last_score(pairs),
            },
        ],
    };

    // Expiry only applies to strings; the probe is not taken for other
    // shapes, and a non-positive TTL means the key is persistent.
    if matches!(value, Value::Str(_)) {
        if let Some(ttl) = ttl_seconds {
            if ttl > 0 {
                ops.push(WriteOp::SetExpiry {
                    key: key.to_string(),
                    seconds: ttl,
                });
            }
        }
    }

    ops
}

/// Ops that rebuild one collection's index set wholesale: delete the old
/// index, then add every synthesized key for that collection. Called once
/// per collection after all of its documents are written; empty
/// collections get no index.
pub fn index_ops(collection: &str, keys: &[String]) -> Vec<WriteOp> {
    if keys.is_empty() {
        return Vec::new();
    }
    let index_key = format!("_index:{}", collection);
    vec![
        WriteOp::DeleteKey {
            key: index_key.clone(),
        },
        WriteOp::AddSetMembers {
            key: index_key,
            members: keys.to_vec(),
        },
    ]
}

/// Collapse duplicate sorted-set members, keeping first-seen position and
/// the last score observed. The source client should never hand us
/// duplicates, but if it does the target must still end up with one entry
/// per member.
fn dedup_last_score(pairs: &[(String, String)]) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(pairs.len());
    for (member, score) in pairs {
        if let Some(existing) = out.iter_mut().find(|(m, _)| m == member) {
            existing.1 = score.clone();
        } else {
            out.push((member.clone(), score.clone()));
        }
    }
    out
}
