//! Semantics of transcoded write plans, checked against an in-memory
//! model of the target store.
//!
//! The model applies [`WriteOp`] sequences with the same semantics the
//! real target gives them (RPUSH appends, HSET upserts fields, SADD
//! unions, ZADD upserts member scores, DEL drops the key everywhere).

use std::collections::{BTreeSet, HashMap};

use ferrite_load::migrate::{index_ops, plan, SourceUnit, Value, WriteOp};

/// In-memory stand-in for the target store.
#[derive(Debug, Clone, Default, PartialEq)]
struct ModelStore {
    strings: HashMap<String, String>,
    lists: HashMap<String, Vec<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, BTreeSet<String>>,
    zsets: HashMap<String, HashMap<String, String>>,
    expiries: HashMap<String, i64>,
}

impl ModelStore {
    fn apply(&mut self, ops: &[WriteOp]) {
        for op in ops {
            match op {
                WriteOp::SetString { key, value } => {
                    self.strings.insert(key.clone(), value.clone());
                }
                WriteOp::DeleteKey { key } => self.del(key),
                WriteOp::AppendList { key, values } => {
                    self.lists
                        .entry(key.clone())
                        .or_default()
                        .extend(values.iter().cloned());
                }
                WriteOp::PopulateHash { key, fields } => {
                    let hash = self.hashes.entry(key.clone()).or_default();
                    for (field, value) in fields {
                        hash.insert(field.clone(), value.clone());
                    }
                }
                WriteOp::AddSetMembers { key, members } => {
                    self.sets
                        .entry(key.clone())
                        .or_default()
                        .extend(members.iter().cloned());
                }
                WriteOp::AddSortedSetMembers { key, members } => {
                    let zset = self.zsets.entry(key.clone()).or_default();
                    for (member, score) in members {
                        zset.insert(member.clone(), score.clone());
                    }
                }
                WriteOp::SetExpiry { key, seconds } => {
                    self.expiries.insert(key.clone(), *seconds);
                }
            }
        }
    }

    fn del(&mut self, key: &str) {
        self.strings.remove(key);
        self.lists.remove(key);
        self.hashes.remove(key);
        self.sets.remove(key);
        self.zsets.remove(key);
        self.expiries.remove(key);
    }
}

fn kv(key: &str, value: Value) -> SourceUnit {
    SourceUnit::Kv {
        key: key.into(),
        value,
        ttl_seconds: None,
    }
}

// ── Shape equality after apply ───────────────────────────────────────

#[test]
fn string_round_trips() {
    let mut store = ModelStore::default();
    store.apply(&plan(&kv("greeting", Value::Str("hello".into()))));
    assert_eq!(store.strings["greeting"], "hello");
    assert!(store.expiries.is_empty());
}

#[test]
fn list_round_trips_in_order() {
    let items = vec!["c".to_string(), "a".to_string(), "b".to_string()];
    let mut store = ModelStore::default();
    store.apply(&plan(&kv("queue", Value::List(items.clone()))));
    assert_eq!(store.lists["queue"], items);
}

#[test]
fn hash_round_trips_as_field_map() {
    let fields = vec![
        ("name".to_string(), "Ann".to_string()),
        ("age".to_string(), "30".to_string()),
    ];
    let mut store = ModelStore::default();
    store.apply(&plan(&kv("user:1", Value::Hash(fields))));

    let hash = &store.hashes["user:1"];
    assert_eq!(hash.len(), 2);
    assert_eq!(hash["name"], "Ann");
    assert_eq!(hash["age"], "30");
    assert!(store.expiries.is_empty());
}

#[test]
fn set_round_trips_as_member_set() {
    let mut store = ModelStore::default();
    store.apply(&plan(&kv(
        "tags",
        Value::Set(vec!["b".into(), "a".into()]),
    )));
    let expected: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
    assert_eq!(store.sets["tags"], expected);
}

#[test]
fn zset_round_trips_as_score_map() {
    let mut store = ModelStore::default();
    store.apply(&plan(&kv(
        "board",
        Value::SortedSet(vec![
            ("ann".into(), "1.5".into()),
            ("bob".into(), "2".into()),
        ]),
    )));
    let zset = &store.zsets["board"];
    assert_eq!(zset["ann"], "1.5");
    assert_eq!(zset["bob"], "2");
}

// ── Idempotence ──────────────────────────────────────────────────────

#[test]
fn applying_twice_equals_applying_once() {
    let units = [
        kv("l", Value::List(vec!["a".into(), "b".into()])),
        kv("h", Value::Hash(vec![("f".into(), "v".into())])),
        kv("s", Value::Set(vec!["m".into()])),
        kv("z", Value::SortedSet(vec![("m".into(), "1".into())])),
        SourceUnit::Document {
            collection: "posts".into(),
            document_id: "5f1".into(),
            fields: vec![("title".into(), "Hi".into())],
        },
    ];

    for unit in &units {
        let ops = plan(unit);

        let mut once = ModelStore::default();
        once.apply(&ops);

        let mut twice = ModelStore::default();
        twice.apply(&ops);
        twice.apply(&ops);

        assert_eq!(once, twice, "unit {:?} is not idempotent", unit);
    }
}

#[test]
fn rerun_over_partially_populated_target_does_not_duplicate() {
    // A crashed run left half the list behind.
    let mut store = ModelStore::default();
    store
        .lists
        .insert("queue".into(), vec!["a".into()]);

    store.apply(&plan(&kv(
        "queue",
        Value::List(vec!["a".into(), "b".into()]),
    )));
    assert_eq!(store.lists["queue"], vec!["a".to_string(), "b".to_string()]);
}

// ── TTL ──────────────────────────────────────────────────────────────

#[test]
fn positive_ttl_sets_exactly_that_expiry() {
    let unit = SourceUnit::Kv {
        key: "session".into(),
        value: Value::Str("tok".into()),
        ttl_seconds: Some(300),
    };
    let mut store = ModelStore::default();
    store.apply(&plan(&unit));
    assert_eq!(store.expiries["session"], 300);
}

#[test]
fn non_positive_ttl_never_sets_expiry() {
    for ttl in [Some(-2), Some(-1), Some(0), None] {
        let unit = SourceUnit::Kv {
            key: "k".into(),
            value: Value::Str("v".into()),
            ttl_seconds: ttl,
        };
        let mut store = ModelStore::default();
        store.apply(&plan(&unit));
        assert!(
            store.expiries.is_empty(),
            "ttl {:?} must not set an expiry",
            ttl
        );
    }
}

// ── Documents and the collection index ───────────────────────────────

#[test]
fn document_becomes_hash_plus_index_member() {
    // {_id: "5f1", title: "Hi", tags: ["a","b"]} in collection `posts`,
    // fields already stringified by the enumerator.
    let unit = SourceUnit::Document {
        collection: "posts".into(),
        document_id: "5f1".into(),
        fields: vec![
            ("title".into(), "Hi".into()),
            ("tags".into(), r#"["a","b"]"#.into()),
        ],
    };

    let mut store = ModelStore::default();
    store.apply(&plan(&unit));
    store.apply(&index_ops("posts", &[unit.target_key()]));

    let hash = &store.hashes["posts:5f1"];
    assert_eq!(hash.len(), 2);
    assert_eq!(hash["title"], "Hi");
    assert_eq!(hash["tags"], r#"["a","b"]"#);
    assert!(store.sets["_index:posts"].contains("posts:5f1"));
}

#[test]
fn empty_document_joins_index_without_hash() {
    let unit = SourceUnit::Document {
        collection: "posts".into(),
        document_id: "5f2".into(),
        fields: vec![],
    };

    let mut store = ModelStore::default();
    store.apply(&plan(&unit));
    store.apply(&index_ops("posts", &[unit.target_key()]));

    assert!(!store.hashes.contains_key("posts:5f2"));
    assert!(store.sets["_index:posts"].contains("posts:5f2"));
}

#[test]
fn index_rebuild_drops_stale_members() {
    let mut store = ModelStore::default();
    store
        .sets
        .entry("_index:posts".into())
        .or_default()
        .insert("posts:stale".into());

    store.apply(&index_ops("posts", &["posts:5f1".to_string()]));

    let index = &store.sets["_index:posts"];
    assert!(!index.contains("posts:stale"));
    assert!(index.contains("posts:5f1"));
}

// ── Empty payloads ───────────────────────────────────────────────────

#[test]
fn empty_collection_values_write_nothing() {
    let mut store = ModelStore::default();
    for value in [
        Value::List(vec![]),
        Value::Hash(vec![]),
        Value::Set(vec![]),
        Value::SortedSet(vec![]),
    ] {
        store.apply(&plan(&kv("k", value)));
    }
    assert_eq!(store, ModelStore::default());
}
