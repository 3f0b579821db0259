//! MongoDB source client and BSON field rendering.
//!
//! Wraps the official driver behind the few operations migration needs:
//! connect, ping, list collection names, and fetch a whole collection.
//! Field rendering turns schemaless BSON values into the flat text form
//! the target hash representation requires: scalars render as text,
//! nested arrays and objects serialize to a JSON blob.

use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Database};
use tracing::debug;

/// A connected document source: one database of one MongoDB deployment.
pub struct DocumentSource {
    db: Database,
}

impl DocumentSource {
    /// Connect to a MongoDB deployment and bind the named database.
    pub async fn connect(uri: &str, database: &str) -> mongodb::error::Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self {
            db: client.database(database),
        })
    }

    /// Round-trip health check.
    pub async fn ping(&self) -> mongodb::error::Result<()> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    /// Names of all collections in the bound database.
    pub async fn collection_names(&self) -> mongodb::error::Result<Vec<String>> {
        self.db.list_collection_names(None).await
    }

    /// Fetch every document of a collection. There is no paging contract
    /// on the source side; the whole collection is materialized per call.
    pub async fn find_all(&self, collection: &str) -> mongodb::error::Result<Vec<Document>> {
        debug!(collection, "fetching all documents");
        let mut cursor = self.db.collection::<Document>(collection).find(None, None).await?;
        let mut docs = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            docs.push(document);
        }
        Ok(docs)
    }
}

// ----------------------------------------------------------------------
// Field rendering
// ----------------------------------------------------------------------

/// Stringify the document's `_id`. Missing ids render as the empty
/// string, matching how the synthesized key is built.
pub fn document_id(document: &Document) -> String {
    document.get("_id").map(render_scalar).unwrap_or_default()
}

/// The document's remaining fields after `_id` exclusion, stringified,
/// in document order.
pub fn document_fields(document: &Document) -> Vec<(String, String)> {
    document
        .iter()
        .filter(|(name, _)| name.as_str() != "_id")
        .map(|(name, value)| (name.clone(), render_field(value)))
        .collect()
}

/// Render one field value: nested structure becomes a JSON blob, anything
/// else renders as a scalar.
pub fn render_field(value: &Bson) -> String {
    match value {
        Bson::Array(_) | Bson::Document(_) => {
            let json: serde_json::Value = value.clone().into_relaxed_extjson();
            json.to_string()
        }
        scalar => render_scalar(scalar),
    }
}

/// Render a scalar BSON value as plain text.
fn render_scalar(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        Bson::Double(f) => f.to_string(),
        Bson::Boolean(b) => b.to_string(),
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .unwrap_or_else(|_| dt.to_string()),
        Bson::Decimal128(d) => d.to_string(),
        Bson::Null => "null".to_string(),
        other => other.clone().into_relaxed_extjson().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn test_document_id_object_id() {
        let oid = ObjectId::parse_str("5f1a2b3c4d5e6f7a8b9c0d1e").unwrap();
        let d = doc! { "_id": oid, "title": "Hi" };
        assert_eq!(document_id(&d), "5f1a2b3c4d5e6f7a8b9c0d1e");
    }

    #[test]
    fn test_document_id_plain_string() {
        let d = doc! { "_id": "5f1", "title": "Hi" };
        assert_eq!(document_id(&d), "5f1");
    }

    #[test]
    fn test_document_id_missing() {
        let d = doc! { "title": "Hi" };
        assert_eq!(document_id(&d), "");
    }

    #[test]
    fn test_fields_exclude_id_preserve_order() {
        let d = doc! { "_id": "1", "title": "Hi", "age": 30i32 };
        let fields = document_fields(&d);
        assert_eq!(
            fields,
            vec![
                ("title".to_string(), "Hi".to_string()),
                ("age".to_string(), "30".to_string()),
            ]
        );
    }

    #[test]
    fn test_fields_empty_after_exclusion() {
        let d = doc! { "_id": "1" };
        assert!(document_fields(&d).is_empty());
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(render_field(&Bson::Int64(7)), "7");
        assert_eq!(render_field(&Bson::Boolean(true)), "true");
        assert_eq!(render_field(&Bson::Double(1.5)), "1.5");
        assert_eq!(render_field(&Bson::Null), "null");
    }

    #[test]
    fn test_render_nested_array_as_json() {
        let value = Bson::Array(vec![Bson::String("a".into()), Bson::String("b".into())]);
        assert_eq!(render_field(&value), r#"["a","b"]"#);
    }

    #[test]
    fn test_render_nested_document_as_json() {
        let value = Bson::Document(doc! { "x": 1i32 });
        assert_eq!(render_field(&value), r#"{"x":1}"#);
    }
}
