//! # Entity
//!
//! A source record: one deal id and the ordered payload records that should
//! be written against it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Accept an id as either a JSON number or a string
///
/// Upstream datasets carry numeric ids (`"Id": 401234`) while reconciled
/// snapshots and hand-built fixtures tend to carry strings. Both normalize to
/// the decimal string form used in rendered statements.
fn deserialize_entity_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value: Value = Deserialize::deserialize(deserializer)?;

    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "Entity id must be a number or a string, got {other}"
        ))),
    }
}

/// A null or missing payload is treated the same as an empty one
fn deserialize_payload<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let payload: Option<Vec<Value>> = Deserialize::deserialize(deserializer)?;
    Ok(payload.unwrap_or_default())
}

/// Raw entity record as it appears in the dataset
///
/// # Example
/// ```json
/// {
///   "Id": 401234,
///   "Title": "Retrofit - Filial Norte",
///   "Products": [
///     { "product_name": "Compressor 5HP", "quantity": 2 }
///   ]
/// }
/// ```
///
/// Fields other than the id and payload are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(alias = "Id", default, deserialize_with = "deserialize_entity_id")]
    pub id: String,

    #[serde(
        alias = "Products",
        default,
        deserialize_with = "deserialize_payload"
    )]
    pub payload: Vec<Value>,
}

impl Entity {
    pub fn new(id: impl Into<String>, payload: Vec<Value>) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    /// Only entities with a non-empty payload take part in a run
    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_dataset_shape() {
        let entity: Entity = serde_json::from_value(json!({
            "Id": 401234,
            "Title": "ignored",
            "Products": [{"product_name": "Compressor", "quantity": 2}]
        }))
        .unwrap();

        assert_eq!(entity.id, "401234");
        assert_eq!(entity.payload.len(), 1);
        assert!(entity.has_payload());
    }

    #[test]
    fn test_deserialize_string_id_and_lowercase_fields() {
        let entity: Entity =
            serde_json::from_value(json!({"id": "77", "payload": [1, 2]})).unwrap();
        assert_eq!(entity.id, "77");
        assert_eq!(entity.payload, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_null_or_missing_payload_is_empty() {
        let null_products: Entity =
            serde_json::from_value(json!({"Id": 1, "Products": null})).unwrap();
        let missing_products: Entity = serde_json::from_value(json!({"Id": 2})).unwrap();

        assert!(!null_products.has_payload());
        assert!(!missing_products.has_payload());
    }

    #[test]
    fn test_missing_id_key_is_empty() {
        let entity: Entity =
            serde_json::from_value(json!({"Title": "no id", "Products": [1]})).unwrap();
        assert_eq!(entity.id, "");
        assert!(entity.has_payload());
    }

    #[test]
    fn test_rejects_object_id() {
        let result: Result<Entity, _> =
            serde_json::from_value(json!({"Id": {"nested": true}, "Products": []}));
        assert!(result.is_err());
    }
}
