use crate::error::{ExtractorError, Result};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

/// Source record contract, embedded so strict validation needs no file I/O.
pub const USER_SCHEMA_JSON: &str = include_str!("../schemas/user.v1.json");

/// Column types the tabular encoders know how to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Utf8,
    Int64,
}

/// Output columns in encoding order. NDJSON key order and the columnar schema
/// both follow this list exactly.
pub const FIELDS: [(&str, FieldType); 24] = [
    ("gender", FieldType::Utf8),
    ("first_name", FieldType::Utf8),
    ("last_name", FieldType::Utf8),
    ("email", FieldType::Utf8),
    ("country", FieldType::Utf8),
    ("state", FieldType::Utf8),
    ("city", FieldType::Utf8),
    ("postcode", FieldType::Utf8),
    ("street_number", FieldType::Int64),
    ("street_name", FieldType::Utf8),
    ("phone", FieldType::Utf8),
    ("cell", FieldType::Utf8),
    ("nat", FieldType::Utf8),
    ("dob", FieldType::Utf8),
    ("age", FieldType::Int64),
    ("registered_date", FieldType::Utf8),
    ("registered_age", FieldType::Int64),
    ("uuid", FieldType::Utf8),
    ("username", FieldType::Utf8),
    ("picture_large", FieldType::Utf8),
    ("picture_medium", FieldType::Utf8),
    ("picture_thumbnail", FieldType::Utf8),
    ("id_name", FieldType::Utf8),
    ("id_value", FieldType::Utf8),
];

/// One flattened user record. Every field is independently nullable and the
/// declaration order is the serialized key order, kept in sync with [`FIELDS`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub gender: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub street_number: Option<i64>,
    pub street_name: Option<String>,
    pub phone: Option<String>,
    pub cell: Option<String>,
    pub nat: Option<String>,
    pub dob: Option<String>,
    pub age: Option<i64>,
    pub registered_date: Option<String>,
    pub registered_age: Option<i64>,
    pub uuid: Option<String>,
    pub username: Option<String>,
    pub picture_large: Option<String>,
    pub picture_medium: Option<String>,
    pub picture_thumbnail: Option<String>,
    pub id_name: Option<String>,
    pub id_value: Option<String>,
}

static USER_SCHEMA: OnceLock<JSONSchema> = OnceLock::new();

/// Compiled source-record schema. Compiled once on first use; the parsed
/// document is leaked because jsonschema 0.17 requires it to outlive the
/// compiled form.
pub fn user_schema() -> Result<&'static JSONSchema> {
    if let Some(schema) = USER_SCHEMA.get() {
        return Ok(schema);
    }
    let document: Value = serde_json::from_str(USER_SCHEMA_JSON)?;
    let document: &'static Value = Box::leak(Box::new(document));
    let compiled = JSONSchema::options()
        .compile(document)
        .map_err(|e| ExtractorError::Config(format!("user schema failed to compile: {}", e)))?;
    Ok(USER_SCHEMA.get_or_init(|| compiled))
}

/// Validation error summaries for a raw item; empty when the item conforms.
pub(crate) fn violations(schema: &JSONSchema, item: &Value) -> Vec<String> {
    match schema.validate(item) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|error| format!("{} at {}", error, error.instance_path))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialized_key_order_matches_field_table() {
        let line = serde_json::to_string(&NormalizedRecord::default()).unwrap();
        let expected = concat!(
            "{\"gender\":null,\"first_name\":null,\"last_name\":null,\"email\":null,",
            "\"country\":null,\"state\":null,\"city\":null,\"postcode\":null,",
            "\"street_number\":null,\"street_name\":null,\"phone\":null,\"cell\":null,",
            "\"nat\":null,\"dob\":null,\"age\":null,\"registered_date\":null,",
            "\"registered_age\":null,\"uuid\":null,\"username\":null,",
            "\"picture_large\":null,\"picture_medium\":null,\"picture_thumbnail\":null,",
            "\"id_name\":null,\"id_value\":null}"
        );
        assert_eq!(line, expected);

        // Same names, same order, as the column table.
        for (name, _) in FIELDS.iter() {
            assert!(line.contains(&format!("\"{}\":", name)));
        }
        assert_eq!(FIELDS.len(), 24);
    }

    #[test]
    fn embedded_schema_compiles() {
        assert!(user_schema().is_ok());
    }

    #[test]
    fn conforming_item_has_no_violations() {
        let item = json!({
            "gender": "male",
            "name": {"first": "John", "last": "Doe"},
            "email": "john@example.com",
            "location": {"city": "Bogota", "country": "CO", "postcode": 12345}
        });
        assert!(violations(user_schema().unwrap(), &item).is_empty());
    }

    #[test]
    fn mistyped_item_reports_violations() {
        let item = json!({
            "gender": "male",
            "name": "John Doe",
            "dob": {"date": "1991-02-02T04:05:31.963Z", "age": "thirty"}
        });
        let found = violations(user_schema().unwrap(), &item);
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|v| v.contains(" at /name")));
        assert!(found.iter().any(|v| v.contains(" at /dob/age")));
    }
}
