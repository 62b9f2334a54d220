use crate::error::Result;
use crate::schema::{user_schema, NormalizedRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use jsonschema::JSONSchema;
use serde_json::Value;
use tracing::{debug, warn};

/// Record validation policy, selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Validate each raw item against the published schema, drop failures.
    Strict,
    /// Flatten whatever arrives, nulling out fields that do not coerce.
    #[default]
    Lenient,
}

impl ValidationMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(ValidationMode::Strict),
            "lenient" => Some(ValidationMode::Lenient),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Strict => "strict",
            ValidationMode::Lenient => "lenient",
        }
    }
}

/// Safe nested lookup: walks `path` through nested objects, returning None as
/// soon as a step is missing or the current value is not an object.
pub fn get_in<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        match current {
            Value::Object(map) => current = map.get(*key)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Generic to-string coercion: scalars stringify, null and composites do not.
pub fn coerce_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Integer coercion: integers pass through, numeric-looking strings parse,
/// everything else is null. Floats fail on purpose so ages never round.
pub fn coerce_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Best-effort ISO-8601 canonicalization to UTC. Values that do not parse are
/// kept verbatim rather than dropped.
pub fn canonical_iso(value: Option<&Value>) -> Option<String> {
    let text = coerce_string(value)?;
    if text.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(&text) {
        Ok(parsed) => Some(
            parsed
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ),
        Err(_) => Some(text),
    }
}

/// Flattens raw feed items into the fixed output shape.
pub struct Normalizer {
    schema: Option<&'static JSONSchema>,
}

impl Normalizer {
    /// Strict mode compiles the record schema up front so a broken contract
    /// fails the run before any I/O happens.
    pub fn new(mode: ValidationMode) -> Result<Self> {
        let schema = match mode {
            ValidationMode::Strict => Some(user_schema()?),
            ValidationMode::Lenient => None,
        };
        Ok(Self { schema })
    }

    /// Flatten one raw item. Returns None when the item is not an object or,
    /// in strict mode, when it fails schema validation. Never fails the batch.
    pub fn normalize(&self, item: &Value) -> Option<NormalizedRecord> {
        if !item.is_object() {
            debug!("Skipping non-object item");
            return None;
        }

        if let Some(schema) = self.schema {
            let violations = crate::schema::violations(schema, item);
            if !violations.is_empty() {
                warn!("Dropping record that failed schema validation: {}", violations.join("; "));
                return None;
            }
        }

        Some(NormalizedRecord {
            gender: coerce_string(get_in(item, &["gender"])),
            first_name: coerce_string(get_in(item, &["name", "first"])),
            last_name: coerce_string(get_in(item, &["name", "last"])),
            email: coerce_string(get_in(item, &["email"])),
            country: coerce_string(get_in(item, &["location", "country"])),
            state: coerce_string(get_in(item, &["location", "state"])),
            city: coerce_string(get_in(item, &["location", "city"])),
            // The feed flips between numeric and string postcodes per record.
            postcode: coerce_string(get_in(item, &["location", "postcode"])),
            street_number: coerce_int(get_in(item, &["location", "street", "number"])),
            street_name: coerce_string(get_in(item, &["location", "street", "name"])),
            phone: coerce_string(get_in(item, &["phone"])),
            cell: coerce_string(get_in(item, &["cell"])),
            nat: coerce_string(get_in(item, &["nat"])),
            dob: canonical_iso(get_in(item, &["dob", "date"])),
            age: coerce_int(get_in(item, &["dob", "age"])),
            registered_date: canonical_iso(get_in(item, &["registered", "date"])),
            registered_age: coerce_int(get_in(item, &["registered", "age"])),
            uuid: coerce_string(get_in(item, &["login", "uuid"])),
            username: coerce_string(get_in(item, &["login", "username"])),
            picture_large: coerce_string(get_in(item, &["picture", "large"])),
            picture_medium: coerce_string(get_in(item, &["picture", "medium"])),
            picture_thumbnail: coerce_string(get_in(item, &["picture", "thumbnail"])),
            id_name: coerce_string(get_in(item, &["id", "name"])),
            id_value: coerce_string(get_in(item, &["id", "value"])),
        })
    }
}
