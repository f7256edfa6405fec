//! Bounded, scalar-only notification metadata.
//!
//! Callers may attach a small key/value map to a send request. Values are
//! restricted to strings, integers, floats and booleans so the stored payload
//! has a fixed, reproducible shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum number of metadata entries per request.
pub const MAX_ENTRIES: usize = 32;

/// Maximum key length in characters.
pub const MAX_KEY_LEN: usize = 64;

/// Maximum string value length in characters.
pub const MAX_STRING_LEN: usize = 1024;

/// A single scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Validated metadata map, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, MetadataValue>);

impl Metadata {
    /// Validate an arbitrary JSON value into a metadata map.
    ///
    /// `null` is treated as empty metadata. Anything other than a flat
    /// object of scalars within the size bounds is rejected.
    pub fn from_json(value: serde_json::Value) -> Result<Self, CoreError> {
        let object = match value {
            serde_json::Value::Null => return Ok(Self::default()),
            serde_json::Value::Object(map) => map,
            _ => return Err(CoreError::Validation("metadata must be an object".into())),
        };

        if object.len() > MAX_ENTRIES {
            return Err(CoreError::Validation(format!(
                "metadata may hold at most {MAX_ENTRIES} entries"
            )));
        }

        let mut entries = BTreeMap::new();
        for (key, value) in object {
            validate_key(&key)?;
            let scalar = match value {
                serde_json::Value::Bool(b) => MetadataValue::Bool(b),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => MetadataValue::Integer(i),
                    None => MetadataValue::Float(n.as_f64().unwrap_or_default()),
                },
                serde_json::Value::String(s) => {
                    if s.chars().count() > MAX_STRING_LEN {
                        return Err(CoreError::Validation(format!(
                            "metadata value for '{key}' exceeds {MAX_STRING_LEN} characters"
                        )));
                    }
                    MetadataValue::Text(s)
                }
                _ => {
                    return Err(CoreError::Validation(format!(
                        "metadata value for '{key}' must be a string, number or boolean"
                    )))
                }
            };
            entries.insert(key, scalar);
        }

        Ok(Self(entries))
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.0.iter()
    }

    /// Plain string form of a value, used when rendering message bodies.
    pub fn display_value(value: &MetadataValue) -> String {
        match value {
            MetadataValue::Bool(b) => b.to_string(),
            MetadataValue::Integer(i) => i.to_string(),
            MetadataValue::Float(f) => f.to_string(),
            MetadataValue::Text(s) => s.clone(),
        }
    }
}

fn validate_key(key: &str) -> Result<(), CoreError> {
    let valid_chars = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if key.is_empty() || key.len() > MAX_KEY_LEN || !valid_chars {
        return Err(CoreError::Validation(format!("invalid metadata key '{key}'")));
    }
    Ok(())
}
