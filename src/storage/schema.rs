//! Versioned on-disk record format
//!
//! A stored record is the camelCase `ThoughtCard` plus a `schemaVersion`
//! field. Version 1 records carry no version field at all: they come from
//! the first web release, which kept `intent` and `metaphors` in the
//! metadata and had no growth stages.

use serde::Serialize;
use serde_json::{Map, Value};

use super::StorageError;
use crate::models::ThoughtCard;

pub const CURRENT_SCHEMA_VERSION: u64 = 2;

const VERSION_FIELD: &str = "schemaVersion";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionedRecord<'a> {
    schema_version: u64,
    #[serde(flatten)]
    thought: &'a ThoughtCard,
}

/// Encodes a thought at the current schema version
pub fn encode(thought: &ThoughtCard) -> Result<Value, StorageError> {
    Ok(serde_json::to_value(VersionedRecord {
        schema_version: CURRENT_SCHEMA_VERSION,
        thought,
    })?)
}

/// Decodes a stored record, migrating older versions on the way
pub fn decode(record: Value) -> Result<ThoughtCard, StorageError> {
    let mut fields = match record {
        Value::Object(fields) => fields,
        other => {
            return Err(StorageError::Corrupt(format!(
                "expected an object, found {}",
                other
            )))
        }
    };

    let version = match fields.remove(VERSION_FIELD) {
        None => 1,
        Some(v) => v.as_u64().ok_or_else(|| {
            StorageError::Corrupt(format!("{} is not a number: {}", VERSION_FIELD, v))
        })?,
    };

    match version {
        1 => migrate_v1(&mut fields),
        CURRENT_SCHEMA_VERSION => {}
        found if found > CURRENT_SCHEMA_VERSION => {
            return Err(StorageError::UnsupportedVersion {
                found,
                supported: CURRENT_SCHEMA_VERSION,
            })
        }
        found => {
            return Err(StorageError::Corrupt(format!(
                "unknown schema version {}",
                found
            )))
        }
    }

    serde_json::from_value(Value::Object(fields)).map_err(|e| StorageError::Corrupt(e.to_string()))
}

fn migrate_v1(fields: &mut Map<String, Value>) {
    if let Some(Value::Object(meta)) = fields.get_mut("meta") {
        meta.remove("intent");
        meta.remove("metaphors");
    }
    fields
        .entry("growthStage")
        .or_insert_with(|| Value::String("seed".to_string()));
    fields
        .entry("updates")
        .or_insert_with(|| Value::Array(Vec::new()));
}
