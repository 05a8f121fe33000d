//! JSON parsing for readings, client records and statistics documents.

use anyhow::{Result, bail};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::reconcile::{ClientInfo, SensorReading};

/// Decodes a bare JSON array, or an object envelope carrying the array under
/// `key`.
fn parse_list<T: DeserializeOwned>(bytes: &[u8], key: &str) -> Result<Vec<T>> {
    let value: Value = serde_json::from_slice(bytes)?;
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove(key) {
            Some(inner @ Value::Array(_)) => inner,
            _ => bail!("expected a JSON array or an object with a '{key}' array"),
        },
        _ => bail!("expected a JSON array or an object with a '{key}' array"),
    };
    Ok(serde_json::from_value(list)?)
}

/// Decodes sensor readings from raw JSON bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not JSON, or not a reading list.
pub fn parse_readings(bytes: &[u8]) -> Result<Vec<SensorReading>> {
    parse_list(bytes, "readings")
}

/// Decodes client registry records from raw JSON bytes.
pub fn parse_clients(bytes: &[u8]) -> Result<Vec<ClientInfo>> {
    parse_list(bytes, "clients")
}

/// Decodes an aggregate-statistics document. Any JSON value is accepted.
pub fn parse_document(bytes: &[u8]) -> Result<Value> {
    Ok(serde_json::from_slice(bytes)?)
}
