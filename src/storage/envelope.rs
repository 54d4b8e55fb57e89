//! Versioned value envelope
//!
//! Every stored value is wrapped as `{"version": N, "data": ...}`. Values
//! written before versioning existed are bare JSON and are read as version 0.
//!
//! Read path:
//! ```text
//!   raw string → JSON → unwrap envelope (or treat as v0) → migrate → decode
//! ```

use crate::storage::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Schema version written by this crate
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Version assigned to bare, unwrapped values
pub const LEGACY_SCHEMA_VERSION: u32 = 0;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

/// A decoded value and the version it was stored under
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    pub stored_version: u32,
}

impl<T> Decoded<T> {
    /// True when the stored form predates the current schema
    pub fn needs_rewrite(&self) -> bool {
        self.stored_version < CURRENT_SCHEMA_VERSION
    }
}

/// Wrap a value in the current envelope
pub fn encode<T: Serialize>(value: &T) -> StoreResult<String> {
    let envelope = EnvelopeRef {
        version: CURRENT_SCHEMA_VERSION,
        data: value,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Unwrap, migrate and decode a stored value
pub fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> StoreResult<Decoded<T>> {
    let parsed: Value = serde_json::from_str(raw)?;
    let (version, payload) = split_envelope(parsed)?;

    if version > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::UnsupportedVersion {
            key: key.to_string(),
            found: version,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }

    let payload = migrate(version, payload);
    let value = serde_json::from_value(payload)?;

    Ok(Decoded {
        value,
        stored_version: version,
    })
}

fn split_envelope(value: Value) -> StoreResult<(u32, Value)> {
    match value {
        Value::Object(mut map)
            if map.len() == 2 && map.contains_key("version") && map.contains_key("data") =>
        {
            let version = map
                .get("version")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| {
                    StoreError::Serialization("envelope version is not an integer".to_string())
                })?;
            let data = map.remove("data").unwrap_or(Value::Null);
            Ok((version, data))
        }
        other => Ok((LEGACY_SCHEMA_VERSION, other)),
    }
}

/// Bring a payload from `version` up to the current schema
fn migrate(version: u32, payload: Value) -> Value {
    (version..CURRENT_SCHEMA_VERSION).fold(payload, migrate_step)
}

/// Rewrite a payload stored under `_from` into the shape of `_from + 1`
fn migrate_step(payload: Value, _from: u32) -> Value {
    // v0 → v1 only introduced the envelope; payloads are unchanged
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wraps_value() {
        let raw = encode(&vec!["a", "b"]).unwrap();
        assert_eq!(raw, r#"{"version":1,"data":["a","b"]}"#);
    }

    #[test]
    fn test_decode_current_version() {
        let decoded: Decoded<bool> = decode("k", r#"{"version":1,"data":true}"#).unwrap();
        assert!(decoded.value);
        assert!(!decoded.needs_rewrite());
    }

    #[test]
    fn test_decode_legacy_bare_json() {
        let decoded: Decoded<Vec<String>> = decode("k", r#"["181913649"]"#).unwrap();
        assert_eq!(decoded.value, vec!["181913649".to_string()]);
        assert_eq!(decoded.stored_version, LEGACY_SCHEMA_VERSION);
        assert!(decoded.needs_rewrite());
    }

    #[test]
    fn test_decode_rejects_newer_version() {
        let err = decode::<bool>("memeverse_dark_mode", r#"{"version":9,"data":true}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnsupportedVersion { found: 9, .. }
        ));
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode::<bool>("k", "{not json").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn test_object_with_extra_keys_is_legacy() {
        let decoded: Decoded<serde_json::Value> =
            decode("k", r#"{"version":1,"data":2,"name":"x"}"#).unwrap();
        assert_eq!(decoded.stored_version, LEGACY_SCHEMA_VERSION);
        assert_eq!(decoded.value["name"], "x");
    }
}
