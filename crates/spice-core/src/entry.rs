//! Stored cache entries and their JSON envelope.
//!
//! Values are persisted as opaque strings. A successful read is wrapped as
//! `{"data": <payload>}` and an in-flight marker as `{"placeholder": true}`.

use serde_json::{Map, Value, json};

use crate::error::DecodeError;

const DATA_FIELD: &str = "data";
const PLACEHOLDER_FIELD: &str = "placeholder";

/// State of a cache key as seen through the key-value store.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    /// Nothing stored under the key.
    Absent,
    /// A fetch for the key was started and has not written its result.
    Placeholder,
    /// The payload of a successful read.
    Result(Value),
}

impl CacheEntry {
    /// Decodes the raw value read from a store.
    ///
    /// # Example
    ///
    /// ```
    /// use serde_json::json;
    /// use spice_core::CacheEntry;
    ///
    /// let entry = CacheEntry::decode(Some(r#"{"data":{"myResponse":true}}"#)).unwrap();
    /// assert_eq!(entry, CacheEntry::Result(json!({"myResponse": true})));
    ///
    /// assert_eq!(CacheEntry::decode(None).unwrap(), CacheEntry::Absent);
    /// ```
    pub fn decode(raw: Option<&str>) -> Result<Self, DecodeError> {
        let Some(raw) = raw else {
            return Ok(Self::Absent);
        };

        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(mut fields) = value else {
            return Err(DecodeError::UnknownShape(raw.to_string()));
        };

        if let Some(data) = fields.remove(DATA_FIELD) {
            return Ok(Self::Result(data));
        }

        match fields.get(PLACEHOLDER_FIELD) {
            Some(Value::Bool(true)) => Ok(Self::Placeholder),
            _ => Err(DecodeError::UnknownShape(raw.to_string())),
        }
    }

    /// Encodes the entry for storage. `Absent` has no stored form.
    pub fn encode(&self) -> Option<String> {
        match self {
            Self::Absent => None,
            Self::Placeholder => Some(Self::placeholder_envelope()),
            Self::Result(payload) => Some(Self::result_envelope(payload)),
        }
    }

    /// The stored form of a placeholder.
    pub fn placeholder_envelope() -> String {
        json!({ "placeholder": true }).to_string()
    }

    /// The stored form of a successful payload.
    pub fn result_envelope(payload: &Value) -> String {
        let mut fields = Map::with_capacity(1);
        fields.insert(DATA_FIELD.to_string(), payload.clone());
        Value::Object(fields).to_string()
    }

    /// Returns the payload if this is a stored result.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Result(payload) => Some(payload),
            _ => None,
        }
    }

    /// Returns true if this entry marks an in-flight fetch.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_envelope_is_compact() {
        assert_eq!(CacheEntry::placeholder_envelope(), r#"{"placeholder":true}"#);
    }

    #[test]
    fn test_result_envelope_wraps_data() {
        let stored = CacheEntry::result_envelope(&json!({"myResponse": true}));
        assert_eq!(stored, r#"{"data":{"myResponse":true}}"#);
    }

    #[test]
    fn test_decode_placeholder() {
        let entry = CacheEntry::decode(Some(r#"{"placeholder":true}"#)).unwrap();
        assert!(entry.is_placeholder());
        assert!(entry.payload().is_none());
    }

    #[test]
    fn test_decode_null_payload_is_a_result() {
        let entry = CacheEntry::decode(Some(r#"{"data":null}"#)).unwrap();
        assert_eq!(entry, CacheEntry::Result(Value::Null));
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        let err = CacheEntry::decode(Some("{\"data\":")).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_decode_rejects_unknown_shapes() {
        for raw in [r#"[1,2]"#, r#"{"placeholder":false}"#, r#"{"other":1}"#, "42"] {
            let err = CacheEntry::decode(Some(raw)).unwrap_err();
            assert!(
                matches!(err, DecodeError::UnknownShape(_)),
                "expected unknown shape for {}",
                raw
            );
        }
    }

    #[test]
    fn test_absent_has_no_stored_form() {
        assert!(CacheEntry::Absent.encode().is_none());
    }
}
