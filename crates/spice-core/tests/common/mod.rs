#![allow(dead_code)]
use serde_json::Value;

/// Helper to build a payload from a JSON string slice.
/// Panics if the JSON is invalid (intended for tests).
pub fn payload(json: &str) -> Value {
    serde_json::from_str(json).expect("Failed to create test payload from JSON")
}

/// Returns a nested payload fixture resembling a REST collection response.
pub fn collection_payload() -> Value {
    payload(
        r#"{
        "items": [
            { "id": 1, "name": "alpha", "tags": ["a", "b"] },
            { "id": 2, "name": "beta", "tags": [] }
        ],
        "total": 2,
        "next": null,
        "meta": { "unicode": "ñandú 🌶", "ratio": 0.25 }
    }"#,
    )
}
