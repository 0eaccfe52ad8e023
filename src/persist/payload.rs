//! Per-record payload transform.
//!
//! Values are serialized with serde_json and, when enabled, wrapped in
//! standard base64. Encoded payloads do not record which mode produced them.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

/// Encodes and decodes record payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadCodec {
    base64: bool,
}

impl PayloadCodec {
    /// Creates a codec; `base64` wraps the serialized value in base64.
    pub fn new(base64: bool) -> Self {
        Self { base64 }
    }

    /// Serializes `data` into the string stored in a record.
    pub fn encode<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> Result<String> {
        let json = serde_json::to_string(data).map_err(|e| payload_error(key, e))?;
        Ok(if self.base64 {
            BASE64.encode(json)
        } else {
            json
        })
    }

    /// Reverses [`PayloadCodec::encode`].
    pub fn decode<T: DeserializeOwned>(&self, key: &str, payload: &str) -> Result<T> {
        if self.base64 {
            let bytes = BASE64.decode(payload).map_err(|e| payload_error(key, e))?;
            serde_json::from_slice(&bytes).map_err(|e| payload_error(key, e))
        } else {
            serde_json::from_str(payload).map_err(|e| payload_error(key, e))
        }
    }
}

fn payload_error(key: &str, e: impl std::fmt::Display) -> CacheError {
    CacheError::Payload {
        key: key.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_plain_payload_is_json() {
        let codec = PayloadCodec::new(false);
        let encoded = codec.encode("k", &json!({"name": "Ada"})).unwrap();
        assert_eq!(encoded, r#"{"name":"Ada"}"#);
    }

    #[test]
    fn test_base64_payload() {
        let codec = PayloadCodec::new(true);
        let encoded = codec.encode("k", &json!({"name": "Ada"})).unwrap();

        assert_eq!(encoded, BASE64.encode(r#"{"name":"Ada"}"#));
        let decoded: Value = codec.decode("k", &encoded).unwrap();
        assert_eq!(decoded, json!({"name": "Ada"}));
    }

    #[test]
    fn test_mode_switch_breaks_old_payloads() {
        let encoded = PayloadCodec::new(false).encode("k", &json!([1, 2, 3])).unwrap();
        let result: Result<Value> = PayloadCodec::new(true).decode("k", &encoded);
        assert!(matches!(result, Err(CacheError::Payload { ref key, .. }) if key == "k"));
    }

    #[test]
    fn test_typed_decode() {
        let codec = PayloadCodec::new(true);
        let encoded = codec.encode("k", &vec!["a".to_string(), "b".to_string()]).unwrap();
        let decoded: Vec<String> = codec.decode("k", &encoded).unwrap();
        assert_eq!(decoded, vec!["a", "b"]);
    }
}
