use serde_json::Value;

use crate::error::Error;

/// Data handed to [`Context::data`](crate::Context::data).
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Text(String),
    Value(Value),
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<&[u8]> for Payload {
    fn from(b: &[u8]) -> Self {
        Payload::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Bytes(b)
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Value(v)
    }
}

/// Turns a payload into response bytes. Swappable per request.
pub type SerializeFn = fn(Payload) -> Result<Vec<u8>, Error>;

/// Bytes and strings pass through; other values are written as their
/// display text.
pub fn default_serialize(payload: Payload) -> Result<Vec<u8>, Error> {
    Ok(match payload {
        Payload::Bytes(b) => b,
        Payload::Text(s) => s.into_bytes(),
        Payload::Value(Value::Null) => Vec::new(),
        Payload::Value(Value::String(s)) => s.into_bytes(),
        Payload::Value(v) => v.to_string().into_bytes(),
    })
}

/// Raw bytes pass through; text and values are encoded as JSON.
pub fn json_serialize(payload: Payload) -> Result<Vec<u8>, Error> {
    match payload {
        Payload::Bytes(b) => Ok(b),
        Payload::Text(s) => Ok(serde_json::to_vec(&s)?),
        Payload::Value(v) => Ok(serde_json::to_vec(&v)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_serialize() {
        assert_eq!(default_serialize("user list".into()).unwrap(), b"user list");
        assert_eq!(default_serialize(vec![1u8, 2].into()).unwrap(), vec![1, 2]);
        assert_eq!(default_serialize(json!(42).into()).unwrap(), b"42");
        assert_eq!(default_serialize(json!("plain").into()).unwrap(), b"plain");
        assert!(default_serialize(Value::Null.into()).unwrap().is_empty());
    }

    #[test]
    fn test_json_serialize() {
        assert_eq!(json_serialize("hi".into()).unwrap(), br#""hi""#);
        assert_eq!(
            json_serialize(json!({"id": 7}).into()).unwrap(),
            br#"{"id":7}"#
        );
    }
}
