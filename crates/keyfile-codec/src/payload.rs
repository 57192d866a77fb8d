//! Payload tagging helpers.
//!
//! Every payload is a JSON object with a `_typename` member. Values that do
//! not serialize to an object are wrapped under `_value`; opaque byte buffers
//! are stored hex-encoded under `_rawbytes`.

use serde_json::{Map, Value};

use keyfile_types::format;

use crate::error::{CodecError, CodecResult};

/// Member holding a non-object value.
pub const WRAPPED_VALUE: &str = "_value";

/// Member holding hex-encoded raw bytes.
pub const RAW_BYTES: &str = "_rawbytes";

/// The payload's `_typename`, if it has one.
pub fn type_tag(payload: &Value) -> Option<&str> {
    payload.get(format::TYPENAME).and_then(Value::as_str)
}

/// Attach a type tag to an encoded value. The tag is the first member.
pub fn tag(value: Value, class_name: &str) -> Value {
    let mut tagged = Map::new();
    tagged.insert(format::TYPENAME.into(), Value::String(class_name.to_string()));
    match value {
        Value::Object(map) => tagged.extend(map.into_iter().filter(|(k, _)| k != format::TYPENAME)),
        other => {
            tagged.insert(WRAPPED_VALUE.into(), other);
        }
    }
    Value::Object(tagged)
}

/// Strip the type tag, unwrapping `_value` when that is all that remains.
pub fn untag(payload: &Value) -> Value {
    let Value::Object(map) = payload else {
        return payload.clone();
    };
    let mut map = map.clone();
    map.remove(format::TYPENAME);
    if map.len() == 1 {
        if let Some(inner) = map.remove(WRAPPED_VALUE) {
            return inner;
        }
    }
    Value::Object(map)
}

/// Payload for an opaque byte buffer.
pub fn raw(bytes: &[u8], class_name: &str) -> Value {
    let mut map = Map::new();
    map.insert(format::TYPENAME.into(), Value::String(class_name.to_string()));
    map.insert(RAW_BYTES.into(), Value::String(hex::encode(bytes)));
    Value::Object(map)
}

/// The byte buffer of a raw payload, or `None` when the payload is not raw.
pub fn raw_bytes(payload: &Value) -> Option<CodecResult<Vec<u8>>> {
    let encoded = payload.get(RAW_BYTES)?;
    Some(
        encoded
            .as_str()
            .ok_or_else(|| CodecError::InvalidRawBytes("not a string".into()))
            .and_then(|s| hex::decode(s).map_err(|e| CodecError::InvalidRawBytes(e.to_string()))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tag_object_in_place() {
        let tagged = tag(json!({"x": 1}), "Point");
        assert_eq!(tagged, json!({"x": 1, "_typename": "Point"}));
        assert_eq!(type_tag(&tagged), Some("Point"));
        assert_eq!(untag(&tagged), json!({"x": 1}));
    }

    #[test]
    fn tag_wraps_scalars() {
        let tagged = tag(json!(3.5), "Weight");
        assert_eq!(tagged["_value"], 3.5);
        assert_eq!(untag(&tagged), json!(3.5));
    }

    #[test]
    fn raw_payload_roundtrip() {
        let payload = raw(&[0xde, 0xad], "Blob");
        assert_eq!(payload["_rawbytes"], "dead");
        assert_eq!(raw_bytes(&payload).unwrap().unwrap(), vec![0xde, 0xad]);
        assert!(raw_bytes(&json!({"_typename": "X"})).is_none());
    }

    #[test]
    fn raw_payload_bad_hex() {
        let payload = json!({"_typename": "Blob", "_rawbytes": "zz"});
        assert!(matches!(
            raw_bytes(&payload).unwrap(),
            Err(CodecError::InvalidRawBytes(_))
        ));
    }

    #[test]
    fn missing_tag() {
        assert!(type_tag(&json!({"x": 1})).is_none());
        assert!(type_tag(&json!([1, 2])).is_none());
    }
}
