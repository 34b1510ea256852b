//! JSON method codec — the engine's fixed wire format for method channels.
//!
//! - call: `{"method": <string>, "args": <any>}`
//! - success: `[<result>]`
//! - error: `[<code>, <message>, <details>]`
//! - not implemented: empty payload

use serde_json::{Map, Value, json};

use super::{MethodCall, MethodResponse};

/// Errors from encoding or decoding method channel payloads.
#[derive(Debug, thiserror::Error)]
pub enum MethodCodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("method call is not a JSON object")]
    NotAnObject,
    #[error("method call has no string `method` field")]
    MissingMethod,
    #[error("malformed response envelope")]
    MalformedEnvelope,
}

/// Stateless JSON method codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMethodCodec;

impl JsonMethodCodec {
    pub fn decode_method_call(&self, bytes: &[u8]) -> Result<MethodCall, MethodCodecError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Object(mut object) = value else {
            return Err(MethodCodecError::NotAnObject);
        };
        let method = match object.remove("method") {
            Some(Value::String(method)) => method,
            _ => return Err(MethodCodecError::MissingMethod),
        };
        let args = object.remove("args").unwrap_or(Value::Null);
        Ok(MethodCall { method, args })
    }

    pub fn encode_method_call(&self, call: &MethodCall) -> Result<Vec<u8>, MethodCodecError> {
        let mut object = Map::new();
        object.insert("method".into(), Value::String(call.method.clone()));
        object.insert("args".into(), call.args.clone());
        Ok(serde_json::to_vec(&Value::Object(object))?)
    }

    pub fn encode_response(&self, response: &MethodResponse) -> Result<Vec<u8>, MethodCodecError> {
        let envelope = match response {
            MethodResponse::Success(payload) => json!([payload.clone().unwrap_or(Value::Null)]),
            MethodResponse::Error {
                code,
                message,
                details,
            } => json!([code, message, details.clone().unwrap_or(Value::Null)]),
            MethodResponse::NotImplemented => return Ok(Vec::new()),
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    pub fn decode_response(&self, bytes: &[u8]) -> Result<MethodResponse, MethodCodecError> {
        if bytes.is_empty() {
            return Ok(MethodResponse::NotImplemented);
        }
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Array(mut items) = value else {
            return Err(MethodCodecError::MalformedEnvelope);
        };
        match items.len() {
            1 => match items.remove(0) {
                Value::Null => Ok(MethodResponse::Success(None)),
                payload => Ok(MethodResponse::Success(Some(payload))),
            },
            3 => {
                let details = items.pop().filter(|d| !d.is_null());
                let message = match items.pop() {
                    Some(Value::String(m)) => m,
                    Some(Value::Null) => String::new(),
                    _ => return Err(MethodCodecError::MalformedEnvelope),
                };
                let code = match items.pop() {
                    Some(Value::String(c)) => c,
                    _ => return Err(MethodCodecError::MalformedEnvelope),
                };
                Ok(MethodResponse::Error {
                    code,
                    message,
                    details,
                })
            }
            _ => Err(MethodCodecError::MalformedEnvelope),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODEC: JsonMethodCodec = JsonMethodCodec;

    #[test]
    fn decodes_call_with_string_args() {
        let call = CODEC
            .decode_method_call(br#"{"method":"Clipboard.getData","args":"text/plain"}"#)
            .unwrap();
        assert_eq!(call.method, "Clipboard.getData");
        assert_eq!(call.args, json!("text/plain"));
    }

    #[test]
    fn missing_args_decode_as_null() {
        let call = CODEC
            .decode_method_call(br#"{"method":"SystemNavigator.pop"}"#)
            .unwrap();
        assert_eq!(call.args, Value::Null);
    }

    #[test]
    fn rejects_non_object_call() {
        assert!(matches!(
            CODEC.decode_method_call(b"[1,2]"),
            Err(MethodCodecError::NotAnObject)
        ));
    }

    #[test]
    fn rejects_call_without_method() {
        assert!(matches!(
            CODEC.decode_method_call(br#"{"args":{}}"#),
            Err(MethodCodecError::MissingMethod)
        ));
        assert!(matches!(
            CODEC.decode_method_call(br#"{"method":7}"#),
            Err(MethodCodecError::MissingMethod)
        ));
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            CODEC.decode_method_call(b"{not json"),
            Err(MethodCodecError::Json(_))
        ));
    }

    #[test]
    fn success_envelope_wraps_payload() {
        let bytes = CODEC
            .encode_response(&MethodResponse::Success(Some(json!({"text": "abc"}))))
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!([{"text": "abc"}]));
    }

    #[test]
    fn empty_success_is_null_in_envelope() {
        let bytes = CODEC.encode_response(&MethodResponse::Success(None)).unwrap();
        assert_eq!(bytes, b"[null]");
    }

    #[test]
    fn error_envelope_has_three_slots() {
        let bytes = CODEC
            .encode_response(&MethodResponse::error("code", "message"))
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!(["code", "message", null]));
    }

    #[test]
    fn not_implemented_is_empty() {
        let bytes = CODEC.encode_response(&MethodResponse::NotImplemented).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn decodes_each_envelope_shape() {
        assert_eq!(
            CODEC.decode_response(b"").unwrap(),
            MethodResponse::NotImplemented
        );
        assert_eq!(
            CODEC.decode_response(b"[null]").unwrap(),
            MethodResponse::Success(None)
        );
        assert_eq!(
            CODEC.decode_response(br#"[{"text":"x"}]"#).unwrap(),
            MethodResponse::Success(Some(json!({"text": "x"})))
        );
        assert_eq!(
            CODEC.decode_response(br#"["c","m",null]"#).unwrap(),
            MethodResponse::error("c", "m")
        );
    }

    #[test]
    fn rejects_envelope_of_wrong_arity() {
        assert!(matches!(
            CODEC.decode_response(b"[1,2]"),
            Err(MethodCodecError::MalformedEnvelope)
        ));
        assert!(matches!(
            CODEC.decode_response(br#"{"a":1}"#),
            Err(MethodCodecError::MalformedEnvelope)
        ));
    }

    #[test]
    fn call_encoding_is_readable_by_decoder() {
        let call = MethodCall::new("Clipboard.setData", json!({"text": "hi"}));
        let bytes = CODEC.encode_method_call(&call).unwrap();
        assert_eq!(CODEC.decode_method_call(&bytes).unwrap(), call);
    }
}
