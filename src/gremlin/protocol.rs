//! TinkerPop driver wire messages (GraphSON v2 over WebSocket).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{RecipebotError, Result};
use crate::gremlin::Traversal;

pub const MIME_TYPE: &str = "application/vnd.gremlin-v2.0+json";

/// Response status codes the driver acts on
pub mod status {
    pub const SUCCESS: u16 = 200;
    pub const NO_CONTENT: u16 = 204;
    pub const PARTIAL_CONTENT: u16 = 206;
    pub const AUTHENTICATE: u16 = 407;
}

/// Driver request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub request_id: Uuid,
    pub op: String,
    pub processor: String,
    pub args: Value,
}

impl RequestMessage {
    /// Script evaluation request for a traversal.
    pub fn eval(traversal: &Traversal) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            op: "eval".to_string(),
            processor: String::new(),
            args: json!({
                "gremlin": traversal.script(),
                "bindings": traversal.bindings(),
                "language": "gremlin-groovy",
            }),
        }
    }

    /// SASL PLAIN answer to a 407 challenge; reuses the challenged request id.
    pub fn authentication(request_id: Uuid, username: &str, password: &str) -> Self {
        Self {
            request_id,
            op: "authentication".to_string(),
            processor: String::new(),
            args: json!({
                "sasl": sasl_plain(username, password),
                "saslMechanism": "PLAIN",
            }),
        }
    }

    /// Binary frame: one length byte, the mime type, then the JSON payload.
    pub fn to_frame(&self) -> Result<Vec<u8>> {
        let payload = serde_json::to_vec(self)?;
        let mut frame = Vec::with_capacity(1 + MIME_TYPE.len() + payload.len());
        frame.push(MIME_TYPE.len() as u8);
        frame.extend_from_slice(MIME_TYPE.as_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }
}

/// `\0username\0password`, base64 encoded.
pub fn sasl_plain(username: &str, password: &str) -> String {
    let mut raw = Vec::with_capacity(username.len() + password.len() + 2);
    raw.push(0);
    raw.extend_from_slice(username.as_bytes());
    raw.push(0);
    raw.extend_from_slice(password.as_bytes());
    STANDARD.encode(raw)
}

/// Driver response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    #[serde(default)]
    pub request_id: Option<String>,
    pub status: ResponseStatus,
    #[serde(default)]
    pub result: ResponseResult,
}

#[derive(Debug, Deserialize)]
pub struct ResponseStatus {
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseResult {
    #[serde(default)]
    pub data: Value,
}

impl ResponseMessage {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| RecipebotError::Parse(format!("Invalid Gremlin response: {}", e)))
    }

    pub fn request_uuid(&self) -> Option<Uuid> {
        self.request_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id).ok())
    }

    /// Result items of this (possibly partial) response.
    pub fn into_items(self) -> Vec<Value> {
        match untyped(self.result.data) {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            other => vec![other],
        }
    }
}

/// Strip a GraphSON `{"@type": .., "@value": ..}` wrapper, if present.
pub fn untyped(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("@type") && map.contains_key("@value") => {
            map.remove("@value").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Borrowing variant of [`untyped`].
pub fn untyped_ref(value: &Value) -> &Value {
    match value {
        Value::Object(map) if map.contains_key("@type") => map.get("@value").unwrap_or(value),
        other => other,
    }
}

/// Render a scalar GraphSON value as a string (ids, property values).
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match untyped_ref(value) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_request_shape() {
        let t = Traversal::vertices().has_label("recipe");
        let request = RequestMessage::eval(&t);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["op"], "eval");
        assert_eq!(value["processor"], "");
        assert_eq!(value["args"]["gremlin"], "g.V().hasLabel(p0)");
        assert_eq!(value["args"]["bindings"]["p0"], "recipe");
        assert_eq!(value["args"]["language"], "gremlin-groovy");
        assert!(value["requestId"].is_string());
    }

    #[test]
    fn test_frame_prefix() {
        let request = RequestMessage::eval(&Traversal::vertices());
        let frame = request.to_frame().unwrap();
        assert_eq!(frame[0] as usize, MIME_TYPE.len());
        assert_eq!(&frame[1..1 + MIME_TYPE.len()], MIME_TYPE.as_bytes());
        let body: Value = serde_json::from_slice(&frame[1 + MIME_TYPE.len()..]).unwrap();
        assert_eq!(body["args"]["gremlin"], "g.V()");
    }

    #[test]
    fn test_sasl_plain() {
        let encoded = sasl_plain("/dbs/db/colls/graph", "secret");
        let decoded = STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded, b"\0/dbs/db/colls/graph\0secret");
    }

    #[test]
    fn test_authentication_reuses_request_id() {
        let id = Uuid::new_v4();
        let request = RequestMessage::authentication(id, "user", "pass");
        assert_eq!(request.request_id, id);
        assert_eq!(request.op, "authentication");
        assert_eq!(request.args["saslMechanism"], "PLAIN");
    }

    #[test]
    fn test_parse_cosmos_style_response() {
        let raw = br#"{
            "requestId": "6f1c1b1e-8a5f-4a54-9d7e-2b1f0f4f6a11",
            "status": {"code": 200, "attributes": {"x-ms-request-charge": 2.3}, "message": ""},
            "result": {"data": [{"id": "v1", "label": "recipe", "type": "vertex"}], "meta": {}}
        }"#;
        let response = ResponseMessage::parse(raw).unwrap();
        assert_eq!(response.status.code, status::SUCCESS);
        assert!(response.request_uuid().is_some());
        let items = response.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["label"], "recipe");
    }

    #[test]
    fn test_parse_typed_list_and_no_content() {
        let raw = br#"{"requestId": null, "status": {"code": 200},
            "result": {"data": {"@type": "g:List", "@value": [{"@type": "g:Int64", "@value": 4}]}}}"#;
        let items = ResponseMessage::parse(raw).unwrap().into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(scalar_to_string(&items[0]).as_deref(), Some("4"));

        let empty = br#"{"requestId": "6f1c1b1e-8a5f-4a54-9d7e-2b1f0f4f6a11", "status": {"code": 204}}"#;
        let response = ResponseMessage::parse(empty).unwrap();
        assert_eq!(response.status.code, status::NO_CONTENT);
        assert!(response.into_items().is_empty());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            ResponseMessage::parse(b"not json"),
            Err(RecipebotError::Parse(_))
        ));
    }
}
