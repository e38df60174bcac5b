use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::ProtocolError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// `{id, ok: true, result}` or `{id, ok: false, error}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: JsonValue,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn success(id: Option<JsonValue>, result: JsonValue) -> Self {
        Self {
            id: id.unwrap_or(JsonValue::Null),
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<JsonValue>, error: &ProtocolError) -> Self {
        Self {
            id: id.unwrap_or(JsonValue::Null),
            ok: false,
            result: None,
            error: Some(ErrorBody {
                code: error.code(),
                message: error.to_string(),
            }),
        }
    }

    /// Single-line JSON form used on the wire
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"id":null,"ok":false,"error":{{"code":"internal_error","message":"unserializable response: {}"}}}}"#,
                e
            )
        })
    }
}
