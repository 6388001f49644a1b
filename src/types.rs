use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::LookupError;

/// One model-issued tool invocation. The `id` is assigned by the session
/// client and is unique per outstanding call; it is the correlation key
/// the eventual response must carry.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// What arrives on the channel for each tool-call message the session
/// client receives. `functionCalls` may be absent entirely, in which case
/// handlers ignore the notification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallNotification {
    #[serde(rename = "functionCalls")]
    pub function_calls: Option<Vec<ToolCall>>,
}

impl ToolCallNotification {
    pub fn single(call: ToolCall) -> Self {
        Self {
            function_calls: Some(vec![call]),
        }
    }
}

/// The correlated reply to one [`ToolCall`]. Internally a tagged result;
/// the success/failure envelope union only exists at the wire boundary.
#[derive(Debug, Clone)]
pub struct ToolResponse {
    pub id: String,
    pub name: String,
    pub result: Result<Value, LookupError>,
}

impl ToolResponse {
    pub fn output(id: impl Into<String>, name: impl Into<String>, output: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            result: Ok(output),
        }
    }

    pub fn failure(id: impl Into<String>, name: impl Into<String>, error: LookupError) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            result: Err(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.result.is_err()
    }

    /// The `sendToolResponse` payload the session client expects:
    /// `{"functionResponses": [{id, name, response}]}` where `response` is
    /// `{"output": ...}` on success or `{"success": false, "error": ...}`
    /// on failure.
    pub fn to_wire(&self) -> Value {
        let response = match &self.result {
            Ok(output) => json!({ "output": output }),
            Err(e) => json!({ "success": false, "error": e.message() }),
        };
        json!({
            "functionResponses": [{
                "id": self.id,
                "name": self.name,
                "response": response,
            }]
        })
    }
}
