//! Request-scoped chat types: inbound parameters, the upstream payload, the
//! outcome of one upstream call, and the ordered model attempt plan.

use crate::config::ModelDefaults;
use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name injected into successful responses naming the model that replied.
pub const USED_MODEL_FIELD: &str = "_used_model";

/// Parameters extracted from an inbound chat request, with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatParams {
    pub messages: Vec<Value>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub model: String,
    pub fallback_model: String,
}

/// Wire shape of the inbound body. Every field is optional; `null` counts as
/// missing.
#[derive(Debug, Default, Deserialize)]
struct RawChatBody {
    #[serde(default)]
    messages: Option<Vec<Value>>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    fallback_model: Option<String>,
}

/// Parse an inbound body into [`ChatParams`].
///
/// Accepted shapes:
/// - empty body or JSON `null` → all defaults
/// - a JSON object → fields read directly
/// - a JSON string → its contents parsed as JSON (empty string → all defaults)
///
/// Anything else is a [`RelayError::MalformedRequest`].
pub fn parse_chat_params(body: &[u8], defaults: &ModelDefaults) -> Result<ChatParams, RelayError> {
    let raw = parse_raw_body(body)?;

    Ok(ChatParams {
        messages: raw.messages.unwrap_or_default(),
        max_tokens: raw.max_tokens.unwrap_or(defaults.max_tokens),
        temperature: raw.temperature.unwrap_or(defaults.temperature),
        model: raw.model.unwrap_or_else(|| defaults.model.clone()),
        fallback_model: raw
            .fallback_model
            .unwrap_or_else(|| defaults.fallback_model.clone()),
    })
}

fn parse_raw_body(body: &[u8]) -> Result<RawChatBody, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RawChatBody::default());
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| RelayError::MalformedRequest(e.to_string()))?;

    // A body delivered as a JSON-encoded string carries the real object inside.
    let value = match value {
        Value::String(inner) if inner.trim().is_empty() => return Ok(RawChatBody::default()),
        Value::String(inner) => serde_json::from_str(&inner)
            .map_err(|e| RelayError::MalformedRequest(format!("string body: {e}")))?,
        other => other,
    };

    match value {
        Value::Null => Ok(RawChatBody::default()),
        Value::Object(_) => {
            serde_json::from_value(value).map_err(|e| RelayError::MalformedRequest(e.to_string()))
        }
        other => Err(RelayError::MalformedRequest(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One step of the fallback plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAttempt {
    pub model: String,
    /// No further attempt follows this one.
    pub is_last: bool,
}

impl ChatParams {
    /// Ordered models to try: the requested model, then the fallback.
    pub fn attempts(&self) -> Vec<ModelAttempt> {
        let models = [&self.model, &self.fallback_model];
        let last = models.len() - 1;
        models
            .into_iter()
            .enumerate()
            .map(|(i, model)| ModelAttempt {
                model: model.clone(),
                is_last: i == last,
            })
            .collect()
    }

    /// Build the upstream body targeting `model`.
    pub fn request_for(&self, model: &str) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: self.messages.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// JSON body sent to the upstream chat-completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Value>,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Outcome of a single upstream call that produced an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResult {
    /// Status was 2xx.
    pub ok: bool,
    pub status: u16,
    pub data: Value,
}

impl UpstreamResult {
    /// Build a result from a status and raw body. A body that is not valid JSON
    /// becomes an empty object.
    pub fn from_parts(status: u16, body: &[u8]) -> Self {
        let data = serde_json::from_slice(body).unwrap_or_else(|_| Value::Object(Default::default()));
        Self {
            ok: (200..300).contains(&status),
            status,
            data,
        }
    }

    /// 403 and 404 both read as "model unavailable for this key".
    pub fn is_model_unavailable(&self) -> bool {
        !self.ok && matches!(self.status, 403 | 404)
    }

    /// Record which model produced this result. Only object bodies are tagged.
    pub fn tag_used_model(&mut self, model: &str) {
        if let Some(obj) = self.data.as_object_mut() {
            obj.insert(USED_MODEL_FIELD.to_string(), Value::String(model.to_string()));
        }
    }
}
