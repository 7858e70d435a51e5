//! Normalization of the imaging backend's response bodies.
//!
//! The backend answers with JSON objects, JSON arrays, bare `1`/`success`
//! text, or a PHP empty-array dump depending on the endpoint. Everything is
//! folded into [`SubmitOutcome`] or [`LookupOutcome`] here.

use crate::error::ApiError;
use serde::Serialize;
use serde_json::{Map, Value};

const MAX_MESSAGE_LEN: usize = 200;

/// Result of a write-style call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    pub success: bool,
    pub message: Option<String>,
    #[serde(skip)]
    pub error: Option<ApiError>,
}

impl SubmitOutcome {
    pub fn ok(message: Option<String>) -> Self {
        Self {
            success: true,
            message,
            error: None,
        }
    }

    pub fn rejected(message: Option<String>) -> Self {
        Self {
            success: false,
            message,
            error: None,
        }
    }

    pub fn from_error(error: ApiError) -> Self {
        Self {
            success: false,
            message: Some(error.to_string()),
            error: Some(error),
        }
    }

    /// Combine two outcomes; fails if either fails
    pub fn and(self, other: SubmitOutcome) -> SubmitOutcome {
        if !self.success {
            self
        } else if !other.success {
            other
        } else {
            SubmitOutcome::ok(other.message.or(self.message))
        }
    }

    pub fn describe(&self) -> String {
        match (&self.message, self.success) {
            (Some(message), _) => message.clone(),
            (None, true) => "success".to_string(),
            (None, false) => "request was rejected".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    Success,
    Error,
    NotFound,
}

/// Result of a read-style or approval call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupOutcome<T> {
    pub status: LookupStatus,
    pub message: String,
    pub data: Option<T>,
    #[serde(skip)]
    pub error: Option<ApiError>,
}

impl<T> LookupOutcome<T> {
    pub fn success(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status: LookupStatus::Success,
            message: message.into(),
            data,
            error: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: LookupStatus::NotFound,
            message: message.into(),
            data: None,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: LookupStatus::Error,
            message: message.into(),
            data: None,
            error: None,
        }
    }

    pub fn from_error(error: ApiError) -> Self {
        Self {
            status: LookupStatus::Error,
            message: error.to_string(),
            data: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == LookupStatus::Success
    }
}

/// Positive or negative acknowledgment extracted from a body
#[derive(Debug, Clone, PartialEq)]
pub enum Acknowledgement {
    Accepted { message: Option<String>, data: Option<Value> },
    Rejected { message: Option<String> },
    NotFound { message: Option<String> },
}

impl Acknowledgement {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Acknowledgement::Accepted { .. })
    }
}

/// PHP `print_r` of an empty array, or a JSON empty array
pub fn is_empty_array_placeholder(body: &str) -> bool {
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    matches!(compact.as_str(), "[]" | "Array" | "Array()" | "array()")
}

/// Classify a response body. Unknown shapes are a `Format` error.
pub fn interpret_body(body: &str) -> Result<Acknowledgement, ApiError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ApiError::format("empty response body"));
    }
    if is_empty_array_placeholder(trimmed) {
        return Ok(Acknowledgement::Accepted {
            message: None,
            data: None,
        });
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => interpret_value(value),
        Err(_) => interpret_text(trimmed),
    }
}

fn interpret_value(value: Value) -> Result<Acknowledgement, ApiError> {
    match value {
        Value::Object(map) => interpret_object(map),
        Value::Array(items) => match items.into_iter().next() {
            None => Ok(Acknowledgement::Accepted {
                message: None,
                data: None,
            }),
            Some(first) => interpret_value(first),
        },
        Value::Bool(flag) => Ok(flag_ack(flag, None)),
        Value::Number(n) => Ok(flag_ack(n.as_i64() == Some(1), None)),
        Value::String(text) => interpret_text(&text),
        Value::Null => Err(ApiError::format("null response body")),
    }
}

fn flag_ack(accepted: bool, message: Option<String>) -> Acknowledgement {
    if accepted {
        Acknowledgement::Accepted {
            message,
            data: None,
        }
    } else {
        Acknowledgement::Rejected { message }
    }
}

fn interpret_text(text: &str) -> Result<Acknowledgement, ApiError> {
    let lowered = text.trim().trim_matches('"').to_ascii_lowercase();
    match lowered.as_str() {
        "1" | "true" | "ok" | "success" | "successful" => Ok(Acknowledgement::Accepted {
            message: None,
            data: None,
        }),
        "0" | "false" | "error" | "fail" | "failed" | "failure" => {
            Ok(Acknowledgement::Rejected { message: None })
        }
        _ if lowered.starts_with("success") => Ok(Acknowledgement::Accepted {
            message: Some(truncate(text)),
            data: None,
        }),
        _ if lowered.starts_with("error") || lowered.starts_with("fail") => {
            Ok(Acknowledgement::Rejected {
                message: Some(truncate(text)),
            })
        }
        _ => Err(ApiError::format(format!(
            "unrecognized response text: {}",
            truncate(text)
        ))),
    }
}

fn message_of(map: &Map<String, Value>) -> Option<String> {
    ["message", "msg", "error", "detail"]
        .iter()
        .find_map(|key| match map.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
}

/// Truthiness of an indicator field, `None` if the value is not a flag
fn flag_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n == 1 || n == 200),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "success" | "ok" | "true" | "1" | "200" | "approved" => Some(true),
            "error" | "fail" | "failed" | "false" | "0" | "not_found" | "rejected" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// `code` follows the errno convention: zero is success
fn code_value(value: &Value) -> Option<bool> {
    match value {
        Value::Number(n) => n.as_i64().map(|n| n == 0 || n == 200),
        Value::String(s) => s.trim().parse::<i64>().ok().map(|n| n == 0 || n == 200),
        _ => None,
    }
}

fn interpret_object(map: Map<String, Value>) -> Result<Acknowledgement, ApiError> {
    let message = message_of(&map);

    let not_found = matches!(
        map.get("status"),
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("not_found")
    );
    if not_found {
        return Ok(Acknowledgement::NotFound { message });
    }

    let verdict = map
        .get("success")
        .and_then(flag_value)
        .or_else(|| map.get("status").and_then(flag_value))
        .or_else(|| map.get("result").and_then(flag_value))
        .or_else(|| map.get("code").and_then(code_value));

    match verdict {
        Some(true) => {
            let data = map.get("data").cloned();
            Ok(Acknowledgement::Accepted { message, data })
        }
        Some(false) => Ok(Acknowledgement::Rejected { message }),
        None if map.contains_key("error") => Ok(Acknowledgement::Rejected { message }),
        None => Err(ApiError::format("response object has no status indicator")),
    }
}

fn truncate(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_MESSAGE_LEN {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX_MESSAGE_LEN).collect();
        format!("{}...", cut)
    }
}

/// Normalize a write-style response body
pub fn normalize_submit(body: &str) -> SubmitOutcome {
    match interpret_body(body) {
        Ok(Acknowledgement::Accepted { message, .. }) => SubmitOutcome::ok(message),
        Ok(Acknowledgement::Rejected { message }) | Ok(Acknowledgement::NotFound { message }) => {
            SubmitOutcome::rejected(message)
        }
        Err(e) => SubmitOutcome::from_error(e),
    }
}

/// Normalize an approval or rejection response.
///
/// Unknown text is reported back as an error message rather than dropped.
pub fn normalize_decision(body: &str, success_message: &str) -> LookupOutcome<Value> {
    match interpret_body(body) {
        Ok(Acknowledgement::Accepted { message, data }) => {
            LookupOutcome::success(message.unwrap_or_else(|| success_message.to_string()), data)
        }
        Ok(Acknowledgement::Rejected { message }) => {
            LookupOutcome::failed(message.unwrap_or_else(|| "Request was rejected".to_string()))
        }
        Ok(Acknowledgement::NotFound { message }) => {
            LookupOutcome::not_found(message.unwrap_or_else(|| "No records found".to_string()))
        }
        Err(e) => LookupOutcome {
            status: LookupStatus::Error,
            message: truncate(body),
            data: None,
            error: Some(e),
        },
    }
}
