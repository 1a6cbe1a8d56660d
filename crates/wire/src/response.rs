// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response wire format and structural validity (§4.2, §3 Response
//! invariant): `status` present and matching the payload shape (success ⇒
//! `output` present, error ⇒ `error` present). Handler-style responses use
//! `type` instead of `status`, with values `"success" | "error" | "response"`;
//! both shapes parse through the same [`RawResponse::parse`].

use serde::{Deserialize, Serialize};
use wmb_core::ErrorKind;

/// Phrases that, found case-insensitively in an error response's message,
/// tag the failure as network-debugging noise (retryable, does not degrade
/// connection health) rather than a genuine error.
const NETWORK_DEBUGGING_PHRASES: &[&str] = &[
    "retry sending",
    "transport connection",
    "lost",
    "network",
    "target windows seems lost",
    "resync with target",
];

/// Wire shape as received: covers the `status`-keyed regular-command
/// response and the `type`-keyed handler-style response.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<String>,
}

/// A structurally-validated, classified response.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Success {
        output: serde_json::Value,
    },
    Error {
        message: String,
        suggestion: Option<String>,
        /// Set when the message matched a known network-debugging phrase
        /// (§4.2); callers should retry without degrading connection health.
        network_debugging: bool,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("response missing both 'status' and 'type' fields")]
    MissingStatus,
    #[error("response status/type was '{0}', expected success/error/response")]
    UnknownStatus(String),
    #[error("success response missing 'output' field")]
    MissingOutput,
    #[error("error response missing 'error' field")]
    MissingError,
}

impl From<ResponseError> for ErrorKind {
    fn from(_: ResponseError) -> Self {
        ErrorKind::Protocol
    }
}

/// Whether `message` contains one of the §4.2 network-debugging phrases.
pub fn is_network_debugging_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    NETWORK_DEBUGGING_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

impl RawResponse {
    pub fn success(output: serde_json::Value) -> Self {
        Self { status: Some("success".to_string()), output: Some(output), ..Default::default() }
    }

    pub fn error(
        message: impl Into<String>,
        suggestion: Option<String>,
        error_category: Option<String>,
    ) -> Self {
        Self {
            status: Some("error".to_string()),
            error: Some(serde_json::Value::String(message.into())),
            suggestion,
            error_category,
            ..Default::default()
        }
    }

    /// Validate the §3 Response invariant and classify network-debugging
    /// errors per §4.2.
    pub fn parse(self) -> Result<ParsedResponse, ResponseError> {
        let tag = self.status.or(self.kind).ok_or(ResponseError::MissingStatus)?;
        match tag.as_str() {
            "success" | "response" => {
                let output = self.output.ok_or(ResponseError::MissingOutput)?;
                Ok(ParsedResponse::Success { output })
            }
            "error" => {
                let message = match self.error {
                    Some(serde_json::Value::String(s)) => s,
                    Some(other) => other.to_string(),
                    None => return Err(ResponseError::MissingError),
                };
                let network_debugging = is_network_debugging_message(&message);
                Ok(ParsedResponse::Error {
                    message,
                    suggestion: self.suggestion,
                    network_debugging,
                })
            }
            other => Err(ResponseError::UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
