//! Tolerant extraction of the reply text from a response body.
//!
//! Backends answer in several shapes. Rules are tried in order and the first
//! one that projects a string wins.

use serde_json::Value;

use crate::error::{GatewayError, Result};

/// A named projection from a parsed body to a reply string.
#[derive(Clone, Copy)]
pub struct ExtractionRule {
    pub name: &'static str,
    pub project: fn(&Value) -> Option<&str>,
}

impl ExtractionRule {
    pub fn apply<'a>(&self, body: &'a Value) -> Option<&'a str> {
        (self.project)(body)
    }
}

impl std::fmt::Debug for ExtractionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionRule")
            .field("name", &self.name)
            .finish()
    }
}

fn non_empty(text: &str) -> Option<&str> {
    (!text.is_empty()).then_some(text)
}

fn bare_string(body: &Value) -> Option<&str> {
    body.as_str()
}

fn response_content(body: &Value) -> Option<&str> {
    body.get("response")?
        .get("content")?
        .as_str()
        .and_then(non_empty)
}

fn content(body: &Value) -> Option<&str> {
    body.get("content")?.as_str().and_then(non_empty)
}

fn response(body: &Value) -> Option<&str> {
    body.get("response")?.as_str().and_then(non_empty)
}

fn message(body: &Value) -> Option<&str> {
    body.get("message")?.as_str().and_then(non_empty)
}

pub const EXTRACTION_RULES: &[ExtractionRule] = &[
    ExtractionRule {
        name: "bare_string",
        project: bare_string,
    },
    ExtractionRule {
        name: "response.content",
        project: response_content,
    },
    ExtractionRule {
        name: "content",
        project: content,
    },
    ExtractionRule {
        name: "response",
        project: response,
    },
    ExtractionRule {
        name: "message",
        project: message,
    },
];

/// Apply [`EXTRACTION_RULES`] in order.
pub fn extract_reply(body: &Value) -> Option<String> {
    EXTRACTION_RULES.iter().find_map(|rule| {
        let text = rule.apply(body)?;
        log::debug!("Extracted reply via rule '{}'", rule.name);
        Some(text.to_string())
    })
}

/// Parse raw response bytes and extract the reply.
pub fn parse_reply_body(bytes: &[u8]) -> Result<String> {
    let body: Value = match serde_json::from_slice(bytes) {
        Ok(body) => body,
        Err(e) => {
            log::warn!("Response body is not JSON: {}", e);
            return Err(GatewayError::UnrecognizedShape);
        }
    };
    log::debug!("Raw API response: {}", body);

    extract_reply(&body).ok_or_else(|| {
        log::warn!("Could not extract content from response: {}", body);
        GatewayError::UnrecognizedShape
    })
}
