// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Parser for per-turn `*_agent_response.json` documents
//!
//! The document shape follows the computer-use responses API:
//!
//! ```json
//! { "response": { "content": "...", "output": [
//!     { "type": "message", "content": [{ "text": "..." }] },
//!     { "type": "reasoning", "summary": [{ "type": "summary_text", "text": "..." }] },
//!     { "type": "computer_call", "action": { "type": "click", "x": 1, "y": 2 } }
//! ] } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tr_domain_types::Action;

use crate::normalize::normalize_action;

/// Free text and actions extracted from one agent response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentResponse {
    pub thought: Option<String>,
    pub actions: Vec<Action>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    response: Option<ResponseBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    output: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    Message {
        #[serde(default)]
        content: Option<Vec<ContentPart>>,
    },
    Reasoning {
        #[serde(default)]
        summary: Option<Vec<SummaryPart>>,
        #[serde(default)]
        text: Option<String>,
    },
    ComputerCall {
        #[serde(default)]
        action: Option<Map<String, Value>>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryPart {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Parse an agent response document.
///
/// Never fails: a document that is not valid JSON yields an empty
/// [`AgentResponse`] and an error log entry, output items that do not match
/// their expected shape are skipped, and actions the normalizer rejects are
/// dropped.
pub fn parse_agent_response(json: impl AsRef<[u8]>) -> AgentResponse {
    let envelope: Envelope = match serde_json::from_slice(json.as_ref()) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::error!(error = %err, "Error parsing agent response");
            return AgentResponse::default();
        }
    };

    let body = envelope.response.unwrap_or_default();
    let mut fragments: Vec<String> = Vec::new();
    let mut actions = Vec::new();

    if let Some(content) = body.content.as_ref().and_then(Value::as_str) {
        if !content.is_empty() {
            fragments.push(content.to_string());
        }
    }

    for raw in body.output.unwrap_or_default() {
        let item = match serde_json::from_value::<OutputItem>(raw) {
            Ok(item) => item,
            Err(err) => {
                tracing::debug!(error = %err, "skipping malformed output item");
                continue;
            }
        };

        match item {
            OutputItem::Message { content } => {
                fragments.extend(
                    content
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|part| part.text)
                        .filter(|text| !text.is_empty()),
                );
            }
            OutputItem::Reasoning { summary, text } => {
                let summary = summary.unwrap_or_default();
                if summary.is_empty() {
                    if let Some(text) = text.filter(|t| !t.is_empty()) {
                        fragments.push(text);
                    }
                } else {
                    fragments.extend(
                        summary
                            .into_iter()
                            .filter(|part| part.kind.as_deref() == Some("summary_text"))
                            .filter_map(|part| part.text),
                    );
                }
            }
            OutputItem::ComputerCall { action } => {
                if let Some(action) = action.filter(|a| !a.is_empty()) {
                    actions.extend(normalize_action(&Value::Object(action)));
                }
            }
            OutputItem::Other => {}
        }
    }

    AgentResponse {
        thought: (!fragments.is_empty()).then(|| fragments.join(" ")),
        actions,
    }
}
