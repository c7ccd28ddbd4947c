// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Conversion of raw recorded action objects into canonical [`Action`]s
//!
//! Recorders disagree on field names, so every branch checks the fields it
//! needs and gives up quietly when they are missing. A dropped action never
//! fails the surrounding parse.

use serde_json::{Map, Value};
use tr_domain_types::{Action, KeyModifier, Position, ScrollDirection};

/// Normalize one raw action record, or `None` if it is unknown or incomplete.
pub fn normalize_action(raw: &Value) -> Option<Action> {
    let object = raw.as_object()?;
    let action_type = object.get("type").and_then(Value::as_str).unwrap_or("");
    let action = convert(object, action_type);
    if action.is_none() {
        tracing::debug!(action_type, "dropping unrecognized or incomplete action");
    }
    action
}

fn convert(object: &Map<String, Value>, action_type: &str) -> Option<Action> {
    let timestamp = number(object, "timestamp");

    match action_type {
        "click" => Some(Action::Click {
            position: Position(number(object, "x")?, number(object, "y")?),
            timestamp,
        }),
        "drag" => Some(Action::Drag {
            from: Position(number(object, "start_x")?, number(object, "start_y")?),
            to: Position(number(object, "end_x")?, number(object, "end_y")?),
            timestamp,
        }),
        "type" | "input" => non_empty(object, "text").map(|text| Action::Type {
            text: text.to_string(),
            timestamp,
        }),
        "scroll" => Some(Action::Scroll {
            direction: object
                .get("direction")
                .and_then(Value::as_str)
                .and_then(ScrollDirection::parse)
                .unwrap_or_default(),
            amount: number(object, "amount"),
            timestamp,
        }),
        "key" => non_empty(object, "key").map(|key| Action::Key {
            key: key.to_string(),
            modifiers: object.get("modifiers").and_then(Value::as_array).map(|mods| {
                mods.iter().filter_map(Value::as_str).filter_map(KeyModifier::parse).collect()
            }),
            timestamp,
        }),
        _ => None,
    }
}

fn number(object: &Map<String, Value>, field: &str) -> Option<f64> {
    object.get(field).and_then(Value::as_f64)
}

fn non_empty<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    object.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn click_requires_numeric_coordinates() {
        assert_eq!(
            normalize_action(&json!({"type": "click", "x": 10, "y": 20.5, "timestamp": 7})),
            Some(Action::Click {
                position: Position(10.0, 20.5),
                timestamp: Some(7.0),
            })
        );
        assert_eq!(normalize_action(&json!({"type": "click", "x": 10})), None);
        assert_eq!(normalize_action(&json!({"type": "click", "x": "10", "y": 2})), None);
    }

    #[test]
    fn drag_uses_start_and_end_fields() {
        assert_eq!(
            normalize_action(&json!({
                "type": "drag", "start_x": 1, "start_y": 2, "end_x": 3, "end_y": 4
            })),
            Some(Action::Drag {
                from: Position(1.0, 2.0),
                to: Position(3.0, 4.0),
                timestamp: None,
            })
        );
        assert_eq!(
            normalize_action(&json!({"type": "drag", "start_x": 1, "start_y": 2, "end_x": 3})),
            None
        );
    }

    #[test]
    fn input_is_an_alias_for_type_and_requires_text() {
        assert_eq!(
            normalize_action(&json!({"type": "input", "text": "hello"})),
            Some(Action::Type {
                text: "hello".into(),
                timestamp: None,
            })
        );
        assert_eq!(normalize_action(&json!({"type": "type", "text": ""})), None);
        assert_eq!(normalize_action(&json!({"type": "type"})), None);
    }

    #[test]
    fn scroll_defaults_direction_to_down() {
        assert_eq!(
            normalize_action(&json!({"type": "scroll"})),
            Some(Action::Scroll {
                direction: ScrollDirection::Down,
                amount: None,
                timestamp: None,
            })
        );
        assert_eq!(
            normalize_action(&json!({"type": "scroll", "direction": "left", "amount": 3})),
            Some(Action::Scroll {
                direction: ScrollDirection::Left,
                amount: Some(3.0),
                timestamp: None,
            })
        );
        assert_eq!(
            normalize_action(&json!({"type": "scroll", "direction": "sideways"})),
            Some(Action::Scroll {
                direction: ScrollDirection::Down,
                amount: None,
                timestamp: None,
            })
        );
    }

    #[test]
    fn key_passes_known_modifiers_through() {
        assert_eq!(
            normalize_action(&json!({"type": "key", "key": "Enter", "modifiers": ["ctrl", "hyper"]})),
            Some(Action::Key {
                key: "Enter".into(),
                modifiers: Some(vec![KeyModifier::Ctrl]),
                timestamp: None,
            })
        );
        assert_eq!(normalize_action(&json!({"type": "key", "key": ""})), None);
    }

    #[test]
    fn unknown_types_and_non_objects_are_dropped() {
        assert_eq!(normalize_action(&json!({"type": "hover", "x": 1, "y": 1})), None);
        assert_eq!(normalize_action(&json!({"x": 1, "y": 1})), None);
        assert_eq!(normalize_action(&json!("click")), None);
    }
}
