// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::io::{Cursor, Write};

use pretty_assertions::assert_eq;
use serde_json::json;
use tr_domain_types::{Action, Position, Screenshot};
use tr_loaders::{load_archive_bytes, load_archive_file, LoadError};
use zip::write::FileOptions;
use zip::ZipWriter;

/// Builds an in-memory archive; names ending in `/` become directory entries.
fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, FileOptions::default()).unwrap();
        } else {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

fn response_with_click(thought: &str, x: i64, y: i64) -> String {
    json!({
        "response": {"output": [
            {"type": "message", "content": [{"text": thought}]},
            {"type": "computer_call", "action": {"type": "click", "x": x, "y": y}}
        ]}
    })
    .to_string()
}

#[test]
fn turns_are_sorted_by_index_regardless_of_entry_order() {
    let r3 = response_with_click("third", 3, 3);
    let r1 = response_with_click("first", 1, 1);
    let bytes = build_zip(&[
        ("run/", ""),
        ("run/turn_3/", ""),
        ("run/turn_3/screenshot_3.png", "png3"),
        ("run/turn_3/step_agent_response.json", r3.as_str()),
        ("run/turn_1/screenshot_1.png", "png1"),
        ("run/turn_1/step_agent_response.json", r1.as_str()),
        ("run/turn_2/notes.txt", "just notes"),
        ("run/README.md", "ignored"),
        ("elsewhere/turn_9/screenshot_9.png", "ignored"),
    ]);

    let turns = load_archive_bytes(bytes).unwrap();
    let ids: Vec<&str> = turns.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["turn_1", "turn_2", "turn_3"]);
    let indices: Vec<u64> = turns.iter().map(|t| t.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);

    assert_eq!(turns[0].thought.as_deref(), Some("first"));
    assert_eq!(
        turns[0].actions,
        vec![Action::Click {
            position: Position(1.0, 1.0),
            timestamp: None,
        }]
    );
    assert_eq!(
        turns[0].screenshot,
        Some(Screenshot::embedded("run/turn_1/screenshot_1.png", b"png1".to_vec()))
    );

    assert_eq!(turns[1].screenshot, None);
    assert_eq!(turns[1].thought, None);
    assert!(turns[1].actions.is_empty());
}

#[test]
fn malformed_agent_response_degrades_only_its_turn() {
    let good = response_with_click("ok", 5, 6);
    let bytes = build_zip(&[
        ("run/turn_1/a_agent_response.json", "{ this is not json"),
        ("run/turn_2/a_agent_response.json", good.as_str()),
    ]);

    let turns = load_archive_bytes(bytes).unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].thought, None);
    assert!(turns[0].actions.is_empty());
    assert_eq!(turns[1].thought.as_deref(), Some("ok"));
    assert_eq!(turns[1].actions.len(), 1);
}

#[test]
fn empty_archive_is_rejected() {
    let bytes = build_zip(&[]);
    assert!(matches!(load_archive_bytes(bytes), Err(LoadError::EmptySource)));
}

#[test]
fn archive_without_turn_folders_is_rejected() {
    let bytes = build_zip(&[("run/data/file.json", "{}"), ("top.txt", "")]);
    assert!(matches!(load_archive_bytes(bytes), Err(LoadError::NoTrajectoryRoot)));
}

#[test]
fn garbage_bytes_are_an_archive_error() {
    let result = load_archive_bytes(b"definitely not a zip".to_vec());
    assert!(matches!(result, Err(LoadError::Archive(_))));
}

#[tokio::test]
async fn loads_archive_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trajectory.zip");
    std::fs::write(&path, build_zip(&[("t/turn_0/screenshot_0.png", "x")])).unwrap();

    let turns = load_archive_file(&path).await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].id, "turn_0");
    assert_eq!(turns[0].index, 0);
}

#[tokio::test]
async fn missing_archive_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_archive_file(dir.path().join("missing.zip")).await;
    assert!(matches!(result, Err(LoadError::Io(_))));
}
