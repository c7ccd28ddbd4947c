// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use serde_json::json;
use tr_cli::source::{SourceArgs, SourceSpec};
use tr_cli::{CliConfig, Cli, Commands, Parser};
use tr_domain_types::Action;
use tr_logging::CliLogLevel;
use tr_player::ReplayerConfig;

fn write(path: &Path, content: impl AsRef<[u8]>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn source_args(source: &Path, stream: bool) -> SourceArgs {
    SourceArgs {
        source: source.to_string_lossy().into_owned(),
        stream,
        no_pacing: true,
    }
}

#[test]
fn parses_play_with_global_flags() {
    let cli = Cli::try_parse_from([
        "trajectory-replay",
        "play",
        "https://example.com/run.zip",
        "--speed",
        "2",
        "--log-level",
        "debug",
        "--config",
        "/tmp/replay.toml",
    ])
    .unwrap();

    assert_eq!(cli.logging.log_level, Some(CliLogLevel::Debug));
    assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/replay.toml")));
    match cli.command {
        Commands::Play(args) => {
            assert_eq!(args.source.source, "https://example.com/run.zip");
            assert_eq!(args.speed, Some(2.0));
            assert!(!args.source.stream);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_inspect_stream_flags() {
    let cli = Cli::try_parse_from(["trajectory-replay", "inspect", "run.ndjson", "--stream", "--no-pacing"])
        .unwrap();
    match cli.command {
        Commands::Inspect(args) => {
            assert!(args.source.stream);
            assert!(args.source.no_pacing);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn source_is_required() {
    assert!(Cli::try_parse_from(["trajectory-replay", "play"]).is_err());
}

#[test]
fn config_file_combines_replayer_and_logging_sections() {
    let config = CliConfig::from_toml_str(
        r#"
[playback]
initial-speed = 2.0

[streaming]
pacing-ms = 0

[logging]
log-level = "warn"
"#,
    )
    .unwrap();

    assert_eq!(config.replayer.playback.initial_speed, 2.0);
    assert_eq!(config.replayer.playback.base_interval_ms, 2000);
    assert_eq!(config.replayer.streaming.pacing_ms, 0);
    assert_eq!(config.logging.log_level, Some(CliLogLevel::Warn));
}

#[test]
fn invalid_config_is_rejected() {
    let err = CliConfig::from_toml_str("[playback]\nmin-speed = 5.0\nmax-speed = 1.0\n").unwrap_err();
    assert!(format!("{err:#}").contains("min-speed"));
}

#[test]
fn local_sources_resolve_by_kind() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("run.zip");
    let ndjson = dir.path().join("run.ndjson");
    write(&archive, b"PK");
    write(&ndjson, b"{}\n");

    let resolve = |path: &Path, stream: bool| SourceSpec::resolve(path.to_str().unwrap(), stream).unwrap();
    assert_eq!(resolve(dir.path(), false), SourceSpec::Directory(dir.path().to_path_buf()));
    assert_eq!(resolve(&archive, false), SourceSpec::ArchiveFile(archive.clone()));
    assert_eq!(resolve(&archive, true), SourceSpec::StreamFile(archive.clone()));
    assert_eq!(resolve(&ndjson, false), SourceSpec::StreamFile(ndjson.clone()));
    assert!(SourceSpec::resolve(dir.path().to_str().unwrap(), true).is_err());
}

#[tokio::test]
async fn inspect_loads_a_trajectory_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("session");
    write(&root.join("turn_2").join("screenshot_2.png"), b"png");
    write(
        &root.join("turn_1").join("step_agent_response.json"),
        serde_json::to_vec(&json!({
            "response": {"output": [
                {"type": "reasoning", "summary": [{"type": "summary_text", "text": "Click OK"}]},
                {"type": "computer_call", "action": {"type": "click", "x": 4, "y": 8}}
            ]}
        }))
        .unwrap(),
    );

    let args = tr_cli::inspect::InspectArgs {
        source: source_args(&root, false),
    };
    let turns = args.load(&ReplayerConfig::default()).await.unwrap();

    let ids: Vec<&str> = turns.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["turn_1", "turn_2"]);
    assert_eq!(turns[0].thought.as_deref(), Some("Click OK"));
    assert!(matches!(turns[0].actions.as_slice(), [Action::Click { .. }]));
    assert!(turns[1].screenshot.is_some());
}

#[tokio::test]
async fn inspect_reads_ndjson_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live.ndjson");
    write(
        &path,
        "{\"thought\":\"first\",\"timestamp\":1}\nnot json\n{\"type\":\"user\",\"timestamp\":2}",
    );

    let args = tr_cli::inspect::InspectArgs {
        source: source_args(&path, false),
    };
    let turns = args.load(&ReplayerConfig::default()).await.unwrap();

    let ids: Vec<&str> = turns.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["turn_0", "turn_1"]);
    assert_eq!(turns[0].thought.as_deref(), Some("first"));
}

#[tokio::test]
async fn inspect_reports_load_errors() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("empty");
    write(&root.join("notes.txt"), b"no turns here");

    let args = tr_cli::inspect::InspectArgs {
        source: source_args(&root, false),
    };
    let err = args.load(&ReplayerConfig::default()).await.unwrap_err();
    assert!(format!("{err:#}").contains("turn_XXX"));
}

#[tokio::test(start_paused = true)]
async fn play_runs_to_the_end_of_a_finished_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.ndjson");
    let lines = [
        json!({"timestamp": 1, "actions": [{"type": "click", "position": [10.0, 20.0]}]}),
        json!({"timestamp": 2, "actions": [{"type": "drag", "from": [0.0, 0.0], "to": [5.0, 5.0]}]}),
    ];
    let body: String = lines.iter().map(|line| format!("{line}\n")).collect();
    write(&path, body);

    let args = tr_cli::play::PlayArgs {
        source: source_args(&path, true),
        speed: Some(4.0),
    };
    args.run(&ReplayerConfig::default()).await.unwrap();
}
