//! CLI parse-level tests.

use clap::Parser;

use super::{Cli, CliCommand};

#[test]
fn parse_add_with_options() {
    let cli = Cli::try_parse_from([
        "fdm",
        "add",
        "https://example.com/file.iso",
        "--dir",
        "/tmp/dl",
        "--threads",
        "8",
        "--tag",
        "iso",
        "--tag",
        "debian",
    ])
    .unwrap();
    match cli.command {
        CliCommand::Add {
            url,
            dir,
            file_name,
            threads,
            tags,
        } => {
            assert_eq!(url, "https://example.com/file.iso");
            assert_eq!(dir.as_deref(), Some(std::path::Path::new("/tmp/dl")));
            assert!(file_name.is_none());
            assert_eq!(threads, 8);
            assert_eq!(tags, vec!["iso".to_string(), "debian".to_string()]);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_add_default_threads() {
    let cli = Cli::try_parse_from(["fdm", "add", "https://example.com/x"]).unwrap();
    match cli.command {
        CliCommand::Add { threads, tags, .. } => {
            assert_eq!(threads, 4);
            assert!(tags.is_empty());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_run_with_and_without_ids() {
    let cli = Cli::try_parse_from(["fdm", "run"]).unwrap();
    assert!(matches!(cli.command, CliCommand::Run { ids } if ids.is_empty()));

    let cli = Cli::try_parse_from(["fdm", "run", "3", "5"]).unwrap();
    assert!(matches!(cli.command, CliCommand::Run { ids } if ids == vec![3, 5]));
}

#[test]
fn parse_status_with_tags_and_json() {
    let cli =
        Cli::try_parse_from(["fdm", "status", "--tag", "iso", "--json"]).unwrap();
    match cli.command {
        CliCommand::Status { tags, json } => {
            assert_eq!(tags, vec!["iso".to_string()]);
            assert!(json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_lifecycle_commands() {
    assert!(matches!(
        Cli::try_parse_from(["fdm", "pause", "7"]).unwrap().command,
        CliCommand::Pause { id: 7 }
    ));
    assert!(matches!(
        Cli::try_parse_from(["fdm", "resume", "7"]).unwrap().command,
        CliCommand::Resume { id: 7 }
    ));
    assert!(matches!(
        Cli::try_parse_from(["fdm", "stop", "7"]).unwrap().command,
        CliCommand::Stop { id: 7 }
    ));
    assert!(matches!(
        Cli::try_parse_from(["fdm", "remove", "7"]).unwrap().command,
        CliCommand::Remove { id: 7 }
    ));
}

#[test]
fn missing_subcommand_is_an_error() {
    assert!(Cli::try_parse_from(["fdm"]).is_err());
    assert!(Cli::try_parse_from(["fdm", "pause"]).is_err());
}
