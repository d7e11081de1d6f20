//! Tests for status, queue, metrics and remove subcommands.

use super::parse;
use crate::cli::CliCommand;

#[test]
fn cli_parse_status() {
    match parse(&["dfq", "status", "7"]) {
        CliCommand::Status { id } => assert_eq!(id, 7),
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_queue() {
    assert!(matches!(parse(&["dfq", "queue"]), CliCommand::Queue));
}

#[test]
fn cli_parse_metrics() {
    assert!(matches!(parse(&["dfq", "metrics"]), CliCommand::Metrics));
}

#[test]
fn cli_parse_remove() {
    match parse(&["dfq", "remove", "3"]) {
        CliCommand::Remove { id } => assert_eq!(id, 3),
        _ => panic!("expected Remove"),
    }
}

#[test]
fn cli_rejects_unknown_subcommand() {
    use clap::Parser;
    assert!(crate::cli::Cli::try_parse_from(["dfq", "pause", "1"]).is_err());
}
