//! Tests for add and run subcommands.

use super::parse;
use crate::cli::CliCommand;
use std::path::Path;

#[test]
fn cli_parse_add() {
    match parse(&["dfq", "add", "thesis.txt"]) {
        CliCommand::Add { path } => assert_eq!(path, Path::new("thesis.txt")),
        _ => panic!("expected Add"),
    }
}

#[test]
fn cli_parse_run() {
    match parse(&["dfq", "run"]) {
        CliCommand::Run { watch, out_dir } => {
            assert!(!watch);
            assert!(out_dir.is_none());
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_watch() {
    match parse(&["dfq", "run", "--watch"]) {
        CliCommand::Run { watch, .. } => assert!(watch),
        _ => panic!("expected Run with --watch"),
    }
}

#[test]
fn cli_parse_run_out_dir() {
    match parse(&["dfq", "run", "--out-dir", "/tmp/out"]) {
        CliCommand::Run { watch, out_dir } => {
            assert!(!watch);
            assert_eq!(out_dir.as_deref(), Some(Path::new("/tmp/out")));
        }
        _ => panic!("expected Run with --out-dir"),
    }
}
