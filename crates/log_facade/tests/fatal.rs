//! `fatal` records are flushed before the process exits.

#![allow(clippy::unwrap_used)]

use std::{env, fs, process::Command};

use log_facade::{LogConfig, Logger, RotationPolicy};
use serde_json::json;

const CHILD_DIRECTORY_ENV: &str = "LOG_FACADE_FATAL_TEST_DIRECTORY";

#[test]
fn fatal_logs_flushes_and_exits() {
    if let Some(directory) = env::var_os(CHILD_DIRECTORY_ENV) {
        let logger = Logger::new(&LogConfig {
            file_name: "fatal".to_string(),
            directory: directory.into(),
            rotation: RotationPolicy::Never,
            console: false,
            ..LogConfig::default()
        })
        .unwrap();
        logger.fatalw("unrecoverable", &[json!("reason"), json!("disk full")]);
    }

    let dir = tempfile::tempdir().unwrap();
    let status = Command::new(env::current_exe().unwrap())
        .args(["fatal_logs_flushes_and_exits", "--exact", "--nocapture"])
        .env(CHILD_DIRECTORY_ENV, dir.path())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));

    let main = fs::read_to_string(dir.path().join("fatal.log")).unwrap();
    let errors = fs::read_to_string(dir.path().join("fatal_err.log")).unwrap();
    assert!(main.contains("\tFATAL\tunrecoverable\t{\"reason\":\"disk full\"}\n"));
    assert!(errors.contains("unrecoverable"));
}
