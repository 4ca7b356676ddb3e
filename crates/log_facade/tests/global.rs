//! Lifecycle of the process-wide logger.
//!
//! Kept in a single test since the process-wide logger is shared by every test in this binary.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::fs;

use log_facade::{Level, LogConfig, LoggerError, RotationPolicy};
use serde_json::json;

#[test]
fn process_wide_logger_lifecycle() {
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();

    assert_eq!(log_facade::configuration(), LogConfig::default());

    let config = LogConfig {
        file_name: "first".to_string(),
        level: Level::Info,
        directory: first_dir.path().to_path_buf(),
        rotation: RotationPolicy::Never,
        console: false,
        local_time: false,
        ..log_facade::configuration()
    };
    log_facade::initialize(config).unwrap();
    assert_eq!(log_facade::configuration().file_name, "first");

    log_facade::debug!("below minimum");
    log_facade::info!("hello ", "world ", 42);
    log_facade::infof!("processed {} of {}", 3, 4);
    log_facade::errorw!("charge failed", "code", 7, "dangling");
    log_facade::flush().unwrap();

    let main = fs::read_to_string(first_dir.path().join("first.log")).unwrap();
    let errors = fs::read_to_string(first_dir.path().join("first_err.log")).unwrap();
    assert!(!main.contains("below minimum"));
    assert!(main.contains("\tINFO\thello world 42\n"));
    assert!(main.contains("\tINFO\tprocessed 3 of 4\n"));
    assert!(main.contains("\tERROR\tcharge failed\t{\"code\":7,\"ignored\":\"dangling\"}\n"));
    assert!(errors.contains("charge failed"));
    assert!(!errors.contains("hello world"));

    // Re-initializing with a new stem redirects subsequent writes
    let config = LogConfig {
        file_name: "second".to_string(),
        directory: second_dir.path().to_path_buf(),
        ..log_facade::configuration()
    };
    log_facade::initialize(config).unwrap();
    log_facade::warn!("after switch");
    log_facade::flush().unwrap();

    let first_main = fs::read_to_string(first_dir.path().join("first.log")).unwrap();
    let second_main = fs::read_to_string(second_dir.path().join("second.log")).unwrap();
    assert!(!first_main.contains("after switch"));
    assert!(second_main.contains("\tWARN\tafter switch\n"));

    // A failed initialization keeps the previous logger
    let invalid = LogConfig {
        file_name: String::new(),
        ..log_facade::configuration()
    };
    assert!(matches!(
        log_facade::initialize(invalid),
        Err(LoggerError::Configuration(_))
    ));
    assert_eq!(log_facade::configuration().file_name, "second");

    let bound = log_facade::with_fields(&[json!("job"), json!("sync")]);
    bound.infow("bound fields", &[json!("items"), json!(12)]);
    log_facade::infow!(logger: bound, "via macro", "items", 13);

    // Without a panic nothing is logged
    log_facade::flush().unwrap();
    let before = fs::read_to_string(second_dir.path().join("second_err.log")).unwrap();
    assert_eq!(log_facade::report_panic_if_any(&[], || 5).unwrap(), 5);
    log_facade::flush().unwrap();
    let after = fs::read_to_string(second_dir.path().join("second_err.log")).unwrap();
    assert_eq!(before, after);

    let diagnostic = json!({ "x": 1 });
    let recovered = log_facade::report_panic_if_any(&[&diagnostic], || {
        panic!("boom");
    })
    .unwrap_err();
    assert_eq!(recovered.message, "boom");
    log_facade::flush().unwrap();

    let second_main = fs::read_to_string(second_dir.path().join("second.log")).unwrap();
    assert!(second_main.contains("\tINFO\tbound fields\t{\"job\":\"sync\",\"items\":12}\n"));
    assert!(second_main.contains("\tINFO\tvia macro\t{\"job\":\"sync\",\"items\":13}\n"));

    let errors = fs::read_to_string(second_dir.path().join("second_err.log")).unwrap();
    assert!(errors.contains("\tERROR\tboom"));
    assert_eq!(
        errors.matches("\tframe ").count(),
        recovered.frames.len()
    );
    assert!(errors.contains("EXTRAS#0 DATA:Object {"));
    assert!(errors.contains("\"x\": Number(1)"));
}
