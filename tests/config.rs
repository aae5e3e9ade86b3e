// tests/config.rs

mod common;
use crate::common::{init_tracing, ConfigFileBuilder};

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use opgraph::config::{load_and_validate, load_or_default, ConfigFile};
use opgraph::errors::OpgraphError;
use opgraph::monitor::{MonitorSettings, DEFAULT_MAX_RUNTIME_SECONDS};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn config_error(contents: &str) -> String {
    init_tracing();
    let file = write_config(contents);
    match load_and_validate(file.path()) {
        Err(OpgraphError::ConfigError(msg)) => msg,
        Err(e) => panic!("Expected ConfigError, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn empty_file_uses_defaults() {
    init_tracing();
    let file = write_config("");

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.monitor_settings(), MonitorSettings::default());
    assert_eq!(cfg.run_monitoring.max_runtime_seconds, DEFAULT_MAX_RUNTIME_SECONDS);
    assert!(cfg.graph.document.is_none());
}

#[test]
fn run_monitoring_section_is_read() {
    init_tracing();
    let file = write_config(
        r#"
[run_monitoring]
enabled = false
start_timeout_seconds = 60
max_resume_run_attempts = 2
poll_interval_seconds = 5
max_runtime_seconds = 3600
"#,
    );

    let settings = load_and_validate(file.path()).unwrap().monitor_settings();

    assert_eq!(
        settings,
        MonitorSettings {
            enabled: false,
            start_timeout_seconds: 60,
            max_resume_run_attempts: 2,
            poll_interval_seconds: 5,
            max_runtime_seconds: 3600,
        }
    );
}

#[test]
fn relative_document_path_resolves_against_the_config_dir() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("Opgraph.toml");
    fs::write(&config_path, "[graph]\ndocument = \"graphs/job.toml\"\n").unwrap();

    let cfg = load_and_validate(&config_path).unwrap();

    assert_eq!(
        cfg.graph.document,
        Some(dir.path().join("graphs/job.toml"))
    );
}

#[test]
fn absolute_document_path_is_kept() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let absolute = dir.path().join("elsewhere.toml");
    let config_path = dir.path().join("Opgraph.toml");
    fs::write(
        &config_path,
        format!("[graph]\ndocument = {:?}\n", absolute.display().to_string()),
    )
    .unwrap();

    let cfg = load_and_validate(&config_path).unwrap();

    assert_eq!(cfg.graph.document, Some(absolute));
}

#[test]
fn zero_poll_interval_is_rejected() {
    let msg = config_error("[run_monitoring]\npoll_interval_seconds = 0\n");
    assert!(msg.contains("poll_interval_seconds"));
}

#[test]
fn zero_start_timeout_is_rejected() {
    let msg = config_error("[run_monitoring]\nstart_timeout_seconds = 0\n");
    assert!(msg.contains("start_timeout_seconds"));
}

#[test]
fn zero_max_runtime_is_rejected() {
    let msg = config_error("[run_monitoring]\nmax_runtime_seconds = 0\n");
    assert!(msg.contains("max_runtime_seconds"));
}

#[test]
fn empty_document_path_is_rejected() {
    let msg = config_error("[graph]\ndocument = \"\"\n");
    assert!(msg.contains("[graph].document"));
}

#[test]
fn unknown_keys_are_a_toml_error() {
    init_tracing();
    let file = write_config("[run_monitoring]\npoll_every = 3\n");

    let err = load_and_validate(file.path()).unwrap_err();

    assert!(matches!(err, OpgraphError::TomlError(_)), "got {err:?}");
}

#[test]
fn missing_config_falls_back_to_defaults() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let cfg = load_or_default(dir.path().join("absent.toml")).unwrap();

    assert_eq!(cfg.monitor_settings(), ConfigFile::default().monitor_settings());
}

#[test]
fn builder_goes_through_validation() {
    let cfg = ConfigFileBuilder::new()
        .start_timeout(30)
        .max_resume_attempts(4)
        .poll_interval(10)
        .max_runtime(900)
        .build();
    let settings = cfg.monitor_settings();
    assert_eq!(settings.start_timeout_seconds, 30);
    assert_eq!(settings.max_resume_run_attempts, 4);
    assert_eq!(settings.poll_interval_seconds, 10);
    assert_eq!(settings.max_runtime_seconds, 900);

    let raw = ConfigFileBuilder::new().poll_interval(0).raw();
    assert!(ConfigFile::try_from(raw).is_err());

    let disabled = ConfigFileBuilder::new().disabled().build();
    assert!(!disabled.monitor_settings().enabled);
}

#[test]
fn default_config_path_is_in_the_working_directory() {
    assert_eq!(opgraph::config::default_config_path(), PathBuf::from("Opgraph.toml"));
}
