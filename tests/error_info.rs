// tests/error_info.rs

use anyhow::{anyhow, Context};

use opgraph::error_info::SerializableErrorInfo;
use opgraph::errors::{DefinitionError, MonitorError};
use opgraph::types::{CheckRunHealthResult, RunStatus, WorkerStatus};

#[test]
fn context_chain_becomes_nested_causes() {
    let err = Err::<(), _>(anyhow!("socket closed"))
        .context("terminating run r1")
        .unwrap_err();

    let info = SerializableErrorInfo::from_error(&err);

    assert_eq!(info.message, "terminating run r1");
    assert_eq!(info.cls_name.as_deref(), Some("Error"));
    let cause = info.cause.as_deref().expect("context should keep its cause");
    assert_eq!(cause.message, "socket closed");
    assert_eq!(info.root_cause().message, "socket closed");

    let rendered = info.to_string();
    assert!(rendered.starts_with("Error: terminating run r1"));
    assert!(rendered.contains("The above error was caused by the following error:\nsocket closed"));
}

#[test]
fn class_names_follow_the_error_type() {
    let monitor = anyhow::Error::from(MonitorError::RunNotFound {
        run_id: "r1".to_string(),
    });
    assert_eq!(
        SerializableErrorInfo::from(&monitor).cls_name.as_deref(),
        Some("RunNotFound")
    );

    let definition = anyhow::Error::from(DefinitionError::UnknownNode {
        node: "x".to_string(),
    });
    assert_eq!(
        SerializableErrorInfo::from_error(&definition).cls_name.as_deref(),
        Some("DefinitionError")
    );

    let io = anyhow::Error::from(std::io::Error::other("disk full"));
    assert_eq!(
        SerializableErrorInfo::from_error(&io).cls_name.as_deref(),
        Some("IoError")
    );
}

#[test]
fn error_info_serializes_to_json() {
    let info = SerializableErrorInfo::new("boom", Some("Error"));

    let json = serde_json::to_string(&info).unwrap();
    let back: SerializableErrorInfo = serde_json::from_str(&json).unwrap();

    assert_eq!(back, info);
    assert_eq!(back.root_cause(), &info);
}

#[test]
fn run_status_text_form() {
    assert_eq!(RunStatus::Canceling.to_string(), "CANCELING");
    assert_eq!("NOT_STARTED".parse::<RunStatus>().unwrap(), RunStatus::NotStarted);
    assert!("RUNNING".parse::<RunStatus>().is_err());

    assert!(RunStatus::Failure.is_finished());
    assert!(!RunStatus::Canceling.is_finished());
    assert!(RunStatus::Canceling.is_in_progress());
    assert!(!RunStatus::Queued.is_in_progress());
}

#[test]
fn health_result_display() {
    assert_eq!(
        CheckRunHealthResult::with_msg(WorkerStatus::Failed, "exit code 137").to_string(),
        "FAILED: 'exit code 137'"
    );
    assert_eq!(CheckRunHealthResult::new(WorkerStatus::NotFound).to_string(), "NOT_FOUND");
    assert!(WorkerStatus::Success.is_healthy());
    assert!(!WorkerStatus::Unknown.is_healthy());
}
