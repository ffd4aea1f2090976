use super::TaskStatus;

#[test]
fn test_task_status_as_str() {
    assert_eq!(TaskStatus::Pending.as_str(), "pending");
    assert_eq!(TaskStatus::Running.as_str(), "running");
    assert_eq!(TaskStatus::Succeeded.as_str(), "succeeded");
    assert_eq!(TaskStatus::Failed.as_str(), "failed");
    assert_eq!(TaskStatus::Skipped.as_str(), "skipped");
}

#[test]
fn test_task_status_from_str() {
    assert_eq!(TaskStatus::from_str("pending"), Some(TaskStatus::Pending));
    assert_eq!(TaskStatus::from_str("running"), Some(TaskStatus::Running));
    assert_eq!(
        TaskStatus::from_str("succeeded"),
        Some(TaskStatus::Succeeded)
    );
    assert_eq!(TaskStatus::from_str("failed"), Some(TaskStatus::Failed));
    assert_eq!(TaskStatus::from_str("skipped"), Some(TaskStatus::Skipped));
    assert_eq!(TaskStatus::from_str("invalid"), None);
}

#[test]
fn test_task_status_display() {
    assert_eq!(format!("{}", TaskStatus::Pending), "pending");
    assert_eq!(format!("{}", TaskStatus::Skipped), "skipped");
}

#[test]
fn test_terminal_statuses() {
    assert!(!TaskStatus::Pending.is_terminal());
    assert!(!TaskStatus::Running.is_terminal());
    assert!(TaskStatus::Succeeded.is_terminal());
    assert!(TaskStatus::Failed.is_terminal());
    assert!(TaskStatus::Skipped.is_terminal());
}

#[test]
fn test_task_status_serializes_lowercase() {
    let json = serde_json::to_string(&TaskStatus::Succeeded).unwrap();
    assert_eq!(json, "\"succeeded\"");
    let parsed: TaskStatus = serde_json::from_str("\"skipped\"").unwrap();
    assert_eq!(parsed, TaskStatus::Skipped);
}
