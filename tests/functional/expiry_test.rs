//! Functional tests for record expiry after the retention window

use imagegen_relay::jobs::{JobRecord, JobRegistry, JobStatus};
use imagegen_relay::scheduler::ExpirySweeper;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const RETENTION: Duration = Duration::from_secs(3600);

fn completed_job(registry: &JobRegistry, job_id: &str) {
    registry
        .create(JobRecord::new(job_id, "a cat", json!(null), "http://cb/x"))
        .unwrap();
    assert!(registry.mark_completed(job_id, None));
}

#[tokio::test(start_paused = true)]
async fn test_removed_after_retention_window() {
    let registry = Arc::new(JobRegistry::new());
    let sweeper = ExpirySweeper::new(registry.clone(), RETENTION);

    completed_job(&registry, "job-1");
    sweeper.arm("job-1");

    tokio::time::sleep(RETENTION - Duration::from_secs(1)).await;
    assert_eq!(
        registry.get("job-1").map(|job| job.status),
        Some(JobStatus::Completed)
    );

    tokio::time::sleep(Duration::from_secs(2)).await;
    tokio::task::yield_now().await;
    assert!(!registry.contains("job-1"));
}

#[tokio::test(start_paused = true)]
async fn test_each_job_expires_on_its_own_timer() {
    let registry = Arc::new(JobRegistry::new());
    let sweeper = ExpirySweeper::new(registry.clone(), RETENTION);

    completed_job(&registry, "early");
    sweeper.arm("early");

    tokio::time::sleep(Duration::from_secs(1800)).await;
    completed_job(&registry, "late");
    sweeper.arm("late");

    tokio::time::sleep(Duration::from_secs(1801)).await;
    tokio::task::yield_now().await;
    assert!(!registry.contains("early"));
    assert!(registry.contains("late"));

    tokio::time::sleep(Duration::from_secs(1800)).await;
    tokio::task::yield_now().await;
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_expiry_of_already_removed_job_is_noop() {
    let registry = Arc::new(JobRegistry::new());
    let sweeper = ExpirySweeper::new(registry.clone(), RETENTION);

    completed_job(&registry, "job-1");
    sweeper.arm("job-1");
    registry.remove("job-1");
    completed_job(&registry, "job-2");

    tokio::time::sleep(RETENTION + Duration::from_secs(1)).await;
    tokio::task::yield_now().await;
    assert!(registry.contains("job-2"));
    assert_eq!(sweeper.retention(), RETENTION);
}
