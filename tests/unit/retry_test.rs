//! Unit tests for the polling retry policy

use imagegen_relay::config::Settings;
use imagegen_relay::scheduler::{NextPoll, RetryPolicy};
use std::time::Duration;

#[test]
fn test_policy_from_default_settings() {
    let policy = RetryPolicy::from_settings(&Settings::default());

    assert_eq!(policy.poll_interval, Duration::from_secs(5));
    assert_eq!(policy.failure_backoff, Duration::from_secs(10));
    assert_eq!(policy.max_failures, 5);
    assert!(!policy.mark_failed_on_exhaustion);
}

#[test]
fn test_gives_up_exactly_at_cap() {
    let mut settings = Settings::default();
    settings.polling.max_failures = 3;
    settings.polling.failure_backoff_ms = 250;
    let policy = RetryPolicy::from_settings(&settings);

    assert_eq!(policy.after_failure(1), NextPoll::After(Duration::from_millis(250)));
    assert_eq!(policy.after_failure(2), NextPoll::After(Duration::from_millis(250)));
    assert_eq!(policy.after_failure(3), NextPoll::GiveUp);
}

#[test]
fn test_pending_polls_never_back_off() {
    let policy = RetryPolicy::default();
    let delays: Vec<_> = (0..10).map(|_| policy.after_pending()).collect();
    assert!(delays
        .iter()
        .all(|d| *d == NextPoll::After(Duration::from_secs(5))));
}
