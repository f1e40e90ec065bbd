// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    none = { 0, 0 },
    first = { 1, 1_000 },
    second = { 2, 2_000 },
    third = { 3, 4_000 },
    capped = { 7, 60_000 },
    huge = { 200, 60_000 },
)]
fn default_backoff(retry_count: u32, expected_ms: u64) {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for(retry_count), Duration::from_millis(expected_ms));
}

#[test]
fn exhausted_at_max_attempts() {
    let policy = RetryPolicy::default();
    assert!(!policy.is_exhausted(2));
    assert!(policy.is_exhausted(3));
    assert!(policy.is_exhausted(4));
}

#[test]
fn missing_fields_use_defaults() {
    let policy: RetryPolicy = toml::from_str("max_attempts = 5").unwrap();
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.initial_delay_ms, 1_000);
    assert_eq!(policy.max_delay_ms, 60_000);
}
