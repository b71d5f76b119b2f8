//! Metrics collection and reporting for the forwarder.
//!
//! Counters and gauges are relaxed atomics so that they can be bumped from
//! `&self`; a [`MetricsSnapshot`] freezes the values for reporting.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/* ---------------------------------------------------------------- *
 * Simple Counter
 * ---------------------------------------------------------------- */

#[derive(Debug)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

/* ---------------------------------------------------------------- *
 * Gauge
 * ---------------------------------------------------------------- */

#[derive(Debug)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new()
    }
}

/* ---------------------------------------------------------------- *
 * Aggregate forwarder metrics
 * ---------------------------------------------------------------- */

#[derive(Debug, Default)]
pub struct ForwarderMetrics {
    // Interest path
    pub interests_received: Counter,
    pub interests_forwarded: Counter,
    pub interests_aggregated: Counter,
    pub interests_satisfied: Counter,
    pub interests_timed_out: Counter,

    // Data path
    pub data_received: Counter,
    pub data_sent: Counter,

    // Drops
    pub dropped_malformed: Counter,
    pub dropped_verification: Counter,
    pub dropped_no_route: Counter,
    pub dropped_duplicate: Counter,
    pub dropped_unsolicited: Counter,
    pub dropped_pit_full: Counter,
    pub send_failures: Counter,

    // Table sizes
    pub pit_size: Gauge,
    pub fib_size: Gauge,
    pub face_count: Gauge,
}

/// Point-in-time copy of [`ForwarderMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub interests_received: u64,
    pub interests_forwarded: u64,
    pub interests_aggregated: u64,
    pub interests_satisfied: u64,
    pub interests_timed_out: u64,
    pub data_received: u64,
    pub data_sent: u64,
    pub dropped_malformed: u64,
    pub dropped_verification: u64,
    pub dropped_no_route: u64,
    pub dropped_duplicate: u64,
    pub dropped_unsolicited: u64,
    pub dropped_pit_full: u64,
    pub send_failures: u64,
    pub pit_size: u64,
    pub fib_size: u64,
    pub face_count: u64,
}

impl ForwarderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            interests_received: self.interests_received.value(),
            interests_forwarded: self.interests_forwarded.value(),
            interests_aggregated: self.interests_aggregated.value(),
            interests_satisfied: self.interests_satisfied.value(),
            interests_timed_out: self.interests_timed_out.value(),
            data_received: self.data_received.value(),
            data_sent: self.data_sent.value(),
            dropped_malformed: self.dropped_malformed.value(),
            dropped_verification: self.dropped_verification.value(),
            dropped_no_route: self.dropped_no_route.value(),
            dropped_duplicate: self.dropped_duplicate.value(),
            dropped_unsolicited: self.dropped_unsolicited.value(),
            dropped_pit_full: self.dropped_pit_full.value(),
            send_failures: self.send_failures.value(),
            pit_size: self.pit_size.value(),
            fib_size: self.fib_size.value(),
            face_count: self.face_count.value(),
        }
    }
}
