//! Counters for failures that are not surfaced to callers.
//!
//! Counters are emitted through the `metrics` facade, so whichever recorder the process
//! installs (a Prometheus exporter, for instance) receives them:
//!
//! - `tandem_auth_failures_total`: rejected sign-ins and email confirmations
//! - `tandem_audit_writes_total`: audit entries persisted
//! - `tandem_audit_failures_total`: audit deltas that failed to persist

use metrics::{counter, Counter};

pub const AUTH_FAILURES_TOTAL: &str = "tandem_auth_failures_total";
pub const AUDIT_WRITES_TOTAL: &str = "tandem_audit_writes_total";
pub const AUDIT_FAILURES_TOTAL: &str = "tandem_audit_failures_total";

/// Counter handles registered once against the recorder active at construction.
#[derive(Clone)]
pub struct Telemetry {
    auth_failures: Counter,
    audit_writes: Counter,
    audit_failures: Counter,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            auth_failures: counter!(AUTH_FAILURES_TOTAL),
            audit_writes: counter!(AUDIT_WRITES_TOTAL),
            audit_failures: counter!(AUDIT_FAILURES_TOTAL),
        }
    }

    pub fn record_auth_failure(&self) {
        self.auth_failures.increment(1);
    }

    /// Counts audit entries written.
    pub fn record_audit_writes(&self, entries: u64) {
        self.audit_writes.increment(entries);
    }

    /// Counts audit deltas that failed to persist.
    pub fn record_audit_failure(&self) {
        self.audit_failures.increment(1);
    }
}

#[cfg(test)]
mod tests {
    use metrics_util::debugging::DebuggingRecorder;

    use super::*;
    use crate::util::test::counter_value;

    /// Expect every record call to reach the recorder the handles were registered with
    #[test]
    fn emits_counters() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let telemetry = metrics::with_local_recorder(&recorder, Telemetry::new);

        telemetry.record_auth_failure();
        telemetry.record_auth_failure();
        telemetry.record_audit_writes(5);
        telemetry.record_audit_failure();

        assert_eq!(counter_value(&snapshotter, AUTH_FAILURES_TOTAL), 2);
        assert_eq!(counter_value(&snapshotter, AUDIT_WRITES_TOTAL), 5);
        assert_eq!(counter_value(&snapshotter, AUDIT_FAILURES_TOTAL), 1);
    }

    /// Expect recording without an installed recorder to be a no-op
    #[test]
    fn records_without_recorder() {
        let telemetry = Telemetry::new();

        telemetry.record_auth_failure();
        telemetry.record_audit_writes(3);
        telemetry.record_audit_failure();
    }
}
