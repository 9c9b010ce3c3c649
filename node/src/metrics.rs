//! Prometheus metrics for the verification service.
//!
//! Counters follow operations and the engine events they produce. The
//! [`ServiceMetrics`] struct owns a dedicated [`Registry`] that a host can
//! encode into the Prometheus text exposition format.

use attest_types::QueueStatus;
use attest_verification::{VerificationError, VerificationEvent};
use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Central collection of all service-level Prometheus metrics.
pub struct ServiceMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Operations executed, successful or not.
    pub operations: IntCounter,
    /// Failed operations, labelled by error kind.
    pub operation_failures: IntCounterVec,
    pub votes_cast: IntCounter,
    pub finalized_verified: IntCounter,
    pub finalized_rejected: IntCounter,
    pub disputes_raised: IntCounter,
    /// Resolutions that upheld the dispute, whether or not the entry reopened.
    pub disputes_upheld: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Current number of queue entries (any status).
    pub queue_entries: IntGauge,
}

impl ServiceMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let operations = register_int_counter_with_registry!(
            Opts::new("attest_operations_total", "Total engine operations executed"),
            registry
        )?;
        let operation_failures = register_int_counter_vec_with_registry!(
            Opts::new(
                "attest_operation_failures_total",
                "Total engine operations that returned an error"
            ),
            &["kind"],
            registry
        )?;
        let votes_cast = register_int_counter_with_registry!(
            Opts::new("attest_votes_cast_total", "Total staked votes accepted"),
            registry
        )?;
        let finalized_verified = register_int_counter_with_registry!(
            Opts::new(
                "attest_finalized_verified_total",
                "Total voting rounds finalized as verified"
            ),
            registry
        )?;
        let finalized_rejected = register_int_counter_with_registry!(
            Opts::new(
                "attest_finalized_rejected_total",
                "Total voting rounds finalized as rejected"
            ),
            registry
        )?;
        let disputes_raised = register_int_counter_with_registry!(
            Opts::new("attest_disputes_raised_total", "Total disputes raised"),
            registry
        )?;
        let disputes_upheld = register_int_counter_with_registry!(
            Opts::new("attest_disputes_upheld_total", "Total disputes upheld"),
            registry
        )?;
        let queue_entries = register_int_gauge_with_registry!(
            Opts::new("attest_queue_entries", "Current number of queue entries"),
            registry
        )?;

        Ok(Self {
            registry,
            operations,
            operation_failures,
            votes_cast,
            finalized_verified,
            finalized_rejected,
            disputes_raised,
            disputes_upheld,
            queue_entries,
        })
    }

    pub fn record_failure(&self, err: &VerificationError) {
        self.operation_failures.with_label_values(&[err.kind()]).inc();
    }

    /// Fold one engine event into the counters.
    pub fn observe(&self, event: &VerificationEvent) {
        match event {
            VerificationEvent::Queued { .. } => {}
            VerificationEvent::VoteCast { .. } => self.votes_cast.inc(),
            VerificationEvent::Finalized { outcome, .. } => match outcome {
                QueueStatus::Verified => self.finalized_verified.inc(),
                QueueStatus::Rejected => self.finalized_rejected.inc(),
                QueueStatus::Pending => {}
            },
            VerificationEvent::DisputeRaised { .. } => self.disputes_raised.inc(),
            VerificationEvent::DisputeResolved { upheld, .. } => {
                if *upheld {
                    self.disputes_upheld.inc();
                }
            }
        }
    }

    /// Render every metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
