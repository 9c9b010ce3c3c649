//! Async host for the verification engine.
//!
//! Callers submit serialisable [`Operation`]s. Each one takes a permit from a
//! semaphore sized by `max_concurrent_ops`, then runs on the blocking pool:
//! the engine's per-content mutexes are synchronous and collaborator calls
//! may block. Engine errors are reported in the [`OperationOutcome`]; only
//! host failures (a panicked worker, a closed service) surface as
//! [`NodeError`].

use std::path::Path;
use std::sync::Arc;

use attest_ports::EnginePorts;
use attest_types::params::stake_amount;
use attest_types::{ContentId, ParticipantId, QueueStatus};
use attest_verification::{
    EngineSnapshot, ResolutionEffect, VerificationEngine, VerificationError,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::config::NodeConfig;
use crate::metrics::ServiceMetrics;
use crate::tracing_spans::{operation_span, snapshot_span};
use crate::NodeError;

/// One engine call, in a form that can arrive over the wire or from a script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Enqueue {
        content: ContentId,
    },
    CastVote {
        content: ContentId,
        voter: ParticipantId,
        vote: bool,
        #[serde(with = "stake_amount")]
        stake: u128,
    },
    Finalize {
        content: ContentId,
        authority: ParticipantId,
        #[serde(default)]
        note: String,
    },
    RaiseDispute {
        content: ContentId,
        disputer: ParticipantId,
        #[serde(default)]
        note: String,
    },
    ResolveDispute {
        content: ContentId,
        disputer: ParticipantId,
        authority: ParticipantId,
        upheld: bool,
        #[serde(default)]
        note: String,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Enqueue { .. } => "enqueue",
            Self::CastVote { .. } => "cast_vote",
            Self::Finalize { .. } => "finalize",
            Self::RaiseDispute { .. } => "raise_dispute",
            Self::ResolveDispute { .. } => "resolve_dispute",
        }
    }

    pub fn content(&self) -> &ContentId {
        match self {
            Self::Enqueue { content }
            | Self::CastVote { content, .. }
            | Self::Finalize { content, .. }
            | Self::RaiseDispute { content, .. }
            | Self::ResolveDispute { content, .. } => content,
        }
    }

    /// Run against the engine. Synchronous; called on the blocking pool.
    pub fn apply(self, engine: &VerificationEngine) -> Result<OperationOutcome, VerificationError> {
        match self {
            Self::Enqueue { content } => {
                engine.enqueue(content)?;
                Ok(OperationOutcome::Queued)
            }
            Self::CastVote {
                content,
                voter,
                vote,
                stake,
            } => {
                engine.cast_vote(&content, &voter, vote, stake)?;
                Ok(OperationOutcome::VoteRecorded)
            }
            Self::Finalize {
                content,
                authority,
                note,
            } => {
                let fin = engine.finalize(&content, &authority, &note)?;
                Ok(OperationOutcome::Finalized {
                    verification_id: fin.verification_id,
                    outcome: fin.outcome,
                    verifier_count: fin.verifier_count,
                    total_stake: fin.total_stake,
                })
            }
            Self::RaiseDispute {
                content,
                disputer,
                note,
            } => {
                engine.raise_dispute(&content, &disputer, &note)?;
                Ok(OperationOutcome::DisputeRaised)
            }
            Self::ResolveDispute {
                content,
                disputer,
                authority,
                upheld,
                note,
            } => {
                let effect = engine.resolve_dispute(&content, &disputer, &authority, upheld, &note)?;
                Ok(OperationOutcome::DisputeResolved { effect })
            }
        }
    }
}

/// What an operation did, or why it failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationOutcome {
    Queued,
    VoteRecorded,
    Finalized {
        verification_id: u64,
        outcome: QueueStatus,
        verifier_count: u32,
        #[serde(with = "stake_amount")]
        total_stake: u128,
    },
    DisputeRaised,
    DisputeResolved {
        effect: ResolutionEffect,
    },
    Failed {
        code: u32,
        kind: &'static str,
        message: String,
    },
}

impl OperationOutcome {
    pub fn failed(err: &VerificationError) -> Self {
        Self::Failed {
            code: err.code(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

pub struct VerificationService {
    engine: Arc<VerificationEngine>,
    semaphore: Arc<Semaphore>,
    max_concurrent: u32,
    metrics: Option<Arc<ServiceMetrics>>,
}

impl std::fmt::Debug for VerificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationService")
            .field("max_concurrent", &self.max_concurrent)
            .finish_non_exhaustive()
    }
}

impl VerificationService {
    /// Build a service around a fresh engine.
    ///
    /// The custody account comes from `ports`; hosts normally set it from
    /// `config.custody_account`.
    pub fn new(config: &NodeConfig, ports: EnginePorts) -> Result<Self, NodeError> {
        config.validate()?;
        let engine = VerificationEngine::new(config.params.clone(), ports)?;
        Self::with_engine(engine, config)
    }

    /// Build a service around an existing engine, e.g. one restored from a snapshot.
    pub fn with_engine(engine: VerificationEngine, config: &NodeConfig) -> Result<Self, NodeError> {
        let metrics = if config.enable_metrics {
            Some(Arc::new(ServiceMetrics::new()?))
        } else {
            None
        };
        let max_concurrent = config.permit_count()?;
        let service = Self {
            engine: Arc::new(engine),
            semaphore: Arc::new(Semaphore::new(max_concurrent as usize)),
            max_concurrent,
            metrics,
        };
        service.refresh_queue_gauge();
        Ok(service)
    }

    pub fn engine(&self) -> &Arc<VerificationEngine> {
        &self.engine
    }

    pub fn metrics(&self) -> Option<&ServiceMetrics> {
        self.metrics.as_deref()
    }

    pub fn max_concurrent(&self) -> u32 {
        self.max_concurrent
    }

    /// Execute one operation.
    pub async fn execute(&self, op: Operation) -> Result<OperationOutcome, NodeError> {
        let span = operation_span(op.name(), op.content());
        async move {
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|_| NodeError::ShuttingDown)?;

            let engine = Arc::clone(&self.engine);
            let result = tokio::task::spawn_blocking(move || op.apply(&engine)).await?;

            if let Some(m) = &self.metrics {
                m.operations.inc();
            }
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::debug!(code = err.code(), kind = err.kind(), error = %err, "operation refused");
                    if let Some(m) = &self.metrics {
                        m.record_failure(&err);
                    }
                    OperationOutcome::failed(&err)
                }
            };
            self.process_events();
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    /// Execute a batch in order, stopping at the first host failure.
    pub async fn execute_all(
        &self,
        ops: impl IntoIterator<Item = Operation>,
    ) -> Result<Vec<OperationOutcome>, NodeError> {
        let mut outcomes = Vec::new();
        for op in ops {
            outcomes.push(self.execute(op).await?);
        }
        Ok(outcomes)
    }

    /// Stop admitting operations. Calls already holding a permit finish normally.
    pub fn close(&self) {
        self.semaphore.close();
    }

    fn process_events(&self) {
        for event in self.engine.drain_events() {
            tracing::trace!(content = %event.content(), ?event, "engine event");
            if let Some(m) = &self.metrics {
                m.observe(&event);
            }
        }
        self.refresh_queue_gauge();
    }

    fn refresh_queue_gauge(&self) {
        if let Some(m) = &self.metrics {
            m.queue_entries.set(self.engine.queue_len() as i64);
        }
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Write a bincode snapshot of the engine to `path`.
    ///
    /// Takes every permit first so no operation runs while slots are copied.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), NodeError> {
        let path = path.as_ref().to_path_buf();
        let span = snapshot_span(&path.display().to_string());
        async move {
            let _all = self
                .semaphore
                .acquire_many(self.max_concurrent)
                .await
                .map_err(|_| NodeError::ShuttingDown)?;
            let engine = Arc::clone(&self.engine);
            let bytes = tokio::task::spawn_blocking(move || bincode::serialize(&engine.snapshot()))
                .await?
                .map_err(|e| NodeError::Snapshot(e.to_string()))?;
            tokio::fs::write(&path, &bytes).await?;
            tracing::info!(bytes = bytes.len(), "snapshot written");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Rebuild a service from a snapshot written by [`save_snapshot`](Self::save_snapshot).
    pub fn load_snapshot(
        path: impl AsRef<Path>,
        config: &NodeConfig,
        ports: EnginePorts,
    ) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let span = snapshot_span(&path.display().to_string());
        let _enter = span.enter();

        config.validate()?;
        let bytes = std::fs::read(path)?;
        let snapshot: EngineSnapshot =
            bincode::deserialize(&bytes).map_err(|e| NodeError::Snapshot(e.to_string()))?;
        let engine = VerificationEngine::restore(snapshot, config.params.clone(), ports)
            .map_err(|e| match e {
                VerificationError::InvalidSnapshot(reason) => NodeError::Snapshot(reason),
                other => NodeError::Verification(other),
            })?;
        tracing::info!(entries = engine.queue_len(), "snapshot loaded");
        Self::with_engine(engine, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_parse_from_tagged_json() {
        let hex = "ab".repeat(32);
        let json = format!(
            r#"{{"op":"cast_vote","content":"{hex}","voter":"alice","vote":true,"stake":1500}}"#
        );
        let op: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(op.name(), "cast_vote");
        assert_eq!(
            op,
            Operation::CastVote {
                content: hex.parse().unwrap(),
                voter: ParticipantId::new("alice"),
                vote: true,
                stake: 1500,
            }
        );

        let json = format!(r#"{{"op":"finalize","content":"{hex}","authority":"council"}}"#);
        let op: Operation = serde_json::from_str(&json).unwrap();
        assert!(matches!(op, Operation::Finalize { ref note, .. } if note.is_empty()));
    }

    #[test]
    fn unknown_op_is_refused() {
        let json = r#"{"op":"delete","content":"00"}"#;
        assert!(serde_json::from_str::<Operation>(json).is_err());
    }

    #[test]
    fn failed_outcome_carries_code_and_kind() {
        let outcome = OperationOutcome::failed(&VerificationError::InvalidHash);
        assert!(!outcome.is_ok());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["code"], 101);
        assert_eq!(json["kind"], "invalid_hash");
    }
}
