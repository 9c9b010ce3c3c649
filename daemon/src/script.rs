//! Replay scripts: a JSON description of registered content, authorities and
//! a sequence of operations, run against nullable collaborators.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use attest_node::{NodeConfig, Operation, OperationOutcome, VerificationService};
use attest_nullables::NullPorts;
use attest_types::{ContentId, ParticipantId, QueueStatus};
use attest_verification::HistoryEntry;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Content known to the registry before the first step.
    #[serde(default)]
    pub registered: Vec<String>,
    /// Participants allowed to finalize and resolve disputes.
    #[serde(default)]
    pub authorities: Vec<String>,
    /// Overrides the configured custody account.
    #[serde(default)]
    pub custody: Option<String>,
    #[serde(default)]
    pub start_height: u64,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Advance { advance: u64 },
    /// An operation whose `content` may still be free text.
    Op(Value),
}

impl Script {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("parsing replay script")
    }
}

/// Content strings are either 64-hex ids or free text that gets fingerprinted.
pub fn resolve_content(s: &str) -> ContentId {
    if s.len() == 64 {
        if let Ok(id) = s.parse() {
            return id;
        }
    }
    attest_crypto::fingerprint(s.as_bytes())
}

fn parse_operation(step: usize, mut raw: Value) -> anyhow::Result<Operation> {
    let Some(obj) = raw.as_object_mut() else {
        bail!("step {step}: expected an object");
    };
    if let Some(Value::String(content)) = obj.get("content") {
        let resolved = resolve_content(content).to_string();
        obj.insert("content".into(), Value::String(resolved));
    }
    serde_json::from_value(raw).with_context(|| format!("step {step}: invalid operation"))
}

#[derive(Serialize)]
#[serde(untagged)]
enum StepLine<'a> {
    Advance {
        step: usize,
        height: u64,
    },
    Op {
        step: usize,
        op: &'static str,
        content: ContentId,
        outcome: &'a OperationOutcome,
    },
}

#[derive(Serialize)]
struct EntrySummary {
    status: QueueStatus,
    start_height: u64,
    yes_votes: u32,
    no_votes: u32,
    total_stake: String,
    voters: Vec<ParticipantId>,
}

#[derive(Serialize)]
struct Summary {
    height: u64,
    entries: BTreeMap<ContentId, EntrySummary>,
    history: Vec<HistoryEntry>,
    next_verification_id: u64,
    failed_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<String>,
}

#[derive(Serialize)]
struct SummaryLine {
    summary: Summary,
}

/// Run `script` and write one JSON line per step plus a final summary line.
///
/// Returns the service so callers can persist or inspect the final state.
pub async fn replay(
    script: &Script,
    config: &NodeConfig,
    out: &mut impl Write,
) -> anyhow::Result<VerificationService> {
    let nulls = NullPorts::new(script.start_height);
    for content in &script.registered {
        nulls.registry.register(resolve_content(content));
    }
    for authority in &script.authorities {
        nulls.authority.grant(ParticipantId::new(authority.as_str()));
    }
    let custody = script.custody.as_deref().unwrap_or(&config.custody_account);
    let service = VerificationService::new(config, nulls.ports_with_custody(ParticipantId::new(custody)))?;

    tracing::info!(
        steps = script.steps.len(),
        registered = script.registered.len(),
        "replaying script"
    );

    let mut failed_steps = 0;
    for (i, step) in script.steps.iter().enumerate() {
        let line = match step {
            Step::Advance { advance } => {
                nulls.clock.advance(*advance);
                serde_json::to_string(&StepLine::Advance {
                    step: i,
                    height: nulls.clock.now().as_u64(),
                })?
            }
            Step::Op(raw) => {
                let op = parse_operation(i, raw.clone())?;
                let (name, content) = (op.name(), *op.content());
                let outcome = service.execute(op).await?;
                if !outcome.is_ok() {
                    failed_steps += 1;
                }
                serde_json::to_string(&StepLine::Op {
                    step: i,
                    op: name,
                    content,
                    outcome: &outcome,
                })?
            }
        };
        writeln!(out, "{line}")?;
    }

    let snapshot = service.engine().snapshot();
    let entries = snapshot
        .slots
        .iter()
        .map(|(content, slot)| {
            let e = &slot.entry;
            let summary = EntrySummary {
                status: e.status,
                start_height: e.start_height.as_u64(),
                yes_votes: e.yes_votes,
                no_votes: e.no_votes,
                total_stake: e.total_stake.to_string(),
                voters: e.voters.clone(),
            };
            (*content, summary)
        })
        .collect();
    let metrics = match service.metrics() {
        Some(m) => Some(m.encode()?),
        None => None,
    };
    let summary = Summary {
        height: nulls.clock.now().as_u64(),
        entries,
        history: snapshot.history,
        next_verification_id: snapshot.next_verification_id,
        failed_steps,
        metrics,
    };
    writeln!(out, "{}", serde_json::to_string(&SummaryLine { summary })?)?;
    Ok(service)
}
