#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use attest_nullables::NullPorts;
use attest_types::{ContentId, ParticipantId, QueueStatus, VerificationParams};
use attest_verification::VerificationEngine;

#[derive(Arbitrary, Debug)]
enum Step {
    Enqueue { content: u8 },
    Vote { content: u8, voter: u8, vote: bool, stake: u16 },
    Finalize { content: u8, authorized: bool },
    Dispute { content: u8, disputer: u8 },
    Resolve { content: u8, disputer: u8, upheld: bool },
    Advance { blocks: u16 },
}

fn content(n: u8) -> ContentId {
    let mut bytes = [0u8; 32];
    bytes[0] = n % 4;
    bytes[1] = 1;
    ContentId::new(bytes)
}

// Drive arbitrary operation sequences and check the queue invariants after each step.
fuzz_target!(|steps: Vec<Step>| {
    let nulls = NullPorts::new(0);
    for n in 0..4 {
        nulls.registry.register(content(n));
    }
    let council = ParticipantId::new("council");
    nulls.authority.grant(council.clone());
    let Ok(engine) = VerificationEngine::new(VerificationParams::default(), nulls.ports()) else {
        return;
    };

    let mut finalizations = 0u64;
    for step in steps {
        match step {
            Step::Enqueue { content: c } => {
                let _ = engine.enqueue(content(c));
            }
            Step::Vote { content: c, voter, vote, stake } => {
                let who = ParticipantId::new(format!("v{}", voter % 64));
                let _ = engine.cast_vote(&content(c), &who, vote, u128::from(stake));
            }
            Step::Finalize { content: c, authorized } => {
                let caller = if authorized { council.clone() } else { ParticipantId::new("x") };
                if engine.finalize(&content(c), &caller, "").is_ok() {
                    finalizations += 1;
                }
            }
            Step::Dispute { content: c, disputer } => {
                let who = ParticipantId::new(format!("d{}", disputer % 4));
                let _ = engine.raise_dispute(&content(c), &who, "");
            }
            Step::Resolve { content: c, disputer, upheld } => {
                let who = ParticipantId::new(format!("d{}", disputer % 4));
                let _ = engine.resolve_dispute(&content(c), &who, &council, upheld, "");
            }
            Step::Advance { blocks } => nulls.clock.advance(u64::from(blocks)),
        }

        for c in engine.queued_contents() {
            let entry = engine.get_queue_entry(&c).expect("listed content has an entry");
            assert!(entry.voters.len() <= 50);
            assert_eq!((entry.yes_votes + entry.no_votes) as usize, entry.voters.len());
            if entry.status == QueueStatus::Rejected {
                assert!(!engine.is_voting_open(&c));
            }
        }
        assert_eq!(engine.next_verification_id(), finalizations);
    }

    let restored =
        VerificationEngine::restore(engine.snapshot(), VerificationParams::default(), nulls.ports());
    assert!(restored.is_ok(), "engine-built state must restore: {:?}", restored.err());
});
