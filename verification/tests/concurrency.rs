//! Many threads against one engine: per-content serialisation and the
//! global history counter must hold under contention.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use attest_nullables::NullPorts;
use attest_types::{ContentId, ParticipantId, VerificationParams};
use attest_verification::{VerificationEngine, VerificationError, VerificationEvent};

fn setup(contents: &[ContentId]) -> (VerificationEngine, NullPorts) {
    let nulls = NullPorts::new(10);
    for c in contents {
        nulls.registry.register(*c);
    }
    nulls.authority.grant(ParticipantId::new("council"));
    let engine = VerificationEngine::new(VerificationParams::default(), nulls.ports()).unwrap();
    (engine, nulls)
}

#[test]
fn racing_voters_respect_the_cap() {
    let c = attest_crypto::fingerprint(b"contested");
    let (engine, nulls) = setup(&[c]);
    engine.enqueue(c).unwrap();

    let accepted = AtomicUsize::new(0);
    let refused = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for t in 0..8 {
            let (engine, accepted, refused) = (&engine, &accepted, &refused);
            s.spawn(move || {
                for i in 0..20 {
                    let voter = ParticipantId::new(format!("t{t}-v{i}"));
                    match engine.cast_vote(&c, &voter, (t + i) % 2 == 0, 1000) {
                        Ok(()) => accepted.fetch_add(1, Ordering::SeqCst),
                        Err(VerificationError::MaxVotersReached(_)) => {
                            refused.fetch_add(1, Ordering::SeqCst)
                        }
                        Err(other) => panic!("unexpected error {other:?}"),
                    };
                }
            });
        }
    });

    assert_eq!(accepted.load(Ordering::SeqCst), 50);
    assert_eq!(refused.load(Ordering::SeqCst), 110);

    let entry = engine.get_queue_entry(&c).unwrap();
    assert_eq!(entry.voters.len(), 50);
    assert_eq!(entry.yes_votes + entry.no_votes, 50);
    assert_eq!(entry.total_stake, 50_000);
    let distinct: HashSet<_> = entry.voters.iter().collect();
    assert_eq!(distinct.len(), 50);
    // Escrow saw exactly the accepted votes.
    assert_eq!(nulls.escrow.transfers().len(), 50);

    // Vote events arrive in the order the votes were recorded.
    let event_voters: Vec<ParticipantId> = engine
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            VerificationEvent::VoteCast { voter, .. } => Some(voter),
            _ => None,
        })
        .collect();
    assert_eq!(event_voters, entry.voters);
}

#[test]
fn same_voter_racing_itself_votes_once() {
    let c = attest_crypto::fingerprint(b"double-click");
    let (engine, _nulls) = setup(&[c]);
    engine.enqueue(c).unwrap();
    let alice = ParticipantId::new("alice");

    let ok = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for _ in 0..16 {
            let (engine, alice, ok) = (&engine, &alice, &ok);
            s.spawn(move || {
                if engine.cast_vote(&c, alice, true, 1000).is_ok() {
                    ok.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(ok.load(Ordering::SeqCst), 1);
    assert_eq!(engine.get_queue_entry(&c).unwrap().total_votes(), 1);
}

#[test]
fn concurrent_finalizations_get_contiguous_ids() {
    let contents: Vec<ContentId> = (0..32u32)
        .map(|i| attest_crypto::fingerprint(&i.to_le_bytes()))
        .collect();
    let (engine, nulls) = setup(&contents);
    for c in &contents {
        engine.enqueue(*c).unwrap();
    }
    nulls.clock.advance(VerificationParams::VOTING_PERIOD);
    let council = ParticipantId::new("council");

    std::thread::scope(|s| {
        for chunk in contents.chunks(4) {
            let (engine, council) = (&engine, &council);
            s.spawn(move || {
                for c in chunk {
                    // Two attempts per content: exactly one may commit.
                    let first = engine.finalize(c, council, "");
                    let second = engine.finalize(c, council, "");
                    assert!(first.is_ok() != second.is_ok());
                }
            });
        }
    });

    let mut ids: Vec<u64> = contents
        .iter()
        .flat_map(|c| engine.history_for(c))
        .map(|(id, _)| id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..32).collect::<Vec<u64>>());
    assert_eq!(engine.next_verification_id(), 32);

    let finalized: Vec<u64> = engine
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            VerificationEvent::Finalized { verification_id, .. } => Some(verification_id),
            _ => None,
        })
        .collect();
    assert_eq!(finalized, (0..32).collect::<Vec<u64>>());
}
