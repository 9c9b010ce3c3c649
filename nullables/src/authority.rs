//! Nullable authority check: an explicit allow-list.

use attest_ports::Authority;
use attest_types::ParticipantId;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Default)]
pub struct NullAuthority {
    granted: Mutex<HashSet<ParticipantId>>,
}

impl NullAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, who: ParticipantId) {
        self.granted.lock().unwrap().insert(who);
    }

    pub fn revoke(&self, who: &ParticipantId) {
        self.granted.lock().unwrap().remove(who);
    }
}

impl Authority for NullAuthority {
    fn is_authorized(&self, caller: &ParticipantId) -> bool {
        self.granted.lock().unwrap().contains(caller)
    }
}
