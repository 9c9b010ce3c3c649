//! Nullable content registry: registered set plus a log of status updates.

use attest_ports::{ContentRegistry, RegistryError};
use attest_types::{ContentId, QueueStatus};
use std::collections::HashSet;
use std::sync::Mutex;

/// One `update_status` call as the registry received it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusUpdate {
    pub content: ContentId,
    /// Status in its wire form (`pending`, `verified`, `rejected`).
    pub status: String,
    pub visible: bool,
}

/// In-memory registry for testing.
/// Thread-safe; failures can be injected with [`NullRegistry::fail_updates_with`].
#[derive(Default)]
pub struct NullRegistry {
    registered: Mutex<HashSet<ContentId>>,
    updates: Mutex<Vec<StatusUpdate>>,
    failure: Mutex<Option<RegistryError>>,
}

impl NullRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, content: ContentId) {
        self.registered.lock().unwrap().insert(content);
    }

    /// Every accepted status update, oldest first.
    pub fn status_updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().unwrap().clone()
    }

    /// Make every following `update_status` call fail with `err`.
    pub fn fail_updates_with(&self, err: RegistryError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }
}

impl ContentRegistry for NullRegistry {
    fn is_registered(&self, content: &ContentId) -> bool {
        self.registered.lock().unwrap().contains(content)
    }

    fn update_status(
        &self,
        content: &ContentId,
        status: QueueStatus,
        visible: bool,
    ) -> Result<(), RegistryError> {
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.updates.lock().unwrap().push(StatusUpdate {
            content: *content,
            status: status.as_str().to_string(),
            visible,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_updates_are_not_recorded() {
        let registry = NullRegistry::new();
        let content = ContentId::new([1u8; 32]);
        registry.fail_updates_with(RegistryError::Unavailable("down".into()));
        assert!(registry
            .update_status(&content, QueueStatus::Verified, true)
            .is_err());
        assert!(registry.status_updates().is_empty());

        registry.recover();
        registry
            .update_status(&content, QueueStatus::Rejected, false)
            .unwrap();
        assert_eq!(registry.status_updates()[0].status, "rejected");
    }
}
