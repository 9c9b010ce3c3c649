//! Nullable escrow: records transfers instead of moving funds.

use attest_ports::{Escrow, EscrowError};
use attest_types::ParticipantId;
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub amount: u128,
    pub from: ParticipantId,
    pub to: ParticipantId,
}

/// In-memory escrow for testing. Every transfer succeeds unless a failure
/// has been injected.
#[derive(Default)]
pub struct NullEscrow {
    transfers: Mutex<Vec<Transfer>>,
    failure: Mutex<Option<EscrowError>>,
}

impl NullEscrow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.transfers.lock().unwrap().clone()
    }

    /// Sum of all amounts sent to `account`.
    pub fn total_received(&self, account: &ParticipantId) -> u128 {
        self.transfers
            .lock()
            .unwrap()
            .iter()
            .filter(|t| &t.to == account)
            .map(|t| t.amount)
            .sum()
    }

    pub fn fail_with(&self, err: EscrowError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }
}

impl Escrow for NullEscrow {
    fn transfer(
        &self,
        amount: u128,
        from: &ParticipantId,
        to: &ParticipantId,
    ) -> Result<(), EscrowError> {
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.transfers.lock().unwrap().push(Transfer {
            amount,
            from: from.clone(),
            to: to.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_per_recipient() {
        let escrow = NullEscrow::new();
        let (a, b, vault) = (
            ParticipantId::new("a"),
            ParticipantId::new("b"),
            ParticipantId::new("vault"),
        );
        escrow.transfer(1000, &a, &vault).unwrap();
        escrow.transfer(2500, &b, &vault).unwrap();
        escrow.transfer(7, &vault, &a).unwrap();
        assert_eq!(escrow.total_received(&vault), 3500);
        assert_eq!(escrow.total_received(&a), 7);
        assert_eq!(escrow.transfers()[1].from, b);
    }

    #[test]
    fn injected_failure_records_nothing() {
        let escrow = NullEscrow::new();
        escrow.fail_with(EscrowError::InsufficientFunds { needed: 10, available: 1 });
        let who = ParticipantId::new("a");
        assert_eq!(
            escrow.transfer(10, &who, &who).unwrap_err(),
            EscrowError::InsufficientFunds { needed: 10, available: 1 }
        );
        assert!(escrow.transfers().is_empty());
    }
}
