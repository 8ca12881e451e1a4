// Autoraffle Program - Entry Ledger
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, pubkey::Pubkey};

use crate::error::RaffleError;

/// Entrants of the current round, in admission order, and the pooled lamports.
///
/// The same identity may appear several times; each admission is one slot.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryLedger {
    entrants: Vec<Pubkey>,
    pool: u64,
}

impl EntryLedger {
    /// Serialized size of an empty ledger
    pub const BASE_LEN: usize = 4 + 8;
    /// Serialized size added by each entrant
    pub const ENTRANT_LEN: usize = 32;

    /// Appends `identity` and adds `amount` to the pool.
    ///
    /// Returns the number of entrants after admission. Nothing changes on error.
    pub fn admit(
        &mut self,
        identity: Pubkey,
        amount: u64,
        entrance_fee: u64,
    ) -> Result<u64, RaffleError> {
        if amount < entrance_fee {
            msg!(
                "Payment of {} lamports is below the entrance fee of {}",
                amount,
                entrance_fee
            );
            return Err(RaffleError::InsufficientPayment);
        }
        let pool = self
            .pool
            .checked_add(amount)
            .ok_or(RaffleError::Overflow)?;

        self.entrants.push(identity);
        self.pool = pool;
        Ok(self.entrant_count())
    }

    pub fn entrant_count(&self) -> u64 {
        self.entrants.len() as u64
    }

    pub fn pool_balance(&self) -> u64 {
        self.pool
    }

    pub fn entrant_at(&self, index: u64) -> Result<Pubkey, RaffleError> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.entrants.get(index))
            .copied()
            .ok_or(RaffleError::IndexOutOfRange)
    }

    pub fn entrants(&self) -> &[Pubkey] {
        &self.entrants
    }

    /// Serialized size once `count` entrants are recorded
    pub fn len_for(count: usize) -> usize {
        Self::BASE_LEN + count * Self::ENTRANT_LEN
    }

    /// Drops every entrant and zeroes the pool. Only settlement calls this.
    pub(crate) fn reset(&mut self) {
        self.entrants.clear();
        self.pool = 0;
    }
}
