// Autoraffle Program - Upkeep
use borsh::{BorshDeserialize, BorshSerialize};
use std::fmt;

use crate::state::RoundState;

/// A condition that keeps upkeep from running
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpkeepBlocker {
    RoundNotOpen,
    IntervalNotElapsed,
    NoEntrants,
    EmptyPool,
}

impl fmt::Display for UpkeepBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            UpkeepBlocker::RoundNotOpen => "round is not open",
            UpkeepBlocker::IntervalNotElapsed => "interval has not elapsed",
            UpkeepBlocker::NoEntrants => "no entrants",
            UpkeepBlocker::EmptyPool => "pool is empty",
        };
        f.write_str(reason)
    }
}

/// Outcome of the upkeep predicate, one flag per condition.
///
/// Every condition is evaluated, so a failed check reports all of its blockers.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepCheck {
    pub round_open: bool,
    pub interval_elapsed: bool,
    pub has_entrants: bool,
    pub has_balance: bool,
}

impl UpkeepCheck {
    pub fn evaluate(
        state: RoundState,
        pool_balance: u64,
        entrant_count: u64,
        elapsed_since_last_round: i64,
        interval: u64,
    ) -> Self {
        let interval_elapsed = u64::try_from(elapsed_since_last_round)
            .map(|elapsed| elapsed >= interval)
            .unwrap_or(false);

        Self {
            round_open: state == RoundState::Open,
            interval_elapsed,
            has_entrants: entrant_count > 0,
            has_balance: pool_balance > 0,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.round_open && self.interval_elapsed && self.has_entrants && self.has_balance
    }

    pub fn blockers(&self) -> Vec<UpkeepBlocker> {
        [
            (self.round_open, UpkeepBlocker::RoundNotOpen),
            (self.interval_elapsed, UpkeepBlocker::IntervalNotElapsed),
            (self.has_entrants, UpkeepBlocker::NoEntrants),
            (self.has_balance, UpkeepBlocker::EmptyPool),
        ]
        .into_iter()
        .filter(|(holds, _)| !holds)
        .map(|(_, blocker)| blocker)
        .collect()
    }
}
