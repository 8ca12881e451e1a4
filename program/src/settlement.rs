// Autoraffle Program - Settlement
use solana_program::{
    account_info::AccountInfo, clock::UnixTimestamp, msg, program_error::ProgramError,
    pubkey::Pubkey, rent::Rent, sysvar::Sysvar,
};

use crate::{
    error::RaffleError,
    events::WinnerPicked,
    state::{Raffle, RequestHandle, RoundState},
    utils,
};

/// Moves the prize to the winner. Either the whole amount arrives or nothing moves.
pub trait PrizePayout {
    fn pay(&mut self, winner: &Pubkey, amount: u64) -> Result<(), ProgramError>;
}

/// Pays out of the raffle account's lamports, keeping it rent exempt.
pub struct LamportPayout<'a, 'info> {
    pub raffle: &'a AccountInfo<'info>,
    pub winner: &'a AccountInfo<'info>,
}

impl<'a, 'info> PrizePayout for LamportPayout<'a, 'info> {
    fn pay(&mut self, winner: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        if self.winner.key != winner {
            msg!("Recipient {} is not the winner {}", self.winner.key, winner);
            return Err(ProgramError::InvalidArgument);
        }
        if !self.winner.is_writable {
            msg!("Winner account must be writable");
            return Err(ProgramError::InvalidArgument);
        }

        let remaining = self
            .raffle
            .lamports()
            .checked_sub(amount)
            .ok_or(ProgramError::InsufficientFunds)?;
        let rent_floor = Rent::get()?.minimum_balance(self.raffle.data_len());
        if remaining < rent_floor {
            msg!("Payout of {} lamports would leave the raffle below rent", amount);
            return Err(ProgramError::InsufficientFunds);
        }
        let credited = self
            .winner
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleError::Overflow)?;

        **self.raffle.try_borrow_mut_lamports()? = remaining;
        **self.winner.try_borrow_mut_lamports()? = credited;
        Ok(())
    }
}

impl Raffle {
    /// Settles the calculating round with the provider's answer.
    ///
    /// `handle` must equal the pending request. The winner is
    /// `random_words[0] mod entrant_count`. A rejected payout leaves the round
    /// pending so settlement can be retried.
    pub fn on_fulfillment<P: PrizePayout>(
        &mut self,
        handle: &RequestHandle,
        random_words: &[u64],
        now: UnixTimestamp,
        payout: &mut P,
    ) -> Result<WinnerPicked, RaffleError> {
        let pending = match self.pending_request {
            Some(pending) if pending.handle == *handle => pending,
            Some(pending) => {
                msg!(
                    "Fulfillment {} does not match pending request {}",
                    handle,
                    pending.handle
                );
                return Err(RaffleError::UnknownRequest);
            }
            None => {
                msg!("Fulfillment {} arrived with no pending request", handle);
                return Err(RaffleError::UnknownRequest);
            }
        };
        if self.state != RoundState::Calculating {
            msg!("Pending request {} on a {} round", pending.handle, self.state);
            return Err(RaffleError::InvariantViolation);
        }

        let random = *random_words.first().ok_or(RaffleError::MissingRandomness)?;
        let entrant_count = self.ledger.entrant_count();
        let index = utils::winner_index(random, entrant_count).ok_or_else(|| {
            msg!("Request {} settled against an empty round", pending.handle);
            RaffleError::InvariantViolation
        })?;
        let winner = self
            .ledger
            .entrant_at(index)
            .map_err(|_| RaffleError::InvariantViolation)?;
        let amount = self.ledger.pool_balance();
        let round = self.round.checked_add(1).ok_or(RaffleError::Overflow)?;

        if let Err(err) = payout.pay(&winner, amount) {
            msg!(
                "Payout of {} lamports to {} failed ({}); request {} stays pending",
                amount,
                winner,
                err,
                pending.handle
            );
            return Err(RaffleError::PayoutFailed);
        }

        self.pending_request = None;
        self.ledger.reset();
        self.state = RoundState::Open;
        self.last_settled_at = now;
        self.recent_winner = Some(winner);
        self.round = round;

        Ok(WinnerPicked {
            round,
            winner,
            amount,
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::{raffle, MockGateway, FEE, INTERVAL, START};

    #[derive(Default)]
    struct RecordingPayout {
        payments: Vec<(Pubkey, u64)>,
        reject: bool,
    }

    impl PrizePayout for RecordingPayout {
        fn pay(&mut self, winner: &Pubkey, amount: u64) -> Result<(), ProgramError> {
            if self.reject {
                return Err(ProgramError::InvalidArgument);
            }
            self.payments.push((*winner, amount));
            Ok(())
        }
    }

    const TRIGGER_AT: UnixTimestamp = START + INTERVAL as i64 + 1;

    fn calculating_raffle(entrants: &[Pubkey]) -> (Raffle, RequestHandle) {
        let mut raffle = raffle();
        for entrant in entrants {
            raffle.enter(*entrant, FEE).unwrap();
        }
        let event = raffle
            .trigger_upkeep(TRIGGER_AT, &mut MockGateway::new())
            .unwrap();
        (raffle, event.request)
    }

    #[test]
    fn three_entrants_random_seven_pays_the_second() {
        let entrants = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let (mut raffle, handle) = calculating_raffle(&entrants);
        assert_eq!(raffle.pool_balance(), 300);
        let mut payout = RecordingPayout::default();

        let event = raffle
            .on_fulfillment(&handle, &[7, 99], TRIGGER_AT + 5, &mut payout)
            .unwrap();

        assert_eq!(event.winner, entrants[1]);
        assert_eq!(event.amount, 300);
        assert_eq!(event.round, 1);
        assert_eq!(event.timestamp, TRIGGER_AT + 5);
        assert_eq!(payout.payments, vec![(entrants[1], 300)]);
        assert_eq!(raffle.state(), RoundState::Open);
        assert_eq!(raffle.entrant_count(), 0);
        assert_eq!(raffle.pool_balance(), 0);
        assert!(raffle.pending_request().is_none());
        assert_eq!(raffle.recent_winner(), Some(entrants[1]));
        assert_eq!(raffle.last_settled_at(), TRIGGER_AT + 5);
    }

    #[test]
    fn mismatched_handle_is_rejected_without_payout() {
        let (mut raffle, handle) = calculating_raffle(&[Pubkey::new_unique()]);
        let before = raffle.clone();
        let mut payout = RecordingPayout::default();

        let wrong_counter = RequestHandle {
            counter: handle.counter + 1,
            ..handle
        };
        let wrong_vrf = RequestHandle {
            vrf: Pubkey::new_unique(),
            ..handle
        };
        for forged in [wrong_counter, wrong_vrf] {
            assert_eq!(
                raffle.on_fulfillment(&forged, &[1], TRIGGER_AT, &mut payout),
                Err(RaffleError::UnknownRequest)
            );
        }
        assert_eq!(raffle, before);
        assert!(payout.payments.is_empty());
    }

    #[test]
    fn fulfillment_without_pending_request_is_rejected() {
        let mut raffle = raffle();
        raffle.enter(Pubkey::new_unique(), FEE).unwrap();
        let handle = RequestHandle {
            vrf: Pubkey::new_unique(),
            counter: 1,
        };
        assert_eq!(
            raffle.on_fulfillment(&handle, &[1], START, &mut RecordingPayout::default()),
            Err(RaffleError::UnknownRequest)
        );
    }

    #[test]
    fn replayed_fulfillment_is_never_paid_twice() {
        let (mut raffle, handle) = calculating_raffle(&[Pubkey::new_unique()]);
        let mut payout = RecordingPayout::default();
        raffle
            .on_fulfillment(&handle, &[3], TRIGGER_AT, &mut payout)
            .unwrap();

        assert_eq!(
            raffle.on_fulfillment(&handle, &[3], TRIGGER_AT, &mut payout),
            Err(RaffleError::UnknownRequest)
        );
        assert_eq!(payout.payments.len(), 1);
    }

    #[test]
    fn rejected_payout_keeps_round_pending_for_retry() {
        let entrants = [Pubkey::new_unique(), Pubkey::new_unique()];
        let (mut raffle, handle) = calculating_raffle(&entrants);
        let before = raffle.clone();
        let mut payout = RecordingPayout {
            reject: true,
            ..RecordingPayout::default()
        };

        assert_eq!(
            raffle.on_fulfillment(&handle, &[4], TRIGGER_AT, &mut payout),
            Err(RaffleError::PayoutFailed)
        );
        assert_eq!(raffle, before);

        payout.reject = false;
        let event = raffle
            .on_fulfillment(&handle, &[4], TRIGGER_AT, &mut payout)
            .unwrap();
        assert_eq!(event.winner, entrants[0]);
    }

    #[test]
    fn empty_randomness_is_rejected() {
        let (mut raffle, handle) = calculating_raffle(&[Pubkey::new_unique()]);
        let before = raffle.clone();
        assert_eq!(
            raffle.on_fulfillment(&handle, &[], TRIGGER_AT, &mut RecordingPayout::default()),
            Err(RaffleError::MissingRandomness)
        );
        assert_eq!(raffle, before);
    }

    #[test]
    fn round_counter_overflow_settles_nothing() {
        let (mut raffle, handle) = calculating_raffle(&[Pubkey::new_unique()]);
        raffle.round = u64::MAX;
        let before = raffle.clone();
        let mut payout = RecordingPayout::default();

        assert_eq!(
            raffle.on_fulfillment(&handle, &[1], TRIGGER_AT, &mut payout),
            Err(RaffleError::Overflow)
        );
        assert_eq!(raffle, before);
        assert!(payout.payments.is_empty());
    }

    #[test]
    fn empty_round_at_settlement_is_an_invariant_violation() {
        let (mut raffle, handle) = calculating_raffle(&[Pubkey::new_unique()]);
        raffle.ledger.reset();
        assert_eq!(
            raffle.on_fulfillment(&handle, &[1], TRIGGER_AT, &mut RecordingPayout::default()),
            Err(RaffleError::InvariantViolation)
        );
    }

    #[test]
    fn second_round_behaves_like_the_first() {
        let mut raffle = raffle();
        let mut gateway = MockGateway::new();
        let mut payout = RecordingPayout::default();
        let mut now = START;

        for round in 1..=2u64 {
            let first = Pubkey::new_unique();
            let second = Pubkey::new_unique();
            raffle.enter(first, FEE).unwrap();
            raffle.enter(second, FEE * 2).unwrap();
            assert!(!raffle.check_upkeep(now).is_eligible());

            now += INTERVAL as i64;
            let handle = raffle.trigger_upkeep(now, &mut gateway).unwrap().request;
            assert_eq!(handle.counter, round as u128);

            let event = raffle
                .on_fulfillment(&handle, &[5], now, &mut payout)
                .unwrap();
            assert_eq!(event.round, round);
            assert_eq!(event.winner, second);
            assert_eq!(event.amount, FEE * 3);
            assert_eq!(raffle.entrant_count(), 0);
            assert_eq!(raffle.pool_balance(), 0);
            assert_eq!(raffle.state(), RoundState::Open);
        }

        assert!(!raffle.check_upkeep(now + INTERVAL as i64).is_eligible());
    }
}
