// Autoraffle Program - Events
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp, entrypoint::ProgramResult, log::sol_log_data, msg, pubkey::Pubkey,
};
use std::fmt::Debug;

use crate::state::RequestHandle;

/// An observable raffle event, logged as `[name, borsh payload]`.
pub trait RaffleEvent: BorshSerialize + Debug {
    const NAME: &'static str;
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RaffleEntered {
    pub entrant: Pubkey,
    /// Entrants in the round, this one included
    pub total_entrants: u64,
}

impl RaffleEvent for RaffleEntered {
    const NAME: &'static str = "RaffleEntered";
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RoundCalculating {
    pub request: RequestHandle,
    pub requested_at: UnixTimestamp,
}

impl RaffleEvent for RoundCalculating {
    const NAME: &'static str = "RoundCalculating";
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct WinnerPicked {
    /// Number of the settled round, starting at 1
    pub round: u64,
    pub winner: Pubkey,
    /// Lamports paid out
    pub amount: u64,
    pub timestamp: UnixTimestamp,
}

impl RaffleEvent for WinnerPicked {
    const NAME: &'static str = "WinnerPicked";
}

pub fn emit<E: RaffleEvent>(event: &E) -> ProgramResult {
    let payload = event.try_to_vec()?;
    sol_log_data(&[E::NAME.as_bytes(), &payload[..]]);
    msg!("{}: {:?}", E::NAME, event);
    Ok(())
}
