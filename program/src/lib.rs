//! Interval-driven raffle settled by Switchboard VRF.
//!
//! Entrants pay into an open round. Once the interval has elapsed and the
//! round holds entrants, anyone may trigger upkeep, which closes the round and
//! requests randomness. The fulfilled VRF result picks the winner, who
//! receives the whole pool before the next round opens.

pub mod config;
pub mod entrypoint;
pub mod error;
pub mod events;
pub mod gateway;
pub mod instruction;
pub mod ledger;
pub mod processor;
pub mod settlement;
pub mod state;
pub mod upkeep;
pub mod utils;
pub mod vrf;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
