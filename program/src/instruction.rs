// Autoraffle Program - Instructions
#![allow(deprecated)]

use borsh::BorshDeserialize;
use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
    sysvar::recent_blockhashes,
};

use crate::{config::RaffleConfig, error::RaffleError, utils};

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create the raffle PDA for the signing authority
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The authority, pays for the raffle account
    /// 1. `[writable]` The raffle account (PDA of `["raffle", authority]`)
    /// 2. `[]` The system program
    InitializeRaffle { config: RaffleConfig },

    /// Enter the open round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The entrant, pays the entrance fee
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle {
        /// Lamports paid, at least the entrance fee
        amount: u64,
    },

    /// Evaluate upkeep eligibility without changing anything.
    /// The verdict is returned as borsh-encoded `UpkeepCheck` return data.
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep,

    /// Close the round and request randomness from Switchboard
    ///
    /// Accounts expected:
    /// 0. `[signer]` The caller, authority of the payer wallet
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The Switchboard VRF account owned by the raffle
    /// 3. `[writable]` The oracle queue
    /// 4. `[]` The oracle queue authority
    /// 5. `[]` The oracle queue data buffer
    /// 6. `[writable]` The queue permission account
    /// 7. `[writable]` The VRF escrow token account
    /// 8. `[writable]` The payer's wrapped SOL wallet
    /// 9. `[]` The recent blockhashes sysvar
    /// 10. `[]` The Switchboard program state
    /// 11. `[]` The Switchboard program
    /// 12. `[]` The token program
    PerformUpkeep,

    /// Settle the round with the VRF result. Anyone may call this.
    ///
    /// Accounts expected:
    /// 0. `[writable]` The raffle account
    /// 1. `[]` The VRF account of the pending request
    /// 2. `[writable]` The winner
    FulfillRandomness,
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, RaffleError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let config = RaffleConfig::try_from_slice(rest)
                    .map_err(|_| RaffleError::InvalidInstructionData)?;
                Self::InitializeRaffle { config }
            }
            1 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { amount }
            }
            2 => Self::CheckUpkeep,
            3 => Self::PerformUpkeep,
            4 => Self::FulfillRandomness,
            _ => return Err(RaffleError::InvalidInstructionData),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + RaffleConfig::LEN);
        match self {
            Self::InitializeRaffle { config } => {
                buf.push(0);
                // borsh layout of RaffleConfig, read back by `unpack`
                buf.extend_from_slice(&config.entrance_fee.to_le_bytes());
                buf.extend_from_slice(&config.interval.to_le_bytes());
                buf.extend_from_slice(config.routing.oracle_queue.as_ref());
                buf.push(config.routing.permission_bump);
                buf.push(config.routing.switchboard_state_bump);
                buf.extend_from_slice(&config.callback_budget.to_le_bytes());
            }
            Self::EnterRaffle { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CheckUpkeep => buf.push(2),
            Self::PerformUpkeep => buf.push(3),
            Self::FulfillRandomness => buf.push(4),
        }
        buf
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), RaffleError> {
        if input.len() < 8 {
            return Err(RaffleError::InvalidInstructionData);
        }
        let (amount, rest) = input.split_at(8);
        let amount = amount
            .try_into()
            .map(u64::from_le_bytes)
            .map_err(|_| RaffleError::InvalidInstructionData)?;
        Ok((amount, rest))
    }
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    authority: &Pubkey,
    config: RaffleConfig,
) -> Instruction {
    let (raffle, _) = utils::find_raffle_address(program_id, authority);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*authority, true),
            AccountMeta::new(raffle, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::InitializeRaffle { config }.pack(),
    }
}

/// Create enter_raffle instruction
pub fn enter_raffle(
    program_id: &Pubkey,
    entrant: &Pubkey,
    raffle: &Pubkey,
    amount: u64,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*entrant, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::EnterRaffle { amount }.pack(),
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, raffle: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*raffle, false)],
        data: RaffleInstruction::CheckUpkeep.pack(),
    }
}

/// Switchboard accounts taking part in a randomness request
#[derive(Clone, Copy, Debug)]
pub struct VrfRequestAccounts {
    pub vrf: Pubkey,
    pub oracle_queue: Pubkey,
    pub queue_authority: Pubkey,
    pub data_buffer: Pubkey,
    pub permission: Pubkey,
    pub escrow: Pubkey,
    pub payer_wallet: Pubkey,
    pub program_state: Pubkey,
    pub switchboard_program: Pubkey,
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    caller: &Pubkey,
    raffle: &Pubkey,
    vrf: &VrfRequestAccounts,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*caller, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new(vrf.vrf, false),
            AccountMeta::new(vrf.oracle_queue, false),
            AccountMeta::new_readonly(vrf.queue_authority, false),
            AccountMeta::new_readonly(vrf.data_buffer, false),
            AccountMeta::new(vrf.permission, false),
            AccountMeta::new(vrf.escrow, false),
            AccountMeta::new(vrf.payer_wallet, false),
            AccountMeta::new_readonly(recent_blockhashes::id(), false),
            AccountMeta::new_readonly(vrf.program_state, false),
            AccountMeta::new_readonly(vrf.switchboard_program, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: RaffleInstruction::PerformUpkeep.pack(),
    }
}

/// Create fulfill_randomness instruction
pub fn fulfill_randomness(
    program_id: &Pubkey,
    raffle: &Pubkey,
    vrf: &Pubkey,
    winner: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*raffle, false),
            AccountMeta::new_readonly(*vrf, false),
            AccountMeta::new(*winner, false),
        ],
        data: RaffleInstruction::FulfillRandomness.pack(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OracleRouting;

    #[test]
    fn initialize_carries_the_config() {
        let config = RaffleConfig {
            entrance_fee: 100,
            interval: 30,
            routing: OracleRouting {
                oracle_queue: Pubkey::new_unique(),
                permission_bump: 254,
                switchboard_state_bump: 253,
            },
            callback_budget: 200_000,
        };
        let data = RaffleInstruction::InitializeRaffle { config }.pack();
        assert_eq!(data.len(), 1 + RaffleConfig::LEN);
        assert_eq!(
            RaffleInstruction::unpack(&data),
            Ok(RaffleInstruction::InitializeRaffle { config })
        );
    }

    #[test]
    fn packed_config_matches_its_borsh_encoding() {
        use borsh::BorshSerialize;

        let config = RaffleConfig {
            routing: OracleRouting {
                oracle_queue: Pubkey::new_unique(),
                permission_bump: 7,
                switchboard_state_bump: 9,
            },
            ..RaffleConfig::default()
        };
        let data = RaffleInstruction::InitializeRaffle { config }.pack();
        assert_eq!(data[0], 0);
        assert_eq!(data[1..], config.try_to_vec().unwrap()[..]);
    }

    #[test]
    fn enter_encodes_amount_little_endian() {
        let data = RaffleInstruction::EnterRaffle { amount: 300 }.pack();
        assert_eq!(data, vec![1, 44, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            RaffleInstruction::unpack(&data),
            Ok(RaffleInstruction::EnterRaffle { amount: 300 })
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            RaffleInstruction::unpack(&[]),
            Err(RaffleError::InvalidInstructionData)
        );
        assert_eq!(
            RaffleInstruction::unpack(&[1, 0, 0]),
            Err(RaffleError::InvalidInstructionData)
        );
        assert_eq!(
            RaffleInstruction::unpack(&[0, 1, 2]),
            Err(RaffleError::InvalidInstructionData)
        );
        assert_eq!(
            RaffleInstruction::unpack(&[9]),
            Err(RaffleError::InvalidInstructionData)
        );
    }

    #[test]
    fn initialize_targets_the_authority_pda() {
        let program_id = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let ix = initialize_raffle(&program_id, &authority, RaffleConfig::default());
        let (raffle, _) = utils::find_raffle_address(&program_id, &authority);
        assert_eq!(ix.accounts[1].pubkey, raffle);
        assert!(ix.accounts[0].is_signer);
    }
}
