// Autoraffle Program - Configuration
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, pubkey::Pubkey};

use crate::error::RaffleError;

/// 0.01 SOL
pub const DEFAULT_ENTRANCE_FEE: u64 = 10_000_000;
/// Seconds between rounds
pub const DEFAULT_INTERVAL: u64 = 30;
/// Compute units granted to the VRF callback
pub const DEFAULT_CALLBACK_BUDGET: u32 = 500_000;

/// Where randomness requests are routed. Only the gateway reads these.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OracleRouting {
    /// Switchboard oracle queue serving the VRF account
    pub oracle_queue: Pubkey,
    /// Bump of the queue permission PDA
    pub permission_bump: u8,
    /// Bump of the Switchboard program state PDA
    pub switchboard_state_bump: u8,
}

/// Deployment configuration, fixed when the raffle is initialized.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Minimum payment in lamports for one entry
    pub entrance_fee: u64,
    /// Minimum seconds between two settlements
    pub interval: u64,
    pub routing: OracleRouting,
    pub callback_budget: u32,
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            entrance_fee: DEFAULT_ENTRANCE_FEE,
            interval: DEFAULT_INTERVAL,
            routing: OracleRouting::default(),
            callback_budget: DEFAULT_CALLBACK_BUDGET,
        }
    }
}

impl RaffleConfig {
    pub const LEN: usize = 8 + 8 + (32 + 1 + 1) + 4;

    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.entrance_fee == 0 {
            msg!("Entrance fee must be greater than zero");
            return Err(RaffleError::InvalidConfig);
        }
        if i64::try_from(self.interval).is_err() {
            msg!("Interval {} does not fit a unix timestamp", self.interval);
            return Err(RaffleError::InvalidConfig);
        }
        Ok(())
    }
}
