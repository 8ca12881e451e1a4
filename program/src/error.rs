// Autoraffle Program - Errors
use solana_program::program_error::ProgramError;
use thiserror::Error;

/// Errors that may be returned by the raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    /// Configuration rejected at initialization
    #[error("Invalid raffle configuration")]
    InvalidConfig,

    #[error("Raffle already initialized")]
    RaffleAlreadyInitialized,

    /// Raffle account is not the expected PDA or not owned by the program
    #[error("Invalid raffle account")]
    InvalidRaffleAccount,

    /// Payment is below the entrance fee
    #[error("Payment is below the entrance fee")]
    InsufficientPayment,

    /// Entries are only accepted while the round is open
    #[error("Round is not open")]
    RoundNotOpen,

    #[error("Entrant index out of range")]
    IndexOutOfRange,

    /// Upkeep was triggered while the raffle is not eligible
    #[error("Upkeep not needed")]
    UpkeepNotNeeded,

    /// The randomness provider refused the request
    #[error("Randomness request failed")]
    RandomnessRequestFailed,

    /// VRF account is not a Switchboard VRF bound to this raffle
    #[error("Invalid VRF account")]
    InvalidVrfAccount,

    /// Fulfillment does not match the pending request
    #[error("Unknown randomness request")]
    UnknownRequest,

    /// Fulfillment carries no random value yet
    #[error("Randomness not available")]
    MissingRandomness,

    /// The prize transfer to the winner was rejected
    #[error("Payout failed")]
    PayoutFailed,

    /// Internal state contradicts a raffle invariant
    #[error("Raffle invariant violated")]
    InvariantViolation,

    #[error("Arithmetic overflow")]
    Overflow,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_custom_program_error() {
        assert_eq!(
            ProgramError::from(RaffleError::InvalidInstructionData),
            ProgramError::Custom(0)
        );
        assert_eq!(
            ProgramError::from(RaffleError::UnknownRequest),
            ProgramError::Custom(RaffleError::UnknownRequest as u32)
        );
    }
}
