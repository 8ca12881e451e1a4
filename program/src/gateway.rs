// Autoraffle Program - Randomness Gateway
use solana_program::program_error::ProgramError;

use crate::{config::OracleRouting, state::RequestHandle};

/// Issues randomness requests to an external provider.
///
/// Implementations hold no raffle state; the returned handle is the only thing
/// the raffle keeps. Any error is reported to the caller as a failed request.
pub trait RandomnessGateway {
    fn request_randomness(
        &mut self,
        routing: &OracleRouting,
        callback_budget: u32,
    ) -> Result<RequestHandle, ProgramError>;
}
