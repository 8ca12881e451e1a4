// Autoraffle Program - Switchboard VRF
#![allow(deprecated)]

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    hash::hash,
    instruction::{AccountMeta, Instruction},
    msg,
    program::invoke_signed,
    program_error::ProgramError,
    pubkey::Pubkey,
    sysvar::recent_blockhashes,
};
use std::{cell::Ref, mem::size_of};
use switchboard_v2::{VrfAccountData, SWITCHBOARD_PROGRAM_ID};

use crate::{
    config::OracleRouting,
    error::RaffleError,
    gateway::RandomnessGateway,
    state::RequestHandle,
    utils::{self, RAFFLE_SEED},
};

/// Anchor method name of the Switchboard request instruction
const VRF_REQUEST_RANDOMNESS: &str = "global:vrf_request_randomness";
/// Anchor account name of the VRF account
const VRF_ACCOUNT_DISCRIMINATOR: &str = "account:VrfAccountData";

#[derive(BorshSerialize, BorshDeserialize)]
struct VrfRequestRandomnessParams {
    permission_bump: u8,
    state_bump: u8,
}

/// Accounts needed to ask Switchboard for randomness on behalf of a raffle.
///
/// The raffle PDA is the VRF authority and signs the request.
pub struct SwitchboardGateway<'a, 'info> {
    pub raffle: &'a AccountInfo<'info>,
    pub raffle_authority: Pubkey,
    pub raffle_bump: u8,
    pub vrf: &'a AccountInfo<'info>,
    pub oracle_queue: &'a AccountInfo<'info>,
    pub queue_authority: &'a AccountInfo<'info>,
    pub data_buffer: &'a AccountInfo<'info>,
    pub permission: &'a AccountInfo<'info>,
    pub escrow: &'a AccountInfo<'info>,
    pub payer_wallet: &'a AccountInfo<'info>,
    pub payer_authority: &'a AccountInfo<'info>,
    pub recent_blockhashes: &'a AccountInfo<'info>,
    pub program_state: &'a AccountInfo<'info>,
    pub switchboard_program: &'a AccountInfo<'info>,
    pub token_program: &'a AccountInfo<'info>,
}

impl<'a, 'info> SwitchboardGateway<'a, 'info> {
    fn verify_accounts(&self, routing: &OracleRouting) -> Result<(), ProgramError> {
        if *self.switchboard_program.key != SWITCHBOARD_PROGRAM_ID {
            msg!("Switchboard program mismatch: {}", self.switchboard_program.key);
            return Err(ProgramError::IncorrectProgramId);
        }
        if *self.token_program.key != spl_token::id() {
            msg!("Token program mismatch: {}", self.token_program.key);
            return Err(ProgramError::IncorrectProgramId);
        }
        if *self.recent_blockhashes.key != recent_blockhashes::id() {
            msg!("Recent blockhashes sysvar expected");
            return Err(ProgramError::InvalidArgument);
        }
        if *self.oracle_queue.key != routing.oracle_queue {
            msg!(
                "Oracle queue {} is not the configured queue {}",
                self.oracle_queue.key,
                routing.oracle_queue
            );
            return Err(ProgramError::InvalidArgument);
        }
        if !self.payer_authority.is_signer {
            msg!("Payer authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let vrf = load_vrf(self.vrf)?;
        let authority = vrf.authority;
        let escrow = vrf.escrow;
        if authority != *self.raffle.key {
            msg!("VRF authority {} is not the raffle", authority);
            return Err(RaffleError::InvalidVrfAccount.into());
        }
        if escrow != *self.escrow.key {
            msg!("VRF escrow mismatch: {}", self.escrow.key);
            return Err(RaffleError::InvalidVrfAccount.into());
        }
        Ok(())
    }

    fn request_instruction(&self, routing: &OracleRouting) -> Result<Instruction, ProgramError> {
        let mut data = hash(VRF_REQUEST_RANDOMNESS.as_bytes()).to_bytes()[..8].to_vec();
        VrfRequestRandomnessParams {
            permission_bump: routing.permission_bump,
            state_bump: routing.switchboard_state_bump,
        }
        .serialize(&mut data)?;

        Ok(Instruction {
            program_id: *self.switchboard_program.key,
            accounts: vec![
                AccountMeta::new_readonly(*self.raffle.key, true),
                AccountMeta::new(*self.vrf.key, false),
                AccountMeta::new(*self.oracle_queue.key, false),
                AccountMeta::new_readonly(*self.queue_authority.key, false),
                AccountMeta::new_readonly(*self.data_buffer.key, false),
                AccountMeta::new(*self.permission.key, false),
                AccountMeta::new(*self.escrow.key, false),
                AccountMeta::new(*self.payer_wallet.key, false),
                AccountMeta::new_readonly(*self.payer_authority.key, true),
                AccountMeta::new_readonly(*self.recent_blockhashes.key, false),
                AccountMeta::new_readonly(*self.program_state.key, false),
                AccountMeta::new_readonly(*self.token_program.key, false),
            ],
            data,
        })
    }
}

impl<'a, 'info> RandomnessGateway for SwitchboardGateway<'a, 'info> {
    fn request_randomness(
        &mut self,
        routing: &OracleRouting,
        callback_budget: u32,
    ) -> Result<RequestHandle, ProgramError> {
        self.verify_accounts(routing)?;

        msg!(
            "Requesting randomness from queue {} (callback budget {} CU)",
            routing.oracle_queue,
            callback_budget
        );
        let instruction = self.request_instruction(routing)?;
        invoke_signed(
            &instruction,
            &[
                self.raffle.clone(),
                self.vrf.clone(),
                self.oracle_queue.clone(),
                self.queue_authority.clone(),
                self.data_buffer.clone(),
                self.permission.clone(),
                self.escrow.clone(),
                self.payer_wallet.clone(),
                self.payer_authority.clone(),
                self.recent_blockhashes.clone(),
                self.program_state.clone(),
                self.token_program.clone(),
                self.switchboard_program.clone(),
            ],
            &[&[
                RAFFLE_SEED,
                self.raffle_authority.as_ref(),
                &[self.raffle_bump],
            ]],
        )?;

        let counter = load_vrf(self.vrf)?.counter;
        Ok(RequestHandle {
            vrf: *self.vrf.key,
            counter,
        })
    }
}

/// Reads the request identity and random words from a fulfilled VRF account.
///
/// Fails with `MissingRandomness` while the oracle has not answered the
/// current request.
pub fn read_fulfillment(vrf_info: &AccountInfo) -> Result<(RequestHandle, [u64; 4]), ProgramError> {
    let vrf = load_vrf(vrf_info)?;
    let counter = vrf.counter;
    let result = vrf.get_result().map_err(|_| {
        msg!("VRF {} has no result for request {}", vrf_info.key, counter);
        RaffleError::MissingRandomness
    })?;

    Ok((
        RequestHandle {
            vrf: *vrf_info.key,
            counter,
        },
        utils::random_words(&result),
    ))
}

/// Borrows the zero-copy VRF account after checking owner and discriminator
fn load_vrf<'a>(vrf_info: &'a AccountInfo) -> Result<Ref<'a, VrfAccountData>, ProgramError> {
    if vrf_info.owner != &SWITCHBOARD_PROGRAM_ID {
        msg!("VRF account not owned by Switchboard program");
        return Err(RaffleError::InvalidVrfAccount.into());
    }
    let data = vrf_info.try_borrow_data()?;
    let end = 8 + size_of::<VrfAccountData>();
    let discriminator = hash(VRF_ACCOUNT_DISCRIMINATOR.as_bytes()).to_bytes();
    if data.len() < end || data[..8] != discriminator[..8] {
        msg!("VRF account data could not be parsed");
        return Err(RaffleError::InvalidVrfAccount.into());
    }
    Ok(Ref::map(data, |data| bytemuck::from_bytes(&data[8..end])))
}
