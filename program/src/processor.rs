// Autoraffle Program - Instruction Processor
use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction, system_program,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

use crate::{
    config::RaffleConfig,
    error::RaffleError,
    events,
    instruction::RaffleInstruction,
    settlement::LamportPayout,
    state::Raffle,
    utils::{self, RAFFLE_SEED},
    vrf::{self, SwitchboardGateway},
};

/// Entrant slots allocated when the raffle account is created. The account
/// grows past this as entrants arrive, paid for by the entrant that needs it.
pub const INITIAL_ENTRANT_CAPACITY: usize = 16;

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle { config } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(program_id, accounts, config)
            }
            RaffleInstruction::EnterRaffle { amount } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(program_id, accounts, amount)
            }
            RaffleInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(program_id, accounts)
            }
            RaffleInstruction::PerformUpkeep => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(program_id, accounts)
            }
            RaffleInstruction::FulfillRandomness => {
                msg!("Instruction: Fulfill Randomness");
                Self::process_fulfill_randomness(program_id, accounts)
            }
        }
    }

    fn process_initialize_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        config: RaffleConfig,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *system_program_info.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let (expected_raffle, bump) = utils::find_raffle_address(program_id, authority_info.key);
        if *raffle_info.key != expected_raffle {
            msg!("Raffle account must be the authority's raffle PDA");
            return Err(RaffleError::InvalidRaffleAccount.into());
        }
        if raffle_info.owner == program_id {
            msg!("Raffle {} already exists", raffle_info.key);
            return Err(RaffleError::RaffleAlreadyInitialized.into());
        }

        let now = Clock::get()?.unix_timestamp;
        let raffle = Raffle::new(*authority_info.key, bump, config, now)?;

        let space = Raffle::space(INITIAL_ENTRANT_CAPACITY);
        let rent_lamports = Rent::get()?.minimum_balance(space);
        let bump_seed = [bump];
        let seeds: &[&[u8]] = &[RAFFLE_SEED, authority_info.key.as_ref(), &bump_seed];
        if raffle_info.lamports() == 0 {
            invoke_signed(
                &system_instruction::create_account(
                    authority_info.key,
                    raffle_info.key,
                    rent_lamports,
                    space as u64,
                    program_id,
                ),
                &[
                    authority_info.clone(),
                    raffle_info.clone(),
                    system_program_info.clone(),
                ],
                &[seeds],
            )?;
        } else {
            // create_account refuses funded addresses, so build the account in steps
            msg!("Raffle address already holds {} lamports", raffle_info.lamports());
            let top_up = rent_lamports.saturating_sub(raffle_info.lamports());
            if top_up > 0 {
                invoke(
                    &system_instruction::transfer(authority_info.key, raffle_info.key, top_up),
                    &[
                        authority_info.clone(),
                        raffle_info.clone(),
                        system_program_info.clone(),
                    ],
                )?;
            }
            invoke_signed(
                &system_instruction::allocate(raffle_info.key, space as u64),
                &[raffle_info.clone(), system_program_info.clone()],
                &[seeds],
            )?;
            invoke_signed(
                &system_instruction::assign(raffle_info.key, program_id),
                &[raffle_info.clone(), system_program_info.clone()],
                &[seeds],
            )?;
        }

        raffle.save(raffle_info)?;
        msg!(
            "Raffle {} opened: fee {} lamports, interval {}s",
            raffle_info.key,
            config.entrance_fee,
            config.interval
        );
        Ok(())
    }

    fn process_enter_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let entrant_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !entrant_info.is_signer {
            msg!("Entrant must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *system_program_info.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle = Raffle::load(raffle_info, program_id)?;
        let event = raffle.enter(*entrant_info.key, amount)?;

        let required = raffle.required_space();
        // The pool sits on top of the rent reserve, never inside it
        let top_up = if raffle_info.data_len() < required {
            let needed = Rent::get()?
                .minimum_balance(required)
                .checked_add(raffle.pool_balance())
                .ok_or(RaffleError::Overflow)?;
            needed.saturating_sub(raffle_info.lamports().saturating_add(amount))
        } else {
            0
        };
        let deposit = amount.checked_add(top_up).ok_or(RaffleError::Overflow)?;

        invoke(
            &system_instruction::transfer(entrant_info.key, raffle_info.key, deposit),
            &[
                entrant_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;
        if raffle_info.data_len() < required {
            msg!("Growing raffle account to {} bytes", required);
            raffle_info.realloc(required, false)?;
        }

        raffle.save(raffle_info)?;
        events::emit(&event)
    }

    fn process_check_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        let raffle = Raffle::load(raffle_info, program_id)?;
        let check = raffle.check_upkeep(Clock::get()?.unix_timestamp);
        if check.is_eligible() {
            msg!("Upkeep needed");
        }
        for blocker in check.blockers() {
            msg!("Upkeep not needed: {}", blocker);
        }

        set_return_data(&check.try_to_vec()?);
        Ok(())
    }

    fn process_perform_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let vrf_info = next_account_info(account_info_iter)?;
        let oracle_queue_info = next_account_info(account_info_iter)?;
        let queue_authority_info = next_account_info(account_info_iter)?;
        let data_buffer_info = next_account_info(account_info_iter)?;
        let permission_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;
        let payer_wallet_info = next_account_info(account_info_iter)?;
        let recent_blockhashes_info = next_account_info(account_info_iter)?;
        let program_state_info = next_account_info(account_info_iter)?;
        let switchboard_program_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;

        let mut raffle = Raffle::load(raffle_info, program_id)?;
        let mut gateway = SwitchboardGateway {
            raffle: raffle_info,
            raffle_authority: *raffle.authority(),
            raffle_bump: raffle.bump(),
            vrf: vrf_info,
            oracle_queue: oracle_queue_info,
            queue_authority: queue_authority_info,
            data_buffer: data_buffer_info,
            permission: permission_info,
            escrow: escrow_info,
            payer_wallet: payer_wallet_info,
            payer_authority: caller_info,
            recent_blockhashes: recent_blockhashes_info,
            program_state: program_state_info,
            switchboard_program: switchboard_program_info,
            token_program: token_program_info,
        };

        let event = raffle.trigger_upkeep(Clock::get()?.unix_timestamp, &mut gateway)?;
        raffle.save(raffle_info)?;
        events::emit(&event)
    }

    fn process_fulfill_randomness(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;
        let vrf_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        let mut raffle = Raffle::load(raffle_info, program_id)?;
        match raffle.pending_request() {
            Some(pending) if pending.handle.vrf == *vrf_info.key => {}
            Some(pending) => {
                msg!(
                    "VRF {} is not the source of pending request {}",
                    vrf_info.key,
                    pending.handle
                );
                return Err(RaffleError::UnknownRequest.into());
            }
            None => {
                msg!("No randomness request is pending");
                return Err(RaffleError::UnknownRequest.into());
            }
        }

        let (handle, random_words) = vrf::read_fulfillment(vrf_info)?;
        let mut payout = LamportPayout {
            raffle: raffle_info,
            winner: winner_info,
        };
        let event = raffle.on_fulfillment(
            &handle,
            &random_words,
            Clock::get()?.unix_timestamp,
            &mut payout,
        )?;

        raffle.save(raffle_info)?;
        events::emit(&event)
    }
}
