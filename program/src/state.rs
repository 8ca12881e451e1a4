// Autoraffle Program - State
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo, clock::UnixTimestamp, msg, program_error::ProgramError,
    pubkey::Pubkey,
};
use std::fmt;

use crate::{
    config::RaffleConfig,
    error::RaffleError,
    events::{RaffleEntered, RoundCalculating},
    gateway::RandomnessGateway,
    ledger::EntryLedger,
    upkeep::UpkeepCheck,
};

/// Lifecycle of the current round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundState {
    /// Accepting entries, upkeep may run
    Open,
    /// A randomness request is in flight
    Calculating,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundState::Open => f.write_str("OPEN"),
            RoundState::Calculating => f.write_str("CALCULATING"),
        }
    }
}

/// Identity of one randomness request: the VRF account and its request counter
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestHandle {
    pub vrf: Pubkey,
    pub counter: u128,
}

impl fmt::Display for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.vrf, self.counter)
    }
}

/// The single in-flight request of a calculating round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    pub handle: RequestHandle,
    pub requested_at: UnixTimestamp,
}

impl PendingRequest {
    pub const LEN: usize = 32 + 16 + 8;
}

/// Raffle account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Raffle {
    pub(crate) is_initialized: bool,
    pub(crate) bump: u8,
    /// Creator of the raffle, part of the PDA seeds
    pub(crate) authority: Pubkey,
    pub(crate) config: RaffleConfig,
    pub(crate) state: RoundState,
    pub(crate) pending_request: Option<PendingRequest>,
    /// Unix timestamp of the last settlement, or of initialization
    pub(crate) last_settled_at: UnixTimestamp,
    pub(crate) recent_winner: Option<Pubkey>,
    /// Completed rounds
    pub(crate) round: u64,
    /// Kept last: it is the only variable-length field
    pub(crate) ledger: EntryLedger,
}

impl Raffle {
    /// Serialized size with every optional field populated and no entrants
    pub const FIXED_LEN: usize =
        1 + 1 + 32 + RaffleConfig::LEN + 1 + (1 + PendingRequest::LEN) + 8 + (1 + 32) + 8;

    pub fn new(
        authority: Pubkey,
        bump: u8,
        config: RaffleConfig,
        now: UnixTimestamp,
    ) -> Result<Self, RaffleError> {
        config.validate()?;
        Ok(Self {
            is_initialized: true,
            bump,
            authority,
            config,
            state: RoundState::Open,
            pending_request: None,
            last_settled_at: now,
            recent_winner: None,
            round: 0,
            ledger: EntryLedger::default(),
        })
    }

    /// Account size able to hold `entrants` entrants
    pub fn space(entrants: usize) -> usize {
        Self::FIXED_LEN + EntryLedger::len_for(entrants)
    }

    /// Account size required by the current contents
    pub fn required_space(&self) -> usize {
        Self::space(self.ledger.entrants().len())
    }

    /// Reads raffle data, ignoring the unused tail of the account.
    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        let raffle = Self::deserialize(&mut &data[..])?;
        if !raffle.is_initialized {
            msg!("Raffle account is not initialized");
            return Err(ProgramError::UninitializedAccount);
        }
        Ok(raffle)
    }

    pub fn load(raffle_info: &AccountInfo, program_id: &Pubkey) -> Result<Self, ProgramError> {
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by the program");
            return Err(RaffleError::InvalidRaffleAccount.into());
        }
        Self::unpack(&raffle_info.data.borrow())
    }

    pub fn save(&self, raffle_info: &AccountInfo) -> Result<(), ProgramError> {
        if raffle_info.data_len() < self.required_space() {
            msg!(
                "Raffle account holds {} bytes, {} required",
                raffle_info.data_len(),
                self.required_space()
            );
            return Err(ProgramError::AccountDataTooSmall);
        }
        self.serialize(&mut &mut raffle_info.data.borrow_mut()[..])?;
        Ok(())
    }

    /// Admits an entrant while the round is open.
    pub fn enter(&mut self, entrant: Pubkey, amount: u64) -> Result<RaffleEntered, RaffleError> {
        if self.state != RoundState::Open {
            msg!("Round is {}, entries are closed", self.state);
            return Err(RaffleError::RoundNotOpen);
        }
        let total_entrants = self
            .ledger
            .admit(entrant, amount, self.config.entrance_fee)?;

        Ok(RaffleEntered {
            entrant,
            total_entrants,
        })
    }

    /// Side-effect free eligibility check.
    pub fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepCheck {
        UpkeepCheck::evaluate(
            self.state,
            self.ledger.pool_balance(),
            self.ledger.entrant_count(),
            now.saturating_sub(self.last_settled_at),
            self.config.interval,
        )
    }

    /// Moves an eligible round to CALCULATING and records the issued request.
    ///
    /// Eligibility is recomputed here. If the gateway fails the round stays OPEN
    /// with no pending request.
    pub fn trigger_upkeep<G: RandomnessGateway>(
        &mut self,
        now: UnixTimestamp,
        gateway: &mut G,
    ) -> Result<RoundCalculating, RaffleError> {
        let check = self.check_upkeep(now);
        if !check.is_eligible() {
            for blocker in check.blockers() {
                msg!("Upkeep not needed: {}", blocker);
            }
            return Err(RaffleError::UpkeepNotNeeded);
        }
        if self.pending_request.is_some() {
            msg!("Open round still holds a pending request");
            return Err(RaffleError::InvariantViolation);
        }

        self.state = RoundState::Calculating;
        let handle =
            match gateway.request_randomness(&self.config.routing, self.config.callback_budget) {
                Ok(handle) => handle,
                Err(err) => {
                    self.state = RoundState::Open;
                    msg!("Randomness request failed: {}", err);
                    return Err(RaffleError::RandomnessRequestFailed);
                }
            };

        self.pending_request = Some(PendingRequest {
            handle,
            requested_at: now,
        });

        Ok(RoundCalculating {
            request: handle,
            requested_at: now,
        })
    }

    pub fn authority(&self) -> &Pubkey {
        &self.authority
    }

    pub fn bump(&self) -> u8 {
        self.bump
    }

    pub fn config(&self) -> &RaffleConfig {
        &self.config
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn pool_balance(&self) -> u64 {
        self.ledger.pool_balance()
    }

    pub fn entrant_count(&self) -> u64 {
        self.ledger.entrant_count()
    }

    pub fn entrant_at(&self, index: u64) -> Result<Pubkey, RaffleError> {
        self.ledger.entrant_at(index)
    }

    pub fn entrance_fee(&self) -> u64 {
        self.config.entrance_fee
    }

    pub fn interval(&self) -> u64 {
        self.config.interval
    }

    pub fn last_settled_at(&self) -> UnixTimestamp {
        self.last_settled_at
    }

    pub fn pending_request(&self) -> Option<&PendingRequest> {
        self.pending_request.as_ref()
    }

    pub fn recent_winner(&self) -> Option<Pubkey> {
        self.recent_winner
    }

    pub fn round(&self) -> u64 {
        self.round
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::OracleRouting;

    pub(crate) const FEE: u64 = 100;
    pub(crate) const INTERVAL: u64 = 30;
    pub(crate) const START: UnixTimestamp = 1_700_000_000;

    /// Issues sequential handles on one VRF account, or refuses every request.
    pub(crate) struct MockGateway {
        pub vrf: Pubkey,
        pub requests: u128,
        pub fail: bool,
    }

    impl MockGateway {
        pub(crate) fn new() -> Self {
            Self {
                vrf: Pubkey::new_unique(),
                requests: 0,
                fail: false,
            }
        }
    }

    impl RandomnessGateway for MockGateway {
        fn request_randomness(
            &mut self,
            _routing: &OracleRouting,
            _callback_budget: u32,
        ) -> Result<RequestHandle, ProgramError> {
            if self.fail {
                return Err(ProgramError::InvalidAccountData);
            }
            self.requests += 1;
            Ok(RequestHandle {
                vrf: self.vrf,
                counter: self.requests,
            })
        }
    }

    pub(crate) fn raffle() -> Raffle {
        let config = RaffleConfig {
            entrance_fee: FEE,
            interval: INTERVAL,
            ..RaffleConfig::default()
        };
        Raffle::new(Pubkey::new_unique(), 255, config, START).unwrap()
    }

    #[test]
    fn starts_open_and_empty() {
        let raffle = raffle();
        assert_eq!(raffle.state(), RoundState::Open);
        assert_eq!(raffle.entrant_count(), 0);
        assert_eq!(raffle.pool_balance(), 0);
        assert_eq!(raffle.entrance_fee(), FEE);
        assert_eq!(raffle.interval(), INTERVAL);
        assert_eq!(raffle.last_settled_at(), START);
        assert!(raffle.pending_request().is_none());
        assert!(raffle.recent_winner().is_none());
    }

    #[test]
    fn rejects_invalid_config() {
        let config = RaffleConfig {
            entrance_fee: 0,
            ..RaffleConfig::default()
        };
        assert_eq!(
            Raffle::new(Pubkey::new_unique(), 255, config, START),
            Err(RaffleError::InvalidConfig)
        );
    }

    #[test]
    fn enter_reports_running_total() {
        let mut raffle = raffle();
        let entrant = Pubkey::new_unique();
        let event = raffle.enter(entrant, FEE).unwrap();
        assert_eq!(event.entrant, entrant);
        assert_eq!(event.total_entrants, 1);
        assert_eq!(raffle.enter(entrant, FEE * 2).unwrap().total_entrants, 2);
        assert_eq!(raffle.pool_balance(), FEE * 3);
    }

    #[test]
    fn enter_while_calculating_is_rejected_without_mutation() {
        let mut raffle = raffle();
        raffle.enter(Pubkey::new_unique(), FEE).unwrap();
        raffle
            .trigger_upkeep(START + INTERVAL as i64 + 1, &mut MockGateway::new())
            .unwrap();
        let before = raffle.clone();

        assert_eq!(
            raffle.enter(Pubkey::new_unique(), FEE),
            Err(RaffleError::RoundNotOpen)
        );
        // the state guard runs before the fee check
        assert_eq!(
            raffle.enter(Pubkey::new_unique(), 0),
            Err(RaffleError::RoundNotOpen)
        );
        assert_eq!(raffle, before);
    }

    #[test]
    fn ineligible_trigger_leaves_state_unchanged() {
        let mut raffle = raffle();
        let mut gateway = MockGateway::new();

        assert_eq!(
            raffle.trigger_upkeep(START + 100, &mut gateway),
            Err(RaffleError::UpkeepNotNeeded)
        );

        raffle.enter(Pubkey::new_unique(), FEE).unwrap();
        let before = raffle.clone();
        assert_eq!(
            raffle.trigger_upkeep(START + 1, &mut gateway),
            Err(RaffleError::UpkeepNotNeeded)
        );
        assert_eq!(raffle, before);
        assert_eq!(gateway.requests, 0);
    }

    #[test]
    fn eligible_trigger_issues_exactly_one_request() {
        let mut raffle = raffle();
        let mut gateway = MockGateway::new();
        raffle.enter(Pubkey::new_unique(), FEE).unwrap();
        let now = START + INTERVAL as i64;

        assert!(raffle.check_upkeep(now).is_eligible());
        let event = raffle.trigger_upkeep(now, &mut gateway).unwrap();

        assert_eq!(raffle.state(), RoundState::Calculating);
        assert_eq!(gateway.requests, 1);
        let pending = raffle.pending_request().unwrap();
        assert_eq!(pending.handle, event.request);
        assert_eq!(pending.requested_at, now);

        // CALCULATING itself blocks a second trigger
        assert_eq!(
            raffle.trigger_upkeep(now + 1, &mut gateway),
            Err(RaffleError::UpkeepNotNeeded)
        );
        assert_eq!(gateway.requests, 1);
        assert!(!raffle.check_upkeep(now + 1).is_eligible());
    }

    #[test]
    fn gateway_failure_rolls_back_the_transition() {
        let mut raffle = raffle();
        raffle.enter(Pubkey::new_unique(), FEE).unwrap();
        let before = raffle.clone();
        let mut gateway = MockGateway::new();
        gateway.fail = true;

        assert_eq!(
            raffle.trigger_upkeep(START + INTERVAL as i64, &mut gateway),
            Err(RaffleError::RandomnessRequestFailed)
        );
        assert_eq!(raffle, before);
        assert_eq!(raffle.state(), RoundState::Open);
        assert!(raffle.pending_request().is_none());
    }

    #[test]
    fn serialized_size_fits_space() {
        let mut raffle = raffle();
        raffle.enter(Pubkey::new_unique(), FEE).unwrap();
        raffle.enter(Pubkey::new_unique(), FEE).unwrap();
        raffle
            .trigger_upkeep(START + INTERVAL as i64, &mut MockGateway::new())
            .unwrap();
        raffle.recent_winner = Some(Pubkey::new_unique());

        let bytes = raffle.try_to_vec().unwrap();
        assert_eq!(bytes.len(), raffle.required_space());
    }

    #[test]
    fn unpack_ignores_unused_tail() {
        let raffle = raffle();
        let mut data = raffle.try_to_vec().unwrap();
        data.resize(Raffle::space(8), 0);
        assert_eq!(Raffle::unpack(&data).unwrap(), raffle);
    }

    #[test]
    fn unpack_rejects_zeroed_account() {
        let data = vec![0u8; Raffle::space(0)];
        assert_eq!(
            Raffle::unpack(&data),
            Err(ProgramError::UninitializedAccount)
        );
    }
}
