// Autoraffle Program - Utilities
use arrayref::array_refs;
use solana_program::pubkey::Pubkey;

/// Seed prefix of the raffle PDA
pub const RAFFLE_SEED: &[u8] = b"raffle";

/// Find the program derived address of the raffle created by `authority`
pub fn find_raffle_address(program_id: &Pubkey, authority: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[RAFFLE_SEED, authority.as_ref()], program_id)
}

/// Split a 32-byte VRF result into four little-endian words
pub fn random_words(result: &[u8; 32]) -> [u64; 4] {
    let (a, b, c, d) = array_refs![result, 8, 8, 8, 8];
    [
        u64::from_le_bytes(*a),
        u64::from_le_bytes(*b),
        u64::from_le_bytes(*c),
        u64::from_le_bytes(*d),
    ]
}

/// Index of the winning slot, `None` when there is nobody to pick
pub fn winner_index(random: u64, entrant_count: u64) -> Option<u64> {
    random.checked_rem(entrant_count)
}
