//! Deterministic pseudorandom source shared with the authoritative server.
//!
//! The client predicts server outcomes, so this cannot be an arbitrary
//! generator: both sides run the same published routine — a 32-bit string
//! hash feeding a mulberry32 stream — and the same seed yields the same
//! sequence everywhere. Seeds are composed in two tiers so that rolling
//! back one operation never perturbs the randomness of another in the
//! same round:
//!
//! - decision seed: `{game_seed}:{round}`
//! - per-operation seed: `{game_seed}:{round}:op{index}`

/// Seeded reproducible pseudorandom sequence.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    state: u32,
}

impl DeterministicRng {
    pub fn new(seed: &str) -> Self {
        Self { state: hash_seed(seed) }
    }

    /// Next value in `[0, 1)`.
    pub fn next(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        f64::from(t ^ (t >> 14)) / 4_294_967_296.0
    }
}

/// 32-bit string hash over UTF-16 code units, matching the server's
/// seeding of its generator bit for bit.
fn hash_seed(seed: &str) -> u32 {
    let units: Vec<u16> = seed.encode_utf16().collect();
    let mut h: u32 = 1_779_033_703 ^ units.len() as u32;
    for unit in units {
        h = (h ^ u32::from(unit)).wrapping_mul(3_432_918_353);
        h = h.rotate_left(13);
    }
    h = (h ^ (h >> 16)).wrapping_mul(2_246_822_507);
    h = (h ^ (h >> 13)).wrapping_mul(3_266_489_909);
    h ^ (h >> 16)
}

/// Seed for the boss decision of a round.
pub fn decision_seed(game_seed: &str, round: u32) -> String {
    format!("{}:{}", game_seed, round)
}

/// Seed for resolving one speculative operation. `index` is the ledger's
/// globally shared sequence index, unique even across actors in a round.
pub fn operation_seed(game_seed: &str, round: u32, index: u64) -> String {
    format!("{}:{}:op{}", game_seed, round, index)
}

/// Cumulative-priority weighted choice.
///
/// Draws `r = roll * total_weight` and returns the first entry whose
/// cumulative weight reaches `r`; falls back to the last entry when
/// floating point rounding leaves `r` above every cumulative sum.
pub fn weighted_pick<'a, T>(
    items: &'a [T],
    weight_of: impl Fn(&T) -> f64,
    roll: f64,
) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    let total: f64 = items.iter().map(&weight_of).sum();
    let r = roll * total;
    let mut cumulative = 0.0;
    for item in items {
        cumulative += weight_of(item);
        if r <= cumulative {
            return Some(item);
        }
    }
    items.last()
}
