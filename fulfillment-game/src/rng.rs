//! Deterministic RNG streams derived from a single user seed.
//!
//! Each concern draws from its own stream so that, for example, a strategy that
//! consumes extra randomness never shifts which challenges are offered.

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

const CHALLENGE_TAG: &[u8] = b"challenge";
const LIFE_TAG: &[u8] = b"life";
const STRATEGY_TAG: &[u8] = b"strategy";

/// Per-concern RNG streams for one turn of play.
#[derive(Debug, Clone)]
pub struct RngBundle {
    seed: u64,
    turn: u32,
    challenge: CountingRng<ChaCha20Rng>,
    life: CountingRng<ChaCha20Rng>,
    strategy: CountingRng<ChaCha20Rng>,
}

impl RngBundle {
    /// Streams for the first turn of a game seeded with `seed`.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self::for_turn(seed, 1)
    }

    /// Streams for `turn`. Reseeding per turn lets a restored game continue
    /// exactly as the uninterrupted one would have.
    #[must_use]
    pub fn for_turn(seed: u64, turn: u32) -> Self {
        Self {
            seed,
            turn,
            challenge: CountingRng::new(derive_stream_seed(seed, CHALLENGE_TAG, turn)),
            life: CountingRng::new(derive_stream_seed(seed, LIFE_TAG, turn)),
            strategy: CountingRng::new(derive_stream_seed(seed, STRATEGY_TAG, turn)),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Stream used for challenge offers.
    pub fn challenge(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.challenge
    }

    /// Stream used for life-card hands.
    pub fn life(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.life
    }

    /// Stream reserved for player strategies.
    pub fn strategy(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.strategy
    }

    /// Total draws across all streams.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.challenge
            .draws()
            .saturating_add(self.life.draws())
            .saturating_add(self.strategy.draws())
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha20Rng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8], turn: u32) -> u64 {
    Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).map_or(user_seed, |mut mac| {
        mac.update(domain_tag);
        mac.update(&turn.to_le_bytes());
        let digest = mac.finalize().into_bytes();
        let mut seed_bytes = [0_u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(seed_bytes)
    })
}
