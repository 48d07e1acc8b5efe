//! A seedable RNG helper for the sparse ladder graph's direction/yaw sampling
//! (spec §9: "must use a seedable RNG passed in; never rely on a
//! process-wide default").
//!
//! The seed-plus-call-index mixing is grounded in the teacher's
//! `geom2::rand::ReplayToken::to_std_rng`: a SplitMix64-style mix folding a
//! call index into the base seed, so repeated sampling calls within one run
//! draw independent, reproducible streams without threading a `&mut StdRng`
//! through every call site.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[inline]
fn mix(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

/// A reproducible token identifying one "draw" within a run: the run's base
/// seed plus a monotonically increasing call index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplaySeed {
    pub seed: u64,
    pub index: u64,
}

impl ReplaySeed {
    pub fn new(seed: u64, index: u64) -> Self {
        Self { seed, index }
    }

    /// A fresh, independent `StdRng` for this (seed, index) pair.
    pub fn to_std_rng(self) -> StdRng {
        let k = mix(self.seed ^ mix(self.index.wrapping_add(0x9e3779b97f4a7c15)));
        StdRng::seed_from_u64(k)
    }
}

/// A counter that hands out successive `ReplaySeed`s from one base seed,
/// used by the sparse ladder graph so each Phase 1/Phase 2 sampling call
/// gets its own independently-seeded `StdRng` while the whole run stays
/// reproducible from a single `u64`.
#[derive(Clone, Debug)]
pub struct ReplayCounter {
    seed: u64,
    next_index: u64,
}

impl ReplayCounter {
    pub fn new(seed: u64) -> Self {
        Self { seed, next_index: 0 }
    }

    pub fn next_rng(&mut self) -> StdRng {
        let token = ReplaySeed::new(self.seed, self.next_index);
        self.next_index += 1;
        token.to_std_rng()
    }
}
