//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through SubsystemRng instances derived
//! from the single master seed of the run.
//!
//! Each cascade slot gets its own RNG stream, seeded deterministically
//! from (master_seed, slot_index, day). This means:
//!   - Adding a new slot never changes existing slots' streams.
//!   - Each slot's stream for a given day is reproducible in isolation.
//!   - Consecutive days draw from different streams.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use uuid::Uuid;

/// A named, deterministic RNG for a single cascade slot.
pub struct SubsystemRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SubsystemRng {
    /// Create an RNG from the master seed and a stable slot index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, subsystem_index: u64) -> Self {
        let derived_seed = master_seed ^ (subsystem_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll a float uniformly in [lo, hi].
    pub fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Symmetric jitter in [-magnitude, magnitude).
    pub fn jitter(&mut self, magnitude: f64) -> f64 {
        (self.next_f64() * 2.0 - 1.0) * magnitude
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick an index from a weight list. Returns None for an empty or all-zero list.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let roll = self.next_f64() * total;
        let mut cumulative = 0.0;
        for (i, w) in weights.iter().enumerate() {
            if *w <= 0.0 {
                continue;
            }
            cumulative += w;
            if roll < cumulative {
                return Some(i);
            }
        }
        weights.iter().rposition(|w| *w > 0.0)
    }

    /// A v4-layout UUID built from this stream, so ids replay with the seed.
    pub fn next_uuid(&mut self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.inner.fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

/// All cascade RNGs for a single run, indexed by stable slot.
#[derive(Debug, Clone)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_subsystem(&self, slot: SubsystemSlot) -> SubsystemRng {
        SubsystemRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }

    /// RNG for a slot on a given simulated day.
    pub fn for_subsystem_at_day(&self, slot: SubsystemSlot, day: u64) -> SubsystemRng {
        let day_seed = self
            .master_seed
            .wrapping_add(day.wrapping_mul(0xbf58_476d_1ce4_e5b9));
        SubsystemRng::new(day_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable slot assignments.
/// NEVER reorder or remove entries — only append.
/// Reordering changes every slot's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SubsystemSlot {
    WorldEvents = 0,
    FuelMarket = 1,
    Economy = 2,
    Contracts = 3,
    Competitors = 4,
    Rivals = 5,
    Aircraft = 6,
    Missions = 7,
}

impl SubsystemSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WorldEvents => "world_events",
            Self::FuelMarket => "fuel_market",
            Self::Economy => "economy",
            Self::Contracts => "contracts",
            Self::Competitors => "competitors",
            Self::Rivals => "rivals",
            Self::Aircraft => "aircraft",
            Self::Missions => "missions",
        }
    }
}
