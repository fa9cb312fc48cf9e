//! Rival simulator — the competitor roster, its daily stochastic drift,
//! the combined player/rival ranking and the route competition factor.
//!
//! Execution: `daily_drift` runs every day in the competitor step, after
//! competitor fares have been updated.

use crate::{config::RivalConfig, rng::SubsystemRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rival {
    pub id: String,
    pub name: String,
    pub home_base: String,
    pub reputation: f64,
    pub variance_factor: f64,
    pub base_daily_income: f64,
}

impl Rival {
    pub fn effective_daily_income(&self) -> f64 {
        self.base_daily_income * (1.0 + self.variance_factor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RivalRoster {
    pub rivals: Vec<Rival>,
    pub initialized: bool,
}

impl RivalRoster {
    pub fn len(&self) -> usize {
        self.rivals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rivals.is_empty()
    }

    pub fn based_at(&self, code: &str) -> usize {
        self.rivals.iter().filter(|r| r.home_base == code).count()
    }
}

/// The player's figures as they enter the ranking.
#[derive(Debug, Clone)]
pub struct PlayerStanding {
    pub name: String,
    pub daily_income: f64,
    pub reputation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingEntry {
    /// 1-based.
    pub position: usize,
    pub name: String,
    pub daily_income: f64,
    pub reputation: f64,
    pub is_player: bool,
}

pub struct RivalSimulator {
    config: RivalConfig,
}

impl RivalSimulator {
    pub fn new(config: RivalConfig) -> Self {
        Self { config }
    }

    /// Build the roster once per game, leaving out rivals based at the
    /// player's home. A second call is a no-op.
    pub fn initialize(&self, roster: &mut RivalRoster, player_home_base: &str, rng: &mut SubsystemRng) {
        if roster.initialized {
            log::debug!("rival roster already initialized; skipping");
            return;
        }
        roster.rivals = self
            .config
            .roster
            .iter()
            .filter(|p| p.home_base != player_home_base)
            .map(|p| Rival {
                id: p.id.clone(),
                name: p.name.clone(),
                home_base: p.home_base.clone(),
                reputation: p.reputation.clamp(self.config.reputation_min, self.config.reputation_max),
                variance_factor: rng.jitter(self.config.initial_variance),
                base_daily_income: p.base_daily_income,
            })
            .collect();
        roster.initialized = true;
        log::info!(
            "rival roster initialized: {} rivals (home base {player_home_base} excluded)",
            roster.rivals.len()
        );
    }

    pub fn daily_drift(&self, roster: &mut RivalRoster, rng: &mut SubsystemRng) {
        let limit = self.config.variance_limit;
        for rival in &mut roster.rivals {
            let variance = rival.variance_factor + rng.jitter(0.5) * self.config.variance_step;
            rival.variance_factor = variance.clamp(-limit, limit);
            let reputation = rival.reputation + rng.jitter(self.config.reputation_step);
            rival.reputation = reputation.clamp(self.config.reputation_min, self.config.reputation_max);
        }
    }

    /// Player first, then rivals in roster order; stable sort by descending
    /// effective daily income, so ties keep insertion order.
    pub fn ranking(&self, roster: &RivalRoster, player: &PlayerStanding) -> Vec<RankingEntry> {
        let mut entries: Vec<RankingEntry> = std::iter::once(RankingEntry {
            position: 0,
            name: player.name.clone(),
            daily_income: player.daily_income,
            reputation: player.reputation,
            is_player: true,
        })
        .chain(roster.rivals.iter().map(|r| RankingEntry {
            position: 0,
            name: r.name.clone(),
            daily_income: r.effective_daily_income(),
            reputation: r.reputation,
            is_player: false,
        }))
        .collect();

        entries.sort_by(|a, b| b.daily_income.total_cmp(&a.daily_income));
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.position = i + 1;
        }
        entries
    }

    pub fn player_position(&self, roster: &RivalRoster, player: &PlayerStanding) -> usize {
        self.ranking(roster, player)
            .iter()
            .find(|e| e.is_player)
            .map(|e| e.position)
            .unwrap_or(1)
    }

    /// Demand penalty for a route touching rival home bases:
    /// `penalty ^ count`, floored.
    pub fn competition_factor(&self, roster: &RivalRoster, origin: &str, destination: &str) -> f64 {
        competition_factor(&self.config, roster, origin, destination)
    }
}

pub fn competition_factor(config: &RivalConfig, roster: &RivalRoster, origin: &str, destination: &str) -> f64 {
    let count = roster
        .rivals
        .iter()
        .filter(|r| r.home_base == origin || r.home_base == destination)
        .count();
    config
        .competition_penalty
        .powi(count as i32)
        .max(config.competition_floor)
}
