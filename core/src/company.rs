//! The player company: treasury, reputation and temporary cost relief.

use crate::{
    config::CompanyConfig,
    error::{SimError, SimResult},
    types::SimTime,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const REPUTATION_MIN: f64 = 0.0;
pub const REPUTATION_MAX: f64 = 100.0;

/// A multiplicative discount on operating costs, valid until `expires_at`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CostReduction {
    pub multiplier: f64,
    pub expires_at: SimTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub name: String,
    pub home_base: String,
    pub cash: f64,
    pub reputation: f64,
    pub cost_reduction: Option<CostReduction>,
    /// Most recent daily net results, oldest first.
    pub net_history: VecDeque<f64>,
    pub history_window: usize,
}

impl Company {
    pub fn new(config: &CompanyConfig) -> Self {
        Self {
            name: config.name.clone(),
            home_base: config.home_base.clone(),
            cash: config.starting_cash,
            reputation: config.starting_reputation.clamp(REPUTATION_MIN, REPUTATION_MAX),
            cost_reduction: None,
            net_history: VecDeque::new(),
            history_window: config.ranking_income_window.max(1),
        }
    }

    /// Fails with InsufficientFunds when `amount` exceeds the balance.
    pub fn ensure_funds(&self, amount: f64) -> SimResult<()> {
        if amount > self.cash {
            return Err(SimError::InsufficientFunds { required: amount, available: self.cash });
        }
        Ok(())
    }

    pub fn debit(&mut self, amount: f64) -> SimResult<()> {
        self.ensure_funds(amount)?;
        self.cash -= amount;
        Ok(())
    }

    pub fn credit(&mut self, amount: f64) {
        self.cash += amount;
    }

    pub fn adjust_reputation(&mut self, delta: f64) {
        self.reputation = (self.reputation + delta).clamp(REPUTATION_MIN, REPUTATION_MAX);
    }

    /// The active cost multiplier at `now` (1.0 when no relief is active).
    pub fn cost_multiplier(&self, now: SimTime) -> f64 {
        match self.cost_reduction {
            Some(cr) if cr.expires_at > now => cr.multiplier,
            _ => 1.0,
        }
    }

    /// Drops an expired reduction. Returns it so the caller can report it.
    pub fn expire_cost_reduction(&mut self, now: SimTime) -> Option<CostReduction> {
        match self.cost_reduction {
            Some(cr) if cr.expires_at <= now => self.cost_reduction.take(),
            _ => None,
        }
    }

    pub fn record_net(&mut self, net: f64) {
        self.net_history.push_back(net);
        while self.net_history.len() > self.history_window {
            self.net_history.pop_front();
        }
    }

    /// Mean daily net over the retained window; 0.0 before the first settlement.
    pub fn average_daily_income(&self) -> f64 {
        if self.net_history.is_empty() {
            return 0.0;
        }
        self.net_history.iter().sum::<f64>() / self.net_history.len() as f64
    }
}
