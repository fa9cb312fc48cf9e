//! Mission engine — activation gating, per-kind progress tracking,
//! success/failure evaluation and reward application.
//!
//! Execution: last step of every day's cascade, so the day's settlement,
//! events, fleet wear and ranking are all final when it reads them.
//!
//! Per call:
//!   1. With no Active mission, activate the first Locked mission (declaration
//!      order) whose prerequisites have all Succeeded and whose activation
//!      predicate holds.
//!   2. Update the Active mission's progress.
//!   3. Success is checked before failure. Either outcome records history and
//!      immediately tries one more activation. A mission activated here keeps
//!      its opening progress until the next call; the day's result has
//!      already been counted by the mission that just completed.
//!
//! At most one mission is Active at any time.

use crate::{
    collaborators::{DailySettlement, Route, WorldEvent},
    company::{Company, CostReduction},
    event::SimEvent,
    fleet::{AircraftStatus, Fleet},
    mission::{MissionBook, MissionId, MissionProgress, MissionRecord, MissionReward, MissionState},
    types::{DayNumber, SimTime},
};

pub const PROFIT_STREAK_TARGET: u32 = 5;
pub const FLEET_CARE_TRIGGER_CONDITION: f64 = 60.0;
pub const FLEET_CARE_TARGET_CONDITION: f64 = 75.0;
pub const FLEET_CARE_DEADLINE_DAYS: u32 = 21;
pub const ROUTE_RESCUE_STREAK_TARGET: u32 = 3;
pub const ROUTE_RESCUE_DEADLINE_DAYS: u32 = 30;
pub const CONTENDER_TARGET_POSITION: usize = 3;

/// Everything mission predicates read besides the company.
pub struct MissionInputs<'a> {
    pub day: DayNumber,
    pub now: SimTime,
    pub fleet: &'a Fleet,
    pub routes: &'a [Route],
    pub last_settlement: Option<&'a DailySettlement>,
    pub active_events: &'a [WorldEvent],
    pub player_position: usize,
}

impl MissionInputs<'_> {
    fn event_active(&self, event_id: &str) -> bool {
        self.active_events
            .iter()
            .any(|e| e.id == event_id && e.is_active(self.now))
    }
}

#[derive(Default)]
pub struct MissionEngine;

impl MissionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn reward(&self, id: MissionId) -> MissionReward {
        match id {
            MissionId::IntoTheBlack => MissionReward { reputation: 5.0, cash: 50_000.0, cost_reduction: None },
            MissionId::FleetCare => MissionReward { reputation: 3.0, cash: 0.0, cost_reduction: Some((0.95, 14)) },
            MissionId::RouteRescue => MissionReward { reputation: 4.0, cash: 25_000.0, cost_reduction: Some((0.9, 30)) },
            MissionId::WeatherTheStorm => MissionReward { reputation: 6.0, cash: 30_000.0, cost_reduction: None },
            MissionId::RegionalContender => MissionReward { reputation: 10.0, cash: 150_000.0, cost_reduction: None },
        }
    }

    pub fn update(
        &self,
        book: &mut MissionBook,
        company: &mut Company,
        inputs: &MissionInputs<'_>,
    ) -> Vec<SimEvent> {
        let mut out = Vec::new();

        if book.active_index().is_none() {
            self.try_activate(book, inputs, &mut out);
        }

        let Some(idx) = book.active_index() else {
            return out;
        };

        let mission = &mut book.missions[idx];
        self.update_progress(&mut mission.progress, inputs);

        let outcome = if self.succeeded(&mission.progress, company, inputs) {
            Some(MissionState::Succeeded)
        } else if self.failed(&mission.progress, company, inputs) {
            Some(MissionState::Failed)
        } else {
            None
        };

        if let Some(outcome) = outcome {
            self.complete(book, idx, outcome, company, inputs, &mut out);
            self.try_activate(book, inputs, &mut out);
        }

        out
    }

    fn try_activate(
        &self,
        book: &mut MissionBook,
        inputs: &MissionInputs<'_>,
        out: &mut Vec<SimEvent>,
    ) {
        if book.active_index().is_some() {
            return;
        }
        let candidate = book
            .missions
            .iter()
            .enumerate()
            .filter(|(_, m)| m.state == MissionState::Locked && book.prerequisites_met(m.id()))
            .find_map(|(i, m)| self.activation(m.id(), inputs).map(|p| (i, p)));

        if let Some((idx, progress)) = candidate {
            let mission = &mut book.missions[idx];
            mission.state = MissionState::Active;
            mission.progress = progress;
            mission.activated_at = Some(inputs.now);
            log::info!("day={} mission activated: {}", inputs.day, mission.id().title());
            out.push(SimEvent::MissionActivated { day: inputs.day, mission: mission.id() });
        }
    }

    /// The activation predicate. Returns the opening progress payload when it holds.
    fn activation(&self, id: MissionId, inputs: &MissionInputs<'_>) -> Option<MissionProgress> {
        match id {
            MissionId::IntoTheBlack => inputs
                .fleet
                .iter()
                .any(|a| a.status == AircraftStatus::Flight)
                .then(|| id.initial_progress()),
            MissionId::FleetCare => inputs
                .fleet
                .worst_condition()
                .filter(|worst| *worst < FLEET_CARE_TRIGGER_CONDITION)
                .map(|worst| MissionProgress::FleetCare { days_elapsed: 0, worst_condition: Some(worst) }),
            MissionId::RouteRescue => inputs
                .last_settlement
                .and_then(|s| s.worst_route())
                .filter(|(route_id, _)| inputs.routes.iter().any(|r| &r.id == route_id))
                .map(|(route_id, _)| MissionProgress::RouteRescue {
                    route_id: Some(route_id),
                    consecutive_profitable_days: 0,
                    days_observed: 0,
                }),
            MissionId::WeatherTheStorm => inputs
                .active_events
                .iter()
                .find(|e| e.adverse && e.is_active(inputs.now))
                .map(|e| MissionProgress::WeatherTheStorm { event_id: Some(e.id.clone()), days_survived: 0 }),
            MissionId::RegionalContender => Some(id.initial_progress()),
        }
    }

    fn update_progress(&self, progress: &mut MissionProgress, inputs: &MissionInputs<'_>) {
        match progress {
            MissionProgress::IntoTheBlack { consecutive_profitable_days } => {
                if let Some(settlement) = inputs.last_settlement {
                    if settlement.net > 0.0 {
                        *consecutive_profitable_days += 1;
                    } else {
                        *consecutive_profitable_days = 0;
                    }
                }
            }
            MissionProgress::FleetCare { days_elapsed, worst_condition } => {
                *days_elapsed += 1;
                if let Some(now_worst) = inputs.fleet.worst_condition() {
                    *worst_condition = Some(match *worst_condition {
                        Some(prev) => prev.min(now_worst),
                        None => now_worst,
                    });
                }
            }
            MissionProgress::RouteRescue { route_id, consecutive_profitable_days, days_observed } => {
                *days_observed += 1;
                let net = route_id
                    .as_ref()
                    .and_then(|id| inputs.last_settlement.and_then(|s| s.route_net(id)));
                match net {
                    Some(n) if n > 0.0 => *consecutive_profitable_days += 1,
                    _ => *consecutive_profitable_days = 0,
                }
            }
            MissionProgress::WeatherTheStorm { event_id, days_survived } => {
                if event_id.as_deref().is_some_and(|id| inputs.event_active(id)) {
                    *days_survived += 1;
                }
            }
            MissionProgress::RegionalContender { best_position } => {
                let pos = inputs.player_position;
                *best_position = Some(best_position.map_or(pos, |best| best.min(pos)));
            }
        }
    }

    fn succeeded(&self, progress: &MissionProgress, company: &Company, inputs: &MissionInputs<'_>) -> bool {
        match progress {
            MissionProgress::IntoTheBlack { consecutive_profitable_days } => {
                *consecutive_profitable_days >= PROFIT_STREAK_TARGET
            }
            MissionProgress::FleetCare { .. } => {
                !inputs.fleet.is_empty()
                    && inputs.fleet.iter().all(|a| a.condition >= FLEET_CARE_TARGET_CONDITION)
            }
            MissionProgress::RouteRescue { consecutive_profitable_days, .. } => {
                *consecutive_profitable_days >= ROUTE_RESCUE_STREAK_TARGET
            }
            MissionProgress::WeatherTheStorm { event_id, .. } => match event_id {
                Some(id) => !inputs.event_active(id) && company.cash >= 0.0,
                None => false,
            },
            MissionProgress::RegionalContender { .. } => {
                inputs.player_position <= CONTENDER_TARGET_POSITION
            }
        }
    }

    /// The failure predicate; missions without one never fail.
    fn failed(&self, progress: &MissionProgress, company: &Company, inputs: &MissionInputs<'_>) -> bool {
        match progress {
            MissionProgress::IntoTheBlack { .. } | MissionProgress::RegionalContender { .. } => false,
            MissionProgress::FleetCare { days_elapsed, .. } => *days_elapsed >= FLEET_CARE_DEADLINE_DAYS,
            MissionProgress::RouteRescue { route_id, days_observed, .. } => {
                let still_open = route_id
                    .as_ref()
                    .is_some_and(|id| inputs.routes.iter().any(|r| &r.id == id));
                !still_open || *days_observed >= ROUTE_RESCUE_DEADLINE_DAYS
            }
            MissionProgress::WeatherTheStorm { event_id, .. } => match event_id {
                Some(id) => inputs.event_active(id) && company.cash < 0.0,
                None => true,
            },
        }
    }

    fn complete(
        &self,
        book: &mut MissionBook,
        idx: usize,
        outcome: MissionState,
        company: &mut Company,
        inputs: &MissionInputs<'_>,
        out: &mut Vec<SimEvent>,
    ) {
        let mission = &mut book.missions[idx];
        let id = mission.id();
        mission.state = outcome;
        mission.completed_at = Some(inputs.now);

        let reward = (outcome == MissionState::Succeeded).then(|| self.reward(id));
        if let Some(reward) = reward {
            company.adjust_reputation(reward.reputation);
            company.credit(reward.cash);
            if let Some((multiplier, days)) = reward.cost_reduction {
                company.cost_reduction = Some(CostReduction {
                    multiplier,
                    expires_at: inputs.now.plus_days(days as i64),
                });
            }
            log::info!(
                "day={} mission succeeded: {} (+{:.0} rep, +{:.0} cash)",
                inputs.day, id.title(), reward.reputation, reward.cash
            );
            out.push(SimEvent::MissionSucceeded {
                day: inputs.day,
                mission: id,
                reputation_delta: reward.reputation,
                cash_delta: reward.cash,
            });
        } else {
            log::info!("day={} mission failed: {}", inputs.day, id.title());
            out.push(SimEvent::MissionFailed { day: inputs.day, mission: id });
        }

        book.history.push(MissionRecord {
            mission: id,
            outcome,
            activated_at: mission.activated_at,
            completed_at: inputs.now,
            reward,
        });
    }
}
