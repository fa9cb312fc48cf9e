//! The daily cascade — everything that happens once per simulated day.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. World events      — roll for a new event, append, prune expired
//!   2. Fuel market       — economy collaborator moves the fuel price
//!   3. Settlement        — economy collaborator settles the completed day
//!   4. Contract offers   — every `contract_interval_days`-th day
//!   5. Competitors       — competitor fares, then rival drift
//!   6. Aircraft          — wear and maintenance for every owned aircraft
//!   7. Missions          — progress reads step 3's settlement
//!
//! RULES:
//!   - Crossings are processed strictly one at a time.
//!   - Every step finishes its fallible work before its first mutation.
//!   - A failing step ends that day's cascade; the day is reported as
//!     partially applied and the next crossing is still attempted.
//!   - Each step draws from its own RNG stream for the day.

use crate::{
    aircraft_subsystem::AircraftLifecycle,
    clock::DayCrossing,
    collaborators::{Collaborators, EconomyView, Route},
    context::SimulationContext,
    error::SimResult,
    event::SimEvent,
    mission_subsystem::{MissionEngine, MissionInputs},
    rival_subsystem::RivalSimulator,
    rng::{RngBank, SubsystemRng, SubsystemSlot},
    types::{DayNumber, SimTime},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStep {
    WorldEvents,
    FuelMarket,
    Settlement,
    ContractOffers,
    Competitors,
    Aircraft,
    Missions,
}

pub const CASCADE_ORDER: [CascadeStep; 7] = [
    CascadeStep::WorldEvents,
    CascadeStep::FuelMarket,
    CascadeStep::Settlement,
    CascadeStep::ContractOffers,
    CascadeStep::Competitors,
    CascadeStep::Aircraft,
    CascadeStep::Missions,
];

impl CascadeStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WorldEvents => "world_events",
            Self::FuelMarket => "fuel_market",
            Self::Settlement => "settlement",
            Self::ContractOffers => "contract_offers",
            Self::Competitors => "competitors",
            Self::Aircraft => "aircraft",
            Self::Missions => "missions",
        }
    }

    pub fn slot(&self) -> SubsystemSlot {
        match self {
            Self::WorldEvents => SubsystemSlot::WorldEvents,
            Self::FuelMarket => SubsystemSlot::FuelMarket,
            Self::Settlement => SubsystemSlot::Economy,
            Self::ContractOffers => SubsystemSlot::Contracts,
            Self::Competitors => SubsystemSlot::Competitors,
            Self::Aircraft => SubsystemSlot::Aircraft,
            Self::Missions => SubsystemSlot::Missions,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DayStatus {
    Completed,
    PartiallyApplied { failed_step: CascadeStep, reason: String },
}

/// What one day crossing did.
#[derive(Debug, Clone)]
pub struct DayReport {
    pub day: DayNumber,
    pub date: NaiveDate,
    pub status: DayStatus,
    pub steps_completed: Vec<CascadeStep>,
    pub events: Vec<SimEvent>,
}

impl DayReport {
    pub fn is_complete(&self) -> bool {
        self.status == DayStatus::Completed
    }
}

pub struct DailyCascade {
    pub aircraft: AircraftLifecycle,
    pub missions: MissionEngine,
    pub rivals: RivalSimulator,
    contract_interval_days: u64,
}

impl DailyCascade {
    pub fn new(
        aircraft: AircraftLifecycle,
        missions: MissionEngine,
        rivals: RivalSimulator,
        contract_interval_days: u64,
    ) -> Self {
        Self {
            aircraft,
            missions,
            rivals,
            contract_interval_days: contract_interval_days.max(1),
        }
    }

    /// Run every step for one crossing, in order.
    pub fn run_day(
        &self,
        ctx: &mut SimulationContext,
        collaborators: &mut Collaborators,
        rng_bank: &RngBank,
        crossing: &DayCrossing,
    ) -> DayReport {
        ctx.day_number += 1;
        let day = ctx.day_number;
        let now = crossing.at;

        let mut report = DayReport {
            day,
            date: crossing.date,
            status: DayStatus::Completed,
            steps_completed: Vec::with_capacity(CASCADE_ORDER.len()),
            events: vec![SimEvent::DayStarted { day, date: crossing.date }],
        };

        for step in CASCADE_ORDER {
            let mut rng = rng_bank.for_subsystem_at_day(step.slot(), day);
            match self.run_step(step, day, now, ctx, collaborators, &mut rng) {
                Ok(events) => {
                    log::debug!("day={day} {}: {} event(s)", step.name(), events.len());
                    report.events.extend(events);
                    report.steps_completed.push(step);
                }
                Err(e) => {
                    let reason = e.to_string();
                    log::error!("day={day} cascade step {} failed: {reason}", step.name());
                    report.events.push(SimEvent::CascadeStepFailed {
                        day,
                        step: step.name().to_string(),
                        reason: reason.clone(),
                    });
                    report.status = DayStatus::PartiallyApplied { failed_step: step, reason };
                    break;
                }
            }
        }

        report.events.push(SimEvent::DayCompleted { day, partial: !report.is_complete() });
        report
    }

    fn run_step(
        &self,
        step: CascadeStep,
        day: DayNumber,
        now: SimTime,
        ctx: &mut SimulationContext,
        collaborators: &mut Collaborators,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        match step {
            CascadeStep::WorldEvents => self.world_events(day, now, ctx, collaborators, rng),
            CascadeStep::FuelMarket => {
                let price = collaborators.economy.update_daily_fuel(ctx.fuel_price, rng)?;
                ctx.fuel_price = price;
                Ok(vec![SimEvent::FuelPriceUpdated { day, price }])
            }
            CascadeStep::Settlement => self.settlement(day, now, ctx, collaborators),
            CascadeStep::ContractOffers => self.contract_offers(day, now, ctx, collaborators, rng),
            CascadeStep::Competitors => {
                collaborators.routes.update_competitor_prices(rng)?;
                self.rivals.daily_drift(&mut ctx.rivals, rng);
                let leader = self
                    .rivals
                    .ranking(&ctx.rivals, &ctx.player_standing())
                    .first()
                    .map(|e| e.name.clone());
                Ok(vec![SimEvent::CompetitorsUpdated { day, rivals: ctx.rivals.len(), leader }])
            }
            CascadeStep::Aircraft => Ok(self.aircraft.tick_fleet(day, &mut ctx.fleet, rng)),
            CascadeStep::Missions => {
                let routes = collaborators.routes.routes()?;
                let player_position = self.rivals.player_position(&ctx.rivals, &ctx.player_standing());
                let inputs = MissionInputs {
                    day,
                    now,
                    fleet: &ctx.fleet,
                    routes: &routes,
                    last_settlement: ctx.last_settlement.as_ref(),
                    active_events: &ctx.active_events,
                    player_position,
                };
                Ok(self.missions.update(&mut ctx.missions, &mut ctx.company, &inputs))
            }
        }
    }

    fn world_events(
        &self,
        day: DayNumber,
        now: SimTime,
        ctx: &mut SimulationContext,
        collaborators: &mut Collaborators,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let triggered = collaborators
            .events
            .check_event_occurrence(now, &ctx.active_events, rng)?;

        let mut out = Vec::new();
        if let Some(event) = triggered {
            log::info!("day={day} world event: {} until {}", event.label, event.expires_at);
            out.push(SimEvent::WorldEventStarted {
                day,
                event_id: event.id.clone(),
                kind: event.kind.clone(),
                adverse: event.adverse,
                expires_at: event.expires_at,
            });
            ctx.active_events.push(event);
        }

        let (running, expired): (Vec<_>, Vec<_>) =
            ctx.active_events.drain(..).partition(|e| e.is_active(now));
        for event in expired {
            out.push(SimEvent::WorldEventExpired { day, event_id: event.id, kind: event.kind });
        }
        ctx.active_events = running;
        Ok(out)
    }

    fn settlement(
        &self,
        day: DayNumber,
        now: SimTime,
        ctx: &mut SimulationContext,
        collaborators: &mut Collaborators,
    ) -> SimResult<Vec<SimEvent>> {
        let routes = collaborators.routes.routes()?;
        let settlement = {
            let view = economy_view(ctx, &routes, day, now);
            collaborators.economy.process_daily(&view)?
        };

        let mut out = Vec::new();
        if let Some(expired) = ctx.company.expire_cost_reduction(now) {
            out.push(SimEvent::CostReductionExpired { day, multiplier: expired.multiplier });
        }
        ctx.company.credit(settlement.net);
        ctx.company.record_net(settlement.net);
        out.push(SimEvent::DailySettled {
            day,
            gross: settlement.gross,
            costs: settlement.costs,
            net: settlement.net,
            cash_after: ctx.company.cash,
        });
        ctx.last_settlement = Some(settlement);
        Ok(out)
    }

    fn contract_offers(
        &self,
        day: DayNumber,
        now: SimTime,
        ctx: &mut SimulationContext,
        collaborators: &mut Collaborators,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        if day % self.contract_interval_days != 0 {
            return Ok(Vec::new());
        }
        let routes = collaborators.routes.routes()?;
        let offers = {
            let view = economy_view(ctx, &routes, day, now);
            collaborators.economy.generate_contract_offers(&view, rng)?
        };
        ctx.contract_offers.retain(|o| o.expires_at > now);
        let count = offers.len();
        ctx.contract_offers.extend(offers);
        Ok(vec![SimEvent::ContractOffersGenerated { day, count }])
    }
}

pub fn economy_view<'a>(
    ctx: &'a SimulationContext,
    routes: &'a [Route],
    day: DayNumber,
    now: SimTime,
) -> EconomyView<'a> {
    EconomyView {
        day,
        now,
        company: &ctx.company,
        fleet: &ctx.fleet,
        routes,
        rivals: &ctx.rivals,
        active_events: &ctx.active_events,
        fuel_price: ctx.fuel_price,
        cost_multiplier: ctx.cost_multiplier(now),
        demand_multiplier: ctx.event_demand_multiplier(now),
    }
}
