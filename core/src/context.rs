//! SimulationContext — the single owner of all mutable core state.
//!
//! RULE: There is no ambient or global game state. Every component
//! receives the pieces of the context it needs by reference.

use crate::{
    clock::GameClock,
    collaborators::{ContractOffer, DailySettlement, WorldEvent},
    company::Company,
    config::SimConfig,
    fleet::Fleet,
    mission::MissionBook,
    rival_subsystem::{PlayerStanding, RivalRoster},
    types::{DayNumber, SimTime},
};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationContext {
    pub clock: GameClock,
    /// Day crossings processed since the run started.
    pub day_number: DayNumber,
    pub company: Company,
    pub fleet: Fleet,
    pub missions: MissionBook,
    pub rivals: RivalRoster,
    pub active_events: Vec<WorldEvent>,
    pub last_settlement: Option<DailySettlement>,
    pub fuel_price: f64,
    pub contract_offers: Vec<ContractOffer>,
}

impl SimulationContext {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            clock: GameClock::new(&config.clock),
            day_number: 0,
            company: Company::new(&config.company),
            fleet: Fleet::new(),
            missions: MissionBook::default(),
            rivals: RivalRoster::default(),
            active_events: Vec::new(),
            last_settlement: None,
            fuel_price: config.economy.initial_fuel_price,
            contract_offers: Vec::new(),
        }
    }

    pub fn player_standing(&self) -> PlayerStanding {
        PlayerStanding {
            name: self.company.name.clone(),
            daily_income: self.company.average_daily_income(),
            reputation: self.company.reputation,
        }
    }

    /// Product of demand effects of all world events running at `now`.
    pub fn event_demand_multiplier(&self, now: SimTime) -> f64 {
        self.active_events
            .iter()
            .filter(|e| e.is_active(now))
            .map(|e| e.demand_multiplier)
            .product()
    }

    /// Product of cost effects of all running world events and mission relief.
    pub fn cost_multiplier(&self, now: SimTime) -> f64 {
        let events: f64 = self
            .active_events
            .iter()
            .filter(|e| e.is_active(now))
            .map(|e| e.cost_multiplier)
            .product();
        events * self.company.cost_multiplier(now)
    }
}
