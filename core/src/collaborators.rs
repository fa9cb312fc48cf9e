//! Contracts for the systems the cascade drives but does not own:
//! the economy engine, the world-events model, route/airport data and
//! persistence.
//!
//! RULE: The cascade talks to collaborators only through these traits.
//! A collaborator never reaches into the SimulationContext directly; it
//! receives read-only views and returns values the cascade applies.

use crate::{
    company::Company,
    config::Airport,
    error::{SimError, SimResult},
    event::SimEvent,
    fleet::{Aircraft, Fleet},
    rival_subsystem::RivalRoster,
    rng::SubsystemRng,
    snapshot::SimSnapshot,
    types::{AircraftId, DayNumber, RouteId, SimTime},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

// ── Shared value types ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub id: RouteId,
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub fare: f64,
    pub base_demand: f64,
    pub competitor_fare: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldEvent {
    pub id: String,
    pub kind: String,
    pub label: String,
    pub adverse: bool,
    pub demand_multiplier: f64,
    pub cost_multiplier: f64,
    pub started_at: SimTime,
    pub expires_at: SimTime,
}

impl WorldEvent {
    pub fn is_active(&self, now: SimTime) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteResult {
    pub route_id: RouteId,
    pub aircraft_id: AircraftId,
    pub revenue: f64,
    pub costs: f64,
    pub net: f64,
}

/// One day's economic result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DailySettlement {
    pub gross: f64,
    pub costs: f64,
    pub net: f64,
    pub routes: Vec<RouteResult>,
}

impl DailySettlement {
    /// Summed net per route. A route flown by several aircraft yields one figure.
    pub fn route_net(&self, route_id: &RouteId) -> Option<f64> {
        let mut found = false;
        let mut total = 0.0;
        for r in self.routes.iter().filter(|r| &r.route_id == route_id) {
            found = true;
            total += r.net;
        }
        found.then_some(total)
    }

    /// The route with the most negative summed net, if any route lost money.
    pub fn worst_route(&self) -> Option<(RouteId, f64)> {
        let mut ids: Vec<&RouteId> = self.routes.iter().map(|r| &r.route_id).collect();
        ids.sort();
        ids.dedup();
        ids.into_iter()
            .filter_map(|id| self.route_net(id).map(|net| (id.clone(), net)))
            .filter(|(_, net)| *net < 0.0)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteCostBreakdown {
    pub fuel: f64,
    pub landing_fees: f64,
    pub overhead: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractOffer {
    pub id: String,
    pub origin: String,
    pub destination: String,
    pub payment: f64,
    pub expires_at: SimTime,
}

/// Read-only state handed to the economy engine.
pub struct EconomyView<'a> {
    pub day: DayNumber,
    pub now: SimTime,
    pub company: &'a Company,
    pub fleet: &'a Fleet,
    pub routes: &'a [Route],
    pub rivals: &'a RivalRoster,
    pub active_events: &'a [WorldEvent],
    pub fuel_price: f64,
    /// Product of mission cost relief and active event cost pressure.
    pub cost_multiplier: f64,
    /// Product of active event demand effects.
    pub demand_multiplier: f64,
}

// ── Collaborator traits ────────────────────────────────────────────

pub trait EconomyEngine: Send {
    /// Move the fuel market one day. Returns the new price per kg.
    fn update_daily_fuel(&mut self, current_price: f64, rng: &mut SubsystemRng) -> SimResult<f64>;

    /// Settle the completed day. Must not mutate anything outside itself.
    fn process_daily(&mut self, view: &EconomyView<'_>) -> SimResult<DailySettlement>;

    fn calculate_route_costs(&self, route: &Route, aircraft: &Aircraft, view: &EconomyView<'_>) -> RouteCostBreakdown;

    fn generate_contract_offers(
        &mut self,
        view: &EconomyView<'_>,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<ContractOffer>>;
}

pub trait EventsModel: Send {
    /// Roll for a new world event. `active` lists events still running.
    fn check_event_occurrence(
        &mut self,
        now: SimTime,
        active: &[WorldEvent],
        rng: &mut SubsystemRng,
    ) -> SimResult<Option<WorldEvent>>;

    fn active_events<'a>(&self, events: &'a [WorldEvent], now: SimTime) -> Vec<&'a WorldEvent> {
        events.iter().filter(|e| e.is_active(now)).collect()
    }
}

pub trait RouteData: Send {
    fn routes(&self) -> SimResult<Vec<Route>>;

    fn route(&self, id: &RouteId) -> SimResult<Option<Route>> {
        Ok(self.routes()?.into_iter().find(|r| &r.id == id))
    }

    fn airport(&self, code: &str) -> Option<Airport>;

    /// Drift competitor fares for the day.
    fn update_competitor_prices(&mut self, rng: &mut SubsystemRng) -> SimResult<()>;

    fn open_route(&mut self, origin: &str, destination: &str) -> SimResult<RouteId>;

    fn close_route(&mut self, id: &RouteId) -> SimResult<()>;

    /// The open routes with their current fares, as saved in a snapshot.
    fn export_routes(&self) -> Vec<Route>;

    /// Replace the open routes with a saved set.
    fn restore_routes(&mut self, routes: Vec<Route>);
}

pub trait Persistence: Send {
    /// Record the run before anything is saved for it. Returns false when the
    /// run was already registered; the stored seed is left as it was.
    fn register_run(&mut self, run_id: &str, seed: u64) -> SimResult<bool>;

    fn save(&mut self, snapshot: &SimSnapshot) -> SimResult<()>;

    /// Raw JSON of the latest snapshot for the run. Validation is the engine's job.
    fn load(&self, run_id: &str) -> SimResult<Option<String>>;

    fn append_events(&mut self, run_id: &str, day: DayNumber, events: &[SimEvent]) -> SimResult<()>;
}

/// A store shared with the host, which keeps its own handle for queries.
impl<P: Persistence> Persistence for Arc<Mutex<P>> {
    fn register_run(&mut self, run_id: &str, seed: u64) -> SimResult<bool> {
        lock(self)?.register_run(run_id, seed)
    }

    fn save(&mut self, snapshot: &SimSnapshot) -> SimResult<()> {
        lock(self)?.save(snapshot)
    }

    fn load(&self, run_id: &str) -> SimResult<Option<String>> {
        lock(self)?.load(run_id)
    }

    fn append_events(&mut self, run_id: &str, day: DayNumber, events: &[SimEvent]) -> SimResult<()> {
        lock(self)?.append_events(run_id, day, events)
    }
}

fn lock<P>(shared: &Arc<Mutex<P>>) -> SimResult<MutexGuard<'_, P>> {
    shared
        .lock()
        .map_err(|_| SimError::Other(anyhow::anyhow!("persistence lock poisoned")))
}

/// The non-persistence collaborators the cascade needs each day.
pub struct Collaborators {
    pub economy: Box<dyn EconomyEngine>,
    pub events: Box<dyn EventsModel>,
    pub routes: Box<dyn RouteData>,
}
