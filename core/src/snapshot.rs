//! Snapshot serialization — full simulation state to/from JSON.
//!
//! A snapshot is saved after every accepted command and after every
//! `advance` that moved the clock. It captures the complete state needed to
//! resume the run from that point without replaying from day 0, including
//! the open routes and their fares held by the route collaborator.
//!
//! RULE: Loading goes through a lenient raw form (every field optional)
//! and ONE validation pass. Whatever is missing or contradictory is reset
//! to a safe initial value and recorded as a DataRepair; code downstream
//! of `from_json` may assume well-formed state.
//!
//! Malformed JSON (wrong types, broken syntax) is still a hard error.

use crate::{
    clock::{GameClock, SimSpeed},
    collaborators::{ContractOffer, DailySettlement, Route, WorldEvent},
    company::{Company, CostReduction, REPUTATION_MAX, REPUTATION_MIN},
    config::SimConfig,
    context::SimulationContext,
    error::{SimError, SimResult},
    fleet::{Aircraft, AircraftStatus, Fleet, MaintenanceKind, MaintenanceOrder, CONDITION_MAX, CONDITION_MIN},
    mission::{Mission, MissionBook, MissionId, MissionProgress, MissionRecord, MissionState},
    network::configured_routes,
    rival_subsystem::{Rival, RivalRoster},
    types::{AircraftId, DayNumber, RouteId, RunId, SimTime},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimSnapshot {
    pub version: u32,
    pub run_id: RunId,
    pub seed: u64,
    pub day_number: DayNumber,
    pub clock: GameClock,
    pub company: Company,
    pub fleet: Fleet,
    pub missions: MissionBook,
    pub rivals: RivalRoster,
    pub active_events: Vec<WorldEvent>,
    pub last_settlement: Option<DailySettlement>,
    pub fuel_price: f64,
    pub contract_offers: Vec<ContractOffer>,
    pub routes: Vec<Route>,
}

/// One field that was missing or contradictory and has been reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRepair {
    pub field: String,
    pub detail: String,
}

impl DataRepair {
    pub fn to_error(&self) -> SimError {
        SimError::DataInconsistency(format!("{}: {}", self.field, self.detail))
    }
}

#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub snapshot: SimSnapshot,
    pub repairs: Vec<DataRepair>,
}

impl SimSnapshot {
    pub fn capture(run_id: &str, seed: u64, ctx: &SimulationContext, routes: Vec<Route>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            run_id: run_id.to_string(),
            seed,
            day_number: ctx.day_number,
            clock: ctx.clock.clone(),
            company: ctx.company.clone(),
            fleet: ctx.fleet.clone(),
            missions: ctx.missions.clone(),
            rivals: ctx.rivals.clone(),
            active_events: ctx.active_events.clone(),
            last_settlement: ctx.last_settlement.clone(),
            fuel_price: ctx.fuel_price,
            contract_offers: ctx.contract_offers.clone(),
            routes,
        }
    }

    pub fn into_context(self) -> SimulationContext {
        SimulationContext {
            clock: self.clock,
            day_number: self.day_number,
            company: self.company,
            fleet: self.fleet,
            missions: self.missions,
            rivals: self.rivals,
            active_events: self.active_events,
            last_settlement: self.last_settlement,
            fuel_price: self.fuel_price,
            contract_offers: self.contract_offers,
        }
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse, validate and default a stored snapshot.
    pub fn from_json(json: &str, config: &SimConfig) -> SimResult<LoadedSnapshot> {
        let raw: RawSnapshot = serde_json::from_str(json)?;
        let mut repairs = Repairs::default();
        let snapshot = raw.validate(config, &mut repairs)?;
        Ok(LoadedSnapshot { snapshot, repairs: repairs.0 })
    }
}

#[derive(Default)]
struct Repairs(Vec<DataRepair>);

impl Repairs {
    fn note(&mut self, field: impl Into<String>, detail: impl Into<String>) {
        let repair = DataRepair { field: field.into(), detail: detail.into() };
        log::warn!("snapshot repair: {}", repair.to_error());
        self.0.push(repair);
    }

    fn or_else<T>(&mut self, value: Option<T>, field: &str, default: impl FnOnce() -> T) -> T {
        match value {
            Some(v) => v,
            None => {
                self.note(field, "missing; reset to default");
                default()
            }
        }
    }
}

// ── Raw (lenient) forms ────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawSnapshot {
    version: Option<u32>,
    run_id: Option<String>,
    seed: Option<u64>,
    day_number: Option<DayNumber>,
    clock: Option<RawClock>,
    company: Option<RawCompany>,
    fleet: Option<RawFleet>,
    missions: Option<RawMissionBook>,
    rivals: Option<RawRivalRoster>,
    active_events: Option<Vec<WorldEvent>>,
    last_settlement: Option<DailySettlement>,
    fuel_price: Option<f64>,
    contract_offers: Option<Vec<ContractOffer>>,
    routes: Option<Vec<Route>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawClock {
    speed: Option<SimSpeed>,
    accumulator_ms: Option<f64>,
    paused: Option<bool>,
    now: Option<SimTime>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawCompany {
    name: Option<String>,
    home_base: Option<String>,
    cash: Option<f64>,
    reputation: Option<f64>,
    cost_reduction: Option<CostReduction>,
    net_history: Option<VecDeque<f64>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawFleet {
    next_id: Option<u32>,
    aircraft: Option<Vec<RawAircraft>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawAircraft {
    id: Option<AircraftId>,
    model_id: Option<String>,
    catalog_price: Option<f64>,
    seats: Option<u32>,
    fuel_burn_per_km: Option<f64>,
    daily_overhead: Option<f64>,
    status: Option<AircraftStatus>,
    condition: Option<f64>,
    maintenance: Option<RawMaintenanceOrder>,
    days_since_last_maintenance: Option<u32>,
    route_id: Option<RouteId>,
    purchased_at: Option<SimTime>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawMaintenanceOrder {
    kind: Option<MaintenanceKind>,
    days_left: Option<u32>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawMissionBook {
    missions: Option<Vec<RawMission>>,
    history: Option<Vec<MissionRecord>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawMission {
    state: Option<MissionState>,
    progress: Option<MissionProgress>,
    activated_at: Option<SimTime>,
    completed_at: Option<SimTime>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawRivalRoster {
    rivals: Option<Vec<Rival>>,
    initialized: Option<bool>,
}

// ── Validation ─────────────────────────────────────────────────────

impl RawSnapshot {
    fn validate(self, config: &SimConfig, r: &mut Repairs) -> SimResult<SimSnapshot> {
        let version = r.or_else(self.version, "version", || SNAPSHOT_VERSION);
        if version > SNAPSHOT_VERSION {
            return Err(SimError::DataInconsistency(format!(
                "snapshot version {version} is newer than supported version {SNAPSHOT_VERSION}"
            )));
        }

        let clock = validate_clock(self.clock, config, r);
        let start = SimTime::from_date(config.clock.start_date);
        let day_number = r.or_else(self.day_number, "day_number", || {
            (clock.now.day_index() - start.day_index()).max(0) as DayNumber
        });

        let economy = &config.economy;
        let fuel_price = match self.fuel_price {
            Some(p) if p.is_finite() => p.clamp(economy.fuel_price_min, economy.fuel_price_max),
            Some(p) => {
                r.note("fuel_price", format!("non-finite value {p}; reset to initial price"));
                economy.initial_fuel_price
            }
            None => r.or_else(None, "fuel_price", || economy.initial_fuel_price),
        };

        let routes = validate_routes(self.routes, config, r);
        let open: BTreeSet<RouteId> = routes.iter().map(|route| route.id.clone()).collect();

        Ok(SimSnapshot {
            version: SNAPSHOT_VERSION,
            run_id: r.or_else(self.run_id, "run_id", || "recovered".to_string()),
            seed: r.or_else(self.seed, "seed", || 0),
            day_number,
            company: validate_company(self.company, config, r),
            fleet: validate_fleet(self.fleet, config, &open, clock.now, r),
            missions: validate_missions(self.missions, clock.now, r),
            rivals: validate_rivals(self.rivals, config, r),
            active_events: r.or_else(self.active_events, "active_events", Vec::new),
            last_settlement: self.last_settlement,
            fuel_price,
            contract_offers: r.or_else(self.contract_offers, "contract_offers", Vec::new),
            routes,
            clock,
        })
    }
}

fn validate_clock(raw: Option<RawClock>, config: &SimConfig, r: &mut Repairs) -> GameClock {
    let mut clock = GameClock::new(&config.clock);
    let Some(raw) = raw else {
        r.note("clock", "missing; restarted at the configured start date");
        return clock;
    };

    clock.speed = r.or_else(raw.speed, "clock.speed", || config.clock.speed);
    clock.minute_length_ms = clock.speed.minute_length_ms();
    clock.paused = r.or_else(raw.paused, "clock.paused", || config.clock.start_paused);
    clock.now = r.or_else(raw.now, "clock.now", || clock.now);

    // A full minute or more is legal right after a speed change; the next
    // advance consumes it.
    let acc = r.or_else(raw.accumulator_ms, "clock.accumulator_ms", || 0.0);
    clock.accumulator_ms = if acc.is_finite() && acc >= 0.0 {
        acc
    } else {
        r.note("clock.accumulator_ms", format!("invalid value {acc}; reset to 0"));
        0.0
    };
    clock
}

fn validate_company(raw: Option<RawCompany>, config: &SimConfig, r: &mut Repairs) -> Company {
    let mut company = Company::new(&config.company);
    let Some(raw) = raw else {
        r.note("company", "missing; reset to starting company");
        return company;
    };

    company.name = r.or_else(raw.name, "company.name", || company.name.clone());
    company.home_base = r.or_else(raw.home_base, "company.home_base", || company.home_base.clone());
    company.cash = match raw.cash {
        Some(c) if c.is_finite() => c,
        Some(c) => {
            r.note("company.cash", format!("non-finite value {c}; reset to starting cash"));
            config.company.starting_cash
        }
        None => r.or_else(None, "company.cash", || config.company.starting_cash),
    };
    let reputation = r.or_else(raw.reputation, "company.reputation", || config.company.starting_reputation);
    company.reputation = if reputation.is_finite() {
        reputation.clamp(REPUTATION_MIN, REPUTATION_MAX)
    } else {
        r.note("company.reputation", "non-finite; reset to starting reputation");
        config.company.starting_reputation
    };
    company.cost_reduction = raw.cost_reduction;
    let mut history = raw.net_history.unwrap_or_default();
    history.retain(|n| n.is_finite());
    while history.len() > company.history_window {
        history.pop_front();
    }
    company.net_history = history;
    company
}

fn validate_routes(raw: Option<Vec<Route>>, config: &SimConfig, r: &mut Repairs) -> Vec<Route> {
    let Some(raw) = raw else {
        r.note("routes", "missing; configured network reopened");
        return configured_routes(&config.network);
    };

    let mut seen = BTreeSet::new();
    let mut routes = Vec::with_capacity(raw.len());
    for mut route in raw {
        let field = format!("routes.{}", route.id);
        if !seen.insert(route.id.clone()) {
            r.note(field, "duplicate entry; dropped");
            continue;
        }
        if !(route.fare.is_finite() && route.fare > 0.0) || !route.distance_km.is_finite() {
            r.note(field, "invalid fare or distance; dropped");
            continue;
        }
        if !route.competitor_fare.is_finite() {
            r.note(format!("{field}.competitor_fare"), "non-finite; reset to our fare");
            route.competitor_fare = route.fare;
        }
        routes.push(route);
    }
    routes
}

fn validate_fleet(
    raw: Option<RawFleet>,
    config: &SimConfig,
    open: &BTreeSet<RouteId>,
    now: SimTime,
    r: &mut Repairs,
) -> Fleet {
    let mut fleet = Fleet::new();
    let raw = r.or_else(raw, "fleet", RawFleet::default);

    let mut unidentified = Vec::new();
    for (i, ra) in raw.aircraft.unwrap_or_default().into_iter().enumerate() {
        match ra.id {
            Some(id) if fleet.contains(id) => {
                r.note(format!("fleet.aircraft[{i}]"), format!("duplicate id {id}; dropped"));
            }
            Some(id) => {
                if let Some(a) = validate_aircraft(id, ra, config, open, now, r) {
                    fleet.insert(a);
                }
            }
            None => unidentified.push((i, ra)),
        }
    }
    fleet.reserve_ids(raw.next_id.unwrap_or(0));

    // Aircraft without an id get fresh ones after every known id.
    for (i, ra) in unidentified {
        let id = AircraftId(fleet.next_id());
        r.note(format!("fleet.aircraft[{i}].id"), format!("missing; assigned {id}"));
        if let Some(a) = validate_aircraft(id, ra, config, open, now, r) {
            fleet.insert(a);
        }
    }
    fleet
}

fn validate_aircraft(
    id: AircraftId,
    raw: RawAircraft,
    config: &SimConfig,
    open: &BTreeSet<RouteId>,
    now: SimTime,
    r: &mut Repairs,
) -> Option<Aircraft> {
    let field = |name: &str| format!("aircraft {id}.{name}");
    let model = raw.model_id.as_deref().and_then(|m| config.model(m));

    let specs = (raw.catalog_price, raw.seats, raw.fuel_burn_per_km, raw.daily_overhead);
    let (catalog_price, seats, fuel_burn_per_km, daily_overhead) = match (specs, model) {
        ((Some(p), Some(s), Some(f), Some(o)), _) => (p, s, f, o),
        ((p, s, f, o), Some(m)) => {
            r.note(field("model"), format!("specifications restored from catalog model {}", m.model_id));
            (
                p.unwrap_or(m.price),
                s.unwrap_or(m.seats),
                f.unwrap_or(m.fuel_burn_per_km),
                o.unwrap_or(m.daily_overhead),
            )
        }
        (_, None) => {
            r.note(field("model"), "unknown model and incomplete specifications; aircraft dropped");
            return None;
        }
    };

    let mut status = r.or_else(raw.status, &field("status"), || AircraftStatus::Idle);

    let condition = match raw.condition {
        Some(c) if (CONDITION_MIN..=CONDITION_MAX).contains(&c) => c,
        Some(c) if c.is_finite() => {
            r.note(field("condition"), format!("{c} out of range; clamped"));
            c
        }
        Some(_) => {
            r.note(field("condition"), "non-finite; reset to 100");
            CONDITION_MAX
        }
        None => r.or_else(None, &field("condition"), || CONDITION_MAX),
    };

    let order = raw.maintenance.and_then(|o| match (o.kind, o.days_left) {
        (Some(MaintenanceKind::None), _) | (None, _) => None,
        (Some(kind), days_left) => Some(MaintenanceOrder { kind, days_left: days_left.unwrap_or(1) }),
    });
    let maintenance = match (status, order) {
        (AircraftStatus::Maintenance, Some(order)) => Some(order),
        (AircraftStatus::Maintenance, None) => {
            r.note(field("maintenance"), "in maintenance without a valid order; set Idle");
            status = AircraftStatus::Idle;
            None
        }
        (_, Some(_)) => {
            r.note(field("maintenance"), format!("order present while {status:?}; dropped"));
            None
        }
        (_, None) => None,
    };

    let route_id = match (status, raw.route_id) {
        (AircraftStatus::Flight, Some(route)) if open.contains(&route) => Some(route),
        (AircraftStatus::Flight, Some(route)) => {
            r.note(field("route_id"), format!("route {route} is not open; set Idle"));
            status = AircraftStatus::Idle;
            None
        }
        (AircraftStatus::Flight, None) => {
            r.note(field("route_id"), "in flight without a route; set Idle");
            status = AircraftStatus::Idle;
            None
        }
        (_, Some(_)) => {
            r.note(field("route_id"), format!("route present while {status:?}; cleared"));
            None
        }
        (_, None) => None,
    };

    let mut aircraft = Aircraft {
        id,
        model_id: raw.model_id.unwrap_or_else(|| model.map(|m| m.model_id.clone()).unwrap_or_default()),
        catalog_price,
        seats,
        fuel_burn_per_km,
        daily_overhead,
        status,
        condition: CONDITION_MAX,
        maintenance,
        days_since_last_maintenance: r.or_else(
            raw.days_since_last_maintenance,
            &field("days_since_last_maintenance"),
            || 0,
        ),
        route_id,
        purchased_at: raw.purchased_at.unwrap_or(now),
    };
    aircraft.set_condition(condition);
    Some(aircraft)
}

fn validate_missions(raw: Option<RawMissionBook>, now: SimTime, r: &mut Repairs) -> MissionBook {
    let raw = r.or_else(raw, "missions", RawMissionBook::default);

    let mut seen = BTreeSet::new();
    let mut missions: Vec<Mission> = Vec::with_capacity(MissionId::ALL.len());
    for (i, rm) in raw.missions.unwrap_or_default().into_iter().enumerate() {
        let Some(progress) = rm.progress else {
            r.note(format!("missions[{i}]"), "no progress payload to identify it; dropped");
            continue;
        };
        let id = progress.mission_id();
        if !seen.insert(id) {
            r.note(format!("missions.{}", id.title()), "duplicate entry; dropped");
            continue;
        }
        missions.push(Mission {
            state: r.or_else(rm.state, &format!("missions.{}.state", id.title()), || MissionState::Locked),
            progress,
            activated_at: rm.activated_at,
            completed_at: rm.completed_at,
        });
    }
    for id in MissionId::ALL {
        if !seen.contains(&id) {
            r.note(format!("missions.{}", id.title()), "missing; added as Locked");
            missions.push(Mission::locked(id));
        }
    }
    missions.sort_by_key(|m| m.id());

    let mut book = MissionBook {
        missions,
        history: raw.history.unwrap_or_default(),
    };

    // At most one Active, and only with its prerequisites met.
    let mut active_seen = false;
    for i in 0..book.missions.len() {
        if book.missions[i].state != MissionState::Active {
            continue;
        }
        let id = book.missions[i].id();
        let reason = if active_seen {
            Some("second Active mission")
        } else if !book.prerequisites_met(id) {
            Some("Active without its prerequisites")
        } else {
            None
        };
        let mission = &mut book.missions[i];
        match reason {
            Some(reason) => {
                r.note(format!("missions.{}", id.title()), format!("{reason}; reset to Locked"));
                *mission = Mission::locked(id);
            }
            None => {
                active_seen = true;
                if mission.activated_at.is_none() {
                    r.note(format!("missions.{}.activated_at", id.title()), "missing; set to now");
                    mission.activated_at = Some(now);
                }
            }
        }
    }
    book
}

fn validate_rivals(raw: Option<RawRivalRoster>, config: &SimConfig, r: &mut Repairs) -> RivalRoster {
    let raw = r.or_else(raw, "rivals", RawRivalRoster::default);
    let rivals_cfg = &config.rivals;
    let mut rivals = raw.rivals.unwrap_or_default();
    for rival in &mut rivals {
        let rep = rival.reputation.clamp(rivals_cfg.reputation_min, rivals_cfg.reputation_max);
        let var = rival.variance_factor.clamp(-rivals_cfg.variance_limit, rivals_cfg.variance_limit);
        if rep != rival.reputation || var != rival.variance_factor {
            r.note(format!("rivals.{}", rival.id), "metrics out of range; clamped");
        }
        rival.reputation = if rep.is_finite() { rep } else { rivals_cfg.reputation_min };
        rival.variance_factor = if var.is_finite() { var } else { 0.0 };
    }
    RivalRoster {
        initialized: raw.initialized.unwrap_or(!rivals.is_empty()),
        rivals,
    }
}
