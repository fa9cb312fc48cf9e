//! The simulation engine — owns the SimulationContext, the RNG bank, the
//! daily cascade and the collaborators, and is the only entry point a
//! host (UI, runner, tests) drives.
//!
//! Per `advance` call:
//!   1. The clock converts real time into simulated minutes and reports
//!      every day boundary crossed.
//!   2. Each crossing runs the full daily cascade, one at a time.
//!   3. The day's events go to the event log and the notification queue.
//!   4. One snapshot is saved for the batch, if the clock moved.
//!
//! RULES:
//!   - Player commands are applied strictly between `advance` calls, and
//!     every accepted command is followed by a snapshot.
//!   - Persistence is fire-and-forget. A failed save is logged and
//!     surfaced as a notification; the simulation continues un-persisted.
//!   - All randomness flows through the RngBank.

use crate::{
    aircraft_subsystem::AircraftLifecycle,
    cascade::{DailyCascade, DayReport},
    clock::DayCrossing,
    collaborators::{Collaborators, Persistence},
    command::PlayerCommand,
    config::SimConfig,
    context::SimulationContext,
    economy::BaselineEconomy,
    error::{SimError, SimResult},
    event::{Notification, SimEvent},
    mission_subsystem::MissionEngine,
    network::RouteNetwork,
    rival_subsystem::{RankingEntry, RivalSimulator},
    rng::{RngBank, SubsystemSlot},
    snapshot::{LoadedSnapshot, SimSnapshot},
    store::SimStore,
    types::{DayNumber, RunId, SimTime},
    world_events::BaselineEvents,
};
use std::sync::{Arc, Mutex};

pub struct SimEngine {
    pub run_id:    RunId,
    pub ctx:       SimulationContext,
    pub rng_bank:  RngBank,
    seed:          u64,
    cascade:       DailyCascade,
    collaborators: Collaborators,
    config:        SimConfig,
    store:         Option<Box<dyn Persistence>>,
    notifications: Vec<Notification>,
}

impl SimEngine {
    /// Wire an engine from explicit collaborators.
    /// The rival roster is initialized here, once per run.
    pub fn new(
        run_id: RunId,
        seed: u64,
        config: SimConfig,
        collaborators: Collaborators,
        store: Option<Box<dyn Persistence>>,
    ) -> Self {
        let cascade = DailyCascade::new(
            AircraftLifecycle::new(config.maintenance.clone(), config.fleet.clone()),
            MissionEngine::new(),
            RivalSimulator::new(config.rivals.clone()),
            config.economy.contract_interval_days,
        );
        let rng_bank = RngBank::new(seed);
        let mut ctx = SimulationContext::new(&config);

        let mut rng = rng_bank.for_subsystem_at_day(SubsystemSlot::Rivals, 0);
        cascade.rivals.initialize(&mut ctx.rivals, &config.company.home_base, &mut rng);

        let mut engine = Self {
            run_id,
            ctx,
            rng_bank,
            seed,
            cascade,
            collaborators,
            config,
            store,
            notifications: Vec::new(),
        };
        engine.register_run();
        engine
    }

    /// Build a fully wired engine with the baseline collaborators.
    pub fn build(
        run_id: RunId,
        seed: u64,
        config: SimConfig,
        store: Option<Box<dyn Persistence>>,
    ) -> Self {
        let collaborators = baseline_collaborators(&config);
        Self::new(run_id, seed, config, collaborators, store)
    }

    /// Test configuration backed by an in-memory store.
    pub fn build_test(run_id: RunId, seed: u64) -> SimResult<Self> {
        let (engine, _) = Self::build_test_shared(run_id, seed)?;
        Ok(engine)
    }

    /// Like `build_test`, also handing back the store for queries.
    pub fn build_test_shared(run_id: RunId, seed: u64) -> SimResult<(Self, Arc<Mutex<SimStore>>)> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        let shared = Arc::new(Mutex::new(store));
        let engine = Self::build(
            run_id,
            seed,
            SimConfig::default_test(),
            Some(Box::new(Arc::clone(&shared))),
        );
        Ok((engine, shared))
    }

    /// RunInitialized is logged only the first time a run id is registered.
    fn register_run(&mut self) {
        let init = SimEvent::RunInitialized { run_id: self.run_id.clone(), seed: self.seed };
        let result = match self.store.as_mut() {
            Some(store) => store.register_run(&self.run_id, self.seed).and_then(|created| {
                if created {
                    store.append_events(&self.run_id, 0, &[init])
                } else {
                    log::info!("run {} already registered", self.run_id);
                    Ok(())
                }
            }),
            None => return,
        };
        if let Err(e) = result {
            self.persistence_failed("register run", e);
        }
    }

    // ── Time ───────────────────────────────────────────────────

    /// Feed real elapsed time (clamped per call by the clock).
    /// Returns one report per day crossed, in order.
    pub fn advance(&mut self, elapsed_real_ms: f64) -> Vec<DayReport> {
        let started = self.ctx.clock.now;
        let crossings = self.ctx.clock.advance(elapsed_real_ms);
        self.process_crossings(started, crossings)
    }

    /// Unclamped variant for fast-forward and batch tests.
    pub fn advance_unclamped(&mut self, elapsed_real_ms: f64) -> Vec<DayReport> {
        let started = self.ctx.clock.now;
        let crossings = self.ctx.clock.advance_unclamped(elapsed_real_ms);
        self.process_crossings(started, crossings)
    }

    /// Fast-forward exactly `n` day crossings. The pause state is restored afterwards.
    pub fn run_days(&mut self, n: u64) -> Vec<DayReport> {
        let was_paused = self.ctx.clock.paused;
        self.ctx.clock.resume();
        let mut reports = Vec::with_capacity(n as usize);
        while (reports.len() as u64) < n {
            // Half a minute past midnight keeps float residue from falling short.
            let step = self.ctx.clock.ms_until_next_day() + self.ctx.clock.minute_length_ms * 0.5;
            reports.extend(self.advance_unclamped(step));
        }
        if was_paused {
            self.ctx.clock.pause();
            self.persist_snapshot();
        }
        reports
    }

    fn process_crossings(&mut self, started: SimTime, crossings: Vec<DayCrossing>) -> Vec<DayReport> {
        let mut reports = Vec::with_capacity(crossings.len());
        for crossing in &crossings {
            let report = self.cascade.run_day(
                &mut self.ctx,
                &mut self.collaborators,
                &self.rng_bank,
                crossing,
            );
            self.notifications
                .extend(report.events.iter().filter_map(Notification::from_event));
            self.persist_events(report.day, &report.events);
            reports.push(report);
        }

        // Minutes consumed without a crossing still move the saved clock.
        if self.ctx.clock.now != started {
            self.persist_snapshot();
        }
        reports
    }

    // ── Commands ───────────────────────────────────────────────

    /// Apply one player command. All-or-nothing: a rejected command
    /// leaves every piece of state untouched.
    pub fn apply_command(&mut self, command: PlayerCommand) -> SimResult<Vec<SimEvent>> {
        let day = self.ctx.day_number;
        let now = self.ctx.clock.now;
        let lifecycle = &self.cascade.aircraft;
        let ctx = &mut self.ctx;

        let events = match command {
            PlayerCommand::Pause => {
                ctx.clock.pause();
                Vec::new()
            }
            PlayerCommand::Resume => {
                ctx.clock.resume();
                Vec::new()
            }
            PlayerCommand::TogglePause => {
                ctx.clock.toggle_pause();
                Vec::new()
            }
            PlayerCommand::SetSpeed { speed } => {
                ctx.clock.set_speed(speed);
                Vec::new()
            }
            PlayerCommand::PurchaseAircraft { model_id } => {
                vec![lifecycle.purchase(day, now, &mut ctx.fleet, &mut ctx.company, &model_id)?]
            }
            PlayerCommand::SellAircraft { aircraft_id } => {
                vec![lifecycle.sell(day, &mut ctx.fleet, &mut ctx.company, aircraft_id)?]
            }
            PlayerCommand::StartMaintenance { aircraft_id, kind } => {
                vec![lifecycle.start_maintenance(day, &mut ctx.fleet, &mut ctx.company, aircraft_id, kind)?]
            }
            PlayerCommand::AssignRoute { aircraft_id, route_id } => {
                let route = self
                    .collaborators
                    .routes
                    .route(&route_id)?
                    .ok_or_else(|| SimError::not_found("Route", &route_id))?;
                vec![lifecycle.assign_route(day, &mut ctx.fleet, aircraft_id, &route)?]
            }
            PlayerCommand::Ground { aircraft_id } => {
                vec![lifecycle.ground(day, &mut ctx.fleet, aircraft_id)?]
            }
            PlayerCommand::OpenRoute { origin, destination } => {
                let route_id = self.collaborators.routes.open_route(&origin, &destination)?;
                vec![SimEvent::RouteOpened { day, route_id }]
            }
            PlayerCommand::CloseRoute { route_id } => {
                self.collaborators.routes.close_route(&route_id)?;
                let flying: Vec<_> = ctx.fleet.on_route(&route_id).map(|a| a.id).collect();
                let mut events = Vec::with_capacity(flying.len() + 1);
                for id in &flying {
                    events.push(lifecycle.ground(day, &mut ctx.fleet, *id)?);
                }
                events.push(SimEvent::RouteClosed { day, route_id, grounded: flying.len() });
                events
            }
        };

        if !events.is_empty() {
            self.persist_events(day, &events);
        }
        self.persist_snapshot();
        Ok(events)
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn day_number(&self) -> DayNumber {
        self.ctx.day_number
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn collaborators_mut(&mut self) -> &mut Collaborators {
        &mut self.collaborators
    }

    pub fn ranking(&self) -> Vec<RankingEntry> {
        self.cascade.rivals.ranking(&self.ctx.rivals, &self.ctx.player_standing())
    }

    /// Take every queued notification, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ── Persistence ────────────────────────────────────────────

    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot::capture(&self.run_id, self.seed, &self.ctx, self.collaborators.routes.export_routes())
    }

    /// Replace the in-memory state with a validated snapshot.
    /// Every repair made while loading it is surfaced as a notification.
    pub fn restore(&mut self, loaded: LoadedSnapshot) {
        let LoadedSnapshot { mut snapshot, repairs } = loaded;
        for repair in &repairs {
            self.notifications.push(Notification::DataRepaired {
                field: repair.field.clone(),
                detail: repair.detail.clone(),
            });
        }
        self.run_id = snapshot.run_id.clone();
        self.seed = snapshot.seed;
        self.rng_bank = RngBank::new(snapshot.seed);
        let day = snapshot.day_number;
        self.collaborators.routes.restore_routes(std::mem::take(&mut snapshot.routes));
        self.ctx = snapshot.into_context();
        log::info!("restored run {} at day {day} ({} repair(s))", self.run_id, repairs.len());
        self.persist_events(day, &[SimEvent::SnapshotRestored { day, repairs: repairs.len() }]);
    }

    /// Restore the latest stored snapshot of `run_id`. Returns false when none exists.
    pub fn load_latest(&mut self, run_id: &str) -> SimResult<bool> {
        let Some(store) = self.store.as_ref() else {
            return Ok(false);
        };
        let Some(json) = store.load(run_id)? else {
            return Ok(false);
        };
        let loaded = SimSnapshot::from_json(&json, &self.config)?;
        self.restore(loaded);
        Ok(true)
    }

    fn persist_events(&mut self, day: DayNumber, events: &[SimEvent]) {
        let result = match self.store.as_mut() {
            Some(store) => store.append_events(&self.run_id, day, events),
            None => return,
        };
        if let Err(e) = result {
            self.persistence_failed("append events", e);
        }
    }

    fn persist_snapshot(&mut self) {
        if self.store.is_none() {
            return;
        }
        let snapshot = self.snapshot();
        let result = match self.store.as_mut() {
            Some(store) => store.save(&snapshot),
            None => return,
        };
        match result {
            Ok(()) => log::debug!("day={} snapshot saved", snapshot.day_number),
            Err(e) => self.persistence_failed("save snapshot", e),
        }
    }

    fn persistence_failed(&mut self, action: &str, error: SimError) {
        log::error!("persistence failed ({action}): {error}");
        self.notifications.push(Notification::PersistenceFailed {
            reason: format!("{action}: {error}"),
        });
    }
}

pub fn baseline_collaborators(config: &SimConfig) -> Collaborators {
    Collaborators {
        economy: Box::new(BaselineEconomy::new(
            config.economy.clone(),
            config.rivals.clone(),
            &config.network,
        )),
        events: Box::new(BaselineEvents::new(config.events.clone())),
        routes: Box::new(RouteNetwork::new(&config.network)),
    }
}
