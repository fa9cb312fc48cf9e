//! Snapshot tests.
//!
//! Tests cover: lossless capture/restore, lenient loading with recorded
//! repairs, hard errors for malformed or future snapshots, save timing,
//! and resuming a run (route network included) from the store.

use airline_core::{
    clock::SimSpeed,
    collaborators::RouteData,
    command::PlayerCommand,
    config::SimConfig,
    engine::SimEngine,
    error::SimError,
    event::Notification,
    fleet::AircraftStatus,
    mission::{MissionId, MissionState},
    snapshot::{SimSnapshot, SNAPSHOT_VERSION},
    store::SimStore,
    types::{AircraftId, RouteId, MS_PER_MINUTE},
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn operating_engine(run_id: &str, seed: u64) -> SimEngine {
    let mut engine = SimEngine::build_test(run_id.into(), seed).unwrap();
    for (model, route) in [("a320", "MAD-BCN"), ("atr72", "MAD-AGP")] {
        engine.apply_command(PlayerCommand::PurchaseAircraft { model_id: model.into() }).unwrap();
        let id = AircraftId(engine.ctx.fleet.next_id() - 1);
        engine
            .apply_command(PlayerCommand::AssignRoute { aircraft_id: id, route_id: RouteId(route.into()) })
            .unwrap();
    }
    engine
}

fn snapshot_value(engine: &SimEngine) -> Value {
    serde_json::from_str(&engine.snapshot().to_json().unwrap()).unwrap()
}

/// A second engine on the same store, restored from the run's latest snapshot.
fn reload(store: &Arc<Mutex<SimStore>>, run_id: &str) -> SimEngine {
    let mut engine = SimEngine::build(
        format!("{run_id}-reader"),
        0,
        SimConfig::default_test(),
        Some(Box::new(Arc::clone(store))),
    );
    assert!(engine.load_latest(run_id).unwrap());
    engine
}

#[test]
fn snapshot_round_trip_is_lossless() {
    let mut engine = operating_engine("snap-roundtrip", 31);
    engine.run_days(40);

    let snapshot = engine.snapshot();
    let loaded = SimSnapshot::from_json(&snapshot.to_json().unwrap(), engine.config()).unwrap();

    assert!(loaded.repairs.is_empty(), "unexpected repairs: {:?}", loaded.repairs);
    assert_eq!(loaded.snapshot, snapshot);
    assert_eq!(loaded.snapshot.into_context(), engine.ctx);
}

#[test]
fn contradictory_fields_are_repaired_and_recorded() {
    let engine = operating_engine("snap-repair", 32);
    let mut v = snapshot_value(&engine);

    // Aircraft 0: in maintenance without an order, condition out of range.
    v["fleet"]["aircraft"][0]["status"] = json!("maintenance");
    v["fleet"]["aircraft"][0]["maintenance"] = Value::Null;
    v["fleet"]["aircraft"][0]["condition"] = json!(250.0);
    // Aircraft 1: flying without a route.
    v["fleet"]["aircraft"][1]["route_id"] = Value::Null;
    // Two Active missions and one missing entry.
    let missions = v["missions"]["missions"].as_array_mut().unwrap();
    missions[0]["state"] = json!("active");
    missions[1]["state"] = json!("active");
    missions.remove(4);
    // No company at all.
    v.as_object_mut().unwrap().remove("company");

    let loaded = SimSnapshot::from_json(&v.to_string(), engine.config()).unwrap();
    let snap = &loaded.snapshot;

    let first = snap.fleet.get(AircraftId(0)).unwrap();
    assert_eq!(first.status, AircraftStatus::Idle);
    assert!(first.maintenance.is_none());
    assert_eq!(first.condition, 100.0);

    let second = snap.fleet.get(AircraftId(1)).unwrap();
    assert_eq!(second.status, AircraftStatus::Idle);
    assert!(second.route_id.is_none());

    assert_eq!(snap.missions.missions.len(), MissionId::ALL.len());
    assert_eq!(snap.missions.active_count(), 1);
    assert_eq!(snap.missions.state_of(MissionId::IntoTheBlack), MissionState::Active);
    assert_eq!(snap.missions.state_of(MissionId::FleetCare), MissionState::Locked);
    assert_eq!(snap.missions.state_of(MissionId::RegionalContender), MissionState::Locked);
    assert!(snap.missions.get(MissionId::IntoTheBlack).unwrap().activated_at.is_some());

    assert_eq!(snap.company.cash, engine.config().company.starting_cash);

    let fields: Vec<&str> = loaded.repairs.iter().map(|r| r.field.as_str()).collect();
    for expected in [".maintenance", ".condition", ".route_id", "missions.Fleet Care", "missions.Regional Contender", "company"] {
        assert!(
            fields.iter().any(|f| f.ends_with(expected)),
            "no repair recorded for {expected}; got {fields:?}"
        );
    }
    assert!(loaded.repairs.iter().all(|r| matches!(r.to_error(), SimError::DataInconsistency(_))));
}

#[test]
fn missing_day_number_is_derived_from_the_clock() {
    let mut engine = operating_engine("snap-day", 33);
    engine.run_days(12);
    let mut v = snapshot_value(&engine);
    v.as_object_mut().unwrap().remove("day_number");

    let loaded = SimSnapshot::from_json(&v.to_string(), engine.config()).unwrap();
    assert_eq!(loaded.snapshot.day_number, 12);
    assert_eq!(loaded.repairs.len(), 1);
}

#[test]
fn duplicate_aircraft_ids_keep_the_first_entry() {
    let engine = operating_engine("snap-dup", 34);
    let mut v = snapshot_value(&engine);
    let aircraft = v["fleet"]["aircraft"].as_array_mut().unwrap();
    let mut clone = aircraft[0].clone();
    clone["model_id"] = json!("atr72");
    aircraft.push(clone);

    let loaded = SimSnapshot::from_json(&v.to_string(), engine.config()).unwrap();
    assert_eq!(loaded.snapshot.fleet.len(), 2);
    assert_eq!(loaded.snapshot.fleet.get(AircraftId(0)).unwrap().model_id, "a320");
}

#[test]
fn malformed_json_is_a_hard_error() {
    let config = SimConfig::default_test();
    assert!(matches!(
        SimSnapshot::from_json("{\"fleet\": [", &config),
        Err(SimError::Serialization(_))
    ));
    assert!(matches!(
        SimSnapshot::from_json(r#"{"company": {"cash": "plenty"}}"#, &config),
        Err(SimError::Serialization(_))
    ));
}

#[test]
fn newer_snapshot_version_is_rejected() {
    let engine = operating_engine("snap-version", 35);
    let mut v = snapshot_value(&engine);
    v["version"] = json!(SNAPSHOT_VERSION + 1);
    assert!(matches!(
        SimSnapshot::from_json(&v.to_string(), engine.config()),
        Err(SimError::DataInconsistency(_))
    ));
}

#[test]
fn empty_object_loads_as_a_fresh_game() {
    let config = SimConfig::default_test();
    let loaded = SimSnapshot::from_json("{}", &config).unwrap();
    assert!(!loaded.repairs.is_empty());
    assert_eq!(loaded.snapshot.day_number, 0);
    assert!(loaded.snapshot.fleet.is_empty());
    assert_eq!(loaded.snapshot.missions.active_count(), 0);
    assert_eq!(loaded.snapshot.fuel_price, config.economy.initial_fuel_price);
}

#[test]
fn restore_surfaces_repairs_as_notifications() {
    let mut engine = operating_engine("snap-notify", 36);
    let mut v = snapshot_value(&engine);
    v["fleet"]["aircraft"][1]["route_id"] = Value::Null;
    let loaded = SimSnapshot::from_json(&v.to_string(), engine.config()).unwrap();
    let expected = loaded.repairs.len();
    assert!(expected > 0);

    engine.drain_notifications();
    engine.restore(loaded);
    let repaired = engine
        .drain_notifications()
        .into_iter()
        .filter(|n| matches!(n, Notification::DataRepaired { .. }))
        .count();
    assert_eq!(repaired, expected);
}

/// A run resumed from the store picks up the same state, the same route
/// network and the same per-day random streams, so both runs settle alike.
#[test]
fn resumed_run_restores_state_and_random_streams() {
    let (mut original, store) = SimEngine::build_test_shared("snap-resume".into(), 37).unwrap();
    original.apply_command(PlayerCommand::PurchaseAircraft { model_id: "a320".into() }).unwrap();
    original
        .apply_command(PlayerCommand::AssignRoute { aircraft_id: AircraftId(0), route_id: RouteId("MAD-BCN".into()) })
        .unwrap();
    original.run_days(10);
    assert!(store.lock().unwrap().snapshot_count("snap-resume").unwrap() >= 1);

    let mut resumed = SimEngine::build(
        "resume-host".into(),
        0,
        SimConfig::default_test(),
        Some(Box::new(Arc::clone(&store))),
    );
    assert!(!resumed.load_latest("no-such-run").unwrap());
    assert!(resumed.load_latest("snap-resume").unwrap());
    assert_eq!(resumed.run_id, "snap-resume");
    assert_eq!(resumed.seed(), 37);
    assert_eq!(resumed.ctx, original.ctx);

    original.run_days(15);
    resumed.run_days(15);
    assert_eq!(resumed.day_number(), 25);
    assert_eq!(resumed.ctx.company, original.ctx.company);
    assert_eq!(resumed.ctx.fuel_price.to_bits(), original.ctx.fuel_price.to_bits());
    assert_eq!(resumed.ctx, original.ctx);
    assert_eq!(
        resumed.collaborators().routes.export_routes(),
        original.collaborators().routes.export_routes()
    );
}

#[test]
fn commands_are_saved_without_waiting_for_a_day_crossing() {
    let (mut live, store) = SimEngine::build_test_shared("snap-commands".into(), 38).unwrap();
    live.run_days(1);
    live.apply_command(PlayerCommand::PurchaseAircraft { model_id: "a320".into() }).unwrap();

    let reloaded = reload(&store, "snap-commands");
    assert_eq!(reloaded.ctx.fleet.len(), 1);
    assert_eq!(reloaded.ctx.company.cash, live.ctx.company.cash);

    // A few minutes of real time, still short of midnight.
    let reports = live.advance(4000.0);
    assert!(reports.is_empty());
    let reloaded = reload(&store, "snap-commands");
    assert_eq!(reloaded.ctx.clock.now, live.ctx.clock.now);
    assert_eq!(reloaded.ctx, live.ctx);
}

#[test]
fn closed_route_stays_closed_after_reload() {
    let (mut live, store) = SimEngine::build_test_shared("snap-routes".into(), 39).unwrap();
    let lhr = RouteId("MAD-LHR".into());
    live.apply_command(PlayerCommand::PurchaseAircraft { model_id: "a320".into() }).unwrap();
    live.apply_command(PlayerCommand::AssignRoute { aircraft_id: AircraftId(0), route_id: RouteId("MAD-BCN".into()) })
        .unwrap();
    live.apply_command(PlayerCommand::CloseRoute { route_id: lhr.clone() }).unwrap();
    live.run_days(10);

    let mut reloaded = reload(&store, "snap-routes");
    assert!(reloaded.collaborators().routes.route(&lhr).unwrap().is_none());
    assert_eq!(
        reloaded.collaborators().routes.export_routes(),
        live.collaborators().routes.export_routes()
    );

    live.run_days(20);
    reloaded.run_days(20);
    assert_eq!(reloaded.ctx.company, live.ctx.company);
    assert!(reloaded.collaborators().routes.route(&lhr).unwrap().is_none());
}

#[test]
fn aircraft_flying_a_route_that_is_not_open_is_grounded_on_load() {
    let engine = operating_engine("snap-unrouted", 41);
    let mut v = snapshot_value(&engine);
    v["routes"].as_array_mut().unwrap().retain(|r| r["id"] != json!("MAD-BCN"));

    let loaded = SimSnapshot::from_json(&v.to_string(), engine.config()).unwrap();
    let first = loaded.snapshot.fleet.get(AircraftId(0)).unwrap();
    assert_eq!(first.status, AircraftStatus::Idle);
    assert!(first.route_id.is_none());
    assert_eq!(loaded.snapshot.fleet.get(AircraftId(1)).unwrap().status, AircraftStatus::Flight);
    let field = format!("aircraft {}.route_id", AircraftId(0));
    assert!(loaded.repairs.iter().any(|r| r.field == field), "got {:?}", loaded.repairs);
}

/// Straight after a speed change the carried remainder may exceed one
/// minute; it is valid state and loads untouched.
#[test]
fn accumulator_above_one_minute_after_speed_change_loads_untouched() {
    let mut engine = SimEngine::build_test("snap-speed".into(), 42).unwrap();
    engine.advance(1000.0);
    engine.apply_command(PlayerCommand::SetSpeed { speed: SimSpeed::X10 }).unwrap();
    assert!(engine.ctx.clock.accumulator_ms >= engine.ctx.clock.minute_length_ms);

    let loaded = SimSnapshot::from_json(&engine.snapshot().to_json().unwrap(), engine.config()).unwrap();
    assert!(loaded.repairs.is_empty(), "unexpected repairs: {:?}", loaded.repairs);
    let mut restored = loaded.snapshot.clock;
    assert_eq!(restored, engine.ctx.clock);

    let before = engine.ctx.clock.now;
    engine.ctx.clock.advance(1.0);
    restored.advance(1.0);
    assert_eq!(restored, engine.ctx.clock);
    assert_eq!(engine.ctx.clock.now.0 - before.0, 9 * MS_PER_MINUTE);
}

#[test]
fn resuming_a_run_logs_its_initialization_once() {
    let (_, store) = SimEngine::build_test_shared("snap-register".into(), 43).unwrap();
    let _resumed = SimEngine::build(
        "snap-register".into(),
        43,
        SimConfig::default_test(),
        Some(Box::new(Arc::clone(&store))),
    );

    let inits = store
        .lock()
        .unwrap()
        .events_for_day("snap-register", 0)
        .unwrap()
        .into_iter()
        .filter(|e| e.event_type == "run_initialized")
        .count();
    assert_eq!(inits, 1);
    assert_eq!(store.lock().unwrap().run_seed("snap-register").unwrap(), Some(43));
}
