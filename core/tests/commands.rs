//! Player command tests.
//!
//! Tests cover: all-or-nothing command application, route open/close and
//! its effect on assigned aircraft, clock control, the wire format of
//! commands, and that persistence failures never stop the simulation.

use airline_core::{
    clock::SimSpeed,
    collaborators::{Persistence, RouteData},
    command::PlayerCommand,
    config::SimConfig,
    engine::SimEngine,
    error::{SimError, SimResult},
    event::{Notification, SimEvent},
    fleet::{AircraftStatus, MaintenanceKind},
    snapshot::SimSnapshot,
    types::{AircraftId, DayNumber, RouteId},
};

fn engine() -> SimEngine {
    SimEngine::build_test("commands".into(), 404).unwrap()
}

fn buy(engine: &mut SimEngine, model: &str) -> AircraftId {
    let events = engine
        .apply_command(PlayerCommand::PurchaseAircraft { model_id: model.into() })
        .unwrap();
    match events.as_slice() {
        [SimEvent::AircraftPurchased { aircraft_id, .. }] => *aircraft_id,
        other => panic!("unexpected purchase events: {other:?}"),
    }
}

fn route(id: &str) -> RouteId {
    RouteId(id.into())
}

#[test]
fn rejected_purchase_changes_nothing() {
    let mut engine = engine();
    engine.ctx.company.cash = 1_000_000.0;
    let before = engine.ctx.clone();

    let err = engine
        .apply_command(PlayerCommand::PurchaseAircraft { model_id: "a320".into() })
        .unwrap_err();
    assert!(matches!(err, SimError::InsufficientFunds { .. }));
    assert_eq!(engine.ctx, before);
}

#[test]
fn assigning_to_an_unknown_route_is_not_found() {
    let mut engine = engine();
    let id = buy(&mut engine, "atr72");
    let before = engine.ctx.clone();

    let err = engine
        .apply_command(PlayerCommand::AssignRoute { aircraft_id: id, route_id: route("MAD-JFK") })
        .unwrap_err();
    assert!(matches!(err, SimError::NotFound { .. }));
    assert_eq!(engine.ctx, before);
}

#[test]
fn assigning_a_busy_aircraft_is_rejected() {
    let mut engine = engine();
    let id = buy(&mut engine, "atr72");
    engine
        .apply_command(PlayerCommand::StartMaintenance { aircraft_id: id, kind: MaintenanceKind::Minor })
        .unwrap();

    let err = engine
        .apply_command(PlayerCommand::AssignRoute { aircraft_id: id, route_id: route("MAD-BCN") })
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidState { .. }));
    assert_eq!(engine.ctx.fleet.get(id).unwrap().status, AircraftStatus::Maintenance);
}

#[test]
fn closing_a_route_grounds_its_aircraft() {
    let mut engine = engine();
    let on_route = buy(&mut engine, "atr72");
    let elsewhere = buy(&mut engine, "atr72");
    engine
        .apply_command(PlayerCommand::AssignRoute { aircraft_id: on_route, route_id: route("MAD-LIS") })
        .unwrap();
    engine
        .apply_command(PlayerCommand::AssignRoute { aircraft_id: elsewhere, route_id: route("MAD-BCN") })
        .unwrap();

    let events = engine
        .apply_command(PlayerCommand::CloseRoute { route_id: route("MAD-LIS") })
        .unwrap();
    assert!(matches!(events.as_slice(), [
        SimEvent::AircraftGrounded { aircraft_id, .. },
        SimEvent::RouteClosed { grounded: 1, .. },
    ] if *aircraft_id == on_route));

    let grounded = engine.ctx.fleet.get(on_route).unwrap();
    assert_eq!(grounded.status, AircraftStatus::Idle);
    assert!(grounded.route_id.is_none());
    assert_eq!(engine.ctx.fleet.get(elsewhere).unwrap().status, AircraftStatus::Flight);

    let open = engine.collaborators().routes.routes().unwrap();
    assert!(!open.iter().any(|r| r.id == route("MAD-LIS")));
    assert!(matches!(
        engine.apply_command(PlayerCommand::CloseRoute { route_id: route("MAD-LIS") }),
        Err(SimError::NotFound { .. })
    ));
}

#[test]
fn routes_can_be_reopened_but_not_opened_twice() {
    let mut engine = engine();
    engine
        .apply_command(PlayerCommand::CloseRoute { route_id: route("MAD-AGP") })
        .unwrap();

    let events = engine
        .apply_command(PlayerCommand::OpenRoute { origin: "MAD".into(), destination: "AGP".into() })
        .unwrap();
    assert!(matches!(events.as_slice(), [SimEvent::RouteOpened { route_id, .. }] if *route_id == route("MAD-AGP")));

    assert!(matches!(
        engine.apply_command(PlayerCommand::OpenRoute { origin: "MAD".into(), destination: "AGP".into() }),
        Err(SimError::InvalidState { .. })
    ));
    assert!(matches!(
        engine.apply_command(PlayerCommand::OpenRoute { origin: "MAD".into(), destination: "JFK".into() }),
        Err(SimError::NotFound { .. })
    ));
}

#[test]
fn aircraft_can_be_sold_in_any_status() {
    let mut engine = engine();
    let flying = buy(&mut engine, "atr72");
    let in_shop = buy(&mut engine, "atr72");
    engine
        .apply_command(PlayerCommand::AssignRoute { aircraft_id: flying, route_id: route("MAD-BCN") })
        .unwrap();
    engine
        .apply_command(PlayerCommand::StartMaintenance { aircraft_id: in_shop, kind: MaintenanceKind::Major })
        .unwrap();
    let cash_before = engine.ctx.company.cash;

    for id in [flying, in_shop] {
        engine.apply_command(PlayerCommand::SellAircraft { aircraft_id: id }).unwrap();
    }
    assert!(engine.ctx.fleet.is_empty());
    assert!((engine.ctx.company.cash - (cash_before + 3_500_000.0)).abs() < 1e-3);

    let reports = engine.run_days(1);
    assert!(reports[0].is_complete());
}

#[test]
fn clock_commands_control_speed_and_pause() {
    let mut engine = engine();
    assert!(!engine.ctx.clock.paused);

    engine.apply_command(PlayerCommand::TogglePause).unwrap();
    assert!(engine.ctx.clock.paused);
    engine.apply_command(PlayerCommand::TogglePause).unwrap();
    assert!(!engine.ctx.clock.paused);

    engine.apply_command(PlayerCommand::SetSpeed { speed: SimSpeed::X10 }).unwrap();
    assert_eq!(engine.ctx.clock.speed, SimSpeed::X10);
    assert_eq!(engine.ctx.clock.minute_length_ms, SimSpeed::X10.minute_length_ms());

    engine.apply_command(PlayerCommand::Pause).unwrap();
    let reports = engine.run_days(2);
    assert_eq!(reports.len(), 2);
    assert!(engine.ctx.clock.paused, "run_days must restore the pause state");
}

#[test]
fn commands_parse_from_their_wire_form() {
    let cmd: PlayerCommand = serde_json::from_str(r#"{"cmd":"set_speed","speed":"x5"}"#).unwrap();
    assert_eq!(cmd, PlayerCommand::SetSpeed { speed: SimSpeed::X5 });

    let cmd: PlayerCommand =
        serde_json::from_str(r#"{"cmd":"start_maintenance","aircraft_id":3,"kind":"major"}"#).unwrap();
    assert_eq!(cmd, PlayerCommand::StartMaintenance { aircraft_id: AircraftId(3), kind: MaintenanceKind::Major });
    assert_eq!(cmd.name(), "start_maintenance");
}

// ── Persistence failures ───────────────────────────────────────────

struct FailingStore;

impl Persistence for FailingStore {
    fn register_run(&mut self, _run_id: &str, _seed: u64) -> SimResult<bool> {
        Err(SimError::invalid_state("store", "disk full"))
    }

    fn save(&mut self, _snapshot: &SimSnapshot) -> SimResult<()> {
        Err(SimError::invalid_state("store", "disk full"))
    }

    fn load(&self, _run_id: &str) -> SimResult<Option<String>> {
        Err(SimError::invalid_state("store", "disk full"))
    }

    fn append_events(&mut self, _run_id: &str, _day: DayNumber, _events: &[SimEvent]) -> SimResult<()> {
        Err(SimError::invalid_state("store", "disk full"))
    }
}

#[test]
fn persistence_failures_are_reported_but_never_stop_the_run() {
    let mut engine = SimEngine::build(
        "failing-store".into(),
        9,
        SimConfig::default_test(),
        Some(Box::new(FailingStore)),
    );
    let id = buy(&mut engine, "a320");
    engine
        .apply_command(PlayerCommand::AssignRoute { aircraft_id: id, route_id: route("MAD-BCN") })
        .unwrap();

    let reports = engine.run_days(3);
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.is_complete()));
    assert_eq!(engine.day_number(), 3);

    let failures = engine
        .drain_notifications()
        .into_iter()
        .filter(|n| matches!(n, Notification::PersistenceFailed { reason } if reason.contains("disk full")))
        .count();
    // Run registration, events and a snapshot per command, then the same per day.
    assert_eq!(failures, 1 + 2 * 2 + 3 * 2);

    assert!(engine.load_latest("failing-store").is_err());
}
