//! Aircraft lifecycle tests.
//!
//! Tests cover: flight wear, maintenance start/completion, overdue
//! advisories, purchase and sale, and the all-or-nothing command rules.

use airline_core::{
    aircraft_subsystem::AircraftLifecycle,
    collaborators::Route,
    company::Company,
    config::SimConfig,
    error::SimError,
    event::SimEvent,
    fleet::{AircraftStatus, Fleet, MaintenanceKind},
    rng::SubsystemRng,
    types::{AircraftId, RouteId, SimTime},
};

struct Rig {
    lifecycle: AircraftLifecycle,
    fleet: Fleet,
    company: Company,
    config: SimConfig,
}

fn rig() -> Rig {
    let config = SimConfig::default_test();
    Rig {
        lifecycle: AircraftLifecycle::new(config.maintenance.clone(), config.fleet.clone()),
        fleet: Fleet::new(),
        company: Company::new(&config.company),
        config,
    }
}

fn route(id: &str, distance_km: f64) -> Route {
    let (origin, destination) = id.split_once('-').unwrap();
    Route {
        id: RouteId(id.into()),
        origin: origin.into(),
        destination: destination.into(),
        distance_km,
        fare: 100.0,
        base_demand: 0.8,
        competitor_fare: 100.0,
    }
}

impl Rig {
    fn add(&mut self, model: &str) -> AircraftId {
        let model = self.config.model(model).unwrap().clone();
        self.fleet.add(&model, SimTime(0))
    }
}

#[test]
fn flight_wear_stays_within_one_point_of_nominal() {
    let mut rig = rig();
    let id = rig.add("atr72");
    rig.lifecycle.assign_route(1, &mut rig.fleet, id, &route("MAD-BCN", 483.0)).unwrap();
    rig.fleet.get_mut(id).unwrap().set_condition(35.0);

    let mut rng = SubsystemRng::new(1234, 6);
    let events = rig.lifecycle.daily_tick(1, rig.fleet.get_mut(id).unwrap(), &mut rng);

    let a = rig.fleet.get(id).unwrap();
    assert!(events.is_empty());
    assert_eq!(a.status, AircraftStatus::Flight);
    assert!(
        (33.5..=34.5).contains(&a.condition),
        "condition after one flight day out of range: {}", a.condition
    );
}

#[test]
fn minor_maintenance_debits_and_completes_after_one_day() {
    let mut rig = rig();
    let id = rig.add("atr72");
    rig.fleet.get_mut(id).unwrap().set_condition(50.0);
    let cash_before = rig.company.cash;

    let event = rig
        .lifecycle
        .start_maintenance(3, &mut rig.fleet, &mut rig.company, id, MaintenanceKind::Minor)
        .unwrap();
    assert!(matches!(event, SimEvent::MaintenanceStarted { cost, days: 1, .. } if cost == 10_000.0));
    assert_eq!(rig.company.cash, cash_before - 10_000.0);
    {
        let a = rig.fleet.get(id).unwrap();
        assert_eq!(a.status, AircraftStatus::Maintenance);
        assert_eq!(a.maintenance_kind(), MaintenanceKind::Minor);
        assert_eq!(a.maintenance_days_left(), Some(1));
    }

    let mut rng = SubsystemRng::new(1, 6);
    let events = rig.lifecycle.daily_tick(4, rig.fleet.get_mut(id).unwrap(), &mut rng);

    let a = rig.fleet.get(id).unwrap();
    assert_eq!(a.status, AircraftStatus::Idle);
    assert_eq!(a.condition, 70.0);
    assert_eq!(a.maintenance_kind(), MaintenanceKind::None);
    assert_eq!(a.maintenance_days_left(), None);
    assert_eq!(a.days_since_last_maintenance, 0);
    assert!(matches!(events.as_slice(), [SimEvent::MaintenanceCompleted { kind: MaintenanceKind::Minor, .. }]));
}

#[test]
fn minor_maintenance_restoration_caps_at_one_hundred() {
    let mut rig = rig();
    let id = rig.add("atr72");
    rig.fleet.get_mut(id).unwrap().set_condition(92.0);
    rig.lifecycle
        .start_maintenance(1, &mut rig.fleet, &mut rig.company, id, MaintenanceKind::Minor)
        .unwrap();

    let mut rng = SubsystemRng::new(1, 6);
    rig.lifecycle.daily_tick(2, rig.fleet.get_mut(id).unwrap(), &mut rng);
    assert_eq!(rig.fleet.get(id).unwrap().condition, 100.0);
}

#[test]
fn major_maintenance_takes_three_days_and_restores_fully() {
    let mut rig = rig();
    let id = rig.add("a320");
    rig.fleet.get_mut(id).unwrap().set_condition(12.0);
    rig.lifecycle
        .start_maintenance(1, &mut rig.fleet, &mut rig.company, id, MaintenanceKind::Major)
        .unwrap();

    let mut rng = SubsystemRng::new(9, 6);
    for day in 2..4 {
        rig.lifecycle.daily_tick(day, rig.fleet.get_mut(id).unwrap(), &mut rng);
        assert_eq!(rig.fleet.get(id).unwrap().status, AircraftStatus::Maintenance, "day {day}");
    }
    rig.lifecycle.daily_tick(4, rig.fleet.get_mut(id).unwrap(), &mut rng);

    let a = rig.fleet.get(id).unwrap();
    assert_eq!(a.status, AircraftStatus::Idle);
    assert_eq!(a.condition, 100.0);
}

/// Maintenance on a non-Idle aircraft fails and leaves it untouched.
#[test]
fn maintenance_rejected_unless_idle() {
    let mut rig = rig();
    let flying = rig.add("atr72");
    rig.lifecycle.assign_route(1, &mut rig.fleet, flying, &route("MAD-BCN", 483.0)).unwrap();
    rig.fleet.get_mut(flying).unwrap().set_condition(41.0);

    let in_shop = rig.add("atr72");
    rig.lifecycle
        .start_maintenance(1, &mut rig.fleet, &mut rig.company, in_shop, MaintenanceKind::Major)
        .unwrap();
    let cash_before = rig.company.cash;

    for id in [flying, in_shop] {
        let before = rig.fleet.get(id).unwrap().clone();
        let err = rig
            .lifecycle
            .start_maintenance(1, &mut rig.fleet, &mut rig.company, id, MaintenanceKind::Minor)
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidState { .. }), "unexpected error: {err}");
        assert_eq!(rig.fleet.get(id).unwrap(), &before);
    }
    assert_eq!(rig.company.cash, cash_before);
}

#[test]
fn maintenance_rejected_without_funds() {
    let mut rig = rig();
    let id = rig.add("atr72");
    rig.company.cash = 9_999.0;

    let err = rig
        .lifecycle
        .start_maintenance(1, &mut rig.fleet, &mut rig.company, id, MaintenanceKind::Minor)
        .unwrap_err();
    assert!(matches!(err, SimError::InsufficientFunds { .. }));
    assert_eq!(rig.company.cash, 9_999.0);
    assert_eq!(rig.fleet.get(id).unwrap().status, AircraftStatus::Idle);
}

#[test]
fn overdue_advisory_fires_past_one_hundred_days_every_tenth_day() {
    let mut rig = rig();
    let id = rig.add("atr72");
    let mut rng = SubsystemRng::new(5, 6);

    let mut overdue_days = Vec::new();
    for day in 1..=135 {
        for event in rig.lifecycle.daily_tick(day, rig.fleet.get_mut(id).unwrap(), &mut rng) {
            if let SimEvent::MaintenanceOverdue { days_since_maintenance, .. } = event {
                overdue_days.push(days_since_maintenance);
            }
        }
    }
    assert_eq!(overdue_days, vec![110, 120, 130]);
}

/// Condition stays in [0, 100] under any mix of wear and maintenance.
#[test]
fn condition_always_within_bounds() {
    for seed in 0..20u64 {
        let mut rig = rig();
        rig.company.cash = f64::MAX / 2.0;
        let id = rig.add("atr72");
        let mut rng = SubsystemRng::new(seed, 6);
        let mut choice = SubsystemRng::new(seed, 99);

        for day in 1..=400 {
            if rig.fleet.get(id).unwrap().is_idle() {
                match choice.next_u64_below(4) {
                    0 => { rig.lifecycle.assign_route(day, &mut rig.fleet, id, &route("MAD-LIS", 503.0)).unwrap(); }
                    1 => { rig.lifecycle.start_maintenance(day, &mut rig.fleet, &mut rig.company, id, MaintenanceKind::Minor).unwrap(); }
                    2 => { rig.lifecycle.start_maintenance(day, &mut rig.fleet, &mut rig.company, id, MaintenanceKind::Major).unwrap(); }
                    _ => {}
                }
            } else if choice.chance(0.02) && rig.fleet.get(id).unwrap().status == AircraftStatus::Flight {
                rig.lifecycle.ground(day, &mut rig.fleet, id).unwrap();
            }
            rig.lifecycle.daily_tick(day, rig.fleet.get_mut(id).unwrap(), &mut rng);

            let a = rig.fleet.get(id).unwrap();
            assert!((0.0..=100.0).contains(&a.condition), "seed {seed} day {day}: {}", a.condition);
            assert_eq!(a.maintenance.is_some(), a.status == AircraftStatus::Maintenance);
        }
    }
}

#[test]
fn wear_never_drives_condition_below_zero() {
    let mut rig = rig();
    let id = rig.add("atr72");
    rig.lifecycle.assign_route(1, &mut rig.fleet, id, &route("MAD-BCN", 483.0)).unwrap();
    rig.fleet.get_mut(id).unwrap().set_condition(0.4);

    let mut rng = SubsystemRng::new(3, 6);
    rig.lifecycle.daily_tick(1, rig.fleet.get_mut(id).unwrap(), &mut rng);
    assert_eq!(rig.fleet.get(id).unwrap().condition, 0.0);
}

#[test]
fn sale_credits_seventy_percent_and_keeps_other_ids_stable() {
    let mut rig = rig();
    let first = rig.add("atr72");
    let second = rig.add("a320");
    let third = rig.add("atr72");
    let cash_before = rig.company.cash;

    rig.lifecycle.sell(5, &mut rig.fleet, &mut rig.company, second).unwrap();
    assert_eq!(rig.company.cash, cash_before + 6_000_000.0 * 0.7);
    assert!(rig.fleet.get(first).is_ok());
    assert!(rig.fleet.get(third).is_ok());

    // Ids are never reused.
    let fourth = rig.add("atr72");
    assert_ne!(fourth, second);

    let err = rig.lifecycle.sell(5, &mut rig.fleet, &mut rig.company, second).unwrap_err();
    assert!(matches!(err, SimError::NotFound { .. }));
}

#[test]
fn purchase_creates_idle_aircraft_at_full_condition() {
    let mut rig = rig();
    let cash_before = rig.company.cash;
    let event = rig
        .lifecycle
        .purchase(1, SimTime(0), &mut rig.fleet, &mut rig.company, "atr72")
        .unwrap();
    let SimEvent::AircraftPurchased { aircraft_id, price, .. } = event else {
        panic!("expected an AircraftPurchased event");
    };
    assert_eq!(price, 2_500_000.0);
    assert_eq!(rig.company.cash, cash_before - price);
    let a = rig.fleet.get(aircraft_id).unwrap();
    assert_eq!(a.status, AircraftStatus::Idle);
    assert_eq!(a.condition, 100.0);

    assert!(matches!(
        rig.lifecycle.purchase(1, SimTime(0), &mut rig.fleet, &mut rig.company, "concorde"),
        Err(SimError::NotFound { .. })
    ));
}

#[test]
fn assignment_respects_model_range() {
    let mut rig = rig();
    let id = rig.add("atr72");
    let err = rig
        .lifecycle
        .assign_route(1, &mut rig.fleet, id, &route("MAD-FCO", 1_800.0))
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidState { .. }));
    assert!(rig.fleet.get(id).unwrap().is_idle());
}
