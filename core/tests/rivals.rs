//! Rival simulator tests.
//!
//! Tests cover: one-time roster initialization, drift bounds, ranking
//! order (including tie stability) and the route competition factor.

use airline_core::{
    config::SimConfig,
    rival_subsystem::{PlayerStanding, Rival, RivalRoster, RivalSimulator},
    rng::SubsystemRng,
};

fn simulator() -> (RivalSimulator, SimConfig) {
    let config = SimConfig::default_test();
    (RivalSimulator::new(config.rivals.clone()), config)
}

fn player(daily_income: f64) -> PlayerStanding {
    PlayerStanding { name: "Test Airways".into(), daily_income, reputation: 50.0 }
}

fn rival(name: &str, base: &str, income: f64) -> Rival {
    Rival {
        id: name.to_lowercase(),
        name: name.into(),
        home_base: base.into(),
        reputation: 50.0,
        variance_factor: 0.0,
        base_daily_income: income,
    }
}

#[test]
fn initialization_excludes_rivals_at_player_home() {
    let (sim, config) = simulator();
    let mut roster = RivalRoster::default();
    sim.initialize(&mut roster, "MAD", &mut SubsystemRng::new(1, 5));

    assert!(roster.initialized);
    assert_eq!(roster.len(), config.rivals.roster.len() - 1);
    assert_eq!(roster.based_at("MAD"), 0);
    for r in &roster.rivals {
        assert!(r.variance_factor.abs() <= config.rivals.initial_variance);
    }
}

#[test]
fn initialization_runs_once() {
    let (sim, _) = simulator();
    let mut roster = RivalRoster::default();
    sim.initialize(&mut roster, "MAD", &mut SubsystemRng::new(1, 5));
    let first = roster.clone();

    sim.initialize(&mut roster, "BCN", &mut SubsystemRng::new(2, 5));
    assert_eq!(roster, first);
}

#[test]
fn drift_stays_within_configured_bounds() {
    let (sim, config) = simulator();
    let rc = &config.rivals;
    for seed in 0..10u64 {
        let mut roster = RivalRoster::default();
        sim.initialize(&mut roster, "MAD", &mut SubsystemRng::new(seed, 5));
        for day in 1..=500u64 {
            let mut rng = SubsystemRng::new(seed ^ day, 4);
            sim.daily_drift(&mut roster, &mut rng);
            for r in &roster.rivals {
                assert!(
                    (-rc.variance_limit..=rc.variance_limit).contains(&r.variance_factor),
                    "seed {seed} day {day}: variance {}", r.variance_factor
                );
                assert!(
                    (rc.reputation_min..=rc.reputation_max).contains(&r.reputation),
                    "seed {seed} day {day}: reputation {}", r.reputation
                );
            }
        }
    }
}

#[test]
fn ranking_orders_by_effective_income_with_one_based_positions() {
    let (sim, _) = simulator();
    let roster = RivalRoster {
        rivals: vec![rival("Low", "LIS", 10_000.0), rival("High", "LHR", 90_000.0)],
        initialized: true,
    };
    let ranking = sim.ranking(&roster, &player(40_000.0));

    let names: Vec<_> = ranking.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["High", "Test Airways", "Low"]);
    let positions: Vec<_> = ranking.iter().map(|e| e.position).collect();
    assert_eq!(positions, [1, 2, 3]);
    assert_eq!(sim.player_position(&roster, &player(40_000.0)), 2);
}

/// Equal incomes keep insertion order: player first, then the roster.
#[test]
fn ranking_ties_are_stable() {
    let (sim, _) = simulator();
    let roster = RivalRoster {
        rivals: vec![rival("First", "LIS", 20_000.0), rival("Second", "CDG", 20_000.0)],
        initialized: true,
    };
    let ranking = sim.ranking(&roster, &player(20_000.0));
    let names: Vec<_> = ranking.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Test Airways", "First", "Second"]);
}

#[test]
fn variance_factor_scales_income_in_ranking() {
    let (sim, _) = simulator();
    let mut boosted = rival("Boosted", "LIS", 30_000.0);
    boosted.variance_factor = 0.3;
    let roster = RivalRoster { rivals: vec![boosted], initialized: true };

    let ranking = sim.ranking(&roster, &player(35_000.0));
    assert_eq!(ranking[0].name, "Boosted");
    assert!((ranking[0].daily_income - 39_000.0).abs() < 1e-9);
}

#[test]
fn competition_factor_compounds_per_rival_and_is_floored() {
    let (sim, _) = simulator();
    let roster = RivalRoster {
        rivals: vec![
            rival("A", "BCN", 1.0),
            rival("B", "BCN", 1.0),
            rival("C", "LHR", 1.0),
            rival("D", "LHR", 1.0),
            rival("E", "LHR", 1.0),
        ],
        initialized: true,
    };

    assert_eq!(sim.competition_factor(&roster, "MAD", "AGP"), 1.0);
    assert!((sim.competition_factor(&roster, "MAD", "BCN") - 0.9025).abs() < 1e-12);
    // Five rivals would give 0.95^5 ≈ 0.774; the floor holds it at 0.85.
    assert_eq!(sim.competition_factor(&roster, "BCN", "LHR"), 0.85);
}
