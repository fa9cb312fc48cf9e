use crate::clock::SimSpeed;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Clock ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    pub start_date: NaiveDate,
    pub speed: SimSpeed,
    /// Per-call cap on real elapsed time; guards against suspended hosts
    /// delivering one enormous delta. `null` disables it.
    pub max_step_ms: Option<f64>,
    #[serde(default)]
    pub start_paused: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            speed: SimSpeed::X1,
            max_step_ms: Some(5_000.0),
            start_paused: false,
        }
    }
}

// ── Company ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    pub name: String,
    pub home_base: String,
    pub starting_cash: f64,
    pub starting_reputation: f64,
    /// Days of net results kept for ranking.
    pub ranking_income_window: usize,
}

// ── Fleet & maintenance ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    pub minor_cost: f64,
    pub minor_days: u32,
    pub minor_restore: f64,
    pub major_cost: f64,
    pub major_days: u32,
    /// Advisory fires once past this many days without maintenance...
    pub overdue_after_days: u32,
    /// ...and then every this many days.
    pub overdue_reminder_every: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftModel {
    pub model_id: String,
    pub label: String,
    pub price: f64,
    pub seats: u32,
    pub range_km: f64,
    /// Fuel burn in kg per km flown.
    pub fuel_burn_per_km: f64,
    /// Crew, leasing of ground kit, insurance.
    pub daily_overhead: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    pub flight_wear_min: f64,
    pub flight_wear_max: f64,
    /// Fraction of catalog price credited on sale.
    pub resale_ratio: f64,
    pub models: Vec<AircraftModel>,
}

#[derive(Debug, Clone, Deserialize)]
struct AircraftCatalogFile {
    flight_wear_min: f64,
    flight_wear_max: f64,
    resale_ratio: f64,
    models: Vec<AircraftModel>,
}

// ── Rivals ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RivalProfile {
    pub id: String,
    pub name: String,
    pub home_base: String,
    pub reputation: f64,
    pub base_daily_income: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RivalConfig {
    pub roster: Vec<RivalProfile>,
    pub initial_variance: f64,
    pub variance_limit: f64,
    pub variance_step: f64,
    pub reputation_step: f64,
    pub reputation_min: f64,
    pub reputation_max: f64,
    pub competition_penalty: f64,
    pub competition_floor: f64,
}

// ── World events ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTemplate {
    pub kind: String,
    pub label: String,
    pub adverse: bool,
    pub weight: f64,
    pub duration_days: u32,
    pub demand_multiplier: f64,
    pub cost_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCatalogConfig {
    pub daily_probability: f64,
    pub templates: Vec<EventTemplate>,
}

// ── Economy & network ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    pub initial_fuel_price: f64,
    pub fuel_price_min: f64,
    pub fuel_price_max: f64,
    pub fuel_volatility: f64,
    pub flights_per_day: f64,
    pub min_load_factor: f64,
    pub max_load_factor: f64,
    /// Fixed cost per owned aircraft per day regardless of status.
    pub ownership_cost_per_day: f64,
    pub contract_interval_days: u64,
    pub max_offers_per_batch: u64,
    pub offer_valid_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub name: String,
    pub city: String,
    pub landing_fee: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub base_fare: f64,
    /// Demand as a share of seats at parity pricing.
    pub base_demand: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteNetworkConfig {
    pub airports: Vec<Airport>,
    pub routes: Vec<RouteConfig>,
    pub competitor_fare_drift: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct SimFile {
    clock: ClockConfig,
    company: CompanyConfig,
    maintenance: MaintenanceConfig,
    economy: EconomyConfig,
    network: RouteNetworkConfig,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub clock: ClockConfig,
    pub company: CompanyConfig,
    pub maintenance: MaintenanceConfig,
    pub fleet: FleetConfig,
    pub rivals: RivalConfig,
    pub events: EventCatalogConfig,
    pub economy: EconomyConfig,
    pub network: RouteNetworkConfig,
}

impl SimConfig {
    /// Load from the data/ directory.
    /// In tests, use SimConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let sim: SimFile = read_json(data_dir, "sim.json")?;
        let catalog: AircraftCatalogFile = read_json(data_dir, "aircraft_catalog.json")?;
        let rivals: RivalConfig = read_json(data_dir, "rivals.json")?;
        let events: EventCatalogConfig = read_json(data_dir, "events.json")?;

        let config = Self {
            clock: sim.clock,
            company: sim.company,
            maintenance: sim.maintenance,
            fleet: FleetConfig {
                flight_wear_min: catalog.flight_wear_min,
                flight_wear_max: catalog.flight_wear_max,
                resale_ratio: catalog.resale_ratio,
                models: catalog.models,
            },
            rivals,
            events,
            economy: sim.economy,
            network: sim.network,
        };
        config.validate()?;
        log::info!(
            "Loaded config from {data_dir}: {} models, {} rivals, {} routes, {} event kinds",
            config.fleet.models.len(),
            config.rivals.roster.len(),
            config.network.routes.len(),
            config.events.templates.len()
        );
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.fleet.flight_wear_min > self.fleet.flight_wear_max {
            anyhow::bail!("flight_wear_min exceeds flight_wear_max");
        }
        if self.economy.contract_interval_days == 0 {
            anyhow::bail!("contract_interval_days must be at least 1");
        }
        if self.rivals.reputation_min > self.rivals.reputation_max {
            anyhow::bail!("rival reputation_min exceeds reputation_max");
        }
        if let Some(cap) = self.clock.max_step_ms {
            if cap <= 0.0 {
                anyhow::bail!("max_step_ms must be positive or null");
            }
        }
        for route in &self.network.routes {
            for code in [&route.origin, &route.destination] {
                if !self.network.airports.iter().any(|a| &a.code == code) {
                    anyhow::bail!("route {}-{} references unknown airport {code}",
                        route.origin, route.destination);
                }
            }
        }
        Ok(())
    }

    pub fn model(&self, model_id: &str) -> Option<&AircraftModel> {
        self.fleet.models.iter().find(|m| m.model_id == model_id)
    }

    /// A compact configuration with the same shape as data/, built in code.
    pub fn default_test() -> Self {
        let airport = |code: &str, name: &str, city: &str, landing_fee: f64| Airport {
            code: code.into(),
            name: name.into(),
            city: city.into(),
            landing_fee,
        };
        let route = |origin: &str, destination: &str, distance_km: f64, base_fare: f64, base_demand: f64| {
            RouteConfig {
                origin: origin.into(),
                destination: destination.into(),
                distance_km,
                base_fare,
                base_demand,
            }
        };
        let rival = |id: &str, name: &str, home_base: &str, reputation: f64, base_daily_income: f64| {
            RivalProfile {
                id: id.into(),
                name: name.into(),
                home_base: home_base.into(),
                reputation,
                base_daily_income,
            }
        };
        let template = |kind: &str, label: &str, adverse: bool, weight: f64, duration_days: u32,
                        demand_multiplier: f64, cost_multiplier: f64| EventTemplate {
            kind: kind.into(),
            label: label.into(),
            adverse,
            weight,
            duration_days,
            demand_multiplier,
            cost_multiplier,
        };

        Self {
            clock: ClockConfig::default(),
            company: CompanyConfig {
                name: "Test Airways".into(),
                home_base: "MAD".into(),
                starting_cash: 10_000_000.0,
                starting_reputation: 50.0,
                ranking_income_window: 7,
            },
            maintenance: MaintenanceConfig {
                minor_cost: 10_000.0,
                minor_days: 1,
                minor_restore: 20.0,
                major_cost: 50_000.0,
                major_days: 3,
                overdue_after_days: 100,
                overdue_reminder_every: 10,
            },
            fleet: FleetConfig {
                flight_wear_min: 0.5,
                flight_wear_max: 1.5,
                resale_ratio: 0.7,
                models: vec![
                    AircraftModel {
                        model_id: "atr72".into(),
                        label: "ATR 72-600".into(),
                        price: 2_500_000.0,
                        seats: 70,
                        range_km: 1_500.0,
                        fuel_burn_per_km: 1.6,
                        daily_overhead: 4_000.0,
                    },
                    AircraftModel {
                        model_id: "a320".into(),
                        label: "Airbus A320neo".into(),
                        price: 6_000_000.0,
                        seats: 180,
                        range_km: 6_000.0,
                        fuel_burn_per_km: 2.6,
                        daily_overhead: 9_000.0,
                    },
                ],
            },
            rivals: RivalConfig {
                roster: vec![
                    rival("meseta", "Meseta Air", "MAD", 60.0, 42_000.0),
                    rival("costa_brava", "Costa Brava Wings", "BCN", 55.0, 36_000.0),
                    rival("thames", "Thames Skyways", "LHR", 78.0, 95_000.0),
                    rival("seine", "Seine Aero", "CDG", 70.0, 80_000.0),
                    rival("atlantico", "Atlantico Air", "LIS", 48.0, 22_000.0),
                ],
                initial_variance: 0.15,
                variance_limit: 0.3,
                variance_step: 0.1,
                reputation_step: 1.0,
                reputation_min: 20.0,
                reputation_max: 95.0,
                competition_penalty: 0.95,
                competition_floor: 0.85,
            },
            events: EventCatalogConfig {
                daily_probability: 0.05,
                templates: vec![
                    template("fuel_crisis", "Fuel supply crisis", true, 2.0, 10, 1.0, 1.25),
                    template("storm_season", "Storm season", true, 3.0, 5, 0.85, 1.05),
                    template("labor_strike", "Air traffic control strike", true, 1.0, 3, 0.7, 1.0),
                    template("tourism_boom", "Tourism boom", false, 2.0, 7, 1.2, 1.0),
                ],
            },
            economy: EconomyConfig {
                initial_fuel_price: 0.9,
                fuel_price_min: 0.5,
                fuel_price_max: 1.8,
                fuel_volatility: 0.03,
                flights_per_day: 4.0,
                min_load_factor: 0.15,
                max_load_factor: 0.98,
                ownership_cost_per_day: 1_500.0,
                contract_interval_days: 7,
                max_offers_per_batch: 3,
                offer_valid_days: 14,
            },
            network: RouteNetworkConfig {
                airports: vec![
                    airport("MAD", "Adolfo Suárez Madrid-Barajas", "Madrid", 450.0),
                    airport("BCN", "Josep Tarradellas Barcelona-El Prat", "Barcelona", 420.0),
                    airport("LIS", "Humberto Delgado", "Lisbon", 380.0),
                    airport("CDG", "Charles de Gaulle", "Paris", 650.0),
                    airport("LHR", "Heathrow", "London", 900.0),
                    airport("AGP", "Málaga-Costa del Sol", "Málaga", 300.0),
                ],
                routes: vec![
                    route("MAD", "BCN", 483.0, 95.0, 0.85),
                    route("MAD", "LIS", 503.0, 90.0, 0.75),
                    route("MAD", "AGP", 430.0, 70.0, 0.7),
                    route("MAD", "LHR", 1_264.0, 60.0, 0.12),
                ],
                competitor_fare_drift: 0.02,
            },
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(data_dir: &str, file: &str) -> anyhow::Result<T> {
    let path = format!("{data_dir}/{file}");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
}
