//! Baseline economy engine — fuel market random walk, per-route daily
//! settlement and periodic contract offers.
//!
//! This engine is REACTIVE. It reads the EconomyView it is handed and
//! returns figures; the cascade applies them to the company.

use crate::{
    collaborators::{
        ContractOffer, DailySettlement, EconomyEngine, EconomyView, Route, RouteCostBreakdown, RouteResult,
    },
    config::{EconomyConfig, RivalConfig, RouteNetworkConfig},
    error::SimResult,
    fleet::{Aircraft, AircraftStatus, CONDITION_MAX},
    rival_subsystem::competition_factor,
    rng::SubsystemRng,
};
use std::collections::HashMap;

/// Fare premium/discount band against the competitor fare.
const PRICE_FACTOR_MIN: f64 = 0.7;
const PRICE_FACTOR_MAX: f64 = 1.2;

pub struct BaselineEconomy {
    config: EconomyConfig,
    rivals: RivalConfig,
    landing_fees: HashMap<String, f64>,
}

impl BaselineEconomy {
    pub fn new(config: EconomyConfig, rivals: RivalConfig, network: &RouteNetworkConfig) -> Self {
        let landing_fees = network
            .airports
            .iter()
            .map(|a| (a.code.clone(), a.landing_fee))
            .collect();
        Self { config, rivals, landing_fees }
    }

    fn load_factor(&self, route: &Route, view: &EconomyView<'_>) -> f64 {
        let competition = competition_factor(&self.rivals, view.rivals, &route.origin, &route.destination);
        let price = if route.fare > 0.0 {
            (route.competitor_fare / route.fare).clamp(PRICE_FACTOR_MIN, PRICE_FACTOR_MAX)
        } else {
            PRICE_FACTOR_MAX
        };
        let reputation = 0.8 + view.company.reputation / 250.0;
        (route.base_demand * competition * price * reputation * view.demand_multiplier)
            .clamp(self.config.min_load_factor, self.config.max_load_factor)
    }

    fn route_revenue(&self, route: &Route, aircraft: &Aircraft, view: &EconomyView<'_>) -> f64 {
        aircraft.seats as f64 * self.load_factor(route, view) * route.fare * self.config.flights_per_day
    }
}

impl EconomyEngine for BaselineEconomy {
    fn update_daily_fuel(&mut self, current_price: f64, rng: &mut SubsystemRng) -> SimResult<f64> {
        let next = current_price * (1.0 + rng.jitter(self.config.fuel_volatility));
        Ok(next.clamp(self.config.fuel_price_min, self.config.fuel_price_max))
    }

    fn process_daily(&mut self, view: &EconomyView<'_>) -> SimResult<DailySettlement> {
        let mut settlement = DailySettlement::default();
        let ownership = self.config.ownership_cost_per_day * view.cost_multiplier;

        for aircraft in view.fleet.iter() {
            let flying = match (&aircraft.status, &aircraft.route_id) {
                (AircraftStatus::Flight, Some(route_id)) => view.routes.iter().find(|r| &r.id == route_id),
                _ => None,
            };

            match flying {
                Some(route) => {
                    let revenue = self.route_revenue(route, aircraft, view);
                    let costs = self.calculate_route_costs(route, aircraft, view).total + ownership;
                    settlement.gross += revenue;
                    settlement.costs += costs;
                    settlement.routes.push(RouteResult {
                        route_id: route.id.clone(),
                        aircraft_id: aircraft.id,
                        revenue,
                        costs,
                        net: revenue - costs,
                    });
                }
                None => settlement.costs += ownership,
            }
        }

        settlement.net = settlement.gross - settlement.costs;
        log::debug!(
            "day={} settlement: gross={:.0} costs={:.0} net={:.0}",
            view.day, settlement.gross, settlement.costs, settlement.net
        );
        Ok(settlement)
    }

    fn calculate_route_costs(&self, route: &Route, aircraft: &Aircraft, view: &EconomyView<'_>) -> RouteCostBreakdown {
        let flights = self.config.flights_per_day;
        let m = view.cost_multiplier;
        let fuel = route.distance_km * aircraft.fuel_burn_per_km * view.fuel_price * flights * m;
        let fee = |code: &str| self.landing_fees.get(code).copied().unwrap_or(0.0);
        // Flights alternate direction, so each end sees half the landings.
        let landing_fees = (fee(&route.origin) + fee(&route.destination)) * flights / 2.0 * m;
        let wear_penalty = 1.0 + (CONDITION_MAX - aircraft.condition) / 200.0;
        let overhead = aircraft.daily_overhead * wear_penalty * m;
        RouteCostBreakdown {
            fuel,
            landing_fees,
            overhead,
            total: fuel + landing_fees + overhead,
        }
    }

    fn generate_contract_offers(
        &mut self,
        view: &EconomyView<'_>,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<ContractOffer>> {
        if view.routes.is_empty() || self.config.max_offers_per_batch == 0 {
            return Ok(Vec::new());
        }
        let count = 1 + rng.next_u64_below(self.config.max_offers_per_batch);
        let offers = (0..count)
            .map(|_| {
                let route = &view.routes[rng.next_u64_below(view.routes.len() as u64) as usize];
                ContractOffer {
                    id: rng.next_uuid().to_string(),
                    origin: route.origin.clone(),
                    destination: route.destination.clone(),
                    payment: (route.distance_km * rng.range_f64(40.0, 80.0)).round(),
                    expires_at: view.now.plus_days(self.config.offer_valid_days as i64),
                }
            })
            .collect();
        Ok(offers)
    }
}
