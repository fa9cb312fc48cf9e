//! Baseline route network: the player's open routes, the market of routes
//! that may be opened, airport lookups and competitor fare drift.

use crate::{
    collaborators::{Route, RouteData},
    config::{Airport, RouteConfig, RouteNetworkConfig},
    error::{SimError, SimResult},
    rng::SubsystemRng,
    types::RouteId,
};
use std::collections::BTreeMap;

/// Competitor fares stay within this band of our own fare.
pub const COMPETITOR_FARE_BAND: (f64, f64) = (0.7, 1.3);

pub struct RouteNetwork {
    airports: Vec<Airport>,
    market: Vec<RouteConfig>,
    open: BTreeMap<RouteId, Route>,
    fare_drift: f64,
}

impl RouteNetwork {
    /// Every configured route starts open.
    pub fn new(config: &RouteNetworkConfig) -> Self {
        let open = configured_routes(config)
            .into_iter()
            .map(|route| (route.id.clone(), route))
            .collect();
        Self {
            airports: config.airports.clone(),
            market: config.routes.clone(),
            open,
            fare_drift: config.competitor_fare_drift,
        }
    }
}

/// The routes of a fresh game, at their base fares.
pub fn configured_routes(config: &RouteNetworkConfig) -> Vec<Route> {
    config.routes.iter().map(route_from_config).collect()
}

fn route_from_config(rc: &RouteConfig) -> Route {
    Route {
        id: RouteId::between(&rc.origin, &rc.destination),
        origin: rc.origin.clone(),
        destination: rc.destination.clone(),
        distance_km: rc.distance_km,
        fare: rc.base_fare,
        base_demand: rc.base_demand,
        competitor_fare: rc.base_fare,
    }
}

impl RouteData for RouteNetwork {
    fn routes(&self) -> SimResult<Vec<Route>> {
        Ok(self.open.values().cloned().collect())
    }

    fn route(&self, id: &RouteId) -> SimResult<Option<Route>> {
        Ok(self.open.get(id).cloned())
    }

    fn airport(&self, code: &str) -> Option<Airport> {
        self.airports.iter().find(|a| a.code == code).cloned()
    }

    fn update_competitor_prices(&mut self, rng: &mut SubsystemRng) -> SimResult<()> {
        let (lo, hi) = COMPETITOR_FARE_BAND;
        for route in self.open.values_mut() {
            let drifted = route.competitor_fare * (1.0 + rng.jitter(self.fare_drift));
            route.competitor_fare = drifted.clamp(route.fare * lo, route.fare * hi);
        }
        Ok(())
    }

    fn open_route(&mut self, origin: &str, destination: &str) -> SimResult<RouteId> {
        let id = RouteId::between(origin, destination);
        if self.open.contains_key(&id) {
            return Err(SimError::invalid_state(id.to_string(), "route is already open"));
        }
        let config = self
            .market
            .iter()
            .find(|rc| rc.origin == origin && rc.destination == destination)
            .ok_or_else(|| SimError::not_found("Route", &id))?;
        self.open.insert(id.clone(), route_from_config(config));
        log::info!("route opened: {id}");
        Ok(id)
    }

    fn close_route(&mut self, id: &RouteId) -> SimResult<()> {
        self.open
            .remove(id)
            .map(|_| log::info!("route closed: {id}"))
            .ok_or_else(|| SimError::not_found("Route", id))
    }

    fn export_routes(&self) -> Vec<Route> {
        self.open.values().cloned().collect()
    }

    fn restore_routes(&mut self, routes: Vec<Route>) {
        self.open = routes.into_iter().map(|r| (r.id.clone(), r)).collect();
        log::info!("route network restored with {} open route(s)", self.open.len());
    }
}
