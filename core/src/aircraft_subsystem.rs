//! Aircraft lifecycle — daily wear, maintenance scheduling and completion,
//! and the fleet commands that buy, sell, assign and ground aircraft.
//!
//! Execution: `tick_fleet` runs once per simulated day, sixth in the cascade.
//! Commands run strictly between ticks and are all-or-nothing: every check
//! happens before the first mutation.

use crate::{
    collaborators::Route,
    company::Company,
    config::{AircraftModel, FleetConfig, MaintenanceConfig},
    error::{SimError, SimResult},
    event::SimEvent,
    fleet::{Aircraft, AircraftStatus, Fleet, MaintenanceKind, MaintenanceOrder, CONDITION_MAX},
    rng::SubsystemRng,
    types::{AircraftId, DayNumber, SimTime},
};

pub struct AircraftLifecycle {
    maintenance: MaintenanceConfig,
    fleet: FleetConfig,
}

impl AircraftLifecycle {
    pub fn new(maintenance: MaintenanceConfig, fleet: FleetConfig) -> Self {
        Self { maintenance, fleet }
    }

    /// (cost, duration in days) for a maintenance kind.
    pub fn maintenance_terms(&self, kind: MaintenanceKind) -> SimResult<(f64, u32)> {
        match kind {
            MaintenanceKind::Minor => Ok((self.maintenance.minor_cost, self.maintenance.minor_days)),
            MaintenanceKind::Major => Ok((self.maintenance.major_cost, self.maintenance.major_days)),
            MaintenanceKind::None => Err(SimError::invalid_state(
                "maintenance order",
                "kind must be minor or major",
            )),
        }
    }

    /// Apply one simulated day to a single aircraft.
    pub fn daily_tick(
        &self,
        day: DayNumber,
        aircraft: &mut Aircraft,
        rng: &mut SubsystemRng,
    ) -> Vec<SimEvent> {
        let mut out = Vec::new();

        aircraft.days_since_last_maintenance = aircraft.days_since_last_maintenance.saturating_add(1);

        match aircraft.status {
            AircraftStatus::Flight => {
                let wear = rng.range_f64(self.fleet.flight_wear_min, self.fleet.flight_wear_max);
                aircraft.set_condition(aircraft.condition - wear);
            }
            AircraftStatus::Maintenance => {
                if let Some(done) = self.progress_maintenance(aircraft) {
                    log::info!(
                        "day={day} {} {:?} maintenance complete, condition {:.1}",
                        aircraft.id, done, aircraft.condition
                    );
                    out.push(SimEvent::MaintenanceCompleted {
                        day,
                        aircraft_id: aircraft.id,
                        kind: done,
                        condition: aircraft.condition,
                    });
                }
            }
            AircraftStatus::Idle => {}
        }

        let since = aircraft.days_since_last_maintenance;
        if since > self.maintenance.overdue_after_days
            && since % self.maintenance.overdue_reminder_every.max(1) == 0
        {
            log::warn!("day={day} {} overdue for maintenance ({since} days)", aircraft.id);
            out.push(SimEvent::MaintenanceOverdue {
                day,
                aircraft_id: aircraft.id,
                days_since_maintenance: since,
            });
        }

        out
    }

    /// Count down an order; completes it at zero. Returns the completed kind.
    fn progress_maintenance(&self, aircraft: &mut Aircraft) -> Option<MaintenanceKind> {
        let order = match aircraft.maintenance.as_mut() {
            Some(order) => order,
            None => {
                // Maintenance without an order cannot complete; release it.
                aircraft.status = AircraftStatus::Idle;
                return None;
            }
        };
        order.days_left = order.days_left.saturating_sub(1);
        if order.days_left > 0 {
            return None;
        }

        let kind = order.kind;
        let restored = match kind {
            MaintenanceKind::Minor => aircraft.condition + self.maintenance.minor_restore,
            MaintenanceKind::Major | MaintenanceKind::None => CONDITION_MAX,
        };
        aircraft.set_condition(restored);
        aircraft.status = AircraftStatus::Idle;
        aircraft.maintenance = None;
        aircraft.days_since_last_maintenance = 0;
        Some(kind)
    }

    /// Run the daily tick for every owned aircraft in id order.
    pub fn tick_fleet(&self, day: DayNumber, fleet: &mut Fleet, rng: &mut SubsystemRng) -> Vec<SimEvent> {
        fleet
            .iter_mut()
            .flat_map(|aircraft| self.daily_tick(day, aircraft, rng))
            .collect()
    }

    pub fn start_maintenance(
        &self,
        day: DayNumber,
        fleet: &mut Fleet,
        company: &mut Company,
        id: AircraftId,
        kind: MaintenanceKind,
    ) -> SimResult<SimEvent> {
        let (cost, days) = self.maintenance_terms(kind)?;
        let aircraft = fleet.get_mut(id)?;
        aircraft.require_status(AircraftStatus::Idle, "start maintenance")?;
        company.debit(cost)?;

        aircraft.status = AircraftStatus::Maintenance;
        aircraft.maintenance = Some(MaintenanceOrder { kind, days_left: days });
        log::info!("day={day} {id} entered {kind:?} maintenance for {days} day(s), cost {cost:.0}");
        Ok(SimEvent::MaintenanceStarted { day, aircraft_id: id, kind, cost, days })
    }

    pub fn purchase(
        &self,
        day: DayNumber,
        now: SimTime,
        fleet: &mut Fleet,
        company: &mut Company,
        model_id: &str,
    ) -> SimResult<SimEvent> {
        let model = self.model(model_id)?;
        company.debit(model.price)?;
        let aircraft_id = fleet.add(model, now);
        log::info!("day={day} purchased {aircraft_id} ({}) for {:.0}", model.label, model.price);
        Ok(SimEvent::AircraftPurchased {
            day,
            aircraft_id,
            model_id: model.model_id.clone(),
            price: model.price,
        })
    }

    /// Remove an aircraft and credit the resale share of its catalog price.
    pub fn sell(
        &self,
        day: DayNumber,
        fleet: &mut Fleet,
        company: &mut Company,
        id: AircraftId,
    ) -> SimResult<SimEvent> {
        let aircraft = fleet.remove(id)?;
        let proceeds = aircraft.catalog_price * self.fleet.resale_ratio;
        company.credit(proceeds);
        log::info!("day={day} sold {id} for {proceeds:.0}");
        Ok(SimEvent::AircraftSold { day, aircraft_id: id, proceeds })
    }

    /// Idle → Flight on `route`. Fails when the route exceeds the model's range.
    pub fn assign_route(
        &self,
        day: DayNumber,
        fleet: &mut Fleet,
        id: AircraftId,
        route: &Route,
    ) -> SimResult<SimEvent> {
        let aircraft = fleet.get_mut(id)?;
        aircraft.require_status(AircraftStatus::Idle, "assign a route")?;
        if let Ok(model) = self.model(&aircraft.model_id) {
            if route.distance_km > model.range_km {
                return Err(SimError::invalid_state(
                    id.to_string(),
                    format!("{} km exceeds {} range of {} km", route.distance_km, model.label, model.range_km),
                ));
            }
        }
        aircraft.status = AircraftStatus::Flight;
        aircraft.route_id = Some(route.id.clone());
        Ok(SimEvent::AircraftAssigned { day, aircraft_id: id, route_id: route.id.clone() })
    }

    pub fn ground(&self, day: DayNumber, fleet: &mut Fleet, id: AircraftId) -> SimResult<SimEvent> {
        let aircraft = fleet.get_mut(id)?;
        aircraft.require_status(AircraftStatus::Flight, "ground")?;
        aircraft.status = AircraftStatus::Idle;
        aircraft.route_id = None;
        Ok(SimEvent::AircraftGrounded { day, aircraft_id: id })
    }

    pub fn model(&self, model_id: &str) -> SimResult<&AircraftModel> {
        self.fleet
            .models
            .iter()
            .find(|m| m.model_id == model_id)
            .ok_or_else(|| SimError::not_found("Aircraft model", model_id))
    }
}
