//! Aircraft records and the index-stable fleet container.
//!
//! RULE: Aircraft are keyed by AircraftId, allocated monotonically.
//! Removing one never shifts another, so ids held across a cascade stay valid.

use crate::{
    config::AircraftModel,
    error::{SimError, SimResult},
    types::{AircraftId, RouteId, SimTime},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CONDITION_MIN: f64 = 0.0;
pub const CONDITION_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AircraftStatus {
    Idle,
    Flight,
    Maintenance,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceKind {
    None,
    Minor,
    Major,
}

/// Work in progress on an aircraft. Present iff status is Maintenance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaintenanceOrder {
    pub kind: MaintenanceKind,
    pub days_left: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Aircraft {
    pub id: AircraftId,
    pub model_id: String,
    pub catalog_price: f64,
    pub seats: u32,
    pub fuel_burn_per_km: f64,
    pub daily_overhead: f64,
    pub status: AircraftStatus,
    pub condition: f64,
    pub maintenance: Option<MaintenanceOrder>,
    pub days_since_last_maintenance: u32,
    /// Present iff status is Flight.
    pub route_id: Option<RouteId>,
    pub purchased_at: SimTime,
}

impl Aircraft {
    pub fn from_model(id: AircraftId, model: &AircraftModel, purchased_at: SimTime) -> Self {
        Self {
            id,
            model_id: model.model_id.clone(),
            catalog_price: model.price,
            seats: model.seats,
            fuel_burn_per_km: model.fuel_burn_per_km,
            daily_overhead: model.daily_overhead,
            status: AircraftStatus::Idle,
            condition: CONDITION_MAX,
            maintenance: None,
            days_since_last_maintenance: 0,
            route_id: None,
            purchased_at,
        }
    }

    pub fn maintenance_kind(&self) -> MaintenanceKind {
        self.maintenance.map(|m| m.kind).unwrap_or(MaintenanceKind::None)
    }

    pub fn maintenance_days_left(&self) -> Option<u32> {
        self.maintenance.map(|m| m.days_left)
    }

    /// Every condition mutation goes through here.
    pub fn set_condition(&mut self, value: f64) {
        self.condition = value.clamp(CONDITION_MIN, CONDITION_MAX);
    }

    pub fn is_idle(&self) -> bool {
        self.status == AircraftStatus::Idle
    }

    pub(crate) fn require_status(&self, expected: AircraftStatus, action: &str) -> SimResult<()> {
        if self.status != expected {
            return Err(SimError::invalid_state(
                self.id.to_string(),
                format!("cannot {action} while {:?}", self.status),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(from = "FleetRepr", into = "FleetRepr")]
pub struct Fleet {
    aircraft: BTreeMap<AircraftId, Aircraft>,
    next_id: u32,
}

/// Serialized form: a plain list keeps snapshot JSON free of non-string map keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FleetRepr {
    next_id: u32,
    aircraft: Vec<Aircraft>,
}

impl From<FleetRepr> for Fleet {
    fn from(repr: FleetRepr) -> Self {
        let mut fleet = Fleet { aircraft: BTreeMap::new(), next_id: repr.next_id };
        for a in repr.aircraft {
            fleet.next_id = fleet.next_id.max(a.id.0 + 1);
            fleet.aircraft.insert(a.id, a);
        }
        fleet
    }
}

impl From<Fleet> for FleetRepr {
    fn from(fleet: Fleet) -> Self {
        Self {
            next_id: fleet.next_id,
            aircraft: fleet.aircraft.into_values().collect(),
        }
    }
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and insert a fresh Idle aircraft of `model`.
    pub fn add(&mut self, model: &AircraftModel, now: SimTime) -> AircraftId {
        let id = AircraftId(self.next_id);
        self.next_id += 1;
        self.aircraft.insert(id, Aircraft::from_model(id, model, now));
        id
    }

    /// Insert a fully formed record (snapshot restore). The id allocator moves past it.
    pub fn insert(&mut self, aircraft: Aircraft) {
        self.next_id = self.next_id.max(aircraft.id.0 + 1);
        self.aircraft.insert(aircraft.id, aircraft);
    }

    /// Never moves the allocator backwards.
    pub(crate) fn reserve_ids(&mut self, next_id: u32) {
        self.next_id = self.next_id.max(next_id);
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn contains(&self, id: AircraftId) -> bool {
        self.aircraft.contains_key(&id)
    }

    pub fn remove(&mut self, id: AircraftId) -> SimResult<Aircraft> {
        self.aircraft
            .remove(&id)
            .ok_or_else(|| SimError::not_found("Aircraft", id))
    }

    pub fn get(&self, id: AircraftId) -> SimResult<&Aircraft> {
        self.aircraft.get(&id).ok_or_else(|| SimError::not_found("Aircraft", id))
    }

    pub fn get_mut(&mut self, id: AircraftId) -> SimResult<&mut Aircraft> {
        self.aircraft.get_mut(&id).ok_or_else(|| SimError::not_found("Aircraft", id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Aircraft> {
        self.aircraft.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Aircraft> {
        self.aircraft.values_mut()
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    pub fn count_with_status(&self, status: AircraftStatus) -> usize {
        self.iter().filter(|a| a.status == status).count()
    }

    pub fn on_route<'a>(&'a self, route_id: &'a RouteId) -> impl Iterator<Item = &'a Aircraft> + 'a {
        self.iter().filter(move |a| a.route_id.as_ref() == Some(route_id))
    }

    pub fn worst_condition(&self) -> Option<f64> {
        self.iter().map(|a| a.condition).min_by(|a, b| a.total_cmp(b))
    }
}
