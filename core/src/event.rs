//! The event log — every state change the daily cascade and the player
//! commands make is described by a SimEvent.
//!
//! RULE: The cascade reports what happened ONLY through events.
//! Notifications for the UI are derived from events, never the reverse.

use crate::{
    fleet::MaintenanceKind,
    mission::MissionId,
    types::{AircraftId, DayNumber, RouteId, RunId, SimTime},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Every event emitted during simulation.
/// Variants are appended — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    RunInitialized {
        run_id: RunId,
        seed: u64,
    },
    DayStarted {
        day: DayNumber,
        date: NaiveDate,
    },
    DayCompleted {
        day: DayNumber,
        partial: bool,
    },
    CascadeStepFailed {
        day: DayNumber,
        step: String,
        reason: String,
    },
    SnapshotRestored {
        day: DayNumber,
        repairs: usize,
    },

    // ── World events ───────────────────────────────
    WorldEventStarted {
        day: DayNumber,
        event_id: String,
        kind: String,
        adverse: bool,
        expires_at: SimTime,
    },
    WorldEventExpired {
        day: DayNumber,
        event_id: String,
        kind: String,
    },

    // ── Economy ────────────────────────────────────
    FuelPriceUpdated {
        day: DayNumber,
        price: f64,
    },
    DailySettled {
        day: DayNumber,
        gross: f64,
        costs: f64,
        net: f64,
        cash_after: f64,
    },
    CostReductionExpired {
        day: DayNumber,
        multiplier: f64,
    },
    ContractOffersGenerated {
        day: DayNumber,
        count: usize,
    },

    // ── Competitors ────────────────────────────────
    CompetitorsUpdated {
        day: DayNumber,
        rivals: usize,
        leader: Option<String>,
    },

    // ── Fleet ──────────────────────────────────────
    AircraftPurchased {
        day: DayNumber,
        aircraft_id: AircraftId,
        model_id: String,
        price: f64,
    },
    AircraftSold {
        day: DayNumber,
        aircraft_id: AircraftId,
        proceeds: f64,
    },
    AircraftAssigned {
        day: DayNumber,
        aircraft_id: AircraftId,
        route_id: RouteId,
    },
    AircraftGrounded {
        day: DayNumber,
        aircraft_id: AircraftId,
    },
    MaintenanceStarted {
        day: DayNumber,
        aircraft_id: AircraftId,
        kind: MaintenanceKind,
        cost: f64,
        days: u32,
    },
    MaintenanceCompleted {
        day: DayNumber,
        aircraft_id: AircraftId,
        kind: MaintenanceKind,
        condition: f64,
    },
    MaintenanceOverdue {
        day: DayNumber,
        aircraft_id: AircraftId,
        days_since_maintenance: u32,
    },

    // ── Missions ───────────────────────────────────
    MissionActivated {
        day: DayNumber,
        mission: MissionId,
    },
    MissionSucceeded {
        day: DayNumber,
        mission: MissionId,
        reputation_delta: f64,
        cash_delta: f64,
    },
    MissionFailed {
        day: DayNumber,
        mission: MissionId,
    },

    // ── Route network ──────────────────────────────
    RouteOpened {
        day: DayNumber,
        route_id: RouteId,
    },
    RouteClosed {
        day: DayNumber,
        route_id: RouteId,
        grounded: usize,
    },
}

impl SimEvent {
    /// Stable string name of the variant.
    /// Used for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. }         => "run_initialized",
            Self::DayStarted { .. }             => "day_started",
            Self::DayCompleted { .. }           => "day_completed",
            Self::CascadeStepFailed { .. }      => "cascade_step_failed",
            Self::SnapshotRestored { .. }       => "snapshot_restored",
            Self::WorldEventStarted { .. }      => "world_event_started",
            Self::WorldEventExpired { .. }      => "world_event_expired",
            Self::FuelPriceUpdated { .. }       => "fuel_price_updated",
            Self::DailySettled { .. }           => "daily_settled",
            Self::CostReductionExpired { .. }   => "cost_reduction_expired",
            Self::ContractOffersGenerated { .. }=> "contract_offers_generated",
            Self::CompetitorsUpdated { .. }     => "competitors_updated",
            Self::AircraftPurchased { .. }      => "aircraft_purchased",
            Self::AircraftSold { .. }           => "aircraft_sold",
            Self::AircraftAssigned { .. }       => "aircraft_assigned",
            Self::AircraftGrounded { .. }       => "aircraft_grounded",
            Self::MaintenanceStarted { .. }     => "maintenance_started",
            Self::MaintenanceCompleted { .. }   => "maintenance_completed",
            Self::MaintenanceOverdue { .. }     => "maintenance_overdue",
            Self::MissionActivated { .. }       => "mission_activated",
            Self::MissionSucceeded { .. }       => "mission_succeeded",
            Self::MissionFailed { .. }          => "mission_failed",
            Self::RouteOpened { .. }            => "route_opened",
            Self::RouteClosed { .. }            => "route_closed",
        }
    }
}

impl SimEvent {
    /// The cascade step or surface that produced the event.
    /// Used for the source column in event_log.
    pub fn source(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. }
            | Self::DayStarted { .. }
            | Self::DayCompleted { .. }
            | Self::CascadeStepFailed { .. }
            | Self::SnapshotRestored { .. } => "engine",
            Self::WorldEventStarted { .. } | Self::WorldEventExpired { .. } => "world_events",
            Self::FuelPriceUpdated { .. } => "fuel_market",
            Self::DailySettled { .. } | Self::CostReductionExpired { .. } => "settlement",
            Self::ContractOffersGenerated { .. } => "contract_offers",
            Self::CompetitorsUpdated { .. } => "competitors",
            Self::AircraftPurchased { .. }
            | Self::AircraftSold { .. }
            | Self::AircraftAssigned { .. }
            | Self::AircraftGrounded { .. }
            | Self::MaintenanceStarted { .. }
            | Self::RouteOpened { .. }
            | Self::RouteClosed { .. } => "command",
            Self::MaintenanceCompleted { .. } | Self::MaintenanceOverdue { .. } => "aircraft",
            Self::MissionActivated { .. } | Self::MissionSucceeded { .. } | Self::MissionFailed { .. } => {
                "missions"
            }
        }
    }
}

/// Side-channel messages for the UI. Never block the simulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    MaintenanceOverdue {
        aircraft_id: AircraftId,
        days_since_maintenance: u32,
    },
    MissionResolved {
        mission: MissionId,
        succeeded: bool,
    },
    CascadeStepFailed {
        day: DayNumber,
        step: String,
        reason: String,
    },
    PersistenceFailed {
        reason: String,
    },
    DataRepaired {
        field: String,
        detail: String,
    },
}

impl Notification {
    /// Lift the events a player should hear about into notifications.
    pub fn from_event(event: &SimEvent) -> Option<Self> {
        match event {
            SimEvent::MaintenanceOverdue { aircraft_id, days_since_maintenance, .. } => {
                Some(Self::MaintenanceOverdue {
                    aircraft_id: *aircraft_id,
                    days_since_maintenance: *days_since_maintenance,
                })
            }
            SimEvent::MissionSucceeded { mission, .. } => {
                Some(Self::MissionResolved { mission: *mission, succeeded: true })
            }
            SimEvent::MissionFailed { mission, .. } => {
                Some(Self::MissionResolved { mission: *mission, succeeded: false })
            }
            SimEvent::CascadeStepFailed { day, step, reason } => Some(Self::CascadeStepFailed {
                day: *day,
                step: step.clone(),
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub day: DayNumber,
    pub source: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized SimEvent
}

impl EventLogEntry {
    pub fn from_event(run_id: &str, day: DayNumber, source: &str, event: &SimEvent) -> serde_json::Result<Self> {
        Ok(Self {
            id: None,
            run_id: run_id.to_string(),
            day,
            source: source.to_string(),
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(event)?,
        })
    }
}
