use serde::{Deserialize, Serialize};
use crate::{
    clock::SimSpeed,
    fleet::MaintenanceKind,
    types::{AircraftId, RouteId},
};

/// All player-issued commands. Applied strictly between ticks.
/// Variants are appended — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Clock control ─────────────────────────────
    Pause,
    Resume,
    TogglePause,
    SetSpeed { speed: SimSpeed },

    // ── Fleet ─────────────────────────────────────
    PurchaseAircraft {
        model_id: String,
    },
    SellAircraft {
        aircraft_id: AircraftId,
    },
    StartMaintenance {
        aircraft_id: AircraftId,
        kind:        MaintenanceKind,
    },
    AssignRoute {
        aircraft_id: AircraftId,
        route_id:    RouteId,
    },
    Ground {
        aircraft_id: AircraftId,
    },

    // ── Route network ─────────────────────────────
    OpenRoute {
        origin:      String,
        destination: String,
    },
    CloseRoute {
        route_id: RouteId,
    },
}

impl PlayerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pause                  => "pause",
            Self::Resume                 => "resume",
            Self::TogglePause            => "toggle_pause",
            Self::SetSpeed { .. }        => "set_speed",
            Self::PurchaseAircraft { .. }=> "purchase_aircraft",
            Self::SellAircraft { .. }    => "sell_aircraft",
            Self::StartMaintenance { .. }=> "start_maintenance",
            Self::AssignRoute { .. }     => "assign_route",
            Self::Ground { .. }          => "ground",
            Self::OpenRoute { .. }       => "open_route",
            Self::CloseRoute { .. }      => "close_route",
        }
    }
}
