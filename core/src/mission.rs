//! Mission records: identity, lifecycle state, per-kind progress payloads
//! and the completion history.

use crate::types::{RouteId, SimTime};
use serde::{Deserialize, Serialize};

/// Every mission in declaration order. Declaration order is activation priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MissionId {
    IntoTheBlack,
    FleetCare,
    RouteRescue,
    WeatherTheStorm,
    RegionalContender,
}

impl MissionId {
    pub const ALL: [MissionId; 5] = [
        MissionId::IntoTheBlack,
        MissionId::FleetCare,
        MissionId::RouteRescue,
        MissionId::WeatherTheStorm,
        MissionId::RegionalContender,
    ];

    pub fn prerequisites(&self) -> &'static [MissionId] {
        match self {
            Self::IntoTheBlack => &[],
            Self::FleetCare | Self::RouteRescue | Self::WeatherTheStorm => &[Self::IntoTheBlack],
            Self::RegionalContender => &[Self::RouteRescue, Self::FleetCare],
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::IntoTheBlack => "Into the Black",
            Self::FleetCare => "Fleet Care",
            Self::RouteRescue => "Route Rescue",
            Self::WeatherTheStorm => "Weather the Storm",
            Self::RegionalContender => "Regional Contender",
        }
    }

    /// Fresh progress payload for this mission, all counters zeroed.
    pub fn initial_progress(&self) -> MissionProgress {
        match self {
            Self::IntoTheBlack => MissionProgress::IntoTheBlack { consecutive_profitable_days: 0 },
            Self::FleetCare => MissionProgress::FleetCare { days_elapsed: 0, worst_condition: None },
            Self::RouteRescue => MissionProgress::RouteRescue {
                route_id: None,
                consecutive_profitable_days: 0,
                days_observed: 0,
            },
            Self::WeatherTheStorm => MissionProgress::WeatherTheStorm {
                event_id: None,
                days_survived: 0,
            },
            Self::RegionalContender => MissionProgress::RegionalContender { best_position: None },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissionState {
    Locked,
    Active,
    Succeeded,
    Failed,
}

impl MissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Per-kind progress. The variant identifies the mission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mission", rename_all = "snake_case")]
pub enum MissionProgress {
    IntoTheBlack {
        #[serde(default)]
        consecutive_profitable_days: u32,
    },
    FleetCare {
        #[serde(default)]
        days_elapsed: u32,
        #[serde(default)]
        worst_condition: Option<f64>,
    },
    RouteRescue {
        #[serde(default)]
        route_id: Option<RouteId>,
        #[serde(default)]
        consecutive_profitable_days: u32,
        #[serde(default)]
        days_observed: u32,
    },
    WeatherTheStorm {
        #[serde(default)]
        event_id: Option<String>,
        #[serde(default)]
        days_survived: u32,
    },
    RegionalContender {
        #[serde(default)]
        best_position: Option<usize>,
    },
}

impl MissionProgress {
    pub fn mission_id(&self) -> MissionId {
        match self {
            Self::IntoTheBlack { .. } => MissionId::IntoTheBlack,
            Self::FleetCare { .. } => MissionId::FleetCare,
            Self::RouteRescue { .. } => MissionId::RouteRescue,
            Self::WeatherTheStorm { .. } => MissionId::WeatherTheStorm,
            Self::RegionalContender { .. } => MissionId::RegionalContender,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mission {
    pub state: MissionState,
    pub progress: MissionProgress,
    pub activated_at: Option<SimTime>,
    pub completed_at: Option<SimTime>,
}

impl Mission {
    pub fn locked(id: MissionId) -> Self {
        Self {
            state: MissionState::Locked,
            progress: id.initial_progress(),
            activated_at: None,
            completed_at: None,
        }
    }

    pub fn id(&self) -> MissionId {
        self.progress.mission_id()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MissionReward {
    pub reputation: f64,
    pub cash: f64,
    /// (multiplier, duration in days)
    pub cost_reduction: Option<(f64, u32)>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionRecord {
    pub mission: MissionId,
    pub outcome: MissionState,
    pub activated_at: Option<SimTime>,
    pub completed_at: SimTime,
    pub reward: Option<MissionReward>,
}

/// All missions in declaration order plus the completion history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionBook {
    pub missions: Vec<Mission>,
    pub history: Vec<MissionRecord>,
}

impl Default for MissionBook {
    fn default() -> Self {
        Self {
            missions: MissionId::ALL.iter().map(|id| Mission::locked(*id)).collect(),
            history: Vec::new(),
        }
    }
}

impl MissionBook {
    pub fn get(&self, id: MissionId) -> Option<&Mission> {
        self.missions.iter().find(|m| m.id() == id)
    }

    pub fn state_of(&self, id: MissionId) -> MissionState {
        self.get(id).map(|m| m.state).unwrap_or(MissionState::Locked)
    }

    pub fn active(&self) -> Option<&Mission> {
        self.missions.iter().find(|m| m.state == MissionState::Active)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.missions.iter().position(|m| m.state == MissionState::Active)
    }

    pub fn active_count(&self) -> usize {
        self.missions.iter().filter(|m| m.state == MissionState::Active).count()
    }

    pub fn prerequisites_met(&self, id: MissionId) -> bool {
        id.prerequisites()
            .iter()
            .all(|p| self.state_of(*p) == MissionState::Succeeded)
    }
}
