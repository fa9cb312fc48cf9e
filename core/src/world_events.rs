//! Baseline world-events model: a daily occurrence roll followed by a
//! weighted pick from the event catalogue.

use crate::{
    collaborators::{EventsModel, WorldEvent},
    config::EventCatalogConfig,
    error::SimResult,
    rng::SubsystemRng,
    types::SimTime,
};

pub struct BaselineEvents {
    config: EventCatalogConfig,
}

impl BaselineEvents {
    pub fn new(config: EventCatalogConfig) -> Self {
        Self { config }
    }
}

impl EventsModel for BaselineEvents {
    fn check_event_occurrence(
        &mut self,
        now: SimTime,
        active: &[WorldEvent],
        rng: &mut SubsystemRng,
    ) -> SimResult<Option<WorldEvent>> {
        if !rng.chance(self.config.daily_probability) {
            return Ok(None);
        }

        // A kind already running does not stack.
        let weights: Vec<f64> = self
            .config
            .templates
            .iter()
            .map(|t| {
                let running = active.iter().any(|e| e.kind == t.kind && e.is_active(now));
                if running { 0.0 } else { t.weight }
            })
            .collect();

        let Some(idx) = rng.weighted_index(&weights) else {
            return Ok(None);
        };
        let template = &self.config.templates[idx];
        Ok(Some(WorldEvent {
            id: rng.next_uuid().to_string(),
            kind: template.kind.clone(),
            label: template.label.clone(),
            adverse: template.adverse,
            demand_multiplier: template.demand_multiplier,
            cost_multiplier: template.cost_multiplier,
            started_at: now,
            expires_at: now.plus_days(template.duration_days.max(1) as i64),
        }))
    }
}
