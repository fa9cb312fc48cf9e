//! Simulation clock — converts real elapsed time into simulated minutes,
//! owns speed control and pause, and reports day-boundary crossings.

use crate::{
    config::ClockConfig,
    types::{SimTime, MINUTES_PER_DAY, MS_PER_MINUTE},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Real milliseconds per simulated day at x1 (25 real minutes).
pub const REAL_MS_PER_DAY_AT_X1: f64 = 1_500_000.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimSpeed {
    X1,
    X2,
    X5,
    X10,
}

impl SimSpeed {
    pub const ALL: [SimSpeed; 4] = [SimSpeed::X1, SimSpeed::X2, SimSpeed::X5, SimSpeed::X10];

    pub fn multiplier(&self) -> u32 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X5 => 5,
            Self::X10 => 10,
        }
    }

    pub fn from_multiplier(multiplier: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.multiplier() == multiplier)
    }

    /// Real milliseconds consumed per simulated minute at this speed.
    pub fn minute_length_ms(&self) -> f64 {
        REAL_MS_PER_DAY_AT_X1 / MINUTES_PER_DAY as f64 / self.multiplier() as f64
    }
}

/// One simulated day boundary crossed during an `advance` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCrossing {
    /// The calendar day that just began.
    pub date: NaiveDate,
    /// Midnight of that day in game time.
    pub at: SimTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameClock {
    pub speed: SimSpeed,
    pub minute_length_ms: f64,
    pub accumulator_ms: f64,
    pub paused: bool,
    pub now: SimTime,
    /// Per-call cap on real elapsed time. None feeds deltas through unclamped.
    pub max_step_ms: Option<f64>,
}

impl GameClock {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            speed: config.speed,
            minute_length_ms: config.speed.minute_length_ms(),
            accumulator_ms: 0.0,
            paused: config.start_paused,
            now: SimTime::from_date(config.start_date),
            max_step_ms: config.max_step_ms,
        }
    }

    /// Feed real elapsed time. Returns every day boundary crossed, in order.
    ///
    /// Paused clocks and non-positive (or NaN) deltas consume nothing.
    /// The remainder below one minute is carried to the next call.
    pub fn advance(&mut self, elapsed_real_ms: f64) -> Vec<DayCrossing> {
        let elapsed = match self.max_step_ms {
            Some(cap) => elapsed_real_ms.min(cap),
            None => elapsed_real_ms,
        };
        self.consume(elapsed)
    }

    /// Like `advance` but ignores the per-call cap. Used for fast-forward.
    pub fn advance_unclamped(&mut self, elapsed_real_ms: f64) -> Vec<DayCrossing> {
        self.consume(elapsed_real_ms)
    }

    fn consume(&mut self, elapsed: f64) -> Vec<DayCrossing> {
        if self.paused || !(elapsed > 0.0) || !elapsed.is_finite() {
            return Vec::new();
        }

        self.accumulator_ms += elapsed;
        let len = self.minute_length_ms;
        let mut minutes = (self.accumulator_ms / len).floor() as i64;
        self.accumulator_ms -= minutes as f64 * len;
        // Float residue can leave the accumulator a hair outside [0, len).
        if self.accumulator_ms >= len {
            minutes += 1;
            self.accumulator_ms -= len;
        }
        if self.accumulator_ms < 0.0 {
            self.accumulator_ms = 0.0;
        }
        if minutes == 0 {
            return Vec::new();
        }

        let before = self.now.day_index();
        self.now = self.now.plus_minutes(minutes);
        let after = self.now.day_index();

        (before + 1..=after)
            .map(|day| {
                let at = SimTime::start_of_day(day);
                DayCrossing { date: at.date(), at }
            })
            .collect()
    }

    /// Real milliseconds still needed at the current speed to reach the next midnight.
    pub fn ms_until_next_day(&self) -> f64 {
        let into_day_ms = self.now.0.rem_euclid(crate::types::MS_PER_DAY);
        let minutes_left = (crate::types::MS_PER_DAY - into_day_ms) / MS_PER_MINUTE;
        (minutes_left as f64 * self.minute_length_ms - self.accumulator_ms).max(0.0)
    }

    /// Changes the minute length immediately. The accumulator is kept and
    /// any excess over the new minute length is consumed by the next advance.
    pub fn set_speed(&mut self, speed: SimSpeed) {
        self.speed = speed;
        self.minute_length_ms = speed.minute_length_ms();
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }

    pub fn date(&self) -> NaiveDate {
        self.now.date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClockConfig;

    fn clock() -> GameClock {
        let mut config = ClockConfig::default();
        config.max_step_ms = None;
        config.start_paused = false;
        GameClock::new(&config)
    }

    #[test]
    fn one_day_of_real_time_crosses_one_boundary() {
        let mut clock = clock();
        let start = clock.now;
        let crossings = clock.advance(1041.67 * 60.0 * 24.0);
        assert_eq!(crossings.len(), 1);
        assert_eq!(clock.now.0 - start.0, 1_440 * MS_PER_MINUTE);
        assert!(clock.accumulator_ms < clock.minute_length_ms);
    }

    #[test]
    fn multi_day_delta_reports_every_boundary() {
        let mut clock = clock();
        let start_day = clock.now.day_index();
        let crossings = clock.advance(REAL_MS_PER_DAY_AT_X1 * 3.5);
        assert_eq!(crossings.len(), 3);
        for (i, c) in crossings.iter().enumerate() {
            assert_eq!(c.at.day_index(), start_day + 1 + i as i64);
        }
    }

    #[test]
    fn cap_limits_a_single_call() {
        let mut config = ClockConfig::default();
        config.start_paused = false;
        let mut clock = GameClock::new(&config);
        let start = clock.now;
        let crossings = clock.advance(REAL_MS_PER_DAY_AT_X1);
        assert!(crossings.is_empty());
        // 5000 ms at x1 is four whole minutes.
        assert_eq!(clock.now.0 - start.0, 4 * MS_PER_MINUTE);
    }

    #[test]
    fn paused_clock_does_not_accumulate() {
        let mut clock = clock();
        clock.advance(500.0);
        let remainder = clock.accumulator_ms;
        clock.toggle_pause();
        let before = clock.now;
        assert!(clock.advance(REAL_MS_PER_DAY_AT_X1).is_empty());
        assert_eq!(clock.now, before);
        assert_eq!(clock.accumulator_ms, remainder);
        clock.toggle_pause();
        clock.advance(clock.minute_length_ms - remainder + 1e-6);
        assert_eq!(clock.now.0 - before.0, MS_PER_MINUTE);
    }

    #[test]
    fn non_positive_deltas_are_ignored() {
        let mut clock = clock();
        let before = clock.clone();
        clock.advance(0.0);
        clock.advance(-250.0);
        clock.advance(f64::NAN);
        assert_eq!(clock, before);
    }

    #[test]
    fn set_speed_keeps_remainder() {
        let mut clock = clock();
        clock.advance(100.0);
        clock.set_speed(SimSpeed::X2);
        assert_eq!(clock.accumulator_ms, 100.0);
        assert!((clock.minute_length_ms - 520.833_333).abs() < 1e-3);
    }

    #[test]
    fn random_deltas_and_speed_changes_keep_clock_invariants() {
        use crate::rng::SubsystemRng;

        for seed in 0..20u64 {
            let mut rng = SubsystemRng::new(seed, 0);
            let mut config = ClockConfig::default();
            config.start_paused = false;
            let mut clamped = GameClock::new(&config);
            let mut unclamped = clock();

            for step in 0..2_000 {
                if rng.chance(0.1) {
                    let speed = SimSpeed::ALL[rng.next_u64_below(SimSpeed::ALL.len() as u64) as usize];
                    clamped.set_speed(speed);
                    unclamped.set_speed(speed);
                }
                // Up to four times the per-call cap.
                let delta = rng.range_f64(0.001, 20_000.0);
                for clk in [&mut clamped, &mut unclamped] {
                    let before = clk.now;
                    let crossings = clk.advance(delta);
                    assert!(
                        clk.accumulator_ms >= 0.0 && clk.accumulator_ms < clk.minute_length_ms,
                        "seed {seed} step {step}: accumulator {} vs minute {}",
                        clk.accumulator_ms,
                        clk.minute_length_ms
                    );
                    assert!(clk.now >= before, "seed {seed} step {step}: time went backwards");
                    assert_eq!(
                        crossings.len() as i64,
                        clk.now.day_index() - before.day_index(),
                        "seed {seed} step {step}"
                    );
                }
            }
        }
    }

    #[test]
    fn ms_until_next_day_lands_on_midnight() {
        let mut clock = clock();
        clock.advance(12_345.0);
        let crossings = clock.advance(clock.ms_until_next_day() + 1e-6);
        assert_eq!(crossings.len(), 1);
        assert_eq!(clock.now, crossings[0].at);
    }
}
