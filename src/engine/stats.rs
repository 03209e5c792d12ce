//! Stats - Per-tick speed and stamina policies
//!
//! Two policies turn an animal's base attributes and current stamina into a
//! speed for the next tick. Circular courses use `Smoothed`, segmented courses
//! use `Threshold`.

use serde::{Deserialize, Serialize};

use crate::engine::animal::{RaceParticipant, STAT_MAX};

/// Source of uniform samples in `[0, 1)` for temper jitter
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

impl<R: rand::RngCore> RandomSource for R {
    fn next_unit(&mut self) -> f64 {
        rand::Rng::gen::<f64>(self)
    }
}

/// Speed/stamina policy applied to every running participant each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatPolicy {
    /// Stat-driven drain with exponential approach toward a jittered target
    Smoothed,
    /// Flat drain/regen with a hard exhausted speed below 20% stamina
    Threshold,
}

impl StatPolicy {
    /// Top-speed multiplier shared by both policies
    const SPEED_SCALE: f64 = 15.0;

    // Smoothed
    const DRAIN_PER_MISSING_POINT: f64 = 0.001;
    const MIN_STAMINA_FACTOR: f64 = 0.3;
    const TEMPER_SPREAD: f64 = 0.2;
    const RESPONSE_RATE: f64 = 5.0;

    // Threshold
    const EXERTION_SPEED: f64 = 10.0;
    const EXERTION_DRAIN: f64 = 10.0;
    const REST_REGEN: f64 = 5.0;
    const EXHAUSTED_RATIO: f64 = 0.2;
    const EXHAUSTED_SCALE: f64 = 6.0;

    /// Update `current_stamina`, `target_speed` and `current_speed` for one tick
    pub fn apply<R: RandomSource + ?Sized>(
        self,
        participant: &mut RaceParticipant,
        dt: f64,
        rng: &mut R,
    ) {
        match self {
            StatPolicy::Smoothed => Self::smoothed(participant, dt, rng),
            StatPolicy::Threshold => Self::threshold(participant, dt),
        }
    }

    fn smoothed<R: RandomSource + ?Sized>(p: &mut RaceParticipant, dt: f64, rng: &mut R) {
        let stats = &p.animal;

        // A higher stamina stat drains the pool more slowly
        let drain = (STAT_MAX - stats.stamina) * Self::DRAIN_PER_MISSING_POINT * dt;
        let stamina = p.current_stamina - drain;
        p.set_stamina(stamina);

        let stats = &p.animal;
        let base_speed = stats.speed / STAT_MAX;
        let stamina_factor = p.stamina_ratio().max(Self::MIN_STAMINA_FACTOR);
        let temper_variance =
            (stats.temper / STAT_MAX) * Self::TEMPER_SPREAD * (rng.next_unit() - 0.5);
        let target = (base_speed + temper_variance) * stamina_factor * Self::SPEED_SCALE;

        let response = (stats.acceleration / STAT_MAX) * dt * Self::RESPONSE_RATE;
        p.target_speed = target;
        p.current_speed = (p.current_speed + (target - p.current_speed) * response).max(0.0);
    }

    fn threshold(p: &mut RaceParticipant, dt: f64) {
        let stamina = if p.current_speed > Self::EXERTION_SPEED {
            p.current_stamina - Self::EXERTION_DRAIN * dt
        } else {
            p.current_stamina + Self::REST_REGEN * dt
        };
        p.set_stamina(stamina);

        let base_speed = p.animal.speed / STAT_MAX;
        p.current_speed = if p.stamina_ratio() > Self::EXHAUSTED_RATIO {
            base_speed * Self::SPEED_SCALE
        } else {
            base_speed * Self::EXHAUSTED_SCALE
        };
        p.target_speed = p.current_speed;
    }
}
