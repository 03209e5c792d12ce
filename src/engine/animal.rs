//! Animal - Static racing profile and per-race participant state
//!
//! An `Animal` is copied into the race by value. The engine wraps it in a
//! `RaceParticipant` and mutates only the dynamic fields.

use serde::{Deserialize, Serialize};

use crate::error::{DerbyError, DerbyResult};

/// Upper bound of every base attribute
pub const STAT_MAX: f64 = 100.0;

/// World-space vector used for positions and velocities
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, factor: f64) -> Vec3 {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Persisted racing profile, immutable for the duration of a race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: String,
    pub name: String,
    pub speed: f64,
    pub acceleration: f64,
    pub stamina: f64,
    pub temper: f64,
}

impl Animal {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        speed: f64,
        acceleration: f64,
        stamina: f64,
        temper: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            speed,
            acceleration,
            stamina,
            temper,
        }
    }

    /// Reject any attribute that is non-finite or outside `[0, 100]`
    pub fn validate(&self) -> DerbyResult<()> {
        let stats = [
            ("speed", self.speed),
            ("acceleration", self.acceleration),
            ("stamina", self.stamina),
            ("temper", self.temper),
        ];

        for (stat, value) in stats {
            if !value.is_finite() || !(0.0..=STAT_MAX).contains(&value) {
                return Err(DerbyError::StatOutOfRange {
                    animal: self.id.clone(),
                    stat,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Dynamic racer state for one animal in one race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceParticipant {
    /// Profile copied in at race start
    #[serde(flatten)]
    pub animal: Animal,
    /// World position, derived from `distance` every tick
    pub position: Vec3,
    /// Forward-facing world velocity, derived every tick
    pub velocity: Vec3,
    /// Instantaneous speed along the path
    pub current_speed: f64,
    /// Speed the stat policy is steering toward
    pub target_speed: f64,
    /// Stamina pool, always within `[0, animal.stamina]`
    pub current_stamina: f64,
    /// Cumulative arc length traveled
    pub distance: f64,
    /// Completed laps
    pub lap: u32,
    pub finished: bool,
    pub finish_time: Option<f64>,
    /// Obstacle jump in progress (segmented courses only)
    pub jumping: bool,
    /// Jump arc progress in `[0, 1)`
    pub jump_progress: f64,
}

impl RaceParticipant {
    /// Create a participant at the starting line
    pub fn new(animal: Animal, start_position: Vec3) -> Self {
        let current_stamina = animal.stamina;
        Self {
            animal,
            position: start_position,
            velocity: Vec3::ZERO,
            current_speed: 0.0,
            target_speed: 0.0,
            current_stamina,
            distance: 0.0,
            lap: 0,
            finished: false,
            finish_time: None,
            jumping: false,
            jump_progress: 0.0,
        }
    }

    /// Animal id
    pub fn id(&self) -> &str {
        &self.animal.id
    }

    /// Stamina pool as a fraction of the stamina stat. An animal with a zero
    /// stamina stat is always treated as spent.
    pub fn stamina_ratio(&self) -> f64 {
        if self.animal.stamina > 0.0 {
            self.current_stamina / self.animal.stamina
        } else {
            0.0
        }
    }

    /// Clamp the stamina pool back into `[0, stamina]`
    pub fn set_stamina(&mut self, value: f64) {
        self.current_stamina = value.clamp(0.0, self.animal.stamina);
    }
}
