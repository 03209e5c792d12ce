//! Race Engine Module
//!
//! Fixed-timestep race simulation: stat policies, track geometry and the
//! stepper that ties them together, plus a headless driver.

pub mod animal;
pub mod race;
pub mod server;
pub mod simulation;
pub mod stats;
pub mod track;

pub use animal::{Animal, RaceParticipant, Vec3};
pub use race::{Race, RaceResult, RaceStatus};
pub use server::{GameState, RaceServer, ServerStats};
pub use simulation::RaceEngine;
pub use stats::{RandomSource, StatPolicy};
pub use track::{CircularTrack, Obstacle, SegmentedTrack, Track};
