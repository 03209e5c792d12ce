//! Deer Derby - Race simulation core
//!
//! Advances racing animals around a circular or segmented course in fixed
//! steps and ranks them. Rendering, persistence and UI sit outside this crate
//! and talk to it through `RaceEngine::update` and the returned `Race`.

pub mod config;
pub mod engine;
pub mod error;

pub use config::{RaceConfig, SegmentDef, SegmentKind, TrackConfig};
pub use engine::{
    Animal, GameState, Race, RaceEngine, RaceParticipant, RaceResult, RaceServer, RaceStatus,
    StatPolicy, Track, Vec3,
};
pub use error::{DerbyError, DerbyResult};
