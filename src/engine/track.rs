//! Track - Path geometry for circular and segmented courses
//!
//! Maps a scalar distance traveled onto a world position and answers obstacle
//! queries. Distances wrap at one lap.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use crate::config::{SegmentDef, SegmentKind, TrackConfig};
use crate::engine::animal::Vec3;
use crate::error::{DerbyError, DerbyResult};

/// Distance past an obstacle's offset over which it counts as active
pub const OBSTACLE_TRIGGER_WINDOW: f64 = 2.0;

/// Angular spacing between starting slots on a circular course
pub const START_SLOT_ANGLE: f64 = 0.5;

/// A closed circle parameterized by angle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircularTrack {
    pub radius: f64,
}

impl CircularTrack {
    /// Create a circle, rejecting non-positive radii
    pub fn new(radius: f64) -> DerbyResult<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(DerbyError::InvalidTrack(format!(
                "circular radius must be positive, got {radius}"
            )));
        }
        Ok(Self { radius })
    }

    /// Length of one lap
    pub fn circumference(&self) -> f64 {
        TAU * self.radius
    }

    fn point_at_angle(&self, angle: f64) -> Vec3 {
        Vec3::new(self.radius * angle.cos(), 0.0, self.radius * angle.sin())
    }

    /// Angle zero of the lap sits at the top of the circle
    pub fn position_at(&self, distance: f64) -> Vec3 {
        let angle = (distance / self.circumference()) * TAU - FRAC_PI_2;
        self.point_at_angle(angle)
    }

    /// Grid position for a starting slot
    pub fn starting_position(&self, slot: usize) -> Vec3 {
        self.point_at_angle(slot as f64 * START_SLOT_ANGLE)
    }
}

/// Obstacle placed at a fixed offset from its segment's start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub position: f64,
}

/// A segment with its absolute placement resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedSegment {
    pub kind: SegmentKind,
    pub length: f64,
    pub obstacles: Vec<Obstacle>,
    /// Lap distance at which the segment begins
    pub start_distance: f64,
    /// World (x, z) where the segment begins
    pub start: (f64, f64),
    /// World (x, z) where the segment ends
    pub end: (f64, f64),
    /// Heading traveled along this segment, radians
    pub heading: f64,
}

/// An ordered list of straights and curves, walked once at construction.
/// Only built through `new`, so it is never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentedTrack {
    segments: Vec<PlacedSegment>,
    total_length: f64,
}

impl SegmentedTrack {
    /// Resolve absolute coordinates for every segment with a cursor that
    /// starts at the origin heading along +x
    pub fn new(defs: &[SegmentDef]) -> DerbyResult<Self> {
        if defs.is_empty() {
            return Err(DerbyError::InvalidTrack("segment list is empty".into()));
        }

        let (mut x, mut z, mut heading) = (0.0_f64, 0.0_f64, 0.0_f64);
        let mut start_distance = 0.0;
        let mut segments = Vec::with_capacity(defs.len());

        for (index, def) in defs.iter().enumerate() {
            if !def.length.is_finite() || def.length < 0.0 {
                return Err(DerbyError::InvalidTrack(format!(
                    "segment {index} has invalid length {}",
                    def.length
                )));
            }
            if let Some(bad) = def
                .obstacles
                .iter()
                .find(|o| !o.position.is_finite() || o.position < 0.0)
            {
                return Err(DerbyError::InvalidTrack(format!(
                    "segment {index} has obstacle at invalid offset {}",
                    bad.position
                )));
            }

            if def.kind == SegmentKind::Curve {
                let angle = def.angle.unwrap_or(0.0);
                if !angle.is_finite() {
                    return Err(DerbyError::InvalidTrack(format!(
                        "segment {index} has invalid angle"
                    )));
                }
                heading += angle;
            }

            let start = (x, z);
            x += def.length * heading.cos();
            z += def.length * heading.sin();

            segments.push(PlacedSegment {
                kind: def.kind,
                length: def.length,
                obstacles: def.obstacles.clone(),
                start_distance,
                start,
                end: (x, z),
                heading,
            });
            start_distance += def.length;
        }

        if start_distance <= 0.0 {
            return Err(DerbyError::InvalidTrack("total length is zero".into()));
        }

        Ok(Self {
            segments,
            total_length: start_distance,
        })
    }

    /// Segments with resolved placement, in course order
    pub fn segments(&self) -> &[PlacedSegment] {
        &self.segments
    }

    /// Length of one lap
    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    /// Find the segment containing `distance` (wrapped to one lap) and the
    /// offset into it, by linear scan
    pub fn locate(&self, distance: f64) -> (&PlacedSegment, f64) {
        let lap_distance = distance.rem_euclid(self.total_length);
        for segment in &self.segments {
            if lap_distance < segment.start_distance + segment.length {
                return (segment, lap_distance - segment.start_distance);
            }
        }
        // Rounding can land exactly on the lap boundary
        let last = &self.segments[self.segments.len() - 1];
        (last, last.length)
    }

    /// Obstacle whose trigger window covers `distance`, if any
    pub fn obstacle_at(&self, distance: f64) -> Option<&Obstacle> {
        let (segment, offset) = self.locate(distance);
        segment
            .obstacles
            .iter()
            .find(|o| offset >= o.position && offset < o.position + OBSTACLE_TRIGGER_WINDOW)
    }

    /// Ground position, interpolated along the segment's chord
    pub fn position_at(&self, distance: f64) -> Vec3 {
        let (segment, offset) = self.locate(distance);
        let t = if segment.length > 0.0 {
            offset / segment.length
        } else {
            0.0
        };
        let (sx, sz) = segment.start;
        let (ex, ez) = segment.end;
        Vec3::new(sx + (ex - sx) * t, 0.0, sz + (ez - sz) * t)
    }
}

/// Course geometry used by the engine. Deserialize a `TrackConfig` and build
/// from that instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Track {
    Circular(CircularTrack),
    Segmented(SegmentedTrack),
}

impl Track {
    /// Peak height of an obstacle jump
    pub const JUMP_HEIGHT: f64 = 3.0;

    /// Build and validate geometry from configuration
    pub fn from_config(config: &TrackConfig) -> DerbyResult<Self> {
        match config {
            TrackConfig::Circular { radius } => Ok(Track::Circular(CircularTrack::new(*radius)?)),
            TrackConfig::Segmented { segments } => {
                Ok(Track::Segmented(SegmentedTrack::new(segments)?))
            }
        }
    }

    /// Length of one lap
    pub fn lap_length(&self) -> f64 {
        match self {
            Track::Circular(circle) => circle.circumference(),
            Track::Segmented(course) => course.total_length(),
        }
    }

    /// Flat stamina reward granted on every completed lap
    pub fn lap_bonus(&self) -> f64 {
        match self {
            Track::Circular(_) => 5.0,
            Track::Segmented(_) => 10.0,
        }
    }

    /// Ground position for a distance traveled
    pub fn position_at(&self, distance: f64) -> Vec3 {
        match self {
            Track::Circular(circle) => circle.position_at(distance),
            Track::Segmented(course) => course.position_at(distance),
        }
    }

    /// Forward velocity estimated by stepping one tick ahead along the path
    pub fn velocity_at(&self, distance: f64, speed: f64, dt: f64) -> Vec3 {
        if dt <= 0.0 {
            return Vec3::ZERO;
        }
        let here = self.position_at(distance);
        let ahead = self.position_at(distance + speed * dt);
        ahead.sub(here).scale(1.0 / dt)
    }

    /// World position for a starting slot before the first tick
    pub fn starting_position(&self, slot: usize) -> Vec3 {
        match self {
            Track::Circular(circle) => circle.starting_position(slot),
            Track::Segmented(_) => Vec3::ZERO,
        }
    }

    /// Active obstacle at a distance; circles have none
    pub fn obstacle_at(&self, distance: f64) -> Option<&Obstacle> {
        match self {
            Track::Circular(_) => None,
            Track::Segmented(course) => course.obstacle_at(distance),
        }
    }

    /// Height of a jump arc at the given progress
    pub fn jump_height(progress: f64) -> f64 {
        (PI * progress).sin() * Self::JUMP_HEIGHT
    }
}
