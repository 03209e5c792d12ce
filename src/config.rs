//! Race configuration
//!
//! Everything a race needs besides its roster. Loadable from JSON; every field
//! has a default so partial documents are accepted.

use std::f64::consts::FRAC_PI_2;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::stats::StatPolicy;
use crate::engine::track::Obstacle;
use crate::error::{DerbyError, DerbyResult};

/// Race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Laps required to finish
    pub laps: u32,
    /// Fixed simulation rate in Hz
    pub tick_rate: f64,
    /// Course layout
    pub track: TrackConfig,
    /// Stat policy override; defaults per track kind
    pub policy: Option<StatPolicy>,
    /// Seed for temper jitter; entropy when absent
    pub seed: Option<u64>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            laps: 3,
            tick_rate: 20.0,
            track: TrackConfig::default(),
            policy: None,
            seed: None,
        }
    }
}

impl RaceConfig {
    pub fn from_json_str(json: &str) -> DerbyResult<Self> {
        let config: RaceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> DerbyResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check race-level settings. Track geometry is checked when it is built.
    pub fn validate(&self) -> DerbyResult<()> {
        if self.laps == 0 {
            return Err(DerbyError::InvalidConfig("laps must be at least 1".into()));
        }
        if !self.tick_rate.is_finite() || self.tick_rate <= 0.0 {
            return Err(DerbyError::InvalidConfig(format!(
                "tick rate must be positive, got {}",
                self.tick_rate
            )));
        }
        Ok(())
    }

    /// Seconds per fixed simulation step
    pub fn fixed_step(&self) -> f64 {
        1.0 / self.tick_rate
    }

    /// Explicit policy, or the one the track kind races with
    pub fn effective_policy(&self) -> StatPolicy {
        self.policy.unwrap_or_else(|| self.track.default_policy())
    }
}

/// Course layout as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TrackConfig {
    Circular { radius: f64 },
    Segmented { segments: Vec<SegmentDef> },
}

impl Default for TrackConfig {
    fn default() -> Self {
        TrackConfig::Circular { radius: 50.0 }
    }
}

impl TrackConfig {
    pub fn default_policy(&self) -> StatPolicy {
        match self {
            TrackConfig::Circular { .. } => StatPolicy::Smoothed,
            TrackConfig::Segmented { .. } => StatPolicy::Threshold,
        }
    }

    /// Built-in oval course with two jump obstacles
    pub fn demo_course() -> Self {
        TrackConfig::Segmented {
            segments: SegmentDef::demo_course(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Straight,
    Curve,
}

/// One piece of a segmented course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDef {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub length: f64,
    /// Heading change in radians, curves only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obstacles: Vec<Obstacle>,
}

impl SegmentDef {
    pub fn straight(length: f64) -> Self {
        Self {
            kind: SegmentKind::Straight,
            length,
            angle: None,
            obstacles: Vec::new(),
        }
    }

    pub fn curve(length: f64, angle: f64) -> Self {
        Self {
            kind: SegmentKind::Curve,
            length,
            angle: Some(angle),
            obstacles: Vec::new(),
        }
    }

    pub fn with_obstacle(mut self, position: f64) -> Self {
        self.obstacles.push(Obstacle { position });
        self
    }

    pub fn demo_course() -> Vec<SegmentDef> {
        vec![
            SegmentDef::straight(100.0).with_obstacle(50.0),
            SegmentDef::curve(40.0, FRAC_PI_2),
            SegmentDef::straight(60.0),
            SegmentDef::curve(40.0, FRAC_PI_2),
            SegmentDef::straight(100.0).with_obstacle(30.0),
            SegmentDef::curve(40.0, FRAC_PI_2),
            SegmentDef::straight(60.0),
            SegmentDef::curve(40.0, FRAC_PI_2),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RaceConfig::default();
        assert_eq!(config.laps, 3);
        assert_eq!(config.fixed_step(), 0.05);
        assert_eq!(config.track, TrackConfig::Circular { radius: 50.0 });
        assert_eq!(config.effective_policy(), StatPolicy::Smoothed);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RaceConfig::from_json_str(r#"{ "laps": 5 }"#).unwrap();
        assert_eq!(config.laps, 5);
        assert_eq!(config.tick_rate, 20.0);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_segmented_json() {
        let json = r#"{
            "laps": 2,
            "seed": 42,
            "track": {
                "kind": "segmented",
                "segments": [
                    { "type": "straight", "length": 30, "obstacles": [{ "position": 10 }] },
                    { "type": "curve", "length": 20, "angle": 3.14159 }
                ]
            }
        }"#;
        let config = RaceConfig::from_json_str(json).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.effective_policy(), StatPolicy::Threshold);

        let TrackConfig::Segmented { segments } = &config.track else {
            panic!("expected segmented track");
        };
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].obstacles, vec![Obstacle { position: 10.0 }]);
        assert_eq!(segments[1].kind, SegmentKind::Curve);
    }

    #[test]
    fn test_policy_override() {
        let json = r#"{ "policy": "threshold" }"#;
        let config = RaceConfig::from_json_str(json).unwrap();
        assert_eq!(config.effective_policy(), StatPolicy::Threshold);
    }

    #[test]
    fn test_rejects_zero_laps() {
        let err = RaceConfig::from_json_str(r#"{ "laps": 0 }"#).unwrap_err();
        assert!(matches!(err, DerbyError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_bad_tick_rate() {
        let err = RaceConfig::from_json_str(r#"{ "tick_rate": -1 }"#).unwrap_err();
        assert!(matches!(err, DerbyError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = RaceConfig::from_json_str("{ laps: ").unwrap_err();
        assert!(matches!(err, DerbyError::ConfigParse(_)));
    }
}
