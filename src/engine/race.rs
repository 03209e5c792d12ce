//! Race - Race aggregate, results and leaderboard ordering
//!
//! The engine owns the live `Race`; callers only ever see clones of it.

use std::cmp::Ordering;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::engine::animal::RaceParticipant;

/// Race status, only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceStatus {
    Waiting,
    Racing,
    Completed,
}

/// Finish record for one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub participant_id: String,
    pub participant_name: String,
    pub finish_time: f64,
    pub position: u32,
}

/// Complete race state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub id: String,
    /// Roster in starting order, fixed for the race's lifetime
    pub participants: Vec<RaceParticipant>,
    /// Length of one lap
    pub lap_length: f64,
    /// Distance needed to finish (one lap times laps required)
    pub track_length: f64,
    pub laps_required: u32,
    pub status: RaceStatus,
    pub start_time: SystemTime,
    /// Elapsed race clock (seconds): the sum of the frame deltas fed to
    /// `update`, not wall-clock time since `start_time`
    pub current_time: f64,
    /// Id of the first participant observed finished
    pub winner: Option<String>,
    /// Finish records in the order participants crossed the line
    pub finish_order: Vec<RaceResult>,
}

impl Race {
    /// Ranked copy of the roster: finishers first by finish time, then the
    /// rest by distance. Ties keep roster order.
    pub fn leaderboard(&self) -> Vec<RaceParticipant> {
        let mut ranked = self.participants.clone();
        ranked.sort_by(rank);
        ranked
    }

    /// Current leader
    pub fn leader(&self) -> Option<&RaceParticipant> {
        self.participants
            .iter()
            .reduce(|best, p| if rank(p, best) == Ordering::Less { p } else { best })
    }

    /// Get participant by animal id
    pub fn participant(&self, id: &str) -> Option<&RaceParticipant> {
        self.participants.iter().find(|p| p.id() == id)
    }

    /// Number of participants across the line
    pub fn finished_count(&self) -> usize {
        self.participants.iter().filter(|p| p.finished).count()
    }

    /// Check if every participant has finished
    pub fn all_finished(&self) -> bool {
        self.participants.iter().all(|p| p.finished)
    }
}

/// Leaderboard comparator; `sort_by` is stable so equal keys keep roster order
fn rank(a: &RaceParticipant, b: &RaceParticipant) -> Ordering {
    match (a.finished, b.finished) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => a
            .finish_time
            .partial_cmp(&b.finish_time)
            .unwrap_or(Ordering::Equal),
        (false, false) => b
            .distance
            .partial_cmp(&a.distance)
            .unwrap_or(Ordering::Equal),
    }
}
