//! Simulation - Fixed-timestep race engine
//!
//! Owns the authoritative `Race`. Frame deltas are accumulated and drained in
//! fixed steps so the outcome does not depend on the caller's frame rate.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::RaceConfig;
use crate::engine::animal::{Animal, RaceParticipant};
use crate::engine::race::{Race, RaceResult, RaceStatus};
use crate::engine::stats::{RandomSource, StatPolicy};
use crate::engine::track::Track;
use crate::error::{DerbyError, DerbyResult};

/// Slack when comparing the accumulator against the fixed step, so that
/// summed frame deltas drain the same number of steps as one large delta
const STEP_EPSILON: f64 = 1e-9;

/// Most fixed steps one `update` will run (one minute of race time at 20 Hz).
/// Backlog beyond this is dropped.
pub const MAX_STEPS_PER_UPDATE: u32 = 1200;

/// Fixed-step race engine
#[derive(Debug, Clone)]
pub struct RaceEngine<R = ChaCha8Rng> {
    race: Race,
    track: Track,
    policy: StatPolicy,
    rng: R,
    fixed_step: f64,
    accumulator: f64,
}

impl RaceEngine<ChaCha8Rng> {
    /// Create a race from a roster and config. Temper jitter is seeded from
    /// `config.seed`, or from entropy when no seed is given.
    pub fn new(animals: Vec<Animal>, config: &RaceConfig) -> DerbyResult<Self> {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(animals, config, rng)
    }
}

impl<R: RandomSource> RaceEngine<R> {
    /// Create a race drawing temper jitter from the given source
    pub fn with_rng(animals: Vec<Animal>, config: &RaceConfig, rng: R) -> DerbyResult<Self> {
        config.validate()?;
        let track = Track::from_config(&config.track)?;
        Self::build(animals, track, config.effective_policy(), config.laps, config.fixed_step(), rng)
    }

    /// Create a race from an already-built track and policy pair
    pub fn build(
        animals: Vec<Animal>,
        track: Track,
        policy: StatPolicy,
        laps: u32,
        fixed_step: f64,
        rng: R,
    ) -> DerbyResult<Self> {
        if animals.is_empty() {
            return Err(DerbyError::EmptyRoster);
        }
        for animal in &animals {
            animal.validate()?;
        }
        if laps == 0 {
            return Err(DerbyError::InvalidConfig("laps must be at least 1".into()));
        }
        if !fixed_step.is_finite() || fixed_step <= 0.0 {
            return Err(DerbyError::InvalidConfig(format!(
                "fixed step must be positive, got {fixed_step}"
            )));
        }
        let lap_length = track.lap_length();
        if !lap_length.is_finite() || lap_length <= 0.0 {
            return Err(DerbyError::InvalidTrack(format!(
                "lap length must be positive, got {lap_length}"
            )));
        }

        let participants: Vec<RaceParticipant> = animals
            .into_iter()
            .enumerate()
            .map(|(slot, animal)| RaceParticipant::new(animal, track.starting_position(slot)))
            .collect();

        let start_time = SystemTime::now();
        let id = format!(
            "race-{}",
            start_time
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default()
        );

        log::info!(
            "Race {} created: {} participants, {} laps of {:.1}, {:?} policy",
            id,
            participants.len(),
            laps,
            lap_length,
            policy
        );

        Ok(Self {
            race: Race {
                id,
                participants,
                lap_length,
                track_length: lap_length * laps as f64,
                laps_required: laps,
                status: RaceStatus::Racing,
                start_time,
                current_time: 0.0,
                winner: None,
                finish_order: Vec::new(),
            },
            track,
            policy,
            rng,
            fixed_step,
            accumulator: 0.0,
        })
    }

    /// Advance by a frame delta (seconds) and return a snapshot of the race
    pub fn update(&mut self, delta_time: f64) -> Race {
        let delta = if delta_time.is_finite() && delta_time >= 0.0 {
            delta_time
        } else {
            log::warn!("Clamping invalid frame delta {} to 0", delta_time);
            0.0
        };

        self.accumulator += delta;
        let mut crossed = Vec::new();
        let mut steps = 0;
        while self.accumulator + STEP_EPSILON >= self.fixed_step {
            if steps == MAX_STEPS_PER_UPDATE {
                log::warn!(
                    "Dropping {:.3}s of simulation backlog after {} steps",
                    self.accumulator,
                    steps
                );
                self.accumulator = 0.0;
                break;
            }
            self.step(self.fixed_step, &mut crossed);
            self.accumulator -= self.fixed_step;
            steps += 1;
        }
        self.accumulator = self.accumulator.max(0.0);

        self.race.current_time += delta;
        self.record_finishers(&crossed);

        if self.race.status == RaceStatus::Racing && !self.race.finish_order.is_empty() {
            self.race.status = RaceStatus::Completed;
            self.race.winner = self
                .race
                .finish_order
                .first()
                .map(|r| r.participant_id.clone());
            log::info!(
                "Race {} completed at {:.2}s, winner {}",
                self.race.id,
                self.race.current_time,
                self.race.winner.as_deref().unwrap_or("-")
            );
        }

        self.race.clone()
    }

    /// One fixed step for every participant still running, in roster order.
    /// Indices of participants that cross the line are pushed to `crossed`.
    fn step(&mut self, dt: f64, crossed: &mut Vec<usize>) {
        let lap_length = self.race.lap_length;
        let laps_required = self.race.laps_required;
        let lap_bonus = self.track.lap_bonus();

        for (index, p) in self.race.participants.iter_mut().enumerate() {
            if p.finished {
                continue;
            }

            self.policy.apply(p, dt, &mut self.rng);

            if self.track.obstacle_at(p.distance).is_some() && !p.jumping {
                p.jumping = true;
                p.jump_progress = 0.0;
            }
            if p.jumping {
                p.jump_progress += dt * 2.0;
                if p.jump_progress >= 1.0 {
                    p.jumping = false;
                    p.jump_progress = 0.0;
                }
            }

            p.distance += p.current_speed * dt;

            p.position = self.track.position_at(p.distance);
            if p.jumping {
                p.position.y = Track::jump_height(p.jump_progress);
            }
            p.velocity = self.track.velocity_at(p.distance, p.current_speed, dt);

            let lap = (p.distance / lap_length).floor() as u32;
            if lap > p.lap {
                p.lap = lap;
                p.set_stamina(p.current_stamina + lap_bonus);
                log::debug!("{} reached lap {}", p.animal.name, lap);
            }

            if p.lap >= laps_required {
                p.finished = true;
                crossed.push(index);
            }
        }
    }

    /// Stamp finish time with the race clock of the enclosing update
    fn record_finishers(&mut self, crossed: &[usize]) {
        let now = self.race.current_time;
        for &index in crossed {
            let position = self.race.finish_order.len() as u32 + 1;
            let p = &mut self.race.participants[index];
            p.finish_time = Some(now);
            log::debug!("{} finished #{} at {:.2}s", p.animal.name, position, now);
            self.race.finish_order.push(RaceResult {
                participant_id: p.animal.id.clone(),
                participant_name: p.animal.name.clone(),
                finish_time: now,
                position,
            });
        }
    }

    /// Read-only view of the live race
    pub fn race(&self) -> &Race {
        &self.race
    }

    /// Owned copy of the race
    pub fn snapshot(&self) -> Race {
        self.race.clone()
    }

    /// Ranked copy of the roster
    pub fn leaderboard(&self) -> Vec<RaceParticipant> {
        self.race.leaderboard()
    }

    /// Finish records in crossing order
    pub fn results(&self) -> &[RaceResult] {
        &self.race.finish_order
    }

    /// Course geometry the race runs on
    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Stat policy applied each tick
    pub fn policy(&self) -> StatPolicy {
        self.policy
    }

    /// Seconds per simulation step
    pub fn fixed_step(&self) -> f64 {
        self.fixed_step
    }

    /// Check if the first finisher has crossed
    pub fn is_completed(&self) -> bool {
        self.race.status == RaceStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackConfig;
    use crate::engine::track::CircularTrack;

    fn deer(id: &str, speed: f64) -> Animal {
        Animal::new(id, id, speed, 100.0, 100.0, 0.0)
    }

    fn config() -> RaceConfig {
        RaceConfig {
            seed: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_roster_rejected() {
        let err = RaceEngine::new(Vec::new(), &config()).unwrap_err();
        assert!(matches!(err, DerbyError::EmptyRoster));
    }

    #[test]
    fn test_bad_stats_rejected() {
        let err = RaceEngine::new(vec![deer("a", 150.0)], &config()).unwrap_err();
        assert!(matches!(err, DerbyError::StatOutOfRange { .. }));
    }

    #[test]
    fn test_bad_track_rejected() {
        let config = RaceConfig {
            track: TrackConfig::Circular { radius: 0.0 },
            ..config()
        };
        let err = RaceEngine::new(vec![deer("a", 50.0)], &config).unwrap_err();
        assert!(matches!(err, DerbyError::InvalidTrack(_)));

        let config = RaceConfig {
            track: TrackConfig::Segmented { segments: Vec::new() },
            ..config
        };
        let err = RaceEngine::new(vec![deer("a", 50.0)], &config).unwrap_err();
        assert!(matches!(err, DerbyError::InvalidTrack(_)));
    }

    #[test]
    fn test_initial_state() {
        let engine = RaceEngine::new(vec![deer("a", 50.0), deer("b", 60.0)], &config()).unwrap();
        let race = engine.race();

        assert_eq!(race.status, RaceStatus::Racing);
        assert_eq!(race.laps_required, 3);
        assert!((race.track_length - 3.0 * race.lap_length).abs() < 1e-9);
        assert!(race.winner.is_none());
        assert_eq!(race.current_time, 0.0);

        for p in &race.participants {
            assert_eq!(p.distance, 0.0);
            assert_eq!(p.current_stamina, 100.0);
            assert!(!p.finished);
        }
        // second slot sits 0.5 rad around the circle
        let slot1 = race.participants[1].position;
        assert!((slot1.x - 50.0 * 0.5_f64.cos()).abs() < 1e-9);
        assert_eq!(engine.policy(), StatPolicy::Smoothed);
    }

    #[test]
    fn test_sub_step_delta_does_not_tick() {
        let mut engine = RaceEngine::new(vec![deer("a", 50.0)], &config()).unwrap();
        let race = engine.update(0.03);
        assert_eq!(race.participants[0].distance, 0.0);
        assert!((race.current_time - 0.03).abs() < 1e-12);

        let race = engine.update(0.03);
        assert!(race.participants[0].distance > 0.0);
    }

    #[test]
    fn test_negative_delta_clamped() {
        let mut engine = RaceEngine::new(vec![deer("a", 50.0)], &config()).unwrap();
        engine.update(0.5);
        let before = engine.snapshot();
        let after = engine.update(-3.0);
        assert_eq!(before.current_time, after.current_time);
        assert_eq!(before.participants, after.participants);

        let after = engine.update(f64::NAN);
        assert_eq!(before.current_time, after.current_time);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut engine = RaceEngine::new(vec![deer("a", 50.0)], &config()).unwrap();
        let mut snapshot = engine.update(1.0);
        snapshot.participants[0].distance = -5.0;
        snapshot.status = RaceStatus::Completed;
        assert!(engine.race().participants[0].distance > 0.0);
        assert_eq!(engine.race().status, RaceStatus::Racing);
    }

    #[test]
    fn test_first_finisher_completes_race() {
        let track = Track::Circular(CircularTrack::new(5.0).unwrap());
        let mut engine = RaceEngine::build(
            vec![deer("slow", 20.0), deer("fast", 100.0)],
            track,
            StatPolicy::Smoothed,
            1,
            0.05,
            ChaCha8Rng::seed_from_u64(3),
        )
        .unwrap();

        let mut race = engine.update(0.0);
        while race.status == RaceStatus::Racing {
            race = engine.update(0.1);
        }

        assert_eq!(race.winner.as_deref(), Some("fast"));
        let fast = race.participant("fast").unwrap();
        let slow = race.participant("slow").unwrap();
        assert!(fast.finished);
        assert_eq!(fast.finish_time, Some(race.current_time));
        assert!(!slow.finished);
        assert_eq!(engine.results().len(), 1);
        assert_eq!(engine.results()[0].position, 1);

        // the rest of the field keeps running after completion
        let distance = slow.distance;
        let later = engine.update(1.0);
        assert!(later.participant("slow").unwrap().distance > distance);
        assert_eq!(later.winner.as_deref(), Some("fast"));
        assert_eq!(later.status, RaceStatus::Completed);
    }

    #[test]
    fn test_finished_participant_is_frozen() {
        let track = Track::Circular(CircularTrack::new(2.0).unwrap());
        let mut engine = RaceEngine::build(
            vec![deer("a", 100.0)],
            track,
            StatPolicy::Smoothed,
            1,
            0.05,
            ChaCha8Rng::seed_from_u64(3),
        )
        .unwrap();

        let mut race = engine.update(0.0);
        while !race.participants[0].finished {
            race = engine.update(0.05);
        }
        let frozen = race.participants[0].clone();
        let later = engine.update(2.0);
        assert_eq!(later.participants[0], frozen);
    }

    #[test]
    fn test_segmented_race_jumps_obstacles() {
        let config = RaceConfig {
            track: TrackConfig::demo_course(),
            laps: 1,
            seed: Some(9),
            ..Default::default()
        };
        let mut engine = RaceEngine::new(vec![deer("a", 100.0)], &config).unwrap();
        assert_eq!(engine.policy(), StatPolicy::Threshold);

        let mut max_height: f64 = 0.0;
        let mut jumped = false;
        while !engine.is_completed() {
            let race = engine.update(0.05);
            let p = &race.participants[0];
            jumped |= p.jumping;
            max_height = max_height.max(p.position.y);
            assert!(p.jump_progress < 1.0);
        }
        assert!(jumped);
        assert!(max_height > 0.0 && max_height <= 3.0);
    }

    #[test]
    fn test_huge_delta_is_capped() {
        let mut engine = RaceEngine::new(vec![deer("a", 50.0)], &config()).unwrap();
        let race = engine.update(1e17);
        let p = &race.participants[0];
        assert!(p.distance > 0.0 && p.distance.is_finite());
        assert!(p.position.x.is_finite() && p.position.z.is_finite());

        // backlog past the cap is dropped, not carried into the next frame
        let after = engine.update(0.03);
        assert_eq!(after.participants[0].distance, p.distance);
    }

    #[test]
    fn test_unbuilt_track_rejected() {
        for radius in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let err = RaceEngine::build(
                vec![deer("a", 50.0)],
                Track::Circular(CircularTrack { radius }),
                StatPolicy::Smoothed,
                1,
                0.05,
                ChaCha8Rng::seed_from_u64(1),
            )
            .unwrap_err();
            assert!(matches!(err, DerbyError::InvalidTrack(_)));
        }
    }

    #[test]
    fn test_winner_can_differ_from_leaderboard_head() {
        // both cross inside one update: "fast" on step 9, "slow" on step 10
        let track = Track::Circular(CircularTrack::new(1.0).unwrap());
        let mut engine = RaceEngine::build(
            vec![deer("slow", 90.0), deer("fast", 100.0)],
            track,
            StatPolicy::Threshold,
            1,
            0.05,
            ChaCha8Rng::seed_from_u64(1),
        )
        .unwrap();

        let race = engine.update(1.0);
        assert!(race.all_finished());
        assert_eq!(race.participants[0].finish_time, race.participants[1].finish_time);

        // winner follows crossing order, the leaderboard breaks the tie by roster order
        assert_eq!(race.winner.as_deref(), Some("fast"));
        assert_eq!(engine.results()[0].participant_id, "fast");
        assert_eq!(race.leaderboard()[0].id(), "slow");
        assert_eq!(race.leader().map(|p| p.id()), Some("slow"));
    }
}
