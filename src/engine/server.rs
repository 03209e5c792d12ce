//! Server - Headless race driver
//!
//! Plays the role of the render loop: measures wall-clock frame deltas, feeds
//! them to the engine and tracks how long each tick takes.

use std::time::Instant;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::RaceConfig;
use crate::engine::animal::{Animal, RaceParticipant};
use crate::engine::race::{Race, RaceResult};
use crate::engine::simulation::RaceEngine;
use crate::error::DerbyResult;

/// Number of recent ticks averaged in `ServerStats`
const TICK_WINDOW: usize = 60;

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Idle,
    Ready,
    Racing,
    Results,
}

/// Server statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub tick_rate: f64,
    pub avg_tick_time_ms: f64,
    pub participant_count: u32,
    pub game_state: GameState,
}

/// Drives one race at a time
pub struct RaceServer {
    state: GameState,
    engine: Option<RaceEngine<ChaCha8Rng>>,
    tick_rate: f64,
    last_tick: Instant,
    tick_times: Vec<f64>,
    running: bool,
}

impl RaceServer {
    /// Create an idle server
    pub fn new() -> Self {
        Self {
            state: GameState::Idle,
            engine: None,
            tick_rate: 0.0,
            last_tick: Instant::now(),
            tick_times: Vec::with_capacity(TICK_WINDOW),
            running: false,
        }
    }

    /// Build a race; on error the previous state is kept
    pub fn init_race(&mut self, animals: Vec<Animal>, config: &RaceConfig) -> DerbyResult<()> {
        let engine = RaceEngine::new(animals, config)?;
        self.tick_rate = config.tick_rate;
        self.engine = Some(engine);
        self.tick_times.clear();
        self.running = false;
        self.state = GameState::Ready;
        log::info!("Race ready at {} Hz", self.tick_rate);
        Ok(())
    }

    /// Start feeding frames to the engine
    pub fn start_race(&mut self) {
        if self.state == GameState::Ready {
            self.state = GameState::Racing;
            self.running = true;
            self.last_tick = Instant::now();
            log::info!("Race started");
        }
    }

    /// Advance by the wall-clock time since the previous tick
    pub fn tick(&mut self) -> Option<Race> {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;
        self.advance(delta)
    }

    /// Advance by an explicit frame delta
    pub fn advance(&mut self, delta: f64) -> Option<Race> {
        if !self.running {
            return self.snapshot();
        }

        let tick_start = Instant::now();
        let race = self.engine.as_mut().map(|engine| engine.update(delta));

        if let Some(race) = &race {
            if self.state == GameState::Racing && race.winner.is_some() {
                self.state = GameState::Results;
                log::info!("Race over, showing results");
            }
            // Keep stepping stragglers until the whole field is home
            if race.all_finished() {
                self.running = false;
            }
        }

        let tick_time = tick_start.elapsed().as_secs_f64() * 1000.0;
        self.tick_times.push(tick_time);
        if self.tick_times.len() > TICK_WINDOW {
            self.tick_times.remove(0);
        }

        race
    }

    /// Get current race snapshot
    pub fn snapshot(&self) -> Option<Race> {
        self.engine.as_ref().map(|engine| engine.snapshot())
    }

    /// Get the ranked roster
    pub fn leaderboard(&self) -> Option<Vec<RaceParticipant>> {
        self.engine.as_ref().map(|engine| engine.leaderboard())
    }

    /// Get race results
    pub fn results(&self) -> Option<Vec<RaceResult>> {
        self.engine.as_ref().map(|engine| engine.results().to_vec())
    }

    /// Get server statistics
    pub fn stats(&self) -> ServerStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f64>() / self.tick_times.len() as f64
        };

        ServerStats {
            tick_rate: self.tick_rate,
            avg_tick_time_ms: avg_tick_time,
            participant_count: self
                .engine
                .as_ref()
                .map(|engine| engine.race().participants.len() as u32)
                .unwrap_or(0),
            game_state: self.state,
        }
    }

    /// Get current game state
    pub fn state(&self) -> GameState {
        self.state
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        if self.running {
            self.running = false;
            log::info!("Race paused");
        }
    }

    /// Resume the simulation while anyone is still running
    pub fn resume(&mut self) {
        let unfinished = self
            .engine
            .as_ref()
            .is_some_and(|engine| !engine.race().all_finished());
        if matches!(self.state, GameState::Racing | GameState::Results) && unfinished {
            self.running = true;
            self.last_tick = Instant::now();
            log::info!("Race resumed");
        }
    }

    /// Reset to idle state
    pub fn reset(&mut self) {
        self.state = GameState::Idle;
        self.engine = None;
        self.running = false;
        self.tick_times.clear();
        log::info!("Race reset");
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Default for RaceServer {
    fn default() -> Self {
        Self::new()
    }
}
