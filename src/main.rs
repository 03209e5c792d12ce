//! derby-sim - Run a race headless and print the final standings
//!
//! Usage: `derby-sim [config.json]`. Without a config the default circular
//! course is used. Set `RUST_LOG=debug` to see lap events.

use std::process::ExitCode;

use deer_derby::{Animal, DerbyResult, RaceConfig, RaceServer};

/// Simulated frame length fed to the engine
const FRAME: f64 = 1.0 / 60.0;

/// Give up after this much simulated time
const MAX_RACE_SECONDS: f64 = 3600.0;

fn demo_roster() -> Vec<Animal> {
    vec![
        Animal::new("rudolph", "Rudolph", 92.0, 75.0, 60.0, 40.0),
        Animal::new("comet", "Comet", 85.0, 90.0, 80.0, 15.0),
        Animal::new("vixen", "Vixen", 78.0, 65.0, 95.0, 70.0),
        Animal::new("blitzen", "Blitzen", 96.0, 55.0, 45.0, 85.0),
    ]
}

fn run() -> DerbyResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => RaceConfig::from_json_file(path)?,
        None => RaceConfig::default(),
    };

    let mut server = RaceServer::new();
    server.init_race(demo_roster(), &config)?;
    server.start_race();

    let mut elapsed = 0.0;
    while server.is_running() && elapsed < MAX_RACE_SECONDS {
        server.advance(FRAME);
        elapsed += FRAME;
    }

    if let Some(race) = server.snapshot() {
        println!(
            "{} finished after {:.2}s, winner: {}",
            race.id,
            race.current_time,
            race.winner.as_deref().unwrap_or("none")
        );
    }
    for (place, p) in server.leaderboard().unwrap_or_default().iter().enumerate() {
        let time = p
            .finish_time
            .map(|t| format!("{t:>8.2}s"))
            .unwrap_or_else(|| "     DNF".to_string());
        println!(
            "{:>2}. {:<10} {}  lap {}  {:>8.1}m",
            place + 1,
            p.animal.name,
            time,
            p.lap,
            p.distance
        );
    }

    let stats = server.stats();
    log::info!("Average tick cost {:.3} ms", stats.avg_tick_time_ms);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
