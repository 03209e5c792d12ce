//! Error types for race construction and configuration.
//!
//! Only construction can fail. Once a race exists, stepping it is total.

/// Errors raised while building a race or loading its configuration.
#[derive(Debug, thiserror::Error)]
pub enum DerbyError {
    /// The roster handed to the engine was empty.
    #[error("race roster is empty")]
    EmptyRoster,

    /// A base attribute was non-finite or outside `[0, 100]`.
    #[error("animal '{animal}' has {stat} = {value}, expected a value in [0, 100]")]
    StatOutOfRange {
        animal: String,
        stat: &'static str,
        value: f64,
    },

    /// The track definition cannot produce a usable path.
    #[error("invalid track: {0}")]
    InvalidTrack(String),

    /// A race-level setting is out of its domain.
    #[error("invalid race config: {0}")]
    InvalidConfig(String),

    /// The JSON configuration could not be parsed.
    #[error("failed to parse race config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("failed to read race config: {0}")]
    ConfigRead(#[from] std::io::Error),
}

/// Convenience result type for engine construction.
pub type DerbyResult<T> = Result<T, DerbyError>;
