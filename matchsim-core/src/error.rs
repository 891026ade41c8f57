//! Error types for the simulation core
//!
//! An empty queue is not an error: `form_teams` returns `Ok(None)` and the
//! scheduler simply retries on the next tick.

use rand::distributions::WeightedError;

use crate::player::PlayerId;

/// Convenience alias for results returned by the scheduler and rating engine
pub type Result<T> = std::result::Result<T, SimError>;

/// Invalid configuration, detected before the run loop starts
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("team size must be at least 1")]
    ZeroTeamSize,

    #[error("a game needs at least 2 teams, got {0}")]
    TooFewTeams(usize),

    #[error("{team_number} teams of {team_size} players overflow the game size")]
    GameSizeOverflow { team_size: usize, team_number: usize },

    #[error("{name} must be a finite non-negative number, got {value}")]
    InvalidFactor { name: &'static str, value: f64 },

    #[error("smoothing window must be at least 1")]
    ZeroSmoothing,

    #[error("player {0} is registered twice")]
    DuplicatePlayer(PlayerId),

    #[error("population of {available} players cannot fill a game of {required}")]
    InsufficientPopulation { available: usize, required: usize },
}

/// Fault raised while resolving a game's outcome
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("team {team} has invalid strength {strength}")]
    InvalidStrength { team: usize, strength: f64 },

    #[error("weighted draw failed: {0}")]
    Draw(#[from] WeightedError),
}

/// Top-level simulation error
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("team former built a roster of {actual} players, expected {expected}")]
    RosterMismatch { expected: usize, actual: usize },

    #[error("game {tag} failed: {source}")]
    Session {
        tag: String,
        #[source]
        source: SessionError,
    },

    #[error("game {tag} task aborted: {reason}")]
    SessionPanicked { tag: String, reason: String },

    #[error("game {0} has not been scored")]
    NotScored(String),
}
