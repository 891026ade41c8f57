//! MatchSim Core - Skill-based matchmaking simulation engine
//!
//! This crate provides the matchmaking and rating engine:
//! - Player registry with WAITING / IN_GAME tracking
//! - Fair team formation anchored on the longest-waiting player
//! - Probabilistic multi-team outcomes (weighted draw without replacement)
//! - Pairwise ELO propagation across every opposing team
//! - A cooperative round scheduler running many games concurrently
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: RoundScheduler::run (orchestration)
//! - Level 2: tick (form, reap, sleep)
//! - Level 3: form_teams, GameSession::run, rate_game (steps)
//! - Level 4: registry, configuration, population, observer hooks

pub mod config;
pub mod error;
pub mod observer;
pub mod player;
pub mod population;
pub mod rating;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod team_former;

// Re-exports for convenient access
pub use config::SimConfig;
pub use error::{ConfigError, Result, SessionError, SimError};
pub use observer::{PlayerWait, SimulationObserver};
pub use player::{rating, EloChange, Player, PlayerId};
pub use population::{generate_population, PopulationConfig};
pub use rating::{apply_nudge, expected_score, rate_game, rating_delta};
pub use registry::{PlayerRegistry, PlayerStatus};
pub use scheduler::{RoundScheduler, RunSummary};
pub use session::{GameSession, Member, PairOutcome, SessionState, Team};
pub use team_former::form_teams;
