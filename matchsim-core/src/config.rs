//! Simulation configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings for a matchmaking run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Players per team
    pub team_size: usize,
    /// Teams per game
    pub team_number: usize,
    /// Simulated length of one game in milliseconds
    pub game_duration_ms: u64,
    /// ELO update scale
    pub k_factor: f64,
    /// Latent skill drift per rated game (None or 0 disables drift)
    pub nudge: Option<u32>,
    /// Team strength multiplier per god player
    pub god_boost: f64,
    /// Completed games after which the scheduler stops
    pub max_round: u64,
    /// Moving-average window for reporting
    pub smoothing: usize,
    /// Scheduler sleep between ticks in milliseconds
    pub tick_interval_ms: u64,
    /// Random seed for reproducibility (None = random)
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            team_size: 5,
            team_number: 2,
            game_duration_ms: 10,
            k_factor: 20.0,
            nudge: None,
            god_boost: 2.0,
            max_round: 100_000,
            smoothing: 100,
            tick_interval_ms: 10,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Create config for `team_number` teams of `team_size`
    pub fn new(team_size: usize, team_number: usize) -> Self {
        Self {
            team_size,
            team_number,
            ..Default::default()
        }
    }

    /// Set latent skill drift
    pub fn with_nudge(mut self, nudge: u32) -> Self {
        self.nudge = Some(nudge);
        self
    }

    /// Set number of completed games before stopping
    pub fn with_max_round(mut self, max_round: u64) -> Self {
        self.max_round = max_round;
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Players needed to fill one game
    pub fn game_size(&self) -> usize {
        self.team_size * self.team_number
    }

    pub fn game_duration(&self) -> Duration {
        Duration::from_millis(self.game_duration_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Drift magnitude, with a zero nudge treated as disabled
    pub fn drift(&self) -> Option<u32> {
        self.nudge.filter(|&n| n > 0)
    }

    /// Reject settings that would break team formation or rating
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.team_size == 0 {
            return Err(ConfigError::ZeroTeamSize);
        }
        if self.team_number < 2 {
            return Err(ConfigError::TooFewTeams(self.team_number));
        }
        if self.team_size.checked_mul(self.team_number).is_none() {
            return Err(ConfigError::GameSizeOverflow {
                team_size: self.team_size,
                team_number: self.team_number,
            });
        }
        check_factor("k_factor", self.k_factor)?;
        check_factor("god_boost", self.god_boost)?;
        if self.smoothing == 0 {
            return Err(ConfigError::ZeroSmoothing);
        }
        Ok(())
    }

    /// Load from JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn check_factor(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidFactor { name, value })
    }
}
