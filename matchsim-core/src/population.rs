//! Synthetic player population

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::player::{Player, PlayerId};

/// How to generate the player pool
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of players
    pub size: usize,
    /// Inclusive range of latent skill
    pub true_rating: (u32, u32),
    /// Inclusive range of starting ELO
    pub elo: (u32, u32),
    /// Number of god players (taken from the front of the pool)
    pub gods: usize,
    /// Starting ELO of god players
    pub god_elo: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: 51,
            true_rating: (200, 200),
            elo: (1000, 2000),
            gods: 5,
            god_elo: 1000.0,
        }
    }
}

impl PopulationConfig {
    /// Enough players for five concurrent games plus one in the queue
    ///
    /// Saturates rather than wrapping for absurd game sizes.
    pub fn for_game(team_size: usize, team_number: usize) -> Self {
        Self {
            size: team_size
                .saturating_mul(team_number)
                .saturating_mul(5)
                .saturating_add(1),
            ..Default::default()
        }
    }
}

/// Generate players `0..size` with uniformly drawn ratings
pub fn generate_population<R: Rng + ?Sized>(config: &PopulationConfig, rng: &mut R) -> Vec<Player> {
    let (tr_lo, tr_hi) = ordered(config.true_rating);
    let (elo_lo, elo_hi) = ordered(config.elo);

    (0..config.size)
        .map(|i| {
            let true_rating = rng.gen_range(tr_lo..=tr_hi);
            let elo = rng.gen_range(elo_lo..=elo_hi) as f64;
            let id = PlayerId(i as u32);
            if i < config.gods {
                Player::new(id, true_rating, config.god_elo).with_god(true)
            } else {
                Player::new(id, true_rating, elo)
            }
        })
        .collect()
}

fn ordered((a, b): (u32, u32)) -> (u32, u32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
