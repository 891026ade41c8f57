//! Player identity, ratings and the ELO change event

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Stable player identity used for equality, hashing and ordering
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logistic strength of an ELO value, used only for outcome probability
pub fn rating(elo: f64) -> f64 {
    10f64.powf(elo / 400.0)
}

/// A single observed ELO mutation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EloChange {
    pub player: PlayerId,
    pub old: f64,
    pub new: f64,
}

impl EloChange {
    pub fn delta(&self) -> f64 {
        self.new - self.old
    }
}

/// A simulated player
///
/// `elo` can only move through [`Player::apply_elo_delta`], which hands back
/// the change so every mutation is observable.
#[derive(Clone, Debug)]
pub struct Player {
    id: PlayerId,
    true_rating: u32,
    elo: f64,
    last_played_at: Instant,
    wins: u32,
    losses: u32,
    god: bool,
}

impl Player {
    pub fn new(id: PlayerId, true_rating: u32, elo: f64) -> Self {
        Self {
            id,
            true_rating,
            elo,
            last_played_at: Instant::now(),
            wins: 0,
            losses: 0,
            god: false,
        }
    }

    /// Mark as a reference player with boosted influence and fixed drift
    pub fn with_god(mut self, god: bool) -> Self {
        self.god = god;
        self
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn true_rating(&self) -> u32 {
        self.true_rating
    }

    pub fn elo(&self) -> f64 {
        self.elo
    }

    pub fn last_played_at(&self) -> Instant {
        self.last_played_at
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn losses(&self) -> u32 {
        self.losses
    }

    pub fn is_god(&self) -> bool {
        self.god
    }

    /// Win ratio, 0 when no decisive result has been recorded
    pub fn ratio(&self) -> f64 {
        let total = self.wins + self.losses;
        if total == 0 {
            0.0
        } else {
            self.wins as f64 / total as f64
        }
    }

    /// Logistic strength derived from the current ELO
    pub fn rating(&self) -> f64 {
        rating(self.elo)
    }

    /// Shift ELO by `delta` and report the change
    pub fn apply_elo_delta(&mut self, delta: f64) -> EloChange {
        let old = self.elo;
        self.elo += delta;
        tracing::debug!("Update ELO of {} from {:.2} to {:.2}", self, old, self.elo);
        EloChange {
            player: self.id,
            old,
            new: self.elo,
        }
    }

    pub(crate) fn record_results(&mut self, wins: u32, losses: u32) {
        self.wins += wins;
        self.losses += losses;
    }

    /// Move the latent skill by `amount`, clamped at zero
    pub(crate) fn shift_true_rating(&mut self, amount: u32, up: bool) {
        self.true_rating = if up {
            self.true_rating.saturating_add(amount)
        } else {
            self.true_rating.saturating_sub(amount)
        };
    }

    pub(crate) fn stamp(&mut self, at: Instant) {
        self.last_played_at = at;
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {} {:.2}", self.id, self.ratio())?;
        if self.god {
            write!(f, " god")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_strictly_increasing() {
        let mut prev = rating(-2000.0);
        for step in -199..=400 {
            let next = rating(step as f64 * 10.0);
            assert!(next > prev, "rating must grow with elo at {}", step * 10);
            prev = next;
        }
    }

    #[test]
    fn test_rating_reference_points() {
        assert!((rating(0.0) - 1.0).abs() < 1e-12);
        assert!((rating(400.0) - 10.0).abs() < 1e-9);
        assert!((rating(1000.0) - 316.2278).abs() < 1e-3);
    }

    #[test]
    fn test_ratio_without_games() {
        let player = Player::new(PlayerId(1), 100, 1000.0);
        assert_eq!(player.ratio(), 0.0);
    }

    #[test]
    fn test_ratio_with_results() {
        let mut player = Player::new(PlayerId(1), 100, 1000.0);
        player.record_results(3, 1);
        assert_eq!(player.ratio(), 0.75);
        assert_eq!(player.wins(), 3);
        assert_eq!(player.losses(), 1);
    }

    #[test]
    fn test_apply_elo_delta_reports_change() {
        let mut player = Player::new(PlayerId(7), 100, 1500.0);
        let change = player.apply_elo_delta(-12.5);

        assert_eq!(change.player, PlayerId(7));
        assert_eq!(change.old, 1500.0);
        assert_eq!(change.new, 1487.5);
        assert_eq!(change.delta(), -12.5);
        assert_eq!(player.elo(), 1487.5);
    }

    #[test]
    fn test_true_rating_clamped_at_zero() {
        let mut player = Player::new(PlayerId(1), 3, 1000.0);
        player.shift_true_rating(5, false);
        assert_eq!(player.true_rating(), 0);
        player.shift_true_rating(5, true);
        assert_eq!(player.true_rating(), 5);
    }

    #[test]
    fn test_display_marks_god() {
        let player = Player::new(PlayerId(3), 100, 1000.0).with_god(true);
        assert_eq!(player.to_string(), "Player 3 0.00 god");
        let player = Player::new(PlayerId(4), 100, 1000.0);
        assert_eq!(player.to_string(), "Player 4 0.00");
    }
}
