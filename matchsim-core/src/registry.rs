//! Player registry - owns every player and its queue status

use rustc_hash::FxHashMap;
use tokio::time::Instant;

use crate::error::ConfigError;
use crate::player::{Player, PlayerId};

/// Queue status of a registered player
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerStatus {
    Waiting,
    InGame,
}

/// Owns the player pool and the status of each player
///
/// Players keep their enrollment order, so `get` is stable across calls.
#[derive(Debug)]
pub struct PlayerRegistry {
    players: Vec<Player>,
    status: Vec<PlayerStatus>,
    index: FxHashMap<PlayerId, usize>,
}

impl PlayerRegistry {
    /// Enroll players; everyone starts WAITING, stamped with the current time
    pub fn new(players: Vec<Player>) -> Result<Self, ConfigError> {
        let now = Instant::now();
        let mut index = FxHashMap::default();
        let mut enrolled = Vec::with_capacity(players.len());

        for (i, mut player) in players.into_iter().enumerate() {
            if index.insert(player.id(), i).is_some() {
                return Err(ConfigError::DuplicatePlayer(player.id()));
            }
            player.stamp(now);
            enrolled.push(player);
        }

        let status = vec![PlayerStatus::Waiting; enrolled.len()];
        Ok(Self {
            players: enrolled,
            status,
            index,
        })
    }

    /// Players currently in `wanted`, in enrollment order
    pub fn get(&self, wanted: PlayerStatus) -> Vec<&Player> {
        self.players
            .iter()
            .zip(&self.status)
            .filter(|(_, status)| **status == wanted)
            .map(|(player, _)| player)
            .collect()
    }

    pub fn get_all(&self) -> &[Player] {
        &self.players
    }

    /// Move players to `status`; moving to WAITING restarts their wait clock
    pub fn set(&mut self, ids: &[PlayerId], status: PlayerStatus) {
        self.set_at(ids, status, Instant::now());
    }

    /// Same as [`set`](Self::set) with an explicit timestamp
    ///
    /// # Panics
    /// Panics if any id was never registered.
    pub fn set_at(&mut self, ids: &[PlayerId], status: PlayerStatus, at: Instant) {
        for &id in ids {
            let i = self.position(id);
            self.status[i] = status;
            if status == PlayerStatus::Waiting {
                self.players[i].stamp(at);
            }
        }
    }

    pub fn status_of(&self, id: PlayerId) -> PlayerStatus {
        self.status[self.position(id)]
    }

    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[self.position(id)]
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        let i = self.position(id);
        &mut self.players[i]
    }

    pub fn count(&self, wanted: PlayerStatus) -> usize {
        self.status.iter().filter(|&&status| status == wanted).count()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    fn position(&self, id: PlayerId) -> usize {
        match self.index.get(&id) {
            Some(&i) => i,
            None => panic!("player {} is not registered", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn make_registry(n: u32) -> PlayerRegistry {
        let players = (0..n)
            .map(|i| Player::new(PlayerId(i), 100, 1000.0 + i as f64))
            .collect();
        PlayerRegistry::new(players).unwrap()
    }

    #[test]
    fn test_new_registry_all_waiting() {
        let registry = make_registry(4);
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.count(PlayerStatus::Waiting), 4);
        assert_eq!(registry.count(PlayerStatus::InGame), 0);
    }

    #[test]
    fn test_duplicate_player_rejected() {
        let players = vec![
            Player::new(PlayerId(1), 100, 1000.0),
            Player::new(PlayerId(1), 100, 1100.0),
        ];
        let err = PlayerRegistry::new(players).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePlayer(PlayerId(1))));
    }

    #[test]
    fn test_set_moves_between_statuses() {
        let mut registry = make_registry(4);
        registry.set(&[PlayerId(0), PlayerId(2)], PlayerStatus::InGame);

        let waiting: Vec<_> = registry
            .get(PlayerStatus::Waiting)
            .iter()
            .map(|p| p.id())
            .collect();
        assert_eq!(waiting, vec![PlayerId(1), PlayerId(3)]);
        assert_eq!(registry.status_of(PlayerId(2)), PlayerStatus::InGame);

        // Every player has exactly one status
        assert_eq!(
            registry.count(PlayerStatus::Waiting) + registry.count(PlayerStatus::InGame),
            registry.len()
        );
    }

    #[test]
    fn test_set_waiting_stamps_time() {
        let mut registry = make_registry(2);
        let later = registry.player(PlayerId(0)).last_played_at() + Duration::from_secs(5);

        registry.set_at(&[PlayerId(0)], PlayerStatus::InGame, later);
        assert!(registry.player(PlayerId(0)).last_played_at() < later);

        registry.set_at(&[PlayerId(0)], PlayerStatus::Waiting, later);
        assert_eq!(registry.player(PlayerId(0)).last_played_at(), later);
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn test_set_unknown_player_panics() {
        let mut registry = make_registry(2);
        registry.set(&[PlayerId(99)], PlayerStatus::InGame);
    }
}
