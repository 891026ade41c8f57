//! Hooks for reporting collaborators
//!
//! All callbacks run on the scheduler's control loop, between ticks.

use std::time::Duration;

use crate::player::{EloChange, PlayerId};
use crate::registry::PlayerRegistry;
use crate::session::GameSession;

/// A player that just left the queue, with how long they waited
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerWait {
    pub player: PlayerId,
    pub waited: Duration,
}

/// Receives simulation events; every method defaults to a no-op
pub trait SimulationObserver {
    /// Players that moved from WAITING to IN_GAME this tick
    fn on_players_matched(&mut self, _waits: &[PlayerWait]) {}

    fn on_game_started(&mut self, _session: &GameSession) {}

    /// Called after the game has been rated
    fn on_game_finished(&mut self, _session: &GameSession) {}

    fn on_elo_change(&mut self, _change: &EloChange) {}

    /// Once per tick in which at least one game completed
    fn on_batch_rated(&mut self, _registry: &PlayerRegistry, _finished: usize) {}
}

impl SimulationObserver for () {}

impl<O: SimulationObserver + ?Sized> SimulationObserver for &mut O {
    fn on_players_matched(&mut self, waits: &[PlayerWait]) {
        (**self).on_players_matched(waits)
    }

    fn on_game_started(&mut self, session: &GameSession) {
        (**self).on_game_started(session)
    }

    fn on_game_finished(&mut self, session: &GameSession) {
        (**self).on_game_finished(session)
    }

    fn on_elo_change(&mut self, change: &EloChange) {
        (**self).on_elo_change(change)
    }

    fn on_batch_rated(&mut self, registry: &PlayerRegistry, finished: usize) {
        (**self).on_batch_rated(registry, finished)
    }
}
