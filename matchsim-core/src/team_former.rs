//! Team formation from the waiting queue
//!
//! 1. The longest-waiting player is the anchor, so nobody starves.
//! 2. The anchor is joined by the players whose ELO is closest to theirs.
//! 3. The pool is sorted by ELO and dealt into teams with a shrinking stride
//!    (every `n`-th player, then every `n-1`-th of the rest, ...), which
//!    spreads neighbouring ratings across teams and keeps team sums close.

use crate::error::{Result, SimError};
use crate::player::{Player, PlayerId};
use crate::registry::{PlayerRegistry, PlayerStatus};

/// Pick `team_number` balanced rosters of `team_size` waiting players
///
/// Returns `Ok(None)` when too few players are waiting; nothing changes in
/// the registry either way.
pub fn form_teams(
    registry: &PlayerRegistry,
    team_size: usize,
    team_number: usize,
) -> Result<Option<Vec<Vec<PlayerId>>>> {
    let game_size = team_size * team_number;
    let mut waiting = registry.get(PlayerStatus::Waiting);
    if game_size == 0 || waiting.len() < game_size {
        return Ok(None);
    }

    let pool = select_pool(&mut waiting, game_size);
    let teams = deal_teams(pool, team_number);

    for team in &teams {
        if team.len() != team_size {
            return Err(SimError::RosterMismatch {
                expected: team_size,
                actual: team.len(),
            });
        }
    }

    Ok(Some(teams))
}

/// Anchor plus its `game_size - 1` nearest neighbours by ELO, sorted by ELO
fn select_pool<'a>(waiting: &mut Vec<&'a Player>, game_size: usize) -> Vec<&'a Player> {
    waiting.sort_by_key(|p| p.last_played_at());
    let anchor = waiting.remove(0);

    waiting.sort_by(|a, b| {
        let da = (a.elo() - anchor.elo()).abs();
        let db = (b.elo() - anchor.elo()).abs();
        da.total_cmp(&db)
    });

    let mut pool = Vec::with_capacity(game_size);
    pool.push(anchor);
    pool.extend(waiting.iter().take(game_size - 1).copied());
    pool.sort_by(|a, b| a.elo().total_cmp(&b.elo()));
    pool
}

/// Striped extraction with decreasing stride
fn deal_teams(mut pool: Vec<&Player>, team_number: usize) -> Vec<Vec<PlayerId>> {
    let mut teams = Vec::with_capacity(team_number);
    for i in 0..team_number {
        let stride = team_number - i;
        let (picked, rest): (Vec<_>, Vec<_>) = pool
            .into_iter()
            .enumerate()
            .partition(|(idx, _)| idx % stride == 0);
        teams.push(picked.into_iter().map(|(_, p)| p.id()).collect());
        pool = rest.into_iter().map(|(_, p)| p).collect();
    }
    teams
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Registry where player `i` started waiting `i` seconds after player 0
    fn make_registry(elos: &[f64]) -> PlayerRegistry {
        let players = elos
            .iter()
            .enumerate()
            .map(|(i, &elo)| Player::new(PlayerId(i as u32), 100, elo))
            .collect();
        let mut registry = PlayerRegistry::new(players).unwrap();
        let base = Instant::now();
        for i in 0..elos.len() {
            registry.set_at(
                &[PlayerId(i as u32)],
                PlayerStatus::Waiting,
                base + Duration::from_secs(i as u64),
            );
        }
        registry
    }

    fn team_elos(registry: &PlayerRegistry, team: &[PlayerId]) -> Vec<f64> {
        team.iter().map(|&id| registry.player(id).elo()).collect()
    }

    #[test]
    fn test_two_by_two_striping() {
        let registry = make_registry(&[1000.0, 1010.0, 1020.0, 1030.0]);
        let teams = form_teams(&registry, 2, 2).unwrap().unwrap();

        assert_eq!(team_elos(&registry, &teams[0]), vec![1000.0, 1020.0]);
        assert_eq!(team_elos(&registry, &teams[1]), vec![1010.0, 1030.0]);
    }

    #[test]
    fn test_three_teams_decreasing_stride() {
        let elos: Vec<f64> = (0..6).map(|i| 1000.0 + 10.0 * i as f64).collect();
        let registry = make_registry(&elos);
        let teams = form_teams(&registry, 2, 3).unwrap().unwrap();

        // stride 3 -> [0, 3]; stride 2 over [1, 2, 4, 5] -> [1, 4]; rest [2, 5]
        assert_eq!(team_elos(&registry, &teams[0]), vec![1000.0, 1030.0]);
        assert_eq!(team_elos(&registry, &teams[1]), vec![1010.0, 1040.0]);
        assert_eq!(team_elos(&registry, &teams[2]), vec![1020.0, 1050.0]);
    }

    #[test]
    fn test_anchor_pulls_nearest_elo() {
        // Player 0 waited longest; 1500 and 1490 are nearest to it
        let registry = make_registry(&[1500.0, 1000.0, 1490.0, 2200.0, 1520.0]);
        let teams = form_teams(&registry, 1, 3).unwrap().unwrap();

        let mut ids: Vec<u32> = teams.iter().flatten().map(|id| id.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 2, 4]);
    }

    #[test]
    fn test_not_enough_waiting_players() {
        let mut registry = make_registry(&[1000.0, 1100.0, 1200.0]);
        registry.set(&[PlayerId(0), PlayerId(1)], PlayerStatus::InGame);

        let result = form_teams(&registry, 1, 2).unwrap();

        assert!(result.is_none());
        assert_eq!(registry.status_of(PlayerId(0)), PlayerStatus::InGame);
        assert_eq!(registry.status_of(PlayerId(2)), PlayerStatus::Waiting);
    }

    #[test]
    fn test_in_game_players_never_selected() {
        let mut registry = make_registry(&[1000.0, 1001.0, 1002.0, 1003.0, 5000.0, 5001.0]);
        registry.set(&[PlayerId(1), PlayerId(2)], PlayerStatus::InGame);

        let teams = form_teams(&registry, 2, 2).unwrap().unwrap();
        let ids: HashSet<u32> = teams.iter().flatten().map(|id| id.0).collect();
        assert_eq!(ids, HashSet::from([0, 3, 4, 5]));
    }

    #[test]
    fn test_random_pools_keep_invariants() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            let team_size = rng.gen_range(1..=4);
            let team_number = rng.gen_range(2..=4);
            let n = team_size * team_number + rng.gen_range(0..10);
            let elos: Vec<f64> = (0..n).map(|_| rng.gen_range(800.0..2400.0)).collect();
            let registry = make_registry(&elos);

            let teams = form_teams(&registry, team_size, team_number)
                .unwrap()
                .unwrap();

            assert_eq!(teams.len(), team_number);
            assert!(teams.iter().all(|t| t.len() == team_size));
            let unique: HashSet<PlayerId> = teams.iter().flatten().copied().collect();
            assert_eq!(unique.len(), team_size * team_number);
            // Player 0 has waited longest
            assert!(unique.contains(&PlayerId(0)));
        }
    }
}
