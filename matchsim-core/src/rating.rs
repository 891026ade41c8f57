//! ELO rating updates for resolved games
//!
//! Multi-team games are decomposed into every player-versus-player pairing
//! across different teams. Each player's update is the mean of their pairwise
//! deltas, so the step size does not grow with team size or team count.

use rand::Rng;

use crate::error::{Result, SimError};
use crate::player::{rating, EloChange, Player, PlayerId};
use crate::registry::PlayerRegistry;
use crate::session::{GameSession, PairOutcome, SessionState};

/// Expected score of `a` against `b`
pub fn expected_score(a: &Player, b: &Player) -> f64 {
    expected_score_from_elo(a.elo(), b.elo())
}

pub fn expected_score_from_elo(a_elo: f64, b_elo: f64) -> f64 {
    let (ra, rb) = (rating(a_elo), rating(b_elo));
    ra / (ra + rb)
}

/// ELO delta for `a` given its outcome against `b`
///
/// Antisymmetric: `rating_delta(a, b, o, k) == -rating_delta(b, a, o.invert(), k)`.
pub fn rating_delta(a: &Player, b: &Player, outcome: PairOutcome, k_factor: f64) -> f64 {
    k_factor * (outcome.score() - expected_score(a, b))
}

/// Pending update for one player, computed from pre-game ratings
struct PlayerUpdate {
    id: PlayerId,
    delta: f64,
    wins: u32,
    losses: u32,
}

/// Apply the outcome of a scored game to every participant
///
/// All deltas are computed from the ratings held before this game, then
/// applied together. Win and loss counters move once per opposing team.
/// With drift enabled each player's true rating is nudged afterwards.
pub fn rate_game<R: Rng + ?Sized>(
    session: &mut GameSession,
    registry: &mut PlayerRegistry,
    k_factor: f64,
    rng: &mut R,
) -> Result<Vec<EloChange>> {
    if session.state() != SessionState::Scored {
        return Err(SimError::NotScored(session.tag().to_string()));
    }

    let updates = compute_updates(session, registry, k_factor)?;
    let mut changes = Vec::with_capacity(updates.len());

    for update in updates {
        let player = registry.player_mut(update.id);
        player.record_results(update.wins, update.losses);
        changes.push(player.apply_elo_delta(update.delta));
        if let Some(amount) = session.nudge() {
            apply_nudge(player, amount, rng);
        }
    }

    session.mark_rated();
    Ok(changes)
}

fn compute_updates(
    session: &GameSession,
    registry: &PlayerRegistry,
    k_factor: f64,
) -> Result<Vec<PlayerUpdate>> {
    let teams = session.teams();
    let mut updates = Vec::new();

    for (ti, team) in teams.iter().enumerate() {
        for member in team.members() {
            let player = registry.player(member.id);
            let mut deltas = Vec::new();
            let (mut wins, mut losses) = (0, 0);

            for (oi, other) in teams.iter().enumerate() {
                if oi == ti {
                    continue;
                }
                let outcome = team
                    .compare(other)
                    .ok_or_else(|| SimError::NotScored(session.tag().to_string()))?;
                match outcome {
                    PairOutcome::Win => wins += 1,
                    PairOutcome::Loss => losses += 1,
                    PairOutcome::Draw => {}
                }
                for opponent in other.members() {
                    deltas.push(rating_delta(
                        player,
                        registry.player(opponent.id),
                        outcome,
                        k_factor,
                    ));
                }
            }

            let delta = if deltas.is_empty() {
                0.0
            } else {
                deltas.iter().sum::<f64>() / deltas.len() as f64
            };
            updates.push(PlayerUpdate {
                id: member.id,
                delta,
                wins,
                losses,
            });
        }
    }

    Ok(updates)
}

/// Drift a player's latent skill by `amount`
///
/// Regular players move up or down with equal odds; gods always move up.
pub fn apply_nudge<R: Rng + ?Sized>(player: &mut Player, amount: u32, rng: &mut R) {
    let up = player.is_god() || rng.gen_bool(0.5);
    player.shift_true_rating(amount, up);
}
