//! Game sessions - one running contest between teams
//!
//! A session is moved into its task while the game runs and handed back
//! through the task's join handle once scored, so only the scheduler ever
//! holds it between lifecycle steps.

use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::error::SessionError;
use crate::player::{Player, PlayerId};
use crate::registry::PlayerRegistry;

const TAG_LEN: usize = 5;

/// Lifecycle of a game
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Running,
    Scored,
    Rated,
}

/// Pairwise outcome from the first side's point of view
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairOutcome {
    Win,
    Loss,
    Draw,
}

impl PairOutcome {
    pub fn invert(self) -> Self {
        match self {
            PairOutcome::Win => PairOutcome::Loss,
            PairOutcome::Loss => PairOutcome::Win,
            PairOutcome::Draw => PairOutcome::Draw,
        }
    }

    /// Actual score fed into the ELO formula
    pub fn score(self) -> f64 {
        match self {
            PairOutcome::Win => 1.0,
            PairOutcome::Loss => 0.0,
            PairOutcome::Draw => 0.5,
        }
    }
}

/// Player data frozen when the game is launched
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Member {
    pub id: PlayerId,
    pub elo: f64,
    pub true_rating: u32,
    pub god: bool,
}

impl From<&Player> for Member {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id(),
            elo: player.elo(),
            true_rating: player.true_rating(),
            god: player.is_god(),
        }
    }
}

/// A roster plus its score once the outcome is resolved
#[derive(Clone, Debug)]
pub struct Team {
    members: Vec<Member>,
    score: Option<u32>,
}

impl Team {
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members,
            score: None,
        }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn score(&self) -> Option<u32> {
        self.score
    }

    /// Outcome of this team against `other`; None until both are scored
    pub fn compare(&self, other: &Team) -> Option<PairOutcome> {
        let (mine, theirs) = (self.score?, other.score?);
        Some(match mine.cmp(&theirs) {
            std::cmp::Ordering::Greater => PairOutcome::Win,
            std::cmp::Ordering::Less => PairOutcome::Loss,
            std::cmp::Ordering::Equal => PairOutcome::Draw,
        })
    }

    /// Strength weight for the outcome draw
    ///
    /// Averages true rating when drift is enabled and ELO otherwise, then
    /// inflates the average by `god_boost` once per god on the roster.
    pub fn strength(&self, use_true_rating: bool, god_boost: f64) -> f64 {
        let total: f64 = self
            .members
            .iter()
            .map(|m| if use_true_rating { m.true_rating as f64 } else { m.elo })
            .sum();
        let avg = total / self.members.len() as f64;
        let gods = self.members.iter().filter(|m| m.god).count();
        avg + avg * god_boost * gods as f64
    }
}

/// One contest between a fixed set of teams
#[derive(Clone, Debug)]
pub struct GameSession {
    tag: String,
    teams: Vec<Team>,
    nudge: Option<u32>,
    god_boost: f64,
    state: SessionState,
}

impl GameSession {
    /// Build a session from rosters, snapshotting each player's ratings
    pub fn new<R: Rng + ?Sized>(
        rosters: &[Vec<PlayerId>],
        registry: &PlayerRegistry,
        nudge: Option<u32>,
        god_boost: f64,
        rng: &mut R,
    ) -> Self {
        let teams = rosters
            .iter()
            .map(|roster| {
                Team::new(
                    roster
                        .iter()
                        .map(|&id| Member::from(registry.player(id)))
                        .collect(),
                )
            })
            .collect();

        Self::from_teams(teams, random_tag(rng), nudge, god_boost)
    }

    /// Build a session from prepared teams
    pub fn from_teams(teams: Vec<Team>, tag: String, nudge: Option<u32>, god_boost: f64) -> Self {
        Self {
            tag,
            teams,
            nudge: nudge.filter(|&n| n > 0),
            god_boost,
            state: SessionState::Created,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn nudge(&self) -> Option<u32> {
        self.nudge
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every player in the game, team by team
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.teams
            .iter()
            .flat_map(|team| team.members.iter().map(|m| m.id))
            .collect()
    }

    /// Let the game clock run, then resolve the outcome
    pub async fn run(mut self, duration: Duration, mut rng: ChaCha8Rng) -> Result<Self, SessionError> {
        self.state = SessionState::Running;
        tracing::debug!("Game {} started", self.tag);
        tokio::time::sleep(duration).await;
        self.compute_score(&mut rng)?;
        tracing::debug!("Game {} finished", self.tag);
        Ok(self)
    }

    /// Rank teams by a strength-weighted draw without replacement
    ///
    /// The first team drawn gets the highest score, the last gets 0.
    pub fn compute_score<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SessionError> {
        let use_true_rating = self.nudge.is_some();
        let mut remaining: Vec<(usize, f64)> = Vec::with_capacity(self.teams.len());
        for (i, team) in self.teams.iter().enumerate() {
            let strength = team.strength(use_true_rating, self.god_boost);
            if !strength.is_finite() || strength < 0.0 {
                return Err(SessionError::InvalidStrength { team: i, strength });
            }
            remaining.push((i, strength));
        }

        let mut draw_order = Vec::with_capacity(remaining.len());
        while !remaining.is_empty() {
            let pick = draw_one(&remaining, rng)?;
            draw_order.push(remaining.remove(pick).0);
        }

        for (score, &team) in draw_order.iter().rev().enumerate() {
            self.teams[team].score = Some(score as u32);
        }
        self.state = SessionState::Scored;
        Ok(())
    }

    pub(crate) fn mark_rated(&mut self) {
        self.state = SessionState::Rated;
    }

    #[cfg(test)]
    pub(crate) fn force_scores(&mut self, scores: &[u32]) {
        for (team, &score) in self.teams.iter_mut().zip(scores) {
            team.score = Some(score);
        }
        self.state = SessionState::Scored;
    }
}

/// Index into `remaining` chosen with probability proportional to weight
///
/// Fails with `WeightedError::AllWeightsZero` when two or more teams are
/// left and none of them has any strength.
fn draw_one<R: Rng + ?Sized>(remaining: &[(usize, f64)], rng: &mut R) -> Result<usize, SessionError> {
    if remaining.len() == 1 {
        return Ok(0);
    }
    let dist = WeightedIndex::new(remaining.iter().map(|&(_, w)| w))?;
    Ok(dist.sample(rng))
}

fn random_tag<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..TAG_LEN)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::distributions::WeightedError;
    use rand::SeedableRng;

    fn member(id: u32, elo: f64, true_rating: u32, god: bool) -> Member {
        Member {
            id: PlayerId(id),
            elo,
            true_rating,
            god,
        }
    }

    fn make_session(strengths: &[f64]) -> GameSession {
        let teams = strengths
            .iter()
            .enumerate()
            .map(|(i, &elo)| Team::new(vec![member(i as u32, elo, 0, false)]))
            .collect();
        GameSession::from_teams(teams, "tests".to_string(), None, 0.0)
    }

    #[test]
    fn test_pair_outcome_invert() {
        assert_eq!(PairOutcome::Win.invert(), PairOutcome::Loss);
        assert_eq!(PairOutcome::Loss.invert(), PairOutcome::Win);
        assert_eq!(PairOutcome::Draw.invert(), PairOutcome::Draw);
    }

    #[test]
    fn test_strength_uses_elo_without_drift() {
        let team = Team::new(vec![member(0, 1000.0, 50, false), member(1, 1200.0, 150, false)]);
        assert_eq!(team.strength(false, 2.0), 1100.0);
        assert_eq!(team.strength(true, 2.0), 100.0);
    }

    #[test]
    fn test_strength_god_boost() {
        let team = Team::new(vec![member(0, 1000.0, 0, true), member(1, 1000.0, 0, true)]);
        // avg + avg * boost * gods = 1000 + 1000 * 0.5 * 2
        assert_eq!(team.strength(false, 0.5), 2000.0);
    }

    #[test]
    fn test_compare_requires_scores() {
        let a = Team::new(vec![member(0, 1000.0, 0, false)]);
        let b = Team::new(vec![member(1, 1000.0, 0, false)]);
        assert_eq!(a.compare(&b), None);
    }

    #[test]
    fn test_compute_score_is_permutation() {
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut session = make_session(&[1000.0, 1500.0, 1200.0, 900.0]);
            session.compute_score(&mut rng).unwrap();

            let mut scores: Vec<u32> = session
                .teams()
                .iter()
                .map(|t| t.score().unwrap())
                .collect();
            scores.sort_unstable();
            assert_eq!(scores, vec![0, 1, 2, 3]);
            assert_eq!(session.state(), SessionState::Scored);
        }
    }

    #[test]
    fn test_compute_score_favors_stronger_team() {
        for seed in 0..100 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut session = make_session(&[1.0, 1.0e9]);
            session.compute_score(&mut rng).unwrap();
            assert_eq!(session.teams()[1].score(), Some(1));
            assert_eq!(session.teams()[0].score(), Some(0));
        }
    }

    #[test]
    fn test_compute_score_outcome_is_random() {
        let mut strong_wins = 0;
        for seed in 0..400 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut session = make_session(&[1000.0, 3000.0]);
            session.compute_score(&mut rng).unwrap();
            if session.teams()[1].score() == Some(1) {
                strong_wins += 1;
            }
        }
        // Expected 75% for a 3:1 strength ratio
        assert!(strong_wins > 250 && strong_wins < 350, "got {}", strong_wins);
    }

    #[test]
    fn test_compute_score_all_zero_strength_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut session = make_session(&[0.0, 0.0, 0.0]);
        let err = session.compute_score(&mut rng).unwrap_err();
        assert!(matches!(err, SessionError::Draw(WeightedError::AllWeightsZero)));
        assert_eq!(session.state(), SessionState::Created);
        assert!(session.teams().iter().all(|t| t.score().is_none()));
    }

    #[test]
    fn test_compute_score_zero_strength_last_place() {
        // One strong team is drawn first; the single zero team left takes 0
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut session = make_session(&[0.0, 1500.0]);
            session.compute_score(&mut rng).unwrap();
            assert_eq!(session.teams()[1].score(), Some(1));
            assert_eq!(session.teams()[0].score(), Some(0));
        }
    }

    #[test]
    fn test_compute_score_two_zero_teams_after_draw_fail() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut session = make_session(&[0.0, 1500.0, 0.0]);
        let err = session.compute_score(&mut rng).unwrap_err();
        assert!(matches!(err, SessionError::Draw(WeightedError::AllWeightsZero)));
    }

    #[test]
    fn test_compute_score_rejects_negative_strength() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut session = make_session(&[1000.0, -5.0]);
        let err = session.compute_score(&mut rng).unwrap_err();
        assert!(matches!(err, SessionError::InvalidStrength { team: 1, .. }));
        assert_eq!(session.state(), SessionState::Created);
    }

    #[test]
    fn test_random_tag_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let tag = random_tag(&mut rng);
        assert_eq!(tag.len(), TAG_LEN);
        assert!(tag.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_zero_nudge_normalised() {
        let session = GameSession::from_teams(vec![], "x".to_string(), Some(0), 1.0);
        assert_eq!(session.nudge(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_scores_after_duration() {
        let session = make_session(&[1000.0, 1100.0]);
        let start = tokio::time::Instant::now();
        let rng = ChaCha8Rng::seed_from_u64(5);

        let session = session.run(Duration::from_millis(250), rng).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(250));
        assert_eq!(session.state(), SessionState::Scored);
        assert!(session.teams().iter().all(|t| t.score().is_some()));
    }
}
