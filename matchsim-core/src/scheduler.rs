//! Round scheduler - the matchmaking control loop
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration until the game budget is exceeded
//! - Level 2: tick() - one pass: form, reap, sleep
//! - Level 3: try_create_game(), handle_games(), finish_game()
//! - Level 4: session launch and wait sampling
//!
//! The scheduler is the only code that touches the registry or applies
//! ratings. Sessions run as separate tasks but own nothing shared: each one
//! carries a snapshot of its players and is handed back through its join
//! handle, so two games finishing together are still rated one at a time.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SimConfig;
use crate::error::{ConfigError, Result, SessionError, SimError};
use crate::observer::{PlayerWait, SimulationObserver};
use crate::player::{Player, PlayerId};
use crate::rating::rate_game;
use crate::registry::{PlayerRegistry, PlayerStatus};
use crate::session::GameSession;
use crate::team_former::form_teams;

/// Totals for a finished run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Games rated before the loop stopped
    pub games_completed: u64,
    /// Loop iterations
    pub ticks: u64,
    /// Most games in flight at once
    pub peak_active: usize,
}

struct ActiveSession {
    tag: String,
    players: Vec<PlayerId>,
    handle: JoinHandle<std::result::Result<GameSession, SessionError>>,
}

/// Drives team formation, game sessions and rating updates
pub struct RoundScheduler<O = ()> {
    config: SimConfig,
    registry: PlayerRegistry,
    active: Vec<ActiveSession>,
    rng: ChaCha8Rng,
    observer: O,
    completed: u64,
    ticks: u64,
    peak_active: usize,
}

impl RoundScheduler<()> {
    /// Create a scheduler without an observer
    pub fn new(config: SimConfig, players: Vec<Player>) -> Result<Self> {
        Self::with_observer(config, players, ())
    }
}

impl<O: SimulationObserver> RoundScheduler<O> {
    /// Validate the configuration and enroll every player as WAITING
    pub fn with_observer(config: SimConfig, players: Vec<Player>, observer: O) -> Result<Self> {
        config.validate()?;
        let registry = PlayerRegistry::new(players)?;

        let required = config.game_size();
        if registry.len() < required {
            return Err(ConfigError::InsufficientPopulation {
                available: registry.len(),
                required,
            }
            .into());
        }
        if registry.len() < required * 2 {
            tracing::warn!(
                "Population of {} fills only one game of {} at a time",
                registry.len(),
                required
            );
        }

        let rng = match config.seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self {
            config,
            registry,
            active: Vec::new(),
            rng,
            observer,
            completed: 0,
            ticks: 0,
            peak_active: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Games currently running
    pub fn active_games(&self) -> usize {
        self.active.len()
    }

    /// Games rated so far
    pub fn completed(&self) -> u64 {
        self.completed
    }

    // ========================================================================
    // Level 1 - Orchestration
    // ========================================================================

    /// Run until the number of completed games exceeds `max_round`
    ///
    /// The check is strictly greater-than and happens after a whole batch is
    /// reaped, so a run may overshoot the budget by the games of its last tick.
    pub async fn run(&mut self) -> Result<RunSummary> {
        tracing::info!(
            "Starting matchmaking: {} players, {} teams of {}, max_round={}",
            self.registry.len(),
            self.config.team_number,
            self.config.team_size,
            self.config.max_round
        );

        while self.completed <= self.config.max_round {
            self.tick().await?;
        }

        let summary = RunSummary {
            games_completed: self.completed,
            ticks: self.ticks,
            peak_active: self.peak_active,
        };
        tracing::info!(
            "Run finished: {} games over {} ticks, peak {} concurrent",
            summary.games_completed,
            summary.ticks,
            summary.peak_active
        );
        Ok(summary)
    }

    // ========================================================================
    // Level 2 - Phases
    // ========================================================================

    /// One loop iteration; returns the number of games reaped
    pub async fn tick(&mut self) -> Result<usize> {
        self.try_create_game()?;
        let finished = self.handle_games().await?;
        tokio::time::sleep(self.config.tick_interval()).await;

        self.ticks += 1;
        Ok(finished)
    }

    // ========================================================================
    // Level 3 - Steps
    // ========================================================================

    /// Form one game from the queue and launch it; returns its tag
    ///
    /// Must be called from within a tokio runtime.
    pub fn try_create_game(&mut self) -> Result<Option<String>> {
        let rosters = match form_teams(
            &self.registry,
            self.config.team_size,
            self.config.team_number,
        )? {
            Some(rosters) => rosters,
            None => return Ok(None),
        };

        let session = GameSession::new(
            &rosters,
            &self.registry,
            self.config.drift(),
            self.config.god_boost,
            &mut self.rng,
        );
        let ids = session.player_ids();

        let waits = self.sample_waits(&session);
        self.observer.on_players_matched(&waits);
        self.registry.set(&ids, PlayerStatus::InGame);
        self.observer.on_game_started(&session);

        let tag = session.tag().to_string();
        self.launch(session);
        Ok(Some(tag))
    }

    /// Rate and release every game whose task has finished, without waiting
    ///
    /// A failed game releases its players unrated. The rest of the batch is
    /// still rated before the first failure is returned, so the registry
    /// only holds IN_GAME players that belong to a running game.
    pub async fn handle_games(&mut self) -> Result<usize> {
        let (done, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|s| s.handle.is_finished());
        self.active = running;

        let mut finished = 0;
        let mut failure = None;
        for ActiveSession {
            tag,
            players,
            handle,
        } in done
        {
            let outcome = match handle.await {
                Ok(Ok(mut session)) => self.finish_game(&mut session),
                Ok(Err(source)) => Err(SimError::Session { tag, source }),
                Err(err) => Err(SimError::SessionPanicked {
                    tag,
                    reason: err.to_string(),
                }),
            };
            match outcome {
                Ok(()) => finished += 1,
                Err(err) => {
                    tracing::error!("{}", err);
                    self.registry.set(&players, PlayerStatus::Waiting);
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
        }

        self.completed += finished as u64;
        if finished > 0 {
            self.observer.on_batch_rated(&self.registry, finished);
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(finished),
        }
    }

    fn finish_game(&mut self, session: &mut GameSession) -> Result<()> {
        let changes = rate_game(session, &mut self.registry, self.config.k_factor, &mut self.rng)?;
        for change in &changes {
            self.observer.on_elo_change(change);
        }

        self.registry.set(&session.player_ids(), PlayerStatus::Waiting);
        self.observer.on_game_finished(session);
        Ok(())
    }

    // ========================================================================
    // Level 4 - Utilities
    // ========================================================================

    fn launch(&mut self, session: GameSession) {
        let tag = session.tag().to_string();
        let players = session.player_ids();
        let rng = ChaCha8Rng::seed_from_u64(self.rng.gen());
        let handle = tokio::spawn(session.run(self.config.game_duration(), rng));

        self.active.push(ActiveSession {
            tag,
            players,
            handle,
        });
        self.peak_active = self.peak_active.max(self.active.len());
    }

    fn sample_waits(&self, session: &GameSession) -> Vec<PlayerWait> {
        let now = Instant::now();
        session
            .player_ids()
            .into_iter()
            .map(|id| PlayerWait {
                player: id,
                waited: now.saturating_duration_since(self.registry.player(id).last_played_at()),
            })
            .collect()
    }
}
