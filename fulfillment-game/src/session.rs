use chrono::{DateTime, Utc};
use std::fmt;

use crate::card::Card;
use crate::data::InsuranceTemplate;
use crate::error::{DomainError, GameError, InvalidOperationError};
use crate::game::{ChallengeResult, DrawOutcome, Game};
use crate::observer::GameObserver;
use crate::rng::RngBundle;
use crate::stage::{GameStatus, Stage};
use crate::strategy::TurnStrategy;

/// Everything that happened during one call to [`GameSession::play_turn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// Turn the challenge was resolved on.
    pub turn: u32,
    pub stage: Stage,
    pub purchased: Option<Card>,
    pub offered: usize,
    pub hand: Vec<Card>,
    pub result: ChallengeResult,
    pub healed: i32,
    pub expired: Vec<Card>,
    pub status: GameStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Resolved(Box<TurnReport>),
    Victory,
    /// The game had already ended; nothing changed.
    Finished { status: GameStatus },
}

/// Binds a [`Game`] to its market, RNG streams and observers.
pub struct GameSession {
    game: Game,
    market: Vec<InsuranceTemplate>,
    rng: RngBundle,
    observers: Vec<Box<dyn GameObserver>>,
    resumed_at: DateTime<Utc>,
    prior_playtime_secs: u64,
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("game", &self.game.id())
            .field("status", &self.game.status())
            .field("turn", &self.game.turn())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl GameSession {
    #[must_use]
    pub fn new(game: Game) -> Self {
        Self::resume(game, 0)
    }

    /// Continue a restored game, carrying over previously accumulated playtime.
    #[must_use]
    pub fn resume(game: Game, prior_playtime_secs: u64) -> Self {
        let market = game.catalog().insurance_market.clone();
        let rng = RngBundle::for_turn(game.seed(), game.turn());
        Self {
            game,
            market,
            rng,
            observers: Vec::new(),
            resumed_at: Utc::now(),
            prior_playtime_secs,
        }
    }

    pub fn add_observer(&mut self, observer: impl GameObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    #[must_use]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// Apply a closure to the mutable game.
    pub fn with_game_mut<R>(&mut self, f: impl FnOnce(&mut Game) -> R) -> R {
        f(&mut self.game)
    }

    #[must_use]
    pub fn market(&self) -> &[InsuranceTemplate] {
        &self.market
    }

    #[must_use]
    pub const fn rng(&self) -> &RngBundle {
        &self.rng
    }

    /// Whole seconds played across every resume of this game.
    #[must_use]
    pub fn playtime_secs(&self) -> u64 {
        let current = (Utc::now() - self.resumed_at).num_seconds();
        self.prior_playtime_secs
            .saturating_add(u64::try_from(current).unwrap_or(0))
    }

    /// # Errors
    ///
    /// Returns `InvalidOperationError` if the game has already started.
    pub fn start(&mut self) -> Result<(), InvalidOperationError> {
        self.game.start()
    }

    /// Buy the market entry at `index`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperationError::UnknownInsurance` for a bad index, or
    /// whatever [`Game::buy_insurance`] rejects.
    pub fn buy_insurance(&mut self, index: usize) -> Result<Card, GameError> {
        let template = self
            .market
            .get(index)
            .ok_or(InvalidOperationError::UnknownInsurance { index })?;
        let card = self.game.buy_insurance(template)?;
        self.notify_if_finished();
        Ok(card)
    }

    /// Play one full turn: optional purchase, offer, select, draw, resolve, advance.
    ///
    /// # Errors
    ///
    /// Returns an error if the game is not running or the strategy picks a
    /// challenge outside the offer. A finished game is reported as
    /// [`TurnOutcome::Finished`] and left untouched.
    pub fn play_turn(&mut self, strategy: &mut dyn TurnStrategy) -> Result<TurnOutcome, GameError> {
        if self.game.is_finished() {
            return Ok(TurnOutcome::Finished {
                status: self.game.status(),
            });
        }

        let purchased = self.visit_market(strategy)?;
        if self.game.is_finished() {
            self.notify_if_finished();
            return Ok(TurnOutcome::Finished {
                status: self.game.status(),
            });
        }

        let stage_before = self.game.stage();
        let outcome = self.game.draw_challenges(self.rng.challenge())?;
        self.notify_stage_changes(stage_before);
        let offer = match outcome {
            DrawOutcome::Offered(offer) => offer,
            DrawOutcome::Victory => {
                self.notify_if_finished();
                return Ok(TurnOutcome::Victory);
            }
        };

        let picked = strategy
            .pick_challenge(&self.game, &offer, self.rng.strategy())
            .or_else(|| offer.first().map(|c| c.id))
            .ok_or(InvalidOperationError::NoCurrentChallenge)?;
        self.game.select_challenge(picked)?;

        let hand = self.game.draw_hand(self.rng.life())?;
        let turn = self.game.turn();
        let stage = self.game.stage();
        let result = self.game.resolve_challenge(&hand)?;

        let (healed, expired) = if result.game_over {
            (0, Vec::new())
        } else {
            let advance = self.game.next_turn()?;
            self.rng = RngBundle::for_turn(self.game.seed(), self.game.turn());
            (advance.healed, advance.expired)
        };

        let report = TurnReport {
            turn,
            stage,
            purchased,
            offered: offer.len(),
            hand,
            result,
            healed,
            expired,
            status: self.game.status(),
        };
        for observer in &mut self.observers {
            observer.on_turn_resolved(&self.game, &report);
        }
        self.notify_if_finished();
        Ok(TurnOutcome::Resolved(Box::new(report)))
    }

    /// Play until the game ends, returning the terminal status.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`Self::play_turn`].
    pub fn play_to_end(&mut self, strategy: &mut dyn TurnStrategy) -> Result<GameStatus, GameError> {
        if self.game.status() == GameStatus::NotStarted {
            self.start()?;
        }
        loop {
            match self.play_turn(strategy)? {
                TurnOutcome::Resolved(report) if !report.status.is_terminal() => {}
                _ => return Ok(self.game.status()),
            }
        }
    }

    fn visit_market(&mut self, strategy: &mut dyn TurnStrategy) -> Result<Option<Card>, GameError> {
        let Some(index) = strategy.pick_insurance(&self.game, &self.market, self.rng.strategy())
        else {
            return Ok(None);
        };
        let Some(template) = self.market.get(index) else {
            return Err(InvalidOperationError::UnknownInsurance { index }.into());
        };
        match self.game.buy_insurance(template) {
            Ok(card) => Ok(Some(card)),
            Err(GameError::Domain(DomainError::InsufficientVitality { required, available })) => {
                log::debug!("skipping {}: premium {required} > vitality {available}", template.name);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn notify_stage_changes(&mut self, before: Stage) {
        let mut from = before;
        while from < self.game.stage() {
            let Some(to) = from.next() else { break };
            for observer in &mut self.observers {
                observer.on_stage_advanced(&self.game, from, to);
            }
            from = to;
        }
    }

    fn notify_if_finished(&mut self) {
        if self.game.is_finished() {
            for observer in &mut self.observers {
                observer.on_game_finished(&self.game);
            }
        }
    }

    /// Consume the session, returning the underlying game.
    #[must_use]
    pub fn into_game(self) -> Game {
        self.game
    }
}
