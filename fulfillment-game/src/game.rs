//! The `Game` aggregate: turn, stage and phase state plus challenge resolution.
//!
//! All mutation goes through methods on [`Game`]. Each method checks status and
//! phase first and computes the full outcome before committing, so a rejected
//! call leaves the game exactly as it was.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::card::{Card, CardEffect, CardId, CardType, InsuranceTerm};
use crate::config::GameConfig;
use crate::data::{CardCatalog, InsuranceTemplate};
use crate::deck::{ChallengeDeck, LifeDeck};
use crate::error::{
    ConfigViolation, DomainError, GameError, IntegrityError, InvalidOperationError,
    ValidationError,
};
use crate::numbers::{i32_to_usize, i64_to_i32, usize_to_i32};
use crate::stage::{GameStatus, Phase, Stage};
use crate::values::{InsurancePremium, Vitality};

/// Challenges offered per draw.
pub const OFFER_SIZE: usize = 3;
/// Power of the insurance granted for clearing a challenge.
pub const REWARD_INSURANCE_POWER: i32 = 2;
pub const REWARD_SUFFIX: &str = "保険";
const CLEAR_SCORE: i32 = 10;
const DREAM_SCORE: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(Uuid);

impl GameId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Running counters over a single game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub challenges_attempted: u32,
    pub challenges_cleared: u32,
    pub challenges_failed: u32,
    pub dreams_fulfilled: u32,
    pub damage_taken: u32,
    pub damage_absorbed: u32,
    pub vitality_healed: u32,
    pub insurances_purchased: u32,
    pub insurances_expired: u32,
}

/// Outcome of resolving one challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeResult {
    pub challenge: Card,
    pub required_power: i32,
    pub total_power: i32,
    pub success: bool,
    /// `floor(surplus / 2)` on success, `-(deficit)` on failure.
    pub vitality_change: i32,
    /// Part of the deficit soaked up by active insurance shields.
    pub damage_absorbed: i32,
    pub vitality_after: i32,
    pub insurance_reward: Option<Card>,
    pub game_over: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    Offered(Vec<Card>),
    /// Every stage's deck is exhausted.
    Victory,
}

/// Bookkeeping produced by [`Game::next_turn`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TurnAdvance {
    pub turn: u32,
    pub healed: i32,
    pub expired: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub(crate) id: GameId,
    pub(crate) status: GameStatus,
    pub(crate) phase: Phase,
    pub(crate) stage: Stage,
    pub(crate) turn: u32,
    pub(crate) vitality: Vitality,
    pub(crate) insurances: Vec<Card>,
    pub(crate) challenge_deck: ChallengeDeck,
    #[serde(default)]
    pub(crate) life_deck: LifeDeck,
    #[serde(default)]
    pub(crate) offered: Vec<CardId>,
    #[serde(default)]
    pub(crate) current_challenge: Option<Card>,
    pub(crate) score: i32,
    pub(crate) config: GameConfig,
    pub(crate) seed: u64,
    #[serde(default)]
    pub(crate) stats: GameStats,
    #[serde(skip)]
    pub(crate) catalog: Arc<CardCatalog>,
}

impl Game {
    /// # Errors
    ///
    /// Returns `ValidationError` listing every violated config constraint.
    pub fn new(
        config: GameConfig,
        catalog: Arc<CardCatalog>,
        seed: u64,
    ) -> Result<Self, ValidationError> {
        config.validate()?;
        let vitality = Vitality::full(config.starting_vitality).map_err(|err| ValidationError {
            violations: vec![ConfigViolation::new("starting_vitality", err.to_string())],
        })?;
        let challenge_deck =
            ChallengeDeck::for_stage(Stage::Youth, &catalog, config.dream_card_count);
        let life_deck = LifeDeck::from_catalog(&catalog);
        let mut game = Self {
            id: GameId::new(),
            status: GameStatus::NotStarted,
            phase: Phase::Setup,
            stage: Stage::Youth,
            turn: 1,
            vitality,
            insurances: Vec::new(),
            challenge_deck,
            life_deck,
            offered: Vec::new(),
            current_challenge: None,
            score: 0,
            config,
            seed,
            stats: GameStats::default(),
            catalog,
        };
        game.refresh_score();
        Ok(game)
    }

    /// Reattach card data after deserialization. A life pool without
    /// templates (older snapshots) is rebuilt from the catalog.
    #[must_use]
    pub fn rehydrate(mut self, catalog: Arc<CardCatalog>) -> Self {
        if self.life_deck.templates().is_empty() {
            self.life_deck = LifeDeck::from_catalog(&catalog);
        }
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub const fn id(&self) -> GameId {
        self.id
    }

    #[must_use]
    pub const fn status(&self) -> GameStatus {
        self.status
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    #[must_use]
    pub const fn vitality(&self) -> Vitality {
        self.vitality
    }

    #[must_use]
    pub const fn max_vitality(&self) -> i32 {
        self.vitality.max()
    }

    /// Active insurances.
    #[must_use]
    pub fn insurances(&self) -> &[Card] {
        &self.insurances
    }

    #[must_use]
    pub const fn challenge_deck(&self) -> &ChallengeDeck {
        &self.challenge_deck
    }

    #[must_use]
    pub const fn life_deck(&self) -> &LifeDeck {
        &self.life_deck
    }

    #[must_use]
    pub fn offered(&self) -> &[CardId] {
        &self.offered
    }

    #[must_use]
    pub const fn current_challenge(&self) -> Option<&Card> {
        self.current_challenge.as_ref()
    }

    #[must_use]
    pub const fn score(&self) -> i32 {
        self.score
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn stats(&self) -> &GameStats {
        &self.stats
    }

    #[must_use]
    pub fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.status == GameStatus::GameOver
    }

    #[must_use]
    pub fn is_victory(&self) -> bool {
        self.status == GameStatus::Victory
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    fn ensure_in_progress(&self, action: &'static str) -> Result<(), InvalidOperationError> {
        if self.status == GameStatus::InProgress {
            Ok(())
        } else {
            Err(InvalidOperationError::WrongStatus {
                action,
                status: self.status,
            })
        }
    }

    fn ensure_phase(&self, action: &'static str, expected: Phase) -> Result<(), InvalidOperationError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(InvalidOperationError::WrongPhase {
                action,
                expected,
                actual: self.phase,
            })
        }
    }

    /// `not_started -> in_progress`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperationError` unless the game has not started yet.
    pub fn start(&mut self) -> Result<(), InvalidOperationError> {
        if self.status != GameStatus::NotStarted {
            return Err(InvalidOperationError::WrongStatus {
                action: "start",
                status: self.status,
            });
        }
        self.status = GameStatus::InProgress;
        self.phase = Phase::Draw;
        log::info!(
            "game {} started: difficulty {}, vitality {}",
            self.id,
            self.config.difficulty,
            self.vitality
        );
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `InvalidOperationError` unless the game is in progress.
    pub fn pause(&mut self) -> Result<(), InvalidOperationError> {
        self.ensure_in_progress("pause")?;
        self.status = GameStatus::Paused;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `InvalidOperationError` unless the game is paused.
    pub fn resume(&mut self) -> Result<(), InvalidOperationError> {
        if self.status != GameStatus::Paused {
            return Err(InvalidOperationError::WrongStatus {
                action: "resume",
                status: self.status,
            });
        }
        self.status = GameStatus::InProgress;
        Ok(())
    }

    /// Offer up to [`OFFER_SIZE`] unused challenges. An exhausted deck moves to
    /// the next stage; exhausting the final stage is a victory.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperationError` outside the draw phase of a running game.
    pub fn draw_challenges<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<DrawOutcome, InvalidOperationError> {
        self.ensure_in_progress("draw challenges")?;
        self.ensure_phase("draw challenges", Phase::Draw)?;
        loop {
            if !self.challenge_deck.is_exhausted() {
                let offer = self.challenge_deck.offer(rng, OFFER_SIZE);
                self.offered = offer.iter().map(|c| c.id).collect();
                self.phase = Phase::Challenge;
                return Ok(DrawOutcome::Offered(offer));
            }
            match self.stage.next() {
                Some(next) => self.advance_stage(next),
                None => {
                    self.status = GameStatus::Victory;
                    self.offered.clear();
                    self.refresh_score();
                    log::info!(
                        "game {} won on turn {} with score {}",
                        self.id,
                        self.turn,
                        self.score
                    );
                    return Ok(DrawOutcome::Victory);
                }
            }
        }
    }

    fn advance_stage(&mut self, next: Stage) {
        debug_assert!(next > self.stage);
        log::info!("game {} advancing stage {} -> {}", self.id, self.stage, next);
        self.stage = next;
        self.challenge_deck
            .refill_for(next, &self.catalog, self.config.dream_card_count);
    }

    /// Pick a challenge from the current offer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperationError` outside the challenge phase or when `id`
    /// was not offered.
    pub fn select_challenge(&mut self, id: CardId) -> Result<Card, InvalidOperationError> {
        self.ensure_in_progress("select a challenge")?;
        self.ensure_phase("select a challenge", Phase::Challenge)?;
        if !self.offered.contains(&id) {
            return Err(InvalidOperationError::ChallengeNotOffered { id });
        }
        let card = self
            .challenge_deck
            .mark_used(id)
            .ok_or(InvalidOperationError::ChallengeNotOffered { id })?;
        self.offered.clear();
        self.current_challenge = Some(card.clone());
        self.phase = Phase::CardSelection;
        Ok(card)
    }

    /// Base power plus the stage modifier.
    #[must_use]
    pub fn required_power_for(&self, challenge: &Card) -> i32 {
        challenge
            .power_value()
            .value()
            .saturating_add(self.stage.power_modifier())
    }

    #[must_use]
    pub fn required_power(&self) -> Option<i32> {
        self.current_challenge
            .as_ref()
            .map(|c| self.required_power_for(c))
    }

    /// Number of life cards to draw: the required power, capped at
    /// `max_hand_size`. Before a challenge is chosen this is the starting hand.
    #[must_use]
    pub fn hand_size(&self) -> usize {
        self.required_power().map_or(self.config.starting_hand_size, |power| {
            i32_to_usize(power).min(self.config.max_hand_size)
        })
    }

    /// Draw [`Self::hand_size`] life cards for the selected challenge.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperationError` outside the card selection phase.
    pub fn draw_hand<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Vec<Card>, InvalidOperationError> {
        self.ensure_in_progress("draw a hand")?;
        self.ensure_phase("draw a hand", Phase::CardSelection)?;
        let count = self.hand_size();
        Ok(self.life_deck.draw_hand(rng, count))
    }

    /// Damage absorbed per failed challenge by all active insurances.
    #[must_use]
    pub fn total_shield(&self) -> i32 {
        self.insurances.iter().map(Card::shield_amount).sum()
    }

    /// Vitality restored per turn advance by all active insurances.
    #[must_use]
    pub fn total_heal(&self) -> i32 {
        self.insurances.iter().map(Card::heal_amount).sum()
    }

    /// Compare the hand against the current challenge and apply the outcome.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperationError` outside the card selection phase or when
    /// the hand contains a non-life card.
    pub fn resolve_challenge(&mut self, hand: &[Card]) -> Result<ChallengeResult, GameError> {
        self.ensure_in_progress("resolve a challenge")?;
        self.ensure_phase("resolve a challenge", Phase::CardSelection)?;
        let challenge = self
            .current_challenge
            .clone()
            .ok_or(InvalidOperationError::NoCurrentChallenge)?;
        if let Some(card) = hand.iter().find(|c| c.card_type != CardType::Life) {
            return Err(InvalidOperationError::NotALifeCard { id: card.id }.into());
        }

        let required_power = self.required_power_for(&challenge);
        let raw_total: i64 = hand.iter().map(|card| i64::from(card.power)).sum();
        let total_power = i64_to_i32(raw_total);
        let success = raw_total >= i64::from(required_power);

        let (vitality_change, damage_absorbed, next_vitality) = if success {
            let heal = i64_to_i32((raw_total - i64::from(required_power)) / 2);
            (heal, 0, self.vitality.increase(heal)?)
        } else {
            let damage = i64_to_i32(i64::from(required_power) - raw_total);
            let absorbed = damage.min(self.total_shield());
            (-damage, absorbed, self.vitality.decrease(damage - absorbed)?)
        };
        let insurance_reward = success.then(|| reward_insurance(&challenge));

        let before = self.vitality.value();
        self.vitality = next_vitality;
        self.stats.challenges_attempted += 1;
        if success {
            self.stats.challenges_cleared += 1;
            if challenge.card_type == CardType::Dream {
                self.stats.dreams_fulfilled += 1;
            }
            self.stats.vitality_healed += non_negative(next_vitality.value() - before);
        } else {
            self.stats.challenges_failed += 1;
            self.stats.damage_taken += non_negative(before - next_vitality.value());
            self.stats.damage_absorbed += non_negative(damage_absorbed);
        }
        if let Some(reward) = &insurance_reward {
            self.insurances.push(reward.clone());
        }
        let game_over = self.vitality.is_depleted();
        if game_over {
            self.status = GameStatus::GameOver;
            log::info!("game {} over on turn {}", self.id, self.turn);
        }
        self.phase = Phase::Resolution;
        self.refresh_score();

        log::debug!(
            "turn {} [{}] {}: required {} total {} -> {} ({:+}), vitality {}",
            self.turn,
            self.stage,
            challenge.name,
            required_power,
            total_power,
            if success { "success" } else { "failure" },
            vitality_change,
            self.vitality
        );

        Ok(ChallengeResult {
            challenge,
            required_power,
            total_power,
            success,
            vitality_change,
            damage_absorbed,
            vitality_after: self.vitality.value(),
            insurance_reward,
            game_over,
        })
    }

    /// Close the turn: per-turn heals, term expiry, turn counter, back to draw.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperationError` outside the resolution phase of a running game.
    pub fn next_turn(&mut self) -> Result<TurnAdvance, GameError> {
        self.ensure_in_progress("advance the turn")?;
        self.ensure_phase("advance the turn", Phase::Resolution)?;

        let before = self.vitality.value();
        self.vitality = self.vitality.increase(self.total_heal())?;
        let healed = self.vitality.value() - before;
        self.stats.vitality_healed += non_negative(healed);

        let mut kept = Vec::with_capacity(self.insurances.len());
        let mut expired = Vec::new();
        for mut card in self.insurances.drain(..) {
            let lapsed = card.insurance_term.as_mut().is_some_and(InsuranceTerm::tick);
            if lapsed {
                expired.push(card);
            } else {
                kept.push(card);
            }
        }
        self.insurances = kept;
        self.stats.insurances_expired += usize_to_i32(expired.len()).unsigned_abs();

        self.turn += 1;
        self.current_challenge = None;
        self.phase = Phase::Draw;
        self.refresh_score();
        Ok(TurnAdvance {
            turn: self.turn,
            healed,
            expired,
        })
    }

    /// Premium for a market template at this game's difficulty.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the template premium is out of range.
    pub fn premium_for(&self, template: &InsuranceTemplate) -> Result<InsurancePremium, DomainError> {
        template.premium(self.config.premium_multiplier())
    }

    /// Buy an insurance from the market, paying its premium in vitality.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperationError` outside the draw phase and
    /// `DomainError::InsufficientVitality` when the premium exceeds vitality.
    pub fn buy_insurance(&mut self, template: &InsuranceTemplate) -> Result<Card, GameError> {
        self.ensure_in_progress("buy insurance")?;
        self.ensure_phase("buy insurance", Phase::Draw)?;
        let premium = self.premium_for(template)?;
        if premium.value() > self.vitality.value() {
            return Err(DomainError::InsufficientVitality {
                required: premium.value(),
                available: self.vitality.value(),
            }
            .into());
        }
        self.vitality = self.vitality.decrease(premium.value())?;
        let card = template.to_card();
        self.insurances.push(card.clone());
        self.stats.insurances_purchased += 1;
        if self.vitality.is_depleted() {
            self.status = GameStatus::GameOver;
            log::info!("game {} over after paying premium {}", self.id, premium);
        }
        self.refresh_score();
        Ok(card)
    }

    pub(crate) fn refresh_score(&mut self) {
        let cleared = i32::try_from(self.stats.challenges_cleared).unwrap_or(i32::MAX);
        let dreams = i32::try_from(self.stats.dreams_fulfilled).unwrap_or(i32::MAX);
        let insurance: i32 = self.insurances.iter().map(Card::score_value).sum();
        self.score = cleared
            .saturating_mul(CLEAR_SCORE)
            .saturating_add(dreams.saturating_mul(DREAM_SCORE))
            .saturating_add(self.vitality.value())
            .saturating_add(insurance);
    }

    /// Semantic checks applied to loaded snapshots.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityError::Invariant` naming the first broken rule.
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        let fail = |msg: String| Err(IntegrityError::Invariant(msg));
        if (self.status == GameStatus::GameOver) != self.vitality.is_depleted() {
            return fail(format!(
                "status {} inconsistent with vitality {}",
                self.status, self.vitality
            ));
        }
        if self.vitality.max() != self.config.starting_vitality {
            return fail(format!(
                "max vitality {} differs from configured {}",
                self.vitality.max(),
                self.config.starting_vitality
            ));
        }
        if self.turn == 0 {
            return fail("turn counter is zero".to_string());
        }
        let resolved = self.stats.challenges_cleared + self.stats.challenges_failed;
        if resolved > self.stats.challenges_attempted {
            return fail(format!(
                "{resolved} resolved challenges exceed {} attempted",
                self.stats.challenges_attempted
            ));
        }
        if let Some(card) = self
            .insurances
            .iter()
            .find(|c| c.card_type != CardType::Insurance)
        {
            return fail(format!("active insurance {} is a {} card", card.id, card.card_type));
        }
        if self.challenge_deck.stage() != self.stage {
            return fail(format!(
                "deck stage {} differs from game stage {}",
                self.challenge_deck.stage(),
                self.stage
            ));
        }
        if self.phase == Phase::CardSelection && self.current_challenge.is_none() {
            return fail("card selection phase without a challenge".to_string());
        }
        Ok(())
    }
}

fn non_negative(value: i32) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(0)
}

/// Insurance synthesized for clearing `challenge`.
#[must_use]
pub fn reward_insurance(challenge: &Card) -> Card {
    Card::insurance(
        format!("{}{REWARD_SUFFIX}", challenge.name),
        REWARD_INSURANCE_POWER,
        [CardEffect::ChallengeReward {
            challenge_id: challenge.id,
            challenge_name: challenge.name.clone(),
        }],
    )
    .with_description(format!("{}を乗り越えた証", challenge.name))
}
