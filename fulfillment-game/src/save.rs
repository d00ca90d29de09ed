//! Versioned snapshot format.
//!
//! Every snapshot carries an explicit `version` tag and loading dispatches to
//! the decoder for that version. Version 1 stored vitality as `health` /
//! `max_health` and insurances as `insurance_cards`; version 2 is the current
//! shape plus a SHA-256 checksum over the canonical game state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::sync::Arc;

use crate::card::Card;
use crate::config::GameConfig;
use crate::data::CardCatalog;
use crate::deck::{ChallengeDeck, LifeDeck};
use crate::error::{GameError, IntegrityError, PersistenceError};
use crate::game::{Game, GameId, GameStats};
use crate::stage::{GameStatus, Phase, Stage};
use crate::values::Vitality;

pub const SAVE_VERSION: u64 = 2;
pub const LEGACY_SAVE_VERSION: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMetadata {
    pub saved_at: DateTime<Utc>,
    /// Seconds.
    pub playtime: u64,
}

/// A decoded snapshot in the current in-memory shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveData {
    pub version: u64,
    pub game_state: Game,
    pub metadata: SaveMetadata,
    pub checksum: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    game_state: Value,
    metadata: SaveMetadata,
    #[serde(default)]
    checksum: Option<String>,
}

impl SaveData {
    /// Snapshot `game` at the current time.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Serialization` if the game cannot be encoded.
    pub fn capture(game: &Game, playtime: u64) -> Result<Self, PersistenceError> {
        let checksum = checksum_of(&serde_json::to_value(game)?)?;
        Ok(Self {
            version: SAVE_VERSION,
            game_state: game.clone(),
            metadata: SaveMetadata {
                saved_at: Utc::now(),
                playtime,
            },
            checksum,
        })
    }

    /// # Errors
    ///
    /// Returns `PersistenceError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode any supported version into the current shape.
    ///
    /// # Errors
    ///
    /// * `IntegrityError::MissingVersion` when the tag is absent.
    /// * `PersistenceError::UnsupportedVersion` for unknown versions.
    /// * `IntegrityError` for malformed, tampered or inconsistent snapshots.
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let raw: Value =
            serde_json::from_str(json).map_err(|e| IntegrityError::Malformed(e.to_string()))?;
        let version = raw
            .get("version")
            .ok_or(IntegrityError::MissingVersion)?
            .as_u64()
            .ok_or_else(|| IntegrityError::Malformed("version is not an unsigned integer".into()))?;
        let data = match version {
            LEGACY_SAVE_VERSION => decode_v1(raw)?,
            SAVE_VERSION => decode_v2(raw)?,
            other => return Err(PersistenceError::UnsupportedVersion { version: other }.into()),
        };
        data.game_state.check_integrity()?;
        Ok(data)
    }

    /// Take the game out, reattaching catalog data.
    #[must_use]
    pub fn into_game(self, catalog: Arc<CardCatalog>) -> Game {
        self.game_state.rehydrate(catalog)
    }
}

fn malformed(err: &impl std::fmt::Display) -> IntegrityError {
    IntegrityError::Malformed(err.to_string())
}

fn checksum_of(state: &Value) -> Result<String, PersistenceError> {
    let canonical = serde_json::to_string(state)?;
    let digest = Sha256::digest(canonical.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(hex)
}

fn decode_v2(raw: Value) -> Result<SaveData, GameError> {
    let envelope: Envelope = serde_json::from_value(raw).map_err(|e| malformed(&e))?;
    let expected = envelope
        .checksum
        .ok_or_else(|| IntegrityError::Malformed("missing checksum".into()))?;
    let found = checksum_of(&envelope.game_state)?;
    if expected != found {
        return Err(IntegrityError::ChecksumMismatch { expected, found }.into());
    }
    let game_state: Game =
        serde_json::from_value(envelope.game_state).map_err(|e| malformed(&e))?;
    Ok(SaveData {
        version: SAVE_VERSION,
        game_state,
        metadata: envelope.metadata,
        checksum: found,
    })
}

/// Version 1 game state.
#[derive(Debug, Deserialize)]
struct LegacyGameStateV1 {
    id: GameId,
    status: GameStatus,
    #[serde(default)]
    phase: Phase,
    stage: Stage,
    turn: u32,
    health: i32,
    max_health: i32,
    #[serde(default)]
    insurance_cards: Vec<Card>,
    challenge_deck: ChallengeDeck,
    #[serde(default)]
    current_challenge: Option<Card>,
    #[serde(default)]
    config: Option<GameConfig>,
    #[serde(default)]
    seed: u64,
    #[serde(default)]
    stats: GameStats,
}

impl LegacyGameStateV1 {
    fn upgrade(self) -> Result<Game, IntegrityError> {
        let vitality = Vitality::new(self.health, self.max_health).map_err(|e| malformed(&e))?;
        let config = self.config.unwrap_or_else(|| GameConfig {
            starting_vitality: self.max_health,
            ..GameConfig::default()
        });
        let mut game = Game {
            id: self.id,
            status: self.status,
            phase: self.phase,
            stage: self.stage,
            turn: self.turn,
            vitality,
            insurances: self.insurance_cards,
            challenge_deck: self.challenge_deck,
            life_deck: LifeDeck::default(),
            offered: Vec::new(),
            current_challenge: self.current_challenge,
            score: 0,
            config,
            seed: self.seed,
            stats: self.stats,
            catalog: Arc::default(),
        };
        // v1 saved mid-offer without the offer itself; restart the draw.
        if game.phase == Phase::Challenge {
            game.phase = Phase::Draw;
        }
        game.refresh_score();
        Ok(game)
    }
}

fn decode_v1(raw: Value) -> Result<SaveData, GameError> {
    let envelope: Envelope = serde_json::from_value(raw).map_err(|e| malformed(&e))?;
    let legacy: LegacyGameStateV1 =
        serde_json::from_value(envelope.game_state).map_err(|e| malformed(&e))?;
    let game_state = legacy.upgrade()?;
    let checksum = checksum_of(&serde_json::to_value(&game_state)?)?;
    log::info!("upgraded version {LEGACY_SAVE_VERSION} save of game {}", game_state.id());
    Ok(SaveData {
        version: SAVE_VERSION,
        game_state,
        metadata: envelope.metadata,
        checksum,
    })
}

/// Lifetime play statistics stored next to the save slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub total_games: u32,
    pub completed_games: u32,
    pub victories: u32,
    pub best_score: i32,
}

impl PlayerRecord {
    /// Count a newly created game.
    pub fn record_started(&mut self) {
        self.total_games = self.total_games.saturating_add(1);
    }

    /// Count a game that reached a terminal status.
    pub fn record_finished(&mut self, game: &Game) {
        if !game.is_finished() {
            return;
        }
        self.completed_games = self.completed_games.saturating_add(1);
        self.total_games = self.total_games.max(self.completed_games);
        if game.is_victory() {
            self.victories = self.victories.saturating_add(1);
        }
        self.best_score = self.best_score.max(game.score());
    }

    /// # Errors
    ///
    /// Returns `IntegrityError` if the counters contradict each other.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        if self.total_games < self.completed_games {
            return Err(IntegrityError::RecordCounts {
                total: self.total_games,
                completed: self.completed_games,
            });
        }
        if self.victories > self.completed_games {
            return Err(IntegrityError::Invariant(format!(
                "{} victories exceed {} completed games",
                self.victories, self.completed_games
            )));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `IntegrityError` for malformed JSON or inconsistent counters.
    pub fn from_json(json: &str) -> Result<Self, IntegrityError> {
        let record: Self = serde_json::from_str(json).map_err(|e| malformed(&e))?;
        record.validate()?;
        Ok(record)
    }
}
