//! Fulfillment Game Engine
//!
//! Platform-agnostic core logic for Fulfillment, a single-player deck game
//! about getting through life's challenges with the help of insurance.
//! This crate provides all game mechanics without UI or platform-specific dependencies.

pub mod card;
pub mod config;
pub mod data;
pub mod deck;
pub mod error;
pub mod game;
pub mod numbers;
pub mod observer;
pub mod rng;
pub mod save;
pub mod session;
pub mod shared;
pub mod stage;
pub mod storage;
pub mod strategy;
pub mod values;

use std::sync::Arc;

// Re-export commonly used types
pub use card::{Card, CardEffect, CardId, CardType, Effects, InsuranceTerm};
pub use config::{ConfigHandle, Difficulty, GameConfig};
pub use data::{
    CardCatalog, ChallengeTemplate, DreamTemplate, InsuranceTemplate, LifeTemplate,
    StageChallenges,
};
pub use deck::{ChallengeDeck, Deck, LifeDeck};
pub use error::{
    ConfigViolation, DomainError, GameError, IntegrityError, InvalidOperationError,
    PersistenceError, ValidationError,
};
pub use game::{ChallengeResult, DrawOutcome, Game, GameId, GameStats, TurnAdvance};
pub use observer::{GameObserver, TurnLog, TurnLogEntry};
pub use rng::{CountingRng, RngBundle};
pub use save::{PlayerRecord, SAVE_VERSION, SaveData, SaveMetadata};
pub use session::{GameSession, TurnOutcome, TurnReport};
pub use shared::SharedSession;
pub use stage::{GameStatus, Phase, Stage};
pub use storage::{FallbackStorage, FileStorage, GameStorage, MemoryStorage};
pub use strategy::{StrategyId, TurnStrategy};
pub use values::{CardPower, InsurancePremium, Vitality};

const SAVE_KEY_PREFIX: &str = "fulfillment.save.";
const RECORD_KEY: &str = "fulfillment.record";

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the card catalog from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_catalog(&self) -> Result<CardCatalog, Self::Error>;
}

/// Loader for the catalog bundled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedCatalog;

impl DataLoader for EmbeddedCatalog {
    type Error = serde_json::Error;

    fn load_catalog(&self) -> Result<CardCatalog, Self::Error> {
        CardCatalog::embedded()
    }
}

/// Main game engine for managing game instances
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    /// Create a new game engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    fn catalog(&self) -> Result<Arc<CardCatalog>, GameError> {
        self.data_loader
            .load_catalog()
            .map(Arc::new)
            .map_err(|err| GameError::Data(Box::new(err)))
    }

    /// Create a new game and count it in the player record.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, the catalog cannot be
    /// loaded, or the record cannot be updated.
    pub fn create_game(&self, config: GameConfig, seed: u64) -> Result<Game, GameError> {
        let game = Game::new(config, self.catalog()?, seed)?;
        let mut record = self.load_record()?;
        record.record_started();
        self.store_record(&record)?;
        Ok(game)
    }

    /// Construct a new session around a freshly created game.
    ///
    /// # Errors
    ///
    /// See [`Self::create_game`].
    pub fn create_session(&self, config: GameConfig, seed: u64) -> Result<GameSession, GameError> {
        self.create_game(config, seed).map(GameSession::new)
    }

    /// Save a session's game under `slot`. The live game is never modified.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if encoding or the storage write fails.
    pub fn save_game(&self, slot: &str, session: &GameSession) -> Result<SaveData, GameError> {
        let data = SaveData::capture(session.game(), session.playtime_secs())?;
        let payload = data.to_json()?;
        self.storage
            .save_game(&slot_key(slot), &payload)
            .map_err(PersistenceError::backend)?;
        log::debug!("saved game {} to slot {slot}", session.game().id());
        Ok(data)
    }

    /// Load and validate the snapshot in `slot`; `None` when the slot is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails, the version is unsupported, or the
    /// snapshot fails integrity checks.
    pub fn load_game(&self, slot: &str) -> Result<Option<SaveData>, GameError> {
        let Some(payload) = self
            .storage
            .load_game(&slot_key(slot))
            .map_err(PersistenceError::backend)?
        else {
            return Ok(None);
        };
        let mut data = SaveData::from_json(&payload)?;
        // Rehydrate with fresh data
        data.game_state = data.game_state.rehydrate(self.catalog()?);
        Ok(Some(data))
    }

    /// Load `slot` and wrap it in a session that keeps counting playtime.
    ///
    /// # Errors
    ///
    /// See [`Self::load_game`].
    pub fn resume_session(&self, slot: &str) -> Result<Option<GameSession>, GameError> {
        Ok(self
            .load_game(slot)?
            .map(|data| GameSession::resume(data.game_state, data.metadata.playtime)))
    }

    /// # Errors
    ///
    /// Returns `PersistenceError` if the storage backend fails.
    pub fn delete_save(&self, slot: &str) -> Result<(), GameError> {
        self.storage
            .delete_save(&slot_key(slot))
            .map_err(PersistenceError::backend)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if storage fails or the stored record is inconsistent.
    pub fn load_record(&self) -> Result<PlayerRecord, GameError> {
        match self
            .storage
            .load_game(RECORD_KEY)
            .map_err(PersistenceError::backend)?
        {
            Some(payload) => Ok(PlayerRecord::from_json(&payload)?),
            None => Ok(PlayerRecord::default()),
        }
    }

    /// Fold a finished game into the player record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be loaded or stored.
    pub fn record_finished_game(&self, game: &Game) -> Result<PlayerRecord, GameError> {
        let mut record = self.load_record()?;
        record.record_finished(game);
        record.validate()?;
        self.store_record(&record)?;
        Ok(record)
    }

    fn store_record(&self, record: &PlayerRecord) -> Result<(), GameError> {
        let payload = serde_json::to_string(record)?;
        self.storage
            .save_game(RECORD_KEY, &payload)
            .map_err(PersistenceError::backend)?;
        Ok(())
    }
}

fn slot_key(slot: &str) -> String {
    format!("{SAVE_KEY_PREFIX}{slot}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::io;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl DataLoader for FixtureLoader {
        type Error = Infallible;

        fn load_catalog(&self) -> Result<CardCatalog, Self::Error> {
            let json = r#"{
                "challenges": {
                    "youth": [ { "name": "Exam", "power": 2 } ],
                    "middle_age": [ { "name": "Mortgage", "power": 3 } ],
                    "fulfillment": [ { "name": "Retirement", "power": 3 } ]
                },
                "life_cards": [ { "name": "Grit", "power": 2 } ]
            }"#;
            Ok(CardCatalog::from_json(json).unwrap())
        }
    }

    #[derive(Clone, Copy, Default)]
    struct ReadOnlyStorage;

    impl GameStorage for ReadOnlyStorage {
        type Error = io::Error;

        fn save_game(&self, _: &str, _: &str) -> Result<(), Self::Error> {
            Err(io::Error::other("read-only"))
        }

        fn load_game(&self, _: &str) -> Result<Option<String>, Self::Error> {
            Ok(None)
        }

        fn delete_save(&self, _: &str) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[derive(Clone, Copy, Default)]
    struct MalformedLoader;

    impl DataLoader for MalformedLoader {
        type Error = serde_json::Error;

        fn load_catalog(&self) -> Result<CardCatalog, Self::Error> {
            CardCatalog::from_json(r#"{"challenges": "#)
        }
    }

    #[test]
    fn malformed_catalog_fails_game_creation() {
        let engine = GameEngine::new(MalformedLoader, MemoryStorage::default());
        let err = engine.create_game(GameConfig::default(), 1).unwrap_err();
        assert!(matches!(err, GameError::Data(_)));
        assert!(EmbeddedCatalog.load_catalog().is_ok());
    }

    #[test]
    fn engine_creates_and_roundtrips_state() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::default());
        let mut session = engine
            .create_session(GameConfig::default(), 0xABCD)
            .unwrap();
        session.start().unwrap();
        session.play_turn(&mut StrategyId::First).unwrap();
        let saved = engine.save_game("slot-one", &session).unwrap();
        assert_eq!(saved.version, SAVE_VERSION);

        let loaded = engine.load_game("slot-one").unwrap().expect("save exists");
        assert_eq!(&loaded.game_state, session.game());
        assert!(engine.load_game("missing-slot").unwrap().is_none());

        engine.delete_save("slot-one").unwrap();
        assert!(engine.load_game("slot-one").unwrap().is_none());
    }

    #[test]
    fn resumed_session_continues_identically() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::default());
        let mut original = engine.create_session(GameConfig::default(), 17).unwrap();
        original.start().unwrap();
        original.play_turn(&mut StrategyId::First).unwrap();
        engine.save_game("mid", &original).unwrap();

        let mut resumed = engine.resume_session("mid").unwrap().unwrap();
        let a = original.play_turn(&mut StrategyId::First).unwrap();
        let b = resumed.play_turn(&mut StrategyId::First).unwrap();
        match (a, b) {
            (TurnOutcome::Resolved(a), TurnOutcome::Resolved(b)) => {
                assert_eq!(a.result.total_power, b.result.total_power);
                assert_eq!(a.result.challenge.name, b.result.challenge.name);
            }
            (a, b) => assert_eq!(a, b),
        }
    }

    #[test]
    fn record_tracks_created_and_finished_games() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::default());
        let mut session = engine.create_session(GameConfig::default(), 1).unwrap();
        engine.create_game(GameConfig::default(), 2).unwrap();
        let status = session.play_to_end(&mut StrategyId::Weakest).unwrap();

        let record = engine.record_finished_game(session.game()).unwrap();
        assert_eq!(record.total_games, 2);
        assert_eq!(record.completed_games, 1);
        assert_eq!(record.victories, u32::from(status == GameStatus::Victory));
        assert_eq!(engine.load_record().unwrap(), record);
    }

    #[test]
    fn failed_save_leaves_game_untouched() {
        let engine = GameEngine::new(EmbeddedCatalog, MemoryStorage::default());
        let mut session = engine.create_session(GameConfig::default(), 3).unwrap();
        session.start().unwrap();
        let before = session.game().clone();

        let readonly = GameEngine::new(EmbeddedCatalog, ReadOnlyStorage);
        let err = readonly.save_game("slot", &session).unwrap_err();
        assert!(matches!(err, GameError::Persistence(PersistenceError::Backend(_))));
        assert_eq!(session.game(), &before);
    }

    #[test]
    fn invalid_config_is_reported_before_touching_storage() {
        let storage = MemoryStorage::default();
        let engine = GameEngine::new(EmbeddedCatalog, storage.clone());
        let config = GameConfig {
            starting_hand_size: 0,
            ..GameConfig::default()
        };
        assert!(matches!(
            engine.create_game(config, 0),
            Err(GameError::Validation(_))
        ));
        assert!(storage.is_empty());
    }
}
