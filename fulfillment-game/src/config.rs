use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigViolation, ValidationError};

pub const MAX_STARTING_VITALITY: i32 = 999;
pub const MAX_HAND_SIZE_LIMIT: usize = 20;
pub const MAX_DREAM_CARDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Self; 4] = [Self::Easy, Self::Normal, Self::Hard, Self::Expert];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
            Self::Expert => "expert",
        }
    }

    #[must_use]
    pub const fn starting_vitality(self) -> i32 {
        match self {
            Self::Easy => 120,
            Self::Normal => 100,
            Self::Hard => 80,
            Self::Expert => 60,
        }
    }

    /// Scale applied to market insurance premiums.
    #[must_use]
    pub const fn premium_multiplier(self) -> f64 {
        match self {
            Self::Easy => 0.5,
            Self::Normal => 1.0,
            Self::Hard => 1.5,
            Self::Expert => 2.0,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "normal" => Ok(Self::Normal),
            "hard" => Ok(Self::Hard),
            "expert" => Ok(Self::Expert),
            _ => Err(()),
        }
    }
}

/// Parameters fixed at game creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "GameConfig::default_starting_vitality")]
    pub starting_vitality: i32,
    #[serde(default = "GameConfig::default_starting_hand_size")]
    pub starting_hand_size: usize,
    #[serde(default = "GameConfig::default_max_hand_size")]
    pub max_hand_size: usize,
    #[serde(default = "GameConfig::default_dream_card_count")]
    pub dream_card_count: usize,
}

impl GameConfig {
    const fn default_starting_vitality() -> i32 {
        Difficulty::Normal.starting_vitality()
    }

    const fn default_starting_hand_size() -> usize {
        3
    }

    const fn default_max_hand_size() -> usize {
        10
    }

    const fn default_dream_card_count() -> usize {
        3
    }

    /// Preset for a difficulty level.
    #[must_use]
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            starting_vitality: difficulty.starting_vitality(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn premium_multiplier(&self) -> f64 {
        self.difficulty.premium_multiplier()
    }

    /// Validate every constraint, collecting all violations.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` listing each violated field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        if self.starting_vitality <= 0 {
            violations.push(ConfigViolation::new(
                "starting_vitality",
                format!("must be positive (got {})", self.starting_vitality),
            ));
        } else if self.starting_vitality > MAX_STARTING_VITALITY {
            violations.push(ConfigViolation::new(
                "starting_vitality",
                format!(
                    "must be at most {MAX_STARTING_VITALITY} (got {})",
                    self.starting_vitality
                ),
            ));
        }
        if self.starting_hand_size == 0 {
            violations.push(ConfigViolation::new(
                "starting_hand_size",
                "must be at least 1",
            ));
        }
        if self.max_hand_size < self.starting_hand_size {
            violations.push(ConfigViolation::new(
                "max_hand_size",
                format!(
                    "must be at least starting_hand_size {} (got {})",
                    self.starting_hand_size, self.max_hand_size
                ),
            ));
        }
        if self.max_hand_size > MAX_HAND_SIZE_LIMIT {
            violations.push(ConfigViolation::new(
                "max_hand_size",
                format!(
                    "must be at most {MAX_HAND_SIZE_LIMIT} (got {})",
                    self.max_hand_size
                ),
            ));
        }
        if self.dream_card_count > MAX_DREAM_CARDS {
            violations.push(ConfigViolation::new(
                "dream_card_count",
                format!(
                    "must be at most {MAX_DREAM_CARDS} (got {})",
                    self.dream_card_count
                ),
            ));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            starting_vitality: Self::default_starting_vitality(),
            starting_hand_size: Self::default_starting_hand_size(),
            max_hand_size: Self::default_max_hand_size(),
            dream_card_count: Self::default_dream_card_count(),
        }
    }
}

type ConfigWatcher = Box<dyn FnMut(&GameConfig) + Send>;

/// Owns a single configuration value and notifies watchers on change.
pub struct ConfigHandle {
    config: GameConfig,
    watchers: Vec<ConfigWatcher>,
}

impl fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("config", &self.config)
            .field("watchers", &self.watchers.len())
            .finish()
    }
}

impl ConfigHandle {
    /// # Errors
    ///
    /// Returns `ValidationError` if the initial configuration is invalid.
    pub fn new(config: GameConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            config,
            watchers: Vec::new(),
        })
    }

    #[must_use]
    pub const fn get(&self) -> &GameConfig {
        &self.config
    }

    pub fn watch(&mut self, watcher: impl FnMut(&GameConfig) + Send + 'static) {
        self.watchers.push(Box::new(watcher));
    }

    /// Apply `f` to a copy; commit and notify only if the result validates.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` and leaves the current config untouched.
    pub fn update(&mut self, f: impl FnOnce(&mut GameConfig)) -> Result<(), ValidationError> {
        let mut next = self.config.clone();
        f(&mut next);
        next.validate()?;
        self.config = next;
        for watcher in &mut self.watchers {
            watcher(&self.config);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn default_config_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
        for difficulty in Difficulty::ALL {
            assert!(GameConfig::for_difficulty(difficulty).validate().is_ok());
        }
    }

    #[test]
    fn validation_lists_all_violations() {
        let cfg = GameConfig {
            difficulty: Difficulty::Hard,
            starting_vitality: 0,
            starting_hand_size: 5,
            max_hand_size: 2,
            dream_card_count: 11,
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["starting_vitality", "max_hand_size", "dream_card_count"]
        );
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: GameConfig = serde_json::from_str(r#"{"difficulty":"expert"}"#).unwrap();
        assert_eq!(cfg.difficulty, Difficulty::Expert);
        assert_eq!(cfg.starting_hand_size, 3);
        assert_eq!("hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
    }

    #[test]
    fn handle_notifies_watchers_only_on_valid_update() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut handle = ConfigHandle::new(GameConfig::default()).unwrap();
        handle.watch(move |cfg| sink.lock().unwrap().push(cfg.starting_vitality));

        handle.update(|cfg| cfg.starting_vitality = 70).unwrap();
        assert!(handle.update(|cfg| cfg.starting_vitality = -5).is_err());
        assert_eq!(handle.get().starting_vitality, 70);
        assert_eq!(*seen.lock().unwrap(), vec![70]);
    }
}
