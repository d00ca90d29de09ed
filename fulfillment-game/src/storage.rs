//! Storage backends for encoded snapshots.
//!
//! Backends move opaque JSON strings; encoding and validation live in
//! [`crate::save`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::PersistenceError;

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store an encoded snapshot under `save_name`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    fn save_game(&self, save_name: &str, payload: &str) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read. A missing slot is `Ok(None)`.
    fn load_game(&self, save_name: &str) -> Result<Option<String>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted. Deleting a missing slot succeeds.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// In-process storage; clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    saves: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.saves.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.saves.borrow().is_empty()
    }
}

impl GameStorage for MemoryStorage {
    type Error = Infallible;

    fn save_game(&self, save_name: &str, payload: &str) -> Result<(), Self::Error> {
        self.saves
            .borrow_mut()
            .insert(save_name.to_string(), payload.to_string());
        Ok(())
    }

    fn load_game(&self, save_name: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.saves.borrow().get(save_name).cloned())
    }

    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
        self.saves.borrow_mut().remove(save_name);
        Ok(())
    }
}

/// One `<slot>.json` file per save under a root directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Slot names are flattened to a safe file name.
    #[must_use]
    pub fn path_for(&self, save_name: &str) -> PathBuf {
        let file: String = save_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{file}.json"))
    }
}

impl GameStorage for FileStorage {
    type Error = io::Error;

    fn save_game(&self, save_name: &str, payload: &str) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(save_name);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &path)
    }

    fn load_game(&self, save_name: &str) -> Result<Option<String>, Self::Error> {
        match fs::read_to_string(self.path_for(save_name)) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
        match fs::remove_file(self.path_for(save_name)) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

/// Writes go to `primary`, falling back to `fallback` when it fails.
///
/// A slot only lives in `fallback` while its newest copy is there: a
/// successful primary write clears the fallback copy, and a fallback write
/// tries to drop the now-stale primary copy. Reads therefore consult
/// `fallback` first and fall through to `primary` on a miss or error.
#[derive(Debug, Clone)]
pub struct FallbackStorage<P, F> {
    primary: P,
    fallback: F,
}

impl<P: GameStorage, F: GameStorage> FallbackStorage<P, F> {
    pub const fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }

    pub const fn primary(&self) -> &P {
        &self.primary
    }

    pub const fn fallback(&self) -> &F {
        &self.fallback
    }
}

impl<P: GameStorage, F: GameStorage> GameStorage for FallbackStorage<P, F> {
    type Error = PersistenceError;

    fn save_game(&self, save_name: &str, payload: &str) -> Result<(), Self::Error> {
        let Err(primary) = self.primary.save_game(save_name, payload) else {
            return self.fallback.delete_save(save_name).map_err(|err| {
                PersistenceError::StaleFallback {
                    save_name: save_name.to_string(),
                    reason: err.to_string(),
                }
            });
        };
        log::warn!("primary storage failed to save {save_name}: {primary}; using fallback");
        self.fallback
            .save_game(save_name, payload)
            .map_err(|fallback| PersistenceError::AllBackendsFailed {
                primary: primary.to_string(),
                fallback: fallback.to_string(),
            })?;
        if let Err(err) = self.primary.delete_save(save_name) {
            log::debug!("could not drop stale primary copy of {save_name}: {err}");
        }
        Ok(())
    }

    fn load_game(&self, save_name: &str) -> Result<Option<String>, Self::Error> {
        let fallback = match self.fallback.load_game(save_name) {
            Ok(Some(payload)) => return Ok(Some(payload)),
            Ok(None) => None,
            Err(err) => {
                log::warn!("fallback storage failed to load {save_name}: {err}; using primary");
                Some(err.to_string())
            }
        };
        self.primary.load_game(save_name).map_err(|primary| match fallback {
            Some(fallback) => PersistenceError::AllBackendsFailed {
                primary: primary.to_string(),
                fallback,
            },
            None => PersistenceError::backend(primary),
        })
    }

    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
        let primary = self.primary.delete_save(save_name);
        let fallback = self.fallback.delete_save(save_name);
        match (primary, fallback) {
            (Err(primary), Err(fallback)) => Err(PersistenceError::AllBackendsFailed {
                primary: primary.to_string(),
                fallback: fallback.to_string(),
            }),
            (Err(err), Ok(())) => {
                log::warn!("primary storage failed to delete {save_name}: {err}");
                Ok(())
            }
            (Ok(()), Err(err)) => {
                log::warn!("fallback storage failed to delete {save_name}: {err}");
                Ok(())
            }
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}
