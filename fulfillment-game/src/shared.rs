use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{GameError, InvalidOperationError};
use crate::session::{GameSession, TurnOutcome};
use crate::strategy::TurnStrategy;

/// Single-flight handle for callers that share one session across threads.
/// Each call holds the lock for the whole operation, so turns never interleave.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<GameSession>>,
}

impl SharedSession {
    #[must_use]
    pub fn new(session: GameSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, GameSession>, InvalidOperationError> {
        self.inner
            .lock()
            .map_err(|_| InvalidOperationError::SessionPoisoned)
    }

    /// # Errors
    ///
    /// Returns `SessionPoisoned` if a previous holder panicked, otherwise
    /// whatever [`GameSession::play_turn`] returns.
    pub fn play_turn(&self, strategy: &mut dyn TurnStrategy) -> Result<TurnOutcome, GameError> {
        self.lock()?.play_turn(strategy)
    }

    /// Run `f` with exclusive access to the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionPoisoned` if a previous holder panicked.
    pub fn with_session<R>(
        &self,
        f: impl FnOnce(&mut GameSession) -> R,
    ) -> Result<R, InvalidOperationError> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::data::CardCatalog;
    use crate::game::Game;
    use crate::strategy::StrategyId;
    use std::thread;

    #[test]
    fn concurrent_callers_are_serialized() {
        let game = Game::new(
            GameConfig::default(),
            Arc::new(CardCatalog::default_catalog()),
            77,
        )
        .unwrap();
        let shared = SharedSession::new(GameSession::new(game));
        shared.with_session(|s| s.start()).unwrap().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..3 {
                        shared.play_turn(&mut StrategyId::Weakest).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let (turn, stats) = shared
            .with_session(|s| (s.game().turn(), *s.game().stats()))
            .unwrap();
        let finished = shared.with_session(|s| s.game().is_finished()).unwrap();
        if !finished {
            assert_eq!(turn, 13);
        }
        assert_eq!(
            stats.challenges_attempted,
            stats.challenges_cleared + stats.challenges_failed
        );
    }
}
