use fulfillment_game::{
    Card, CardCatalog, Difficulty, DrawOutcome, EmbeddedCatalog, Game, GameConfig, GameEngine,
    GameStatus, GameSession, MemoryStorage, Phase, RngBundle, Stage, StrategyId, TurnLog,
    TurnOutcome,
};
use std::collections::HashSet;
use std::sync::Arc;

fn new_game(difficulty: Difficulty, seed: u64) -> Game {
    Game::new(
        GameConfig::for_difficulty(difficulty),
        Arc::new(CardCatalog::default_catalog()),
        seed,
    )
    .unwrap()
}

#[test]
fn every_strategy_finishes_on_every_difficulty() {
    for difficulty in Difficulty::ALL {
        for strategy in StrategyId::ALL {
            let log = TurnLog::new();
            let mut session = GameSession::new(new_game(difficulty, 0xFEED));
            session.add_observer(log.clone());
            let mut picker = strategy;
            let status = session.play_to_end(&mut picker).unwrap();
            assert!(status.is_terminal(), "{difficulty}/{strategy} did not finish");

            let game = session.game();
            let stats = game.stats();
            assert_eq!(
                stats.challenges_attempted,
                stats.challenges_cleared + stats.challenges_failed
            );
            assert_eq!(log.entries().len() as u32, stats.challenges_attempted);
            match status {
                GameStatus::GameOver => assert!(game.vitality().is_depleted()),
                GameStatus::Victory => {
                    assert_eq!(game.stage(), Stage::Fulfillment);
                    assert!(game.challenge_deck().is_exhausted());
                }
                other => panic!("unexpected terminal status {other}"),
            }
        }
    }
}

#[test]
fn stages_progress_in_order_without_skipping() {
    let log = TurnLog::new();
    let mut session = GameSession::new(new_game(Difficulty::Easy, 8));
    session.add_observer(log.clone());
    session.play_to_end(&mut StrategyId::Weakest).unwrap();

    let changes = log.stage_changes();
    let expected = [Stage::MiddleAge, Stage::Fulfillment];
    assert_eq!(changes.as_slice(), &expected[..changes.len()]);

    let stages: Vec<Stage> = log.entries().iter().map(|e| e.stage).collect();
    assert_eq!(stages.first(), Some(&Stage::Youth));
    assert!(stages.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn manual_turn_follows_phase_cycle() {
    let mut game = new_game(Difficulty::Normal, 3);
    let mut rng = RngBundle::from_user_seed(3);
    assert_eq!(game.phase(), Phase::Setup);
    game.start().unwrap();
    assert_eq!(game.phase(), Phase::Draw);

    let DrawOutcome::Offered(offer) = game.draw_challenges(rng.challenge()).unwrap() else {
        panic!("fresh game has challenges");
    };
    assert_eq!(game.phase(), Phase::Challenge);
    let ids: HashSet<_> = offer.iter().map(|c| c.id).collect();
    assert_eq!(ids.len(), offer.len());

    let challenge = game.select_challenge(offer[0].id).unwrap();
    assert!(challenge.is_used);
    assert_eq!(game.phase(), Phase::CardSelection);

    let hand = game.draw_hand(rng.life()).unwrap();
    assert_eq!(hand.len(), game.hand_size());
    let result = game.resolve_challenge(&hand).unwrap();
    assert_eq!(game.phase(), Phase::Resolution);
    assert_eq!(result.required_power, challenge.power);
    assert_eq!(
        result.total_power,
        hand.iter().map(|c: &Card| c.power).sum::<i32>()
    );

    game.next_turn().unwrap();
    assert_eq!(game.turn(), 2);
    assert_eq!(game.phase(), Phase::Draw);
    assert!(game.current_challenge().is_none());
}

#[test]
fn game_over_stops_every_further_turn() {
    let config = GameConfig {
        starting_vitality: 1,
        ..GameConfig::default()
    };
    let game = Game::new(config, Arc::new(CardCatalog::default_catalog()), 12).unwrap();
    let mut session = GameSession::new(game);
    let status = session.play_to_end(&mut StrategyId::Strongest).unwrap();
    let snapshot = session.game().clone();

    for _ in 0..3 {
        let outcome = session.play_turn(&mut StrategyId::First).unwrap();
        assert_eq!(outcome, TurnOutcome::Finished { status });
    }
    assert_eq!(session.game().vitality(), snapshot.vitality());
    assert_eq!(session.game().turn(), snapshot.turn());
    assert_eq!(session.game().insurances(), snapshot.insurances());
    assert_eq!(session.game().is_game_over(), session.game().is_game_over());
}

#[test]
fn engine_round_trip_preserves_finished_game() {
    let engine = GameEngine::new(EmbeddedCatalog, MemoryStorage::default());
    let mut session = engine
        .create_session(GameConfig::for_difficulty(Difficulty::Hard), 404)
        .unwrap();
    session.play_to_end(&mut StrategyId::Random).unwrap();
    engine.save_game("final", &session).unwrap();

    let loaded = engine.load_game("final").unwrap().unwrap();
    assert_eq!(&loaded.game_state, session.game());
    assert_eq!(loaded.game_state.score(), session.game().score());
}
