use fulfillment_game::{
    CardCatalog, EmbeddedCatalog, FallbackStorage, FileStorage, GameConfig, GameEngine, GameError,
    GameStorage, IntegrityError, MemoryStorage, PersistenceError, SAVE_VERSION, SaveData,
    StrategyId,
};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("fulfillment-it-{tag}-{nanos}"))
}

fn played_session(engine: &GameEngine<EmbeddedCatalog, MemoryStorage>) -> fulfillment_game::GameSession {
    let mut session = engine.create_session(GameConfig::default(), 2024).unwrap();
    session.start().unwrap();
    for _ in 0..4 {
        session.play_turn(&mut StrategyId::Weakest).unwrap();
    }
    session
}

#[test]
fn v2_snapshot_round_trips_through_files() {
    let root = temp_dir("v2");
    let files = FileStorage::new(&root);
    let engine = GameEngine::new(EmbeddedCatalog, MemoryStorage::default());
    let session = played_session(&engine);

    let data = SaveData::capture(session.game(), 90).unwrap();
    files.save_game("slot", &data.to_json().unwrap()).unwrap();
    let payload = files.load_game("slot").unwrap().unwrap();
    let raw: Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(raw["version"], json!(SAVE_VERSION));
    assert!(raw["metadata"]["savedAt"].is_string());
    assert_eq!(raw["metadata"]["playtime"], json!(90));

    let decoded = SaveData::from_json(&payload).unwrap();
    let game = decoded.into_game(Arc::new(CardCatalog::default_catalog()));
    assert_eq!(&game, session.game());
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn legacy_snapshot_is_upgraded() {
    let engine = GameEngine::new(EmbeddedCatalog, MemoryStorage::default());
    let session = played_session(&engine);
    let mut state = serde_json::to_value(session.game()).unwrap();
    let vitality = state["vitality"].clone();
    let insurances = state["insurances"].clone();
    let object = state.as_object_mut().unwrap();
    object.remove("vitality");
    object.remove("insurances");
    object.remove("life_deck");
    object.insert("health".into(), vitality["value"].clone());
    object.insert("max_health".into(), vitality["max"].clone());
    object.insert("insurance_cards".into(), insurances);

    let legacy = json!({
        "version": 1,
        "gameState": state,
        "metadata": { "savedAt": "2023-12-24T08:30:00Z", "playtime": 12 }
    });
    engine
        .storage()
        .save_game("fulfillment.save.old", &legacy.to_string())
        .unwrap();

    let loaded = engine.load_game("old").unwrap().unwrap();
    assert_eq!(loaded.version, SAVE_VERSION);
    let game = loaded.game_state;
    assert_eq!(game.vitality(), session.game().vitality());
    assert_eq!(game.insurances(), session.game().insurances());
    assert_eq!(game.turn(), session.game().turn());
    assert!(!game.life_deck().templates().is_empty());
}

#[test]
fn future_version_fails_explicitly() {
    let payload = json!({
        "version": 7,
        "gameState": { "vitality": { "value": 1, "max": 1 } },
        "metadata": { "savedAt": "2030-01-01T00:00:00Z", "playtime": 0 }
    });
    let err = SaveData::from_json(&payload.to_string()).unwrap_err();
    assert!(matches!(
        err,
        GameError::Persistence(PersistenceError::UnsupportedVersion { version: 7 })
    ));
}

#[test]
fn garbage_and_untagged_payloads_are_integrity_errors() {
    assert!(matches!(
        SaveData::from_json("not json"),
        Err(GameError::Integrity(IntegrityError::Malformed(_)))
    ));
    assert!(matches!(
        SaveData::from_json(r#"{"health": 10}"#),
        Err(GameError::Integrity(IntegrityError::MissingVersion))
    ));
}

#[test]
fn fallback_storage_serves_engine_when_primary_directory_is_unusable() {
    let blocker = temp_dir("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let storage = FallbackStorage::new(FileStorage::new(&blocker), MemoryStorage::default());
    let engine = GameEngine::new(EmbeddedCatalog, storage);

    let mut session = engine.create_session(GameConfig::default(), 5).unwrap();
    session.start().unwrap();
    session.play_turn(&mut StrategyId::First).unwrap();
    engine.save_game("slot", &session).unwrap();
    assert!(engine.storage().fallback().load_game("fulfillment.save.slot").unwrap().is_some());

    let loaded = engine.load_game("slot").unwrap().unwrap();
    assert_eq!(&loaded.game_state, session.game());
    let _ = std::fs::remove_file(blocker);
}
