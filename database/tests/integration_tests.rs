//! Integration tests for the SQLite score store, run against a migrated
//! in-memory database.

use database::{DatabaseConfig, DatabaseError, ErrorKind, NewSession, ScoreStore, SqliteStore};
use types::{
    Direction, FinalSummary, GameConfig, GameType, LifecycleEvent, Outcome, Placement, PlayerId,
    PlayerSummary, RoundEntry, RoundRecord, SessionId, SessionState,
};

async fn setup_store() -> SqliteStore {
    SqliteStore::connect(&DatabaseConfig::default())
        .await
        .expect("Failed to create test database")
}

async fn players(store: &SqliteStore, names: &[&str]) -> Vec<PlayerId> {
    let mut ids = Vec::new();
    for name in names {
        ids.push(store.upsert_player(name).await.expect("upsert").id);
    }
    ids
}

async fn open_session(store: &SqliteStore, game_type: GameType, seats: &[PlayerId]) -> SessionId {
    store
        .create_session(&NewSession {
            config: GameConfig::default_for(game_type, seats.len()),
            players: seats.to_vec(),
            round_origin: 1,
            dealer_id: None,
        })
        .await
        .expect("create session")
        .id
}

fn summary(
    session_id: SessionId,
    game_type: GameType,
    results: &[(PlayerId, Placement, i64)],
) -> FinalSummary {
    FinalSummary {
        session_id,
        game_type,
        direction: Direction::LowerIsBetter,
        end_direction: Direction::LowerIsBetter,
        rounds_played: 1,
        players: results
            .iter()
            .map(|&(player_id, placement, score)| PlayerSummary {
                player_id,
                placement,
                rounds_played: 1,
                best_round: Some(score),
                worst_round: Some(score),
                round_total: score,
                end_score: score,
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_delete_player_cascades() {
    let store = setup_store().await;
    let ids = players(&store, &["Anna", "Ben"]).await;
    let session = open_session(&store, GameType::Skyjo, &ids).await;

    let solo = store
        .create_preset(GameType::Skyjo, "Solo", &[ids[0]])
        .await
        .unwrap();
    let duo = store
        .create_preset(GameType::Skyjo, "Duo", &ids)
        .await
        .unwrap();
    store
        .finalize(&summary(
            session,
            GameType::Skyjo,
            &[(ids[0], Placement::Winner, 10)],
        ))
        .await
        .unwrap();

    store.delete_player(ids[0]).await.unwrap();

    let presets = store.list_presets(GameType::Skyjo).await.unwrap();
    assert_eq!(presets.len(), 1);
    assert_eq!(presets[0].id, duo.id);
    assert_eq!(presets[0].players, vec![ids[1]]);
    assert!(presets.iter().all(|p| p.id != solo.id));

    let seats: Vec<_> = store
        .list_participants(session)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.player_id)
        .collect();
    assert_eq!(seats, vec![ids[1]]);
    assert!(store
        .get_player_statistics(ids[0], GameType::Skyjo)
        .await
        .unwrap()
        .is_none());

    let err = store.get_player(ids[0]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_reset_touches_one_game_type() {
    let store = setup_store().await;
    let ids = players(&store, &["Anna", "Ben"]).await;
    let skyjo = open_session(&store, GameType::Skyjo, &ids).await;
    let wizard = open_session(&store, GameType::Wizard, &ids).await;

    store
        .finalize(&summary(
            skyjo,
            GameType::Skyjo,
            &[(ids[0], Placement::Winner, 40), (ids[1], Placement::Loser, 101)],
        ))
        .await
        .unwrap();
    store
        .finalize(&summary(
            wizard,
            GameType::Wizard,
            &[(ids[0], Placement::Loser, 20), (ids[1], Placement::Winner, 90)],
        ))
        .await
        .unwrap();

    assert_eq!(store.reset_all_stats(GameType::Skyjo).await.unwrap(), 2);

    for row in store.get_statistics(GameType::Skyjo).await.unwrap() {
        assert_eq!(row.stats.games_played, 0);
        assert_eq!(row.stats.best_end, None);
    }
    let wizard_stats = store.get_statistics(GameType::Wizard).await.unwrap();
    assert_eq!(wizard_stats.len(), 2);
    assert_eq!(wizard_stats[0].player_name, "Ben");
    assert_eq!(wizard_stats[0].stats.games_won, 1);

    // The finalization guard outlives a reset.
    let again = store
        .finalize(&summary(skyjo, GameType::Skyjo, &[(ids[0], Placement::Winner, 40)]))
        .await
        .unwrap_err();
    assert_eq!(again.kind(), ErrorKind::DuplicateFinalization);
}

#[tokio::test]
async fn test_remove_last_round_restores_ledger() {
    let store = setup_store().await;
    let ids = players(&store, &["Anna", "Ben"]).await;
    let session = open_session(&store, GameType::Skyjo, &ids).await;

    let first = RoundRecord::new(1, [(ids[0], RoundEntry::skyjo(4)), (ids[1], RoundEntry::skyjo(9))]);
    store.append_round(session, &first).await.unwrap();
    let before = store.get_rounds(session).await.unwrap();

    let second = RoundRecord::new(2, [(ids[0], RoundEntry::skyjo(-2)), (ids[1], RoundEntry::skyjo(0))])
        .with_dealer(Some(ids[1]));
    store.append_round(session, &second).await.unwrap();
    assert_eq!(store.get_rounds(session).await.unwrap()[1].dealer, Some(ids[1]));

    assert_eq!(store.remove_last_round(session).await.unwrap(), Some(2));
    assert_eq!(store.get_rounds(session).await.unwrap(), before);
    assert_eq!(store.remove_last_round(session).await.unwrap(), Some(1));
    assert_eq!(store.remove_last_round(session).await.unwrap(), None);
}

#[tokio::test]
async fn test_delete_all_rounds_restarts_at_origin() {
    let store = setup_store().await;
    let ids = players(&store, &["Anna"]).await;
    let session = open_session(&store, GameType::Skyjo, &ids).await;
    for n in 1..=2 {
        store
            .append_round(session, &RoundRecord::new(n, [(ids[0], RoundEntry::skyjo(3))]))
            .await
            .unwrap();
    }

    assert_eq!(store.delete_all_rounds(session).await.unwrap(), 2);
    assert!(store.get_rounds(session).await.unwrap().is_empty());

    let err = store
        .append_round(session, &RoundRecord::new(3, [(ids[0], RoundEntry::skyjo(3))]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfOrder);
    store
        .append_round(session, &RoundRecord::new(1, [(ids[0], RoundEntry::skyjo(3))]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_finished_session_lifecycle() {
    let store = setup_store().await;
    let ids = players(&store, &["Anna", "Ben", "Cleo"]).await;
    let session = open_session(&store, GameType::Skyjo, &ids).await;
    store
        .append_round(
            session,
            &RoundRecord::new(1, ids.iter().map(|&p| (p, RoundEntry::skyjo(10)))),
        )
        .await
        .unwrap();

    let outcome = Outcome::new(vec![ids[1], ids[2]], vec![ids[0]]);
    let finished = store.finish_session(session, &outcome).await.unwrap();
    assert_eq!(finished.state, SessionState::Finished);
    assert!(finished.ended_at.is_some());

    let flags: Vec<_> = store
        .list_participants(session)
        .await
        .unwrap()
        .into_iter()
        .map(|p| (p.is_winner, p.is_loser))
        .collect();
    assert_eq!(flags, vec![(false, true), (true, false), (true, false)]);

    let err = store
        .append_round(session, &RoundRecord::new(2, [(ids[0], RoundEntry::skyjo(1))]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(store
        .transition(session, LifecycleEvent::Resume)
        .await
        .is_err());

    assert_eq!(
        store
            .transition(session, LifecycleEvent::Archive)
            .await
            .unwrap(),
        SessionState::Deleted
    );
    assert!(matches!(
        store.get_session(session).await,
        Err(DatabaseError::SessionNotFound(_))
    ));
    assert!(store.get_rounds(session).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_sessions_filters_by_state() {
    let store = setup_store().await;
    let ids = players(&store, &["Anna"]).await;
    let paused = open_session(&store, GameType::Flip7, &ids).await;
    let running = open_session(&store, GameType::Flip7, &ids).await;
    open_session(&store, GameType::Dart, &ids).await;

    store.transition(paused, LifecycleEvent::Start).await.unwrap();
    store.transition(paused, LifecycleEvent::Pause).await.unwrap();
    store.transition(running, LifecycleEvent::Start).await.unwrap();

    let listed = store
        .list_sessions(GameType::Flip7, Some(SessionState::Paused))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, paused);
    assert_eq!(listed[0].config, GameConfig::default_for(GameType::Flip7, 1));

    let all = store.list_sessions(GameType::Flip7, None).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_concurrent_finalizations_do_not_lose_updates() {
    let store = std::sync::Arc::new(setup_store().await);
    let ids = players(&store, &["Anna", "Ben"]).await;
    let mut sessions = Vec::new();
    for _ in 0..8 {
        sessions.push(open_session(&store, GameType::Romme, &ids).await);
    }

    let mut handles = Vec::new();
    for session in sessions {
        let store = store.clone();
        let ids = ids.clone();
        handles.push(tokio::spawn(async move {
            store
                .finalize(&summary(
                    session,
                    GameType::Romme,
                    &[(ids[0], Placement::Winner, 5), (ids[1], Placement::Loser, 50)],
                ))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let anna = store
        .get_player_statistics(ids[0], GameType::Romme)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(anna.games_played, 8);
    assert_eq!(anna.games_won, 8);
    assert_eq!(anna.total_end, 40);
}

#[tokio::test]
async fn test_rename_to_taken_name_is_rejected() {
    let store = setup_store().await;
    let ids = players(&store, &["Anna", "Ben"]).await;

    let err = store.rename_player(ids[0], "Ben").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(!err.is_transient());
    assert_eq!(store.get_player(ids[0]).await.unwrap().name, "Anna");

    store.rename_player(ids[0], "Anna").await.unwrap();
    let err = store
        .rename_player(uuid::Uuid::new_v4(), "Cleo")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_preset_constraints_are_not_storage_failures() {
    let store = setup_store().await;
    let ids = players(&store, &["Anna"]).await;

    let err = store
        .create_preset(GameType::Skyjo, "Ghosts", &[ids[0], uuid::Uuid::new_v4()])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!err.is_transient());
    assert!(store.list_presets(GameType::Skyjo).await.unwrap().is_empty());

    store
        .create_preset(GameType::Skyjo, "Solo", &ids)
        .await
        .unwrap();
    let err = store
        .create_preset(GameType::Skyjo, "Solo", &ids)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(!err.is_transient());
}
