//! Capture-path tests: derivations, defaults, and the not-found errors.

use boxcar_bot::snapshot;
use boxcar_bot::testing::fixtures;
use boxcar_common::{BotError, DroppedLoad, GamePhase, GameStatus, PlayerId, UserId};
use chrono::Utc;
use uuid::Uuid;

#[tokio::test]
async fn missing_game_is_a_typed_not_found() {
    let harness = fixtures::harness();
    let result = snapshot::capture(
        &harness.deps,
        fixtures::game_id(),
        fixtures::bot_player_id(),
        fixtures::bot_user_id(),
    )
    .await;
    assert!(matches!(result, Err(BotError::GameNotFound(_))));
}

#[tokio::test]
async fn missing_player_is_a_typed_not_found() {
    let harness = fixtures::harness();
    harness.store.set_game(fixtures::game_builder().build());
    let stranger = PlayerId(Uuid::from_u128(0xDEAD));
    let result = snapshot::capture(
        &harness.deps,
        fixtures::game_id(),
        stranger,
        UserId(Uuid::from_u128(0xBEEF)),
    )
    .await;
    assert!(matches!(result, Err(BotError::PlayerNotFound(_))));
}

#[tokio::test]
async fn off_board_train_defaults_movement_and_loads_to_zero() {
    let harness = fixtures::harness();
    // Player record claims movement and cargo, but the train is not placed.
    let mut game = fixtures::game_builder().build();
    game.players[0].movement_remaining = 9;
    game.players[0].loads = vec!["Coal".to_string()];
    game.players[0].position = None;
    harness.store.set_game(game);

    let snapshot = snapshot::capture(
        &harness.deps,
        fixtures::game_id(),
        fixtures::bot_player_id(),
        fixtures::bot_user_id(),
    )
    .await
    .unwrap();

    assert_eq!(snapshot.position, None);
    assert_eq!(snapshot.movement_remaining, 0);
    assert!(snapshot.loads.is_empty());
}

#[tokio::test]
async fn missing_track_record_defaults_to_empty_and_zero_spend() {
    let harness = fixtures::harness();
    harness.store.set_game(fixtures::game_builder().build());

    let snapshot = snapshot::capture(
        &harness.deps,
        fixtures::game_id(),
        fixtures::bot_player_id(),
        fixtures::bot_user_id(),
    )
    .await
    .unwrap();

    assert!(snapshot.own_segments.is_empty());
    assert_eq!(snapshot.turn_build_spend, 0);
    assert!(snapshot.connected_major_cities.is_empty());
}

#[tokio::test]
async fn phase_is_initial_build_only_when_the_status_says_so() {
    let harness = fixtures::harness();
    harness.store.set_game(
        fixtures::game_builder()
            .status(GameStatus::InitialBuild)
            .build(),
    );
    let snapshot = snapshot::capture(
        &harness.deps,
        fixtures::game_id(),
        fixtures::bot_player_id(),
        fixtures::bot_user_id(),
    )
    .await
    .unwrap();
    assert_eq!(snapshot.phase, GamePhase::InitialBuild);

    harness
        .store
        .set_game(fixtures::game_builder().status(GameStatus::Setup).build());
    let snapshot = snapshot::capture(
        &harness.deps,
        fixtures::game_id(),
        fixtures::bot_player_id(),
        fixtures::bot_user_id(),
    )
    .await
    .unwrap();
    assert_eq!(snapshot.phase, GamePhase::Active);
}

#[tokio::test]
async fn board_scan_omits_cities_with_no_stock_and_groups_drops() {
    let harness = fixtures::harness();
    harness.store.set_game(fixtures::game_builder().build());
    harness.loads.stock("Karst", &["Coal", "Steel"]);
    harness.loads.stock("Stonebridge", &[]);
    harness.loads.drop_load(DroppedLoad {
        city: "Lyle".to_string(),
        load: "Oats".to_string(),
        dropped_by: None,
        dropped_at: Utc::now(),
    });
    harness.loads.drop_load(DroppedLoad {
        city: "Lyle".to_string(),
        load: "Wine".to_string(),
        dropped_by: None,
        dropped_at: Utc::now(),
    });

    let snapshot = snapshot::capture(
        &harness.deps,
        fixtures::game_id(),
        fixtures::bot_player_id(),
        fixtures::bot_user_id(),
    )
    .await
    .unwrap();

    assert_eq!(
        snapshot.city_loads.get("Karst"),
        Some(&vec!["Coal".to_string(), "Steel".to_string()])
    );
    assert!(!snapshot.city_loads.contains_key("Stonebridge"));
    assert_eq!(snapshot.dropped_loads.get("Lyle").map(|d| d.len()), Some(2));
}

#[tokio::test]
async fn opponents_are_summarized_with_their_networks() {
    let harness = fixtures::harness();
    let game = fixtures::game_builder()
        .opponent("rival", 0x5000)
        .build();
    let rival_id = game.players[1].player_id;
    harness.store.set_game(game);
    harness.store.set_tracks(vec![
        fixtures::track_record(fixtures::bot_player_id(), &[(5, 9), (6, 9)]),
        fixtures::track_record(rival_id, &[(8, 6), (9, 6)]),
    ]);

    let snapshot = snapshot::capture(
        &harness.deps,
        fixtures::game_id(),
        fixtures::bot_player_id(),
        fixtures::bot_user_id(),
    )
    .await
    .unwrap();

    assert_eq!(snapshot.opponents.len(), 1);
    let rival = &snapshot.opponents[0];
    assert_eq!(rival.name, "rival");
    assert_eq!(rival.segment_count, 1);
    assert_eq!(rival.connected_major_cities, 1); // their line touches Karst
}

#[tokio::test]
async fn digest_is_stable_for_identical_state() {
    let harness = fixtures::harness();
    harness.store.set_game(fixtures::game_builder().build());

    let a = snapshot::capture(
        &harness.deps,
        fixtures::game_id(),
        fixtures::bot_player_id(),
        fixtures::bot_user_id(),
    )
    .await
    .unwrap();
    let b = snapshot::capture(
        &harness.deps,
        fixtures::game_id(),
        fixtures::bot_player_id(),
        fixtures::bot_user_id(),
    )
    .await
    .unwrap();

    assert_eq!(a.digest(), b.digest());
    assert_eq!(a.digest().len(), 12);
}
