// SPDX-License-Identifier: MIT OR Apache-2.0

use anyhow::Result;
use goroom_core::{Color, Stone};
use goroom_server::{
    JsonFileStore, MatchRegistry, Persistence, ServerConfig, ServerEvent, SessionType,
};
use std::sync::Arc;
use tempfile::tempdir;

mod common;
use common::{notice, registry, Client, ScriptedAi};

/// Hotseat match: B(2,2) W(6,6) then two passes
async fn finished_match(registry: &MatchRegistry, client: &mut Client) -> String {
    let id = registry
        .create_match(&client.id, SessionType::Hotseat, 9, Color::Black)
        .await
        .unwrap();
    registry.play_move(&client.id, 2, 2, false).await.unwrap();
    registry.play_move(&client.id, 6, 6, false).await.unwrap();
    registry.play_move(&client.id, 0, 0, true).await.unwrap();
    registry.play_move(&client.id, 0, 0, true).await.unwrap();
    client.drain();
    id
}

#[tokio::test]
async fn test_replay_clamps_and_scores_final_frame() {
    let (registry, _) = registry(ScriptedAi::new(vec![]));
    let mut alice = Client::connect(&registry, "alice", "Alice").await;
    let id = finished_match(&registry, &mut alice).await;

    // Stepping needs a requested replay first
    assert!(registry.replay_move("alice", 1).await.is_err());
    assert_eq!(alice.next().await, notice("No replay has been requested"));

    registry.request_replay("alice", &id[..8]).await.unwrap();
    match alice.next().await {
        ServerEvent::ReplayData { data } => {
            assert_eq!(data.id, id);
            assert_eq!(data.history.len(), 4);
        }
        other => panic!("expected replayData, got {other:?}"),
    }

    registry.replay_move("alice", 99).await.unwrap();
    match alice.next().await {
        ServerEvent::ReplayState {
            board,
            index,
            is_over,
            black_score,
            white_score,
        } => {
            assert_eq!(index, 2);
            assert!(is_over);
            assert_eq!(board[6][6], Stone::White);
            // One shared region touches both colors and counts for nobody
            assert_eq!(black_score, 1.0);
            assert_eq!(white_score, 6.5);
        }
        other => panic!("expected replayState, got {other:?}"),
    }

    registry.replay_move("alice", 1).await.unwrap();
    match alice.next().await {
        ServerEvent::ReplayState {
            board,
            index,
            is_over,
            black_score,
            white_score,
        } => {
            assert_eq!(index, 1);
            assert!(!is_over);
            assert_eq!(board[2][2], Stone::Black);
            assert_eq!(board[6][6], Stone::Empty);
            assert_eq!((black_score, white_score), (0.0, 0.0));
        }
        other => panic!("expected replayState, got {other:?}"),
    }

    registry.replay_move("alice", -4).await.unwrap();
    assert!(matches!(
        alice.next().await,
        ServerEvent::ReplayState { index: 0, .. }
    ));
}

#[tokio::test]
async fn test_replay_of_unknown_match_fails() {
    let (registry, _) = registry(ScriptedAi::new(vec![]));
    let mut bob = Client::connect(&registry, "bob", "Bob").await;

    assert!(registry.request_replay("bob", "ffffffff").await.is_err());
    assert_eq!(
        bob.next().await,
        ServerEvent::ReplayFailed {
            reason: "Unable to find a game with that ID".into()
        }
    );
}

#[tokio::test]
async fn test_unfinished_replay_uses_full_history() {
    let (registry, _) = registry(ScriptedAi::new(vec![]));
    let mut alice = Client::connect(&registry, "alice", "Alice").await;
    let id = registry
        .create_match("alice", SessionType::Hotseat, 9, Color::Black)
        .await
        .unwrap();
    registry.play_move("alice", 2, 2, false).await.unwrap();
    registry.play_move("alice", 0, 0, true).await.unwrap();
    alice.drain();

    registry.request_replay("alice", &id).await.unwrap();
    alice.drain();
    registry.replay_move("alice", 10).await.unwrap();
    assert!(matches!(
        alice.next().await,
        ServerEvent::ReplayState { index: 2, is_over: false, .. }
    ));
}

#[tokio::test]
async fn test_matches_survive_restart() -> Result<()> {
    common::init_logging();
    let dir = tempdir()?;

    let store = Arc::new(JsonFileStore::open(dir.path()).await?);
    let registry = MatchRegistry::new(
        ServerConfig::default(),
        ScriptedAi::new(vec![]),
        store.clone(),
    );
    let mut alice = Client::connect(&registry, "alice", "Alice").await;
    let finished = finished_match(&registry, &mut alice).await;

    // Stored as soon as it ended
    assert_eq!(store.load_all_matches().await?.len(), 1);

    let ongoing = registry
        .create_match("alice", SessionType::Hotseat, 13, Color::Black)
        .await
        .unwrap();
    registry.play_move("alice", 5, 5, false).await.unwrap();
    registry.shutdown().await?;

    let store = Arc::new(JsonFileStore::open(dir.path()).await?);
    let restored = MatchRegistry::new(
        ServerConfig::default(),
        ScriptedAi::new(vec![]),
        store.clone(),
    );
    assert_eq!(restored.restore(store.load_all_matches().await?).await, 2);

    let record = restored.find(&finished).await.unwrap();
    assert!(record.game_over);
    assert_eq!(record.history.len(), 4);

    // Reconnecting picks the unfinished match back up
    let mut alice = Client::connect(&restored, "alice", "Alice").await;
    match alice.next().await {
        ServerEvent::MatchJoined { data, .. } => {
            assert_eq!(data.id, ongoing);
            assert_eq!(data.board_size, 13);
        }
        other => panic!("expected matchJoined, got {other:?}"),
    }
    assert!(matches!(
        alice.next().await,
        ServerEvent::BoardUpdated { color: Color::Black, pass: false, .. }
    ));

    restored.play_move("alice", 6, 6, false).await?;
    assert_eq!(restored.find(&ongoing).await.unwrap().history.len(), 2);
    Ok(())
}
