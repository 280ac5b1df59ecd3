use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use snapjudge::api;
use snapjudge::error::RoomError;
use snapjudge::judge::Judge;
use snapjudge::prompts::GAME_PROMPTS;
use snapjudge::sources::{Dice, ManualClock};
use snapjudge::state::AppState;
use snapjudge::store::{FileStore, MemoryStore, RoomStore};
use snapjudge::types::GameState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Judge with a fixed score per image
struct ScriptedJudge {
    scores: HashMap<String, f64>,
    calls: AtomicUsize,
}

impl ScriptedJudge {
    fn new(scores: &[(&str, f64)]) -> Self {
        Self {
            scores: scores
                .iter()
                .map(|(image, score)| (image.to_string(), *score))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    async fn score(&self, _prompt: &str, image_data: &str) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scores.get(image_data).copied().unwrap_or(1.0)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn build_state(store: Arc<dyn RoomStore>, judge: Arc<ScriptedJudge>) -> (Arc<AppState>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
    ));
    let state = AppState::new(store, judge, clock.clone(), Arc::new(Dice::seeded(7)));
    (Arc::new(state), clock)
}

/// End-to-end lobby and round flow against the engine
#[tokio::test]
async fn test_full_game_flow() {
    let judge = Arc::new(ScriptedJudge::new(&[("a", 7.0), ("b", 9.0), ("c", 9.0)]));
    let (state, clock) = build_state(Arc::new(MemoryStore::new()), judge.clone());

    // 1. Create room
    let room = state.create_room("Hana".to_string()).await;
    let host = room.host.clone();
    assert_eq!(room.game_state, GameState::Lobby);

    // 2. Host alone cannot start
    assert_eq!(
        state.start_game(&room.id, &host).await.unwrap_err(),
        RoomError::InsufficientPlayers {
            required: 2,
            current: 1
        }
    );

    // 3. Join, with case-insensitive duplicate names rejected
    let (_, alice) = state
        .join_room(&room.id.to_lowercase(), "Alice".to_string())
        .await
        .expect("Alice should join");
    assert_eq!(
        state
            .join_room(&room.id, "alice".to_string())
            .await
            .unwrap_err(),
        RoomError::NameTaken("alice".to_string())
    );
    let (_, bob) = state.join_room(&room.id, "Bob".to_string()).await.unwrap();

    // 4. Only the host starts
    assert_eq!(
        state.start_game(&room.id, &alice).await.unwrap_err(),
        RoomError::NotHost
    );
    let playing = state.start_game(&room.id, &host).await.unwrap();
    assert_eq!(playing.game_state, GameState::Playing);
    let prompt = playing.prompt.clone().unwrap();
    assert!(!prompt.is_empty());
    assert!(GAME_PROMPTS.contains(&prompt.as_str()));

    // 5. Late joiners are turned away
    assert_eq!(
        state
            .join_room(&room.id, "Dora".to_string())
            .await
            .unwrap_err(),
        RoomError::RoundInProgress
    );

    // 6. Submissions: Bob and Alice tie, Bob got there first
    state.submit_photo(&room.id, &host, "a".to_string()).await.unwrap();
    assert!(matches!(
        state.compute_results(&room.id).await,
        Err(RoomError::IncompleteSubmissions {
            submitted: 1,
            total: 3
        })
    ));
    clock.advance(chrono::Duration::seconds(2));
    state.submit_photo(&room.id, &bob, "c".to_string()).await.unwrap();
    clock.advance(chrono::Duration::seconds(2));
    state.submit_photo(&room.id, &alice, "b".to_string()).await.unwrap();

    // 7. Results freeze once
    let results = state.compute_results(&room.id).await.unwrap();
    assert_eq!(results.game_state, GameState::Results);
    let winner = results.winner.clone().unwrap();
    assert_eq!(winner.player_id, bob);
    assert_eq!(winner.score, 9.0);
    assert_eq!(judge.calls.load(Ordering::SeqCst), 3);

    let again = state.compute_results(&room.id).await.unwrap();
    assert_eq!(again.winner, results.winner);
    assert_eq!(judge.calls.load(Ordering::SeqCst), 3);

    // 8. Play again
    let next = state.start_game(&room.id, &host).await.unwrap();
    assert_eq!(next.game_state, GameState::Playing);
    assert!(next.submissions.is_empty());
    assert!(next.winner.is_none());
    assert_eq!(next.players.len(), 3);
}

#[tokio::test]
async fn test_rooms_survive_a_restart_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rooms.json");
    let judge = Arc::new(ScriptedJudge::new(&[]));

    let room_id = {
        let store = Arc::new(FileStore::open(&path).await);
        let (state, _) = build_state(store, judge.clone());
        let room = state.create_room("Hana".to_string()).await;
        state.join_room(&room.id, "Alice".to_string()).await.unwrap();
        room.id
    };

    let store = Arc::new(FileStore::open(&path).await);
    assert!(!store.is_in_memory());
    let (state, _) = build_state(store, judge);
    let room = state.get_room(&room_id).await.unwrap();
    assert_eq!(room.players.len(), 2);
    assert_eq!(room.players[1].name, "Alice");
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_http_round_trip() {
    let judge = Arc::new(ScriptedJudge::new(&[("data:image/png;base64,AAAA", 8.0)]));
    let (state, _) = build_state(Arc::new(MemoryStore::new()), judge);
    let app = api::router(state);

    let (status, body) = send(&app, post("/api/create-room", json!({ "name": "  Hana  " }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let room_id = body["room"]["id"].as_str().unwrap().to_string();
    let host = body["playerId"].as_str().unwrap().to_string();
    assert_eq!(body["room"]["host"], host.as_str());
    assert_eq!(body["room"]["players"][0]["name"], "Hana");
    assert_eq!(body["room"]["gameState"], "lobby");

    let (status, body) = send(
        &app,
        post(
            "/api/join-room",
            json!({ "roomId": room_id.to_lowercase(), "name": "Alice" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let alice = body["playerId"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        post("/api/start-game", json!({ "roomId": room_id, "playerId": alice })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NOT_HOST");

    let (status, body) = send(
        &app,
        post("/api/start-game", json!({ "roomId": room_id, "playerId": host })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room"]["gameState"], "playing");

    for player in [&host, &alice] {
        let image = if *player == host { "data:image/png;base64,AAAA" } else { "x" };
        let (status, _) = send(
            &app,
            post(
                "/api/submit-photo",
                json!({ "roomId": room_id, "playerId": player, "imageData": image }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, get(&format!("/api/get-results?roomId={}", room_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room"]["gameState"], "results");
    assert_eq!(body["room"]["winner"]["playerId"], host.as_str());
    assert_eq!(body["room"]["winner"]["score"], 8.0);

    let (status, body) = send(&app, get(&format!("/api/room/{}", room_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room"]["id"], room_id.as_str());

    let (status, body) = send(&app, get("/api/rooms")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rooms"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_http_errors() {
    let (state, _) = build_state(Arc::new(MemoryStore::new()), Arc::new(ScriptedJudge::new(&[])));
    let app = api::router(state);

    let (status, body) = send(&app, post("/api/create-room", json!({ "name": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Name is required");

    let (status, body) = send(
        &app,
        post("/api/join-room", json!({ "roomId": "NOPE00", "name": "Alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ROOM_NOT_FOUND");

    let (status, _) = send(&app, get("/api/get-results")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/room/NOPE00")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/create-room")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    // Incomplete round reports progress
    let (_, body) = send(&app, post("/api/create-room", json!({ "name": "Hana" }))).await;
    let room_id = body["room"]["id"].as_str().unwrap().to_string();
    let host = body["playerId"].as_str().unwrap().to_string();
    send(&app, post("/api/join-room", json!({ "roomId": room_id, "name": "Alice" }))).await;
    send(&app, post("/api/start-game", json!({ "roomId": room_id, "playerId": host }))).await;
    send(
        &app,
        post(
            "/api/submit-photo",
            json!({ "roomId": room_id, "playerId": host, "imageData": "x" }),
        ),
    )
    .await;

    let (status, body) = send(&app, get(&format!("/api/get-results?roomId={}", room_id))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["submitted"], 1);
    assert_eq!(body["total"], 2);

    let (status, body) = send(
        &app,
        post(
            "/api/submit-photo",
            json!({ "roomId": room_id, "playerId": "stranger", "imageData": "x" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PLAYER_NOT_IN_ROOM");

    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}
