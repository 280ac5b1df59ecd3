//! HTTP API.
//!
//! Thin JSON layer over [`AppState`]: validate the request shape, call the
//! engine, wrap the outcome in an [`ApiResponse`] envelope.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::RoomError;
use crate::protocol::*;
use crate::state::AppState;
use crate::types::normalize_room_id;

/// Photos arrive as base64 data URLs, so allow generous bodies
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Error leaving a handler
#[derive(Debug)]
pub enum ApiError {
    /// Request was missing a field or was not valid JSON
    BadRequest(String),
    Room(RoomError),
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        ApiError::Room(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// HTTP status for an engine error
pub fn status_for(err: &RoomError) -> StatusCode {
    match err {
        RoomError::RoomNotFound(_) | RoomError::PlayerNotInRoom => StatusCode::NOT_FOUND,
        RoomError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                tracing::debug!("Rejected request: {}", message);
                (StatusCode::BAD_REQUEST, Json(ApiResponse::invalid(message))).into_response()
            }
            ApiError::Room(err) => {
                tracing::debug!("Request failed: {}", err);
                (status_for(&err), Json(ApiResponse::from(&err))).into_response()
            }
        }
    }
}

type ApiResult = Result<Json<ApiResponse>, ApiError>;

/// Trimmed, non-empty value of a required string field
fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

/// POST /api/create-room
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body?;
    let name = required(req.name, "Name is required")?;

    let room = state.create_room(name).await;
    let host = room.host.clone();
    Ok(Json(ApiResponse::room_with_player(room, host)))
}

/// POST /api/join-room
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    body: Result<Json<JoinRoomRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body?;
    let message = "Room ID and name are required";
    let room_id = required(req.room_id, message)?;
    let name = required(req.name, message)?;

    let (room, player_id) = state.join_room(&room_id, name).await?;
    Ok(Json(ApiResponse::room_with_player(room, player_id)))
}

/// POST /api/start-game
pub async fn start_game(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StartGameRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body?;
    let message = "Room ID and player ID are required";
    let room_id = required(req.room_id, message)?;
    let player_id = required(req.player_id, message)?;

    let room = state.start_game(&room_id, &player_id).await?;
    Ok(Json(ApiResponse::room(room)))
}

/// POST /api/submit-photo
pub async fn submit_photo(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitPhotoRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body?;
    let message = "Room ID, player ID, and image data are required";
    let room_id = required(req.room_id, message)?;
    let player_id = required(req.player_id, message)?;
    let image_data = req
        .image_data
        .filter(|data| !data.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))?;

    let room = state.submit_photo(&room_id, &player_id, image_data).await?;
    Ok(Json(ApiResponse::room(room)))
}

/// GET /api/get-results?roomId=
///
/// Scores the round on first call once everybody has submitted; later calls
/// return the frozen results.
pub async fn get_results(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResultsQuery>,
) -> ApiResult {
    let room_id = required(query.room_id, "Room ID is required")?;
    let room = state.compute_results(&room_id).await?;
    Ok(Json(ApiResponse::room(room)))
}

/// GET /api/room/{room_id}
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> ApiResult {
    let room_id = required(Some(room_id), "Room ID is required")?;
    let room = state.get_room(&normalize_room_id(&room_id)).await?;
    Ok(Json(ApiResponse::room(room)))
}

/// GET /api/rooms
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> Json<RoomListResponse> {
    Json(RoomListResponse {
        success: true,
        rooms: state.list_rooms().await,
    })
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/create-room", post(create_room))
        .route("/api/join-room", post(join_room))
        .route("/api/start-game", post(start_game))
        .route("/api/submit-photo", post(submit_photo))
        .route("/api/get-results", get(get_results))
        .route("/api/room/{room_id}", get(get_room))
        .route("/api/rooms", get(list_rooms))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}
