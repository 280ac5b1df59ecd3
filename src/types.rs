use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque ID types for readability
pub type RoomId = String;
pub type PlayerId = String;

/// Maximum number of players in one room
pub const MAX_PLAYERS: usize = 5;

/// Players required before the host may start a round
pub const MIN_PLAYERS_TO_START: usize = 2;

/// Rooms older than this are purged
pub const ROOM_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    Lobby,
    Playing,
    Results,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoSubmission {
    pub player_id: PlayerId,
    pub player_name: String,
    pub image_data: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub submitted_at: DateTime<Utc>,
    /// Absent until the scoring pass runs; never recomputed within a round
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl PhotoSubmission {
    /// Score used for ranking (missing counts as zero)
    pub fn ranking_score(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameWinner {
    pub player_id: PlayerId,
    pub player_name: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    /// Player id of whoever created the room; never transfers
    pub host: PlayerId,
    pub players: Vec<Player>,
    pub game_state: GameState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub submissions: Vec<PhotoSubmission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<GameWinner>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Bumped on every successful store write (optimistic concurrency)
    #[serde(default)]
    pub version: u64,
}

impl Room {
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn has_submitted(&self, player_id: &str) -> bool {
        self.submissions.iter().any(|s| s.player_id == player_id)
    }

    pub fn is_name_taken(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.players.iter().any(|p| p.name.to_lowercase() == lowered)
    }

    /// Whether every enrolled player has submitted this round
    pub fn all_submitted(&self) -> bool {
        self.submissions.len() >= self.players.len()
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.created_at)
    }
}

/// Debug listing entry for a room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub player_count: usize,
    pub status: GameState,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            player_count: room.players.len(),
            status: room.game_state,
            created_at: room.created_at,
        }
    }
}

/// Normalize a user-typed room code
pub fn normalize_room_id(raw: &str) -> RoomId {
    raw.trim().to_uppercase()
}
