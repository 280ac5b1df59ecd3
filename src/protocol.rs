//! JSON bodies of the HTTP API.
//!
//! Request fields are optional on purpose: missing or blank fields are
//! reported through the normal error envelope instead of a bare 422.

use crate::error::RoomError;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    pub room_id: Option<String>,
    pub player_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPhotoRequest {
    pub room_id: Option<String>,
    pub player_id: Option<String>,
    pub image_data: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsQuery {
    pub room_id: Option<String>,
}

/// Response envelope shared by all room endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable error code (see [`RoomError::code`])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Submission progress, set when results are not ready yet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl ApiResponse {
    pub fn room(room: Room) -> Self {
        Self {
            success: true,
            room: Some(room),
            ..Self::default()
        }
    }

    pub fn room_with_player(room: Room, player_id: PlayerId) -> Self {
        Self {
            player_id: Some(player_id),
            ..Self::room(room)
        }
    }

    /// Boundary validation failure
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            code: Some("BAD_REQUEST".to_string()),
            ..Self::default()
        }
    }
}

impl From<&RoomError> for ApiResponse {
    fn from(err: &RoomError) -> Self {
        let (submitted, total) = match err {
            RoomError::IncompleteSubmissions { submitted, total } => (Some(*submitted), Some(*total)),
            _ => (None, None),
        };
        Self {
            success: false,
            error: Some(err.to_string()),
            code: Some(err.code().to_string()),
            submitted,
            total,
            ..Self::default()
        }
    }
}

/// Debug listing of all rooms
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListResponse {
    pub success: bool,
    pub rooms: Vec<RoomSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_submissions_envelope() {
        let err = RoomError::IncompleteSubmissions {
            submitted: 2,
            total: 4,
        };
        let json = serde_json::to_value(ApiResponse::from(&err)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "INCOMPLETE_SUBMISSIONS");
        assert_eq!(json["submitted"], 2);
        assert_eq!(json["total"], 4);
        assert!(json.get("room").is_none());
    }

    #[test]
    fn test_request_field_names() {
        let req: SubmitPhotoRequest =
            serde_json::from_str(r#"{"roomId":"abc","playerId":"p","imageData":"x"}"#).unwrap();
        assert_eq!(req.room_id.as_deref(), Some("abc"));
        assert_eq!(req.image_data.as_deref(), Some("x"));

        let req: JoinRoomRequest = serde_json::from_str("{}").unwrap();
        assert!(req.room_id.is_none());
    }
}
