use super::AppState;
use crate::error::{RoomError, RoomResult};
use crate::types::*;

impl AppState {
    /// Record a player's photo for the current round. Scoring happens later,
    /// in [`AppState::compute_results`].
    pub async fn submit_photo(
        &self,
        room_id: &str,
        player_id: &str,
        image_data: String,
    ) -> RoomResult<Room> {
        let room_id = normalize_room_id(room_id);

        let (room, player_name) = self
            .update_room(&room_id, |room| {
                if room.game_state != GameState::Playing {
                    return Err(RoomError::InvalidState);
                }
                let player_name = room
                    .player(player_id)
                    .map(|p| p.name.clone())
                    .ok_or(RoomError::PlayerNotInRoom)?;
                if room.has_submitted(player_id) {
                    return Err(RoomError::DuplicateSubmission);
                }

                room.submissions.push(PhotoSubmission {
                    player_id: player_id.to_string(),
                    player_name: player_name.clone(),
                    image_data: image_data.clone(),
                    submitted_at: self.clock.now(),
                    score: None,
                });
                Ok(player_name)
            })
            .await?;

        tracing::info!(
            "{} submitted a photo in room {} ({}/{} submitted, {} bytes)",
            player_name,
            room.id,
            room.submissions.len(),
            room.players.len(),
            image_data.len()
        );
        Ok(room)
    }
}
