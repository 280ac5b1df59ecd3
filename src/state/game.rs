use super::AppState;
use crate::error::{RoomError, RoomResult};
use crate::prompts::random_prompt;
use crate::types::*;

impl AppState {
    /// Start a round (first one or "play again"). Host only.
    ///
    /// Draws a fresh prompt and wipes the previous round's submissions and
    /// winner.
    pub async fn start_game(&self, room_id: &str, player_id: &str) -> RoomResult<Room> {
        let room_id = normalize_room_id(room_id);

        let (room, ()) = self
            .update_room(&room_id, |room| {
                if room.host != player_id {
                    return Err(RoomError::NotHost);
                }
                if room.players.len() < MIN_PLAYERS_TO_START {
                    return Err(RoomError::InsufficientPlayers {
                        required: MIN_PLAYERS_TO_START,
                        current: room.players.len(),
                    });
                }

                room.game_state = GameState::Playing;
                room.prompt = Some(random_prompt(&self.dice).to_string());
                room.submissions.clear();
                room.winner = None;
                Ok(())
            })
            .await?;

        tracing::info!(
            "Round started in room {} with {} players, prompt: {:?}",
            room.id,
            room.players.len(),
            room.prompt
        );
        Ok(room)
    }
}
