use super::AppState;
use crate::error::{RoomError, RoomResult};
use crate::store::generate_room_id;
use crate::types::*;

fn new_player_id() -> PlayerId {
    ulid::Ulid::new().to_string()
}

impl AppState {
    /// Create a room with `host_name` as its first player and host.
    /// Name validation is the caller's job.
    pub async fn create_room(&self, host_name: String) -> Room {
        loop {
            let now = self.clock.now();
            let host = Player {
                id: new_player_id(),
                name: host_name.clone(),
                joined_at: now,
            };
            let room = Room {
                id: generate_room_id(self.store.as_ref(), &self.dice).await,
                host: host.id.clone(),
                players: vec![host],
                game_state: GameState::Lobby,
                prompt: None,
                submissions: Vec::new(),
                winner: None,
                created_at: now,
                version: 0,
            };

            // Another handler may have claimed the same code since we drew it
            if self.store.insert_new(room.clone()).await {
                tracing::info!("Created room {} for host {}", room.id, host_name);
                return room;
            }
        }
    }

    /// Join a room still in its lobby. Returns the room and the new player's id.
    pub async fn join_room(&self, room_id: &str, name: String) -> RoomResult<(Room, PlayerId)> {
        let room_id = normalize_room_id(room_id);
        let player_id = new_player_id();

        let (room, ()) = self
            .update_room(&room_id, |room| {
                if room.players.len() >= MAX_PLAYERS {
                    return Err(RoomError::RoomFull { max: MAX_PLAYERS });
                }
                if room.game_state != GameState::Lobby {
                    return Err(RoomError::RoundInProgress);
                }
                if room.is_name_taken(&name) {
                    return Err(RoomError::NameTaken(name.clone()));
                }

                room.players.push(Player {
                    id: player_id.clone(),
                    name: name.clone(),
                    joined_at: self.clock.now(),
                });
                Ok(())
            })
            .await?;

        tracing::info!(
            "{} joined room {} ({}/{} players)",
            name,
            room.id,
            room.players.len(),
            MAX_PLAYERS
        );
        Ok((room, player_id))
    }

    /// Current snapshot of a room
    pub async fn get_room(&self, room_id: &str) -> RoomResult<Room> {
        let room_id = normalize_room_id(room_id);
        self.store
            .get(&room_id)
            .await
            .ok_or(RoomError::RoomNotFound(room_id))
    }

    /// Summary of every room, oldest first
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self.store.list().await.iter().map(Into::into).collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        rooms
    }

    /// Drop rooms past their retention window; returns how many went
    pub async fn purge_expired(&self) -> usize {
        let removed = self
            .store
            .remove_expired(self.clock.now(), self.room_ttl)
            .await;
        if !removed.is_empty() {
            tracing::info!("Purged {} expired rooms: {:?}", removed.len(), removed);
        }
        removed.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::RoomError;
    use crate::state::tests::harness;
    use crate::types::*;

    #[tokio::test]
    async fn test_create_room() {
        let h = harness();
        let room = h.state.create_room("Hana".to_string()).await;

        assert_eq!(room.id.len(), 6);
        assert_eq!(room.id, room.id.to_uppercase());
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.host, room.players[0].id);
        assert_eq!(room.game_state, GameState::Lobby);
        assert!(room.prompt.is_none());
        assert!(room.winner.is_none());
        assert!(room.submissions.is_empty());
        assert!(h.state.store.get(&room.id).await.is_some());
    }

    #[tokio::test]
    async fn test_room_ids_are_unique() {
        let h = harness();
        let mut ids = std::collections::HashSet::new();
        for i in 0..50 {
            let room = h.state.create_room(format!("Host{}", i)).await;
            assert!(ids.insert(room.id));
        }
        assert_eq!(h.state.store.list_ids().await.len(), 50);
    }

    #[tokio::test]
    async fn test_join_room_is_case_insensitive_on_code() {
        let h = harness();
        let room = h.state.create_room("Hana".to_string()).await;

        let (joined, player_id) = h
            .state
            .join_room(&room.id.to_lowercase(), "Alice".to_string())
            .await
            .unwrap();
        assert_eq!(joined.players.len(), 2);
        assert_eq!(joined.players[1].id, player_id);
        assert_eq!(joined.players[1].name, "Alice");
    }

    #[tokio::test]
    async fn test_join_room_not_found() {
        let h = harness();
        let result = h.state.join_room("zzzzzz", "Alice".to_string()).await;
        assert_eq!(
            result.unwrap_err(),
            RoomError::RoomNotFound("ZZZZZZ".to_string())
        );
    }

    #[tokio::test]
    async fn test_join_room_name_taken() {
        let h = harness();
        let room = h.state.create_room("Hana".to_string()).await;
        h.state
            .join_room(&room.id, "Alice".to_string())
            .await
            .unwrap();

        let result = h.state.join_room(&room.id, "alice".to_string()).await;
        assert_eq!(
            result.unwrap_err(),
            RoomError::NameTaken("alice".to_string())
        );

        // Host name counts too
        let result = h.state.join_room(&room.id, "HANA".to_string()).await;
        assert!(matches!(result, Err(RoomError::NameTaken(_))));
    }

    #[tokio::test]
    async fn test_join_room_full() {
        let h = harness();
        let room = h.state.create_room("P0".to_string()).await;
        for i in 1..MAX_PLAYERS {
            h.state
                .join_room(&room.id, format!("P{}", i))
                .await
                .unwrap();
        }

        let result = h.state.join_room(&room.id, "Late".to_string()).await;
        assert_eq!(result.unwrap_err(), RoomError::RoomFull { max: MAX_PLAYERS });

        let room = h.state.get_room(&room.id).await.unwrap();
        assert_eq!(room.players.len(), MAX_PLAYERS);
    }

    #[tokio::test]
    async fn test_join_room_during_round() {
        let h = harness();
        let room = h.state.create_room("Hana".to_string()).await;
        h.state
            .join_room(&room.id, "Alice".to_string())
            .await
            .unwrap();
        h.state.start_game(&room.id, &room.host).await.unwrap();

        let result = h.state.join_room(&room.id, "Bob".to_string()).await;
        assert_eq!(result.unwrap_err(), RoomError::RoundInProgress);
    }

    #[tokio::test]
    async fn test_concurrent_joins_are_not_lost() {
        let h = harness();
        let room = h.state.create_room("Host".to_string()).await;

        let joins = (1..MAX_PLAYERS).map(|i| {
            let state = h.state.clone();
            let id = room.id.clone();
            tokio::spawn(async move { state.join_room(&id, format!("P{}", i)).await })
        });
        for result in futures::future::join_all(joins).await {
            result.unwrap().unwrap();
        }

        let room = h.state.get_room(&room.id).await.unwrap();
        assert_eq!(room.players.len(), MAX_PLAYERS);
    }

    #[tokio::test]
    async fn test_list_rooms_oldest_first() {
        let h = harness();
        let first = h.state.create_room("A".to_string()).await;
        h.clock.advance(chrono::Duration::seconds(5));
        let second = h.state.create_room("B".to_string()).await;

        let rooms = h.state.list_rooms().await;
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].id, first.id);
        assert_eq!(rooms[1].id, second.id);
        assert_eq!(rooms[0].player_count, 1);
        assert_eq!(rooms[0].status, GameState::Lobby);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let h = harness();
        let old = h.state.create_room("Old".to_string()).await;
        h.clock.advance(chrono::Duration::minutes(45));
        let fresh = h.state.create_room("Fresh".to_string()).await;
        h.clock.advance(chrono::Duration::minutes(20));

        assert_eq!(h.state.purge_expired().await, 1);
        assert!(matches!(
            h.state.get_room(&old.id).await,
            Err(RoomError::RoomNotFound(_))
        ));
        assert!(h.state.get_room(&fresh.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_spares_round_in_progress() {
        let h = harness();
        let room = h.state.create_room("Host".to_string()).await;
        h.state
            .join_room(&room.id, "Guest".to_string())
            .await
            .unwrap();
        h.state.start_game(&room.id, &room.host).await.unwrap();

        h.clock.advance(chrono::Duration::minutes(90));
        assert_eq!(h.state.purge_expired().await, 0);

        h.clock.advance(chrono::Duration::minutes(31));
        assert_eq!(h.state.purge_expired().await, 1);
    }
}
