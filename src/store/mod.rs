//! Room repository.
//!
//! Rooms are stored whole, keyed by their short code. Every write that
//! modifies an existing room goes through [`RoomStore::put_if_version`], a
//! compare-and-swap on [`Room::version`], so two handlers racing on the same
//! room can never silently overwrite each other. Both implementations give
//! read-your-writes within a process.

mod file;
mod memory;

use crate::sources::Dice;
use crate::types::{GameState, Room, RoomId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Alphabet for room codes
const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const ROOM_CODE_LENGTH: usize = 6;

/// Outcome of a version-checked write
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// Written; carries the room with its new version
    Stored(Room),
    /// Someone else wrote first
    Conflict,
    /// The room no longer exists
    Missing,
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Fresh read of a room
    async fn get(&self, id: &str) -> Option<Room>;

    /// Unconditional write
    async fn put(&self, room: Room);

    /// Insert a room under an id that must not exist yet. Returns false if taken.
    async fn insert_new(&self, room: Room) -> bool;

    /// Write `room` only if the stored version still equals `room.version`.
    /// On success the stored copy has its version bumped by one.
    async fn put_if_version(&self, room: Room) -> CasOutcome;

    async fn list_ids(&self) -> HashSet<RoomId>;

    async fn list(&self) -> Vec<Room>;

    /// Remove every room for which `expired` returns true; returns the removed ids
    async fn remove_where(
        &self,
        expired: &(dyn for<'r> Fn(&'r Room) -> bool + Send + Sync),
    ) -> Vec<RoomId>;

    /// Drop rooms older than `ttl`, see [`is_expired`]
    async fn remove_expired(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<RoomId> {
        self.remove_where(&move |room: &Room| is_expired(room, now, ttl))
            .await
    }
}

/// Expiry rule: a room is gone once it is older than `ttl`, except that a
/// round still being played gets a second `ttl` of grace.
pub fn is_expired(room: &Room, now: DateTime<Utc>, ttl: Duration) -> bool {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
    let limit = if room.game_state == GameState::Playing {
        ttl.checked_add(&ttl).unwrap_or(chrono::Duration::MAX)
    } else {
        ttl
    };
    room.age(now) > limit
}

/// Draw a random room code (no uniqueness check)
pub fn generate_room_code(dice: &Dice) -> RoomId {
    (0..ROOM_CODE_LENGTH)
        .map(|_| ROOM_CODE_CHARS[dice.index(ROOM_CODE_CHARS.len())] as char)
        .collect()
}

/// Draw room codes until one is not present in the store
pub async fn generate_room_id(store: &dyn RoomStore, dice: &Dice) -> RoomId {
    loop {
        let code = generate_room_code(dice);
        if store.get(&code).await.is_none() {
            break code;
        }
        // Collision - try again (36^6 codes, so this is rare)
        tracing::debug!("Room code {} already taken, drawing again", code);
    }
}
