//! Room lifecycle engine.
//!
//! `lobby -> playing -> results -> playing -> ...`
//!
//! Every mutation is a read-modify-write against the [`RoomStore`] that is
//! committed with a version check and retried on conflict, so concurrent
//! requests against one room re-validate instead of clobbering each other.

mod game;
mod room;
mod score;
mod submission;

use crate::error::{RoomError, RoomResult};
use crate::judge::{HeuristicJudge, Judge};
use crate::sources::{Clock, Dice, SystemClock};
use crate::store::{CasOutcome, MemoryStore, RoomStore};
use crate::types::{Room, ROOM_TTL};
use std::sync::Arc;
use std::time::Duration;

pub use score::{pick_winner, rank_submissions};

/// How often a write is retried after losing a version race
pub const MAX_WRITE_ATTEMPTS: usize = 8;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RoomStore>,
    pub judge: Arc<dyn Judge>,
    pub clock: Arc<dyn Clock>,
    pub dice: Arc<Dice>,
    /// Rooms older than this are purged
    pub room_ttl: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RoomStore>,
        judge: Arc<dyn Judge>,
        clock: Arc<dyn Clock>,
        dice: Arc<Dice>,
    ) -> Self {
        Self {
            store,
            judge,
            clock,
            dice,
            room_ttl: ROOM_TTL,
        }
    }

    /// In-memory store, heuristic judge, wall clock
    pub fn in_memory() -> Self {
        let dice = Arc::new(Dice::from_entropy());
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(HeuristicJudge::new(dice.clone())),
            Arc::new(SystemClock),
            dice,
        )
    }

    pub fn with_room_ttl(mut self, room_ttl: Duration) -> Self {
        self.room_ttl = room_ttl;
        self
    }

    /// Read a room fresh from the store, apply `apply`, and write it back if
    /// nobody else wrote in between. On a lost race the whole cycle (including
    /// validation inside `apply`) runs again against the newer room.
    pub(crate) async fn update_room<T, F>(&self, room_id: &str, mut apply: F) -> RoomResult<(Room, T)>
    where
        F: FnMut(&mut Room) -> RoomResult<T> + Send,
        T: Send,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut room = self
                .store
                .get(room_id)
                .await
                .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?;

            let out = apply(&mut room)?;

            match self.store.put_if_version(room).await {
                CasOutcome::Stored(room) => return Ok((room, out)),
                CasOutcome::Missing => return Err(RoomError::RoomNotFound(room_id.to_string())),
                CasOutcome::Conflict => {
                    tracing::debug!(
                        "Write to room {} lost a race (attempt {}), retrying",
                        room_id,
                        attempt
                    );
                }
            }
        }

        tracing::warn!(
            "Giving up on room {} after {} conflicting writes",
            room_id,
            MAX_WRITE_ATTEMPTS
        );
        Err(RoomError::Conflict(room_id.to_string()))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory()
    }
}
