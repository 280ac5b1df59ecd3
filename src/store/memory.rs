use super::{CasOutcome, RoomStore};
use crate::types::{Room, RoomId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Process-local room store
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: RwLock<HashMap<RoomId, Room>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Version-checked write shared by both store implementations
pub(super) fn swap_if_version(rooms: &mut HashMap<RoomId, Room>, mut room: Room) -> CasOutcome {
    match rooms.get(&room.id) {
        None => CasOutcome::Missing,
        Some(current) if current.version != room.version => CasOutcome::Conflict,
        Some(_) => {
            room.version += 1;
            rooms.insert(room.id.clone(), room.clone());
            CasOutcome::Stored(room)
        }
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn get(&self, id: &str) -> Option<Room> {
        self.rooms.read().await.get(id).cloned()
    }

    async fn put(&self, room: Room) {
        self.rooms.write().await.insert(room.id.clone(), room);
    }

    async fn insert_new(&self, room: Room) -> bool {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.id) {
            return false;
        }
        rooms.insert(room.id.clone(), room);
        true
    }

    async fn put_if_version(&self, room: Room) -> CasOutcome {
        swap_if_version(&mut *self.rooms.write().await, room)
    }

    async fn list_ids(&self) -> HashSet<RoomId> {
        self.rooms.read().await.keys().cloned().collect()
    }

    async fn list(&self) -> Vec<Room> {
        self.rooms.read().await.values().cloned().collect()
    }

    async fn remove_where(
        &self,
        expired: &(dyn for<'r> Fn(&'r Room) -> bool + Send + Sync),
    ) -> Vec<RoomId> {
        let mut rooms = self.rooms.write().await;
        let doomed: Vec<RoomId> = rooms
            .values()
            .filter(|r| expired(r))
            .map(|r| r.id.clone())
            .collect();
        for id in &doomed {
            rooms.remove(id);
        }
        doomed
    }
}
