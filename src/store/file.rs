//! JSON-file backed room store.
//!
//! The file is the source of truth so several server processes can share
//! it. Reads parse the file into a private map; writes re-read it under an
//! in-process write lock and replace it through a temp file + rename so
//! readers never observe a half-written document. Any I/O failure is logged
//! and switches the store to in-memory mode for the rest of the process
//! lifetime, starting from an empty map.

use super::memory::swap_if_version;
use super::{CasOutcome, RoomStore};
use crate::types::{Room, RoomId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};

type RoomMap = HashMap<RoomId, Room>;

pub struct FileStore {
    path: PathBuf,
    /// Working copy for writers; the only copy once in memory mode
    cache: RwLock<RoomMap>,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
    in_memory: AtomicBool,
}

impl FileStore {
    /// Open (or lazily create) a store at `path`
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self {
            path: path.into(),
            cache: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
            in_memory: AtomicBool::new(false),
        };
        let count = store.read(|rooms| rooms.len()).await;
        tracing::info!(
            "Room store at {} opened with {} existing rooms",
            store.path.display(),
            count
        );
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file has been abandoned after an I/O failure
    pub fn is_in_memory(&self) -> bool {
        self.in_memory.load(Ordering::SeqCst)
    }

    /// Switch to in-memory mode; true only for the call that flipped it
    fn degrade(&self) -> bool {
        let flipped = !self.in_memory.swap(true, Ordering::SeqCst);
        if flipped {
            tracing::warn!(
                "Room store {} switched to in-memory mode; changes will not be persisted",
                self.path.display()
            );
        }
        flipped
    }

    /// Parse the backing file. `None` once the store lives in memory.
    async fn read_disk(&self) -> Option<RoomMap> {
        if self.is_in_memory() {
            return None;
        }

        let loaded = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => serde_json::from_str::<RoomMap>(&data)
                .map_err(|e| format!("Failed to parse room store {}: {}", self.path.display(), e)),
            // Nothing persisted yet
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(format!(
                "Failed to read room store {}: {}",
                self.path.display(),
                e
            )),
        };

        match loaded {
            Ok(rooms) => Some(rooms),
            Err(message) => {
                tracing::error!("{}", message);
                // An unreadable store counts as empty from here on
                if self.degrade() {
                    self.cache.write().await.clear();
                }
                None
            }
        }
    }

    /// Run `f` against the current rooms without touching the shared cache
    async fn read<T>(&self, f: impl FnOnce(&RoomMap) -> T) -> T {
        match self.read_disk().await {
            Some(rooms) => f(&rooms),
            None => f(&*self.cache.read().await),
        }
    }

    /// Reload, apply `f`, and persist if `f` reports a change
    async fn mutate<T>(&self, f: impl FnOnce(&mut RoomMap) -> (T, bool)) -> T {
        let _guard = self.write_lock.lock().await;
        let on_disk = self.read_disk().await;

        let (out, json) = {
            let mut cache = self.cache.write().await;
            if let Some(rooms) = on_disk {
                *cache = rooms;
            }
            let (out, changed) = f(&mut cache);
            let json = if changed && !self.is_in_memory() {
                match serde_json::to_string_pretty(&*cache) {
                    Ok(json) => Some(json),
                    Err(e) => {
                        tracing::error!("Failed to serialize rooms: {}", e);
                        self.degrade();
                        None
                    }
                }
            } else {
                None
            };
            (out, json)
        };

        if let Some(json) = json {
            self.persist(json).await;
        }
        out
    }

    /// Replace the backing file (best effort)
    async fn persist(&self, json: String) {
        let tmp = self.temp_path();
        let result = async {
            tokio::fs::write(&tmp, json).await?;
            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to save rooms to {}: {}", self.path.display(), e);
            let _ = tokio::fs::remove_file(&tmp).await;
            self.degrade();
        }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "rooms.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, ulid::Ulid::new()))
    }
}

#[async_trait]
impl RoomStore for FileStore {
    async fn get(&self, id: &str) -> Option<Room> {
        self.read(|rooms| rooms.get(id).cloned()).await
    }

    async fn put(&self, room: Room) {
        self.mutate(|rooms| {
            rooms.insert(room.id.clone(), room);
            ((), true)
        })
        .await
    }

    async fn insert_new(&self, room: Room) -> bool {
        self.mutate(|rooms| {
            if rooms.contains_key(&room.id) {
                return (false, false);
            }
            rooms.insert(room.id.clone(), room);
            (true, true)
        })
        .await
    }

    async fn put_if_version(&self, room: Room) -> CasOutcome {
        self.mutate(|rooms| {
            let outcome = swap_if_version(rooms, room);
            let changed = matches!(outcome, CasOutcome::Stored(_));
            (outcome, changed)
        })
        .await
    }

    async fn list_ids(&self) -> HashSet<RoomId> {
        self.read(|rooms| rooms.keys().cloned().collect()).await
    }

    async fn list(&self) -> Vec<Room> {
        self.read(|rooms| rooms.values().cloned().collect()).await
    }

    async fn remove_where(
        &self,
        expired: &(dyn for<'r> Fn(&'r Room) -> bool + Send + Sync),
    ) -> Vec<RoomId> {
        self.mutate(|rooms| {
            let doomed: Vec<RoomId> = rooms
                .values()
                .filter(|r| expired(r))
                .map(|r| r.id.clone())
                .collect();
            for id in &doomed {
                rooms.remove(id);
            }
            let changed = !doomed.is_empty();
            (doomed, changed)
        })
        .await
    }
}
