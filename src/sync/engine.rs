//! Room registry and frame relay shared by every sync connection.
//!
//! [`SyncEngine`] owns all rooms. Each room remembers its latest sync
//! frame and holds one bounded outbound queue per connected client.
//! Relaying never awaits: a client whose queue is full is dropped from
//! the room, which ends its connection once the queued frames are
//! flushed.
//!
//! A room without clients is dropped at once when it has no state, and
//! after an idle period otherwise (see [`SyncEngine::evict_idle`]).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{RwLock, mpsc};

use super::protocol::{MessageKind, seed_frame};

/// Room used for connections that do not name one.
pub const DEFAULT_ROOM: &str = "default";

/// Supplies the initial document of a room when it is first opened.
#[async_trait]
pub trait DocumentSource: Send + Sync + std::fmt::Debug {
    /// Markdown to seed `room` with, or `None` to start empty.
    async fn initial_content(&self, room: &str) -> Option<String>;
}

/// Identifier of a connected sync client, unique per engine.
pub type ClientId = u64;

#[derive(Debug)]
struct RoomInner {
    state: Option<Bytes>,
    clients: HashMap<ClientId, mpsc::Sender<Bytes>>,
    idle_since: Option<Instant>,
}

/// A document room.
#[derive(Debug)]
pub struct Room {
    id: String,
    inner: RwLock<RoomInner>,
}

impl Room {
    fn new(id: String, state: Option<Bytes>) -> Self {
        Self {
            id,
            inner: RwLock::new(RoomInner {
                state,
                clients: HashMap::new(),
                idle_since: None,
            }),
        }
    }

    /// Room id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The latest sync frame, if any.
    pub async fn state(&self) -> Option<Bytes> {
        self.inner.read().await.state.clone()
    }

    /// Number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.inner.read().await.clients.len()
    }
}

/// A client's membership in a room.
#[derive(Debug)]
pub struct Subscription {
    /// Client id for [`SyncEngine::publish`] and [`SyncEngine::leave`].
    pub client_id: ClientId,
    /// Room joined.
    pub room: Arc<Room>,
    /// Frames to write to the client. Yields `None` once the client has
    /// been dropped from the room or the room has been closed.
    pub frames: mpsc::Receiver<Bytes>,
}

/// Shared relay engine.
#[derive(Debug)]
pub struct SyncEngine {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    client_buffer: usize,
    source: Option<Arc<dyn DocumentSource>>,
    next_client: AtomicU64,
}

impl SyncEngine {
    /// An engine giving every client `client_buffer` queued frames and
    /// seeding new rooms from `source`.
    #[must_use]
    pub fn new(client_buffer: usize, source: Option<Arc<dyn DocumentSource>>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            client_buffer: client_buffer.max(1),
            source,
            next_client: AtomicU64::new(1),
        }
    }

    /// Normalizes a request path into a room id.
    #[must_use]
    pub fn room_for_path(path: &str) -> String {
        let room = path.trim_start_matches('/');
        if room.is_empty() {
            DEFAULT_ROOM.to_string()
        } else {
            room.to_string()
        }
    }

    async fn seed_for(&self, room_id: &str) -> Option<Bytes> {
        let source = self.source.as_ref()?;
        source.initial_content(room_id).await.map(|c| seed_frame(&c))
    }

    /// Adds a client to `room_id`, creating (and seeding) the room on
    /// first use. The current room state is queued as the first frame.
    pub async fn join(&self, room_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.client_buffer);
        let client_id = self.next_client.fetch_add(1, Ordering::Relaxed);

        // The seed is loaded without holding the registry lock; if the
        // room vanished meanwhile, load it again.
        let mut seed = None;
        let mut seed_loaded = false;
        loop {
            if !seed_loaded && !self.rooms.read().await.contains_key(room_id) {
                seed = self.seed_for(room_id).await;
                seed_loaded = true;
            }

            let mut rooms = self.rooms.write().await;
            let room = match rooms.get(room_id) {
                Some(room) => Arc::clone(room),
                None if seed_loaded => {
                    let seed = seed.take();
                    tracing::info!(room = %room_id, seeded = seed.is_some(), "sync room opened");
                    let room = Arc::new(Room::new(room_id.to_string(), seed));
                    rooms.insert(room_id.to_string(), Arc::clone(&room));
                    room
                }
                None => continue,
            };

            // Registered under the registry lock so a concurrent close
            // cannot leave this client in a detached room.
            {
                let mut inner = room.inner.write().await;
                if let Some(state) = &inner.state {
                    let _ = tx.try_send(state.clone());
                }
                inner.clients.insert(client_id, tx);
                inner.idle_since = None;
            }
            drop(rooms);
            tracing::debug!(room = %room_id, client_id, "sync client joined");

            return Subscription {
                client_id,
                room,
                frames: rx,
            };
        }
    }

    /// Relays `frame` from `sender` to every other client of `room`.
    ///
    /// Returns the number of clients the frame was queued for. Frames
    /// whose kind cannot be decoded are dropped.
    pub async fn publish(&self, room: &Room, sender: ClientId, frame: Bytes) -> usize {
        let kind = match MessageKind::of(&frame) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::debug!(room = %room.id, client_id = sender, error = %e, "dropping malformed frame");
                return 0;
            }
        };

        let mut inner = room.inner.write().await;
        if kind == MessageKind::Sync {
            inner.state = Some(frame.clone());
        }

        let mut delivered = 0;
        inner.clients.retain(|&client_id, tx| {
            if client_id == sender {
                return true;
            }
            match tx.try_send(frame.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(room = %room.id, client_id, "sync client too slow, disconnecting");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
        delivered
    }

    /// Removes a client from its room. An empty room keeps its state for
    /// late joiners; an empty room without state is dropped.
    pub async fn leave(&self, room: &Room, client_id: ClientId) {
        let mut rooms = self.rooms.write().await;
        let mut inner = room.inner.write().await;
        inner.clients.remove(&client_id);
        tracing::debug!(room = %room.id, client_id, "sync client left");

        if !inner.clients.is_empty() {
            return;
        }
        let registered = rooms
            .get(&room.id)
            .is_some_and(|current| std::ptr::eq(Arc::as_ptr(current), room));
        if inner.state.is_none() {
            if registered {
                rooms.remove(&room.id);
                tracing::debug!(room = %room.id, "empty sync room dropped");
            }
        } else if inner.idle_since.is_none() {
            inner.idle_since = Some(Instant::now());
        }
    }

    /// Drops rooms that have had no clients for at least `ttl` as of
    /// `now`. Returns the number of rooms dropped.
    pub async fn evict_idle(&self, now: Instant, ttl: Duration) -> usize {
        let mut rooms = self.rooms.write().await;
        let mut expired = Vec::new();
        for (id, room) in rooms.iter() {
            let inner = room.inner.read().await;
            let idle_for = inner
                .idle_since
                .map(|since| now.saturating_duration_since(since));
            if inner.clients.is_empty() && idle_for.is_some_and(|d| d >= ttl) {
                expired.push(id.clone());
            }
        }
        for id in &expired {
            rooms.remove(id);
            tracing::info!(room = %id, "idle sync room evicted");
        }
        expired.len()
    }

    /// Runs [`SyncEngine::evict_idle`] every `every`, dropping rooms idle
    /// for `ttl`. A zero interval disables eviction.
    pub fn spawn_evictor(self: Arc<Self>, every: Duration, ttl: Duration) -> Option<tokio::task::JoinHandle<()>> {
        if every.is_zero() {
            return None;
        }
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = self.evict_idle(Instant::now(), ttl).await;
                if evicted > 0 {
                    tracing::debug!(evicted, "sync rooms swept");
                }
            }
        }))
    }

    /// Closes a room, disconnecting its clients and discarding its state.
    /// Returns `false` if no such room was open.
    pub async fn close_room(&self, room_id: &str) -> bool {
        let Some(room) = self.rooms.write().await.remove(room_id) else {
            return false;
        };
        let mut inner = room.inner.write().await;
        let clients = inner.clients.len();
        inner.clients.clear();
        inner.state = None;
        tracing::info!(room = %room_id, clients, "sync room closed");
        true
    }

    /// Looks up an open room.
    pub async fn room(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(room_id).map(Arc::clone)
    }

    /// Number of open rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Number of connected clients across all rooms.
    pub async fn client_count(&self) -> usize {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().map(Arc::clone).collect();
        let mut total = 0;
        for room in rooms {
            total += room.client_count().await;
        }
        total
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedSource;

    #[async_trait]
    impl DocumentSource for FixedSource {
        async fn initial_content(&self, room: &str) -> Option<String> {
            (room == "shared").then(|| "# hello".to_string())
        }
    }

    fn sync_frame(tag: u8) -> Bytes {
        Bytes::from(vec![0, 2, 1, tag])
    }

    fn awareness_frame(tag: u8) -> Bytes {
        Bytes::from(vec![1, tag])
    }

    #[test]
    fn paths_map_to_rooms() {
        assert_eq!(SyncEngine::room_for_path("/"), "default");
        assert_eq!(SyncEngine::room_for_path(""), "default");
        assert_eq!(SyncEngine::room_for_path("/doc-1"), "doc-1");
        assert_eq!(SyncEngine::room_for_path("/a/b"), "a/b");
    }

    #[tokio::test]
    async fn frames_reach_the_other_clients_only() {
        let engine = SyncEngine::new(8, None);
        let mut a = engine.join("r").await;
        let mut b = engine.join("r").await;
        let mut c = engine.join("other").await;

        let delivered = engine.publish(&a.room, a.client_id, awareness_frame(7)).await;
        assert_eq!(delivered, 1);
        assert_eq!(b.frames.recv().await, Some(awareness_frame(7)));
        assert!(a.frames.try_recv().is_err());
        assert!(c.frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn latest_sync_frame_greets_new_clients() {
        let engine = SyncEngine::new(8, None);
        let a = engine.join("r").await;
        engine.publish(&a.room, a.client_id, sync_frame(1)).await;
        engine.publish(&a.room, a.client_id, awareness_frame(9)).await;
        engine.publish(&a.room, a.client_id, sync_frame(2)).await;

        let mut late = engine.join("r").await;
        assert_eq!(late.frames.recv().await, Some(sync_frame(2)));
        assert!(late.frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped() {
        let engine = SyncEngine::new(8, None);
        let a = engine.join("r").await;
        let mut b = engine.join("r").await;
        assert_eq!(engine.publish(&a.room, a.client_id, Bytes::new()).await, 0);
        assert_eq!(
            engine.publish(&a.room, a.client_id, Bytes::from_static(&[0x80])).await,
            0
        );
        assert!(b.frames.try_recv().is_err());
        assert!(a.room.state().await.is_none());
    }

    #[tokio::test]
    async fn rooms_are_seeded_from_the_source() {
        let engine = SyncEngine::new(8, Some(Arc::new(FixedSource)));
        let mut shared = engine.join("shared").await;
        assert_eq!(shared.frames.recv().await, Some(seed_frame("# hello")));

        let mut plain = engine.join("plain").await;
        assert!(plain.frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn slow_clients_are_disconnected() {
        let engine = SyncEngine::new(2, None);
        let a = engine.join("r").await;
        let mut slow = engine.join("r").await;

        for i in 0..3 {
            engine.publish(&a.room, a.client_id, awareness_frame(i)).await;
        }
        assert_eq!(a.room.client_count().await, 1);

        // Queued frames are still flushed before the stream ends.
        assert_eq!(slow.frames.recv().await, Some(awareness_frame(0)));
        assert_eq!(slow.frames.recv().await, Some(awareness_frame(1)));
        assert_eq!(slow.frames.recv().await, None);
    }

    #[tokio::test]
    async fn closing_a_room_ends_its_clients() {
        let engine = SyncEngine::new(8, None);
        let mut a = engine.join("r").await;
        assert_eq!(engine.room_count().await, 1);
        assert_eq!(engine.client_count().await, 1);

        assert!(engine.close_room("r").await);
        assert!(!engine.close_room("r").await);
        assert_eq!(a.frames.recv().await, None);
        assert_eq!(engine.room_count().await, 0);
    }

    #[tokio::test]
    async fn empty_rooms_without_state_are_dropped() {
        let engine = SyncEngine::new(8, None);
        for i in 0..100 {
            let sub = engine.join(&format!("junk-{i}")).await;
            engine.leave(&sub.room, sub.client_id).await;
        }
        assert_eq!(engine.room_count().await, 0);

        let a = engine.join("busy").await;
        let b = engine.join("busy").await;
        engine.leave(&a.room, a.client_id).await;
        assert_eq!(engine.room_count().await, 1);
        engine.leave(&b.room, b.client_id).await;
        assert_eq!(engine.room_count().await, 0);
    }

    #[tokio::test]
    async fn idle_rooms_with_state_expire() {
        let engine = SyncEngine::new(8, None);
        let a = engine.join("kept").await;
        engine.publish(&a.room, a.client_id, sync_frame(1)).await;
        let occupied = engine.join("occupied").await;
        engine.publish(&occupied.room, occupied.client_id, sync_frame(2)).await;
        engine.leave(&a.room, a.client_id).await;

        let ttl = Duration::from_secs(60);
        assert_eq!(engine.evict_idle(Instant::now(), ttl).await, 0);
        assert_eq!(engine.room_count().await, 2);

        assert_eq!(engine.evict_idle(Instant::now() + ttl, ttl).await, 1);
        assert!(engine.room("kept").await.is_none());
        assert!(engine.room("occupied").await.is_some());
    }

    #[tokio::test]
    async fn rejoining_cancels_the_idle_clock() {
        let engine = SyncEngine::new(8, None);
        let a = engine.join("r").await;
        engine.publish(&a.room, a.client_id, sync_frame(1)).await;
        engine.leave(&a.room, a.client_id).await;
        let _b = engine.join("r").await;

        let ttl = Duration::from_secs(1);
        assert_eq!(engine.evict_idle(Instant::now() + ttl, ttl).await, 0);
    }

    #[tokio::test]
    async fn joins_racing_a_close_land_in_a_live_room() {
        let engine = Arc::new(SyncEngine::new(8, None));
        let mut tasks = Vec::new();
        for _ in 0..50 {
            let joiner = Arc::clone(&engine);
            let closer = Arc::clone(&engine);
            tasks.push(tokio::spawn(async move { joiner.join("r").await }));
            tasks.push(tokio::spawn(async move {
                closer.close_room("r").await;
                closer.join("r").await
            }));
        }
        let mut subs = Vec::new();
        for task in tasks {
            let Ok(sub) = task.await else {
                panic!("join task failed");
            };
            subs.push(sub);
        }

        // Every surviving subscriber sits in the registered room.
        let Some(live) = engine.room("r").await else {
            panic!("room should be open");
        };
        for sub in subs.iter_mut() {
            if Arc::ptr_eq(&sub.room, &live) {
                continue;
            }
            // Clients of a closed room were disconnected.
            assert_eq!(sub.frames.recv().await, None);
        }
        assert_eq!(
            live.client_count().await,
            subs.iter().filter(|s| Arc::ptr_eq(&s.room, &live)).count()
        );
    }

    #[tokio::test]
    async fn leaving_keeps_the_room_state() {
        let engine = SyncEngine::new(8, None);
        let a = engine.join("r").await;
        engine.publish(&a.room, a.client_id, sync_frame(5)).await;
        engine.leave(&a.room, a.client_id).await;

        assert_eq!(engine.client_count().await, 0);
        let mut b = engine.join("r").await;
        assert_eq!(b.frames.recv().await, Some(sync_frame(5)));
    }
}
