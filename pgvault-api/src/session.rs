//! In-process session attributes keyed by the `X-Session-Id` header.
//!
//! The resolver caches tenant and branch lookups here so later requests in
//! the same session skip the directory round trip. A bag belongs to the user
//! who created it; only authenticated requests create or write bags. Bags idle
//! past the configured timeout are dropped on access or by the sweeper, and the
//! least recently used bag is evicted once the store is full.

use dashmap::DashMap;
use pgvault_core::config::ServerSettings;
use pgvault_security::tenant::Session;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Header carrying the session id.
pub const SESSION_HEADER: &str = "x-session-id";

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(1_800);
const DEFAULT_CAPACITY: usize = 10_000;
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Bag {
    owner: String,
    attributes: HashMap<String, String>,
    last_seen: Instant,
}

impl Bag {
    fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            attributes: HashMap::new(),
            last_seen: Instant::now(),
        }
    }
}

/// Session attribute bags, one per session id.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Bag>,
    idle_timeout: Duration,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TIMEOUT, DEFAULT_CAPACITY)
    }
}

impl SessionStore {
    /// Store with the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store dropping bags idle for `idle_timeout` and holding at most `capacity`.
    #[must_use]
    pub fn with_limits(idle_timeout: Duration, capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
            capacity: capacity.max(1),
        }
    }

    /// Store sized from the server settings.
    #[must_use]
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self::with_limits(settings.session_idle_timeout(), settings.max_sessions)
    }

    /// Returns a handle bound to one session id.
    ///
    /// With a `user`, a bag owned by someone else is discarded and writes are
    /// allowed. Without one the handle is read-only.
    #[must_use]
    pub fn handle(
        self: &Arc<Self>,
        session_id: impl Into<String>,
        user: Option<&str>,
    ) -> SessionHandle {
        let session_id = session_id.into();
        if let Some(user) = user
            && self
                .sessions
                .remove_if(&session_id, |_, bag| bag.owner != user)
                .is_some()
        {
            debug!("Discarded session bag owned by another user");
        }
        SessionHandle {
            store: Arc::clone(self),
            session_id,
            owner: user.map(str::to_string),
        }
    }

    /// Reads one attribute and marks the session as used.
    #[must_use]
    pub fn attribute(&self, session_id: &str, key: &str) -> Option<String> {
        {
            let mut bag = self.sessions.get_mut(session_id)?;
            if !self.is_expired(&bag) {
                bag.last_seen = Instant::now();
                return bag.attributes.get(key).cloned();
            }
        }
        self.sessions.remove_if(session_id, |_, bag| self.is_expired(bag));
        None
    }

    fn write(&self, session_id: &str, owner: &str, key: &str, value: String) {
        if !self.sessions.contains_key(session_id) {
            self.make_room();
        }
        let mut bag = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Bag::new(owner));
        if bag.owner != owner || self.is_expired(&bag) {
            *bag = Bag::new(owner);
        }
        bag.last_seen = Instant::now();
        bag.attributes.insert(key.to_string(), value);
    }

    fn make_room(&self) {
        if self.sessions.len() < self.capacity {
            return;
        }
        self.sweep_expired();
        if self.sessions.len() < self.capacity {
            return;
        }
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.last_seen)
            .map(|entry| entry.key().clone());
        if let Some(oldest) = oldest {
            self.sessions.remove(&oldest);
            debug!(capacity = self.capacity, "Evicted least recently used session");
        }
    }

    fn is_expired(&self, bag: &Bag) -> bool {
        bag.last_seen.elapsed() > self.idle_timeout
    }

    /// Drops every idle bag; returns how many went.
    pub fn sweep_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, bag| !self.is_expired(bag));
        before.saturating_sub(self.sessions.len())
    }

    /// Sweeps idle bags in the background until the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        let every = (self.idle_timeout / 2).max(MIN_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let removed = store.sweep_expired();
                if removed > 0 {
                    debug!(removed, remaining = store.len(), "Expired idle sessions");
                }
            }
        })
    }

    /// Drops a session and everything cached on it.
    pub fn invalidate(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true when no session exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// A [`Session`] view of one entry in a [`SessionStore`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    store: Arc<SessionStore>,
    session_id: String,
    owner: Option<String>,
}

impl SessionHandle {
    /// The session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.session_id
    }
}

impl Session for SessionHandle {
    fn get(&self, key: &str) -> Option<String> {
        self.store.attribute(&self.session_id, key)
    }

    fn set(&self, key: &str, value: String) {
        match &self.owner {
            Some(owner) => self.store.write(&self.session_id, owner, key, value),
            None => debug!(key, "Ignoring write to an anonymous session"),
        }
    }
}
