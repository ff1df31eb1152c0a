//! Process-wide session storage and the inactivity sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::domain::{ChatRef, Session, UserId};
use super::outbound::ChatGateway;
use super::views;
use crate::config::SessionConfig;

/// Mapping from user identity to conversation state. Individual operations
/// are atomic; the engine never holds the lock across an await point.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<UserId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: UserId) -> Option<Session> {
        let guard = self.inner.lock().expect("session mutex poisoned");
        guard.get(&user).cloned()
    }

    pub fn set(&self, user: UserId, session: Session) {
        let mut guard = self.inner.lock().expect("session mutex poisoned");
        guard.insert(user, session);
    }

    pub fn remove(&self, user: UserId) {
        let mut guard = self.inner.lock().expect("session mutex poisoned");
        guard.remove(&user);
    }

    /// Refreshes the activity timestamp and chat reference of an existing
    /// session; absent sessions are not created.
    pub fn touch(&self, user: UserId, chat: ChatRef, now: DateTime<Utc>) {
        let mut guard = self.inner.lock().expect("session mutex poisoned");
        if let Some(session) = guard.get_mut(&user) {
            session.last_activity = now;
            session.chat = chat;
        }
    }

    /// Removes the session only if it is still stale at `cutoff`; a
    /// transition that touched it mid-sweep wins.
    pub fn remove_if_stale(&self, user: UserId, cutoff: DateTime<Utc>) -> bool {
        let mut guard = self.inner.lock().expect("session mutex poisoned");
        match guard.get(&user) {
            Some(session) if session.last_activity < cutoff => {
                guard.remove(&user);
                true
            }
            _ => false,
        }
    }

    /// Users whose last activity predates `cutoff`, with the chat to notify.
    pub fn expired_before(&self, cutoff: DateTime<Utc>) -> Vec<(UserId, ChatRef)> {
        let guard = self.inner.lock().expect("session mutex poisoned");
        guard
            .iter()
            .filter(|(_, session)| session.last_activity < cutoff)
            .map(|(user, session)| (*user, session.chat))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("session mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One sweep pass: purges sessions idle longer than `window`, attempting a
/// single expiry notice per session. The cutoff is computed from `now`
/// taken before any sending, so sessions touched mid-sweep survive.
/// Returns the number of purged sessions.
pub async fn sweep_once<T>(
    store: &SessionStore,
    gateway: &T,
    window: Duration,
    now: DateTime<Utc>,
) -> usize
where
    T: ChatGateway + ?Sized,
{
    let cutoff = now - window;
    let mut purged = 0;

    for (user, chat) in store.expired_before(cutoff) {
        if !store.remove_if_stale(user, cutoff) {
            continue;
        }
        purged += 1;
        if let Err(error) = gateway.send(chat, views::expiry_notice()).await {
            warn!(user = user.0, %error, "expiry notice delivery failed");
        }
    }

    purged
}

/// Background loop driving [`sweep_once`] on the configured interval.
pub async fn run_sweeper<T>(store: Arc<SessionStore>, gateway: Arc<T>, config: SessionConfig)
where
    T: ChatGateway + ?Sized,
{
    let window = config.inactivity_window();
    let mut ticker = tokio::time::interval(config.sweep_interval());
    // The first tick fires immediately; harmless, the store is empty then.
    loop {
        ticker.tick().await;
        let purged = sweep_once(store.as_ref(), gateway.as_ref(), window, Utc::now()).await;
        if purged > 0 {
            info!(purged, "expired idle sessions");
        }
    }
}
