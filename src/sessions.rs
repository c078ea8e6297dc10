//! In-memory session store with idle expiry
//!
//! Holds quiz flows, risk flows and chat sessions for the HTTP layer. Every
//! access stamps the entry and sweeps out entries idle longer than the TTL.

use crate::error::FinlitError;
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

struct SessionEntry<T> {
    touched_at: DateTime<Utc>,
    value: T,
}

pub struct SessionStore<T> {
    ttl: chrono::Duration,
    entries: Arc<RwLock<HashMap<Uuid, SessionEntry<T>>>>,
}

impl<T> Clone for SessionStore<T> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            entries: Arc::clone(&self.entries),
        }
    }
}

fn sweep<T>(entries: &mut HashMap<Uuid, SessionEntry<T>>, ttl: chrono::Duration, now: DateTime<Utc>) {
    let before = entries.len();
    entries.retain(|_, entry| now - entry.touched_at < ttl);
    let evicted = before - entries.len();
    if evicted > 0 {
        debug!(evicted, remaining = entries.len(), "Evicted idle sessions");
    }
}

impl<T> SessionStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1)),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, id: Uuid, value: T) {
        self.insert_at(id, value, Utc::now()).await;
    }

    pub async fn insert_at(&self, id: Uuid, value: T, now: DateTime<Utc>) {
        let mut entries = self.entries.write().await;
        sweep(&mut entries, self.ttl, now);
        entries.insert(
            id,
            SessionEntry {
                touched_at: now,
                value,
            },
        );
    }

    /// Run `f` on a live session; expired or unknown ids are `SessionNotFound`
    pub async fn with<R>(&self, id: Uuid, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        self.with_at(id, Utc::now(), f).await
    }

    pub async fn with_at<R>(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut T) -> Result<R>,
    ) -> Result<R> {
        let mut entries = self.entries.write().await;
        sweep(&mut entries, self.ttl, now);
        let entry = entries.get_mut(&id).ok_or(FinlitError::SessionNotFound(id))?;
        entry.touched_at = now;
        f(&mut entry.value)
    }

    /// Like `with`, creating the session first when it does not exist
    pub async fn with_or_insert<R>(
        &self,
        id: Uuid,
        create: impl FnOnce() -> T,
        f: impl FnOnce(&mut T) -> Result<R>,
    ) -> Result<R> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        sweep(&mut entries, self.ttl, now);
        let entry = entries.entry(id).or_insert_with(|| SessionEntry {
            touched_at: now,
            value: create(),
        });
        entry.touched_at = now;
        f(&mut entry.value)
    }

    pub async fn remove(&self, id: Uuid) -> Option<T> {
        self.entries.write().await.remove(&id).map(|entry| entry.value)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_access_refreshes_idle_timer() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        let t0 = Utc::now();
        store.insert_at(id, 1u32, t0).await;

        let t1 = t0 + chrono::Duration::seconds(50);
        store.with_at(id, t1, |v| { *v += 1; Ok(()) }).await.unwrap();

        // 100s after insert but only 50s after the last touch
        let t2 = t0 + chrono::Duration::seconds(100);
        assert_eq!(store.with_at(id, t2, |v| Ok(*v)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_swept() {
        let store = SessionStore::new(Duration::from_secs(60));
        let t0 = Utc::now();
        let stale = Uuid::new_v4();
        store.insert_at(stale, "old", t0).await;

        let later = t0 + chrono::Duration::seconds(61);
        let fresh = Uuid::new_v4();
        store.insert_at(fresh, "new", later).await;

        assert_eq!(store.len().await, 1);
        assert!(matches!(
            store.with_at(stale, later, |v| Ok(*v)).await,
            Err(FinlitError::SessionNotFound(id)) if id == stale
        ));
    }

    #[tokio::test]
    async fn test_with_or_insert_and_remove() {
        let store: SessionStore<Vec<&str>> = SessionStore::new(Duration::from_secs(60));
        let id = Uuid::new_v4();

        store.with_or_insert(id, Vec::new, |v| { v.push("a"); Ok(()) }).await.unwrap();
        store.with_or_insert(id, Vec::new, |v| { v.push("b"); Ok(()) }).await.unwrap();

        assert_eq!(store.remove(id).await, Some(vec!["a", "b"]));
        assert!(store.is_empty().await);
    }
}
