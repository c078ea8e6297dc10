//! Session-scoped news cache
//!
//! In-memory, keyed by language and category. Entries older than the TTL
//! are removed on the read that finds them.

use crate::models::{Language, NewsData};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

pub fn cache_key(language: Language, category: &str) -> String {
    format!("news_{}_{}", language.code(), category)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    news: NewsData,
}

#[derive(Clone)]
pub struct NewsCache {
    ttl: chrono::Duration,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl NewsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(15)),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, language: Language, category: &str) -> Option<NewsData> {
        self.get_at(language, category, Utc::now()).await
    }

    pub async fn get_at(
        &self,
        language: Language,
        category: &str,
        now: DateTime<Utc>,
    ) -> Option<NewsData> {
        let key = cache_key(language, category);

        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if now - entry.stored_at < self.ttl => return Some(entry.news.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        debug!(key = %key, "Evicting expired news entry");
        self.entries.write().await.remove(&key);
        None
    }

    pub async fn insert(&self, language: Language, category: &str, news: NewsData) {
        self.insert_at(language, category, news, Utc::now()).await;
    }

    pub async fn insert_at(
        &self,
        language: Language,
        category: &str,
        news: NewsData,
        stored_at: DateTime<Utc>,
    ) {
        let mut entries = self.entries.write().await;
        entries.insert(cache_key(language, category), CacheEntry { stored_at, news });
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
