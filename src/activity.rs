//! User action logging
//!
//! Every action goes to tracing under the `user_action` target and into an
//! in-memory log whose records carry a SHA256 fingerprint.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Emit a structured user action event
pub fn log_user_action(action: &str, details: &Value) {
    info!(target: "user_action", action, details = %details, "[USER ACTION]");
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub details: Value,
    pub fingerprint: String,
}

#[derive(Serialize)]
struct Fingerprinted<'a> {
    timestamp: &'a DateTime<Utc>,
    action: &'a str,
    details: &'a Value,
}

#[derive(Clone)]
pub struct ActivityLog {
    records: Arc<RwLock<HashMap<Uuid, ActivityRecord>>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Log and store an action
    pub async fn record(&self, action: &str, details: Value) -> Uuid {
        log_user_action(action, &details);

        let timestamp = Utc::now();
        let record = ActivityRecord {
            id: Uuid::new_v4(),
            fingerprint: compute_fingerprint(&timestamp, action, &details),
            timestamp,
            action: action.to_string(),
            details,
        };

        let id = record.id;
        self.records.write().await.insert(id, record);
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<ActivityRecord> {
        self.records.read().await.get(&id).cloned()
    }

    /// Most recent records first
    pub async fn recent(&self, limit: usize) -> Vec<ActivityRecord> {
        let records = self.records.read().await;
        let mut items: Vec<ActivityRecord> = records.values().cloned().collect();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        items.truncate(limit);
        items
    }

    pub async fn verify_integrity(&self, id: Uuid) -> bool {
        let records = self.records.read().await;
        records.get(&id).is_some_and(|record| {
            compute_fingerprint(&record.timestamp, &record.action, &record.details)
                == record.fingerprint
        })
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA256 over the record's JSON form, streamed into the hasher
pub fn compute_fingerprint(timestamp: &DateTime<Utc>, action: &str, details: &Value) -> String {
    let mut hasher = Sha256::new();
    let payload = Fingerprinted {
        timestamp,
        action,
        details,
    };

    if serde_json::to_writer(&mut HashWriter(&mut hasher), &payload).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
