#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use quickdrop::config::DropsConfig;
use quickdrop::db::Database;
use quickdrop::models::NewDropItem;
use quickdrop::storage::LocalStorage;
use tempfile::TempDir;

/// In-memory database plus a tempdir-backed blob store.
pub struct TestEnv {
    pub db: Database,
    pub storage: Arc<LocalStorage>,
    pub policy: DropsConfig,
    // Keeps the blob root alive for the duration of the test
    _storage_root: TempDir,
}

pub async fn setup() -> TestEnv {
    let db = Database::open_in_memory().await.unwrap();
    let storage_root = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(storage_root.path()));

    TestEnv {
        db,
        storage,
        policy: DropsConfig::default(),
        _storage_root: storage_root,
    }
}

pub fn item(path: &str, context: Option<&str>, content: &[u8]) -> NewDropItem {
    NewDropItem {
        relative_path: path.to_string(),
        item_context: context.map(|s| s.to_string()),
        bytes: Bytes::copy_from_slice(content),
    }
}

/// An expiry timestamp safely in the past.
pub fn past_expiry() -> DateTime<Utc> {
    Utc::now() - Duration::hours(1)
}
