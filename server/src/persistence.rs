// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage boundary for users and match records

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::record::MatchRecord;
use crate::{MatchId, UserId};

/// Stored profile of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub games_played: u32,
}

/// Whatever holds users and matches between process runs
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn load_user(&self, id: &str) -> Result<Option<UserRecord>>;

    async fn save_user(&self, user: &UserRecord) -> Result<()>;

    /// Every stored match, finished or not
    async fn load_all_matches(&self) -> Result<Vec<MatchRecord>>;

    /// Upsert by match id
    async fn store_match(&self, record: &MatchRecord) -> Result<()>;

    async fn store_all_matches(&self, records: &[MatchRecord]) -> Result<()> {
        for record in records {
            self.store_match(record).await?;
        }
        Ok(())
    }
}

/// Process-local store, used when no store directory is configured
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<UserId, UserRecord>>>,
    matches: Arc<RwLock<HashMap<MatchId, MatchRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn load_user(&self, id: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn save_user(&self, user: &UserRecord) -> Result<()> {
        self.users
            .write()
            .await
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn load_all_matches(&self) -> Result<Vec<MatchRecord>> {
        let mut records: Vec<_> = self.matches.read().await.values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn store_match(&self, record: &MatchRecord) -> Result<()> {
        self.matches
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
}

/// One pretty-printed JSON file per record under `users/` and `matches/`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `root`, creating the directory layout
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in ["users", "matches"] {
            let path = root.join(dir);
            tokio::fs::create_dir_all(&path)
                .await
                .with_context(|| format!("Failed to create store directory: {}", path.display()))?;
        }
        tracing::info!(path = ?root, "Opened match store");
        Ok(Self { root })
    }

    fn user_path(&self, id: &str) -> PathBuf {
        self.root.join("users").join(format!("{}.json", file_stem(id)))
    }

    fn match_path(&self, id: &str) -> PathBuf {
        self.root.join("matches").join(format!("{}.json", file_stem(id)))
    }
}

/// Keep ids from escaping the store directory
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Write via a temporary file and rename so readers never see a partial file
async fn write_json<T: Serialize + Sync>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize record")?;
    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, json)
        .await
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .with_context(|| format!("Failed to move record into place: {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl Persistence for JsonFileStore {
    async fn load_user(&self, id: &str) -> Result<Option<UserRecord>> {
        let path = self.user_path(id);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let user = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(user))
    }

    async fn save_user(&self, user: &UserRecord) -> Result<()> {
        write_json(&self.user_path(&user.id), user).await
    }

    async fn load_all_matches(&self) -> Result<Vec<MatchRecord>> {
        let dir = self.root.join("matches");
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to list {}", dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<MatchRecord>(&content) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(path = ?path, error = %e, "Skipping unreadable match record"),
            }
        }

        records.sort_by_key(|r| r.created_at);
        tracing::debug!(count = records.len(), "Loaded match records");
        Ok(records)
    }

    async fn store_match(&self, record: &MatchRecord) -> Result<()> {
        write_json(&self.match_path(&record.id), record).await?;
        tracing::debug!(match_id = %record.id, plies = record.history.len(), "Match stored");
        Ok(())
    }
}
