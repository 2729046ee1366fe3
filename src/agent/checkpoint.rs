//! Checkpoint storage for graph runs
//!
//! A checkpoint is the full message list of a thread plus the node the graph
//! would run next. Saving one after every completed node lets a conversation
//! resume by thread id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::graph::Node;
use super::types::Message;
use crate::error::{Error, Result};

/// Stored state of one thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Conversation thread
    pub thread_id: String,
    /// Completed nodes so far
    pub step: u64,
    /// Node to run on resume
    pub next: Node,
    /// Message list after `step` nodes
    pub messages: Vec<Message>,
    /// Time of the save
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Build a checkpoint stamped with the current time
    pub fn new(thread_id: impl Into<String>, step: u64, next: Node, messages: Vec<Message>) -> Self {
        Checkpoint {
            thread_id: thread_id.into(),
            step,
            next,
            messages,
            updated_at: Utc::now(),
        }
    }
}

/// Persistent store of checkpoints keyed by thread id
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Latest checkpoint of a thread, if any
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// Replace the thread's checkpoint
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Forget a thread
    async fn delete(&self, thread_id: &str) -> Result<()>;
}

/// In-process checkpointer; lost when the process exits
#[derive(Default)]
pub struct MemoryCheckpointer {
    threads: RwLock<HashMap<String, Checkpoint>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.threads
            .write()
            .await
            .insert(checkpoint.thread_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        self.threads.write().await.remove(thread_id);
        Ok(())
    }
}

/// SQLite-backed checkpointer
pub struct SqliteCheckpointer {
    pool: SqlitePool,
}

impl SqliteCheckpointer {
    /// Open (creating if needed) a checkpoint database file
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        info!("Opening checkpoint database at {}", path.display());

        let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
        Self::connect(options, 4).await
    }

    /// A private in-memory database, gone when dropped
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // every connection to :memory: is its own database
        Self::connect(options, 1).await
    }

    async fn connect(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let checkpointer = SqliteCheckpointer { pool };
        checkpointer.migrate().await?;
        Ok(checkpointer)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT PRIMARY KEY,
                step INTEGER NOT NULL,
                next TEXT NOT NULL,
                messages TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let row: Option<(i64, String, String, String)> = sqlx::query_as(
            "SELECT step, next, messages, updated_at FROM checkpoints WHERE thread_id = ?",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((step, next, messages, updated_at)) = row else {
            return Ok(None);
        };

        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| Error::Checkpoint(format!("Bad timestamp for thread {}: {}", thread_id, e)))?
            .with_timezone(&Utc);

        Ok(Some(Checkpoint {
            thread_id: thread_id.to_string(),
            step: u64::try_from(step)
                .map_err(|_| Error::Checkpoint(format!("Negative step for thread {}", thread_id)))?,
            next: next.parse()?,
            messages: serde_json::from_str(&messages)?,
            updated_at,
        }))
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let step = i64::try_from(checkpoint.step)
            .map_err(|_| Error::Checkpoint("Step counter overflow".to_string()))?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO checkpoints (thread_id, step, next, messages, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&checkpoint.thread_id)
        .bind(step)
        .bind(checkpoint.next.as_str())
        .bind(serde_json::to_string(&checkpoint.messages)?)
        .bind(checkpoint.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(
            "Saved checkpoint thread={} step={} next={}",
            checkpoint.thread_id, checkpoint.step, checkpoint.next
        );
        Ok(())
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM checkpoints WHERE thread_id = ?")
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolCall;
    use serde_json::json;

    fn sample(thread: &str, step: u64) -> Checkpoint {
        Checkpoint::new(
            thread,
            step,
            Node::Tools,
            vec![
                Message::user("où est foo?"),
                Message::assistant_with_tool_calls(
                    "",
                    vec![ToolCall::new("c1", "find_definitions", json!({"tags_to_find": ["foo"]}))],
                ),
            ],
        )
    }

    async fn exercise(store: &dyn Checkpointer) {
        assert!(store.load("t1").await.unwrap().is_none());

        let first = sample("t1", 1);
        store.save(&first).await.unwrap();
        let loaded = store.load("t1").await.unwrap().unwrap();
        assert_eq!(loaded.step, 1);
        assert_eq!(loaded.next, Node::Tools);
        assert_eq!(loaded.messages, first.messages);

        let mut second = sample("t1", 2);
        second.next = Node::Agent;
        store.save(&second).await.unwrap();
        let loaded = store.load("t1").await.unwrap().unwrap();
        assert_eq!(loaded.step, 2);
        assert_eq!(loaded.next, Node::Agent);

        assert!(store.load("t2").await.unwrap().is_none());

        store.delete("t1").await.unwrap();
        assert!(store.load("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_checkpointer() {
        exercise(&MemoryCheckpointer::new()).await;
    }

    #[tokio::test]
    async fn test_sqlite_in_memory() {
        exercise(&SqliteCheckpointer::in_memory().await.unwrap()).await;
    }

    #[tokio::test]
    async fn test_sqlite_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("checkpoints.db");

        {
            let store = SqliteCheckpointer::open(&path).await.unwrap();
            store.save(&sample("resume", 3)).await.unwrap();
        }

        let store = SqliteCheckpointer::open(&path).await.unwrap();
        let loaded = store.load("resume").await.unwrap().unwrap();
        assert_eq!(loaded.step, 3);
        assert_eq!(loaded.messages[0].content, "où est foo?");
    }
}
