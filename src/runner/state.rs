// Run-state tracking
//
// One SQLite table of finished group ids so an interrupted batch
// resumes where it stopped instead of re-paying model time.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct RunState {
    conn: Arc<Mutex<Connection>>,
}

impl RunState {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open state db {}", path.display()))?;
        conn.execute_batch("CREATE TABLE IF NOT EXISTS done (gid TEXT PRIMARY KEY)")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn is_done(&self, gid: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached("SELECT 1 FROM done WHERE gid = ?1")?;
        Ok(stmt.exists(params![gid])?)
    }

    pub async fn mark_done(&self, gid: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute("INSERT OR IGNORE INTO done VALUES (?1)", params![gid])?;
        Ok(())
    }

    pub async fn done_count(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let count: usize = conn.query_row("SELECT COUNT(*) FROM done", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_mark_and_check() -> Result<()> {
        let dir = TempDir::new()?;
        let state = RunState::open(&dir.path().join("run_state.db"))?;

        assert!(!state.is_done("vision").await?);
        state.mark_done("vision").await?;
        assert!(state.is_done("vision").await?);
        assert_eq!(state.done_count().await?, 1);

        // marking twice is a no-op
        state.mark_done("vision").await?;
        assert_eq!(state.done_count().await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_state_survives_reopen() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("run_state.db");

        {
            let state = RunState::open(&path)?;
            state.mark_done("cash_flow").await?;
        }

        let state = RunState::open(&path)?;
        assert!(state.is_done("cash_flow").await?);
        Ok(())
    }
}
