//! JSON-file source-of-record.
//!
//! The file holds an array of rows (`id`, `name`, `wins`, `losses`, `ties`,
//! `revision`). Every call re-reads the file, so several short-lived
//! processes can share it; writes go through a temporary file and a rename.
//! A missing file reads as an empty table.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use teamstats_core::{SourceError, Team, TeamId, TeamStatsResult};
use tokio::sync::Mutex;

use crate::source::{TeamRow, TeamSource, TeamTable};

/// [`TeamSource`] persisted as a JSON file.
#[derive(Debug)]
pub struct JsonFileTeamSource {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileTeamSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, e: std::io::Error) -> SourceError {
        SourceError::Io {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }

    async fn load(&self) -> TeamStatsResult<TeamTable> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TeamTable::default());
            }
            Err(e) => return Err(self.io_error(e).into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(TeamTable::default());
        }
        let rows: Vec<TeamRow> =
            serde_json::from_slice(&bytes).map_err(|e| SourceError::Corrupt {
                reason: format!("{}: {}", self.path.display(), e),
            })?;
        Ok(TeamTable::from_rows(rows)?)
    }

    async fn save(&self, table: &TeamTable) -> TeamStatsResult<()> {
        let bytes =
            serde_json::to_vec_pretty(&table.rows()).map_err(|e| SourceError::Corrupt {
                reason: e.to_string(),
            })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        Ok(())
    }

    async fn modify<T: Send>(
        &self,
        f: impl FnOnce(&mut TeamTable) -> Result<T, SourceError> + Send,
    ) -> TeamStatsResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.load().await?;
        let out = f(&mut table)?;
        self.save(&table).await?;
        tracing::debug!(path = %self.path.display(), "Source file written");
        Ok(out)
    }
}

#[async_trait]
impl TeamSource for JsonFileTeamSource {
    async fn load_all(&self) -> TeamStatsResult<Vec<Team>> {
        Ok(self.load().await?.load_all())
    }

    async fn get(&self, id: TeamId) -> TeamStatsResult<Option<Team>> {
        Ok(self.load().await?.get(id))
    }

    async fn revision(&self, id: TeamId) -> TeamStatsResult<Option<u64>> {
        Ok(self.load().await?.revision(id))
    }

    async fn insert(&self, team: Team) -> TeamStatsResult<u64> {
        self.modify(|table| table.insert(team)).await
    }

    async fn update(&self, team: Team, expected_revision: u64) -> TeamStatsResult<u64> {
        self.modify(|table| table.update(team, expected_revision))
            .await
    }

    async fn remove(&self, id: TeamId) -> TeamStatsResult<()> {
        self.modify(|table| table.remove(id)).await
    }

    async fn mutate(&self, teams: Vec<Team>) -> TeamStatsResult<()> {
        self.modify(|table| {
            table.mutate(teams);
            Ok(())
        })
        .await
    }

    async fn replace_all(&self, teams: Vec<Team>) -> TeamStatsResult<()> {
        self.modify(|table| table.replace_all(teams)).await
    }
}
