//! Checkpoint storage
//!
//! After every transition the router saves the session's snapshot before
//! running the next step. Loading that snapshot later lets the pending
//! step run again with nothing lost. Credentials are never part of it.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::Phase;
use crate::state::{ConversationState, Next};

/// One entry of the routing trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRecord {
    pub next: Next,
    pub reasoning: String,
}

/// A session snapshot taken between steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub session_id: String,
    /// Increases by one with every save
    pub sequence: u64,
    /// The step to run next
    pub pending: Phase,
    /// EXECUTE steps run so far in the current turn
    pub hops: u32,
    pub state: ConversationState,
    #[serde(default)]
    pub trail: Vec<RoutingRecord>,
}

impl Checkpoint {
    /// The snapshot of a session that has never run.
    pub fn initial(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            sequence: 0,
            pending: Phase::Terminal,
            hops: 0,
            state: ConversationState::default(),
            trail: Vec::new(),
        }
    }
}

/// Where checkpoints live.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// The latest checkpoint for `session_id`, if any.
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>>;

    /// Replace the stored checkpoint for `checkpoint.session_id`.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Forget a session. Deleting an unknown session is not an error.
    async fn delete(&self, session_id: &str) -> Result<()>;
}

/// Keeps checkpoints in process memory.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    checkpoints: Mutex<HashMap<String, Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saves seen for `session_id`'s current checkpoint.
    pub fn sequence(&self, session_id: &str) -> Option<u64> {
        self.lock().get(session_id).map(|c| c.sequence)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Checkpoint>> {
        self.checkpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.lock().get(session_id).cloned())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.lock()
            .insert(checkpoint.session_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.lock().remove(session_id);
        Ok(())
    }
}

/// One JSON file per session under a directory.
///
/// Writes go to a temp file that is renamed over the target while an
/// exclusive lock is held on `<session>.lock`; reads take a shared lock.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the checkpoint file for `session_id`.
    pub fn path_for(&self, session_id: &str) -> Result<PathBuf> {
        validate_session_id(session_id)?;
        Ok(self.dir.join(format!("{session_id}.json")))
    }

    /// Ids of every stored session, sorted.
    pub fn sessions(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                ids.push(stem.to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn lock_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.lock"))
    }

    fn open_lock(&self, session_id: &str) -> Result<File> {
        let path = self.lock_path(session_id);
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| store_error(&path, e))
    }

    fn load_blocking(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let path = self.path_for(session_id)?;
        if !path.exists() {
            return Ok(None);
        }

        let lock = self.open_lock(session_id)?;
        lock.lock_shared().map_err(|e| store_error(&path, e))?;

        let mut content = String::new();
        match File::open(&path) {
            Ok(mut file) => {
                file.read_to_string(&mut content)
                    .map_err(|e| store_error(&path, e))?;
            }
            // Deleted between the existence check and the lock
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(store_error(&path, e)),
        }

        let checkpoint = serde_json::from_str(&content).map_err(|e| store_error(&path, e))?;
        Ok(Some(checkpoint))
    }

    fn save_blocking(&self, checkpoint: &Checkpoint) -> Result<()> {
        let path = self.path_for(&checkpoint.session_id)?;
        fs::create_dir_all(&self.dir).map_err(|e| store_error(&self.dir, e))?;
        let content = serde_json::to_string_pretty(checkpoint)?;

        let lock = self.open_lock(&checkpoint.session_id)?;
        lock.lock_exclusive().map_err(|e| store_error(&path, e))?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| store_error(&temp_path, e))?;
        fs::rename(&temp_path, &path).map_err(|e| store_error(&path, e))?;

        // Lock released when `lock` is dropped
        Ok(())
    }

    fn delete_blocking(&self, session_id: &str) -> Result<()> {
        let path = self.path_for(session_id)?;
        if !self.dir.exists() {
            return Ok(());
        }

        let lock = self.open_lock(session_id)?;
        lock.lock_exclusive().map_err(|e| store_error(&path, e))?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(store_error(&path, e)),
        }
        drop(lock);

        let lock_path = self.lock_path(session_id);
        if let Err(e) = fs::remove_file(&lock_path) {
            tracing::debug!(path = %lock_path.display(), error = %e, "Lock file not removed");
        }
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let store = self.clone();
        let session_id = session_id.to_string();
        run_blocking(move || store.load_blocking(&session_id)).await
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let store = self.clone();
        let checkpoint = checkpoint.clone();
        run_blocking(move || store.save_blocking(&checkpoint)).await
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let store = self.clone();
        let session_id = session_id.to_string();
        run_blocking(move || store.delete_blocking(&session_id)).await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

fn store_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Checkpoint {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Session ids are used as file names: ASCII letters, digits, `-`, `_`, `.`,
/// not starting with a dot.
pub fn validate_session_id(session_id: &str) -> Result<()> {
    let valid = !session_id.is_empty()
        && session_id.len() <= 128
        && !session_id.starts_with('.')
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidSessionId(session_id.to_string()))
    }
}
