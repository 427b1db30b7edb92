//! Capacity-bounded shard allocation for document folders.
//!
//! Documents live at `<root>/<shard>/source/<document_id>/`, where `<shard>`
//! is a five-digit zero-padded counter. Each shard holds at most
//! `max_per_dir` document folders; the allocator rolls over to the next
//! shard before handing out a path that would exceed the bound.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageError;

/// Name of the directory under each shard that holds document folders.
pub const SOURCE_DIR: &str = "source";

/// Renders a shard number as its directory name.
pub fn shard_name(number: u64) -> String {
    format!("{:05}", number)
}

/// Mutable allocator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardState {
    pub current: u64,
    pub folder_count: usize,
}

/// A granted storage location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub storage_dir: PathBuf,
    pub shard: String,
}

/// Point-in-time view of the allocator, for progress reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSnapshot {
    pub shard: String,
    pub folder_count: usize,
    pub capacity: usize,
}

/// Hands out storage directories across numbered shards.
///
/// Shared between workers behind an `Arc`; the lock is held only while the
/// next path is computed, never while touching the filesystem.
#[derive(Debug)]
pub struct ShardAllocator {
    root: PathBuf,
    max_per_dir: usize,
    state: Mutex<ShardState>,
}

impl ShardAllocator {
    /// Reconstructs allocator state from the directories under `root`.
    ///
    /// The highest numeric shard is resumed with its observed folder count,
    /// or the next shard is started when it is already full. An empty root
    /// starts at shard `00000`.
    pub fn open<P: AsRef<Path>>(root: P, max_per_dir: usize) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        let max_per_dir = max_per_dir.max(1);

        let state = match highest_shard(&root)? {
            None => ShardState {
                current: 0,
                folder_count: 0,
            },
            Some(number) => {
                let occupied = count_folders(&root.join(shard_name(number)).join(SOURCE_DIR))?;
                if occupied >= max_per_dir {
                    ShardState {
                        current: number + 1,
                        folder_count: 0,
                    }
                } else {
                    ShardState {
                        current: number,
                        folder_count: occupied,
                    }
                }
            }
        };

        log::info!(
            "Shard allocator at {}: resuming shard {} with {}/{} folders",
            root.display(),
            shard_name(state.current),
            state.folder_count,
            max_per_dir
        );

        Ok(Self {
            root,
            max_per_dir,
            state: Mutex::new(state),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn capacity(&self) -> usize {
        self.max_per_dir
    }

    /// Grants a storage directory for `document_id`. The directory is not
    /// created here.
    pub fn allocate(&self, document_id: &str) -> Result<Allocation, StorageError> {
        let shard = {
            let mut state = self.state.lock().map_err(|_| StorageError::LockPoisoned)?;
            if state.folder_count >= self.max_per_dir {
                state.current += 1;
                state.folder_count = 0;
                log::info!("Rolled over to shard {}", shard_name(state.current));
            }
            state.folder_count += 1;
            shard_name(state.current)
        };

        let storage_dir = self.root.join(&shard).join(SOURCE_DIR).join(document_id);
        Ok(Allocation { storage_dir, shard })
    }

    pub fn snapshot(&self) -> Result<ShardSnapshot, StorageError> {
        let state = self.state.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(ShardSnapshot {
            shard: shard_name(state.current),
            folder_count: state.folder_count,
            capacity: self.max_per_dir,
        })
    }
}

/// Largest directory name under `root` made only of ASCII digits.
fn highest_shard(root: &Path) -> Result<Option<u64>, StorageError> {
    let entries = std::fs::read_dir(root).map_err(|e| StorageError::ReadRoot {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut highest = None;
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::ReadRoot {
            path: root.to_path_buf(),
            source: e,
        })?;
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(number) = name.parse::<u64>() {
            highest = highest.max(Some(number));
        }
    }
    Ok(highest)
}

/// Counts subdirectories of a shard's `source` directory; missing counts as 0.
fn count_folders(source: &Path) -> Result<usize, StorageError> {
    let entries = match std::fs::read_dir(source) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(StorageError::ReadShard {
                path: source.to_path_buf(),
                source: e,
            })
        }
    };

    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::ReadShard {
            path: source.to_path_buf(),
            source: e,
        })?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            count += 1;
        }
    }
    Ok(count)
}
