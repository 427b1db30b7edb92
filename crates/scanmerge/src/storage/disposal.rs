use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::SourceAction;
use crate::error::StorageError;

/// Move a directory tree from `src` to `dst`. Uses `rename` first, and falls
/// back to copy + remove when rename fails (cross-device moves).
fn move_directory(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    let to_error = |e: std::io::Error| StorageError::MoveDirectory {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    };

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| to_error(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| to_error(std::io::Error::other(e)))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(to_error)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(to_error)?;
        }
    }

    std::fs::remove_dir_all(src).map_err(to_error)?;
    Ok(())
}

/// What happens to a case's source images after its documents are recorded.
#[derive(Debug, Clone)]
pub struct SourceDisposer {
    image_root: PathBuf,
    backup_root: Option<PathBuf>,
    action: SourceAction,
}

impl SourceDisposer {
    pub fn new<P: AsRef<Path>>(
        image_root: P,
        backup_root: Option<PathBuf>,
        action: SourceAction,
    ) -> Self {
        Self {
            image_root: image_root.as_ref().to_path_buf(),
            backup_root,
            action,
        }
    }

    pub fn action(&self) -> SourceAction {
        self.action
    }

    /// Applies the configured action to `image_dir`.
    ///
    /// `Move` relocates the directory under the backup root, preserving its
    /// path relative to the image root. Returns the new location, if any.
    pub fn dispose(&self, image_dir: &Path) -> Result<Option<PathBuf>, StorageError> {
        match self.action {
            SourceAction::Keep => {
                log::debug!("Keeping source images at {}", image_dir.display());
                Ok(None)
            }
            SourceAction::Delete => {
                match std::fs::remove_dir_all(image_dir) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(StorageError::RemoveDirectory {
                            path: image_dir.to_path_buf(),
                            source: e,
                        })
                    }
                }
                log::debug!("Deleted source images at {}", image_dir.display());
                Ok(None)
            }
            SourceAction::Move => self.relocate(image_dir).map(Some),
        }
    }

    fn relocate(&self, image_dir: &Path) -> Result<PathBuf, StorageError> {
        let backup_root = self
            .backup_root
            .as_ref()
            .ok_or(StorageError::MissingBackupRoot)?;

        let relative =
            image_dir
                .strip_prefix(&self.image_root)
                .map_err(|_| StorageError::OutsideImageRoot {
                    path: image_dir.to_path_buf(),
                    root: self.image_root.clone(),
                })?;
        let destination = backup_root.join(relative);

        if std::fs::symlink_metadata(&destination).is_ok() {
            return Err(StorageError::DestinationExists(destination));
        }
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        move_directory(image_dir, &destination)?;
        log::debug!(
            "Moved source images {} -> {}",
            image_dir.display(),
            destination.display()
        );
        Ok(destination)
    }
}
