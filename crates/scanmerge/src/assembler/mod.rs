//! Document assembly: one ordered image set in, one composite PDF out.

pub mod digest;
pub mod pdf;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AssembleError, StorageError};
use crate::storage::ShardAllocator;

pub use digest::{digest, Digests};
pub use pdf::{PageOutcome, PdfBuilder};

/// File extensions accepted as page images (compared case-insensitively).
pub const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "bmp"];

/// Which part of a case an image set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Outer = 1,
    Inner = 2,
}

impl Zone {
    /// Integer marker stored on the archival record.
    pub fn marker(self) -> i64 {
        self as i64
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Outer => write!(f, "outer"),
            Zone::Inner => write!(f, "inner"),
        }
    }
}

/// A persisted PDF built from one zone of a case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeDocument {
    pub document_id: String,
    pub case_id: String,
    pub zone: Zone,
    pub page_count: usize,
    pub size: u64,
    pub md5: String,
    pub sm3: String,
    pub storage_dir: PathBuf,
    pub file_path: PathBuf,
    pub shard: String,
    /// File names of images whose header could not be read.
    pub damaged: Vec<String>,
    pub assembled_at: String,
}

/// Builds composite documents into allocator-granted storage folders.
#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    allocator: Arc<ShardAllocator>,
}

impl DocumentAssembler {
    pub fn new(allocator: Arc<ShardAllocator>) -> Self {
        Self { allocator }
    }

    pub fn allocator(&self) -> &Arc<ShardAllocator> {
        &self.allocator
    }

    pub fn assemble(
        &self,
        case_id: &str,
        zone: Zone,
        image_dir: &Path,
    ) -> Result<CompositeDocument, AssembleError> {
        let _span = tracing::info_span!("assembler.assemble", case_id, zone = %zone).entered();

        let images = list_images(image_dir)?;
        if images.is_empty() {
            return Err(AssembleError::EmptyImageSet {
                path: image_dir.to_path_buf(),
            });
        }

        let document_id = Uuid::new_v4().to_string();
        let allocation = self.allocator.allocate(&document_id)?;
        std::fs::create_dir_all(&allocation.storage_dir).map_err(|e| {
            StorageError::CreateDirectory {
                path: allocation.storage_dir.clone(),
                source: e,
            }
        })?;

        let file_path = allocation.storage_dir.join(format!("{}.pdf", document_id));
        let rendered = render(&images, &file_path);
        let (page_count, damaged, bytes) = match rendered {
            Ok(rendered) => rendered,
            Err(e) => {
                // Not in the artifact index yet, so cleanup would never see it.
                if let Err(rm) = std::fs::remove_dir_all(&allocation.storage_dir) {
                    tracing::warn!(
                        path = %allocation.storage_dir.display(),
                        error = %rm,
                        "Failed to remove partial document folder"
                    );
                }
                return Err(e);
            }
        };
        let digests = digest(&bytes);

        tracing::info!(
            pages = page_count,
            damaged = damaged.len(),
            shard = %allocation.shard,
            path = %file_path.display(),
            "Composite document written"
        );

        Ok(CompositeDocument {
            document_id,
            case_id: case_id.to_string(),
            zone,
            page_count,
            size: bytes.len() as u64,
            md5: digests.md5,
            sm3: digests.sm3,
            storage_dir: allocation.storage_dir,
            file_path,
            shard: allocation.shard,
            damaged,
            assembled_at: crate::db::now_timestamp(),
        })
    }
}

/// Draws `images` into a PDF at `file_path` and reads the result back.
/// Returns the page count, the damaged file names and the written bytes.
fn render(
    images: &[PathBuf],
    file_path: &Path,
) -> Result<(usize, Vec<String>, Vec<u8>), AssembleError> {
    let mut builder = PdfBuilder::new();
    let mut damaged = Vec::new();
    for image in images {
        if builder.add_image(image)? == PageOutcome::Damaged {
            let name = file_name(image);
            tracing::warn!(image = %name, "Unreadable image skipped");
            damaged.push(name);
        }
    }
    let page_count = builder.page_count();

    builder.write_to(file_path)?;

    let bytes = std::fs::read(file_path).map_err(|e| AssembleError::ReadBack {
        path: file_path.to_path_buf(),
        source: e,
    })?;
    Ok((page_count, damaged, bytes))
}

/// Lists the page images directly inside `dir`, sorted by file name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, AssembleError> {
    let read_error = |e: std::io::Error| AssembleError::ReadDirectory {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if !entry.file_type().map_err(read_error)?.is_file() {
            continue;
        }
        let path = entry.path();
        if is_raster(&path) {
            images.push(path);
        }
    }

    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

fn is_raster(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            RASTER_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_image(path: &Path) {
        RgbImage::from_pixel(16, 24, Rgb([10, 120, 200]))
            .save(path)
            .unwrap();
    }

    fn assembler(root: &Path) -> DocumentAssembler {
        std::fs::create_dir_all(root).unwrap();
        DocumentAssembler::new(Arc::new(ShardAllocator::open(root, 10).unwrap()))
    }

    #[test]
    fn test_list_images_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        for name in ["b.JPG", "a.png", "c.tiff", "notes.txt", "d.bmp"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        std::fs::create_dir_all(dir.join("sub.jpg")).unwrap();

        let names: Vec<String> = list_images(dir).unwrap().iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.png", "b.JPG", "c.tiff", "d.bmp"]);
    }

    #[test]
    fn test_list_images_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = list_images(&temp_dir.path().join("nope"));
        assert!(matches!(result, Err(AssembleError::ReadDirectory { .. })));
    }

    #[test]
    fn test_assemble_counts_damaged() {
        let temp_dir = TempDir::new().unwrap();
        let images = temp_dir.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        write_image(&images.join("001.jpg"));
        write_image(&images.join("002.png"));
        std::fs::write(images.join("003.jpg"), b"garbage").unwrap();

        let assembler = assembler(&temp_dir.path().join("pdf"));
        let doc = assembler.assemble("c1", Zone::Outer, &images).unwrap();

        assert_eq!(doc.page_count, 2);
        assert_eq!(doc.damaged, vec!["003.jpg"]);
        assert_eq!(doc.shard, "00000");
        assert_eq!(doc.zone.marker(), 1);
        assert!(doc.file_path.exists());
        assert_eq!(
            doc.file_path,
            doc.storage_dir.join(format!("{}.pdf", doc.document_id))
        );

        let bytes = std::fs::read(&doc.file_path).unwrap();
        assert_eq!(doc.size, bytes.len() as u64);
        assert_eq!(doc.md5, digest(&bytes).md5);
        assert_eq!(doc.sm3.len(), 64);
    }

    #[test]
    fn test_empty_set_allocates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let images = temp_dir.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("readme.txt"), b"x").unwrap();

        let pdf_root = temp_dir.path().join("pdf");
        let assembler = assembler(&pdf_root);
        let err = assembler.assemble("c1", Zone::Inner, &images).unwrap_err();

        assert!(err.is_empty_image_set());
        assert_eq!(std::fs::read_dir(&pdf_root).unwrap().count(), 0);
        assert_eq!(assembler.allocator().snapshot().unwrap().folder_count, 0);
    }

    #[test]
    fn test_all_damaged_yields_empty_document() {
        let temp_dir = TempDir::new().unwrap();
        let images = temp_dir.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("1.jpg"), b"bad").unwrap();

        let assembler = assembler(&temp_dir.path().join("pdf"));
        let doc = assembler.assemble("c1", Zone::Outer, &images).unwrap();
        assert_eq!(doc.page_count, 0);
        assert_eq!(doc.damaged.len(), 1);
    }
}
