//! One-image-per-page PDF writer.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::path::Path;

use image::codecs::jpeg::JpegDecoder;
use image::{ExtendedColorType, ImageDecoder, ImageFormat, ImageReader};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::AssembleError;

/// Result of offering one image to the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Drawn,
    /// The header could not be probed; no page was emitted.
    Damaged,
}

/// Accumulates image pages and writes them out as one document.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Appends a page sized to the image's pixel dimensions.
    ///
    /// Failing to open the file or to embed a probed image is an error.
    /// An image whose dimensions cannot be probed is reported as damaged.
    pub fn add_image(&mut self, path: &Path) -> Result<PageOutcome, AssembleError> {
        let file = File::open(path).map_err(|e| AssembleError::OpenImage {
            path: path.to_path_buf(),
            source: e,
        })?;

        let Some((width, height)) = probe_dimensions(file) else {
            return Ok(PageOutcome::Damaged);
        };

        let image = embed_image(path, width, height)?;
        self.push_page(image, width, height);
        Ok(PageOutcome::Drawn)
    }

    fn push_page(&mut self, image: Stream, width: u32, height: u32) {
        let image_id = self.doc.add_object(image);

        let content = format!("q\n{} 0 0 {} 0 0 cm\n/Im0 Do\nQ\n", width, height);
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (width as i64).into(), (height as i64).into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
            "Contents" => content_id,
        });
        self.kids.push(page_id.into());
    }

    /// Writes the document to `path`. A builder with no pages still produces
    /// a valid, empty document.
    pub fn write_to(mut self, path: &Path) -> Result<(), AssembleError> {
        let to_error = |reason: String| AssembleError::WritePdf {
            path: path.to_path_buf(),
            reason,
        };

        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let file = File::create(path).map_err(|e| to_error(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        self.doc
            .save_to(&mut writer)
            .map_err(|e| to_error(e.to_string()))?;
        writer.flush().map_err(|e| to_error(e.to_string()))?;
        Ok(())
    }
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads pixel dimensions from the header, sniffing the format from content.
fn probe_dimensions(file: File) -> Option<(u32, u32)> {
    ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Builds the image XObject. Gray and RGB JPEG data is embedded as-is;
/// everything else is decoded to 8-bit RGB and Flate-compressed.
fn embed_image(path: &Path, width: u32, height: u32) -> Result<Stream, AssembleError> {
    let draw_error = |reason: String| AssembleError::DrawImage {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = std::fs::read(path).map_err(|e| draw_error(e.to_string()))?;

    if image::guess_format(&bytes).ok() == Some(ImageFormat::Jpeg) {
        if let Some(color_space) = jpeg_color_space(&bytes) {
            return Ok(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => color_space,
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                bytes,
            ));
        }
    }

    let rgb = image::load_from_memory(&bytes)
        .map_err(|e| draw_error(e.to_string()))?
        .to_rgb8();
    let mut stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => rgb.width() as i64,
            "Height" => rgb.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    );
    stream.compress().map_err(|e| draw_error(e.to_string()))?;
    Ok(stream)
}

fn jpeg_color_space(bytes: &[u8]) -> Option<&'static str> {
    let decoder = JpegDecoder::new(Cursor::new(bytes)).ok()?;
    match decoder.original_color_type() {
        ExtendedColorType::L8 => Some("DeviceGray"),
        ExtendedColorType::Rgb8 => Some("DeviceRGB"),
        _ => None,
    }
}
