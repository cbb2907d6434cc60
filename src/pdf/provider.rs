//! Document provider contract
//!
//! The editor core only needs a handful of things from a PDF engine. The
//! MuPDF implementation lives in `document.rs`; tests use an in-memory
//! fake.

use std::path::Path;

use super::error::PdfError;
use super::types::{ImageData, WordBox};
use crate::geometry::PdfRect;

/// An open document, exclusively owned by the editor session
pub trait DocumentProvider {
    /// File the document was opened from
    fn path(&self) -> &Path;

    fn page_count(&self) -> usize;

    /// Page rectangle in PDF user space (top-left origin)
    fn page_rect(&self, page: usize) -> Result<PdfRect, PdfError>;

    /// Rasterize a page at `zoom` (1.0 = 72 dpi)
    fn render_page(&self, page: usize, zoom: f32) -> Result<ImageData, PdfError>;

    /// Word boxes in document order
    fn words(&self, page: usize) -> Result<Vec<WordBox>, PdfError>;

    /// Plain text of one page, one line per text line
    fn page_text(&self, page: usize) -> Result<String, PdfError>;
}

/// Opens documents by path. The session uses it to reload results of
/// merge and save operations.
pub trait DocumentOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn DocumentProvider>, PdfError>;
}

impl<F> DocumentOpener for F
where
    F: Fn(&Path) -> Result<Box<dyn DocumentProvider>, PdfError>,
{
    fn open(&self, path: &Path) -> Result<Box<dyn DocumentProvider>, PdfError> {
        self(path)
    }
}

/// Text of the whole document, pages separated by a newline
pub fn document_text(doc: &dyn DocumentProvider) -> Result<String, PdfError> {
    let mut texts = Vec::with_capacity(doc.page_count());
    for page in 0..doc.page_count() {
        texts.push(doc.page_text(page)?);
    }
    Ok(texts.join("\n"))
}
