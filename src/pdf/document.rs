//! MuPDF-backed document provider

use std::path::{Path, PathBuf};

use log::debug;
use mupdf::text_page::TextBlockType;
use mupdf::{Colorspace, Document, Matrix, Page, Pixmap, Quad, TextPageFlags};

use super::error::PdfError;
use super::provider::{DocumentProvider, DocumentOpener};
use super::types::{ImageData, WordBox};
use crate::geometry::PdfRect;

pub struct MupdfDocument {
    doc: Document,
    path: PathBuf,
    page_count: usize,
}

impl MupdfDocument {
    pub fn open(path: &Path) -> Result<Self, PdfError> {
        let doc = Document::open(path.to_string_lossy().as_ref())?;
        let page_count = usize::try_from(doc.page_count()?).unwrap_or(0);
        debug!("Opened {path:?} with {page_count} pages");
        Ok(Self {
            doc,
            path: path.to_path_buf(),
            page_count,
        })
    }

    fn load(&self, page: usize) -> Result<Page, PdfError> {
        PdfError::check_page(page, self.page_count)?;
        Ok(self.doc.load_page(page as i32)?)
    }
}

/// [`DocumentOpener`] for files on disk
pub fn open_document(path: &Path) -> Result<Box<dyn DocumentProvider>, PdfError> {
    Ok(Box::new(MupdfDocument::open(path)?))
}

/// Opener value for callers that want a trait object
pub fn mupdf_opener() -> Box<dyn DocumentOpener> {
    Box::new(open_document)
}

impl DocumentProvider for MupdfDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_rect(&self, page: usize) -> Result<PdfRect, PdfError> {
        let bounds = self.load(page)?.bounds()?;
        Ok(PdfRect::new(
            f64::from(bounds.x0),
            f64::from(bounds.y0),
            f64::from(bounds.x1),
            f64::from(bounds.y1),
        ))
    }

    fn render_page(&self, page: usize, zoom: f32) -> Result<ImageData, PdfError> {
        let page = self.load(page)?;
        let transform = Matrix::new_scale(zoom, zoom);
        let rgb = Colorspace::device_rgb();
        let pixmap = page.to_pixmap(&transform, &rgb, false, false)?;
        let pixels = pixmap_to_rgb(&pixmap)?;

        Ok(ImageData {
            pixels,
            width_px: pixmap.width(),
            height_px: pixmap.height(),
        })
    }

    fn words(&self, page: usize) -> Result<Vec<WordBox>, PdfError> {
        let page = self.load(page)?;
        let text_page = page.to_text_page(TextPageFlags::empty())?;
        let mut words = Vec::new();

        for (block_no, block) in text_page.blocks().enumerate() {
            if block.r#type() != TextBlockType::Text {
                continue;
            }
            for (line_no, line) in block.lines().enumerate() {
                let mut pending = PendingWord::new(block_no, line_no);
                for ch in line.chars() {
                    match ch.char() {
                        Some(c) if !c.is_whitespace() => pending.push(c, quad_rect(&ch.quad())),
                        _ => pending.flush(&mut words),
                    }
                }
                pending.flush(&mut words);
            }
        }

        Ok(words)
    }

    fn page_text(&self, page: usize) -> Result<String, PdfError> {
        let page = self.load(page)?;
        let text_page = page.to_text_page(TextPageFlags::empty())?;
        let mut text = String::new();

        for block in text_page.blocks() {
            if block.r#type() != TextBlockType::Text {
                continue;
            }
            for line in block.lines() {
                text.extend(line.chars().filter_map(|ch| ch.char()));
                text.push('\n');
            }
        }

        Ok(text)
    }
}

/// Characters of the word currently being collected on one line
struct PendingWord {
    block: usize,
    line: usize,
    next_word: usize,
    text: String,
    rect: Option<PdfRect>,
}

impl PendingWord {
    fn new(block: usize, line: usize) -> Self {
        Self {
            block,
            line,
            next_word: 0,
            text: String::new(),
            rect: None,
        }
    }

    fn push(&mut self, c: char, rect: PdfRect) {
        self.text.push(c);
        self.rect = Some(match self.rect {
            Some(r) => r.union(&rect),
            None => rect,
        });
    }

    fn flush(&mut self, out: &mut Vec<WordBox>) {
        if let Some(rect) = self.rect.take() {
            out.push(WordBox::new(
                rect,
                std::mem::take(&mut self.text),
                self.block,
                self.line,
                self.next_word,
            ));
            self.next_word += 1;
        }
        self.text.clear();
    }
}

fn quad_rect(quad: &Quad) -> PdfRect {
    let xs = [quad.ul.x, quad.ur.x, quad.ll.x, quad.lr.x];
    let ys = [quad.ul.y, quad.ur.y, quad.ll.y, quad.lr.y];
    let min = |v: &[f32]| v.iter().copied().fold(f32::INFINITY, f32::min);
    let max = |v: &[f32]| v.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    PdfRect::new(
        f64::from(min(&xs)),
        f64::from(min(&ys)),
        f64::from(max(&xs)),
        f64::from(max(&ys)),
    )
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, PdfError> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(PdfError::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err(PdfError::generic("Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(out)
}
