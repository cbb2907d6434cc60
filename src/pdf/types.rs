//! Core types exchanged with the PDF engine

use image::RgbImage;

use crate::geometry::{PdfRect, Point, Size};

/// One word of extracted page text with its position in the text hierarchy
///
/// Indices follow the engine's structured text: `block` counts blocks on
/// the page, `line` counts lines inside the block and `word` counts words
/// inside the line.
#[derive(Clone, Debug, PartialEq)]
pub struct WordBox {
    /// Bounding box in PDF user space
    pub rect: PdfRect,
    pub text: String,
    pub block: usize,
    pub line: usize,
    pub word: usize,
}

impl WordBox {
    #[must_use]
    pub fn new(rect: PdfRect, text: impl Into<String>, block: usize, line: usize, word: usize) -> Self {
        Self {
            rect,
            text: text.into(),
            block,
            line,
            word,
        }
    }

    #[must_use]
    pub fn center(&self) -> Point {
        self.rect.center()
    }

    /// Whether both words sit on the same text line
    #[must_use]
    pub fn same_line(&self, other: &WordBox) -> bool {
        self.block == other.block && self.line == other.line
    }
}

/// Finalised text replacement for one page region
#[derive(Clone, Debug, PartialEq)]
pub struct PageEdit {
    pub page: usize,
    /// Region in PDF user space (top-left origin)
    pub rect: PdfRect,
    pub text: String,
}

/// Raw rendered page image.
///
/// RGB pixel data as produced by the rasterizer, before any fitting to
/// the preview area.
#[derive(Clone)]
pub struct ImageData {
    /// Raw RGB pixel data (3 bytes per pixel: R, G, B)
    pub pixels: Vec<u8>,
    /// Image width in pixels
    pub width_px: u32,
    /// Image height in pixels
    pub height_px: u32,
}

impl ImageData {
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width_px, self.height_px)
    }

    /// `None` when the buffer does not match the dimensions
    #[must_use]
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width_px, self.height_px, self.pixels.clone())
    }

    /// Solid white page of the given size
    #[must_use]
    pub fn blank(width_px: u32, height_px: u32) -> Self {
        Self {
            pixels: vec![0xFF; width_px as usize * height_px as usize * 3],
            width_px,
            height_px,
        }
    }
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}
