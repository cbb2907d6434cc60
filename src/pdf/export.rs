//! Page image and text export

use std::path::Path;

use image::{ImageFormat, RgbImage, imageops};
use log::{debug, info};

use super::error::PdfError;
use super::provider::DocumentProvider;

/// JPEG for `.jpg`/`.jpeg`, PNG for anything else
pub fn image_format_for(path: &Path) -> ImageFormat {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => ImageFormat::Jpeg,
        _ => ImageFormat::Png,
    }
}

/// Render `page` at `zoom` and write it to `path`
pub fn save_page_image(
    doc: &dyn DocumentProvider,
    page: usize,
    path: &Path,
    zoom: f32,
) -> Result<(), PdfError> {
    PdfError::check_page(page, doc.page_count())?;

    let data = doc.render_page(page, zoom)?;
    let image = data
        .to_rgb_image()
        .ok_or_else(|| PdfError::generic("Rendered page buffer does not match its size"))?;
    image.save_with_format(path, image_format_for(path))?;

    info!(
        "Exported page {} of {:?} to {path:?} ({}x{})",
        page + 1,
        doc.path(),
        data.width_px,
        data.height_px
    );
    Ok(())
}

/// Render every page at `zoom`, scaling pages wider than `max_width` down
/// to that width with their aspect ratio kept.
pub fn render_page_previews(
    doc: &dyn DocumentProvider,
    zoom: f32,
    max_width: u32,
) -> Result<Vec<RgbImage>, PdfError> {
    (0..doc.page_count())
        .map(|page| {
            let image = doc
                .render_page(page, zoom)?
                .to_rgb_image()
                .ok_or_else(|| PdfError::generic("Rendered page buffer does not match its size"))?;
            Ok(shrink_to_width(image, max_width))
        })
        .collect()
}

fn shrink_to_width(image: RgbImage, max_width: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    if width <= max_width || max_width == 0 {
        return image;
    }
    let ratio = f64::from(max_width) / f64::from(width);
    let new_height = ((f64::from(height) * ratio) as u32).max(1);
    debug!("Scaling preview {width}x{height} to {max_width}x{new_height}");
    imageops::resize(&image, max_width, new_height, imageops::FilterType::Lanczos3)
}

/// Write the text of one page, or of the whole document, to `path`
pub fn save_text(doc: &dyn DocumentProvider, page: Option<usize>, path: &Path) -> Result<(), PdfError> {
    let text = match page {
        Some(page) => {
            PdfError::check_page(page, doc.page_count())?;
            doc.page_text(page)?
        }
        None => super::provider::document_text(doc)?,
    };
    std::fs::write(path, text).map_err(|e| PdfError::io(path, e))
}
