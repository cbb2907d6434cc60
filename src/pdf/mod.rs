//! PDF document infrastructure

#[cfg(feature = "pdf")]
mod document;
mod error;
mod export;
mod merge;
mod provider;
mod stamp;
mod types;

#[cfg(feature = "pdf")]
pub use document::{MupdfDocument, mupdf_opener, open_document};
pub use error::PdfError;
pub use export::{image_format_for, render_page_previews, save_page_image, save_text};
pub use merge::{merge_documents, merge_files};
pub use provider::{DocumentOpener, DocumentProvider, document_text};
pub use stamp::{stamp_document, stamp_overlays};
pub use types::*;
