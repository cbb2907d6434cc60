//! Errors from the PDF collaborators

use std::path::PathBuf;

/// Failures while reading, rendering or writing documents
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("no document is open")]
    NoDocument,

    #[error("page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Engine(#[from] mupdf::error::Error),

    #[error("PDF structure: {0}")]
    Lopdf(#[from] lopdf::Error),

    #[error("image: {0}")]
    Image(#[from] image::ImageError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{detail}")]
    Generic { detail: String },
}

impl PdfError {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Range check shared by every page-addressed operation
    pub fn check_page(page: usize, count: usize) -> Result<(), PdfError> {
        if page < count {
            Ok(())
        } else {
            Err(PdfError::PageOutOfRange { page, count })
        }
    }
}
