// Export modules for use in tests
pub mod event_source;
pub mod format;
pub mod geometry;
pub mod notification;
pub mod overlay;
pub mod panic_handler;
pub mod pdf;
pub mod session;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export the editor session
pub use session::{
    PreviewFrame, PreviewPatch, Session, SessionConfig, SessionError, run_with_event_source,
};
