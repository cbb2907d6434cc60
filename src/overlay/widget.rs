//! Live editing widgets
//!
//! The overlay store only needs a small surface from whatever toolkit
//! draws the text boxes. [`TextBox`] is the in-memory implementation used
//! by the command line and the tests.

use log::debug;

use crate::format::TextFormat;
use crate::geometry::ScreenRect;

#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error("widget was already destroyed")]
    AlreadyDestroyed,

    #[error("widget backend: {0}")]
    Backend(String),
}

/// An editable text box positioned in frame coordinates
pub trait EditWidget {
    fn geometry(&self) -> ScreenRect;

    /// Show the widget at `rect`
    fn place(&mut self, rect: ScreenRect);

    fn hide(&mut self);

    fn is_visible(&self) -> bool;

    fn text(&self) -> String;

    fn set_text(&mut self, text: &str);

    fn apply_format(&mut self, format: &TextFormat);

    /// Format last applied, if any
    fn format(&self) -> Option<&TextFormat>;

    /// Release the widget. Called once, before the overlay drops it.
    fn destroy(&mut self) -> Result<(), WidgetError>;
}

pub trait WidgetFactory {
    /// New visible widget at `rect` pre-filled with `text`
    fn create(&self, rect: ScreenRect, text: &str) -> Box<dyn EditWidget>;
}

/// Headless text box
#[derive(Debug, Clone, Default)]
pub struct TextBox {
    rect: ScreenRect,
    text: String,
    visible: bool,
    format: Option<TextFormat>,
    destroyed: bool,
}

impl TextBox {
    pub fn new(rect: ScreenRect, text: &str) -> Self {
        Self {
            rect,
            text: text.to_string(),
            visible: true,
            format: None,
            destroyed: false,
        }
    }
}

impl EditWidget for TextBox {
    fn geometry(&self) -> ScreenRect {
        self.rect
    }

    fn place(&mut self, rect: ScreenRect) {
        self.rect = rect;
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible && !self.destroyed
    }

    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn apply_format(&mut self, format: &TextFormat) {
        self.format = Some(format.clone());
    }

    fn format(&self) -> Option<&TextFormat> {
        self.format.as_ref()
    }

    fn destroy(&mut self) -> Result<(), WidgetError> {
        if self.destroyed {
            return Err(WidgetError::AlreadyDestroyed);
        }
        debug!("Destroying text box at {:?}", self.rect);
        self.destroyed = true;
        self.visible = false;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextBoxFactory;

impl WidgetFactory for TextBoxFactory {
    fn create(&self, rect: ScreenRect, text: &str) -> Box<dyn EditWidget> {
        Box::new(TextBox::new(rect, text))
    }
}
