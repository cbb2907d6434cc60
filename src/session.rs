//! Headless editor session
//!
//! The session owns everything that belongs to the open document: the
//! provider, the current page, the last display layout and the staged
//! overlays. A front-end feeds it pointer and key input and draws what
//! [`Session::render`] returns. Replacing the document resets all of it.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage, imageops};
use log::{debug, info, warn};

use crate::event_source::{EditorEvent, EventSource};
use crate::format::{FontFamily, TextFormat};
use crate::geometry::{CoordinateMapper, DisplayGeometry, Point, ScreenRect, Size};
use crate::notification::NotificationManager;
use crate::overlay::{
    InteractionLimits, OverlayId, OverlayStore, Placement, WidgetFactory, locate_region_at,
};
use crate::pdf::{self, DocumentOpener, DocumentProvider, PdfError};
use crate::settings::{self, Settings};

/// Zoom and width cap of the whole-document preview shown after a merge
pub const PAGE_PREVIEW_ZOOM: f32 = 1.5;
pub const PAGE_PREVIEW_MAX_WIDTH: u32 = 800;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No PDF is open")]
    NoDocument,

    #[error("Page {} is out of range (1-{count})", .page + 1)]
    PageOutOfRange { page: usize, count: usize },

    #[error("There are no edits to apply")]
    NothingToApply,

    #[error(transparent)]
    Pdf(#[from] PdfError),
}

/// Values a session reads once at construction
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub render_zoom: f32,
    pub export_zoom: f32,
    pub preview_margin: u32,
    pub limits: InteractionLimits,
    pub format: TextFormat,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            render_zoom: settings.render_zoom,
            export_zoom: settings.export_zoom,
            preview_margin: settings.preview_margin,
            limits: settings.interaction_limits(),
            format: settings.default_format(),
        }
    }
}

impl SessionConfig {
    /// Snapshot of the loaded user settings
    pub fn from_settings() -> Self {
        Self {
            render_zoom: settings::get_render_zoom(),
            export_zoom: settings::get_export_zoom(),
            preview_margin: settings::get_preview_margin(),
            limits: settings::get_interaction_limits(),
            format: settings::get_default_format(),
        }
    }
}

/// Committed edit drawn onto the preview, for the front-end to letter
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewPatch {
    /// Frame coordinates
    pub rect: ScreenRect,
    pub text: String,
}

/// One rendered page, fitted to the frame
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub page: usize,
    pub page_count: usize,
    pub image: RgbImage,
    pub geometry: DisplayGeometry,
    pub patches: Vec<PreviewPatch>,
}

/// Layout of the last render pass
#[derive(Debug, Clone, Copy)]
struct DisplayState {
    page: usize,
    full_size: Size,
    placement: Placement,
}

pub struct Session {
    opener: Box<dyn DocumentOpener>,
    document: Option<Box<dyn DocumentProvider>>,
    current_page: usize,
    display: Option<DisplayState>,
    viewport: Option<ScreenRect>,
    overlays: OverlayStore,
    active: Option<OverlayId>,
    grabbed: Option<OverlayId>,
    editor_mode: bool,
    format: TextFormat,
    notifications: NotificationManager,
    config: SessionConfig,
}

impl Session {
    pub fn new(
        opener: Box<dyn DocumentOpener>,
        factory: Box<dyn WidgetFactory>,
        config: SessionConfig,
    ) -> Self {
        Self {
            opener,
            document: None,
            current_page: 0,
            display: None,
            viewport: None,
            overlays: OverlayStore::new(factory, config.limits),
            active: None,
            grabbed: None,
            editor_mode: false,
            format: config.format.clone(),
            notifications: NotificationManager::new(),
            config,
        }
    }

    // ---------------------------------------------------------------
    // Document lifecycle
    // ---------------------------------------------------------------

    /// Open `path` through the session's opener, replacing the current
    /// document. On failure the session is left without a document.
    pub fn open(&mut self, path: &Path) -> Result<(), SessionError> {
        self.close();
        match self.opener.open(path) {
            Ok(doc) => {
                self.open_document(doc);
                Ok(())
            }
            Err(e) => {
                self.notifications
                    .error(format!("Could not open {}: {e}", path.display()));
                Err(e.into())
            }
        }
    }

    /// Take ownership of an already open document
    pub fn open_document(&mut self, doc: Box<dyn DocumentProvider>) {
        self.document = None;
        self.reset();
        info!("Opened {:?} ({} pages)", doc.path(), doc.page_count());
        self.document = Some(doc);
    }

    pub fn close(&mut self) {
        if let Some(doc) = self.document.take() {
            debug!("Closing {:?}", doc.path());
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.overlays.clear();
        self.current_page = 0;
        self.display = None;
        self.active = None;
        self.grabbed = None;
    }

    pub fn document(&self) -> Option<&dyn DocumentProvider> {
        self.document.as_deref()
    }

    fn require_document(&mut self) -> Result<&dyn DocumentProvider, SessionError> {
        match self.document.as_deref() {
            Some(doc) => Ok(doc),
            None => {
                self.notifications.warn("No PDF is open");
                Err(SessionError::NoDocument)
            }
        }
    }

    pub fn page_count(&self) -> usize {
        self.document.as_ref().map_or(0, |d| d.page_count())
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    // ---------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------

    pub fn next_page(&mut self) -> bool {
        if self.current_page + 1 < self.page_count() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.document.is_some() && self.current_page > 0 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to a page. Without a document this does nothing.
    pub fn go_to_page(&mut self, page: usize) -> Result<(), SessionError> {
        let Some(doc) = self.document.as_deref() else {
            return Ok(());
        };
        let count = doc.page_count();
        if page < count {
            self.current_page = page;
            Ok(())
        } else {
            Err(SessionError::PageOutOfRange { page, count })
        }
    }

    // ---------------------------------------------------------------
    // Display
    // ---------------------------------------------------------------

    /// Render the current page into `viewport` (frame coordinates of the
    /// preview container) and reposition the overlay widgets.
    pub fn render(&mut self, viewport: ScreenRect) -> Result<Option<PreviewFrame>, SessionError> {
        self.viewport = Some(viewport);
        let result = self.render_current(viewport);
        if let Err(e) = &result {
            self.notifications.error(format!("Failed to render page: {e}"));
            self.display = None;
        }
        self.reposition();
        result
    }

    /// Render again into the last viewport
    pub fn rerender(&mut self) -> Result<Option<PreviewFrame>, SessionError> {
        match self.viewport {
            Some(viewport) => self.render(viewport),
            None => Ok(None),
        }
    }

    fn render_current(&mut self, viewport: ScreenRect) -> Result<Option<PreviewFrame>, SessionError> {
        let Some(doc) = self.document.as_deref() else {
            self.display = None;
            return Ok(None);
        };
        let page = self.current_page;
        let zoom = self.config.render_zoom;

        let page_rect = doc.page_rect(page)?;
        let data = doc.render_page(page, zoom)?;
        let full = data
            .to_rgb_image()
            .ok_or_else(|| PdfError::generic("Rendered page buffer does not match its size"))?;
        let full_size = data.size();

        let margin = f64::from(self.config.preview_margin);
        let display_size = if viewport.width > margin && viewport.height > margin {
            full_size.fit_within(Size::new(
                (viewport.width - margin) as u32,
                (viewport.height - margin) as u32,
            ))
        } else {
            full_size
        };
        let mut image = if display_size == full_size {
            full
        } else {
            imageops::thumbnail(&full, display_size.width, display_size.height)
        };

        let geometry = DisplayGeometry::centered(viewport, display_size);
        let mapper = CoordinateMapper::new(
            page_rect.origin(),
            f64::from(zoom),
            f64::from(full_size.width),
            f64::from(display_size.width),
        );
        self.display = mapper.map(|mapper| DisplayState {
            page,
            full_size,
            placement: Placement { mapper, geometry },
        });

        let mut patches = Vec::new();
        if let Some(state) = &self.display {
            for overlay in self.overlays.page(page) {
                if overlay.is_editing() || overlay.text.is_empty() {
                    continue;
                }
                let display_rect = state.placement.mapper.pdf_rect_to_display(&overlay.pdf_rect);
                fill_white(&mut image, display_rect);
                patches.push(PreviewPatch {
                    rect: geometry.image_to_frame(display_rect),
                    text: overlay.text.clone(),
                });
            }
        }

        Ok(Some(PreviewFrame {
            page,
            page_count: doc.page_count(),
            image,
            geometry,
            patches,
        }))
    }

    /// Mapping for the page on screen, if it was laid out
    pub fn placement(&self) -> Option<Placement> {
        self.display
            .filter(|state| state.page == self.current_page)
            .map(|state| state.placement)
    }

    /// Full-render size of the page on screen
    pub fn full_size(&self) -> Option<Size> {
        self.display.map(|state| state.full_size)
    }

    fn reposition(&mut self) {
        let placement = if self.editor_mode && self.document.is_some() {
            self.placement()
        } else {
            None
        };
        self.overlays.reposition(self.current_page, placement.as_ref());
    }

    // ---------------------------------------------------------------
    // Editing
    // ---------------------------------------------------------------

    pub fn is_editor_mode(&self) -> bool {
        self.editor_mode
    }

    pub fn toggle_editor_mode(&mut self) -> bool {
        self.editor_mode = !self.editor_mode;
        self.reposition();
        self.editor_mode
    }

    pub fn overlays(&self) -> &OverlayStore {
        &self.overlays
    }

    pub fn active(&self) -> Option<OverlayId> {
        self.active
    }

    /// Start editing the text line nearest to a container-relative click.
    /// Returns `None` unless editor mode is on and the page is laid out.
    pub fn double_click(&mut self, click: Point) -> Result<Option<OverlayId>, SessionError> {
        if !self.editor_mode {
            return Ok(None);
        }
        let Some(placement) = self.placement() else {
            return Ok(None);
        };
        let Some(doc) = self.document.as_deref() else {
            return Ok(None);
        };
        let page = self.current_page;

        let pdf_point = placement.click_to_pdf(click);
        let layout = doc
            .page_rect(page)
            .and_then(|rect| doc.words(page).map(|words| (rect, words)));
        let (page_rect, words) = match layout {
            Ok(layout) => layout,
            Err(e) => {
                self.notifications
                    .error(format!("Failed to read page text: {e}"));
                return Err(e.into());
            }
        };
        let region = locate_region_at(&words, &page_rect, pdf_point);
        debug!("Double click at {pdf_point:?} located {region:?}");

        let id = self
            .overlays
            .create(page, region.rect, &region.text, &placement);
        self.active = Some(id);
        self.overlays.apply_format(id, &self.format);
        Ok(Some(id))
    }

    pub fn hit_test(&self, point: Point) -> Option<OverlayId> {
        self.overlays.hit_test(self.current_page, point)
    }

    /// Press on whatever widget is under `point`
    pub fn press(&mut self, point: Point) -> Option<OverlayId> {
        let id = self.hit_test(point)?;
        self.press_overlay(id, point).then_some(id)
    }

    pub fn press_overlay(&mut self, id: OverlayId, point: Point) -> bool {
        if !self.overlays.press(id, point) {
            return false;
        }
        self.active = Some(id);
        self.grabbed = Some(id);
        true
    }

    pub fn motion(&mut self, point: Point) {
        if let Some(id) = self.grabbed {
            self.overlays.motion(id, point);
        }
    }

    pub fn release(&mut self) {
        if let Some(id) = self.grabbed.take() {
            self.overlays.release(id);
        }
    }

    pub fn type_text(&mut self, id: OverlayId, text: &str) -> bool {
        self.overlays.set_text(id, text)
    }

    /// Commit an overlay from its widget. Re-rendering is up to the caller.
    pub fn commit(&mut self, id: OverlayId) -> bool {
        let placement = self
            .overlays
            .get(id)
            .filter(|ov| ov.page_index == self.current_page)
            .and_then(|_| self.placement());
        let committed = self.overlays.commit(id, placement.as_ref());
        if self.active == Some(id) {
            self.active = None;
        }
        if self.grabbed == Some(id) {
            self.grabbed = None;
        }
        committed
    }

    pub fn commit_active(&mut self) -> bool {
        match self.active {
            Some(id) => self.commit(id),
            None => false,
        }
    }

    // ---------------------------------------------------------------
    // Formatting
    // ---------------------------------------------------------------

    pub fn format(&self) -> &TextFormat {
        &self.format
    }

    fn restyle_active(&mut self) {
        if let Some(id) = self.active {
            self.overlays.apply_format(id, &self.format);
        }
    }

    pub fn set_font_family(&mut self, family: FontFamily) {
        self.format.family = family;
        self.restyle_active();
    }

    pub fn set_font_size(&mut self, size: f32) {
        if size.is_finite() && size > 0.0 {
            self.format.size = size;
            self.restyle_active();
        } else {
            warn!("Ignoring font size {size}");
        }
    }

    pub fn toggle_bold(&mut self) {
        self.format.bold = !self.format.bold;
        self.restyle_active();
    }

    pub fn toggle_italic(&mut self) {
        self.format.italic = !self.format.italic;
        self.restyle_active();
    }

    pub fn toggle_underline(&mut self) {
        self.format.underline = !self.format.underline;
        self.restyle_active();
    }

    pub fn set_color(&mut self, color: &str) {
        self.format.color = color.to_string();
        self.restyle_active();
    }

    // ---------------------------------------------------------------
    // Document operations
    // ---------------------------------------------------------------

    /// Write every edit into a copy of the document at `output`, then open
    /// that copy. Widgets still being edited are committed first.
    pub fn apply_overlays(&mut self, output: &Path) -> Result<usize, SessionError> {
        let source = self.require_document()?.path().to_path_buf();
        if self.overlays.is_empty() {
            self.notifications.info("There are no edits to apply");
            return Err(SessionError::NothingToApply);
        }

        let placement = self.placement();
        self.overlays
            .commit_all(self.current_page, placement.as_ref());
        self.active = None;
        self.grabbed = None;

        let edits = self.overlays.committed_edits();
        let stamped = match pdf::stamp_overlays(&source, output, &edits, &self.format) {
            Ok(count) => count,
            Err(e) => {
                self.notifications.error(format!("Failed to apply edits: {e}"));
                return Err(e.into());
            }
        };

        self.notifications.info(format!(
            "Edits applied and PDF saved to {}",
            output.display()
        ));
        self.overlays.clear();
        self.open(output)?;
        Ok(stamped)
    }

    /// Merge `inputs` into `output` and open the result
    pub fn merge_and_open(&mut self, inputs: &[PathBuf], output: &Path) -> Result<(), SessionError> {
        if let Err(e) = pdf::merge_files(inputs, output) {
            self.notifications.error(format!("Failed to merge PDFs: {e}"));
            return Err(e.into());
        }
        self.notifications
            .info(format!("PDFs merged into {}", output.display()));
        self.overlays.clear();
        self.open(output)
    }

    /// Every page of the open document, scaled for a scrolling preview
    pub fn page_previews(&mut self) -> Result<Vec<RgbImage>, SessionError> {
        let doc = self.require_document()?;
        match pdf::render_page_previews(doc, PAGE_PREVIEW_ZOOM, PAGE_PREVIEW_MAX_WIDTH) {
            Ok(pages) => Ok(pages),
            Err(e) => {
                self.notifications
                    .error(format!("Failed to render preview: {e}"));
                Err(e.into())
            }
        }
    }

    /// Export one page (zero based) as PNG or JPEG, chosen by extension
    pub fn extract_page_image(&mut self, page: usize, path: &Path) -> Result<(), SessionError> {
        let zoom = self.config.export_zoom;
        let doc = self.require_document()?;
        let count = doc.page_count();
        if page >= count {
            self.notifications.error("Page number out of range");
            return Err(SessionError::PageOutOfRange { page, count });
        }

        match pdf::save_page_image(doc, page, path, zoom) {
            Ok(()) => {
                self.notifications
                    .info(format!("Page {} saved as an image", page + 1));
                Ok(())
            }
            Err(e) => {
                self.notifications.error(format!("Failed to save image: {e}"));
                Err(e.into())
            }
        }
    }

    /// Text of every page, separated by newlines
    pub fn extract_text(&mut self) -> Result<String, SessionError> {
        let doc = self.require_document()?;
        match pdf::document_text(doc) {
            Ok(text) => Ok(text),
            Err(e) => {
                self.notifications.error(format!("Failed to extract text: {e}"));
                Err(e.into())
            }
        }
    }

    pub fn extract_page_text(&mut self, page: usize) -> Result<String, SessionError> {
        let doc = self.require_document()?;
        let count = doc.page_count();
        if page >= count {
            self.notifications.error("Page number out of range");
            return Err(SessionError::PageOutOfRange { page, count });
        }
        match doc.page_text(page) {
            Ok(text) => Ok(text),
            Err(e) => {
                self.notifications
                    .error(format!("Failed to extract text: {e}"));
                Err(e.into())
            }
        }
    }

    pub fn notifications(&mut self) -> &mut NotificationManager {
        &mut self.notifications
    }

    // ---------------------------------------------------------------
    // Event dispatch
    // ---------------------------------------------------------------

    /// Apply one event. Returns false when the event asks to stop.
    pub fn handle_event(&mut self, event: &EditorEvent) -> Result<bool, SessionError> {
        match event {
            EditorEvent::Render { width, height } => {
                self.render(ScreenRect::new(0.0, 0.0, *width, *height))?;
            }
            EditorEvent::ToggleEditor => {
                self.toggle_editor_mode();
            }
            EditorEvent::NextPage => {
                self.next_page();
                self.rerender()?;
            }
            EditorEvent::PrevPage => {
                self.prev_page();
                self.rerender()?;
            }
            EditorEvent::GoToPage { page } => {
                self.go_to_page(*page)?;
                self.rerender()?;
            }
            EditorEvent::DoubleClick { x, y } => {
                self.double_click(Point::new(*x, *y))?;
            }
            EditorEvent::Press { x, y } => {
                self.press(Point::new(*x, *y));
            }
            EditorEvent::Motion { x, y } => self.motion(Point::new(*x, *y)),
            EditorEvent::Release => self.release(),
            EditorEvent::Type { text } => {
                if let Some(id) = self.active {
                    self.type_text(id, text);
                }
            }
            EditorEvent::Commit => {
                if self.commit_active() {
                    self.rerender()?;
                }
            }
            EditorEvent::SetFont { family } => self.set_font_family(*family),
            EditorEvent::SetSize { size } => self.set_font_size(*size),
            EditorEvent::ToggleBold => self.toggle_bold(),
            EditorEvent::ToggleItalic => self.toggle_italic(),
            EditorEvent::ToggleUnderline => self.toggle_underline(),
            EditorEvent::SetColor { color } => self.set_color(color),
            EditorEvent::Apply { output } => {
                self.apply_overlays(output)?;
                self.rerender()?;
            }
            EditorEvent::Quit => return Ok(false),
        }
        Ok(true)
    }
}

/// Feed every event of `source` into `session` until it runs dry or asks
/// to quit. Failing events are logged and replay continues.
pub fn run_with_event_source<E: EventSource + ?Sized>(
    session: &mut Session,
    source: &mut E,
) -> anyhow::Result<()> {
    while source.poll()? {
        let event = source.read()?;
        match session.handle_event(&event) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => warn!("Event {event:?} failed: {e}"),
        }
    }
    Ok(())
}

/// Paint an image-relative rectangle white, clipped to the image
fn fill_white(image: &mut RgbImage, rect: ScreenRect) {
    let (width, height) = image.dimensions();
    let x0 = rect.x.floor().clamp(0.0, f64::from(width)) as u32;
    let y0 = rect.y.floor().clamp(0.0, f64::from(height)) as u32;
    let x1 = rect.right().ceil().clamp(0.0, f64::from(width)) as u32;
    let y1 = rect.bottom().ceil().clamp(0.0, f64::from(height)) as u32;
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x, y, Rgb([0xFF, 0xFF, 0xFF]));
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("document", &self.document.as_ref().map(|d| d.path().to_path_buf()))
            .field("current_page", &self.current_page)
            .field("editor_mode", &self.editor_mode)
            .field("overlays", &self.overlays)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::TextBoxFactory;
    use crate::test_utils::test_helpers::{FakeDocument, fake_opener};

    fn session() -> Session {
        Session::new(
            Box::new(fake_opener(3)),
            Box::new(TextBoxFactory),
            SessionConfig::default(),
        )
    }

    fn hello_doc() -> FakeDocument {
        FakeDocument::new(3).with_line(
            0,
            0,
            0,
            (100.0, 112.0),
            &[("Hello", 72.0, 102.0), ("World", 106.0, 140.0)],
        )
    }

    #[test]
    fn preview_is_fitted_inside_margin() {
        let mut s = session();
        s.open_document(Box::new(hello_doc()));

        let frame = s
            .render(ScreenRect::new(0.0, 0.0, 631.0, 1000.0))
            .unwrap()
            .unwrap();
        // full render 1102x1426 shrunk into 551x920
        assert_eq!(frame.image.dimensions(), (551, 713));
        assert_eq!(s.full_size(), Some(Size::new(1102, 1426)));
        assert_eq!(frame.geometry.image_left, 40.0);
        assert_eq!(frame.geometry.image_top, 143.5);
    }

    #[test]
    fn small_frame_shows_full_render() {
        let mut s = session();
        s.open_document(Box::new(hello_doc()));
        let frame = s
            .render(ScreenRect::new(0.0, 0.0, 60.0, 60.0))
            .unwrap()
            .unwrap();
        assert_eq!(frame.image.dimensions(), (1102, 1426));
    }

    #[test]
    fn render_without_document_is_empty() {
        let mut s = session();
        assert!(s.render(ScreenRect::new(0.0, 0.0, 800.0, 600.0)).unwrap().is_none());
        assert!(s.placement().is_none());
    }

    #[test]
    fn double_click_requires_editor_mode() {
        let mut s = session();
        s.open_document(Box::new(hello_doc()));
        s.render(ScreenRect::new(0.0, 0.0, 631.0, 1000.0)).unwrap();
        assert_eq!(s.double_click(Point::new(100.0, 200.0)).unwrap(), None);
        assert!(s.overlays().is_empty());
    }

    #[test]
    fn double_click_requires_layout() {
        let mut s = session();
        s.open_document(Box::new(hello_doc()));
        s.toggle_editor_mode();
        assert_eq!(s.double_click(Point::new(100.0, 200.0)).unwrap(), None);
    }

    #[test]
    fn navigation_is_bounded() {
        let mut s = session();
        assert!(!s.next_page());
        assert!(s.go_to_page(5).is_ok());

        s.open_document(Box::new(FakeDocument::new(2)));
        assert!(!s.prev_page());
        assert!(s.next_page());
        assert!(!s.next_page());
        assert_eq!(s.current_page(), 1);
        assert!(matches!(
            s.go_to_page(2),
            Err(SessionError::PageOutOfRange { page: 2, count: 2 })
        ));
        assert_eq!(s.current_page(), 1);
    }

    fn widget_format(s: &Session, id: OverlayId) -> Option<TextFormat> {
        s.overlays().get(id)?.widget()?.format().cloned()
    }

    #[test]
    fn format_changes_restyle_only_the_active_widget() {
        let mut s = session();
        s.open_document(Box::new(hello_doc()));
        s.render(ScreenRect::new(0.0, 0.0, 631.0, 1000.0)).unwrap();
        s.toggle_editor_mode();

        s.set_color("#0000ff");
        let first = s.double_click(Point::new(100.0, 200.0)).unwrap().unwrap();
        let applied = widget_format(&s, first).unwrap();
        assert_eq!(applied.color, "#0000ff");
        assert!(!applied.bold);

        let second = s.double_click(Point::new(150.0, 200.0)).unwrap().unwrap();
        s.toggle_bold();
        s.set_color("#ff0000");
        s.set_font_size(-3.0);
        let applied = widget_format(&s, second).unwrap();
        assert!(applied.bold);
        assert_eq!(applied.color, "#ff0000");
        assert_eq!(applied.size, 12.0);

        let untouched = widget_format(&s, first).unwrap();
        assert!(!untouched.bold);
        assert_eq!(untouched.color, "#0000ff");

        s.type_text(second, "Bye");
        assert!(s.commit(second));
        let (rect, text) = {
            let ov = s.overlays().get(second).unwrap();
            (ov.pdf_rect, ov.text.clone())
        };
        assert_eq!(s.active(), None);

        s.toggle_underline();
        s.set_color("#00ff00");
        let ov = s.overlays().get(second).unwrap();
        assert!(ov.widget().is_none());
        assert_eq!(ov.pdf_rect, rect);
        assert_eq!(ov.text, text);
        assert!(!widget_format(&s, first).unwrap().underline);
        assert!(s.format().underline);
    }

    #[test]
    fn underline_restyles_active_widget() {
        let mut s = session();
        s.open_document(Box::new(hello_doc()));
        s.render(ScreenRect::new(0.0, 0.0, 631.0, 1000.0)).unwrap();
        s.toggle_editor_mode();
        let id = s.double_click(Point::new(100.0, 200.0)).unwrap().unwrap();

        s.toggle_underline();
        s.toggle_italic();
        s.set_font_family(FontFamily::CourierNew);
        let applied = widget_format(&s, id).unwrap();
        assert!(applied.underline);
        assert!(applied.italic);
        assert_eq!(applied.family, FontFamily::CourierNew);
    }

    #[test]
    fn unreadable_page_text_is_reported() {
        let mut s = session();
        s.open_document(Box::new(hello_doc().unreadable()));
        s.render(ScreenRect::new(0.0, 0.0, 631.0, 1000.0)).unwrap();
        s.toggle_editor_mode();

        assert!(s.double_click(Point::new(100.0, 200.0)).is_err());
        assert!(s.overlays().is_empty());
        assert_eq!(
            s.notifications().current().unwrap().to_string(),
            "Error: Failed to read page text: text layer is damaged"
        );

        assert!(s.extract_page_text(0).is_err());
        assert_eq!(
            s.notifications().current().unwrap().to_string(),
            "Error: Failed to extract text: text layer is damaged"
        );
    }

    #[test]
    fn out_of_range_page_text_is_reported() {
        let mut s = session();
        s.open_document(Box::new(FakeDocument::new(2)));
        assert!(matches!(
            s.extract_page_text(2),
            Err(SessionError::PageOutOfRange { page: 2, count: 2 })
        ));
        assert_eq!(
            s.notifications().current().unwrap().to_string(),
            "Error: Page number out of range"
        );
    }

    #[test]
    fn missing_document_warns() {
        let mut s = session();
        assert!(matches!(s.extract_text(), Err(SessionError::NoDocument)));
        let note = s.notifications().current().unwrap().to_string();
        assert_eq!(note, "Warning: No PDF is open");
    }

    #[test]
    fn out_of_range_export_is_reported() {
        let mut s = session();
        s.open_document(Box::new(FakeDocument::new(1)));
        let dir = tempfile::tempdir().unwrap();
        let err = s.extract_page_image(4, &dir.path().join("p.png")).unwrap_err();
        assert_eq!(err.to_string(), "Page 5 is out of range (1-1)");
    }

    #[test]
    fn page_previews_are_capped_in_width() {
        let mut s = session();
        assert!(matches!(s.page_previews(), Err(SessionError::NoDocument)));

        s.open_document(Box::new(FakeDocument::new(3)));
        let previews = s.page_previews().unwrap();
        assert_eq!(previews.len(), 3);
        assert!(previews.iter().all(|p| p.dimensions() == (800, 1035)));
    }

    #[test]
    fn fill_white_is_clipped() {
        let mut image = RgbImage::new(4, 4);
        fill_white(&mut image, ScreenRect::new(2.0, -1.0, 10.0, 2.0));
        assert_eq!(image.get_pixel(3, 0).0, [0xFF; 3]);
        assert_eq!(image.get_pixel(1, 0).0, [0; 3]);
        assert_eq!(image.get_pixel(3, 1).0, [0; 3]);
    }
}
