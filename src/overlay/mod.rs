//! Text overlays staged on top of rendered pages
//!
//! An overlay is a region of a page whose text will be replaced. While it
//! is being edited it owns a live widget; once committed the widget is
//! gone and the overlay waits to be written into the PDF.

pub mod interaction;
pub mod locate;
pub mod widget;

use std::collections::BTreeMap;
use std::fmt;

use log::debug;

use crate::format::TextFormat;
use crate::geometry::{CoordinateMapper, DisplayGeometry, PdfRect, Point, ScreenRect};
use crate::pdf::PageEdit;

pub use interaction::{Interaction, InteractionLimits};
pub use locate::{LocatedRegion, locate_region_at};
pub use widget::{EditWidget, TextBox, TextBoxFactory, WidgetError, WidgetFactory};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayId(u64);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct Overlay {
    id: OverlayId,
    pub page_index: usize,
    /// Region in PDF user space
    pub pdf_rect: PdfRect,
    pub text: String,
    widget: Option<Box<dyn EditWidget>>,
    interaction: Interaction,
}

impl Overlay {
    pub fn id(&self) -> OverlayId {
        self.id
    }

    /// True while a live widget is attached
    pub fn is_editing(&self) -> bool {
        self.widget.is_some()
    }

    pub fn widget(&self) -> Option<&dyn EditWidget> {
        self.widget.as_deref()
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    /// Destroy and detach the widget. Failures are logged and ignored.
    fn drop_widget(&mut self) {
        if let Some(mut widget) = self.widget.take() {
            if let Err(e) = widget.destroy() {
                debug!("Ignoring failure to destroy widget of overlay {}: {e}", self.id);
            }
        }
        self.interaction = Interaction::Idle;
    }
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay")
            .field("id", &self.id)
            .field("page_index", &self.page_index)
            .field("pdf_rect", &self.pdf_rect)
            .field("text", &self.text)
            .field("editing", &self.is_editing())
            .field("interaction", &self.interaction)
            .finish()
    }
}

/// Mapping state of the page currently on screen
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub mapper: CoordinateMapper,
    pub geometry: DisplayGeometry,
}

impl Placement {
    /// PDF rectangle to frame coordinates
    pub fn frame_rect(&self, rect: &PdfRect) -> ScreenRect {
        self.geometry
            .image_to_frame(self.mapper.pdf_rect_to_display(rect))
    }

    /// Frame rectangle to PDF space, clamped to the displayed image first
    pub fn pdf_rect(&self, frame: ScreenRect) -> PdfRect {
        self.mapper
            .display_rect_to_pdf(&self.geometry.frame_to_image_clamped(frame))
    }

    /// Container-relative click to PDF space, clamped into the image
    pub fn click_to_pdf(&self, click: Point) -> Point {
        self.mapper
            .display_to_pdf(self.geometry.container_to_image(click))
    }
}

/// Overlays of the open document, grouped by page in creation order
pub struct OverlayStore {
    pages: BTreeMap<usize, Vec<Overlay>>,
    factory: Box<dyn WidgetFactory>,
    limits: InteractionLimits,
    next_id: u64,
}

impl OverlayStore {
    pub fn new(factory: Box<dyn WidgetFactory>, limits: InteractionLimits) -> Self {
        Self {
            pages: BTreeMap::new(),
            factory,
            limits,
            next_id: 0,
        }
    }

    /// Add an overlay on `page_index` with a live widget over `pdf_rect`
    pub fn create(
        &mut self,
        page_index: usize,
        pdf_rect: PdfRect,
        text: &str,
        placement: &Placement,
    ) -> OverlayId {
        let frame = placement
            .frame_rect(&pdf_rect)
            .at_least(self.limits.min_width, self.limits.min_height);
        let widget = self.factory.create(frame, text);

        let id = OverlayId(self.next_id);
        self.next_id += 1;

        debug!("Created overlay {id} on page {page_index} at {pdf_rect:?}");
        self.pages.entry(page_index).or_default().push(Overlay {
            id,
            page_index,
            pdf_rect,
            text: text.to_string(),
            widget: Some(widget),
            interaction: Interaction::Idle,
        });
        id
    }

    pub fn get(&self, id: OverlayId) -> Option<&Overlay> {
        self.iter().find(|ov| ov.id == id)
    }

    fn get_mut(&mut self, id: OverlayId) -> Option<&mut Overlay> {
        self.pages.values_mut().flatten().find(|ov| ov.id == id)
    }

    /// All overlays, page by page in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.pages.values().flatten()
    }

    pub fn page(&self, page_index: usize) -> &[Overlay] {
        self.pages
            .get(&page_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Begin a drag or resize. Returns false when the overlay has no widget.
    pub fn press(&mut self, id: OverlayId, pointer: Point) -> bool {
        let limits = self.limits;
        let Some(overlay) = self.get_mut(id) else {
            return false;
        };
        let Some(widget) = overlay.widget.as_ref() else {
            return false;
        };
        overlay.interaction = Interaction::press(widget.geometry(), pointer, &limits);
        true
    }

    pub fn motion(&mut self, id: OverlayId, pointer: Point) {
        let limits = self.limits;
        let Some(overlay) = self.get_mut(id) else {
            return;
        };
        let Some(widget) = overlay.widget.as_mut() else {
            return;
        };
        if let Some(rect) = overlay
            .interaction
            .motion(widget.geometry(), pointer, &limits)
        {
            widget.place(rect);
        }
    }

    pub fn release(&mut self, id: OverlayId) {
        if let Some(overlay) = self.get_mut(id) {
            overlay.interaction.release();
        }
    }

    /// Replace the text of a live widget
    pub fn set_text(&mut self, id: OverlayId, text: &str) -> bool {
        match self.get_mut(id).and_then(|ov| ov.widget.as_mut()) {
            Some(widget) => {
                widget.set_text(text);
                true
            }
            None => false,
        }
    }

    pub fn apply_format(&mut self, id: OverlayId, format: &TextFormat) {
        if let Some(widget) = self.get_mut(id).and_then(|ov| ov.widget.as_mut()) {
            widget.apply_format(format);
        }
    }

    /// Finalise an overlay from its widget.
    ///
    /// With a placement the rectangle is recomputed from the widget
    /// geometry, clamped to the displayed image; without one only the text
    /// is captured. Returns false when there was no widget to commit.
    pub fn commit(&mut self, id: OverlayId, placement: Option<&Placement>) -> bool {
        let Some(overlay) = self.get_mut(id) else {
            return false;
        };
        let Some(widget) = overlay.widget.as_ref() else {
            return false;
        };

        overlay.text = widget.text().trim().to_string();
        if let Some(placement) = placement {
            overlay.pdf_rect = placement.pdf_rect(widget.geometry());
        }
        overlay.drop_widget();

        debug!(
            "Committed overlay {id} on page {}: {:?} {:?}",
            overlay.page_index, overlay.pdf_rect, overlay.text
        );
        true
    }

    /// Commit every overlay that still has a widget. Only overlays of
    /// `page_index` get their rectangle updated from `placement`.
    pub fn commit_all(&mut self, page_index: usize, placement: Option<&Placement>) -> usize {
        let live: Vec<(OverlayId, usize)> = self
            .iter()
            .filter(|ov| ov.is_editing())
            .map(|ov| (ov.id, ov.page_index))
            .collect();

        let mut committed = 0;
        for (id, page) in live {
            let placement = if page == page_index { placement } else { None };
            if self.commit(id, placement) {
                committed += 1;
            }
        }
        committed
    }

    /// Destroy every widget and forget all overlays
    pub fn clear(&mut self) {
        for overlay in self.pages.values_mut().flatten() {
            overlay.drop_widget();
        }
        self.pages.clear();
    }

    /// Hide all widgets, then show those of `page_index` at their mapped
    /// rectangles when a placement is available.
    pub fn reposition(&mut self, page_index: usize, placement: Option<&Placement>) {
        for widget in self
            .pages
            .values_mut()
            .flatten()
            .filter_map(|ov| ov.widget.as_mut())
        {
            widget.hide();
        }

        let Some(placement) = placement else {
            return;
        };
        if let Some(overlays) = self.pages.get_mut(&page_index) {
            for overlay in overlays {
                if let Some(widget) = overlay.widget.as_mut() {
                    widget.place(placement.frame_rect(&overlay.pdf_rect));
                }
            }
        }
    }

    /// Topmost visible widget of `page_index` under a frame-space point
    pub fn hit_test(&self, page_index: usize, point: Point) -> Option<OverlayId> {
        self.page(page_index)
            .iter()
            .rev()
            .find(|ov| {
                ov.widget()
                    .is_some_and(|w| w.is_visible() && w.geometry().contains(point))
            })
            .map(Overlay::id)
    }

    /// Finalised overlays with text, ready to be written into the PDF
    pub fn committed_edits(&self) -> Vec<PageEdit> {
        self.iter()
            .filter(|ov| !ov.is_editing() && !ov.text.trim().is_empty())
            .map(|ov| PageEdit {
                page: ov.page_index,
                rect: ov.pdf_rect,
                text: ov.text.clone(),
            })
            .collect()
    }
}

impl fmt::Debug for OverlayStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayStore")
            .field("pages", &self.pages)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::test_utils::test_helpers::{FailingWidgetFactory, RecordingWidgetFactory};

    /// Page 612x792 rendered at 2.0 and shown at half size: 1 pt = 1 px
    fn placement() -> Placement {
        let mapper = CoordinateMapper::new(Point::default(), 2.0, 1224.0, 612.0).unwrap();
        let geometry =
            DisplayGeometry::centered(ScreenRect::new(10.0, 20.0, 612.0, 792.0), Size::new(612, 792));
        Placement { mapper, geometry }
    }

    fn store() -> OverlayStore {
        OverlayStore::new(Box::new(TextBoxFactory), InteractionLimits::default())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn create_places_widget_at_mapped_rect() {
        let mut store = store();
        let id = store.create(0, PdfRect::new(100.0, 200.0, 300.0, 230.0), "Hi", &placement());

        let widget = store.get(id).unwrap().widget().unwrap();
        assert_eq!(widget.geometry(), ScreenRect::new(110.0, 220.0, 200.0, 30.0));
        assert_eq!(widget.text(), "Hi");
    }

    #[test]
    fn small_regions_get_minimum_widget_size() {
        let mut store = store();
        let id = store.create(0, PdfRect::new(0.0, 0.0, 5.0, 5.0), "", &placement());
        let geometry = store.get(id).unwrap().widget().unwrap().geometry();
        assert_eq!((geometry.width, geometry.height), (30.0, 20.0));
    }

    #[test]
    fn overlays_keep_creation_order_and_may_overlap() {
        let mut store = store();
        let rect = PdfRect::new(10.0, 10.0, 100.0, 30.0);
        let a = store.create(1, rect, "a", &placement());
        let b = store.create(1, rect, "b", &placement());

        let ids: Vec<_> = store.page(1).iter().map(Overlay::id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(store.hit_test(1, Point::new(50.0, 35.0)), Some(b));
    }

    #[test]
    fn drag_then_commit_translates_pdf_rect() {
        let mut store = store();
        let rect = PdfRect::new(100.0, 200.0, 300.0, 230.0);
        let id = store.create(0, rect, "Hello", &placement());

        assert!(store.press(id, Point::new(120.0, 230.0)));
        store.motion(id, Point::new(135.0, 225.0));
        store.release(id);
        // pdf_rect is untouched until commit
        assert_eq!(store.get(id).unwrap().pdf_rect, rect);

        assert!(store.commit(id, Some(&placement())));
        let committed = store.get(id).unwrap();
        // display delta (+15, -5) with S = 2, Z = 2
        assert!(close(committed.pdf_rect.x0, 115.0));
        assert!(close(committed.pdf_rect.y0, 195.0));
        assert!(close(committed.pdf_rect.width(), 200.0));
        assert!(!committed.is_editing());
    }

    #[test]
    fn commit_clamps_into_image() {
        let mut store = store();
        let id = store.create(0, PdfRect::new(500.0, 700.0, 600.0, 780.0), "x", &placement());

        store.press(id, Point::new(520.0, 730.0));
        store.motion(id, Point::new(620.0, 830.0));
        store.commit(id, Some(&placement()));

        let rect = store.get(id).unwrap().pdf_rect;
        assert!(rect.x0 >= 0.0 && rect.x1 <= 612.0, "{rect:?}");
        assert!(rect.y0 >= 0.0 && rect.y1 <= 792.0, "{rect:?}");
        assert!(close(rect.x0, 600.0));
        assert!(close(rect.width(), 12.0));
    }

    #[test]
    fn commit_trims_text_and_keeps_empty_overlays() {
        let mut store = store();
        let id = store.create(0, PdfRect::new(0.0, 0.0, 50.0, 20.0), "old", &placement());
        store.set_text(id, "   ");
        store.commit(id, Some(&placement()));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().text, "");
        assert!(store.committed_edits().is_empty());
    }

    #[test]
    fn commit_without_widget_is_a_no_op() {
        let mut store = store();
        let id = store.create(0, PdfRect::new(0.0, 0.0, 50.0, 20.0), "a", &placement());
        assert!(store.commit(id, None));
        store.set_text(id, "ignored");
        assert!(!store.commit(id, Some(&placement())));
        assert_eq!(store.get(id).unwrap().text, "a");
    }

    #[test]
    fn commit_without_placement_keeps_rect() {
        let mut store = store();
        let rect = PdfRect::new(10.0, 10.0, 60.0, 30.0);
        let id = store.create(0, rect, "a", &placement());
        store.set_text(id, " typed ");
        store.commit(id, None);

        let overlay = store.get(id).unwrap();
        assert_eq!(overlay.pdf_rect, rect);
        assert_eq!(overlay.text, "typed");
    }

    #[test]
    fn clear_twice_is_same_as_once() {
        let factory = RecordingWidgetFactory::default();
        let mut store = OverlayStore::new(Box::new(factory.clone()), InteractionLimits::default());
        store.create(0, PdfRect::new(0.0, 0.0, 50.0, 20.0), "a", &placement());
        store.create(2, PdfRect::new(0.0, 0.0, 50.0, 20.0), "b", &placement());

        store.clear();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(factory.destroyed(), 2);
    }

    #[test]
    fn destroy_failures_do_not_stop_clear() {
        let mut store = OverlayStore::new(Box::new(FailingWidgetFactory), InteractionLimits::default());
        let id = store.create(0, PdfRect::new(0.0, 0.0, 50.0, 20.0), "a", &placement());
        store.create(0, PdfRect::new(0.0, 40.0, 50.0, 60.0), "b", &placement());

        assert!(store.commit(id, Some(&placement())));
        assert!(!store.get(id).unwrap().is_editing());

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn reposition_shows_only_current_page() {
        let mut store = store();
        let rect = PdfRect::new(10.0, 10.0, 60.0, 30.0);
        let first = store.create(0, rect, "a", &placement());
        let second = store.create(1, rect, "b", &placement());

        store.reposition(1, Some(&placement()));
        assert!(!store.get(first).unwrap().widget().unwrap().is_visible());
        assert!(store.get(second).unwrap().widget().unwrap().is_visible());

        store.reposition(1, None);
        assert!(!store.get(second).unwrap().widget().unwrap().is_visible());
        assert_eq!(store.hit_test(1, Point::new(30.0, 35.0)), None);
    }

    #[test]
    fn reposition_snaps_uncommitted_widgets_back() {
        let mut store = store();
        let id = store.create(0, PdfRect::new(100.0, 100.0, 200.0, 130.0), "a", &placement());
        store.press(id, Point::new(120.0, 125.0));
        store.motion(id, Point::new(170.0, 175.0));
        store.release(id);

        store.reposition(0, Some(&placement()));
        let geometry = store.get(id).unwrap().widget().unwrap().geometry();
        assert_eq!(geometry.origin(), Point::new(110.0, 120.0));
    }

    #[test]
    fn reposition_keeps_mapped_size_of_small_regions() {
        let mut store = store();
        let id = store.create(0, PdfRect::new(100.0, 100.0, 110.0, 105.0), "a", &placement());
        let created = store.get(id).unwrap().widget().unwrap().geometry();
        assert_eq!(created, ScreenRect::new(110.0, 120.0, 30.0, 20.0));

        store.reposition(0, Some(&placement()));
        let placed = store.get(id).unwrap().widget().unwrap().geometry();
        assert_eq!(placed, ScreenRect::new(110.0, 120.0, 10.0, 5.0));
    }

    #[test]
    fn commit_all_only_moves_current_page() {
        let mut store = store();
        let rect = PdfRect::new(100.0, 100.0, 200.0, 130.0);
        let here = store.create(0, rect, "here", &placement());
        let there = store.create(3, rect, "there", &placement());
        store.press(there, Point::new(120.0, 125.0));
        store.motion(there, Point::new(170.0, 175.0));

        assert_eq!(store.commit_all(0, Some(&placement())), 2);
        assert!(close(store.get(here).unwrap().pdf_rect.x0, 100.0));
        assert_eq!(store.get(there).unwrap().pdf_rect, rect);
        assert_eq!(store.committed_edits().len(), 2);
    }
}
