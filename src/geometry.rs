//! Coordinate spaces for page editing
//!
//! Three spaces are involved when a click lands on a rendered page:
//! - PDF user space (points, top-left page origin as reported by MuPDF)
//! - full-render space (pixels of the page rasterized at the zoom factor)
//! - display space (pixels of the preview after it was fitted to the frame)
//!
//! The conversions are plain scale + translate steps. [`CoordinateMapper`]
//! bundles the factors of one render pass.

use serde::{Deserialize, Serialize};

/// A point in any of the coordinate spaces
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    #[must_use]
    pub fn distance_squared(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Rectangle in PDF user space, stored as corners
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PdfRect {
    /// Build a rectangle, swapping corners so that `x0 <= x1` and `y0 <= y1`
    #[must_use]
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    #[must_use]
    pub fn from_origin_size(origin: Point, width: f64, height: f64) -> Self {
        Self::new(origin.x, origin.y, origin.x + width, origin.y + height)
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x0, self.y0)
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Inclusive containment, a point on the edge is inside
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        self.x0 <= p.x && p.x <= self.x1 && self.y0 <= p.y && p.y <= self.y1
    }

    #[must_use]
    pub fn union(&self, other: &PdfRect) -> PdfRect {
        PdfRect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64) -> PdfRect {
        PdfRect {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }
}

/// Axis-aligned rectangle on screen: top-left origin plus size
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64) -> ScreenRect {
        ScreenRect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grow the size up to a minimum, keeping the origin
    #[must_use]
    pub fn at_least(&self, min_width: f64, min_height: f64) -> ScreenRect {
        ScreenRect::new(
            self.x,
            self.y,
            self.width.max(min_width),
            self.height.max(min_height),
        )
    }
}

/// Width and height in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Shrink to fit inside `bounds` keeping the aspect ratio. Never enlarges.
    #[must_use]
    pub fn fit_within(self, bounds: Size) -> Size {
        if self.width == 0 || self.height == 0 {
            return self;
        }
        if self.width <= bounds.width && self.height <= bounds.height {
            return self;
        }

        let ratio_w = f64::from(bounds.width) / f64::from(self.width);
        let ratio_h = f64::from(bounds.height) / f64::from(self.height);
        let ratio = ratio_w.min(ratio_h);

        let width = (f64::from(self.width) * ratio).round().max(1.0) as u32;
        let height = (f64::from(self.height) * ratio).round().max(1.0) as u32;
        Size::new(width.min(bounds.width.max(1)), height.min(bounds.height.max(1)))
    }
}

/// Where the preview image sits on screen for the last render pass
///
/// `container` is the widget holding the image, positioned in frame
/// coordinates (the space overlay widgets are placed in). The image is
/// centred in the container.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplayGeometry {
    pub container_x: f64,
    pub container_y: f64,
    pub image_left: f64,
    pub image_top: f64,
    pub image_width: f64,
    pub image_height: f64,
}

impl DisplayGeometry {
    #[must_use]
    pub fn centered(container: ScreenRect, image: Size) -> Self {
        let image_width = f64::from(image.width);
        let image_height = f64::from(image.height);
        Self {
            container_x: container.x,
            container_y: container.y,
            image_left: ((container.width - image_width) / 2.0).max(0.0),
            image_top: ((container.height - image_height) / 2.0).max(0.0),
            image_width,
            image_height,
        }
    }

    /// Top-left corner of the image in frame coordinates
    #[must_use]
    pub fn image_origin(&self) -> Point {
        Point::new(
            self.container_x + self.image_left,
            self.container_y + self.image_top,
        )
    }

    /// Container-relative point (as delivered by a click on the container)
    /// to image-relative display space, clamped into the image.
    #[must_use]
    pub fn container_to_image(&self, p: Point) -> Point {
        let max_x = (self.image_width - 1.0).max(0.0);
        let max_y = (self.image_height - 1.0).max(0.0);
        Point::new(
            (p.x - self.image_left).clamp(0.0, max_x),
            (p.y - self.image_top).clamp(0.0, max_y),
        )
    }

    /// Image-relative display rect to frame coordinates
    #[must_use]
    pub fn image_to_frame(&self, r: ScreenRect) -> ScreenRect {
        let o = self.image_origin();
        r.translate(o.x, o.y)
    }

    /// Frame rect back to image-relative display space, clamped so the
    /// region stays within the displayed image.
    #[must_use]
    pub fn frame_to_image_clamped(&self, r: ScreenRect) -> ScreenRect {
        let o = self.image_origin();
        let max_x = (self.image_width - 1.0).max(0.0);
        let max_y = (self.image_height - 1.0).max(0.0);
        let x = (r.x - o.x).clamp(0.0, max_x);
        let y = (r.y - o.y).clamp(0.0, max_y);
        let width = r.width.min(self.image_width - x).max(0.0);
        let height = r.height.min(self.image_height - y).max(0.0);
        ScreenRect::new(x, y, width, height)
    }
}

/// Converts between PDF, full-render and display space for one render pass
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    page_origin: Point,
    zoom: f64,
    scale: f64,
}

impl CoordinateMapper {
    /// `None` when the display scale is undefined (nothing laid out yet)
    /// or the zoom is unusable.
    #[must_use]
    pub fn new(page_origin: Point, zoom: f64, full_width: f64, display_width: f64) -> Option<Self> {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        if !usable(display_width) || !usable(full_width) || !usable(zoom) {
            return None;
        }
        let scale = full_width / display_width;
        Some(Self {
            page_origin,
            zoom,
            scale,
        })
    }

    /// Display scale `S = full width / display width`
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub fn pdf_to_full(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.page_origin.x) * self.zoom,
            (p.y - self.page_origin.y) * self.zoom,
        )
    }

    #[must_use]
    pub fn full_to_display(&self, p: Point) -> Point {
        Point::new(p.x / self.scale, p.y / self.scale)
    }

    #[must_use]
    pub fn display_to_full(&self, p: Point) -> Point {
        Point::new(p.x * self.scale, p.y * self.scale)
    }

    #[must_use]
    pub fn full_to_pdf(&self, p: Point) -> Point {
        Point::new(
            self.page_origin.x + p.x / self.zoom,
            self.page_origin.y + p.y / self.zoom,
        )
    }

    #[must_use]
    pub fn pdf_to_display(&self, p: Point) -> Point {
        self.full_to_display(self.pdf_to_full(p))
    }

    #[must_use]
    pub fn display_to_pdf(&self, p: Point) -> Point {
        self.full_to_pdf(self.display_to_full(p))
    }

    /// PDF rectangle to an image-relative display rectangle
    #[must_use]
    pub fn pdf_rect_to_display(&self, r: &PdfRect) -> ScreenRect {
        let top_left = self.pdf_to_display(Point::new(r.x0, r.y0));
        let bottom_right = self.pdf_to_display(Point::new(r.x1, r.y1));
        ScreenRect::new(
            top_left.x,
            top_left.y,
            bottom_right.x - top_left.x,
            bottom_right.y - top_left.y,
        )
    }

    /// Image-relative display rectangle back to PDF space
    #[must_use]
    pub fn display_rect_to_pdf(&self, r: &ScreenRect) -> PdfRect {
        let top_left = self.display_to_pdf(r.origin());
        let width = r.width * self.scale / self.zoom;
        let height = r.height * self.scale / self.zoom;
        PdfRect::from_origin_size(top_left, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
    }

    fn rect_close(a: &PdfRect, b: &PdfRect) -> bool {
        close(a.x0, b.x0) && close(a.y0, b.y0) && close(a.x1, b.x1) && close(a.y1, b.y1)
    }

    #[test]
    fn zero_display_width_has_no_mapping() {
        assert!(CoordinateMapper::new(Point::default(), 1.8, 1071.0, 0.0).is_none());
        assert!(CoordinateMapper::new(Point::default(), 1.8, 0.0, 500.0).is_none());
        assert!(CoordinateMapper::new(Point::default(), 0.0, 1071.0, 500.0).is_none());
        assert!(CoordinateMapper::new(Point::default(), 1.8, 1071.0, f64::NAN).is_none());
    }

    #[test]
    fn pdf_to_display_follows_zoom_then_scale() {
        let mapper = CoordinateMapper::new(Point::new(0.0, 0.0), 2.0, 1000.0, 500.0).unwrap();
        assert_eq!(mapper.scale(), 2.0);

        let p = mapper.pdf_to_display(Point::new(100.0, 50.0));
        assert_eq!(p, Point::new(100.0, 50.0));

        let full = mapper.pdf_to_full(Point::new(100.0, 50.0));
        assert_eq!(full, Point::new(200.0, 100.0));
    }

    #[test]
    fn page_origin_is_subtracted_and_restored() {
        let mapper = CoordinateMapper::new(Point::new(10.0, 20.0), 1.0, 600.0, 600.0).unwrap();
        assert_eq!(mapper.pdf_to_display(Point::new(10.0, 20.0)), Point::new(0.0, 0.0));
        assert_eq!(mapper.display_to_pdf(Point::new(0.0, 0.0)), Point::new(10.0, 20.0));
    }

    #[test]
    fn rect_round_trip_is_identity() {
        let rects = [
            PdfRect::new(0.0, 0.0, 10.0, 5.0),
            PdfRect::new(72.5, 100.25, 300.125, 118.0),
            PdfRect::new(-5.0, -3.0, 612.0, 792.0),
        ];
        let factors = [(1.0, 1.0), (1.8, 2.142), (2.0, 0.5), (0.37, 13.0)];

        for rect in &rects {
            for &(zoom, scale) in &factors {
                let full_width = 1000.0;
                let mapper = CoordinateMapper::new(
                    Point::new(3.0, 4.0),
                    zoom,
                    full_width,
                    full_width / scale,
                )
                .unwrap();
                let back = mapper.display_rect_to_pdf(&mapper.pdf_rect_to_display(rect));
                assert!(rect_close(&back, rect), "{rect:?} -> {back:?} (Z={zoom}, S={scale})");
            }
        }
    }

    #[test]
    fn pdf_rect_normalizes_corners() {
        let r = PdfRect::new(20.0, 5.0, 0.0, 0.0);
        assert_eq!(r, PdfRect::new(0.0, 0.0, 20.0, 5.0));
        assert!(r.contains(Point::new(20.0, 5.0)));
    }

    #[test]
    fn fit_within_shrinks_only() {
        let full = Size::new(1102, 1426);
        assert_eq!(full.fit_within(Size::new(2000, 2000)), full);

        let fitted = full.fit_within(Size::new(551, 1000));
        assert_eq!(fitted.width, 551);
        assert_eq!(fitted.height, 713);
    }

    #[test]
    fn image_is_centered_in_container() {
        let geometry =
            DisplayGeometry::centered(ScreenRect::new(20.0, 30.0, 700.0, 500.0), Size::new(300, 500));
        assert_eq!(geometry.image_left, 200.0);
        assert_eq!(geometry.image_top, 0.0);
        assert_eq!(geometry.image_origin(), Point::new(220.0, 30.0));
    }

    #[test]
    fn container_points_are_clamped_into_image() {
        let geometry =
            DisplayGeometry::centered(ScreenRect::new(0.0, 0.0, 400.0, 400.0), Size::new(200, 100));
        let p = geometry.container_to_image(Point::new(10.0, 390.0));
        assert_eq!(p, Point::new(0.0, 99.0));
    }

    #[test]
    fn frame_rect_is_clamped_to_image_extent() {
        let geometry =
            DisplayGeometry::centered(ScreenRect::new(0.0, 0.0, 200.0, 100.0), Size::new(200, 100));
        let r = geometry.frame_to_image_clamped(ScreenRect::new(180.0, -10.0, 50.0, 30.0));
        assert_eq!(r, ScreenRect::new(180.0, 0.0, 20.0, 30.0));
    }
}
