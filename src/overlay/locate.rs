//! Picking the editable region under a click

use crate::geometry::{PdfRect, Point};
use crate::pdf::WordBox;

/// Fraction of the page size used when the page has no text
const EMPTY_PAGE_WIDTH_FRACTION: f64 = 0.30;
const EMPTY_PAGE_HEIGHT_FRACTION: f64 = 0.02;

#[derive(Clone, Debug, PartialEq)]
pub struct LocatedRegion {
    pub rect: PdfRect,
    pub text: String,
}

/// Region to edit for a click at `point` (PDF space).
///
/// The word under the click wins, otherwise the word whose centre is
/// closest; equal distances keep the earlier word. The result covers the
/// whole text line of that word. A page without words yields an empty box
/// anchored at the click.
pub fn locate_region_at(words: &[WordBox], page_rect: &PdfRect, point: Point) -> LocatedRegion {
    let Some(hit) = word_at(words, point) else {
        return LocatedRegion {
            rect: PdfRect::from_origin_size(
                point,
                page_rect.width() * EMPTY_PAGE_WIDTH_FRACTION,
                page_rect.height() * EMPTY_PAGE_HEIGHT_FRACTION,
            ),
            text: String::new(),
        };
    };

    let mut line: Vec<&WordBox> = words.iter().filter(|w| w.same_line(hit)).collect();
    line.sort_by_key(|w| w.word);

    let rect = line
        .iter()
        .skip(1)
        .fold(line[0].rect, |acc, w| acc.union(&w.rect));
    let text = line
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    LocatedRegion { rect, text }
}

fn word_at(words: &[WordBox], point: Point) -> Option<&WordBox> {
    if let Some(containing) = words.iter().find(|w| w.rect.contains(point)) {
        return Some(containing);
    }

    let mut best: Option<(&WordBox, f64)> = None;
    for word in words {
        let distance = word.center().distance_squared(point);
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((word, distance)),
        }
    }
    best.map(|(word, _)| word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PdfRect {
        PdfRect::new(0.0, 0.0, 612.0, 792.0)
    }

    fn hello_world() -> Vec<WordBox> {
        vec![
            WordBox::new(PdfRect::new(0.0, 0.0, 10.0, 5.0), "Hello", 0, 0, 0),
            WordBox::new(PdfRect::new(12.0, 0.0, 20.0, 5.0), "World", 0, 0, 1),
        ]
    }

    #[test]
    fn click_on_word_selects_its_line() {
        let region = locate_region_at(&hello_world(), &page(), Point::new(5.0, 2.0));
        assert_eq!(region.rect, PdfRect::new(0.0, 0.0, 20.0, 5.0));
        assert_eq!(region.text, "Hello World");
    }

    #[test]
    fn click_between_lines_uses_nearest_word() {
        let mut words = hello_world();
        words.push(WordBox::new(PdfRect::new(0.0, 50.0, 30.0, 55.0), "Footer", 1, 0, 0));

        let region = locate_region_at(&words, &page(), Point::new(15.0, 40.0));
        assert_eq!(region.text, "Footer");
        assert_eq!(region.rect, PdfRect::new(0.0, 50.0, 30.0, 55.0));
    }

    #[test]
    fn equal_distance_keeps_first_word() {
        let words = vec![
            WordBox::new(PdfRect::new(0.0, 0.0, 10.0, 10.0), "first", 0, 0, 0),
            WordBox::new(PdfRect::new(20.0, 0.0, 30.0, 10.0), "second", 1, 0, 0),
        ];
        let region = locate_region_at(&words, &page(), Point::new(15.0, 5.0));
        assert_eq!(region.text, "first");
    }

    #[test]
    fn line_words_are_ordered_by_index() {
        let words = vec![
            WordBox::new(PdfRect::new(40.0, 0.0, 60.0, 8.0), "c", 2, 3, 2),
            WordBox::new(PdfRect::new(0.0, 0.0, 10.0, 8.0), "a", 2, 3, 0),
            WordBox::new(PdfRect::new(0.0, 20.0, 10.0, 28.0), "other", 2, 4, 0),
            WordBox::new(PdfRect::new(20.0, 0.0, 30.0, 10.0), "b", 2, 3, 1),
        ];
        let region = locate_region_at(&words, &page(), Point::new(25.0, 4.0));
        assert_eq!(region.text, "a b c");
        assert_eq!(region.rect, PdfRect::new(0.0, 0.0, 60.0, 10.0));
    }

    #[test]
    fn empty_page_gives_box_at_click() {
        let region = locate_region_at(&[], &page(), Point::new(100.0, 200.0));
        assert_eq!(region.text, "");
        assert!((region.rect.x0 - 100.0).abs() < 1e-9);
        assert!((region.rect.y0 - 200.0).abs() < 1e-9);
        assert!((region.rect.width() - 183.6).abs() < 1e-9);
        assert!((region.rect.height() - 15.84).abs() < 1e-9);
    }
}
