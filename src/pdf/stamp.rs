//! Burning finalised text edits into a PDF
//!
//! Every edit paints its region white and writes the replacement text on
//! top, wrapped to the region width and clipped to the region. Text is set
//! in one of the standard 14 fonts, so nothing has to be embedded.
//!
//! Edit rectangles arrive in MuPDF page space (top-left origin, relative to
//! the visible page box). PDF content streams use a bottom-left origin:
//! ```text
//! pdf_x = box.x0 + x
//! pdf_y = box.y1 - y
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

use super::error::PdfError;
use super::types::PageEdit;
use crate::format::TextFormat;
use crate::geometry::PdfRect;

/// Resource name of the font added to stamped pages
const FONT_KEY: &str = "PdfStudioF1";

const LINE_HEIGHT_FACTOR: f32 = 1.2;
const TEXT_PADDING: f32 = 1.0;

/// Page tree depth limit when looking up inherited attributes
const MAX_TREE_DEPTH: usize = 32;

const LETTER: PdfRect = PdfRect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// Stamp `edits` onto a copy of `source` written to `output`.
///
/// Returns how many edits were written. Edits whose text is blank are
/// skipped.
pub fn stamp_overlays(
    source: &Path,
    output: &Path,
    edits: &[PageEdit],
    format: &TextFormat,
) -> Result<usize, PdfError> {
    let mut doc = Document::load(source)
        .map_err(|e| PdfError::generic(format!("Failed to load {}: {e}", source.display())))?;

    let stamped = stamp_document(&mut doc, edits, format)?;
    doc.save(output).map_err(|e| PdfError::io(output, e))?;

    info!("Stamped {stamped} edits from {source:?} into {output:?}");
    Ok(stamped)
}

/// In-memory variant of [`stamp_overlays`]
pub fn stamp_document(
    doc: &mut Document,
    edits: &[PageEdit],
    format: &TextFormat,
) -> Result<usize, PdfError> {
    let pages = doc.get_pages();

    let mut by_page: BTreeMap<usize, Vec<&PageEdit>> = BTreeMap::new();
    for edit in edits {
        if edit.text.trim().is_empty() {
            debug!("Skipping blank edit on page {}", edit.page);
            continue;
        }
        PdfError::check_page(edit.page, pages.len())?;
        by_page.entry(edit.page).or_default().push(edit);
    }

    let mut stamped = 0;
    for (page, page_edits) in by_page {
        let page_id = u32::try_from(page + 1)
            .ok()
            .and_then(|number| pages.get(&number).copied())
            .ok_or(PdfError::PageOutOfRange {
                page,
                count: pages.len(),
            })?;

        let page_box = visible_box(doc, page_id);
        add_font_resource(doc, page_id, format.base_font())?;
        let operations = page_operations(&page_edits, &page_box, format);
        append_content(doc, page_id, Content { operations }.encode()?)?;

        stamped += page_edits.len();
    }

    Ok(stamped)
}

fn page_operations(edits: &[&PageEdit], page_box: &PdfRect, format: &TextFormat) -> Vec<Operation> {
    // Restore the page's own graphics state first, the prefix stream opened it
    let mut ops = vec![Operation::new("Q", vec![]), Operation::new("q", vec![])];

    ops.push(rgb_fill(1.0, 1.0, 1.0));
    for edit in edits {
        let (x, y, w, h) = to_pdf_box(&edit.rect, page_box);
        ops.push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
        ops.push(Operation::new("f", vec![]));
    }

    let (r, g, b) = format.rgb();
    let size = format.size;
    let leading = size * LINE_HEIGHT_FACTOR;

    for edit in edits {
        let (x, y, w, h) = to_pdf_box(&edit.rect, page_box);
        let lines = layout_lines(&edit.text, w, h, format);

        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
        ops.push(Operation::new("W", vec![]));
        ops.push(Operation::new("n", vec![]));
        ops.push(rgb_fill(r, g, b));
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec![Object::Name(FONT_KEY.as_bytes().to_vec()), size.into()]));
        ops.push(Operation::new("TL", vec![leading.into()]));
        ops.push(Operation::new(
            "Td",
            vec![(x + TEXT_PADDING).into(), (y + h - TEXT_PADDING - size).into()],
        ));
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                ops.push(Operation::new("T*", vec![]));
            }
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(line), StringFormat::Literal)],
            ));
        }
        ops.push(Operation::new("ET", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    ops.push(Operation::new("Q", vec![]));
    ops
}

fn rgb_fill(r: f32, g: f32, b: f32) -> Operation {
    Operation::new("rg", vec![r.into(), g.into(), b.into()])
}

/// Lower-left corner plus size in PDF space
fn to_pdf_box(rect: &PdfRect, page_box: &PdfRect) -> (f32, f32, f32, f32) {
    let x = page_box.x0 + rect.x0;
    let y = page_box.y1 - rect.y1;
    (x as f32, y as f32, rect.width() as f32, rect.height() as f32)
}

/// Wrap text to the region width, keeping only lines whose baseline fits
fn layout_lines(text: &str, width: f32, height: f32, format: &TextFormat) -> Vec<String> {
    let advance = format.size * format.family.average_advance() as f32;
    let usable_width = (width - 2.0 * TEXT_PADDING).max(0.0);
    let columns = if advance > 0.0 {
        ((usable_width / advance).floor() as usize).max(1)
    } else {
        1
    };

    let mut lines: Vec<String> = text
        .trim()
        .lines()
        .flat_map(|line| {
            let wrapped = textwrap::wrap(line, columns);
            if wrapped.is_empty() {
                vec![String::new()]
            } else {
                wrapped.into_iter().map(|l| l.into_owned()).collect()
            }
        })
        .collect();

    let leading = format.size * LINE_HEIGHT_FACTOR;
    let room = height - TEXT_PADDING - format.size;
    let max_lines = if room > 0.0 && leading > 0.0 {
        (room / leading).floor() as usize + 1
    } else {
        1
    };
    lines.truncate(max_lines);
    lines
}

/// Standard 14 fonts use WinAnsiEncoding, which agrees with Latin-1 outside
/// 0x80..0xA0. Everything else becomes `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x09 => b' ',
            code @ 0x20..=0x7E => code as u8,
            code @ 0xA0..=0xFF => code as u8,
            _ => b'?',
        })
        .collect()
}

/// CropBox, else MediaBox, both inheritable. Letter size when neither is
/// readable.
fn visible_box(doc: &Document, page_id: ObjectId) -> PdfRect {
    inherited_attribute(doc, page_id, b"CropBox")
        .as_ref()
        .and_then(rect_from_array)
        .or_else(|| {
            inherited_attribute(doc, page_id, b"MediaBox")
                .as_ref()
                .and_then(rect_from_array)
        })
        .unwrap_or(LETTER)
}

/// Look up `key` on the page, walking up the page tree when it is absent.
/// References are resolved one level.
pub(super) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value).clone());
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn rect_from_array(obj: &Object) -> Option<PdfRect> {
    let Object::Array(values) = obj else {
        return None;
    };
    let numbers: Vec<f64> = values
        .iter()
        .filter_map(|o| match o {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(f64::from(*r)),
            _ => None,
        })
        .collect();
    match numbers.as_slice() {
        [x0, y0, x1, y1] => Some(PdfRect::new(*x0, *y0, *x1, *y1)),
        _ => None,
    }
}

/// Register the base font under [`FONT_KEY`] in the page's own resources.
/// Inherited resources are copied onto the page first.
fn add_font_resource(doc: &mut Document, page_id: ObjectId, base_font: &str) -> Result<(), PdfError> {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    });

    let mut resources = match inherited_attribute(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict,
        _ => Dictionary::new(),
    };
    let mut fonts = match resources.get(b"Font") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => doc
            .get_dictionary(*id)
            .cloned()
            .unwrap_or_else(|_| Dictionary::new()),
        _ => Dictionary::new(),
    };
    fonts.set(FONT_KEY, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    match doc.get_object_mut(page_id)? {
        Object::Dictionary(page) => {
            page.set("Resources", Object::Dictionary(resources));
            Ok(())
        }
        _ => Err(PdfError::generic("Page object is not a dictionary")),
    }
}

/// Wrap the existing page content in `q`/`Q` and append `content` after it
fn append_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<(), PdfError> {
    let prefix_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let existing = match doc.get_dictionary(page_id)?.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(parts)) => parts.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(parts)) => parts.clone(),
        _ => Vec::new(),
    };

    let mut parts = Vec::with_capacity(existing.len() + 2);
    parts.push(Object::Reference(prefix_id));
    parts.extend(existing);
    parts.push(Object::Reference(content_id));

    match doc.get_object_mut(page_id)? {
        Object::Dictionary(page) => {
            page.set("Contents", Object::Array(parts));
            Ok(())
        }
        _ => Err(PdfError::generic("Page object is not a dictionary")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FontFamily;
    use crate::test_utils::test_helpers::sample_pdf as create_test_pdf;

    fn edit(page: usize, rect: PdfRect, text: &str) -> PageEdit {
        PageEdit {
            page,
            rect,
            text: text.to_string(),
        }
    }

    fn page_id(doc: &Document, page: u32) -> ObjectId {
        doc.get_pages()[&page]
    }

    fn decoded(doc: &Document, page: u32) -> Vec<Operation> {
        let bytes = doc.get_page_content(page_id(doc, page)).unwrap();
        Content::decode(&bytes).unwrap().operations
    }

    fn floats(op: &Operation) -> Vec<f32> {
        op.operands.iter().map(|o| o.as_float().unwrap()).collect()
    }

    #[test]
    fn stamps_only_the_targeted_page() {
        let mut doc = create_test_pdf(2, "Doc");
        let before = doc.get_page_content(page_id(&doc, 2)).unwrap();

        let count = stamp_document(
            &mut doc,
            &[edit(0, PdfRect::new(50.0, 100.0, 250.0, 120.0), "Replacement")],
            &TextFormat::default(),
        )
        .unwrap();

        assert_eq!(count, 1);
        let ops = decoded(&doc, 1);
        let shown: Vec<Vec<u8>> = ops
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match &op.operands[0] {
                Object::String(bytes, _) => Some(bytes.clone()),
                _ => None,
            })
            .collect();
        assert!(shown.contains(&b"Replacement".to_vec()));
        assert_eq!(doc.get_page_content(page_id(&doc, 2)).unwrap(), before);
    }

    #[test]
    fn rectangles_are_flipped_into_pdf_space() {
        let mut doc = create_test_pdf(1, "Doc");
        stamp_document(
            &mut doc,
            &[edit(0, PdfRect::new(50.0, 100.0, 150.0, 120.0), "x")],
            &TextFormat::default(),
        )
        .unwrap();

        let ops = decoded(&doc, 1);
        let first_rect = ops.iter().find(|op| op.operator == "re").unwrap();
        assert_eq!(floats(first_rect), vec![50.0, 672.0, 100.0, 20.0]);
    }

    #[test]
    fn blank_edits_are_skipped() {
        let mut doc = create_test_pdf(1, "Doc");
        let before = doc.get_page_content(page_id(&doc, 1)).unwrap();

        let count = stamp_document(
            &mut doc,
            &[edit(0, PdfRect::new(0.0, 0.0, 10.0, 10.0), "   ")],
            &TextFormat::default(),
        )
        .unwrap();

        assert_eq!(count, 0);
        assert_eq!(doc.get_page_content(page_id(&doc, 1)).unwrap(), before);
    }

    #[test]
    fn out_of_range_page_is_rejected() {
        let mut doc = create_test_pdf(1, "Doc");
        let err = stamp_document(
            &mut doc,
            &[edit(3, PdfRect::new(0.0, 0.0, 10.0, 10.0), "text")],
            &TextFormat::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PdfError::PageOutOfRange { page: 3, count: 1 }));
    }

    #[test]
    fn font_resource_uses_mapped_base_font() {
        let mut doc = create_test_pdf(1, "Doc");
        let format = TextFormat {
            family: FontFamily::TimesNewRoman,
            bold: true,
            ..TextFormat::default()
        };
        stamp_document(
            &mut doc,
            &[edit(0, PdfRect::new(0.0, 0.0, 100.0, 20.0), "bold")],
            &format,
        )
        .unwrap();

        let page = doc.get_dictionary(page_id(&doc, 1)).unwrap();
        let resources = page.get(b"Resources").and_then(Object::as_dict).unwrap();
        let fonts = resources.get(b"Font").and_then(Object::as_dict).unwrap();
        let font_id = fonts.get(FONT_KEY.as_bytes()).and_then(Object::as_reference).unwrap();
        let font = doc.get_dictionary(font_id).unwrap();
        assert_eq!(
            font.get(b"BaseFont").and_then(Object::as_name).unwrap(),
            b"Times-Bold"
        );
    }

    #[test]
    fn long_text_wraps_and_is_cut_to_the_region() {
        let format = TextFormat::default();
        let lines = layout_lines("one two three four five six seven", 40.0, 30.0, &format);
        // six columns per line, two baselines fit in 30pt
        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn non_latin_text_is_replaced() {
        assert_eq!(encode_win_ansi("café\t€"), b"caf\xe9 ?".to_vec());
    }

    #[test]
    fn inherited_media_box_is_used() {
        let mut doc = create_test_pdf(1, "Doc");
        let id = page_id(&doc, 1);
        let parent = doc
            .get_dictionary(id)
            .unwrap()
            .get(b"Parent")
            .and_then(Object::as_reference)
            .unwrap();
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(id) {
            page.remove(b"MediaBox");
        }
        if let Ok(Object::Dictionary(pages)) = doc.get_object_mut(parent) {
            pages.set(
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 300.into(), 400.into()]),
            );
        }

        assert_eq!(visible_box(&doc, id), PdfRect::new(0.0, 0.0, 300.0, 400.0));
    }

    #[test]
    fn stamped_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        create_test_pdf(2, "Doc").save(&source).unwrap();

        let count = stamp_overlays(
            &source,
            &output,
            &[
                edit(0, PdfRect::new(10.0, 10.0, 200.0, 40.0), "first"),
                edit(1, PdfRect::new(10.0, 10.0, 200.0, 40.0), "second"),
            ],
            &TextFormat::default(),
        )
        .unwrap();

        assert_eq!(count, 2);
        let doc = Document::load(&output).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }
}
