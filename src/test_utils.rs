pub mod test_helpers {
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use lopdf::{Dictionary, Document, Object, Stream};

    use crate::event_source::{EditorEvent, SimulatedEventSource};
    use crate::format::TextFormat;
    use crate::geometry::{PdfRect, Point, ScreenRect};
    use crate::overlay::{EditWidget, TextBox, WidgetError, WidgetFactory};
    use crate::pdf::{DocumentProvider, ImageData, PdfError, WordBox};

    /// In-memory document with letter-sized blank pages
    #[derive(Debug, Clone)]
    pub struct FakeDocument {
        path: PathBuf,
        rects: Vec<PdfRect>,
        words: HashMap<usize, Vec<WordBox>>,
        texts: HashMap<usize, String>,
        unreadable: bool,
    }

    impl FakeDocument {
        pub fn new(page_count: usize) -> Self {
            Self {
                path: PathBuf::from("fake.pdf"),
                rects: vec![PdfRect::new(0.0, 0.0, 612.0, 792.0); page_count],
                words: HashMap::new(),
                texts: HashMap::new(),
                unreadable: false,
            }
        }

        pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
            self.path = path.into();
            self
        }

        pub fn with_page_rect(mut self, page: usize, rect: PdfRect) -> Self {
            self.rects[page] = rect;
            self
        }

        pub fn with_words(mut self, page: usize, words: Vec<WordBox>) -> Self {
            self.words.insert(page, words);
            self
        }

        /// One text line made of `(word, x0, x1)` triples at `y0..y1`
        pub fn with_line(mut self, page: usize, block: usize, line: usize, y: (f64, f64), words: &[(&str, f64, f64)]) -> Self {
            let entry = self.words.entry(page).or_default();
            for (i, (text, x0, x1)) in words.iter().enumerate() {
                entry.push(WordBox::new(PdfRect::new(*x0, y.0, *x1, y.1), *text, block, line, i));
            }
            self
        }

        pub fn with_text(mut self, page: usize, text: &str) -> Self {
            self.texts.insert(page, text.to_string());
            self
        }

        /// Every text extraction fails
        pub fn unreadable(mut self) -> Self {
            self.unreadable = true;
            self
        }

        fn check_text(&self, page: usize) -> Result<(), PdfError> {
            PdfError::check_page(page, self.page_count())?;
            if self.unreadable {
                return Err(PdfError::generic("text layer is damaged"));
            }
            Ok(())
        }
    }

    impl DocumentProvider for FakeDocument {
        fn path(&self) -> &Path {
            &self.path
        }

        fn page_count(&self) -> usize {
            self.rects.len()
        }

        fn page_rect(&self, page: usize) -> Result<PdfRect, PdfError> {
            PdfError::check_page(page, self.page_count())?;
            Ok(self.rects[page])
        }

        fn render_page(&self, page: usize, zoom: f32) -> Result<ImageData, PdfError> {
            let rect = self.page_rect(page)?;
            let zoom = f64::from(zoom);
            let width = (rect.width() * zoom).round().max(1.0) as u32;
            let height = (rect.height() * zoom).round().max(1.0) as u32;
            Ok(ImageData::blank(width, height))
        }

        fn words(&self, page: usize) -> Result<Vec<WordBox>, PdfError> {
            self.check_text(page)?;
            Ok(self.words.get(&page).cloned().unwrap_or_default())
        }

        fn page_text(&self, page: usize) -> Result<String, PdfError> {
            self.check_text(page)?;
            Ok(self.texts.get(&page).cloned().unwrap_or_default())
        }
    }

    /// Opener producing fake documents of `page_count` pages for any path
    pub fn fake_opener(
        page_count: usize,
    ) -> impl Fn(&Path) -> Result<Box<dyn DocumentProvider>, PdfError> {
        move |path: &Path| {
            let doc: Box<dyn DocumentProvider> =
                Box::new(FakeDocument::new(page_count).with_path(path));
            Ok(doc)
        }
    }

    /// Letter-sized PDF whose pages show `<prefix>-Page-<n>`
    pub fn sample_pdf(num_pages: u32, content_prefix: &str) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();
        for page_num in 0..num_pages {
            let content = format!(
                "BT /F1 12 Tf 50 700 Td ({}-Page-{}) Tj ET",
                content_prefix,
                page_num + 1
            );
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

            let mut page_dict = Dictionary::new();
            page_dict.set("Type", Object::Name(b"Page".to_vec()));
            page_dict.set("Parent", Object::Reference(pages_id));
            page_dict.set("Contents", Object::Reference(content_id));
            page_dict.set(
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            );
            let page_id = doc.add_object(page_dict);
            page_ids.push(Object::Reference(page_id));
        }

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Count", Object::Integer(i64::from(num_pages)));
        pages_dict.set("Kids", Object::Array(page_ids));
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let mut catalog_dict = Dictionary::new();
        catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog_dict.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog_dict);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        doc
    }

    /// Write [`sample_pdf`] to `path`
    pub fn write_sample_pdf(path: &Path, num_pages: u32, content_prefix: &str) {
        sample_pdf(num_pages, content_prefix).save(path).unwrap();
    }

    /// Text box factory that counts destroyed widgets
    #[derive(Debug, Clone, Default)]
    pub struct RecordingWidgetFactory {
        destroyed: Rc<Cell<usize>>,
    }

    impl RecordingWidgetFactory {
        pub fn destroyed(&self) -> usize {
            self.destroyed.get()
        }
    }

    struct RecordingWidget {
        inner: TextBox,
        destroyed: Rc<Cell<usize>>,
    }

    impl WidgetFactory for RecordingWidgetFactory {
        fn create(&self, rect: ScreenRect, text: &str) -> Box<dyn EditWidget> {
            Box::new(RecordingWidget {
                inner: TextBox::new(rect, text),
                destroyed: Rc::clone(&self.destroyed),
            })
        }
    }

    /// Factory whose widgets always fail to destroy
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FailingWidgetFactory;

    struct FailingWidget(TextBox);

    impl WidgetFactory for FailingWidgetFactory {
        fn create(&self, rect: ScreenRect, text: &str) -> Box<dyn EditWidget> {
            Box::new(FailingWidget(TextBox::new(rect, text)))
        }
    }

    macro_rules! delegate_widget {
        ($inner:tt) => {
            fn geometry(&self) -> ScreenRect {
                self.$inner.geometry()
            }
            fn place(&mut self, rect: ScreenRect) {
                self.$inner.place(rect)
            }
            fn hide(&mut self) {
                self.$inner.hide()
            }
            fn is_visible(&self) -> bool {
                self.$inner.is_visible()
            }
            fn text(&self) -> String {
                self.$inner.text()
            }
            fn set_text(&mut self, text: &str) {
                self.$inner.set_text(text)
            }
            fn apply_format(&mut self, format: &TextFormat) {
                self.$inner.apply_format(format)
            }
            fn format(&self) -> Option<&TextFormat> {
                self.$inner.format()
            }
        };
    }

    impl EditWidget for RecordingWidget {
        delegate_widget!(inner);

        fn destroy(&mut self) -> Result<(), WidgetError> {
            self.destroyed.set(self.destroyed.get() + 1);
            self.inner.destroy()
        }
    }

    impl EditWidget for FailingWidget {
        delegate_widget!(0);

        fn destroy(&mut self) -> Result<(), WidgetError> {
            Err(WidgetError::Backend("toolkit refused".to_string()))
        }
    }

    /// Builder for scripted editor sessions
    #[derive(Default)]
    pub struct ScriptBuilder {
        events: Vec<EditorEvent>,
    }

    impl ScriptBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn render(mut self, width: f64, height: f64) -> Self {
            self.events.push(EditorEvent::Render { width, height });
            self
        }

        pub fn toggle_editor(mut self) -> Self {
            self.events.push(EditorEvent::ToggleEditor);
            self
        }

        pub fn double_click(mut self, x: f64, y: f64) -> Self {
            self.events.push(EditorEvent::DoubleClick { x, y });
            self
        }

        /// Press, one motion and release at frame coordinates
        pub fn drag(mut self, from: Point, to: Point) -> Self {
            self.events.push(EditorEvent::Press { x: from.x, y: from.y });
            self.events.push(EditorEvent::Motion { x: to.x, y: to.y });
            self.events.push(EditorEvent::Release);
            self
        }

        pub fn type_text(mut self, text: &str) -> Self {
            self.events.push(EditorEvent::Type {
                text: text.to_string(),
            });
            self
        }

        pub fn commit(mut self) -> Self {
            self.events.push(EditorEvent::Commit);
            self
        }

        pub fn next_page(mut self) -> Self {
            self.events.push(EditorEvent::NextPage);
            self
        }

        pub fn event(mut self, event: EditorEvent) -> Self {
            self.events.push(event);
            self
        }

        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use crate::event_source::EventSource;
    use crate::geometry::Point;
    use crate::pdf::DocumentProvider;

    #[test]
    fn script_builder_collects_events() {
        let mut script = ScriptBuilder::new()
            .render(800.0, 600.0)
            .toggle_editor()
            .double_click(10.0, 10.0)
            .drag(Point::new(1.0, 1.0), Point::new(2.0, 2.0))
            .commit()
            .build();

        let mut count = 0;
        while script.poll().unwrap() {
            script.read().unwrap();
            count += 1;
        }
        assert_eq!(count, 7);
    }

    #[test]
    fn fake_document_renders_at_zoom() {
        let doc = FakeDocument::new(1);
        let image = doc.render_page(0, 1.8).unwrap();
        assert_eq!((image.width_px, image.height_px), (1102, 1426));
        assert!(doc.render_page(1, 1.0).is_err());
    }
}
