//! Pagination layout.
//!
//! Places the report title, captions and images top to bottom in page
//! coordinates (points, origin at the top-left corner). Images are scaled to
//! the printable width; an image that would cross the bottom margin starts a
//! new page. Images taller than a page are placed at the top of a fresh page
//! and left to overflow.

use crate::config::PageGeometry;
use crate::convert::RasterImage;
use serde::Serialize;

/// Vertical position on the current page plus the page size
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutCursor {
    pub vertical_offset: f32,
    pub page_width: f32,
    pub page_height: f32,
}

/// Rectangle in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub page: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Placement {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlacedItem {
    /// `y` is the text baseline
    Text {
        text: String,
        x: f32,
        y: f32,
        font_size: f32,
    },
    Image {
        image: RasterImage,
        placement: Placement,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<PlacedItem>,
}

/// Finished layout, ready to be written out
#[derive(Debug, Clone, PartialEq)]
pub struct PagedLayout {
    pub geometry: PageGeometry,
    pub pages: Vec<Page>,
}

impl PagedLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn images(&self) -> impl Iterator<Item = &Placement> {
        self.pages.iter().flat_map(|p| p.items.iter()).filter_map(|item| match item {
            PlacedItem::Image { placement, .. } => Some(placement),
            PlacedItem::Text { .. } => None,
        })
    }

    /// Text items in document order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flat_map(|p| p.items.iter()).filter_map(|item| match item {
            PlacedItem::Text { text, .. } => Some(text.as_str()),
            PlacedItem::Image { .. } => None,
        })
    }
}

/// Places items and breaks pages
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    geometry: PageGeometry,
    cursor: LayoutCursor,
    pages: Vec<Page>,
}

impl LayoutEngine {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            cursor: LayoutCursor {
                vertical_offset: geometry.top_margin,
                page_width: geometry.width,
                page_height: geometry.height,
            },
            pages: vec![Page::default()],
        }
    }

    pub fn cursor(&self) -> LayoutCursor {
        self.cursor
    }

    pub fn current_page(&self) -> usize {
        self.pages.len() - 1
    }

    fn push(&mut self, item: PlacedItem) {
        if let Some(page) = self.pages.last_mut() {
            page.items.push(item);
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.cursor.vertical_offset = self.geometry.top_margin;
        log::debug!("page break, now on page {}", self.pages.len());
    }

    /// Report title at the top margin; the first caption starts below it
    pub fn place_report_title(&mut self, title: &str) {
        self.push(PlacedItem::Text {
            text: title.to_string(),
            x: self.geometry.side_margin,
            y: self.geometry.top_margin,
            font_size: self.geometry.title_font_size,
        });
        self.cursor.vertical_offset = self.geometry.first_offset;
    }

    /// Caption at the current offset, then one line down
    pub fn place_title(&mut self, caption: &str) {
        self.push(PlacedItem::Text {
            text: caption.to_string(),
            x: self.geometry.side_margin,
            y: self.cursor.vertical_offset,
            font_size: self.geometry.caption_font_size,
        });
        self.cursor.vertical_offset += self.geometry.line_height;
    }

    /// Size `image` to the printable width, breaking the page first if it
    /// would cross the bottom margin
    pub fn place_image(&mut self, image: RasterImage) -> Placement {
        let width = self.geometry.content_width();
        let height = width * image.aspect();
        let limit = self.geometry.height - self.geometry.bottom_margin;
        let page_has_content = self.pages.last().is_some_and(|p| !p.items.is_empty());
        if self.cursor.vertical_offset + height > limit && page_has_content {
            self.new_page();
        }
        let placement = Placement {
            page: self.current_page(),
            x: self.geometry.side_margin,
            y: self.cursor.vertical_offset,
            width,
            height,
        };
        self.push(PlacedItem::Image { image, placement });
        self.cursor.vertical_offset += height + self.geometry.spacing;
        placement
    }

    pub fn finish(self) -> PagedLayout {
        PagedLayout {
            geometry: self.geometry,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32, height: u32) -> RasterImage {
        RasterImage {
            data: Vec::new(),
            width,
            height,
        }
    }

    #[test]
    fn title_then_first_caption_at_80() {
        let mut engine = LayoutEngine::new(PageGeometry::a4());
        engine.place_report_title("Reporte");
        assert_eq!(engine.cursor().vertical_offset, 80.0);
        engine.place_title("Producción por Año");
        assert_eq!(engine.cursor().vertical_offset, 104.0);
        let layout = engine.finish();
        match &layout.pages[0].items[0] {
            PlacedItem::Text { x, y, font_size, .. } => assert_eq!((*x, *y, *font_size), (24.0, 40.0, 24.0)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn images_keep_aspect_ratio_at_printable_width() {
        let mut engine = LayoutEngine::new(PageGeometry::a4());
        engine.place_report_title("t");
        let p = engine.place_image(image(700, 300));
        let width = 595.28 - 48.0;
        assert!((p.width - width).abs() < 1e-3);
        assert!((p.height - width * 300.0 / 700.0).abs() < 1e-3);
        assert_eq!(p.y, 80.0);
        assert!((engine.cursor().vertical_offset - (80.0 + p.height + 24.0)).abs() < 1e-3);
    }

    #[test]
    fn image_crossing_bottom_margin_starts_new_page() {
        let mut engine = LayoutEngine::new(PageGeometry::a4());
        engine.place_report_title("t");
        let mut placements = Vec::new();
        for _ in 0..4 {
            engine.place_title("c");
            placements.push(engine.place_image(image(700, 300)));
        }
        let limit = 841.89 - 40.0;
        for p in &placements {
            assert!(p.bottom() <= limit);
        }
        assert_eq!(placements[2].page, 1);
        assert_eq!(placements[2].y, 40.0);
        let layout = engine.finish();
        assert_eq!(layout.page_count(), 2);
        assert_eq!(layout.images().count(), 4);
    }

    #[test]
    fn oversized_image_overflows_fresh_page() {
        let geometry = PageGeometry::a4().with_size(428.0, 841.89);
        let mut engine = LayoutEngine::new(geometry);
        engine.place_report_title("t");
        engine.place_title("X");
        let p = engine.place_image(image(400, 4000));
        assert_eq!(p.width, 380.0);
        assert_eq!(p.height, 3800.0);
        assert_eq!(p.page, 1);
        assert_eq!(p.y, 40.0);
        assert_eq!(engine.finish().page_count(), 2);
    }

    #[test]
    fn empty_page_is_not_broken_again() {
        let mut engine = LayoutEngine::new(PageGeometry::a4());
        let p = engine.place_image(image(100, 1000));
        assert_eq!(p.page, 0);
        assert_eq!(p.y, 40.0);
    }

    #[test]
    fn caption_may_end_a_page() {
        let mut engine = LayoutEngine::new(PageGeometry::a4());
        engine.place_report_title("t");
        engine.place_title("a");
        engine.place_image(image(100, 120));
        engine.place_title("b");
        engine.place_image(image(100, 100));
        let layout = engine.finish();
        assert_eq!(layout.texts().collect::<Vec<_>>(), vec!["t", "a", "b"]);
        assert_eq!(layout.pages[0].items.len(), 4);
        assert_eq!(layout.pages[1].items.len(), 1);
    }
}
