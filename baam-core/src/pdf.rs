//! PDF output with lopdf.
//!
//! Writes a [`PagedLayout`] as one page per layout page: Helvetica text in
//! WinAnsi encoding and PNG images as Flate-compressed RGB XObjects with a
//! soft mask for their alpha channel.

use crate::convert::RasterImage;
use crate::layout::{PagedLayout, PlacedItem};
use crate::Result;
use chrono::{DateTime, Local};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::Write;
use std::path::Path;

const FONT_NAME: &str = "F1";

/// Encode text for a WinAnsi Type1 font; unmapped characters become `?`
pub fn to_win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

/// PDF text string (UTF-16BE with byte order mark) for metadata
fn text_string(s: &str) -> Object {
    let mut bytes = vec![0xfe, 0xff];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Image XObject plus its soft mask
fn image_xobject(doc: &mut Document, image: &RasterImage) -> Result<ObjectId> {
    let rgba = image::load_from_memory(&image.data)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for px in rgba.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
        alpha.push(px.0[3]);
    }

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    if alpha.iter().any(|&a| a != 255) {
        let mask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            deflate(&alpha)?,
        );
        let mask_id = doc.add_object(mask);
        dict.set("SMask", mask_id);
    }
    Ok(doc.add_object(Stream::new(dict, deflate(&rgb)?)))
}

/// Builds the document for one export
#[derive(Debug, Clone)]
pub struct PdfWriter {
    title: String,
    created: DateTime<Local>,
}

impl PdfWriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            created: Local::now(),
        }
    }

    pub fn created_at(mut self, created: DateTime<Local>) -> Self {
        self.created = created;
        self
    }

    pub fn render(&self, layout: &PagedLayout) -> Result<Document> {
        let page_width = layout.geometry.width;
        let page_height = layout.geometry.height;

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut page_ids = Vec::with_capacity(layout.pages.len());
        for page in &layout.pages {
            let mut ops = Vec::new();
            let mut xobjects = Dictionary::new();
            for item in &page.items {
                match item {
                    PlacedItem::Text {
                        text,
                        x,
                        y,
                        font_size,
                    } => {
                        ops.push(Operation::new("BT", vec![]));
                        ops.push(Operation::new("Tf", vec![FONT_NAME.into(), (*font_size).into()]));
                        ops.push(Operation::new("Td", vec![(*x).into(), (page_height - y).into()]));
                        ops.push(Operation::new(
                            "Tj",
                            vec![Object::String(to_win_ansi(text), StringFormat::Literal)],
                        ));
                        ops.push(Operation::new("ET", vec![]));
                    }
                    PlacedItem::Image { image, placement } => {
                        let name = format!("Im{}", xobjects.len() + 1);
                        let id = image_xobject(&mut doc, image)?;
                        xobjects.set(name.as_bytes().to_vec(), id);
                        let bottom = page_height - placement.bottom();
                        ops.push(Operation::new("q", vec![]));
                        ops.push(Operation::new(
                            "cm",
                            vec![
                                placement.width.into(),
                                0.into(),
                                0.into(),
                                placement.height.into(),
                                placement.x.into(),
                                bottom.into(),
                            ],
                        ));
                        ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                        ops.push(Operation::new("Q", vec![]));
                    }
                }
            }

            let content = Content { operations: ops };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), page_width.into(), page_height.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { FONT_NAME => font_id },
                    "XObject" => xobjects,
                },
            });
            page_ids.push(page_id);
        }

        let count = page_ids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let date = self.created.format("D:%Y%m%d%H%M%S").to_string();
        let info_id = doc.add_object(dictionary! {
            "Title" => text_string(&self.title),
            "Producer" => text_string(concat!("baam-core ", env!("CARGO_PKG_VERSION"))),
            "CreationDate" => Object::String(date.into_bytes(), StringFormat::Literal),
        });
        doc.trailer.set("Info", info_id);
        Ok(doc)
    }

    pub fn to_bytes(&self, layout: &PagedLayout) -> Result<Vec<u8>> {
        let mut doc = self.render(layout)?;
        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        Ok(out)
    }

    /// Write the document, creating parent directories as needed
    pub fn save(&self, layout: &PagedLayout, path: &Path) -> Result<()> {
        let bytes = self.to_bytes(layout)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageGeometry;
    use crate::layout::LayoutEngine;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(w: u32, h: u32, alpha: u8) -> RasterImage {
        let mut data = Vec::new();
        RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, alpha]))
            .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
            .unwrap();
        RasterImage {
            data,
            width: w,
            height: h,
        }
    }

    fn page_text(doc: &Document, page_id: ObjectId) -> Vec<Vec<u8>> {
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn win_ansi_maps_accents_and_dashes() {
        assert_eq!(to_win_ansi("Año"), vec![b'A', 0xf1, b'o']);
        assert_eq!(to_win_ansi("a – b"), vec![b'a', b' ', 0x96, b' ', b'b']);
        assert_eq!(to_win_ansi("漁"), vec![b'?']);
    }

    #[test]
    fn writes_pages_text_and_images() {
        let mut engine = LayoutEngine::new(PageGeometry::a4());
        engine.place_report_title("Reporte de gráficas");
        engine.place_title("Producción por Año");
        engine.place_image(png(70, 30, 255));
        engine.place_title("Precio por especie – Restaurantes");
        engine.place_image(png(10, 40, 128));
        let layout = engine.finish();

        let bytes = PdfWriter::new("Reporte").to_bytes(&layout).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), layout.page_count());
        assert_eq!(pages.len(), 2);

        let first = page_text(&doc, pages[&1]);
        assert_eq!(first[0], to_win_ansi("Reporte de gráficas"));
        assert_eq!(first[1], to_win_ansi("Producción por Año"));

        let smasks = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| s.dict.get(b"SMask").is_ok())
            .count();
        assert_eq!(smasks, 1);
    }

    #[test]
    fn empty_layout_still_has_a_page() {
        let layout = LayoutEngine::new(PageGeometry::a4()).finish();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("Reporte_BAAM.pdf");
        PdfWriter::new("t").save(&layout, &path).unwrap();
        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert!(doc.trailer.get(b"Info").is_ok());
    }
}
