//! Single-page PDF report.
//!
//! Rendering is split in two: [`layout`] decides what goes where in page coordinates (origin at
//! the bottom left, 72 units per inch) and [`render`] turns that layout into PDF bytes with
//! `lopdf`. Keeping layout pure lets it be tested without parsing PDFs.

use crate::{
    db::models::equipment::EquipmentRecordDBResponse,
    summary::{Aggregate, aggregate},
};
use anyhow::Context as _;
use lopdf::{
    Document, Object, Stream,
    content::{Content, Operation},
    dictionary,
};

/// US Letter, in points
pub const PAGE_WIDTH: i64 = 612;
pub const PAGE_HEIGHT: i64 = 792;

/// Only the first records are listed so the report stays on one page
pub const MAX_LISTED_RECORDS: usize = 15;

/// Suggested download name
pub const REPORT_FILE_NAME: &str = "equipment_report.pdf";

pub const REPORT_TITLE: &str = "Chemical Equipment Analysis Report";
pub const REPORT_SUBTITLE: &str = "Generated from Chemical Equipment Visualizer";
pub const NO_DATA_TEXT: &str = "No data available";

const LEFT_MARGIN: i64 = 100;
const LIST_START_Y: i64 = 560;
const LIST_LINE_HEIGHT: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        font: Font,
        size: i64,
        x: i64,
        y: i64,
        text: String,
    },
    Rule {
        from: (i64, i64),
        to: (i64, i64),
    },
}

fn text(font: Font, size: i64, y: i64, text: impl Into<String>) -> Element {
    Element::Text {
        font,
        size,
        x: LEFT_MARGIN,
        y,
        text: text.into(),
    }
}

/// Positioned page content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportLayout {
    pub elements: Vec<Element>,
}

impl ReportLayout {
    /// Text of every text element, top to bottom
    pub fn lines(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                Element::Text { text, .. } => Some(text.as_str()),
                Element::Rule { .. } => None,
            })
            .collect()
    }
}

/// Lay out the report page.
///
/// `summary` must describe `records`; with no summary the page only carries the header and a
/// no-data notice. At most [`MAX_LISTED_RECORDS`] records are listed.
pub fn layout(summary: Option<&Aggregate>, records: &[EquipmentRecordDBResponse]) -> ReportLayout {
    let mut elements = vec![
        text(Font::Bold, 16, 750, REPORT_TITLE),
        text(Font::Regular, 12, 730, REPORT_SUBTITLE),
        Element::Rule {
            from: (LEFT_MARGIN, 720),
            to: (500, 720),
        },
    ];

    let Some(summary) = summary else {
        elements.push(text(Font::Regular, 12, 690, NO_DATA_TEXT));
        return ReportLayout { elements };
    };

    elements.extend([
        text(Font::Bold, 14, 690, "Summary Statistics"),
        text(Font::Regular, 12, 670, format!("Total Equipment: {}", summary.total_count)),
        text(Font::Regular, 12, 650, format!("Average Flowrate: {:.2}", summary.avg_flowrate)),
        text(Font::Regular, 12, 630, format!("Average Pressure: {:.2}", summary.avg_pressure)),
        text(Font::Regular, 12, 610, format!("Average Temperature: {:.2}", summary.avg_temperature)),
        text(Font::Bold, 14, 580, "Equipment List:"),
    ]);

    let mut y = LIST_START_Y;
    for (i, record) in records.iter().take(MAX_LISTED_RECORDS).enumerate() {
        elements.push(text(
            Font::Regular,
            10,
            y,
            format!("{}. {} ({})", i + 1, record.equipment_name, record.equipment_type),
        ));
        y -= LIST_LINE_HEIGHT;
    }

    ReportLayout { elements }
}

/// Standard fonts only cover WinAnsi; anything outside Latin-1 is replaced.
///
/// WinAnsi assigns 0x80..=0x9F to other glyphs (euro sign, smart quotes), so the C1 controls
/// that share those code points are replaced too.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u8::try_from(u32::from(c)) {
            Ok(0x80..=0x9F) | Err(_) => b'?',
            Ok(byte) => byte,
        })
        .collect()
}

fn operations(layout: &ReportLayout) -> Vec<Operation> {
    let mut ops = Vec::new();

    for element in &layout.elements {
        match element {
            Element::Text { font, size, x, y, text } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("Tf", vec![font.resource_name().into(), (*size).into()]));
                ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                ops.push(Operation::new("Tj", vec![Object::string_literal(encode_text(text))]));
                ops.push(Operation::new("ET", vec![]));
            }
            Element::Rule { from, to } => {
                ops.push(Operation::new("m", vec![from.0.into(), from.1.into()]));
                ops.push(Operation::new("l", vec![to.0.into(), to.1.into()]));
                ops.push(Operation::new("S", vec![]));
            }
        }
    }

    ops
}

/// Serialize a layout as a one-page PDF document
pub fn render(layout: &ReportLayout) -> anyhow::Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Font::Regular.resource_name() => regular_id,
            Font::Bold.resource_name() => bold_id,
        },
    });

    let content = Content {
        operations: operations(layout),
    };
    let encoded = content.encode().context("Failed to encode report content")?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).context("Failed to write report PDF")?;
    Ok(bytes)
}

/// Build the report for a record set in stored order
pub fn build_report(records: &[EquipmentRecordDBResponse]) -> anyhow::Result<Vec<u8>> {
    let summary = aggregate(records).ok();
    render(&layout(summary.as_ref(), records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(i: i32, name: &str, kind: &str) -> EquipmentRecordDBResponse {
        EquipmentRecordDBResponse {
            id: i64::from(i) + 1,
            upload_id: 1,
            position: i,
            equipment_name: name.to_string(),
            equipment_type: kind.to_string(),
            flowrate: 100.0,
            pressure: 5.0,
            temperature: 120.0,
        }
    }

    fn shown_strings(pdf: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(pdf).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.values().next().unwrap();

        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_layout_with_data() {
        let records = vec![record(0, "Pump-1", "Pump"), record(1, "Valve-1", "Valve")];
        let summary = aggregate(&records).unwrap();

        let layout = layout(Some(&summary), &records);
        assert_eq!(
            layout.lines(),
            vec![
                REPORT_TITLE,
                REPORT_SUBTITLE,
                "Summary Statistics",
                "Total Equipment: 2",
                "Average Flowrate: 100.00",
                "Average Pressure: 5.00",
                "Average Temperature: 120.00",
                "Equipment List:",
                "1. Pump-1 (Pump)",
                "2. Valve-1 (Valve)",
            ]
        );
        assert!(layout.elements.contains(&Element::Rule {
            from: (100, 720),
            to: (500, 720)
        }));
    }

    #[test]
    fn test_layout_list_positions_and_cap() {
        let records: Vec<_> = (0..20).map(|i| record(i, &format!("E-{i}"), "Pump")).collect();
        let summary = aggregate(&records).unwrap();

        let layout = layout(Some(&summary), &records);
        let list: Vec<_> = layout
            .elements
            .iter()
            .filter_map(|e| match e {
                Element::Text { size: 10, y, text, .. } => Some((*y, text.clone())),
                _ => None,
            })
            .collect();

        assert_eq!(list.len(), MAX_LISTED_RECORDS);
        assert_eq!(list[0], (560, "1. E-0 (Pump)".to_string()));
        assert_eq!(list[1].0, 545);
        assert_eq!(list[14], (350, "15. E-14 (Pump)".to_string()));
        assert!(layout.lines().contains(&"Total Equipment: 20"));
    }

    #[test]
    fn test_layout_without_data() {
        let layout = layout(None, &[]);
        assert_eq!(layout.lines(), vec![REPORT_TITLE, REPORT_SUBTITLE, NO_DATA_TEXT]);
    }

    #[test]
    fn test_render_produces_single_page_pdf() {
        let records = vec![record(0, "Reactor-1", "Reactor")];
        let pdf = build_report(&records).unwrap();
        assert!(pdf.starts_with(b"%PDF-1.5"));

        let strings = shown_strings(&pdf);
        assert_eq!(strings[0], REPORT_TITLE);
        assert!(strings.contains(&"Total Equipment: 1".to_string()));
        assert!(strings.contains(&"1. Reactor-1 (Reactor)".to_string()));
    }

    #[test]
    fn test_render_empty_report() {
        let pdf = build_report(&[]).unwrap();
        let strings = shown_strings(&pdf);
        assert_eq!(strings, vec![REPORT_TITLE, REPORT_SUBTITLE, NO_DATA_TEXT]);
    }

    #[test]
    fn test_encode_text_replaces_unsupported_characters() {
        assert_eq!(encode_text("Pump (A)"), b"Pump (A)".to_vec());
        assert_eq!(encode_text("Kühler"), vec![b'K', 0xfc, b'h', b'l', b'e', b'r']);
        assert_eq!(encode_text("泵-1"), b"?-1".to_vec());
        assert_eq!(encode_text("A\u{80}B\u{9f}"), b"A?B?".to_vec());
        assert_eq!(encode_text("\u{a0}\u{ff}"), vec![0xa0, 0xff]);
    }
}
