//! Paginated PDF report built directly with lopdf.

use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use super::ExportError;
use crate::models::CaseRecord;

const TITLE: &str = "Delhi High Court - Case Information Report";

// A4 portrait, in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;

const MARGIN_X: i64 = 40;
const VALUE_X: i64 = 180;
const TITLE_Y: i64 = 800;
const BODY_TOP: i64 = 760;
const BODY_BOTTOM: i64 = 60;
const FOOTER_Y: i64 = 30;
const LEADING: i64 = 16;
const FIELD_GAP: i64 = 4;

/// Values are hard-wrapped at this many characters.
pub const WRAP_WIDTH: usize = 50;

struct Line {
    label: Option<String>,
    text: String,
    /// Extra space above the line, in points.
    gap: i64,
}

pub fn render_pdf(record: &CaseRecord) -> Result<Vec<u8>, ExportError> {
    let lines = layout(record);
    let pages = paginate(&lines);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(font("Helvetica"));
    let bold = doc.add_object(font("Helvetica-Bold"));
    let italic = doc.add_object(font("Helvetica-Oblique"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
            "F3" => italic,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for (index, lines) in pages.iter().enumerate() {
        let content = page_content(lines, index + 1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok(buffer)
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// One labelled line per wrapped chunk; continuation lines have no label.
fn layout(record: &CaseRecord) -> Vec<Line> {
    let mut lines = Vec::new();
    for (field, value) in record.fields() {
        let chunks = wrap(&value, WRAP_WIDTH);
        for (i, chunk) in chunks.into_iter().enumerate() {
            lines.push(Line {
                label: (i == 0).then(|| format!("{}:", title_case(field))),
                text: chunk,
                gap: if i == 0 { FIELD_GAP } else { 0 },
            });
        }
    }
    lines
}

fn paginate(lines: &[Line]) -> Vec<Vec<(i64, &Line)>> {
    let mut pages = vec![Vec::new()];
    let mut y = BODY_TOP;

    for line in lines {
        let next = y - line.gap - LEADING;
        let (y_pos, page_full) = if next < BODY_BOTTOM {
            (BODY_TOP - LEADING, true)
        } else {
            (next, false)
        };
        if page_full {
            pages.push(Vec::new());
        }
        if let Some(page) = pages.last_mut() {
            page.push((y_pos, line));
        }
        y = y_pos;
    }
    pages
}

fn page_content(lines: &[(i64, &Line)], page_no: usize) -> String {
    let mut content = String::new();
    // Approximate centering: Helvetica-Bold averages about 0.55em per glyph.
    let title_x = (PAGE_WIDTH - (TITLE.len() as i64 * 16 * 55 / 100)) / 2;
    push_text(&mut content, "F2", 16, title_x, TITLE_Y, TITLE);

    for (y, line) in lines {
        if let Some(ref label) = line.label {
            push_text(&mut content, "F2", 12, MARGIN_X, *y, label);
        }
        push_text(&mut content, "F1", 12, VALUE_X, *y, &line.text);
    }

    let footer = format!("Page {}", page_no);
    push_text(&mut content, "F3", 8, PAGE_WIDTH / 2 - 12, FOOTER_Y, &footer);
    content
}

fn push_text(content: &mut String, font: &str, size: i64, x: i64, y: i64, text: &str) {
    content.push_str(&format!(
        "BT /{} {} Tf {} {} Td ({}) Tj ET\n",
        font,
        size,
        x,
        y,
        escape_pdf_string(text)
    ));
}

/// Split on line breaks, then hard-wrap each line at `width` characters.
/// An empty value still yields one (empty) line.
fn wrap(value: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    for line in value.lines() {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            continue;
        }
        out.extend(chars.chunks(width).map(|c| c.iter().collect::<String>()));
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn title_case(field: &str) -> String {
    field
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            c if c.is_ascii() && !c.is_control() => c.to_string(),
            _ => " ".to_string(),
        })
        .collect()
}
