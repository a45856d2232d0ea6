// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source text — positioned text runs read out of page content streams, and
// the invisible overlay used to put them back on top of raster pages.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, StringFormat};
use pagesmith_core::{PagesmithError, Result};
use tracing::debug;

use crate::pdf::reader::{IDENTITY, Matrix, PageArena, matrix_operands, multiply, number, resolve};
use crate::pdf::writer::real;

/// Font size assumed when a run is shown before any `Tf`.
const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Rough glyph advance as a fraction of the font size, used to move the pen
/// past a shown string when no width information is available.
const APPROX_GLYPH_ADVANCE: f64 = 0.5;

/// A string shown on a page, with its origin in page space (bottom-left
/// origin, MediaBox offset removed).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f64,
    pub y: f64,
    /// BaseFont of the font used, or its resource name when that is missing.
    pub font_name: String,
    pub font_size: f64,
}

fn translate(tx: f64, ty: f64) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

/// Text state while walking one page's operators.
struct TextCursor {
    ctm: Matrix,
    stack: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font_resource: Vec<u8>,
    font_size: f64,
    leading: f64,
}

impl TextCursor {
    fn new() -> Self {
        Self {
            ctm: IDENTITY,
            stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            font_resource: Vec::new(),
            font_size: DEFAULT_FONT_SIZE,
            leading: 0.0,
        }
    }

    fn next_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = multiply(translate(tx, ty), self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// Record `text` at the current pen position and advance the pen.
    fn show(
        &mut self,
        text: String,
        fonts: &HashMap<Vec<u8>, String>,
        origin: (f64, f64),
    ) -> Option<TextRun> {
        let rendering = multiply(self.text_matrix, self.ctm);
        let scale = (rendering[2] * rendering[2] + rendering[3] * rendering[3]).sqrt();
        let advance = APPROX_GLYPH_ADVANCE * self.font_size * text.chars().count() as f64;
        self.text_matrix = multiply(translate(advance, 0.0), self.text_matrix);

        if text.trim().is_empty() {
            return None;
        }
        let font_name = fonts
            .get(&self.font_resource)
            .cloned()
            .unwrap_or_else(|| String::from_utf8_lossy(&self.font_resource).into_owned());
        Some(TextRun {
            text,
            x: rendering[4] - origin.0,
            y: rendering[5] - origin.1,
            font_name,
            font_size: self.font_size * if scale > 0.0 { scale } else { 1.0 },
        })
    }
}

/// Extract the text runs of every page, indexed like the arena.
pub fn extract_text_runs(arena: &PageArena) -> Result<Vec<Vec<TextRun>>> {
    (0..arena.page_count())
        .map(|index| page_text_runs(arena, index))
        .collect()
}

/// Text runs of a single page.
pub fn page_text_runs(arena: &PageArena, index: usize) -> Result<Vec<TextRun>> {
    let raw = arena.content(index)?;
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let content = Content::decode(&raw).map_err(|err| {
        PagesmithError::PdfError(format!("cannot parse content of page {}: {}", index, err))
    })?;
    let fonts = font_names(arena, index)?;
    let [x0, y0, _, _] = arena.media_box(index)?;

    let mut cursor = TextCursor::new();
    let mut runs = Vec::new();
    for operation in &content.operations {
        let operands = &operation.operands;
        match operation.operator.as_str() {
            "q" => cursor.stack.push(cursor.ctm),
            "Q" => cursor.ctm = cursor.stack.pop().unwrap_or(IDENTITY),
            "cm" => {
                if let Some(matrix) = matrix_operands(operands) {
                    cursor.ctm = multiply(matrix, cursor.ctm);
                }
            }
            "BT" => {
                cursor.text_matrix = IDENTITY;
                cursor.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    cursor.font_resource = name.clone();
                }
                if let Some(size) = operands.get(1).and_then(number) {
                    cursor.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    cursor.leading = leading;
                }
            }
            "Td" | "TD" => {
                let tx = operands.first().and_then(number).unwrap_or(0.0);
                let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                if operation.operator == "TD" {
                    cursor.leading = -ty;
                }
                cursor.next_line(tx, ty);
            }
            "Tm" => {
                if let Some(matrix) = matrix_operands(operands) {
                    cursor.text_matrix = matrix;
                    cursor.line_matrix = matrix;
                }
            }
            "T*" => {
                let leading = cursor.leading;
                cursor.next_line(0.0, -leading);
            }
            "Tj" | "'" | "\"" => {
                if operation.operator != "Tj" {
                    let leading = cursor.leading;
                    cursor.next_line(0.0, -leading);
                }
                if let Some(Object::String(bytes, _)) = operands.last() {
                    runs.extend(cursor.show(decode_pdf_string(bytes), &fonts, (x0, y0)));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let text: String = items
                        .iter()
                        .filter_map(|item| match item {
                            Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
                            _ => None,
                        })
                        .collect();
                    runs.extend(cursor.show(text, &fonts, (x0, y0)));
                }
            }
            _ => {}
        }
    }

    debug!(page = index, runs = runs.len(), "Text runs extracted");
    Ok(runs)
}

/// Whether any page of the arena shows non-whitespace text.
pub fn has_source_text(arena: &PageArena) -> Result<bool> {
    for index in 0..arena.page_count() {
        if !page_text_runs(arena, index)?.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Resource name -> BaseFont for the page's fonts.
fn font_names(arena: &PageArena, index: usize) -> Result<HashMap<Vec<u8>, String>> {
    let mut names = HashMap::new();
    let Some(resources) = arena.resources(index)? else {
        return Ok(names);
    };
    let document = arena.document();
    let Ok(fonts) = resources.get(b"Font") else {
        return Ok(names);
    };
    if let Object::Dictionary(fonts) = resolve(document, fonts) {
        for (resource, font) in fonts.iter() {
            if let Object::Dictionary(font) = resolve(document, font)
                && let Ok(Object::Name(base_font)) = font.get(b"BaseFont")
            {
                names.insert(
                    resource.clone(),
                    String::from_utf8_lossy(base_font).into_owned(),
                );
            }
        }
    }
    Ok(names)
}

/// Decode a PDF string: UTF-16BE when it carries a byte-order mark, else one
/// byte per character. Control characters are dropped.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes
        .iter()
        .map(|&byte| char::from(byte))
        .filter(|ch| !ch.is_control())
        .collect()
}

// -- Standard fonts -----------------------------------------------------------

/// The standard Type 1 fonts every PDF reader provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

impl StandardFont {
    /// Map an arbitrary font name onto the closest standard font, falling back
    /// to Helvetica.
    pub fn resolve(name: &str) -> Self {
        // Drop a subset tag such as "ABCDEF+".
        let base = name.split_once('+').map_or(name, |(_, rest)| rest);
        let lower = base.to_ascii_lowercase();
        let bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
        let slanted = lower.contains("italic") || lower.contains("oblique");

        if lower.contains("zapf") || lower.contains("dingbat") {
            return Self::ZapfDingbats;
        }
        if lower.starts_with("symbol") {
            return Self::Symbol;
        }
        if lower.contains("courier") || lower.contains("mono") {
            return match (bold, slanted) {
                (false, false) => Self::Courier,
                (true, false) => Self::CourierBold,
                (false, true) => Self::CourierOblique,
                (true, true) => Self::CourierBoldOblique,
            };
        }
        if lower.contains("times") || (lower.contains("serif") && !lower.contains("sans")) {
            return match (bold, slanted) {
                (false, false) => Self::TimesRoman,
                (true, false) => Self::TimesBold,
                (false, true) => Self::TimesItalic,
                (true, true) => Self::TimesBoldItalic,
            };
        }
        match (bold, slanted) {
            (false, false) => Self::Helvetica,
            (true, false) => Self::HelveticaBold,
            (false, true) => Self::HelveticaOblique,
            (true, true) => Self::HelveticaBoldOblique,
        }
    }

    /// PostScript name used as `/BaseFont`.
    pub fn base_font(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
            Self::Symbol => "Symbol",
            Self::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Name under which the font is registered in a page's `/Font` resources.
    pub fn resource_name(&self) -> String {
        format!("SF{}", *self as u8)
    }

    pub(crate) fn font_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"Font".to_vec()));
        dict.set("Subtype", Object::Name(b"Type1".to_vec()));
        dict.set("BaseFont", Object::Name(self.base_font().as_bytes().to_vec()));
        if !matches!(self, Self::Symbol | Self::ZapfDingbats) {
            dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        }
        dict
    }
}

/// Content operations that draw `runs` in invisible render mode, so the text
/// stays selectable and searchable without painting over the raster.
pub(crate) fn overlay_operations(runs: &[TextRun]) -> Vec<Operation> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tr", vec![Object::Integer(3)]),
    ];
    for run in runs {
        let font = StandardFont::resolve(&run.font_name);
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(font.resource_name().into_bytes()),
                real(run.font_size),
            ],
        ));
        operations.push(Operation::new(
            "Tm",
            vec![
                real(1.0),
                real(0.0),
                real(0.0),
                real(1.0),
                real(run.x),
                real(run.y),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(latin1(&run.text), StringFormat::Literal)],
        ));
    }
    operations.push(Operation::new("ET", vec![]));
    operations
}

fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn extracts_positioned_runs() {
        let bytes = testing::text_pdf(&[("Invoice", 72.0, 700.0), ("Total", 72.0, 650.0)]);
        let arena = PageArena::from_bytes(&bytes).unwrap();
        let runs = extract_text_runs(&arena).unwrap();

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].len(), 2);
        assert_eq!(runs[0][0].text, "Invoice");
        assert_eq!((runs[0][0].x, runs[0][0].y), (72.0, 700.0));
        assert_eq!(runs[0][0].font_name, "Times-Bold");
        assert_eq!(runs[0][0].font_size, 12.0);
        assert_eq!(runs[0][1].text, "Total");
        assert_eq!(runs[0][1].y, 650.0);
    }

    #[test]
    fn text_guard_detection() {
        let text = PageArena::from_bytes(&testing::text_pdf(&[("Hello", 10.0, 10.0)])).unwrap();
        assert!(has_source_text(&text).unwrap());

        let shapes = PageArena::from_bytes(&testing::sized_pages_pdf(&[100.0])).unwrap();
        assert!(!has_source_text(&shapes).unwrap());
    }

    #[test]
    fn cm_scales_position_and_size() {
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(2),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(2),
                    Object::Integer(10),
                    Object::Integer(20),
                ],
            ),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
            Operation::new("Td", vec![Object::Integer(5), Object::Integer(5)]),
            Operation::new(
                "Tj",
                vec![Object::String(b"x".to_vec(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ];
        let bytes = testing::pdf_with_operations(ops);
        let arena = PageArena::from_bytes(&bytes).unwrap();
        let runs = page_text_runs(&arena, 0).unwrap();

        assert_eq!(runs.len(), 1);
        assert_eq!((runs[0].x, runs[0].y), (20.0, 30.0));
        assert_eq!(runs[0].font_size, 20.0);
        assert_eq!(runs[0].font_name, "Times-Bold");
    }

    #[test]
    fn utf16_strings_are_decoded() {
        assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x00, b'H', 0x00, b'i']), "Hi");
        assert_eq!(decode_pdf_string(b"caf\xe9"), "café");
    }

    #[test]
    fn fonts_resolve_with_fallback() {
        assert_eq!(StandardFont::resolve("Helvetica"), StandardFont::Helvetica);
        assert_eq!(StandardFont::resolve("ABCDEF+Arial-BoldMT"), StandardFont::HelveticaBold);
        assert_eq!(StandardFont::resolve("TimesNewRomanPS-ItalicMT"), StandardFont::TimesItalic);
        assert_eq!(StandardFont::resolve("CourierNewPS-BoldItalicMT"), StandardFont::CourierBoldOblique);
        assert_eq!(StandardFont::resolve("DejaVuSerif"), StandardFont::TimesRoman);
        assert_eq!(StandardFont::resolve("ZapfDingbats"), StandardFont::ZapfDingbats);
        assert_eq!(StandardFont::resolve("F1"), StandardFont::Helvetica);
        assert_eq!(StandardFont::resolve(""), StandardFont::Helvetica);
    }

    #[test]
    fn overlay_is_invisible_text() {
        let runs = vec![TextRun {
            text: "Total".into(),
            x: 10.0,
            y: 20.0,
            font_name: "Courier".into(),
            font_size: 9.0,
        }];
        let operations = overlay_operations(&runs);
        let operators: Vec<&str> = operations.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(operators, vec!["BT", "Tr", "Tf", "Tm", "Tj", "ET"]);
        assert!(matches!(operations[1].operands.as_slice(), [Object::Integer(3)]));
        match &operations[2].operands[0] {
            Object::Name(name) => {
                assert_eq!(name.as_slice(), StandardFont::Courier.resource_name().as_bytes())
            }
            other => panic!("unexpected font operand: {other:?}"),
        }
    }
}
