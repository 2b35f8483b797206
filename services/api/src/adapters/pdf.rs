//! services/api/src/adapters/pdf.rs
//!
//! This module contains the PDF adapter, which implements the `ReportRenderer`
//! port with `printpdf`. The report body is laid out as one block of wrapped
//! text; section markers are printed as-is.

use health_report_core::domain::iso_timestamp;
use health_report_core::ports::{PortError, PortResult, ReportRenderer};
use health_report_core::GeneratedReport;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use std::io::BufWriter;

// A4 portrait with 10 mm margins.
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;

const TITLE: &str = "Health Report";
const TITLE_SIZE_PT: f32 = 16.0;
const PERIOD_SIZE_PT: f32 = 12.0;
const BODY_SIZE_PT: f32 = 12.0;
const LINE_HEIGHT_MM: f32 = 6.0;

const MM_PER_PT: f32 = 0.352_778;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Renders generated reports as paginated A4 documents.
#[derive(Clone, Default)]
pub struct PdfReportRenderer;

impl PdfReportRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl ReportRenderer for PdfReportRenderer {
    fn render(&self, report: &GeneratedReport) -> PortResult<Vec<u8>> {
        let (doc, page1, layer1) =
            PdfDocument::new(TITLE, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PortError::Unexpected(format!("PDF font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PortError::Unexpected(format!("PDF font error: {e}")))?;
        let italic = doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(|e| PortError::Unexpected(format!("PDF font error: {e}")))?;

        let mut layer = doc.get_page(page1).get_layer(layer1);
        let mut y = PAGE_HEIGHT_MM - MARGIN_MM - LINE_HEIGHT_MM;

        // Title
        let title_x = (PAGE_WIDTH_MM - text_width_mm(TITLE, TITLE_SIZE_PT)) / 2.0;
        layer.use_text(TITLE, TITLE_SIZE_PT, Mm(title_x), Mm(y), &bold);
        y -= LINE_HEIGHT_MM * 2.0;

        // Period
        let period = format!(
            "Period: {} to {}",
            iso_timestamp(report.window.start()),
            iso_timestamp(report.window.end())
        );
        layer.use_text(period, PERIOD_SIZE_PT, Mm(MARGIN_MM), Mm(y), &italic);
        y -= LINE_HEIGHT_MM * 2.0;

        // Body
        let max_em = width_in_em(PAGE_WIDTH_MM - 2.0 * MARGIN_MM, BODY_SIZE_PT);
        for line in wrap_body(&report.report_text, max_em) {
            if y < MARGIN_MM {
                let (page, page_layer) =
                    doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
                layer = doc.get_page(page).get_layer(page_layer);
                y = PAGE_HEIGHT_MM - MARGIN_MM - LINE_HEIGHT_MM;
            }
            write_line(&layer, &font, &line, y);
            y -= LINE_HEIGHT_MM;
        }

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| PortError::Unexpected(format!("PDF save error: {e}")))?;
        buf.into_inner()
            .map_err(|e| PortError::Unexpected(format!("PDF buffer error: {e}")))
    }
}

fn write_line(layer: &PdfLayerReference, font: &IndirectFontRef, line: &str, y: f32) {
    if !line.is_empty() {
        layer.use_text(line, BODY_SIZE_PT, Mm(MARGIN_MM), Mm(y), font);
    }
}

//=========================================================================================
// Text Layout Helpers
//=========================================================================================

fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    em_width(text) * size_pt * MM_PER_PT
}

fn width_in_em(width_mm: f32, size_pt: f32) -> f32 {
    width_mm / (size_pt * MM_PER_PT)
}

/// Advance width of `c` in Helvetica, in em, from the font's AFM metrics.
/// Bold glyphs are slightly wider; only the regular face is wrapped.
fn glyph_em(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | '\'' | '|' => 0.222,
        ' ' | '.' | ',' | ':' | ';' | '!' | 'f' | 't' | 'I' | '/' | '\\' | '(' | ')' | '['
        | ']' => 0.278,
        'r' | '-' | '{' | '}' => 0.334,
        '"' => 0.355,
        '*' => 0.389,
        'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' | 'J' => 0.5,
        'F' | 'T' | 'Z' => 0.611,
        'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' | '&' => 0.667,
        'w' | 'C' | 'D' | 'H' | 'N' | 'R' | 'U' => 0.722,
        'G' | 'O' | 'Q' => 0.778,
        'm' | 'M' => 0.833,
        '%' => 0.889,
        'W' => 0.944,
        '@' => 1.015,
        'L' => 0.556,
        c if c.is_ascii_alphanumeric() => 0.556,
        _ => 0.584,
    }
}

fn em_width(text: &str) -> f32 {
    text.chars().map(glyph_em).sum()
}

/// Wraps every paragraph of `text` to `max_em`, keeping blank lines between
/// paragraphs. Characters the built-in fonts cannot encode are replaced first.
fn wrap_body(text: &str, max_em: f32) -> Vec<String> {
    let text = to_builtin_charset(text);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        if paragraph.trim().is_empty() {
            lines.push(String::new());
        } else {
            lines.extend(wrap_text(paragraph, max_em));
        }
    }
    lines
}

fn wrap_text(text: &str, max_em: f32) -> Vec<String> {
    let space = glyph_em(' ');
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_em = 0.0;

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        // Words wider than a line are hard-split.
        while em_width(&word) > max_em {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_em = 0.0;
            }
            let rest = word.split_off(fitting_prefix_len(&word, max_em));
            lines.push(word);
            word = rest;
        }
        let word_em = em_width(&word);
        if !current.is_empty() && current_em + space + word_em > max_em {
            lines.push(std::mem::take(&mut current));
            current_em = 0.0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_em += space;
        }
        current.push_str(&word);
        current_em += word_em;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Byte length of the longest prefix of `word` no wider than `max_em`, and at
/// least one character.
fn fitting_prefix_len(word: &str, max_em: f32) -> usize {
    let mut width = 0.0;
    let mut end = 0;
    for (i, c) in word.char_indices() {
        width += glyph_em(c);
        if width > max_em && i > 0 {
            break;
        }
        end = i + c.len_utf8();
    }
    end
}

/// Maps typographic punctuation to ASCII and anything else outside ASCII to `?`.
fn to_builtin_charset(text: &str) -> String {
    text.chars()
        .flat_map(|c| {
            let mapped: &str = match c {
                '\u{2018}' | '\u{2019}' => "'",
                '\u{201C}' | '\u{201D}' => "\"",
                '\u{2013}' | '\u{2014}' | '\u{2022}' => "-",
                '\u{2026}' => "...",
                '\u{00A0}' => " ",
                c if c.is_ascii() => return vec![c],
                _ => "?",
            };
            mapped.chars().collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use health_report_core::TimeWindow;
    use uuid::Uuid;

    fn report(text: &str) -> GeneratedReport {
        GeneratedReport {
            user_id: Uuid::new_v4(),
            window: TimeWindow::new(
                Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap(),
            )
            .unwrap(),
            report_text: text.to_string(),
            symptoms_count: 1,
            medications_count: 0,
        }
    }

    #[test]
    fn renders_a_pdf_document() {
        let bytes = PdfReportRenderer::new()
            .render(&report("### HEALTH SUMMARY\nAll good."))
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_reports_still_render() {
        let body = "Headaches were recorded most mornings. ".repeat(400);
        let bytes = PdfReportRenderer::new().render(&report(&body)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn wraps_on_word_boundaries_and_keeps_paragraph_breaks() {
        let lines = wrap_body("one two three four\n\nfive", 4.0);
        assert_eq!(lines, vec!["one two", "three", "four", "", "five"]);
    }

    #[test]
    fn hard_splits_words_longer_than_a_line() {
        let lines = wrap_text("ab abcdefghij", 2.0);
        assert_eq!(lines, vec!["ab", "abc", "defg", "hij"]);
    }

    #[test]
    fn replaces_characters_outside_the_builtin_charset() {
        assert_eq!(
            to_builtin_charset("\u{201C}mild\u{201D} \u{2014} it\u{2019}s fine\u{2026} \u{1F600}"),
            "\"mild\" - it's fine... ?"
        );
    }

    #[test]
    fn wide_glyphs_never_overflow_the_text_width() {
        let max_em = width_in_em(PAGE_WIDTH_MM - 2.0 * MARGIN_MM, BODY_SIZE_PT);
        let text = format!("{} {}", "WWMM ".repeat(60), "W".repeat(300));

        let lines = wrap_body(&text, max_em);

        assert!(lines.len() > 4);
        for line in &lines {
            assert!(
                text_width_mm(line, BODY_SIZE_PT) <= PAGE_WIDTH_MM - 2.0 * MARGIN_MM + 0.01,
                "{line}"
            );
        }
    }

    #[test]
    fn a4_body_fits_about_eighty_lowercase_characters() {
        let max_em = width_in_em(PAGE_WIDTH_MM - 2.0 * MARGIN_MM, BODY_SIZE_PT);
        let per_line = (max_em / glyph_em('e')).floor() as usize;
        assert!((75..=85).contains(&per_line), "got {per_line}");
    }
}
