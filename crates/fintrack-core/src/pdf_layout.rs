//! Positional text extraction for PDF statements
//!
//! pdf-extract's plain-text output joins every run with a single space and
//! has no page breaks, which loses the column structure of a statement.
//! This output device records each glyph with its position instead, then
//! rebuilds every page line by line, writing a tab wherever the horizontal
//! gap between glyphs is wide enough to be a column break.

use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};

/// Gap, in multiples of the font size, that separates two columns
const COLUMN_GAP: f64 = 0.8;

/// Gap, in multiples of the font size, rendered as a word space
const WORD_GAP: f64 = 0.1;

/// Vertical distance, in multiples of the font size, within which glyphs
/// share a line
const LINE_TOLERANCE: f64 = 0.5;

/// One decoded glyph in top-down page coordinates
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Glyph {
    pub x: f64,
    pub y: f64,
    /// x position where the glyph's advance ends
    pub end: f64,
    pub size: f64,
    pub text: String,
}

/// Collects glyphs per page and renders each page when it ends
#[derive(Debug, Default)]
pub(crate) struct LayoutText {
    page_height: f64,
    glyphs: Vec<Glyph>,
    pages: Vec<String>,
}

impl LayoutText {
    pub fn into_pages(self) -> Vec<String> {
        self.pages
    }
}

impl OutputDev for LayoutText {
    fn begin_page(
        &mut self,
        _page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.page_height = media_box.ury - media_box.lly;
        self.glyphs.clear();
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        let glyphs = std::mem::take(&mut self.glyphs);
        self.pages.push(render_lines(glyphs));
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        text: &str,
    ) -> Result<(), OutputError> {
        // Effective font size after the text matrix: side of the square with
        // the same area as the transformed (size, size) vector
        let scaled_x = font_size * (trm.m11 + trm.m21);
        let scaled_y = font_size * (trm.m12 + trm.m22);
        let size = (scaled_x * scaled_y).abs().sqrt();
        let size = if size.is_finite() && size > 0.0 { size } else { 1.0 };

        let x = trm.m31;
        self.glyphs.push(Glyph {
            x,
            y: self.page_height - trm.m32,
            end: x + width * size,
            size,
            text: text.to_string(),
        });
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Group glyphs into lines top to bottom and join each line left to right
pub(crate) fn render_lines(mut glyphs: Vec<Glyph>) -> String {
    glyphs.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<Glyph>> = Vec::new();
    for glyph in glyphs {
        match lines.last_mut() {
            Some(line) if (glyph.y - line[0].y).abs() <= line[0].size * LINE_TOLERANCE => {
                line.push(glyph)
            }
            _ => lines.push(vec![glyph]),
        }
    }

    let mut out = String::new();
    for mut line in lines {
        line.sort_by(|a, b| a.x.total_cmp(&b.x));
        let mut last_end: Option<f64> = None;
        for glyph in &line {
            if let Some(end) = last_end {
                let gap = glyph.x - end;
                if gap > glyph.size * COLUMN_GAP {
                    out.push('\t');
                } else if gap > glyph.size * WORD_GAP {
                    out.push(' ');
                }
            }
            out.push_str(&glyph.text);
            last_end = Some(last_end.map_or(glyph.end, |end| end.max(glyph.end)));
        }
        out.push('\n');
    }
    out
}
