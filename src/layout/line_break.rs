//! Line breaking algorithm

use crate::layout::font::{FontSpec, Measurer};
use std::ops::Range;
use unicode_linebreak::{linebreaks, BreakOpportunity};

/// Layout result for a single wrapped line
#[derive(Debug, Clone, PartialEq)]
pub struct LineLayout {
    /// Byte range within the source text this line covers, including any
    /// trailing whitespace and the terminating newline
    pub byte_range: Range<usize>,
    /// Measured width of the line's words (trailing whitespace hangs)
    pub width: f32,
}

impl LineLayout {
    /// Text of this line within `source`
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.byte_range.clone()]
    }

    pub fn start(&self) -> usize {
        self.byte_range.start
    }

    pub fn end(&self) -> usize {
        self.byte_range.end
    }
}

/// Greedy word-wrapping line breaker
#[derive(Debug, Default)]
pub struct LineBreaker;

impl LineBreaker {
    pub fn new() -> Self {
        Self
    }

    /// Split `text` into visual lines no wider than `max_width`.
    ///
    /// The returned lines cover `text` exactly, in order, without gaps or
    /// overlaps. Empty text produces no lines.
    pub fn break_lines(
        &self,
        text: &str,
        max_width: f32,
        font: &FontSpec,
        measurer: &Measurer<'_>,
    ) -> Vec<LineLayout> {
        let mut lines = Vec::new();
        if text.is_empty() {
            return lines;
        }

        let mut para_start = 0;
        for para_end in hard_breaks(text) {
            self.wrap_paragraph(text, para_start..para_end, max_width, font, measurer, &mut lines);
            para_start = para_end;
        }

        if para_start < text.len() {
            self.wrap_paragraph(text, para_start..text.len(), max_width, font, measurer, &mut lines);
        } else {
            // Text ends with a newline: the caret sits on a fresh empty line
            lines.push(LineLayout {
                byte_range: text.len()..text.len(),
                width: 0.0,
            });
        }

        lines
    }

    /// Wrap one hard-broken paragraph (terminator included in `range`)
    fn wrap_paragraph(
        &self,
        text: &str,
        range: Range<usize>,
        max_width: f32,
        font: &FontSpec,
        measurer: &Measurer<'_>,
        lines: &mut Vec<LineLayout>,
    ) {
        let body_end = range.start + text[range.clone()].trim_end_matches(is_terminator).len();

        let mut line_start = range.start;
        let mut line_width: f32 = 0.0;
        let mut line_has_word = false;

        for word in Words::new(text, range.start..body_end) {
            let candidate = measurer.width(&text[line_start..word.end], font);

            if line_has_word && candidate > max_width {
                lines.push(LineLayout {
                    byte_range: line_start..word.start,
                    width: line_width,
                });
                // An over-wide word still starts (and owns) the next line
                line_start = word.start;
                line_width = measurer.width(&text[word.clone()], font);
            } else {
                line_width = candidate;
            }
            line_has_word = true;
        }

        lines.push(LineLayout {
            byte_range: line_start..range.end,
            width: line_width,
        });
    }
}

/// Characters that end a line unconditionally
fn is_terminator(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Byte offsets just past each explicit line terminator
fn hard_breaks(text: &str) -> impl Iterator<Item = usize> + '_ {
    // The end of text is always reported as mandatory; keep it only when a
    // terminator is actually there
    linebreaks(text)
        .filter(|(_, opportunity)| *opportunity == BreakOpportunity::Mandatory)
        .map(|(offset, _)| offset)
        .filter(move |&offset| text[..offset].ends_with(is_terminator))
}

/// Maximal runs of non-whitespace within a byte range
struct Words<'a> {
    text: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Words<'a> {
    fn new(text: &'a str, range: Range<usize>) -> Self {
        Self {
            text,
            pos: range.start,
            end: range.end,
        }
    }
}

impl Iterator for Words<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.text[self.pos..self.end];
        let Some(lead) = rest.find(|c: char| !c.is_whitespace()) else {
            self.pos = self.end;
            return None;
        };
        let start = self.pos + lead;
        let len = self.text[start..self.end]
            .find(char::is_whitespace)
            .unwrap_or(self.end - start);
        self.pos = start + len;
        Some(start..self.pos)
    }
}
