//! Text insertions computed against the original tree, and their rendering.

use std::ops::Range;

use crate::core::errors::{ParamdupError, Result};
use crate::lang::csharp::walk_preorder;
use crate::lang::registry::create_parser_for_language;

/// Literal kinds whose content may span lines.
const MULTILINE_LITERAL_KINDS: [&str; 3] = [
    "verbatim_string_literal",
    "raw_string_literal",
    "interpolated_string_expression",
];

/// Insertion of `text` at a byte offset of the original source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Byte offset in the pre-mutation source
    pub offset: usize,
    /// Text to insert
    pub text: String,
}

impl TextEdit {
    /// Insert `text` at `offset`
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            offset,
            text: text.into(),
        }
    }
}

/// Applies edits and normalises whitespace of the result.
pub struct SourceRenderer;

impl SourceRenderer {
    /// Apply `edits` to `source` and normalise the result.
    ///
    /// Edits at the same offset keep the order they were recorded in, so an
    /// outer procedure's insertions land before those of a nested one.
    pub fn render(source: &str, edits: &[TextEdit]) -> Result<String> {
        let mut ordered: Vec<&TextEdit> = edits.iter().collect();
        ordered.sort_by_key(|edit| edit.offset);

        let extra: usize = ordered.iter().map(|edit| edit.text.len()).sum();
        let mut out = String::with_capacity(source.len() + extra);
        let mut cursor = 0;

        for edit in ordered {
            if edit.offset > source.len() || !source.is_char_boundary(edit.offset) {
                return Err(ParamdupError::internal(format!(
                    "Edit offset {} is not a character boundary in a {} byte source",
                    edit.offset,
                    source.len()
                )));
            }
            out.push_str(&source[cursor..edit.offset]);
            out.push_str(&edit.text);
            cursor = edit.offset;
        }
        out.push_str(&source[cursor..]);

        let literals = multiline_literal_ranges(&out)?;
        Ok(normalize_whitespace(&out, &literals))
    }
}

/// Byte ranges of string literals in `text` that span more than one line.
fn multiline_literal_ranges(text: &str) -> Result<Vec<Range<usize>>> {
    let mut parser = create_parser_for_language("cs")?;
    let tree = parser
        .parse(text, None)
        .ok_or_else(|| ParamdupError::parse("csharp", "Failed to parse rendered source"))?;

    let mut ranges = Vec::new();
    walk_preorder(tree.root_node(), &mut |node| {
        if MULTILINE_LITERAL_KINDS.contains(&node.kind())
            && node.start_position().row != node.end_position().row
        {
            ranges.push(node.byte_range());
        }
    });
    Ok(ranges)
}

/// Line ending used by `source` (`\r\n` when any line uses it).
pub fn line_ending(source: &str) -> &'static str {
    if source.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Trim trailing whitespace from each line and end with exactly one newline.
///
/// Line breaks inside `literals` are part of a string value: the text before
/// them is kept byte for byte, line ending included.
fn normalize_whitespace(text: &str, literals: &[Range<usize>]) -> String {
    let ending = line_ending(text);
    let in_literal = |pos: usize| literals.iter().any(|r| r.start < pos && pos < r.end);

    let mut out = String::with_capacity(text.len());
    let mut start = 0;
    for (newline, _) in text.match_indices('\n') {
        let line = &text[start..newline];
        if in_literal(newline) {
            out.push_str(line);
            out.push('\n');
        } else {
            out.push_str(line.trim_end());
            out.push_str(ending);
        }
        start = newline + 1;
    }
    out.push_str(text[start..].trim_end());

    let content = out.trim_end().len();
    out.truncate(content);
    if !out.is_empty() {
        out.push_str(ending);
    }
    out
}
