//! Finding and duplicating the first statement that uses a parameter.

use std::ops::Range;

use tree_sitter::Node;

use super::edits::{line_ending, TextEdit};
use crate::lang::csharp::{is_statement_kind, walk_preorder};
use crate::lang::ProcedureView;
use crate::semantic::{unverbatim, SymbolId, SymbolResolver};

/// First statement in `procedure`'s body containing a reference that resolves
/// to `parameter` and is spelled `original_name`.
///
/// The returned statement is the smallest one enclosing that reference which
/// sits directly in a block or switch section, so a duplicate can be inserted
/// after it without changing control flow. `None` when the procedure has no
/// block body or never references the parameter.
pub fn locate_first_usage<'t>(
    procedure: &ProcedureView<'t>,
    original_name: &str,
    parameter: SymbolId,
    resolver: &dyn SymbolResolver,
) -> Option<Node<'t>> {
    let body = procedure.body()?;
    let wanted = unverbatim(original_name);

    let mut first_reference = None;
    walk_preorder(body, &mut |node| {
        if first_reference.is_some() || node.kind() != "identifier" {
            return;
        }
        if unverbatim(procedure.text(node)) == wanted
            && resolver.resolve_reference(node) == Some(parameter)
        {
            first_reference = Some(node);
        }
    });

    insertion_anchor(first_reference?, body)
}

/// Climb to the enclosing statement that is a direct child of a block or switch
/// section, never leaving `body`.
fn insertion_anchor<'t>(reference: Node<'t>, body: Node<'t>) -> Option<Node<'t>> {
    let mut current = reference;
    loop {
        let parent = current.parent()?;
        if parent.id() == body.id() || matches!(parent.kind(), "block" | "switch_section") {
            return is_statement_kind(current.kind()).then_some(current);
        }
        current = parent;
    }
}

/// Source text of `statement` with every reference to `parameter` renamed to
/// `new_name`. Same-named identifiers bound elsewhere are left untouched.
pub fn clone_with_rename(
    statement: Node<'_>,
    source: &str,
    new_name: &str,
    parameter: SymbolId,
    resolver: &dyn SymbolResolver,
) -> String {
    let mut renamed: Vec<Range<usize>> = Vec::new();
    walk_preorder(statement, &mut |node| {
        if node.kind() == "identifier" && resolver.resolve_reference(node) == Some(parameter) {
            renamed.push(node.byte_range());
        }
    });

    let span = statement.byte_range();
    let mut out = String::with_capacity(span.len() + renamed.len() * new_name.len());
    let mut cursor = span.start;
    for range in renamed {
        out.push_str(&source[cursor..range.start]);
        out.push_str(new_name);
        cursor = range.end;
    }
    out.push_str(&source[cursor..span.end]);
    out
}

/// Edit placing `clone` on its own line after `statement`, with the
/// statement's indentation. A trailing line comment stays with the original.
pub fn insert_after(statement: Node<'_>, source: &str, clone: &str) -> TextEdit {
    let start = statement.start_byte();
    let end = statement.end_byte();

    let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &source[line_start..start];
    let indent: String = prefix.chars().take_while(|c| c.is_whitespace()).collect();

    let line_end = source[end..]
        .find('\n')
        .map_or(source.len(), |i| end + i);
    let line_end = if source[..line_end].ends_with('\r') {
        line_end - 1
    } else {
        line_end
    };
    let rest = source[end..line_end].trim();
    let offset = if rest.is_empty() || rest.starts_with("//") {
        line_end
    } else {
        end
    };

    TextEdit::insert(offset, format!("{}{}{}", line_ending(source), indent, clone))
}
