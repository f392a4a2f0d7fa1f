//! C# language adapter with tree-sitter integration.
//!
//! The adapter owns parsing and exposes read-only views over procedure
//! declarations. Views borrow from the [`ParsedSource`] they were created from
//! and are never mutated; rewrites are expressed as text edits elsewhere.

use std::ops::Range;

use tree_sitter::{Node, Parser, Tree};
use tracing::warn;

use super::registry::create_parser_for_language;
use crate::core::errors::{ParamdupError, Result};

/// Node kinds that declare a procedure.
pub const METHOD_KIND: &str = "method_declaration";
/// Local functions declared inside another procedure's body.
pub const LOCAL_FUNCTION_KIND: &str = "local_function_statement";

/// C#-specific parsing
pub struct CSharpAdapter {
    /// Tree-sitter parser for C#
    parser: Parser,
}

impl CSharpAdapter {
    /// Create a new C# adapter
    pub fn new() -> Result<Self> {
        let parser = create_parser_for_language("cs")?;
        Ok(Self { parser })
    }

    /// Parse C# source code. Syntax errors are tolerated and logged.
    pub fn parse_source(&mut self, source_code: impl Into<String>) -> Result<ParsedSource> {
        let source = source_code.into();
        let tree = self
            .parser
            .parse(&source, None)
            .ok_or_else(|| ParamdupError::parse("csharp", "Failed to parse C# source code"))?;

        let parsed = ParsedSource { source, tree };
        if parsed.has_errors() {
            warn!("Source contains syntax errors; rewriting the well-formed parts only");
        }
        Ok(parsed)
    }
}

/// Source text together with its immutable syntax tree
pub struct ParsedSource {
    source: String,
    tree: Tree,
}

impl ParsedSource {
    /// Original source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Root `compilation_unit` node
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Whether the parser had to recover from syntax errors
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// All procedures in document (pre-order) order.
    pub fn procedures(&self, include_local_functions: bool) -> Vec<ProcedureView<'_>> {
        let mut procedures = Vec::new();
        walk_preorder(self.root_node(), &mut |node| {
            let wanted = node.kind() == METHOD_KIND
                || (include_local_functions && node.kind() == LOCAL_FUNCTION_KIND);
            if wanted {
                if let Some(view) = ProcedureView::from_node(node, &self.source) {
                    procedures.push(view);
                }
            }
        });
        procedures
    }
}

/// Read-only handle to one procedure declaration
#[derive(Debug, Clone)]
pub struct ProcedureView<'t> {
    source: &'t str,
    node: Node<'t>,
    name: String,
    parameters: Vec<ParameterView<'t>>,
    body: Option<Node<'t>>,
    documentation: String,
}

impl<'t> ProcedureView<'t> {
    /// Build a view from a `method_declaration` or `local_function_statement`.
    pub fn from_node(node: Node<'t>, source: &'t str) -> Option<Self> {
        if !matches!(node.kind(), METHOD_KIND | LOCAL_FUNCTION_KIND) {
            return None;
        }

        let name = node_text(node.child_by_field_name("name")?, source).to_string();
        let parameter_list = node.child_by_field_name("parameters")?;
        let parameters = collect_parameters(parameter_list, source);
        let body = node
            .child_by_field_name("body")
            .filter(|body| body.kind() == "block");
        let documentation = documentation_summary(node, source);

        Some(Self {
            source,
            node,
            name,
            parameters,
            body,
            documentation,
        })
    }

    /// Declaration node
    pub fn node(&self) -> Node<'t> {
        self.node
    }

    /// Full source text of the file the procedure belongs to
    pub fn source(&self) -> &'t str {
        self.source
    }

    /// Source text of a node inside this procedure
    pub fn text(&self, node: Node<'_>) -> &'t str {
        node_text(node, self.source)
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> &[ParameterView<'t>] {
        &self.parameters
    }

    /// Block body; `None` for abstract, extern and expression-bodied procedures
    pub fn body(&self) -> Option<Node<'t>> {
        self.body
    }

    /// First `<summary>` of the leading documentation comment, or empty
    pub fn documentation(&self) -> &str {
        &self.documentation
    }
}

/// One parameter of a procedure
#[derive(Debug, Clone)]
pub struct ParameterView<'t> {
    name: String,
    name_node: Node<'t>,
    type_node: Option<Node<'t>>,
    binder: Node<'t>,
    span: Range<usize>,
    position: usize,
}

impl<'t> ParameterView<'t> {
    /// Parameter name as written
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier node carrying the name
    pub fn name_node(&self) -> Node<'t> {
        self.name_node
    }

    /// Declared type node, absent for implicitly typed parameters
    pub fn type_node(&self) -> Option<Node<'t>> {
        self.type_node
    }

    /// Node to hand to the resolver to obtain the declared symbol
    pub fn binder(&self) -> Node<'t> {
        self.binder
    }

    /// Byte span of the whole parameter (attributes, modifiers, default value)
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// Zero-based position in the parameter list
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Group the children of a `parameter_list` into parameters.
///
/// `params` arrays are not wrapped in a `parameter` node by the grammar, so
/// grouping happens between comma tokens rather than by node kind.
pub fn collect_parameters<'t>(parameter_list: Node<'t>, source: &'t str) -> Vec<ParameterView<'t>> {
    let mut groups: Vec<Vec<Node<'t>>> = vec![Vec::new()];
    let mut cursor = parameter_list.walk();
    for child in parameter_list.children(&mut cursor) {
        match child.kind() {
            "(" | ")" | "[" | "]" | "comment" => {}
            "," => groups.push(Vec::new()),
            _ => {
                if let Some(current) = groups.last_mut() {
                    current.push(child);
                }
            }
        }
    }

    groups
        .into_iter()
        .filter(|group| !group.is_empty())
        .filter_map(|group| parameter_from_group(&group, source))
        .enumerate()
        .map(|(position, mut parameter)| {
            parameter.position = position;
            parameter
        })
        .collect()
}

fn parameter_from_group<'t>(group: &[Node<'t>], source: &'t str) -> Option<ParameterView<'t>> {
    let first = *group.first()?;
    let last = *group.last()?;

    if group.len() == 1 && first.kind() == "parameter" {
        let name_node = first.child_by_field_name("name")?;
        return Some(ParameterView {
            name: node_text(name_node, source).to_string(),
            name_node,
            type_node: first.child_by_field_name("type"),
            binder: first,
            span: first.byte_range(),
            position: 0,
        });
    }

    let name_node = group.iter().rev().find(|n| n.kind() == "identifier").copied()?;
    let type_node = group
        .iter()
        .find(|n| n.is_named() && n.kind() != "attribute_list" && n.id() != name_node.id())
        .copied();

    Some(ParameterView {
        name: node_text(name_node, source).to_string(),
        name_node,
        type_node,
        binder: name_node,
        span: first.start_byte()..last.end_byte(),
        position: 0,
    })
}

/// Extract the first `<summary>` element from the `///` comment block that
/// immediately precedes `node`. Lines are trimmed and joined with spaces.
pub fn documentation_summary(node: Node<'_>, source: &str) -> String {
    let mut doc_lines = Vec::new();
    let mut sibling = node.prev_sibling();
    while let Some(comment) = sibling.filter(|n| n.kind() == "comment") {
        let text = node_text(comment, source).trim();
        if let Some(rest) = text.strip_prefix("///") {
            doc_lines.push(rest.to_string());
        }
        sibling = comment.prev_sibling();
    }

    if doc_lines.is_empty() {
        return String::new();
    }
    doc_lines.reverse();
    extract_summary(&doc_lines.join("\n"))
}

fn extract_summary(xml: &str) -> String {
    let lowered = xml.to_ascii_lowercase();
    let Some(open) = lowered.find("<summary") else {
        return String::new();
    };
    let Some(open_end) = lowered[open..].find('>').map(|i| open + i + 1) else {
        return String::new();
    };
    if lowered[..open_end].ends_with("/>") {
        return String::new();
    }
    let close = lowered[open_end..]
        .find("</summary")
        .map_or(xml.len(), |i| open_end + i);

    xml[open_end..close]
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Source text covered by a node
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or_default()
}

/// Whether a node kind is a statement (including nested blocks)
pub fn is_statement_kind(kind: &str) -> bool {
    kind == "block" || (kind.ends_with("_statement") && kind != "global_statement")
}

/// Visit `node` and its descendants in pre-order.
pub fn walk_preorder<'t, F>(node: Node<'t>, visit: &mut F)
where
    F: FnMut(Node<'t>),
{
    let mut cursor = node.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.node().id() == node.id() {
                return;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedSource {
        CSharpAdapter::new().unwrap().parse_source(source).unwrap()
    }

    #[test]
    fn test_adapter_creation() {
        assert!(CSharpAdapter::new().is_ok());
    }

    #[test]
    fn test_procedures_in_document_order() {
        let parsed = parse(
            r#"
class A {
    void First(int a) {
        int Inner(int b) { return b; }
    }
    class Nested {
        void Second() {}
    }
    void Third(int x, int y) {}
}
"#,
        );
        let names: Vec<_> = parsed
            .procedures(true)
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["First", "Inner", "Second", "Third"]);

        let without_locals: Vec<_> = parsed
            .procedures(false)
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(without_locals, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_parameter_views() {
        let source = "class A { void M([NotNull] ref int count, string label = \"x\") {} }";
        let parsed = parse(source);
        let procedures = parsed.procedures(true);
        let params = procedures[0].parameters();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name(), "count");
        assert_eq!(&source[params[0].span()], "[NotNull] ref int count");
        assert_eq!(params[1].name(), "label");
        assert_eq!(params[1].position(), 1);
        assert_eq!(&source[params[1].span()], "string label = \"x\"");
    }

    #[test]
    fn test_params_array_is_one_parameter() {
        let source = "class A { int Sum(params int[] values) { return 0; } }";
        let parsed = parse(source);
        let procedures = parsed.procedures(true);
        let params = procedures[0].parameters();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name(), "values");
        assert_eq!(&source[params[0].span()], "params int[] values");
    }

    #[test]
    fn test_body_absent_for_abstract_and_expression_bodied() {
        let parsed = parse(
            "abstract class A { abstract void M(int a); int N(int b) => b; void O(int c) { } }",
        );
        let procedures = parsed.procedures(true);
        assert!(procedures[0].body().is_none());
        assert!(procedures[1].body().is_none());
        assert!(procedures[2].body().is_some());
    }

    #[test]
    fn test_documentation_summary() {
        let parsed = parse(
            r#"
class A {
    /// <summary>
    /// Handles an id
    ///   for the caller.
    /// </summary>
    /// <param name="id">The id.</param>
    void Process(int id);

    // not documentation
    void Other(int x) {}
}
"#,
        );
        let procedures = parsed.procedures(true);
        assert_eq!(procedures[0].documentation(), "Handles an id for the caller.");
        assert_eq!(procedures[1].documentation(), "");
    }

    #[test]
    fn test_summary_tag_is_case_insensitive() {
        assert_eq!(extract_summary("<Summary>handles an id</Summary>"), "handles an id");
        assert_eq!(extract_summary("<remarks>nothing</remarks>"), "");
        assert_eq!(extract_summary("<summary/>"), "");
    }

    #[test]
    fn test_statement_kinds() {
        assert!(is_statement_kind("expression_statement"));
        assert!(is_statement_kind("block"));
        assert!(is_statement_kind("local_function_statement"));
        assert!(!is_statement_kind("global_statement"));
        assert!(!is_statement_kind("invocation_expression"));
    }

    #[test]
    fn test_syntax_errors_are_tolerated() {
        let parsed = parse("class A { void M(int a) { a + ; } }");
        assert!(parsed.has_errors());
        assert_eq!(parsed.procedures(true).len(), 1);
    }
}
