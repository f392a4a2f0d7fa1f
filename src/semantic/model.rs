//! Lexical semantic model for a single C# file.
//!
//! The model walks the tree once, maintaining a stack of scopes, and records
//! every local declaration together with the declaration each expression-position
//! identifier resolves to. Members, types and namespaces are not modelled: an
//! identifier that does not bind to a parameter, local, local function or range
//! variable stays unresolved.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;
use tree_sitter::Node;

use super::types::canonical_type_name;
use super::{unverbatim, Symbol, SymbolId, SymbolKind, SymbolResolver};
use crate::lang::csharp::{collect_parameters, node_text, LOCAL_FUNCTION_KIND};
use crate::lang::ParsedSource;

/// Declarations with their own parameter list.
const PROCEDURE_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "destructor_declaration",
    "operator_declaration",
    "conversion_operator_declaration",
    "indexer_declaration",
    "delegate_declaration",
    LOCAL_FUNCTION_KIND,
];

/// Constructs that open a scope without binding anything themselves.
const SCOPE_KINDS: &[&str] = &[
    "block",
    "switch_body",
    "for_statement",
    "using_statement",
    "fixed_statement",
    "catch_clause",
    "query_expression",
    "accessor_declaration",
];

/// Direct identifier children of these nodes name types, members or labels.
const NON_REFERENCE_PARENTS: &[&str] = &[
    "qualified_name",
    "alias_qualified_name",
    "generic_name",
    "type_argument_list",
    "type_parameter",
    "type_parameter_list",
    "type_parameter_constraint",
    "type_parameter_constraints_clause",
    "array_type",
    "nullable_type",
    "pointer_type",
    "ref_type",
    "scoped_type",
    "tuple_element",
    "parameter_list",
    "bracketed_parameter_list",
    "attribute",
    "attribute_list",
    "labeled_statement",
    "goto_statement",
    "using_directive",
    "extern_alias_directive",
    "base_list",
    "explicit_interface_specifier",
    "enum_member_declaration",
    "name_colon",
    "name_equals",
];

/// Subtrees that never contain local references.
const SKIPPED_KINDS: &[&str] = &[
    "attribute_list",
    "type_parameter_list",
    "type_parameter_constraints_clause",
    "comment",
];

/// Identifier-keyed symbol table for one parsed file
pub struct SemanticModel<'s> {
    source: &'s str,
    symbols: BTreeMap<SymbolId, Symbol>,
    references: HashMap<usize, SymbolId>,
}

impl<'s> SemanticModel<'s> {
    /// Build the model for a parsed file.
    pub fn build(parsed: &'s ParsedSource) -> Self {
        let mut binder = Binder {
            source: parsed.source(),
            scopes: Vec::new(),
            symbols: BTreeMap::new(),
            references: HashMap::new(),
        };
        binder.with_scope(|b| b.visit(parsed.root_node()));

        debug!(
            "Semantic model: {} symbols, {} resolved references",
            binder.symbols.len(),
            binder.references.len()
        );

        Self {
            source: parsed.source(),
            symbols: binder.symbols,
            references: binder.references,
        }
    }

    /// All declared symbols ordered by declaration position
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Byte offsets of every identifier resolving to `id`, in document order
    pub fn references_to(&self, id: SymbolId) -> Vec<usize> {
        let mut offsets: Vec<usize> = self
            .references
            .iter()
            .filter(|(_, target)| **target == id)
            .map(|(offset, _)| *offset)
            .collect();
        offsets.sort_unstable();
        offsets
    }
}

impl SymbolResolver for SemanticModel<'_> {
    fn resolve_declared(&self, binder: Node<'_>) -> Option<SymbolId> {
        let name_node = match binder.kind() {
            "identifier" | "implicit_parameter" => binder,
            "foreach_statement" => binder.child_by_field_name("left")?,
            _ => binder.child_by_field_name("name")?,
        };
        let id = SymbolId::from_offset(name_node.start_byte());
        self.symbols.contains_key(&id).then_some(id)
    }

    fn resolve_reference(&self, identifier: Node<'_>) -> Option<SymbolId> {
        if identifier.kind() != "identifier" {
            return None;
        }
        self.references.get(&identifier.start_byte()).copied()
    }

    fn resolve_type(&self, type_node: Node<'_>) -> Option<String> {
        if type_node.is_error() || type_node.is_missing() || type_node.has_error() {
            return None;
        }
        canonical_type_name(node_text(type_node, self.source))
    }

    fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(&id)
    }
}

/// Single-pass scope walker that populates the model.
struct Binder<'s> {
    source: &'s str,
    scopes: Vec<HashMap<String, SymbolId>>,
    symbols: BTreeMap<SymbolId, Symbol>,
    references: HashMap<usize, SymbolId>,
}

impl<'s> Binder<'s> {
    fn with_scope(&mut self, body: impl FnOnce(&mut Self)) {
        self.scopes.push(HashMap::new());
        body(self);
        self.scopes.pop();
    }

    fn declare(&mut self, identifier: Node<'_>, kind: SymbolKind) {
        let name = unverbatim(node_text(identifier, self.source));
        if name.is_empty() || name == "_" {
            return;
        }

        let id = SymbolId::from_offset(identifier.start_byte());
        if self.symbols.contains_key(&id) {
            return;
        }
        self.symbols.insert(
            id,
            Symbol {
                id,
                name: name.to_string(),
                kind,
            },
        );
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), id);
        }
    }

    fn record_reference(&mut self, identifier: Node<'_>) {
        let name = unverbatim(node_text(identifier, self.source));
        let resolved = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied());
        if let Some(id) = resolved {
            self.references.insert(identifier.start_byte(), id);
        }
    }

    fn visit(&mut self, node: Node<'_>) {
        let kind = node.kind();
        if SKIPPED_KINDS.contains(&kind) {
            return;
        }

        if PROCEDURE_KINDS.contains(&kind) {
            self.visit_procedure(node);
        } else if SCOPE_KINDS.contains(&kind) {
            self.with_scope(|b| {
                b.hoist_local_functions(node);
                b.visit_children(node, None);
            });
        } else {
            match kind {
                "lambda_expression" | "anonymous_method_expression" => self.visit_lambda(node),
                "foreach_statement" => self.visit_foreach(node),
                "variable_declarator" => self.visit_declarator(node),
                "catch_declaration" => {
                    if let Some(name) = node.child_by_field_name("name") {
                        self.declare(name, SymbolKind::Local);
                    }
                }
                "declaration_expression" => {
                    if let Some(name) = node.child_by_field_name("name") {
                        self.declare_designation(name, SymbolKind::Local);
                    }
                }
                "declaration_pattern" | "var_pattern" | "recursive_pattern" => {
                    self.visit_pattern(node)
                }
                "from_clause" | "let_clause" | "join_clause" | "join_into_clause"
                | "query_continuation" => self.visit_query_clause(node),
                _ => self.visit_children(node, None),
            }
        }
    }

    /// Visit children, recording references for identifiers in expression
    /// position. `skip` names one child that was already handled as a binder.
    fn visit_children(&mut self, node: Node<'_>, skip: Option<Node<'_>>) {
        let mut cursor = node.walk();
        if !cursor.goto_first_child() {
            return;
        }
        loop {
            let child = cursor.node();
            let field = cursor.field_name();
            if skip.map_or(true, |s| s.id() != child.id()) {
                if child.kind() == "identifier" {
                    if is_reference_position(node, child, field) {
                        self.record_reference(child);
                    }
                } else {
                    self.visit(child);
                }
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    /// Local functions are in scope throughout their enclosing block.
    fn hoist_local_functions(&mut self, scope_node: Node<'_>) {
        let mut cursor = scope_node.walk();
        for child in scope_node.named_children(&mut cursor) {
            if child.kind() == LOCAL_FUNCTION_KIND {
                if let Some(name) = child.child_by_field_name("name") {
                    self.declare(name, SymbolKind::LocalFunction);
                }
            } else if child.kind() == "switch_section" {
                self.hoist_local_functions(child);
            }
        }
    }

    fn declare_parameters(&mut self, parameter_list: Node<'_>) {
        for parameter in collect_parameters(parameter_list, self.source) {
            self.declare(parameter.name_node(), SymbolKind::Parameter);
        }
    }

    fn visit_procedure(&mut self, node: Node<'_>) {
        if node.kind() == LOCAL_FUNCTION_KIND {
            if let Some(name) = node.child_by_field_name("name") {
                self.declare(name, SymbolKind::LocalFunction);
            }
        }

        self.with_scope(|b| {
            let parameters = node.child_by_field_name("parameters").or_else(|| {
                let mut cursor = node.walk();
                let found = node
                    .named_children(&mut cursor)
                    .find(|c| matches!(c.kind(), "parameter_list" | "bracketed_parameter_list"));
                found
            });
            if let Some(list) = parameters {
                b.declare_parameters(list);
            }
            b.visit_children(node, None);
        });
    }

    fn visit_lambda(&mut self, node: Node<'_>) {
        self.with_scope(|b| {
            let parameters = node.child_by_field_name("parameters").or_else(|| {
                let mut cursor = node.walk();
                let found = node
                    .named_children(&mut cursor)
                    .find(|c| c.kind() == "parameter_list");
                found
            });

            let mut implicit = None;
            if let Some(params) = parameters {
                match params.kind() {
                    "parameter_list" => b.declare_parameters(params),
                    "identifier" | "implicit_parameter" => {
                        b.declare(params, SymbolKind::Parameter);
                        implicit = Some(params);
                    }
                    _ => {}
                }
            }
            b.visit_children(node, implicit);
        });
    }

    fn visit_foreach(&mut self, node: Node<'_>) {
        self.with_scope(|b| {
            let left = node.child_by_field_name("left");
            if let Some(left) = left {
                b.declare_designation(left, SymbolKind::Local);
            }
            b.visit_children(node, left);
        });
    }

    fn visit_declarator(&mut self, node: Node<'_>) {
        let is_field = node
            .parent()
            .filter(|p| p.kind() == "variable_declaration")
            .and_then(|p| p.parent())
            .is_some_and(|gp| {
                matches!(gp.kind(), "field_declaration" | "event_field_declaration")
            });

        let binder = node.child_by_field_name("name").or_else(|| {
            let mut cursor = node.walk();
            let found = node
                .named_children(&mut cursor)
                .find(|c| c.kind() == "tuple_pattern");
            found
        });

        if let (Some(binder), false) = (binder, is_field) {
            self.declare_designation(binder, SymbolKind::Local);
        }
        self.visit_children(node, binder);
    }

    fn visit_pattern(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        if !cursor.goto_first_child() {
            return;
        }
        loop {
            let child = cursor.node();
            let field = cursor.field_name();
            let is_designation = field == Some("name")
                || matches!(child.kind(), "parenthesized_variable_designation" | "discard")
                || (child.kind() == "identifier" && node.kind() != "recursive_pattern")
                || (child.kind() == "identifier" && child.next_named_sibling().is_none());

            if field == Some("type") {
                // types carry no references
            } else if is_designation {
                self.declare_designation(child, SymbolKind::Local);
            } else {
                self.visit(child);
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    fn visit_query_clause(&mut self, node: Node<'_>) {
        let mut leading = Vec::new();
        let mut after_separator = false;
        let mut after_into = false;

        let mut cursor = node.walk();
        if !cursor.goto_first_child() {
            return;
        }
        loop {
            let child = cursor.node();
            let field = cursor.field_name();
            match child.kind() {
                "in" | "=" | "on" => after_separator = true,
                "into" => after_into = true,
                "identifier" if after_into => {
                    self.declare(child, SymbolKind::RangeVariable);
                    after_into = false;
                }
                "identifier" if !after_separator && field != Some("type") => leading.push(child),
                "identifier" if after_separator => self.record_reference(child),
                _ if child.is_named() => self.visit(child),
                _ => {}
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }

        // In `from Customer c in xs` only the identifier closest to `in` binds.
        if let Some(binder) = leading.last() {
            self.declare(*binder, SymbolKind::RangeVariable);
        }
    }

    /// Declare every identifier in a designation, tuple pattern or plain
    /// identifier. Discards bind nothing.
    fn declare_designation(&mut self, node: Node<'_>, kind: SymbolKind) {
        match node.kind() {
            "identifier" | "implicit_parameter" => self.declare(node, kind),
            "discard" => {}
            "parenthesized_variable_designation" | "tuple_pattern" | "tuple_expression"
            | "argument" => {
                let mut cursor = node.walk();
                let children: Vec<_> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.declare_designation(child, kind);
                }
            }
            "declaration_expression" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.declare_designation(name, kind);
                }
            }
            _ => {}
        }
    }
}

/// Whether an identifier child of `parent` is an expression-position reference.
fn is_reference_position(parent: Node<'_>, identifier: Node<'_>, field: Option<&str>) -> bool {
    if matches!(field, Some("name" | "type" | "returns")) {
        return false;
    }

    let parent_kind = parent.kind();
    if NON_REFERENCE_PARENTS.contains(&parent_kind) {
        return false;
    }

    match parent_kind {
        "as_expression" | "is_expression" if field == Some("right") => false,
        // `new Foo { Bar = x }`: `Bar` names a member of the created object.
        "assignment_expression" if field == Some("left") => !is_initializer_target(parent),
        // `new { Name = x }`, `p with { X = 1 }`, `{ Prop: 3 }`
        "anonymous_object_creation_expression" | "with_initializer" | "subpattern" => {
            !identifier
                .next_sibling()
                .is_some_and(|next| matches!(next.kind(), "=" | ":"))
        }
        _ => true,
    }
}

fn is_initializer_target(assignment: Node<'_>) -> bool {
    assignment
        .parent()
        .filter(|p| p.kind() == "initializer_expression")
        .and_then(|p| p.parent())
        .is_some_and(|owner| {
            matches!(
                owner.kind(),
                "object_creation_expression"
                    | "implicit_object_creation_expression"
                    | "assignment_expression"
                    | "with_expression"
            )
        })
}
