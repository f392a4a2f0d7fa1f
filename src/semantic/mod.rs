//! Symbol resolution over parsed C# source.
//!
//! The rewrite pipeline never compares identifiers by text alone: a reference
//! matches a parameter only when both resolve to the same [`SymbolId`]. The
//! [`SymbolResolver`] trait is the seam; [`SemanticModel`] is the lexical
//! implementation used for single files.

pub mod model;
pub mod types;

use std::fmt;

use tree_sitter::Node;

pub use model::SemanticModel;
pub use types::canonical_type_name;

/// Identity of one declaration, comparable across resolutions.
///
/// Derived from the byte offset of the declaring identifier, so two resolutions
/// of the same declaration always compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(usize);

impl SymbolId {
    /// Symbol declared by the identifier starting at `offset`
    pub const fn from_offset(offset: usize) -> Self {
        Self(offset)
    }

    /// Byte offset of the declaring identifier
    pub const fn offset(self) -> usize {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What introduced a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Procedure, lambda or anonymous method parameter
    Parameter,
    /// Local variable, loop/catch/pattern variable
    Local,
    /// Local function name
    LocalFunction,
    /// LINQ range variable (`from`, `let`, `join`, `into`)
    RangeVariable,
}

/// A declared name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Identity
    pub id: SymbolId,
    /// Name without a verbatim `@` prefix
    pub name: String,
    /// Declaration kind
    pub kind: SymbolKind,
}

/// Resolves declarations, references and types for one syntax tree.
pub trait SymbolResolver {
    /// Symbol declared by a binder node (a parameter, declarator, catch
    /// declaration, local function, or the declaring identifier itself).
    fn resolve_declared(&self, binder: Node<'_>) -> Option<SymbolId>;

    /// Symbol an identifier in expression position refers to. `None` for
    /// identifiers that are not references or refer to members and types.
    fn resolve_reference(&self, identifier: Node<'_>) -> Option<SymbolId>;

    /// Canonical display name of a type node.
    fn resolve_type(&self, type_node: Node<'_>) -> Option<String>;

    /// Look up a symbol by identity.
    fn symbol(&self, id: SymbolId) -> Option<&Symbol>;
}

/// Strip the verbatim-identifier prefix.
pub fn unverbatim(name: &str) -> &str {
    name.strip_prefix('@').unwrap_or(name)
}
