//! Naming strategies for the duplicated parameter.
//!
//! Both strategies implement [`NameSuggester`]. The deterministic one is total;
//! the similarity-based one may return nothing, in which case
//! [`NameSuggester::suggest_one`] falls back to [`FALLBACK_NAME`].

pub mod deterministic;
pub mod embeddings;
pub mod index;
pub mod similarity;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::semantic::unverbatim;

pub use deterministic::DeterministicSuggester;
pub use embeddings::{Embedder, FastEmbedder};
pub use index::{InMemoryIndex, IndexRecord, PineconeIndex, ScoredName, SimilarityIndex};
pub use similarity::SimilaritySuggester;

/// Identifier used when no strategy produces a usable name.
pub const FALLBACK_NAME: &str = "param";

/// Reserved C# keywords. Contextual keywords (`var`, `value`, `async`) are
/// valid identifiers and are not listed.
const RESERVED_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

/// Whether `name` is a syntactically valid C# identifier.
///
/// A leading `@` makes keywords usable as identifiers.
pub fn is_valid_identifier(name: &str) -> bool {
    let (verbatim, body) = match name.strip_prefix('@') {
        Some(body) => (true, body),
        None => (false, name),
    };

    let mut chars = body.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_') {
        return false;
    }

    verbatim || !RESERVED_KEYWORDS.contains(&body)
}

/// Every name bound in one procedure's scope.
///
/// Built fresh per procedure. Names are compared without their verbatim `@`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeNameSet {
    names: HashSet<String>,
}

impl ScopeNameSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name; returns false when it was already present
    pub fn insert(&mut self, name: &str) -> bool {
        self.names.insert(unverbatim(name).to_string())
    }

    /// Whether `name` is bound
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(unverbatim(name))
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no name is bound
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in sorted order
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<S: AsRef<str>> FromIterator<S> for ScopeNameSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

/// Description of the parameter being duplicated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingContext {
    /// Declared name of the owning procedure
    pub procedure_name: String,
    /// Canonical parameter type (`"object"` when unresolved)
    pub type_name: String,
    /// First documentation summary of the procedure, or empty
    pub documentation_summary: String,
}

impl NamingContext {
    /// Text embedded by similarity-based naming and stored by corpus harvesting.
    pub fn describe(&self) -> String {
        format_context(
            &self.documentation_summary,
            &self.type_name,
            &self.procedure_name,
        )
    }
}

/// The shared context string format.
pub fn format_context(summary: &str, type_name: &str, procedure_name: &str) -> String {
    format!(
        "Method description: {}\nType: {} in method {}",
        summary, type_name, procedure_name
    )
}

/// Strategy that proposes names for a duplicated parameter.
#[async_trait]
pub trait NameSuggester: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Up to `count` candidate names in preference order, none of them in
    /// `existing`. May be empty.
    async fn suggest(
        &self,
        original: &str,
        context: &NamingContext,
        type_name: &str,
        existing: &ScopeNameSet,
        count: usize,
    ) -> Vec<String>;

    /// The best candidate, or a collision-free fallback. Never fails.
    async fn suggest_one(
        &self,
        original: &str,
        context: &NamingContext,
        type_name: &str,
        existing: &ScopeNameSet,
    ) -> String {
        self.suggest_best(original, context, type_name, existing, 1)
            .await
    }

    /// First valid, unbound name among up to `count` candidates, or a
    /// collision-free fallback. Never fails.
    async fn suggest_best(
        &self,
        original: &str,
        context: &NamingContext,
        type_name: &str,
        existing: &ScopeNameSet,
        count: usize,
    ) -> String {
        let original = if original.trim().is_empty() {
            FALLBACK_NAME
        } else {
            original
        };

        self.suggest(original, context, type_name, existing, count.max(1))
            .await
            .into_iter()
            .find(|name| is_valid_identifier(name) && !existing.contains(name))
            .unwrap_or_else(|| fallback_name(existing))
    }
}

/// [`FALLBACK_NAME`], disambiguated deterministically when already bound.
pub fn fallback_name(existing: &ScopeNameSet) -> String {
    if existing.contains(FALLBACK_NAME) {
        deterministic::first_free(FALLBACK_NAME, existing)
    } else {
        FALLBACK_NAME.to_string()
    }
}
