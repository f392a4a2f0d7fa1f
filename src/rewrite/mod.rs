//! The single-parameter duplication rewrite.
//!
//! [`orchestrator`] walks every procedure of a parsed file. For each one with
//! exactly one parameter it asks a [`crate::naming::NameSuggester`] for a
//! fresh name ([`context_builder`], [`scope_collector`]), appends a copy of the
//! parameter, and duplicates the first statement that uses it ([`locator`]).
//! All changes are [`edits::TextEdit`] insertions rendered in one pass.

pub mod context_builder;
pub mod edits;
pub mod locator;
pub mod orchestrator;
pub mod scope_collector;

pub use edits::{SourceRenderer, TextEdit};
pub use orchestrator::{DuplicateSingleParameterRewriter, ProcedureState, RewriteOutcome, RewriteStats};
