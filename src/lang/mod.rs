//! Language-specific parsing and syntax views.

pub mod csharp;
pub mod registry;

pub use csharp::{CSharpAdapter, ParameterView, ParsedSource, ProcedureView};
pub use registry::{create_parser_for_language, get_tree_sitter_language, language_key_for_path};
