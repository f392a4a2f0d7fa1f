//! Factory utilities and metadata for the tree-sitter grammars paramdup can parse.

use std::path::Path;
use tree_sitter::{Language, Parser};

use crate::core::errors::{ParamdupError, Result};

/// Metadata describing one registered grammar.
#[derive(Debug, Clone, Copy)]
pub struct LanguageInfo {
    /// Canonical short key (matches CLI/config usage, e.g. "cs").
    pub key: &'static str,
    /// Human-friendly display name.
    pub name: &'static str,
    /// Supported file extensions (without leading dots).
    pub extensions: &'static [&'static str],
}

const REGISTERED_LANGUAGES: &[LanguageInfo] = &[LanguageInfo {
    key: "cs",
    name: "C#",
    extensions: &["cs"],
}];

/// Return the languages that are compiled into this build.
pub fn registered_languages() -> &'static [LanguageInfo] {
    REGISTERED_LANGUAGES
}

/// Identify the canonical language key for a file path.
pub fn language_key_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    REGISTERED_LANGUAGES
        .iter()
        .find(|info| info.extensions.contains(&ext.as_str()))
        .map(|info| info.key)
}

/// Get tree-sitter language for a given language key
pub fn get_tree_sitter_language(language_key: &str) -> Result<Language> {
    match normalize_language_key(language_key) {
        Some("cs") => Ok(tree_sitter_c_sharp::LANGUAGE.into()),
        _ => Err(ParamdupError::unsupported(format!(
            "No tree-sitter grammar for: {}",
            language_key
        ))),
    }
}

/// Create a parser configured for the given language key
pub fn create_parser_for_language(language_key: &str) -> Result<Parser> {
    let language = get_tree_sitter_language(language_key)?;
    let mut parser = Parser::new();
    parser.set_language(&language).map_err(|e| {
        ParamdupError::parse(
            language_key,
            format!("Failed to set tree-sitter language: {}", e),
        )
    })?;
    Ok(parser)
}

fn normalize_language_key(language: &str) -> Option<&'static str> {
    match language.trim().to_ascii_lowercase().as_str() {
        "cs" | "c#" | "csharp" | "c_sharp" => Some("cs"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csharp_aliases_resolve() {
        for key in ["cs", "C#", "csharp"] {
            assert!(get_tree_sitter_language(key).is_ok(), "{key} should resolve");
        }
        assert!(get_tree_sitter_language("cobol").is_err());
    }

    #[test]
    fn language_key_from_extension() {
        assert_eq!(language_key_for_path(Path::new("src/Program.cs")), Some("cs"));
        assert_eq!(language_key_for_path(Path::new("Program.CS")), Some("cs"));
        assert_eq!(language_key_for_path(Path::new("main.rs")), None);
    }

    #[test]
    fn parser_can_be_created() {
        let mut parser = create_parser_for_language("cs").unwrap();
        let tree = parser.parse("class A {}", None).unwrap();
        assert_eq!(tree.root_node().kind(), "compilation_unit");
    }
}
