//! Canonical display names for C# type syntax.

/// CLR type names displayed as their C# keyword.
const KEYWORD_ALIASES: &[(&str, &str)] = &[
    ("Boolean", "bool"),
    ("Byte", "byte"),
    ("SByte", "sbyte"),
    ("Char", "char"),
    ("Decimal", "decimal"),
    ("Double", "double"),
    ("Single", "float"),
    ("Int16", "short"),
    ("UInt16", "ushort"),
    ("Int32", "int"),
    ("UInt32", "uint"),
    ("Int64", "long"),
    ("UInt64", "ulong"),
    ("IntPtr", "nint"),
    ("UIntPtr", "nuint"),
    ("Object", "object"),
    ("String", "string"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Dotted identifier path such as `System.Collections.Generic.List`
    Path(String),
    /// Single punctuation character, or a space
    Punct(char),
}

/// Canonical display form of a type as written in source.
///
/// Whitespace is normalised (`Dictionary<string, int>`), `global::` is
/// stripped, CLR names are shown as keywords and `Nullable<T>` as `T?`.
/// Returns `None` for empty text and for `var`.
pub fn canonical_type_name(text: &str) -> Option<String> {
    let normalized = normalize_whitespace(text).replace("global::", "");
    if normalized.is_empty() || normalized == "var" {
        return None;
    }

    let tokens = tokenize(&normalized);
    Some(render(&tokens))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '@'
}

fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && out.chars().last().is_some_and(is_ident_char) && is_ident_char(c) {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
        if c == ',' {
            out.push(' ');
        }
    }

    out.trim_end().to_string()
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut path = String::new();

    for c in text.chars() {
        if is_ident_char(c) || (c == '.' && !path.is_empty()) {
            path.push(c);
            continue;
        }
        if !path.is_empty() {
            tokens.push(Token::Path(std::mem::take(&mut path)));
        }
        tokens.push(Token::Punct(c));
    }
    if !path.is_empty() {
        tokens.push(Token::Path(path));
    }
    tokens
}

fn keyword_alias(path: &str) -> Option<&'static str> {
    let simple = path.strip_prefix("System.").unwrap_or(path);
    KEYWORD_ALIASES
        .iter()
        .find(|(clr, _)| *clr == simple)
        .map(|(_, keyword)| *keyword)
}

fn is_nullable(path: &str) -> bool {
    path == "Nullable" || path == "System.Nullable"
}

/// Index of the `>` closing the `<` at `open`.
fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::Punct('<') => depth += 1,
            Token::Punct('>') => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut index = 0;

    while index < tokens.len() {
        match &tokens[index] {
            Token::Path(path)
                if is_nullable(path) && tokens.get(index + 1) == Some(&Token::Punct('<')) =>
            {
                if let Some(close) = matching_close(tokens, index + 1) {
                    out.push_str(&render(&tokens[index + 2..close]));
                    out.push('?');
                    index = close + 1;
                    continue;
                }
                out.push_str(path);
            }
            Token::Path(path) => out.push_str(keyword_alias(path).unwrap_or(path)),
            Token::Punct(c) => out.push(*c),
        }
        index += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_pass_through() {
        assert_eq!(canonical_type_name("int").as_deref(), Some("int"));
        assert_eq!(canonical_type_name("string[]").as_deref(), Some("string[]"));
    }

    #[test]
    fn whitespace_is_normalised() {
        assert_eq!(
            canonical_type_name("Dictionary< string ,\n   List<int> >").as_deref(),
            Some("Dictionary<string, List<int>>")
        );
        assert_eq!(canonical_type_name("(int a,int b)").as_deref(), Some("(int a, int b)"));
    }

    #[test]
    fn clr_names_become_keywords() {
        assert_eq!(canonical_type_name("System.Int32").as_deref(), Some("int"));
        assert_eq!(canonical_type_name("global::System.String").as_deref(), Some("string"));
        assert_eq!(
            canonical_type_name("List<System.Boolean>").as_deref(),
            Some("List<bool>")
        );
        assert_eq!(canonical_type_name("MyApp.Int32Wrapper").as_deref(), Some("MyApp.Int32Wrapper"));
    }

    #[test]
    fn nullable_is_shown_with_question_mark() {
        assert_eq!(canonical_type_name("Nullable<int>").as_deref(), Some("int?"));
        assert_eq!(
            canonical_type_name("System.Nullable<System.DateTime>").as_deref(),
            Some("System.DateTime?")
        );
        assert_eq!(
            canonical_type_name("List<Nullable<Int64>>").as_deref(),
            Some("List<long?>")
        );
    }

    #[test]
    fn implicit_and_empty_types_do_not_resolve() {
        assert_eq!(canonical_type_name("var"), None);
        assert_eq!(canonical_type_name("   "), None);
    }
}
