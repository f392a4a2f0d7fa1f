//! Drives the single-parameter duplication over a whole file.

use tracing::{debug, info};

use super::edits::TextEdit;
use super::{context_builder, locator, scope_collector};
use crate::lang::{ParameterView, ParsedSource, ProcedureView};
use crate::naming::NameSuggester;
use crate::semantic::SymbolResolver;

/// Per-procedure progress, logged at `debug` on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureState {
    /// Parameter count is not one; left unchanged
    Skip,
    /// Exactly one parameter
    Eligible,
    /// A collision-free name was chosen
    NameChosen,
    /// The parameter list gained the duplicate
    ParameterDuplicated,
    /// The first usage was duplicated (or there was none to duplicate)
    UsageDuplicated,
    /// Counted as changed
    Done,
}

/// Counters aggregated over one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Whether any single-parameter procedure exists
    pub found_any: bool,
    /// Procedures that were transformed
    pub changes_count: usize,
    /// Procedures visited
    pub procedures_seen: usize,
    /// Transformed procedures whose first usage was duplicated
    pub usages_duplicated: usize,
}

/// Edits and counters produced by one rewrite
#[derive(Debug, Clone, Default)]
pub struct RewriteOutcome {
    /// Insertions against the original source
    pub edits: Vec<TextEdit>,
    /// Run counters
    pub stats: RewriteStats,
}

/// Duplicates the parameter of every single-parameter procedure and the first
/// statement that uses it.
///
/// Every procedure is analysed against the unmodified tree; all mutations are
/// collected as insertions and applied afterwards, so transforming an outer
/// procedure never affects how a nested one is evaluated.
pub struct DuplicateSingleParameterRewriter<'a> {
    suggester: &'a dyn NameSuggester,
    include_local_functions: bool,
    candidate_count: usize,
}

impl<'a> DuplicateSingleParameterRewriter<'a> {
    /// Create a rewriter naming duplicates with `suggester`
    pub fn new(suggester: &'a dyn NameSuggester, include_local_functions: bool) -> Self {
        Self {
            suggester,
            include_local_functions,
            candidate_count: 1,
        }
    }

    /// Ask the suggester for up to `count` names and keep the first usable one
    pub fn with_candidate_count(mut self, count: usize) -> Self {
        self.candidate_count = count.max(1);
        self
    }

    /// Visit every procedure in document order and compute the edits.
    pub async fn rewrite(
        &self,
        parsed: &ParsedSource,
        resolver: &dyn SymbolResolver,
    ) -> RewriteOutcome {
        let mut outcome = RewriteOutcome::default();

        for procedure in parsed.procedures(self.include_local_functions) {
            outcome.stats.procedures_seen += 1;

            let [parameter] = procedure.parameters() else {
                transition(&procedure, ProcedureState::Skip);
                continue;
            };

            outcome.stats.found_any = true;
            transition(&procedure, ProcedureState::Eligible);

            let duplicated_usage = self
                .rewrite_procedure(&procedure, parameter, resolver, &mut outcome.edits)
                .await;

            outcome.stats.changes_count += 1;
            if duplicated_usage {
                outcome.stats.usages_duplicated += 1;
            }
            transition(&procedure, ProcedureState::Done);
        }

        info!(
            "Rewrote {} of {} procedures ({} usages duplicated) with {} naming",
            outcome.stats.changes_count,
            outcome.stats.procedures_seen,
            outcome.stats.usages_duplicated,
            self.suggester.name()
        );
        outcome
    }

    /// Returns whether a usage statement was duplicated.
    async fn rewrite_procedure(
        &self,
        procedure: &ProcedureView<'_>,
        parameter: &ParameterView<'_>,
        resolver: &dyn SymbolResolver,
        edits: &mut Vec<TextEdit>,
    ) -> bool {
        let source = procedure.source();

        let context = context_builder::build(procedure, parameter, resolver);
        let existing = scope_collector::collect(procedure, resolver);
        let new_name = self
            .suggester
            .suggest_best(
                parameter.name(),
                &context,
                &context.type_name,
                &existing,
                self.candidate_count,
            )
            .await;
        debug!(
            "{}: '{}' -> '{}' (type {}, {} names in scope)",
            procedure.name(),
            parameter.name(),
            new_name,
            context.type_name,
            existing.len()
        );
        transition(procedure, ProcedureState::NameChosen);

        let copy = parameter_copy(parameter, source, &new_name);
        edits.push(TextEdit::insert(parameter.span().end, format!(", {}", copy)));
        transition(procedure, ProcedureState::ParameterDuplicated);

        let usage = resolver
            .resolve_declared(parameter.binder())
            .and_then(|symbol| {
                locator::locate_first_usage(procedure, parameter.name(), symbol, resolver)
                    .map(|statement| (symbol, statement))
            });

        let duplicated = match usage {
            Some((symbol, statement)) => {
                let clone =
                    locator::clone_with_rename(statement, source, &new_name, symbol, resolver);
                edits.push(locator::insert_after(statement, source, &clone));
                true
            }
            None => false,
        };
        transition(procedure, ProcedureState::UsageDuplicated);
        duplicated
    }
}

fn transition(procedure: &ProcedureView<'_>, state: ProcedureState) {
    debug!("{} -> {:?}", procedure.name(), state);
}

/// The parameter's own text with the name replaced. Attributes, modifiers and
/// default values are kept; an extension-method `this` is dropped since only
/// the first parameter may carry it.
fn parameter_copy(parameter: &ParameterView<'_>, source: &str, new_name: &str) -> String {
    let span = parameter.span();
    let name = parameter.name_node().byte_range();

    let mut this_modifier = None;
    let binder = parameter.binder();
    let mut walker = binder.walk();
    for child in binder.children(&mut walker) {
        if child.byte_range() != name && source.get(child.byte_range()) == Some("this") {
            this_modifier = Some(child.byte_range());
            break;
        }
    }

    let mut out = String::with_capacity(span.len() + new_name.len());
    let mut cursor = span.start;
    if let Some(this) = this_modifier {
        out.push_str(&source[cursor..this.start]);
        let between = &source[this.end..name.start];
        cursor = name.start - between.trim_start().len();
    }
    out.push_str(&source[cursor..name.start]);
    out.push_str(new_name);
    out.push_str(&source[name.end..span.end]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::CSharpAdapter;
    use crate::naming::DeterministicSuggester;
    use crate::rewrite::edits::SourceRenderer;
    use crate::semantic::SemanticModel;

    async fn rewrite(source: &str) -> (String, RewriteStats) {
        let parsed = CSharpAdapter::new().unwrap().parse_source(source).unwrap();
        let model = SemanticModel::build(&parsed);
        let suggester = DeterministicSuggester;
        let rewriter = DuplicateSingleParameterRewriter::new(&suggester, true);
        let outcome = rewriter.rewrite(&parsed, &model).await;
        let text = SourceRenderer::render(source, &outcome.edits).unwrap();
        (text, outcome.stats)
    }

    #[tokio::test]
    async fn abs_gets_value2_and_duplicated_return() {
        let source = "class M {\n    int Abs(int value) {\n        return value < 0 ? -value : value;\n    }\n}\n";
        let (text, stats) = rewrite(source).await;
        assert_eq!(
            text,
            "class M {\n    int Abs(int value, int value2) {\n        return value < 0 ? -value : value;\n        return value2 < 0 ? -value2 : value2;\n    }\n}\n"
        );
        assert!(stats.found_any);
        assert_eq!(stats.changes_count, 1);
        assert_eq!(stats.usages_duplicated, 1);
    }

    #[tokio::test]
    async fn bodiless_procedure_counts_without_usage_duplication() {
        let source = "interface I {\n    /// <summary>handles an id</summary>\n    void Process(int id);\n}\n";
        let (text, stats) = rewrite(source).await;
        assert!(text.contains("void Process(int id, int id2);"));
        assert!(stats.found_any);
        assert_eq!(stats.changes_count, 1);
        assert_eq!(stats.usages_duplicated, 0);
    }

    #[tokio::test]
    async fn other_arities_are_untouched() {
        let source = "class A {\n    void None() { }\n    void Two(int a, int b) { Use(a); }\n}\n";
        let (text, stats) = rewrite(source).await;
        assert_eq!(text, source);
        assert!(!stats.found_any);
        assert_eq!(stats.changes_count, 0);
        assert_eq!(stats.procedures_seen, 2);
    }

    #[tokio::test]
    async fn rewriting_twice_is_stable() {
        let source = "class A {\n    void M(string s) {\n        Console.WriteLine(s);\n    }\n}\n";
        let (once, _) = rewrite(source).await;
        let (twice, stats) = rewrite(&once).await;
        assert_eq!(once, twice);
        assert!(!stats.found_any);
    }

    #[tokio::test]
    async fn name_avoids_every_binder_in_scope() {
        let source = "class A {\n    void M(int x) {\n        int x2 = x;\n        var xCopy = x2;\n    }\n}\n";
        let (text, _) = rewrite(source).await;
        assert!(text.contains("void M(int x, int x_copy)"));
        assert!(text.contains("        int x2 = x;\n        int x2 = x_copy;\n"));
    }

    #[tokio::test]
    async fn shadowed_name_is_not_duplicated() {
        let source = "class A {\n    void M(int n) {\n        Func<int, int> f = n => n + 1;\n        Use(n);\n    }\n}\n";
        let (text, _) = rewrite(source).await;
        assert!(text.contains("        Use(n);\n        Use(n2);\n"));
        assert!(!text.contains("f = n2"));
    }

    #[tokio::test]
    async fn nested_local_function_is_rewritten_independently() {
        let source = "class A {\n    void Outer(int a) {\n        int Inner(int b) { return b; }\n        Use(a);\n    }\n}\n";
        let (text, stats) = rewrite(source).await;
        assert_eq!(stats.changes_count, 2);
        assert!(text.contains("void Outer(int a, int a2)"));
        assert!(text.contains("int Inner(int b, int b2) { return b;\n        return b2; }"));
        assert!(text.contains("        Use(a);\n        Use(a2);\n"));
    }

    #[tokio::test]
    async fn usage_in_expression_bodied_local_function_clones_the_function() {
        let source = "class A {\n    void Outer(int a) {\n        int Inner(int b) => a + b;\n    }\n}\n";
        let (text, stats) = rewrite(source).await;
        assert_eq!(stats.changes_count, 2);
        assert!(text.contains(
            "        int Inner(int b, int b2) => a + b;\n        int Inner(int b) => a2 + b;\n"
        ));
    }

    #[tokio::test]
    async fn parameter_text_is_copied_verbatim() {
        let source = "class E {\n    void Opt([In] in int count = 3) { }\n}\n";
        let (text, _) = rewrite(source).await;
        assert!(text.contains("void Opt([In] in int count = 3, [In] in int count2 = 3)"));
    }

    #[test]
    fn extension_this_is_dropped_from_copy() {
        let source = "static class E { static int Length(this string s) => s.Length; }";
        let parsed = CSharpAdapter::new().unwrap().parse_source(source).unwrap();
        let procedures = parsed.procedures(true);
        let parameter = &procedures[0].parameters()[0];
        assert_eq!(parameter_copy(parameter, source, "s2"), "string s2");
    }
}
