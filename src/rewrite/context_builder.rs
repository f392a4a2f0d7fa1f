//! Naming context for a parameter.

use crate::lang::{ParameterView, ProcedureView};
use crate::naming::NamingContext;
use crate::semantic::SymbolResolver;

/// Type label used when a parameter's type cannot be resolved.
pub const UNRESOLVED_TYPE: &str = "object";

/// Describe `parameter` of `procedure` for the naming strategy.
pub fn build(
    procedure: &ProcedureView<'_>,
    parameter: &ParameterView<'_>,
    resolver: &dyn SymbolResolver,
) -> NamingContext {
    let type_name = parameter
        .type_node()
        .and_then(|type_node| resolver.resolve_type(type_node))
        .unwrap_or_else(|| UNRESOLVED_TYPE.to_string());

    NamingContext {
        procedure_name: procedure.name().to_string(),
        type_name,
        documentation_summary: procedure.documentation().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::CSharpAdapter;
    use crate::semantic::SemanticModel;

    fn context_for(source: &str) -> NamingContext {
        let parsed = CSharpAdapter::new().unwrap().parse_source(source).unwrap();
        let model = SemanticModel::build(&parsed);
        let procedures = parsed.procedures(true);
        let procedure = &procedures[0];
        build(procedure, &procedure.parameters()[0], &model)
    }

    #[test]
    fn documented_procedure() {
        let context = context_for(
            "class A {\n    /// <summary>handles an id</summary>\n    void Process(int id);\n}",
        );
        assert_eq!(context.procedure_name, "Process");
        assert_eq!(context.type_name, "int");
        assert_eq!(context.documentation_summary, "handles an id");
        assert_eq!(
            context.describe(),
            "Method description: handles an id\nType: int in method Process"
        );
    }

    #[test]
    fn generic_type_is_canonical() {
        let context = context_for("class A { void Load(System.Collections.Generic.List< System.String > names) { } }");
        assert_eq!(context.type_name, "System.Collections.Generic.List<string>");
        assert_eq!(context.documentation_summary, "");
    }

    #[test]
    fn implicit_lambda_style_parameter_falls_back_to_object() {
        let parsed = CSharpAdapter::new()
            .unwrap()
            .parse_source("class A { void M(var x) { } }")
            .unwrap();
        let model = SemanticModel::build(&parsed);
        let procedures = parsed.procedures(true);
        let context = build(&procedures[0], &procedures[0].parameters()[0], &model);
        assert_eq!(context.type_name, UNRESOLVED_TYPE);
    }
}
