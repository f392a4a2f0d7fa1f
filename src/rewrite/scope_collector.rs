//! Names already bound inside a procedure.

use crate::lang::csharp::walk_preorder;
use crate::lang::ProcedureView;
use crate::naming::ScopeNameSet;
use crate::semantic::SymbolResolver;

/// Collect every name bound anywhere in `procedure`.
///
/// Covers parameters, locals, `for`/`foreach`/`using`/`catch` variables,
/// pattern and `out var` designations, lambda and local-function parameters
/// and local-function names. Each binder is resolved through `resolver`, so the
/// set holds declared names rather than raw identifier text.
pub fn collect(procedure: &ProcedureView<'_>, resolver: &dyn SymbolResolver) -> ScopeNameSet {
    let mut names = ScopeNameSet::new();

    walk_preorder(procedure.node(), &mut |node| {
        if !matches!(node.kind(), "identifier" | "implicit_parameter") {
            return;
        }
        if let Some(symbol) = resolver
            .resolve_declared(node)
            .and_then(|id| resolver.symbol(id))
        {
            names.insert(&symbol.name);
        }
    });

    // Parameters are bound even when the resolver could not see them.
    for parameter in procedure.parameters() {
        names.insert(parameter.name());
    }

    names
}
