//! `if-feature` resolution.

use yang_compiler_diagnostics::Diagnostic;
use yang_compiler_schema::{FeatureId, ModuleId, NodeFlags, SchemaContext};

use crate::error::{ResolveError, ResolveResult};
use crate::path::parse_node_identifier;
use crate::status::check_status;

/// Find a feature by `[prefix:]name` in the referenced module and its
/// included submodules, status-checking the reference.
pub fn resolve_feature(
    ctx: &SchemaContext,
    name: &str,
    module: ModuleId,
    referring_flags: NodeFlags,
    referring_name: &str,
) -> ResolveResult<FeatureId> {
    let (ident, len) =
        parse_node_identifier(name).map_err(|off| {
            ResolveError::fatal(Diagnostic::unexpected_char(&name[off..]))
        })?;
    if len < name.len() {
        return Err(ResolveError::fatal(Diagnostic::unexpected_char(
            &name[len..],
        )));
    }

    let target = ctx
        .resolve_reference_module(module, ident.module)
        .ok_or_else(|| {
            ResolveError::fatal(Diagnostic::error(
                yang_compiler_diagnostics::DiagnosticCode::InMod,
                format!("Module name \"{name}\" refers to an unknown module."),
            ))
        })?;

    let main = ctx.main_module(target);
    let found = ctx.modules[main]
        .features
        .iter()
        .chain(
            ctx.modules[main]
                .includes
                .iter()
                .flat_map(|&inc| ctx.modules[inc].features.iter()),
        )
        .copied()
        .find(|&f| ctx.str(ctx.features[f].name) == ident.name);

    let feature = found
        .ok_or_else(|| ResolveError::deferred(Diagnostic::unresolved("feature", name)))?;

    check_status(
        ctx,
        referring_flags,
        module,
        referring_name,
        ctx.features[feature].flags,
        ctx.features[feature].module,
        ident.name,
    )
    .map_err(ResolveError::fatal)?;

    Ok(feature)
}
