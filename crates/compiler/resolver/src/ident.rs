//! Identity resolution: linking `base` references, maintaining the derived
//! back-links and rejecting cycles in the identity DAG.

use yang_compiler_diagnostics::{Diagnostic, DiagnosticCode};
use yang_compiler_schema::{IdentityId, ModuleId, SchemaContext, TypeId};

use crate::error::{ResolveError, ResolveResult};
use crate::path::parse_node_identifier;
use crate::status::check_status;

/// Find an identity by name in a module and its included submodules.
pub fn find_identity(ctx: &SchemaContext, module: ModuleId, name: &str) -> Option<IdentityId> {
    let main = ctx.main_module(module);
    ctx.modules[main]
        .identities
        .iter()
        .chain(
            ctx.modules[main]
                .includes
                .iter()
                .flat_map(|&inc| ctx.modules[inc].identities.iter()),
        )
        .copied()
        .find(|&id| ctx.str(ctx.identities[id].name) == name)
}

/// Split a `[prefix:]name` base argument and resolve the module part.
fn resolve_base_name<'a>(
    ctx: &SchemaContext,
    module: ModuleId,
    basename: &'a str,
) -> ResolveResult<(ModuleId, &'a str)> {
    let (mod_name, name) = match basename.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, basename),
    };
    let target = ctx
        .resolve_reference_module(module, mod_name)
        .ok_or_else(|| {
            ResolveError::fatal(Diagnostic::error(
                DiagnosticCode::InMod,
                format!("Module name \"{basename}\" refers to an unknown module."),
            ))
        })?;
    Ok((target, name))
}

/// Whether `candidate` appears in the transitive base closure of `from`
/// (including `from` itself).
fn in_base_closure(ctx: &SchemaContext, from: IdentityId, candidate: IdentityId) -> bool {
    let mut stack = vec![from];
    let mut seen = Vec::new();
    while let Some(cur) = stack.pop() {
        if cur == candidate {
            return true;
        }
        if seen.contains(&cur) {
            continue;
        }
        seen.push(cur);
        stack.extend_from_slice(&ctx.identities[cur].bases);
    }
    false
}

/// Add `derived` to the back-link list of `base` and all its transitive
/// bases.
fn add_derived_backlinks(ctx: &mut SchemaContext, base: IdentityId, derived: IdentityId) {
    let mut stack = vec![base];
    let mut seen = Vec::new();
    while let Some(cur) = stack.pop() {
        if seen.contains(&cur) {
            continue;
        }
        seen.push(cur);
        if !ctx.identities[cur].derived.contains(&derived) {
            ctx.identities[cur].derived.push(derived);
        }
        stack.extend_from_slice(&ctx.identities[cur].bases);
    }
}

/// Resolve one `base` reference of an identity: find the base, reject
/// cycles, link it and maintain the derived back-links.
pub fn resolve_identity_base(
    ctx: &mut SchemaContext,
    module: ModuleId,
    ident: IdentityId,
    basename: &str,
) -> ResolveResult {
    let (target_module, name) = resolve_base_name(ctx, module, basename)?;

    let base = find_identity(ctx, target_module, name).ok_or_else(|| {
        ResolveError::deferred(Diagnostic::unresolved("identity", basename))
    })?;

    // circular reference check
    if in_base_closure(ctx, base, ident) {
        return Err(ResolveError::fatal(
            Diagnostic::invalid_arg(name, "base").with_related(format!(
                "Circular reference of \"{basename}\" identity."
            )),
        ));
    }

    let ident_flags = ctx.identities[ident].flags;
    let ident_module = ctx.identities[ident].module;
    let base_flags = ctx.identities[base].flags;
    let base_module = ctx.identities[base].module;
    let ident_name = ctx.str(ctx.identities[ident].name).to_string();
    let base_name = ctx.str(ctx.identities[base].name).to_string();
    check_status(
        ctx,
        ident_flags,
        ident_module,
        &ident_name,
        base_flags,
        base_module,
        &base_name,
    )
    .map_err(ResolveError::fatal)?;

    if !ctx.identities[ident].bases.contains(&base) {
        ctx.identities[ident].bases.push(base);
    }
    // the identity and everything already derived from it back-link into
    // the new base closure
    let derived_closure: Vec<IdentityId> = std::iter::once(ident)
        .chain(ctx.identities[ident].derived.iter().copied())
        .collect();
    for derived in derived_closure {
        add_derived_backlinks(ctx, base, derived);
    }

    Ok(())
}

/// Resolve the `base` of an identityref type.
pub fn resolve_identref_base(
    ctx: &mut SchemaContext,
    module: ModuleId,
    type_id: TypeId,
) -> ResolveResult {
    let basename = match &ctx.types[type_id].identity_base_name {
        Some(basename) => basename.clone(),
        None => {
            return Err(ResolveError::fatal(Diagnostic::internal(
                "identityref without base",
            )))
        }
    };

    let (target_module, name) = resolve_base_name(ctx, module, &basename)?;
    let base = find_identity(ctx, target_module, name).ok_or_else(|| {
        ResolveError::deferred(Diagnostic::unresolved("type", &basename))
    })?;

    // status is checked against the node carrying the type, when known
    if let Some(node) = ctx.types[type_id].parent_node {
        let node_flags = ctx.nodes[node].flags;
        let node_module = ctx.nodes[node].module;
        let node_name = ctx.str(ctx.nodes[node].name).to_string();
        let base_flags = ctx.identities[base].flags;
        let base_module = ctx.identities[base].module;
        let base_name = ctx.str(ctx.identities[base].name).to_string();
        check_status(
            ctx,
            node_flags,
            node_module,
            &node_name,
            base_flags,
            base_module,
            &base_name,
        )
        .map_err(ResolveError::fatal)?;
    }

    ctx.types[type_id].identity_base = Some(base);
    Ok(())
}

/// Resolve an identityref value in JSON format against a base identity:
/// the value names the base itself or one of its derived identities,
/// optionally qualified by a module name.
pub fn resolve_identref(
    ctx: &SchemaContext,
    base: IdentityId,
    value: &str,
) -> Result<IdentityId, Diagnostic> {
    let (ident, len) =
        parse_node_identifier(value).map_err(|off| Diagnostic::unexpected_char(&value[off..]))?;
    if len < value.len() {
        return Err(Diagnostic::unexpected_char(&value[len..]));
    }

    let matches = |id: IdentityId| {
        let record = &ctx.identities[id];
        if ctx.str(record.name) != ident.name {
            return false;
        }
        match ident.module {
            Some(mod_name) => {
                let main = ctx.main_module(record.module);
                ctx.str(ctx.modules[main].name) == mod_name
            }
            None => true,
        }
    };

    if matches(base) {
        return Ok(base);
    }
    for &derived in &ctx.identities[base].derived {
        if matches(derived) {
            return Ok(derived);
        }
    }

    Err(Diagnostic::unresolved("identityref", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use yang_compiler_schema::{Identity, Module};

    fn ctx_with_module() -> (SchemaContext, ModuleId) {
        let mut ctx = SchemaContext::new();
        let name = ctx.intern("m");
        let prefix = ctx.intern("m");
        let module = ctx.add_module(Module::new(name, prefix));
        (ctx, module)
    }

    fn add_identity(ctx: &mut SchemaContext, module: ModuleId, name: &str) -> IdentityId {
        let sym = ctx.intern(name);
        let id = ctx.add_identity(Identity::new(sym, module));
        ctx.modules[module].identities.push(id);
        id
    }

    #[test]
    fn test_base_resolution_and_backlinks() {
        let (mut ctx, m) = ctx_with_module();
        let root = add_identity(&mut ctx, m, "crypto-alg");
        let mid = add_identity(&mut ctx, m, "sym-alg");
        let leaf = add_identity(&mut ctx, m, "aes");

        resolve_identity_base(&mut ctx, m, mid, "crypto-alg").unwrap();
        resolve_identity_base(&mut ctx, m, leaf, "sym-alg").unwrap();

        assert_eq!(ctx.identities[mid].bases, vec![root]);
        assert_eq!(ctx.identities[leaf].bases, vec![mid]);
        // every transitive base lists the derived identity
        assert!(ctx.identities[root].derived.contains(&mid));
        assert!(ctx.identities[root].derived.contains(&leaf));
        assert!(ctx.identities[mid].derived.contains(&leaf));
    }

    #[test]
    fn test_identity_cycle_rejected() {
        let (mut ctx, m) = ctx_with_module();
        let a = add_identity(&mut ctx, m, "id-a");
        let b = add_identity(&mut ctx, m, "id-b");

        resolve_identity_base(&mut ctx, m, a, "id-b").unwrap();
        let err = resolve_identity_base(&mut ctx, m, b, "id-a").unwrap_err();
        assert!(!err.is_deferred());
        assert_eq!(err.diagnostic().code, DiagnosticCode::InArg);
        assert!(err.diagnostic().related[0].contains("Circular reference"));
    }

    #[test]
    fn test_unknown_base_is_deferred() {
        let (mut ctx, m) = ctx_with_module();
        let a = add_identity(&mut ctx, m, "id-a");
        let err = resolve_identity_base(&mut ctx, m, a, "missing").unwrap_err();
        assert!(err.is_deferred());
    }

    #[test]
    fn test_identref_value_resolution() {
        let (mut ctx, m) = ctx_with_module();
        let base = add_identity(&mut ctx, m, "alg");
        let derived = add_identity(&mut ctx, m, "aes");
        resolve_identity_base(&mut ctx, m, derived, "alg").unwrap();

        assert_eq!(resolve_identref(&ctx, base, "aes").unwrap(), derived);
        assert_eq!(resolve_identref(&ctx, base, "m:aes").unwrap(), derived);
        assert_eq!(resolve_identref(&ctx, base, "alg").unwrap(), base);
        assert!(resolve_identref(&ctx, base, "des").is_err());
    }
}
