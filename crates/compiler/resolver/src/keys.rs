//! List key and `unique` resolution.

use yang_compiler_diagnostics::{Diagnostic, DiagnosticCode};
use yang_compiler_schema::{
    BuiltinType, NodeFlags, NodeId, NodeKind, NodeTypeSet, SchemaContext,
};

use crate::error::{ResolveError, ResolveResult};
use crate::lookup::{get_sibling, resolve_descendant_schema_nodeid, LookupError};
use crate::status::check_status;

/// Resolve the `key` argument of a list into leaf references and check the
/// key constraints: keys are leaves of the list itself, not `empty`-typed,
/// agree with the list's `config`, are not added via augment and carry no
/// `when`.
pub fn resolve_list_keys(ctx: &mut SchemaContext, list: NodeId) -> ResolveResult {
    let keys_str = match &ctx.nodes[list].kind {
        NodeKind::List { key_names, .. } => match key_names {
            Some(keys_str) => keys_str.clone(),
            None => return Ok(()),
        },
        _ => return Err(ResolveError::fatal(Diagnostic::internal("keys on non-list"))),
    };

    let list_module = ctx.nodes[list].module;
    let main = ctx.main_module(list_module);
    let mut resolved: Vec<NodeId> = Vec::new();

    for name in keys_str.split_whitespace() {
        let key = get_sibling(ctx, Some(list), list_module, main, name, NodeTypeSet::LEAF)
            .ok_or_else(|| {
                ResolveError::deferred(Diagnostic::unresolved("list keys", &keys_str))
            })?;

        check_key(ctx, list, &resolved, key, name)?;

        let list_flags = ctx.nodes[list].flags;
        let list_name = ctx.str(ctx.nodes[list].name).to_string();
        let key_flags = ctx.nodes[key].flags;
        let key_module = ctx.nodes[key].module;
        check_status(
            ctx,
            list_flags,
            list_module,
            &list_name,
            key_flags,
            key_module,
            name,
        )
        .map_err(ResolveError::fatal)?;

        resolved.push(key);
    }

    if let NodeKind::List { keys, .. } = &mut ctx.nodes[list].kind {
        *keys = resolved;
    }
    Ok(())
}

fn check_key(
    ctx: &SchemaContext,
    list: NodeId,
    resolved: &[NodeId],
    key: NodeId,
    name: &str,
) -> ResolveResult {
    // uniqueness within the key list
    if resolved.contains(&key) {
        return Err(ResolveError::fatal(Diagnostic::error(
            DiagnosticCode::KeyDup,
            format!("Key identifier \"{name}\" is not unique."),
        )));
    }

    let node = ctx.node(key);

    // the key leaf's type may not be the built-in empty
    let type_id = node.type_id().ok_or_else(|| {
        ResolveError::fatal(Diagnostic::error(
            DiagnosticCode::KeyNotLeaf,
            format!("Key \"{name}\" is not a leaf."),
        ))
    })?;
    match ctx.types[type_id].base {
        Some(BuiltinType::Empty) => {
            return Err(ResolveError::fatal(Diagnostic::error(
                DiagnosticCode::KeyType,
                format!("Key \"{name}\" must not be the built-in type \"empty\"."),
            )));
        }
        Some(_) => {}
        // type not resolved yet
        None => {
            return Err(ResolveError::deferred(Diagnostic::unresolved(
                "list keys",
                name,
            )))
        }
    }

    // the config attribute must agree with the list
    if (node.flags & NodeFlags::CONFIG_MASK) != (ctx.nodes[list].flags & NodeFlags::CONFIG_MASK) {
        return Err(ResolveError::fatal(Diagnostic::error(
            DiagnosticCode::KeyConfig,
            format!("The \"config\" value of the \"{name}\" key differs from its list config value."),
        )));
    }

    // a key may not be brought in by an augment
    if node.origin_augment.is_some() {
        return Err(ResolveError::fatal(
            Diagnostic::error(
                DiagnosticCode::KeyMiss,
                format!("Leaf \"{name}\" defined as key in a list not found."),
            )
            .with_related("Key inserted from augment.".to_string()),
        ));
    }

    // a key may not be conditional
    if node.when.is_some() {
        return Err(ResolveError::fatal(
            Diagnostic::error(
                DiagnosticCode::InChildStmt,
                "Invalid keyword \"when\" as a child to \"leaf\".".to_string(),
            )
            .with_related("Key definition cannot depend on a \"when\" condition.".to_string()),
        ));
    }

    Ok(())
}

/// Resolve one path of a `unique` statement of a list: the target must be a
/// leaf below the list without crossing an inner list.
pub fn resolve_unique(ctx: &mut SchemaContext, list: NodeId, unique_index: usize) -> ResolveResult {
    let paths = match &ctx.nodes[list].kind {
        NodeKind::List { uniques, .. } => uniques
            .get(unique_index)
            .map(|u| u.paths.clone())
            .ok_or_else(|| ResolveError::fatal(Diagnostic::internal("unique index out of range")))?,
        _ => {
            return Err(ResolveError::fatal(Diagnostic::internal(
                "unique on non-list",
            )))
        }
    };

    let mut leaves = Vec::new();
    for path in &paths {
        let leaf = match resolve_descendant_schema_nodeid(
            ctx,
            path,
            list,
            NodeTypeSet::LEAF,
            true,
            true,
        ) {
            Ok(Some(leaf)) => leaf,
            Ok(None) => {
                return Err(ResolveError::deferred(
                    Diagnostic::invalid_arg(path, "unique")
                        .with_related("Target leaf not found.".to_string()),
                ));
            }
            Err(LookupError::Syntax { offset }) => {
                return Err(ResolveError::fatal(
                    Diagnostic::invalid_arg(path, "unique")
                        .with_related(format!("Unexpected character at offset {offset}.")),
                ));
            }
            Err(LookupError::InnerListForbidden) => {
                return Err(ResolveError::fatal(
                    Diagnostic::invalid_arg(path, "unique")
                        .with_related("Unique argument references list.".to_string()),
                ));
            }
            Err(LookupError::Invalid) => {
                return Err(ResolveError::fatal(Diagnostic::invalid_arg(path, "unique")));
            }
        };

        let list_flags = ctx.nodes[list].flags;
        let list_module = ctx.nodes[list].module;
        let list_name = ctx.str(ctx.nodes[list].name).to_string();
        let leaf_flags = ctx.nodes[leaf].flags;
        let leaf_module = ctx.nodes[leaf].module;
        let leaf_name = ctx.str(ctx.nodes[leaf].name).to_string();
        check_status(
            ctx,
            list_flags,
            list_module,
            &list_name,
            leaf_flags,
            leaf_module,
            &leaf_name,
        )
        .map_err(ResolveError::fatal)?;

        ctx.nodes[leaf].flags |= NodeFlags::UNIQUE;
        leaves.push(leaf);
    }

    if let NodeKind::List { uniques, .. } = &mut ctx.nodes[list].kind {
        uniques[unique_index].leaves = leaves;
    }
    Ok(())
}
