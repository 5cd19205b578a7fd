//! Instance-identifier resolution over instance data (JSON format: path
//! prefixes are module names and are mandatory).

use yang_compiler_diagnostics::{Diagnostic, DiagnosticCode};
use yang_compiler_schema::{DataNodeId, DataTree, NodeId, NodeKind, SchemaContext};

use crate::path::{parse_instance_identifier, parse_predicate};
use crate::unres::ResolveFlags;

/// Resolve an instance-identifier from the data root. Returns `Ok(None)`
/// when no instance exists (the caller decides whether that is an error via
/// `require-instance`); more than one match is an error. `RPC_INPUT` /
/// `RPC_OUTPUT` steer the resolution to the corresponding side of rpcs.
pub fn resolve_instid(
    ctx: &SchemaContext,
    tree: &DataTree,
    path: &str,
    options: ResolveFlags,
) -> Result<Option<DataNodeId>, Diagnostic> {
    let mut matches: Vec<DataNodeId> = Vec::new();
    let mut id = path;
    let mut first = true;

    while !id.is_empty() {
        let (segment, len) = parse_instance_identifier(id)
            .map_err(|off| Diagnostic::unexpected_char(&id[off..]))?;
        id = &id[len..];

        let module = match ctx.module_by_name(segment.module) {
            Some(module) => module,
            // no such module, no instance exists
            None => return Ok(None),
        };

        // descend: children of the current matches, or the tree roots
        let mut next: Vec<DataNodeId> = Vec::new();
        if first {
            collect_matches(ctx, tree, &tree.roots, module, segment.name, options, &mut next);
            first = false;
        } else {
            for &m in &matches {
                let children = tree.nodes[m].children.clone();
                collect_matches(ctx, tree, &children, module, segment.name, options, &mut next);
            }
        }
        matches = next;
        if matches.is_empty() {
            return Ok(None);
        }

        if segment.has_predicate {
            // predicates apply to keyed lists and leaf-lists only
            matches.retain(|&m| match &ctx.nodes[tree.nodes[m].schema].kind {
                NodeKind::List { keys, .. } => !keys.is_empty(),
                NodeKind::LeafList { .. } => true,
                _ => false,
            });

            let consumed = resolve_predicate(ctx, tree, id, &mut matches)?;
            id = &id[consumed..];

            if matches.is_empty() {
                return Ok(None);
            }
        }
    }

    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches[0])),
        _ => Err(Diagnostic::error(
            DiagnosticCode::TooMany,
            format!("Too many instances of \"{path}\" in \"data tree\"."),
        )),
    }
}

fn collect_matches(
    ctx: &SchemaContext,
    tree: &DataTree,
    candidates: &[DataNodeId],
    module: yang_compiler_schema::ModuleId,
    name: &str,
    options: ResolveFlags,
    out: &mut Vec<DataNodeId>,
) {
    for &c in candidates {
        if tree.nodes[c].deleted {
            continue;
        }
        let schema = tree.nodes[c].schema;
        if ctx.node_module(schema) == module
            && ctx.node_name(schema) == name
            && !wrong_rpc_side(ctx, schema, options)
        {
            out.push(c);
        }
    }
}

/// Whether a schema node sits on the rpc side excluded by the options.
fn wrong_rpc_side(ctx: &SchemaContext, schema: NodeId, options: ResolveFlags) -> bool {
    let mut cursor = Some(schema);
    while let Some(cur) = cursor {
        match ctx.nodes[cur].kind {
            NodeKind::Input { .. } if options.contains(ResolveFlags::RPC_OUTPUT) => return true,
            NodeKind::Output { .. } if options.contains(ResolveFlags::RPC_INPUT) => return true,
            _ => {}
        }
        cursor = ctx.nodes[cur].parent;
    }
    false
}

/// Filter instance-identifier candidates by predicates: key equality on
/// lists, value equality (`.`) on leaf-lists, or a 1-based position.
/// Returns the number of bytes consumed.
fn resolve_predicate(
    ctx: &SchemaContext,
    tree: &DataTree,
    input: &str,
    matches: &mut Vec<DataNodeId>,
) -> Result<usize, Diagnostic> {
    let mut consumed = 0;

    loop {
        let (pred, len) = parse_predicate(&input[consumed..])
            .map_err(|off| Diagnostic::unexpected_char(&input[consumed + off..]))?;
        consumed += len;

        let position: Option<usize> = if pred.name.as_bytes()[0].is_ascii_digit() {
            pred.name.parse().ok()
        } else {
            None
        };

        let mut kept = Vec::new();
        for (index, &candidate) in matches.iter().enumerate() {
            let schema = &ctx.nodes[tree.nodes[candidate].schema];

            if let Some(position) = position {
                // 1-based position among the current candidates
                if index + 1 == position {
                    kept.push(candidate);
                }
                continue;
            }

            if pred.name == "." {
                // leaf-list value equality
                if matches!(schema.kind, NodeKind::LeafList { .. })
                    && tree.nodes[candidate].value.as_deref() == Some(pred.value)
                {
                    kept.push(candidate);
                }
                continue;
            }

            // key equality on a list instance
            if !matches!(schema.kind, NodeKind::List { .. }) {
                continue;
            }
            let key_module = match pred.module {
                Some(name) => match ctx.module_by_name(name) {
                    Some(module) => module,
                    None => continue,
                },
                None => ctx.node_module(tree.nodes[candidate].schema),
            };
            let matched = tree.nodes[candidate].children.iter().any(|&child| {
                let child_schema = tree.nodes[child].schema;
                !tree.nodes[child].deleted
                    && ctx.node_module(child_schema) == key_module
                    && ctx.node_name(child_schema) == pred.name
                    && tree.nodes[child].value.as_deref() == Some(pred.value)
            });
            if matched {
                kept.push(candidate);
            }
        }
        *matches = kept;

        if !pred.has_more {
            return Ok(consumed);
        }
    }
}
