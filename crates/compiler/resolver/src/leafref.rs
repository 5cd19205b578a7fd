//! Leafref path resolution.
//!
//! Schema-time resolution walks the leafref `path-arg` over the schema tree
//! from the leaf's parent, records the target under the leaf's type and
//! maintains the reverse-lookup set on the target. Data-time resolution
//! re-walks the path over instance data, collecting every candidate (a path
//! may span lists whose keys vary), filtering by predicate equality.

use yang_compiler_diagnostics::{Diagnostic, DiagnosticCode};
use yang_compiler_schema::{
    DataNodeId, DataTree, ModuleId, NodeId, NodeKind, NodeTypeSet, SchemaContext, TypeId,
};

use crate::error::{ResolveError, ResolveResult};
use crate::lookup::get_sibling;
use crate::path::{parse_path_arg, parse_path_key_expr, parse_path_predicate};
use crate::status::check_status;

/// Resolve a schema-time leafref: walk the path, validate predicates,
/// status-check, record the target and the reverse link.
pub fn resolve_schema_leafref(
    ctx: &mut SchemaContext,
    type_id: TypeId,
    node: Option<NodeId>,
) -> ResolveResult {
    let path = match &ctx.types[type_id].path {
        Some(path) => path.clone(),
        None => {
            return Err(ResolveError::fatal(Diagnostic::internal(
                "leafref without path",
            )))
        }
    };
    // a top-level typedef has no parent node and requires an absolute path
    let parent_tpdf = node.is_none();
    let module = match node {
        Some(node) => ctx.nodes[node].module,
        None => match ctx.types[type_id]
            .parent_node
            .map(|n| ctx.nodes[n].module)
        {
            Some(module) => module,
            None => {
                // typedef types know their module through the typedef table
                ctx.typedefs
                    .iter()
                    .find(|t| t.type_id == type_id)
                    .map(|t| t.module)
                    .ok_or_else(|| {
                        ResolveError::fatal(Diagnostic::internal("orphan leafref type"))
                    })?
            }
        },
    };

    let target = resolve_path_arg_schema(ctx, &path, node, module, parent_tpdf)?;

    // status compatibility of the referring leaf against the target
    if let Some(node) = node {
        let from_flags = ctx.nodes[node].flags;
        let from_module = ctx.nodes[node].module;
        let from_name = ctx.str(ctx.nodes[node].name).to_string();
        let to_flags = ctx.nodes[target].flags;
        let to_module = ctx.nodes[target].module;
        let to_name = ctx.str(ctx.nodes[target].name).to_string();
        check_status(
            ctx,
            from_flags,
            from_module,
            &from_name,
            to_flags,
            to_module,
            &to_name,
        )
        .map_err(ResolveError::fatal)?;
    }

    ctx.types[type_id].leafref_target = Some(target);
    if let Some(node) = node {
        ctx.add_leafref_backlink(target, node);
    }
    Ok(())
}

/// Walk a leafref `path-arg` over the schema tree. `parent` is the leaf
/// carrying the leafref type (`None` for top-level typedefs, which must use
/// an absolute path).
pub fn resolve_path_arg_schema(
    ctx: &SchemaContext,
    path: &str,
    parent: Option<NodeId>,
    module: ModuleId,
    parent_tpdf: bool,
) -> ResolveResult<NodeId> {
    let mut parent_times = 0;
    let mut id = path;
    let mut first_iter = true;
    let mut scan_parent: Option<NodeId> = None;
    let mut scan_module = module;
    let mut current: Option<NodeId> = None;

    loop {
        let (segment, len) = parse_path_arg(id, &mut parent_times)
            .map_err(|off| ResolveError::fatal(Diagnostic::unexpected_char(&id[off..])))?;
        id = &id[len..];

        if first_iter {
            if parent_times == -1 {
                // absolute path: resolve the module of the first segment
                let target_mod = ctx
                    .resolve_reference_module(module, segment.ident.module)
                    .ok_or_else(|| ResolveError::deferred(Diagnostic::no_resolvents(path)))?;
                scan_parent = None;
                scan_module = target_mod;
            } else if parent_times > 0 {
                if parent_tpdf {
                    // a top-level typedef cannot carry a relative path
                    return Err(ResolveError::fatal(Diagnostic::no_resolvents(path)));
                }
                // the walk starts at the leaf itself, so the first ".."
                // lands on its parent
                let mut cursor = parent;
                for _ in 1..parent_times {
                    cursor = match cursor {
                        Some(node) => ctx.nodes[node].parent,
                        None => {
                            return Err(ResolveError::deferred(Diagnostic::no_resolvents(path)))
                        }
                    };
                }
                let cursor = cursor
                    .ok_or_else(|| ResolveError::deferred(Diagnostic::no_resolvents(path)))?;
                scan_parent = ctx.nodes[cursor].parent;
                scan_module = ctx.nodes[cursor].module;
            } else {
                return Err(ResolveError::fatal(Diagnostic::internal(
                    "leafref path without direction",
                )));
            }
            first_iter = false;
        } else {
            // move down the tree, if possible
            let node = current.ok_or_else(|| {
                ResolveError::fatal(Diagnostic::internal("path walk lost its position"))
            })?;
            if matches!(
                ctx.nodes[node].kind,
                NodeKind::Leaf { .. } | NodeKind::LeafList { .. } | NodeKind::AnyXml { .. }
            ) {
                return Err(ResolveError::fatal(Diagnostic::unexpected_char(
                    segment.ident.name,
                )));
            }
            scan_parent = Some(node);
        }

        let want_module = ctx
            .resolve_reference_module(module, segment.ident.module)
            .ok_or_else(|| ResolveError::deferred(Diagnostic::no_resolvents(path)))?;
        let found = get_sibling(
            ctx,
            scan_parent,
            scan_module,
            want_module,
            segment.ident.name,
            NodeTypeSet::ANY.difference(NodeTypeSet::USES | NodeTypeSet::GROUPING),
        )
        .ok_or_else(|| ResolveError::deferred(Diagnostic::no_resolvents(path)))?;

        if segment.has_predicate {
            // predicates require the current result to be a list
            if !matches!(ctx.nodes[found].kind, NodeKind::List { .. }) {
                return Err(ResolveError::fatal(Diagnostic::no_resolvents(path)));
            }
            let consumed = resolve_path_predicate_schema(ctx, id, found, parent, module)?;
            id = &id[consumed..];
        }

        current = Some(found);
        if id.is_empty() {
            break;
        }
    }

    let target =
        current.ok_or_else(|| ResolveError::fatal(Diagnostic::internal("empty leafref path")))?;

    // the target must be a leaf or leaf-list
    if !matches!(
        ctx.nodes[target].kind,
        NodeKind::Leaf { .. } | NodeKind::LeafList { .. }
    ) {
        return Err(ResolveError::fatal(Diagnostic::no_resolvents(path)));
    }

    Ok(target)
}

/// Validate the `path-predicate`s attached to one path segment against the
/// schema. `context_node` is the list the predicate constrains, `parent`
/// the leafref leaf. Returns the number of bytes consumed.
fn resolve_path_predicate_schema(
    ctx: &SchemaContext,
    input: &str,
    context_node: NodeId,
    parent: Option<NodeId>,
    module: ModuleId,
) -> ResolveResult<usize> {
    let mut consumed = 0;

    loop {
        let (pred, len) = parse_path_predicate(&input[consumed..]).map_err(|off| {
            ResolveError::fatal(Diagnostic::unexpected_char(&input[consumed + off..]))
        })?;
        consumed += len;

        // source: must be a leaf (a key of the context list)
        let source_module = ctx
            .resolve_reference_module(ctx.nodes[context_node].module, pred.key.module)
            .ok_or_else(|| ResolveError::deferred(Diagnostic::no_resolvents(input)))?;
        let source = get_sibling(
            ctx,
            Some(context_node),
            ctx.nodes[context_node].module,
            source_module,
            pred.key.name,
            NodeTypeSet::LEAF,
        )
        .ok_or_else(|| ResolveError::deferred(Diagnostic::no_resolvents(input)))?;

        // destination: current() is the leafref leaf, every ".." moves up
        // one schema level
        let mut parent_times = 0;
        let pke = pred.path_key_expr;
        let (first, mut pke_parsed) = parse_path_key_expr(pke, &mut parent_times)
            .map_err(|off| ResolveError::fatal(Diagnostic::unexpected_char(&pke[off..])))?;

        let mut dest = parent;
        for _ in 0..parent_times {
            dest = match dest {
                Some(node) => ctx.nodes[node].parent,
                None => return Err(ResolveError::deferred(Diagnostic::no_resolvents(pke))),
            };
        }

        let mut segment = first;
        let mut dst_node = dest;
        loop {
            let want_module = ctx
                .resolve_reference_module(module, segment.module)
                .ok_or_else(|| ResolveError::deferred(Diagnostic::no_resolvents(pke)))?;
            let scan_module = dst_node.map_or(module, |n| ctx.nodes[n].module);
            let found = get_sibling(
                ctx,
                dst_node,
                scan_module,
                want_module,
                segment.name,
                NodeTypeSet::CONTAINER | NodeTypeSet::LIST | NodeTypeSet::LEAF,
            )
            .ok_or_else(|| ResolveError::deferred(Diagnostic::no_resolvents(pke)))?;
            dst_node = Some(found);

            if pke_parsed == pke.len() {
                break;
            }
            let (next, len) = parse_path_key_expr(&pke[pke_parsed..], &mut parent_times)
                .map_err(|off| {
                    ResolveError::fatal(Diagnostic::unexpected_char(&pke[pke_parsed + off..]))
                })?;
            segment = next;
            pke_parsed += len;
        }

        let dst = dst_node
            .ok_or_else(|| ResolveError::fatal(Diagnostic::internal("empty path-key-expr")))?;
        if !matches!(ctx.nodes[dst].kind, NodeKind::Leaf { .. }) {
            return Err(ResolveError::fatal(
                Diagnostic::no_resolvents(input).with_related(format!(
                    "Destination node is not a leaf, but {}.",
                    ctx.nodes[dst].kind_name()
                )),
            ));
        }

        // source and destination must agree on the base type
        let src_base = ctx.nodes[source].type_id().and_then(|t| ctx.types[t].base);
        let dst_base = ctx.nodes[dst].type_id().and_then(|t| ctx.types[t].base);
        if let (Some(src_base), Some(dst_base)) = (src_base, dst_base) {
            if src_base != dst_base {
                return Err(ResolveError::fatal(
                    Diagnostic::no_resolvents(input).with_related(
                        "Source and destination of a path predicate differ in base type."
                            .to_string(),
                    ),
                ));
            }
        }

        if !pred.has_more {
            return Ok(consumed);
        }
    }
}

// ---------------------------------------------------------------------------
// data-time resolution
// ---------------------------------------------------------------------------

/// Match-set step: replace every current match with its children matching
/// `(want_module, name)`; matches without any matching child are dropped.
/// `None` entries scan `start` (a sibling list). Leaf matches are kept
/// untouched.
fn resolve_data_step(
    ctx: &SchemaContext,
    tree: &DataTree,
    want_module: ModuleId,
    name: &str,
    start: &[DataNodeId],
    matches: &mut Vec<Option<DataNodeId>>,
) -> bool {
    if matches.is_empty() {
        matches.push(None);
    }

    let mut out: Vec<Option<DataNodeId>> = Vec::new();
    for &entry in matches.iter() {
        if let Some(node) = entry {
            let schema = &ctx.nodes[tree.nodes[node].schema];
            if matches!(
                schema.kind,
                NodeKind::Leaf { .. } | NodeKind::LeafList { .. } | NodeKind::AnyXml { .. }
            ) {
                out.push(entry);
                continue;
            }
        }

        let children: &[DataNodeId] = match entry {
            Some(node) => &tree.nodes[node].children,
            None => start,
        };
        for &child in children {
            if tree.nodes[child].deleted {
                continue;
            }
            let schema = tree.nodes[child].schema;
            if ctx.node_module(schema) == want_module && ctx.node_name(schema) == name {
                out.push(Some(child));
            }
        }
    }

    *matches = out;
    !matches.is_empty()
}

/// Resolve a `[module:]name` data step. The module name is looked up
/// context-wide; a missing name defaults to `default_module`. `Err(())`
/// signals an unknown module.
fn resolve_data_node(
    ctx: &SchemaContext,
    tree: &DataTree,
    mod_name: Option<&str>,
    name: &str,
    start: &[DataNodeId],
    default_module: ModuleId,
    matches: &mut Vec<Option<DataNodeId>>,
) -> Result<bool, ()> {
    let want_module = match mod_name {
        Some(mod_name) => ctx.module_by_name(mod_name).ok_or(())?,
        None => ctx.main_module(default_module),
    };
    Ok(resolve_data_step(
        ctx,
        tree,
        want_module,
        name,
        start,
        matches,
    ))
}

/// Re-walk a leafref path over instance data, collecting all candidate
/// instances. Soft failure (no resolvents) defers; malformed paths and
/// unknown modules fail hard.
pub fn resolve_path_arg_data(
    ctx: &SchemaContext,
    tree: &DataTree,
    node: DataNodeId,
    path: &str,
) -> ResolveResult<Vec<DataNodeId>> {
    let mut parent_times = 0;
    let mut id = path;
    let mut matches: Vec<Option<DataNodeId>> = Vec::new();
    let mut start: Vec<DataNodeId> = Vec::new();
    let default_module = ctx.nodes[tree.nodes[node].schema].module;
    let mut first = true;

    loop {
        let (segment, len) = parse_path_arg(id, &mut parent_times)
            .map_err(|off| ResolveError::fatal(Diagnostic::unexpected_char(&id[off..])))?;
        id = &id[len..];

        if first {
            if parent_times == -1 {
                // absolute path starts at the tree roots
                start = tree.roots.clone();
            } else {
                // relative: climb the instance tree
                let mut cursor = Some(node);
                for _ in 0..parent_times {
                    cursor = match cursor {
                        Some(cur) => tree.nodes[cur].parent,
                        None => {
                            // too many ".."
                            return Err(ResolveError::fatal(Diagnostic::error(
                                DiagnosticCode::InVal,
                                format!(
                                    "Invalid value \"{path}\" in \"{}\" element.",
                                    ctx.node_name(tree.nodes[node].schema)
                                ),
                            )));
                        }
                    };
                }
                match cursor {
                    Some(ancestor) => matches.push(Some(ancestor)),
                    None => start = tree.roots.clone(),
                }
            }
            first = false;
        }

        let found = resolve_data_node(
            ctx,
            tree,
            segment.ident.module,
            segment.ident.name,
            &start,
            default_module,
            &mut matches,
        )
        .map_err(|()| {
            ResolveError::fatal(Diagnostic::unresolved(
                "module",
                segment.ident.module.unwrap_or(""),
            ))
        })?;
        if !found {
            return Err(ResolveError::deferred(Diagnostic::no_resolvents(path)));
        }

        if segment.has_predicate {
            // the current results must be list instances with keys
            matches.retain(|entry| {
                entry.is_some_and(|n| {
                    matches!(
                        &ctx.nodes[tree.nodes[n].schema].kind,
                        NodeKind::List { keys, .. } if !keys.is_empty()
                    )
                })
            });
            let consumed = resolve_path_predicate_data(ctx, tree, id, node, &mut matches, path)?;
            id = &id[consumed..];

            if matches.is_empty() {
                return Err(ResolveError::deferred(Diagnostic::no_resolvents(path)));
            }
        }

        if id.is_empty() {
            break;
        }
    }

    Ok(matches.into_iter().flatten().collect())
}

/// Filter a candidate set by leafref path-predicates. Any resolution
/// failure on the source or destination of a predicate aborts with an
/// error; value mismatches merely drop the candidate.
fn resolve_path_predicate_data(
    ctx: &SchemaContext,
    tree: &DataTree,
    input: &str,
    node: DataNodeId,
    matches: &mut Vec<Option<DataNodeId>>,
    path: &str,
) -> ResolveResult<usize> {
    let mut consumed = 0;

    loop {
        let (pred, len) = parse_path_predicate(&input[consumed..]).map_err(|off| {
            ResolveError::fatal(Diagnostic::unexpected_char(&input[consumed + off..]))
        })?;
        consumed += len;

        let mut kept: Vec<Option<DataNodeId>> = Vec::new();
        for &entry in matches.iter() {
            let candidate = match entry {
                Some(candidate) => candidate,
                None => continue,
            };
            let default_module = ctx.nodes[tree.nodes[candidate].schema].module;

            // source: a key leaf of the candidate list instance
            let mut source_matches = vec![Some(candidate)];
            let found = resolve_data_node(
                ctx,
                tree,
                pred.key.module,
                pred.key.name,
                &[],
                default_module,
                &mut source_matches,
            )
            .map_err(|()| ResolveError::fatal(Diagnostic::no_resolvents(path)))?;
            if !found || source_matches.len() != 1 {
                return Err(ResolveError::fatal(Diagnostic::no_resolvents(path)));
            }
            let source = source_matches[0]
                .ok_or_else(|| ResolveError::fatal(Diagnostic::no_resolvents(path)))?;
            if !matches!(
                ctx.nodes[tree.nodes[source].schema].kind,
                NodeKind::Leaf { .. }
            ) {
                return Err(ResolveError::fatal(Diagnostic::no_resolvents(path)));
            }

            // destination: current() is the leafref instance, every ".."
            // moves up one level of the data tree
            let pke = pred.path_key_expr;
            let mut parent_times = 0;
            let (first, mut pke_parsed) = parse_path_key_expr(pke, &mut parent_times)
                .map_err(|off| {
                    ResolveError::fatal(Diagnostic::unexpected_char(&pke[off..]))
                })?;

            let mut dest_cursor = Some(node);
            for _ in 0..parent_times {
                dest_cursor = match dest_cursor {
                    Some(cur) => tree.nodes[cur].parent,
                    None => return Err(ResolveError::deferred(Diagnostic::no_resolvents(pke))),
                };
            }

            let mut dest_matches = vec![dest_cursor];
            let mut segment = first;
            loop {
                let found = resolve_data_node(
                    ctx,
                    tree,
                    segment.module,
                    segment.name,
                    &tree.roots,
                    default_module,
                    &mut dest_matches,
                )
                .map_err(|()| ResolveError::fatal(Diagnostic::no_resolvents(path)))?;
                if !found || dest_matches.len() != 1 {
                    return Err(ResolveError::fatal(Diagnostic::no_resolvents(path)));
                }

                if pke_parsed == pke.len() {
                    break;
                }
                let (next, len) = parse_path_key_expr(&pke[pke_parsed..], &mut parent_times)
                    .map_err(|off| {
                        ResolveError::fatal(Diagnostic::unexpected_char(&pke[pke_parsed + off..]))
                    })?;
                segment = next;
                pke_parsed += len;
            }
            let dest = dest_matches[0]
                .ok_or_else(|| ResolveError::fatal(Diagnostic::no_resolvents(path)))?;

            // base types of source and destination must match
            let src_base = ctx.nodes[tree.nodes[source].schema]
                .type_id()
                .and_then(|t| ctx.types[t].base);
            let dst_base = ctx.nodes[tree.nodes[dest].schema]
                .type_id()
                .and_then(|t| ctx.types[t].base);
            if src_base != dst_base {
                continue;
            }

            // predicate holds when the values are equal
            if tree.nodes[source].value == tree.nodes[dest].value {
                kept.push(Some(candidate));
            }
        }
        *matches = kept;

        if !pred.has_more {
            return Ok(consumed);
        }
    }
}

/// Resolve a data-time leafref: collect candidates and pick the one whose
/// value equals the leafref's value.
pub fn resolve_data_leafref(
    ctx: &SchemaContext,
    tree: &mut DataTree,
    node: DataNodeId,
) -> ResolveResult {
    let schema = tree.nodes[node].schema;
    let type_id = ctx.nodes[schema].type_id().ok_or_else(|| {
        ResolveError::fatal(Diagnostic::internal("leafref instance is not a leaf"))
    })?;
    let path = match &ctx.types[type_id].path {
        Some(path) => path.clone(),
        None => {
            return Err(ResolveError::fatal(Diagnostic::internal(
                "leafref without path",
            )))
        }
    };

    let candidates = resolve_path_arg_data(ctx, tree, node, &path)?;
    let value = tree.nodes[node].value.clone();
    let target = candidates
        .into_iter()
        .find(|&c| tree.nodes[c].value == value);

    match target {
        Some(target) => {
            tree.nodes[node].leafref = Some(target);
            Ok(())
        }
        None => Err(ResolveError::deferred(Diagnostic::error(
            DiagnosticCode::NoLeafref,
            format!(
                "Leafref \"{path}\" of value \"{}\" points to a non-existing leaf.",
                value.as_deref().unwrap_or("")
            ),
        ))),
    }
}
