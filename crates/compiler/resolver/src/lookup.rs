//! Schema-tree lookup: resolving schema-nodeids against the partially built
//! tree.
//!
//! The walkers here honor YANG's shorthand-case rule: a data node directly
//! under a `choice` is treated as wrapped in an implicit case, so a nodeid
//! addressing it spells the synthetic case segment as well. The shorthand
//! state toggles when a choice child that is not a case matches, is sticky
//! across one segment and resets at the next; a lookup may not terminate
//! "inside" the synthetic wrapper and never descends through it.

use yang_compiler_diagnostics::{Diagnostic, DiagnosticCode};
use yang_compiler_schema::{
    GetNext, ModuleId, NodeId, NodeKind, NodeTypeSet, SchemaContext,
};

use crate::path::{
    parse_node_identifier, parse_schema_json_predicate, parse_schema_nodeid,
};

/// Lookup failure modes shared by the nodeid resolvers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Malformed nodeid; `offset` is the byte offset of the offending
    /// character within the nodeid text.
    Syntax { offset: usize },
    /// The nodeid form or an intermediate node is invalid for this lookup
    /// (absolute where descendant is required, descending into a leaf,
    /// unknown prefix).
    Invalid,
    /// A descendant lookup crossed an inner list where that is forbidden.
    InnerListForbidden,
}

pub type LookupResult = Result<Option<NodeId>, LookupError>;

/// Flavors of the JSON schema-nodeid resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonNodeidFlavor {
    /// Full schema addressing (choices, cases, input/output visible).
    Schema,
    /// Data addressing steered to the input side of rpcs.
    DataRpcInput,
    /// Data addressing steered to the output side of rpcs.
    DataRpcOutput,
}

/// Outcome of matching one sibling against the current segment.
enum SiblingCheck {
    /// The sibling is the final result.
    Done,
    /// Not a valid match here, try the next sibling.
    Skip,
    /// Matched an inner segment; the walk descended.
    Descend,
}

/// Shared per-sibling check: module match, shorthand-state update, and the
/// decision between terminating, skipping and descending.
///
/// `scan_parent` is updated to the matched sibling when the walk descends.
fn sibling_check(
    ctx: &SchemaContext,
    sibling: NodeId,
    shorthand: &mut Option<bool>,
    rest_empty: bool,
    module: ModuleId,
    mod_name: Option<&str>,
    scan_parent: &mut Option<NodeId>,
) -> Result<SiblingCheck, LookupError> {
    // module check
    let prefix_mod = ctx
        .resolve_reference_module(module, mod_name)
        .ok_or(LookupError::Invalid)?;
    if prefix_mod != ctx.node_module(sibling) {
        return Ok(SiblingCheck::Skip);
    }

    // shorthand case: the implicit wrapper occupies one path segment and
    // the scan parent does not change while inside it
    let node = ctx.node(sibling);
    let parent_is_choice = node
        .parent
        .is_some_and(|p| matches!(ctx.node(p).kind, NodeKind::Choice { .. }));
    let mut in_shorthand = false;
    if parent_is_choice && !matches!(node.kind, NodeKind::Case) {
        if let Some(state) = shorthand {
            *state = !*state;
        }
        in_shorthand = true;
    }

    // the result node?
    if rest_empty {
        if *shorthand == Some(true) {
            return Ok(SiblingCheck::Skip);
        }
        return Ok(SiblingCheck::Done);
    }

    if !in_shorthand {
        // move down the tree, if possible
        if matches!(
            node.kind,
            NodeKind::Leaf { .. } | NodeKind::LeafList { .. } | NodeKind::AnyXml { .. }
        ) {
            return Err(LookupError::Invalid);
        }
        *scan_parent = Some(sibling);
    }

    Ok(SiblingCheck::Descend)
}

/// Resolve an absolute schema-nodeid from `module`'s top level.
pub fn resolve_absolute_schema_nodeid(
    ctx: &SchemaContext,
    nodeid: &str,
    module: ModuleId,
    accepted: NodeTypeSet,
) -> LookupResult {
    let mut is_relative = None;
    let (segment, len) = parse_schema_nodeid(nodeid, &mut is_relative)
        .map_err(|offset| LookupError::Syntax { offset })?;
    if is_relative == Some(true) {
        return Err(LookupError::Invalid);
    }

    let start_mod = ctx
        .resolve_reference_module(module, segment.ident.module)
        .ok_or(LookupError::Invalid)?;

    // re-walk from the first segment against the resolved start module
    walk_nodeid_from_first(
        ctx,
        nodeid,
        segment,
        len,
        None,
        start_mod,
        module,
        GetNext::WITH_CHOICE | GetNext::WITH_CASE | GetNext::WITH_INOUT | GetNext::WITH_GROUPING,
        accepted,
        true,
        false,
        &mut is_relative,
    )
}

/// Resolve a descendant schema-nodeid against the children of `start`.
/// Used for `refine` and `unique` targets.
pub fn resolve_descendant_schema_nodeid(
    ctx: &SchemaContext,
    nodeid: &str,
    start: NodeId,
    accepted: NodeTypeSet,
    check_shorthand: bool,
    no_innerlist: bool,
) -> LookupResult {
    let mut is_relative = None;
    let (segment, len) = parse_schema_nodeid(nodeid, &mut is_relative)
        .map_err(|offset| LookupError::Syntax { offset })?;
    if is_relative != Some(true) {
        return Err(LookupError::Invalid);
    }

    let module = ctx.nodes[start].module;
    walk_nodeid_from_first(
        ctx,
        nodeid,
        segment,
        len,
        Some(start),
        module,
        module,
        GetNext::WITH_CHOICE | GetNext::WITH_CASE,
        accepted,
        check_shorthand,
        no_innerlist,
        &mut is_relative,
    )
}

/// Resolve an augment target nodeid: absolute when `module` is given
/// (top-level augment), descendant from `start` (uses augment).
pub fn resolve_augment_schema_nodeid(
    ctx: &SchemaContext,
    nodeid: &str,
    start: Option<NodeId>,
    module: Option<ModuleId>,
) -> LookupResult {
    let mut is_relative = None;
    let (segment, len) = parse_schema_nodeid(nodeid, &mut is_relative)
        .map_err(|offset| LookupError::Syntax { offset })?;
    let relative = is_relative == Some(true);

    let opts = GetNext::WITH_CHOICE | GetNext::WITH_CASE | GetNext::WITH_INOUT;
    match (relative, start, module) {
        (true, Some(start), _) => {
            let module = ctx.nodes[start].module;
            walk_nodeid_from_first(
                ctx,
                nodeid,
                segment,
                len,
                Some(start),
                module,
                module,
                opts,
                NodeTypeSet::ANY,
                true,
                false,
                &mut is_relative,
            )
        }
        (false, _, Some(module)) => {
            let start_mod = ctx
                .resolve_reference_module(module, segment.ident.module)
                .ok_or(LookupError::Invalid)?;
            walk_nodeid_from_first(
                ctx,
                nodeid,
                segment,
                len,
                None,
                start_mod,
                module,
                opts,
                NodeTypeSet::ANY,
                true,
                false,
                &mut is_relative,
            )
        }
        _ => Err(LookupError::Invalid),
    }
}

/// Shared walker of the nodeid resolvers: match the already-parsed first
/// segment, then continue segment by segment.
#[allow(clippy::too_many_arguments)]
fn walk_nodeid_from_first(
    ctx: &SchemaContext,
    nodeid: &str,
    first: crate::path::SchemaNodeIdSegment<'_>,
    first_len: usize,
    mut scan_parent: Option<NodeId>,
    scan_module: ModuleId,
    module: ModuleId,
    opts: GetNext,
    accepted: NodeTypeSet,
    check_shorthand: bool,
    no_innerlist: bool,
    is_relative: &mut Option<bool>,
) -> LookupResult {
    let mut shorthand = if check_shorthand { Some(false) } else { None };
    let mut id = &nodeid[first_len..];
    let mut offset = first_len;
    let mut segment = first;

    loop {
        let mut matched = None;
        for sibling in ctx.visible_children(scan_parent, scan_module, opts) {
            if ctx.node_name(sibling) != segment.ident.name {
                continue;
            }
            match sibling_check(
                ctx,
                sibling,
                &mut shorthand,
                id.is_empty(),
                module,
                segment.ident.module,
                &mut scan_parent,
            )? {
                SiblingCheck::Done => {
                    if !accepted.contains(ctx.node(sibling).kind_flag()) {
                        continue;
                    }
                    return Ok(Some(sibling));
                }
                SiblingCheck::Skip => continue,
                SiblingCheck::Descend => {
                    matched = Some(sibling);
                    break;
                }
            }
        }

        let matched = match matched {
            Some(matched) => matched,
            None => return Ok(None),
        };
        if no_innerlist && matches!(ctx.node(matched).kind, NodeKind::List { .. }) {
            return Err(LookupError::InnerListForbidden);
        }

        let (next, len) = parse_schema_nodeid(id, is_relative)
            .map_err(|off| LookupError::Syntax { offset: offset + off })?;
        segment = next;
        id = &id[len..];
        offset += len;
    }
}

/// Resolve a `choice` default case by nodeid (used by `refine`). The
/// argument cannot actually be a path.
pub fn resolve_choice_default_schema_nodeid(
    ctx: &SchemaContext,
    nodeid: &str,
    choice: NodeId,
) -> LookupResult {
    if nodeid.contains('/') {
        return Err(LookupError::Invalid);
    }
    resolve_descendant_schema_nodeid(ctx, nodeid, choice, NodeTypeSet::NO_RPC_NOTIF, true, false)
}

/// Resolve a `choice` default case or shorthand member by plain name,
/// descending through nested `uses` expansions.
pub fn resolve_choice_dflt(ctx: &SchemaContext, choice: NodeId, dflt: &str) -> Option<NodeId> {
    for &child in &ctx.nodes[choice].children {
        if let NodeKind::Uses { .. } = ctx.node(child).kind {
            if let Some(found) = resolve_choice_dflt(ctx, child, dflt) {
                return Some(found);
            }
        }

        let node = ctx.node(child);
        let acceptable = matches!(
            node.kind,
            NodeKind::AnyXml { .. }
                | NodeKind::Case
                | NodeKind::Container { .. }
                | NodeKind::Leaf { .. }
                | NodeKind::LeafList { .. }
                | NodeKind::List { .. }
        );
        if acceptable && ctx.str(node.name) == dflt {
            return Some(child);
        }
    }
    None
}

/// Resolve a `uses` argument to its grouping by lexical scoping: enclosing
/// scopes first, then the module's top level, then included submodules.
pub fn resolve_uses_grouping(ctx: &SchemaContext, nodeid: &str, start: NodeId) -> LookupResult {
    // the identifier must be parsed in one call
    let ident = match parse_node_identifier(nodeid) {
        Ok((ident, len)) if len == nodeid.len() => ident,
        Ok((_, len)) => return Err(LookupError::Syntax { offset: len }),
        Err(offset) => return Err(LookupError::Syntax { offset }),
    };

    let start_module = ctx.nodes[start].module;
    let module = ctx
        .resolve_reference_module(start_module, ident.module)
        .ok_or(LookupError::Invalid)?;

    let scan_start = if module == ctx.main_module(start_module) {
        Some(start)
    } else {
        None
    };
    Ok(find_grouping_up(ctx, ident.name, scan_start, module))
}

/// Scan outward through enclosing sibling lists, then the module top level
/// and its submodules, for a grouping of the given name. First match wins.
pub fn find_grouping_up(
    ctx: &SchemaContext,
    name: &str,
    start: Option<NodeId>,
    module: ModuleId,
) -> Option<NodeId> {
    let mut cursor = start;
    while let Some(cur) = cursor {
        let siblings: &[NodeId] = match ctx.nodes[cur].parent {
            Some(parent) => &ctx.nodes[parent].children,
            None => &[],
        };
        for &sibling in siblings {
            if matches!(ctx.node(sibling).kind, NodeKind::Grouping { .. })
                && ctx.node_name(sibling) == name
            {
                return Some(sibling);
            }
        }
        cursor = ctx.nodes[cur].parent;
    }

    let main = ctx.main_module(module);
    for &grp in ctx.modules[main]
        .groupings
        .iter()
        .chain(
            ctx.modules[main]
                .includes
                .iter()
                .flat_map(|&inc| ctx.modules[inc].groupings.iter()),
        )
    {
        if ctx.node_name(grp) == name {
            return Some(grp);
        }
    }
    None
}

/// Find a sibling by resolved module and name among the visible children
/// of `parent`, restricted to `accepted` kinds.
pub fn get_sibling(
    ctx: &SchemaContext,
    parent: Option<NodeId>,
    scan_module: ModuleId,
    want_module: ModuleId,
    name: &str,
    accepted: NodeTypeSet,
) -> Option<NodeId> {
    let opts = GetNext::WITH_CHOICE | GetNext::WITH_CASE | GetNext::WITH_INOUT;
    ctx.visible_children(parent, scan_module, opts)
        .into_iter()
        .find(|&sibling| {
            ctx.node_module(sibling) == want_module
                && ctx.node_name(sibling) == name
                && accepted.contains(ctx.node(sibling).kind_flag())
        })
}

/// Resolve a schema-nodeid in JSON format (module names as prefixes) with
/// optional list-key predicates. Cannot return groupings, uses or augments.
pub fn resolve_json_schema_nodeid(
    ctx: &SchemaContext,
    nodeid: &str,
    start: Option<NodeId>,
    flavor: JsonNodeidFlavor,
) -> Result<NodeId, Diagnostic> {
    let opts = match flavor {
        JsonNodeidFlavor::Schema => {
            GetNext::WITH_CHOICE | GetNext::WITH_CASE | GetNext::WITH_INOUT
        }
        _ => GetNext::empty(),
    };

    let mut is_relative = None;
    let mut id = nodeid;
    let (mut segment, mut len) = parse_schema_nodeid(id, &mut is_relative)
        .map_err(|off| Diagnostic::unexpected_char(&id[off..]))?;
    id = &id[len..];

    let mut scan_parent;
    let mut prev_mod;
    let scan_module;
    if is_relative == Some(true) {
        let start = start.ok_or_else(|| Diagnostic::internal("relative nodeid without start"))?;
        scan_parent = Some(start);
        scan_module = ctx.nodes[start].module;
        prev_mod = ctx.node_module(start);
    } else {
        let mod_name = segment.ident.module.ok_or_else(|| {
            Diagnostic::error(DiagnosticCode::PathMissMod, "Missing module name.".to_string())
        })?;
        let module = ctx.module_by_name(mod_name).ok_or_else(|| {
            Diagnostic::error(DiagnosticCode::PathInMod, "Module not found.".to_string())
        })?;
        scan_parent = None;
        scan_module = module;
        prev_mod = ctx.main_module(module);
        // now it is as if there was no module name
        segment.ident.module = None;
    }

    let mut shorthand = false;
    loop {
        let mut matched = None;
        for sibling in ctx.visible_children(scan_parent, scan_module, opts) {
            if ctx.node_name(sibling) != segment.ident.name {
                continue;
            }

            // data addressing is steered to one side of an rpc
            let in_output = ctx.nodes[sibling]
                .parent
                .is_some_and(|p| matches!(ctx.node(p).kind, NodeKind::Output { .. }));
            let in_input = ctx.nodes[sibling]
                .parent
                .is_some_and(|p| matches!(ctx.node(p).kind, NodeKind::Input { .. }));
            match flavor {
                JsonNodeidFlavor::DataRpcInput if in_output => continue,
                JsonNodeidFlavor::DataRpcOutput if in_input => continue,
                _ => {}
            }

            // module check: explicit names are resolved context-wide
            let prefix_mod = match segment.ident.module {
                Some(name) => ctx.module_by_name(name).ok_or_else(|| {
                    Diagnostic::error(DiagnosticCode::PathInMod, "Module not found.".to_string())
                })?,
                None => prev_mod,
            };
            if prefix_mod != ctx.node_module(sibling) {
                continue;
            }

            // predicates apply to leaf-lists (ignored) and lists (key check)
            if segment.has_predicate {
                let node = ctx.node(sibling);
                match &node.kind {
                    NodeKind::Leaf { .. } | NodeKind::LeafList { .. } => {
                        let (_, plen) = parse_schema_json_predicate(id, false)
                            .map_err(|off| Diagnostic::unexpected_char(&id[off..]))?;
                        id = &id[plen..];
                    }
                    NodeKind::List { keys, .. } => {
                        let consumed = check_json_list_predicates(ctx, id, keys)?;
                        id = &id[consumed..];
                    }
                    _ => return Err(Diagnostic::unexpected_char(id)),
                }
            }

            // shorthand case handling, the scan parent does not change
            let parent_is_choice = ctx.nodes[sibling]
                .parent
                .is_some_and(|p| matches!(ctx.node(p).kind, NodeKind::Choice { .. }));
            if parent_is_choice && !matches!(ctx.node(sibling).kind, NodeKind::Case) {
                shorthand = !shorthand;
            }

            if id.is_empty() {
                if shorthand {
                    // wrong path for shorthand
                    break;
                }
                return Ok(sibling);
            }

            if !shorthand {
                if matches!(
                    ctx.node(sibling).kind,
                    NodeKind::Leaf { .. } | NodeKind::LeafList { .. } | NodeKind::AnyXml { .. }
                ) {
                    return Err(Diagnostic::unexpected_char(id));
                }
                scan_parent = Some(sibling);
            }
            prev_mod = ctx.node_module(sibling);
            matched = Some(sibling);
            break;
        }

        if matched.is_none() {
            return Err(Diagnostic::error(
                DiagnosticCode::PathInNode,
                "Schema node not found.".to_string(),
            )
            .with_path(nodeid.to_string()));
        }

        let parsed = parse_schema_nodeid(id, &mut is_relative)
            .map_err(|off| Diagnostic::unexpected_char(&id[off..]))?;
        segment = parsed.0;
        len = parsed.1;
        id = &id[len..];
    }
}

/// Validate `[key=...]` predicates of a JSON nodeid against a list's key
/// leaves. Returns the number of bytes consumed.
fn check_json_list_predicates(
    ctx: &SchemaContext,
    input: &str,
    keys: &[NodeId],
) -> Result<usize, Diagnostic> {
    let mut consumed = 0;
    loop {
        let (pred, len) = parse_schema_json_predicate(&input[consumed..], false)
            .map_err(|off| Diagnostic::unexpected_char(&input[consumed + off..]))?;
        if pred.name == "." {
            return Err(Diagnostic::unexpected_char(&input[consumed..]));
        }
        consumed += len;

        if !keys.iter().any(|&k| ctx.node_name(k) == pred.name) {
            return Err(Diagnostic::error(
                DiagnosticCode::PathInKey,
                format!("List key not found or on incorrect position ({}).", pred.name),
            ));
        }

        if !pred.has_more {
            return Ok(consumed);
        }
    }
}
