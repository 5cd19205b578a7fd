//! `uses` expansion and refinement.
//!
//! Expansion deep-copies the target grouping's children under the uses
//! site, re-parenting every link and duplicating pending type work onto the
//! new nodes' worklist entries. Copied typedefs stay shared with the
//! grouping. A grouping may only be instantiated once its own `uses` are
//! all expanded, enforced by the per-grouping pending-uses counter.

use tracing::debug;

use yang_compiler_diagnostics::Diagnostic;
use yang_compiler_schema::{
    BuiltinType, ModuleId, NodeFlags, NodeId, NodeKind, NodeTypeSet, Refine, SchemaContext,
    TypeId,
};

use crate::augment::resolve_augment;
use crate::error::{ResolveError, ResolveResult};
use crate::lookup::{
    resolve_choice_default_schema_nodeid, resolve_descendant_schema_nodeid, resolve_uses_grouping,
    LookupError,
};
use crate::status::check_status;
use crate::unres::{add_schema_item, IfFeatureTarget, SchemaItem, UnresSchema};

/// Deep-copy a type for a copied schema node; union members are copied
/// recursively so every instance resolves independently.
fn duplicate_type(ctx: &mut SchemaContext, old: TypeId, parent_node: Option<NodeId>) -> TypeId {
    let mut spec = ctx.types[old].clone();
    spec.parent_node = parent_node;
    let members = std::mem::take(&mut spec.union_types);
    let new_id = ctx.add_type(spec);
    let copied: Vec<TypeId> = members
        .into_iter()
        .map(|m| duplicate_type(ctx, m, parent_node))
        .collect();
    ctx.types[new_id].union_types = copied;
    new_id
}

/// Deep-copy one grouping child under `new_parent`, inheriting the config
/// flags of the uses site, and re-enqueue the unresolved work the copy
/// needs (type derivations, leafref targets, keys, uniques, choice
/// defaults, XPath registrations).
fn duplicate_subtree(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
    src: NodeId,
    new_parent: NodeId,
    inherit_flags: NodeFlags,
) -> ResolveResult<NodeId> {
    let mut node = ctx.nodes[src].clone();
    let src_children = std::mem::take(&mut node.children);
    node.module = module;

    if !node.flags.contains(NodeFlags::CONFIG_SET) {
        node.flags &= !NodeFlags::CONFIG_MASK;
        node.flags |= inherit_flags & NodeFlags::CONFIG_MASK;
    }

    // resolution results bound to the grouping's nodes are discarded and
    // recomputed for the copy
    match &mut node.kind {
        NodeKind::List { keys, uniques, .. } => {
            keys.clear();
            for unique in uniques.iter_mut() {
                unique.leaves.clear();
            }
        }
        NodeKind::Choice { default, .. } => *default = None,
        NodeKind::Grouping { pending_uses, .. } => *pending_uses = 0,
        _ => {}
    }

    let new_id = ctx.add_node(node);
    ctx.add_child(new_parent, new_id);

    // leaf types are duplicated; every pending type item follows the copy
    let mut new_type = None;
    if let Some(old_type) = ctx.nodes[new_id].type_id() {
        let copied = duplicate_type(ctx, old_type, Some(new_id));
        match &mut ctx.nodes[new_id].kind {
            NodeKind::Leaf { type_id, .. } | NodeKind::LeafList { type_id, .. } => {
                *type_id = copied;
            }
            _ => {}
        }
        new_type = Some(copied);
    }

    let mut followups: Vec<SchemaItem> = Vec::new();
    if let Some(type_id) = new_type {
        let spec = &ctx.types[type_id];
        if spec.base.is_none() {
            followups.push(SchemaItem::TypeDerivation {
                type_id,
                node: Some(new_id),
            });
        } else {
            if spec.base == Some(BuiltinType::Leafref)
                && spec.leafref_target.is_none()
                && spec.path.is_some()
            {
                followups.push(SchemaItem::TypeLeafref {
                    type_id,
                    node: Some(new_id),
                });
            }
            if spec.base == Some(BuiltinType::Identityref) && spec.identity_base.is_none() {
                followups.push(SchemaItem::TypeIdentrefBase { type_id });
            }
        }
    }
    match &ctx.nodes[new_id].kind {
        NodeKind::List {
            key_names, uniques, ..
        } => {
            if key_names.is_some() {
                followups.push(SchemaItem::ListKeys { list: new_id });
            }
            for index in 0..uniques.len() {
                followups.push(SchemaItem::ListUnique {
                    list: new_id,
                    index,
                });
            }
        }
        NodeKind::Choice { default_name, .. } => {
            if default_name.is_some() {
                followups.push(SchemaItem::ChoiceDefault { choice: new_id });
            }
        }
        _ => {}
    }
    for (index, iff) in ctx.nodes[new_id].if_features.iter().enumerate() {
        if iff.feature.is_none() {
            followups.push(SchemaItem::IfFeature {
                target: IfFeatureTarget::Node(new_id),
                index,
            });
        }
    }
    if ctx.nodes[new_id].when.is_some() || !ctx.nodes[new_id].musts().is_empty() {
        followups.push(SchemaItem::XPathRegister { node: new_id });
    }

    for item in followups {
        add_schema_item(ctx, unres, module, item)?;
    }

    // children, inheriting the copy's effective flags
    let child_flags = ctx.nodes[new_id].flags;
    for child in src_children {
        duplicate_subtree(ctx, unres, module, child, new_id, child_flags)?;
    }

    Ok(new_id)
}

/// Expand a `uses` whose grouping is resolved: copy the grouping contents,
/// apply refinements in order, then apply the uses-level augments.
pub fn resolve_uses(ctx: &mut SchemaContext, unres: &mut UnresSchema, uses: NodeId) -> ResolveResult {
    let grouping = match &ctx.nodes[uses].kind {
        NodeKind::Uses {
            grouping: Some(grouping),
            ..
        } => *grouping,
        _ => {
            return Err(ResolveError::fatal(Diagnostic::internal(
                "uses expansion without resolved grouping",
            )))
        }
    };
    let module = ctx.nodes[uses].module;
    let uses_flags = ctx.nodes[uses].flags;
    let uses_name = match &ctx.nodes[uses].kind {
        NodeKind::Uses { grouping_name, .. } => grouping_name.clone(),
        _ => String::new(),
    };

    // copy the data nodes from the grouping into the uses context
    let grp_children = ctx.nodes[grouping].children.clone();
    for child in grp_children {
        duplicate_subtree(ctx, unres, module, child, uses, uses_flags).map_err(|e| {
            ResolveError::fatal(
                Diagnostic::invalid_arg(&uses_name, "uses")
                    .with_related(format!(
                        "Copying data from grouping failed: {}.",
                        e.diagnostic().message
                    )),
            )
        })?;
    }

    // the grouping was copied, the rest must be resolvable

    let refines = match &ctx.nodes[uses].kind {
        NodeKind::Uses { refines, .. } => refines.clone(),
        _ => Vec::new(),
    };
    for refine in &refines {
        apply_refine(ctx, unres, uses, refine)?;
    }

    // augments apply only after all refinements
    let augments = match &ctx.nodes[uses].kind {
        NodeKind::Uses { augments, .. } => augments.clone(),
        _ => Vec::new(),
    };
    for augment in augments {
        resolve_augment(ctx, unres, augment, Some(uses)).map_err(|e| match e {
            ResolveError::Deferred(d) | ResolveError::Fatal(d) => ResolveError::fatal(d),
        })?;
    }

    Ok(())
}

/// Apply one refine record to its target inside the expanded children.
fn apply_refine(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    uses: NodeId,
    refine: &Refine,
) -> ResolveResult {
    let refine_error = || {
        ResolveError::fatal(Diagnostic::invalid_arg(&refine.target_name, "refine"))
    };

    let target = match resolve_descendant_schema_nodeid(
        ctx,
        &refine.target_name,
        uses,
        NodeTypeSet::NO_RPC_NOTIF,
        true,
        false,
    ) {
        Ok(Some(target)) => target,
        _ => return Err(refine_error()),
    };
    let kind_flag = ctx.nodes[target].kind_flag();
    let module = ctx.nodes[uses].module;

    if !refine.target_type.is_empty() && !refine.target_type.contains(kind_flag) {
        return Err(ResolveError::fatal(
            Diagnostic::invalid_arg(&refine.target_name, "refine").with_related(
                "Refine substatements not applicable to the target-node.".to_string(),
            ),
        ));
    }

    // description and reference replace on any nodetype
    if let Some(description) = &refine.description {
        ctx.nodes[target].description = Some(description.clone());
    }
    if let Some(reference) = &refine.reference {
        ctx.nodes[target].reference = Some(reference.clone());
    }

    // config replaces on data nodes except anyxml
    if let Some(config) = refine.config {
        if !NodeTypeSet::DATA.contains(kind_flag) || kind_flag == NodeTypeSet::ANYXML {
            return Err(refine_error());
        }
        let new_flag = if config {
            NodeFlags::CONFIG_W
        } else {
            NodeFlags::CONFIG_R
        };
        if config {
            if let Some(parent) = ctx.nodes[target].parent {
                let parent_cfg = ctx.nodes[parent].flags & NodeFlags::CONFIG_MASK;
                if parent_cfg == NodeFlags::CONFIG_R {
                    // setting config true under config false is prohibited
                    return Err(ResolveError::fatal(
                        Diagnostic::invalid_arg("config", "refine").with_related(
                            "changing config from 'false' to 'true' is prohibited while the \
                             target's parent is still config 'false'."
                                .to_string(),
                        ),
                    ));
                }
            }
        }
        ctx.nodes[target].flags &= !NodeFlags::CONFIG_MASK;
        ctx.nodes[target].flags |= new_flag | NodeFlags::CONFIG_SET;
        propagate_config(ctx, target, new_flag)?;
    }

    // default: replace for leaf and choice, extend for leaf-list
    if !refine.defaults.is_empty() {
        if kind_flag == NodeTypeSet::CHOICE {
            let resolved = resolve_choice_default_schema_nodeid(ctx, &refine.defaults[0], target);
            match resolved {
                Ok(Some(case)) => {
                    if let NodeKind::Choice {
                        default,
                        default_name,
                    } = &mut ctx.nodes[target].kind
                    {
                        *default = Some(case);
                        *default_name = Some(refine.defaults[0].clone());
                    }
                }
                _ => {
                    return Err(ResolveError::fatal(Diagnostic::invalid_arg(
                        &refine.defaults[0],
                        "default",
                    )))
                }
            }
        } else {
            match &mut ctx.nodes[target].kind {
                NodeKind::Leaf { default, .. } => {
                    *default = Some(refine.defaults[0].clone());
                }
                NodeKind::LeafList { defaults, .. } => {
                    defaults.extend(refine.defaults.iter().cloned());
                }
                _ => return Err(refine_error()),
            }
        }
        // re-validate replaced defaults against the node's type
        if let Some(type_id) = ctx.nodes[target].type_id() {
            for value in &refine.defaults {
                add_schema_item(
                    ctx,
                    unres,
                    module,
                    SchemaItem::TypeDefaultCheck {
                        type_id,
                        value: value.clone(),
                    },
                )?;
            }
        }
    }

    // mandatory replaces on leaf, anyxml and choice
    if let Some(mandatory) = refine.mandatory {
        if !(NodeTypeSet::LEAF | NodeTypeSet::ANYXML | NodeTypeSet::CHOICE).contains(kind_flag) {
            return Err(refine_error());
        }
        ctx.nodes[target].flags &= !NodeFlags::MAND_MASK;
        ctx.nodes[target].flags |= if mandatory {
            NodeFlags::MAND_TRUE
        } else {
            NodeFlags::MAND_FALSE
        };
    }

    // presence replaces on containers
    if let Some(presence) = &refine.presence {
        match &mut ctx.nodes[target].kind {
            NodeKind::Container { presence: p, .. } => *p = Some(presence.clone()),
            _ => return Err(refine_error()),
        }
    }

    // min/max-elements replace on lists and leaf-lists
    if refine.min_elements.is_some() || refine.max_elements.is_some() {
        match &mut ctx.nodes[target].kind {
            NodeKind::List {
                min_elements,
                max_elements,
                ..
            }
            | NodeKind::LeafList {
                min_elements,
                max_elements,
                ..
            } => {
                if let Some(min) = refine.min_elements {
                    *min_elements = min;
                }
                if let Some(max) = refine.max_elements {
                    *max_elements = max;
                }
            }
            _ => return Err(refine_error()),
        }
    }

    // the must list is extended
    if !refine.musts.is_empty() {
        let extended = match ctx.nodes[target].musts_mut() {
            Some(musts) => {
                musts.extend(refine.musts.iter().cloned());
                true
            }
            None => false,
        };
        if !extended {
            return Err(refine_error());
        }
        add_schema_item(ctx, unres, module, SchemaItem::XPathRegister { node: target })?;
    }

    Ok(())
}

/// Propagate a refined config flag through the descendants, honoring
/// explicit `config` statements.
fn propagate_config(ctx: &mut SchemaContext, node: NodeId, new_flag: NodeFlags) -> ResolveResult {
    let mut stack: Vec<NodeId> = ctx.nodes[node].children.clone();
    while let Some(cur) = stack.pop() {
        if new_flag == NodeFlags::CONFIG_W {
            if ctx.nodes[cur].flags.contains(NodeFlags::CONFIG_SET) {
                // config is set explicitly, leave the subtree alone
                continue;
            }
        } else if ctx.nodes[cur].flags.contains(NodeFlags::CONFIG_SET)
            && ctx.nodes[cur].flags.contains(NodeFlags::CONFIG_W)
        {
            // we would have config data under status data
            return Err(ResolveError::fatal(
                Diagnostic::invalid_arg("config", "refine").with_related(
                    "changing config from 'true' to 'false' is prohibited while the target \
                     has still a children with explicit config 'true'."
                        .to_string(),
                ),
            ));
        }
        ctx.nodes[cur].flags &= !NodeFlags::CONFIG_MASK;
        ctx.nodes[cur].flags |= new_flag;
        stack.extend_from_slice(&ctx.nodes[cur].children);
    }
    Ok(())
}

/// Gate-keeping wrapper for `uses` items on the schema worklist: resolve
/// the grouping reference, defer while the grouping still has pending
/// `uses` of its own (bumping the enclosing grouping's counter), and
/// finally expand.
pub fn resolve_unres_schema_uses(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    uses: NodeId,
) -> ResolveResult {
    // enclosing grouping, if the uses itself sits inside one
    let mut par_grp = None;
    let mut cursor = ctx.nodes[uses].parent;
    while let Some(cur) = cursor {
        if matches!(ctx.nodes[cur].kind, NodeKind::Grouping { .. }) {
            par_grp = Some(cur);
            break;
        }
        cursor = ctx.nodes[cur].parent;
    }

    let grouping_name = match &ctx.nodes[uses].kind {
        NodeKind::Uses { grouping_name, .. } => grouping_name.clone(),
        _ => return Err(ResolveError::fatal(Diagnostic::internal("uses without name"))),
    };

    let mut grouping = match &ctx.nodes[uses].kind {
        NodeKind::Uses { grouping, .. } => *grouping,
        _ => None,
    };
    if grouping.is_none() {
        match resolve_uses_grouping(ctx, &grouping_name, uses) {
            Ok(Some(found)) => {
                if let NodeKind::Uses { grouping: slot, .. } = &mut ctx.nodes[uses].kind {
                    *slot = Some(found);
                }
                grouping = Some(found);
            }
            Ok(None) => {
                defer_uses(ctx, uses, par_grp);
                return Err(ResolveError::deferred(Diagnostic::unresolved(
                    "grouping",
                    &grouping_name,
                )));
            }
            Err(LookupError::Syntax { offset }) => {
                return Err(ResolveError::fatal(Diagnostic::unexpected_char(
                    &grouping_name[offset.min(grouping_name.len())..],
                )));
            }
            Err(_) => {
                return Err(ResolveError::fatal(Diagnostic::unresolved(
                    "grouping",
                    &grouping_name,
                )));
            }
        }
    }
    let grouping = grouping.ok_or_else(|| {
        ResolveError::fatal(Diagnostic::internal("grouping lookup lost its result"))
    })?;

    // the grouping itself must have no pending uses before instantiation
    let pending = match &ctx.nodes[grouping].kind {
        NodeKind::Grouping { pending_uses, .. } => *pending_uses,
        _ => {
            return Err(ResolveError::fatal(Diagnostic::unresolved(
                "grouping",
                &grouping_name,
            )))
        }
    };
    if pending > 0 {
        defer_uses(ctx, uses, par_grp);
        debug!(grouping = %grouping_name, pending, "grouping not yet expandable");
        return Err(ResolveError::deferred(Diagnostic::unresolved(
            "grouping",
            &grouping_name,
        )));
    }

    let result = resolve_uses(ctx, unres, uses);
    match result {
        Ok(()) => {
            // settle the pending-uses accounting of the enclosing grouping
            if ctx.nodes[uses].flags.contains(NodeFlags::USES_PENDING) {
                if let Some(par) = par_grp {
                    if let NodeKind::Grouping { pending_uses, .. } = &mut ctx.nodes[par].kind {
                        if *pending_uses == 0 {
                            return Err(ResolveError::fatal(Diagnostic::internal(
                                "pending-uses counter underflow",
                            )));
                        }
                        *pending_uses -= 1;
                    }
                }
                ctx.nodes[uses].flags &= !NodeFlags::USES_PENDING;
            }

            // status of the uses against the grouping
            let uses_flags = ctx.nodes[uses].flags;
            let uses_module = ctx.nodes[uses].module;
            let grp_flags = ctx.nodes[grouping].flags;
            let grp_module = ctx.nodes[grouping].module;
            let grp_name = ctx.str(ctx.nodes[grouping].name).to_string();
            check_status(
                ctx,
                uses_flags,
                uses_module,
                "of uses",
                grp_flags,
                grp_module,
                &grp_name,
            )
            .map_err(ResolveError::fatal)?;

            Ok(())
        }
        Err(e @ ResolveError::Deferred(_)) => {
            defer_uses(ctx, uses, par_grp);
            Err(e)
        }
        Err(e) => Err(e),
    }
}

/// Count a deferred `uses` in its enclosing grouping's gate, once.
fn defer_uses(ctx: &mut SchemaContext, uses: NodeId, par_grp: Option<NodeId>) {
    if ctx.nodes[uses].flags.contains(NodeFlags::USES_PENDING) {
        return;
    }
    if let Some(par) = par_grp {
        if let NodeKind::Grouping { pending_uses, .. } = &mut ctx.nodes[par].kind {
            *pending_uses += 1;
        }
        ctx.nodes[uses].flags |= NodeFlags::USES_PENDING;
    }
}
