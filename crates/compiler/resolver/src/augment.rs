//! Augment target resolution and splicing.

use tracing::warn;

use yang_compiler_diagnostics::{Diagnostic, DiagnosticCode};
use yang_compiler_schema::{NodeFlags, NodeId, NodeKind, SchemaContext};

use crate::error::{ResolveError, ResolveResult};
use crate::lookup::{resolve_augment_schema_nodeid, LookupError};
use crate::unres::{add_schema_item, SchemaItem, UnresSchema};

/// Whether any node of the subtree is mandatory.
fn subtree_has_mandatory(ctx: &SchemaContext, roots: &[NodeId]) -> bool {
    let mut stack: Vec<NodeId> = roots.to_vec();
    while let Some(cur) = stack.pop() {
        if ctx.nodes[cur].flags.contains(NodeFlags::MAND_TRUE) {
            return true;
        }
        stack.extend_from_slice(&ctx.nodes[cur].children);
    }
    false
}

/// Pass the config flags of a splice target down a subtree, honoring
/// explicit `config` statements.
fn inherit_config_flag(ctx: &mut SchemaContext, node: NodeId, config: NodeFlags) {
    if !ctx.nodes[node].flags.contains(NodeFlags::CONFIG_SET) {
        ctx.nodes[node].flags &= !NodeFlags::CONFIG_MASK;
        ctx.nodes[node].flags |= config;
    }
    let effective = ctx.nodes[node].flags & NodeFlags::CONFIG_MASK;
    let children = ctx.nodes[node].children.clone();
    for child in children {
        inherit_config_flag(ctx, child, effective);
    }
}

/// Resolve an augment's target and splice its children in: absolute nodeids
/// for module-level augments, descendant nodeids (from the uses site) for
/// uses-level augments.
pub fn resolve_augment(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    augment: NodeId,
    uses_start: Option<NodeId>,
) -> ResolveResult {
    let target_name = match &ctx.nodes[augment].kind {
        NodeKind::Augment { target_name, .. } => target_name.clone(),
        _ => {
            return Err(ResolveError::fatal(Diagnostic::internal(
                "augment application on non-augment",
            )))
        }
    };
    let module = ctx.nodes[augment].module;

    let target = match resolve_augment_schema_nodeid(
        ctx,
        &target_name,
        uses_start,
        if uses_start.is_none() {
            Some(module)
        } else {
            None
        },
    ) {
        Ok(Some(target)) => target,
        Ok(None) => {
            return Err(ResolveError::deferred(Diagnostic::unresolved(
                "augment", &target_name,
            )))
        }
        Err(LookupError::Syntax { offset }) => {
            return Err(ResolveError::fatal(Diagnostic::unexpected_char(
                &target_name[offset.min(target_name.len())..],
            )))
        }
        Err(_) => {
            return Err(ResolveError::fatal(Diagnostic::invalid_arg(
                &target_name,
                "augment",
            )))
        }
    };
    if let NodeKind::Augment { target: slot, .. } = &mut ctx.nodes[augment].kind {
        *slot = Some(target);
    }

    let children = ctx.nodes[augment].children.clone();
    if children.is_empty() {
        warn!(target = %target_name, "augment without children");
        return Ok(());
    }

    // mandatory nodes may not be augmented into another module
    if uses_start.is_none()
        && ctx.main_module(module) != ctx.node_module(target)
        && subtree_has_mandatory(ctx, &children)
    {
        return Err(ResolveError::fatal(
            Diagnostic::error(
                DiagnosticCode::InChildStmt,
                "Invalid keyword \"mandatory\" as a child to \"augment node\".".to_string(),
            )
            .with_related(
                "When augmenting data in another module, mandatory nodes are not allowed."
                    .to_string(),
            )
            .with_path(ctx.schema_path(target)),
        ));
    }

    // target nodetype must accept the augment's child types
    let target_kind = &ctx.nodes[target].kind;
    let accepts_data = matches!(
        target_kind,
        NodeKind::Container { .. }
            | NodeKind::List { .. }
            | NodeKind::Case
            | NodeKind::Input { .. }
            | NodeKind::Output { .. }
            | NodeKind::Notification { .. }
    );
    let is_choice = matches!(target_kind, NodeKind::Choice { .. });
    if !accepts_data && !is_choice {
        return Err(ResolveError::fatal(
            Diagnostic::invalid_arg(&target_name, "target-node").with_related(format!(
                "Invalid augment target node type \"{}\".",
                ctx.nodes[target].kind_name()
            )),
        ));
    }
    for &child in &children {
        let child_node = &ctx.nodes[child];
        let ok = if is_choice {
            matches!(
                child_node.kind,
                NodeKind::Case
                    | NodeKind::AnyXml { .. }
                    | NodeKind::Container { .. }
                    | NodeKind::Leaf { .. }
                    | NodeKind::List { .. }
                    | NodeKind::LeafList { .. }
            )
        } else {
            matches!(
                child_node.kind,
                NodeKind::AnyXml { .. }
                    | NodeKind::Container { .. }
                    | NodeKind::Leaf { .. }
                    | NodeKind::List { .. }
                    | NodeKind::LeafList { .. }
                    | NodeKind::Uses { .. }
                    | NodeKind::Choice { .. }
            )
        };
        if !ok {
            return Err(ResolveError::fatal(
                Diagnostic::error(
                    DiagnosticCode::InChildStmt,
                    format!(
                        "Invalid keyword \"{}\" as a child to \"augment\".",
                        child_node.kind_name()
                    ),
                )
                .with_related(format!(
                    "Cannot augment \"{}\" with a \"{}\".",
                    ctx.nodes[target].kind_name(),
                    child_node.kind_name()
                )),
            ));
        }
    }

    // the augment has no config of its own, it carries the target's for
    // its subtree
    let target_config = ctx.nodes[target].flags & NodeFlags::CONFIG_MASK;
    ctx.nodes[augment].flags &= !NodeFlags::CONFIG_MASK;
    ctx.nodes[augment].flags |= target_config;
    for &child in &children {
        inherit_config_flag(ctx, child, target_config);
    }

    // identifier uniqueness at the splice point
    for &child in &children {
        let child_name = ctx.str(ctx.nodes[child].name).to_string();
        let child_module = ctx.node_module(child);
        let duplicate = ctx.nodes[target].children.iter().any(|&existing| {
            ctx.node_name(existing) == child_name && ctx.node_module(existing) == child_module
        });
        if duplicate {
            return Err(ResolveError::fatal(
                Diagnostic::duplicate_id("data definition", &child_name)
                    .with_path(ctx.schema_path(target)),
            ));
        }
    }

    // splice: append to the target's child list, keep the augment as the
    // origin marker
    for &child in &children {
        ctx.nodes[child].parent = Some(target);
        ctx.nodes[child].origin_augment = Some(augment);
        ctx.nodes[target].children.push(child);
        if ctx.nodes[child].when.is_some() || !ctx.nodes[child].musts().is_empty() {
            add_schema_item(ctx, unres, module, SchemaItem::XPathRegister { node: child })?;
        }
    }

    Ok(())
}
