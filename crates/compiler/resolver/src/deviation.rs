//! Deviation application: not-supported / add / delete / replace.

use yang_compiler_diagnostics::Diagnostic;
use yang_compiler_schema::{
    Deviate, DeviateKind, Deviation, ModuleId, NodeFlags, NodeId, NodeKind, NodeTypeSet,
    SchemaContext, Unique,
};

use crate::error::{ResolveError, ResolveResult};
use crate::lookup::{resolve_absolute_schema_nodeid, LookupError};
use crate::unres::{add_schema_item, SchemaItem, UnresSchema};

/// Apply all not-yet-applied deviations declared by a module.
pub fn apply_module_deviations(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
) -> ResolveResult {
    for index in 0..ctx.modules[module].deviations.len() {
        if ctx.modules[module].deviations[index].applied {
            continue;
        }
        let mut deviation = ctx.modules[module].deviations[index].clone();
        apply_deviation(ctx, unres, module, &mut deviation)?;
        deviation.applied = true;
        ctx.modules[module].deviations[index] = deviation;
    }
    Ok(())
}

/// Detach a schema node from its parent's child list or its module's
/// top level.
fn unlink_schema_node(ctx: &mut SchemaContext, node: NodeId) {
    match ctx.nodes[node].parent {
        Some(parent) => {
            ctx.nodes[parent].children.retain(|&c| c != node);
        }
        None => {
            let module = ctx.main_module(ctx.nodes[node].module);
            ctx.modules[module].data.retain(|&c| c != node);
            for inc in ctx.modules[module].includes.clone() {
                ctx.modules[inc].data.retain(|&c| c != node);
            }
        }
    }
    ctx.nodes[node].parent = None;
}

fn deviate_error(target_name: &str, detail: &str) -> ResolveError {
    ResolveError::fatal(
        Diagnostic::invalid_arg(target_name, "deviate").with_related(detail.to_string()),
    )
}

/// Apply one deviation: resolve the target, mark its module deviated and
/// implemented, and run the deviate records in order.
pub fn apply_deviation(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
    deviation: &mut Deviation,
) -> ResolveResult {
    let target_name = deviation.target_name.clone();
    let target = match resolve_absolute_schema_nodeid(ctx, &target_name, module, NodeTypeSet::ANY)
    {
        Ok(Some(target)) => target,
        Ok(None) => {
            return Err(ResolveError::deferred(Diagnostic::unresolved(
                "deviation",
                &target_name,
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
                "deviation",
            )))
        }
    };
    deviation.target = Some(target);

    // the deviated module becomes implemented alongside the deviating one
    let target_module = ctx.node_module(target);
    ctx.modules[target_module].deviated = true;
    ctx.modules[target_module].implemented = true;

    let mut removed = false;
    let deviates = deviation.deviates.clone();
    for deviate in &deviates {
        if removed {
            // the target is gone, later deviates cannot apply
            return Err(deviate_error(
                &target_name,
                "Target node was removed by a previous \"not-supported\" deviate.",
            ));
        }
        match deviate.kind {
            DeviateKind::NotSupported => {
                unlink_schema_node(ctx, target);
                deviation.target = None;
                removed = true;
            }
            DeviateKind::Add => apply_deviate_add(ctx, unres, module, target, &target_name, deviate)?,
            DeviateKind::Delete => apply_deviate_delete(ctx, target, &target_name, deviate)?,
            DeviateKind::Replace => {
                apply_deviate_replace(ctx, unres, module, target, &target_name, deviate)?;
            }
        }
    }

    // defaults are re-validated against the (possibly replaced) type
    if !removed {
        if let Some(type_id) = ctx.nodes[target].type_id() {
            let defaults: Vec<String> = match &ctx.nodes[target].kind {
                NodeKind::Leaf { default, .. } => default.iter().cloned().collect(),
                NodeKind::LeafList { defaults, .. } => defaults.clone(),
                _ => Vec::new(),
            };
            for value in defaults {
                add_schema_item(
                    ctx,
                    unres,
                    module,
                    SchemaItem::TypeDefaultCheck { type_id, value },
                )?;
            }
        }
    }

    Ok(())
}

fn apply_deviate_add(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
    target: NodeId,
    target_name: &str,
    deviate: &Deviate,
) -> ResolveResult {
    if !deviate.musts.is_empty() {
        match ctx.nodes[target].musts_mut() {
            Some(musts) => musts.extend(deviate.musts.iter().cloned()),
            None => {
                return Err(deviate_error(
                    target_name,
                    "The target node cannot carry \"must\" constraints.",
                ))
            }
        }
        add_schema_item(ctx, unres, module, SchemaItem::XPathRegister { node: target })?;
    }

    if !deviate.uniques.is_empty() {
        let new_indices = match &mut ctx.nodes[target].kind {
            NodeKind::List { uniques, .. } => {
                let first_new = uniques.len();
                for path in &deviate.uniques {
                    uniques.push(Unique {
                        paths: vec![path.clone()],
                        leaves: Vec::new(),
                    });
                }
                first_new..uniques.len()
            }
            _ => {
                return Err(deviate_error(
                    target_name,
                    "Only a list can carry \"unique\" constraints.",
                ))
            }
        };
        for index in new_indices {
            add_schema_item(
                ctx,
                unres,
                module,
                SchemaItem::ListUnique {
                    list: target,
                    index,
                },
            )?;
        }
    }

    if let Some(value) = &deviate.default {
        let mut choice_changed = false;
        match &mut ctx.nodes[target].kind {
            NodeKind::Leaf { default, .. } => {
                if default.is_some() {
                    return Err(deviate_error(
                        target_name,
                        "Adding a \"default\" to a node that already has one.",
                    ));
                }
                *default = Some(value.clone());
            }
            NodeKind::LeafList { defaults, .. } => defaults.push(value.clone()),
            NodeKind::Choice { default_name, .. } => {
                if default_name.is_some() {
                    return Err(deviate_error(
                        target_name,
                        "Adding a \"default\" to a node that already has one.",
                    ));
                }
                *default_name = Some(value.clone());
                choice_changed = true;
            }
            _ => {
                return Err(deviate_error(
                    target_name,
                    "The target node cannot carry a \"default\".",
                ))
            }
        }
        if choice_changed {
            add_schema_item(ctx, unres, module, SchemaItem::ChoiceDefault { choice: target })?;
        }
    }

    if let Some(config) = deviate.config {
        if ctx.nodes[target].flags.contains(NodeFlags::CONFIG_SET) {
            return Err(deviate_error(
                target_name,
                "Adding a \"config\" to a node where it is already set.",
            ));
        }
        set_config(ctx, target, config);
    }

    if let Some(mandatory) = deviate.mandatory {
        if ctx.nodes[target].flags.intersects(NodeFlags::MAND_MASK) {
            return Err(deviate_error(
                target_name,
                "Adding a \"mandatory\" to a node where it is already set.",
            ));
        }
        ctx.nodes[target].flags |= if mandatory {
            NodeFlags::MAND_TRUE
        } else {
            NodeFlags::MAND_FALSE
        };
    }

    if deviate.min_elements.is_some() || deviate.max_elements.is_some() {
        set_min_max(ctx, target, target_name, deviate, true)?;
    }

    if let Some(units) = &deviate.units {
        match &mut ctx.nodes[target].kind {
            NodeKind::Leaf { units: slot, .. } | NodeKind::LeafList { units: slot, .. } => {
                if slot.is_some() {
                    return Err(deviate_error(
                        target_name,
                        "Adding \"units\" to a node that already has them.",
                    ));
                }
                *slot = Some(units.clone());
            }
            _ => {
                return Err(deviate_error(
                    target_name,
                    "The target node cannot carry \"units\".",
                ))
            }
        }
    }

    Ok(())
}

fn apply_deviate_delete(
    ctx: &mut SchemaContext,
    target: NodeId,
    target_name: &str,
    deviate: &Deviate,
) -> ResolveResult {
    for must in &deviate.musts {
        let removed = match ctx.nodes[target].musts_mut() {
            Some(musts) => {
                let before = musts.len();
                musts.retain(|m| m.expr != must.expr);
                musts.len() < before
            }
            None => false,
        };
        if !removed {
            return Err(deviate_error(
                target_name,
                "Deleting a \"must\" that does not match any on the target.",
            ));
        }
    }

    for path in &deviate.uniques {
        let removed = match &mut ctx.nodes[target].kind {
            NodeKind::List { uniques, .. } => {
                let before = uniques.len();
                uniques.retain(|u| u.paths.join(" ") != *path);
                uniques.len() < before
            }
            _ => false,
        };
        if !removed {
            return Err(deviate_error(
                target_name,
                "Deleting a \"unique\" that does not match any on the target.",
            ));
        }
    }

    if let Some(value) = &deviate.default {
        let removed = match &mut ctx.nodes[target].kind {
            NodeKind::Leaf { default, .. } => {
                if default.as_deref() == Some(value.as_str()) {
                    *default = None;
                    true
                } else {
                    false
                }
            }
            NodeKind::LeafList { defaults, .. } => {
                let before = defaults.len();
                defaults.retain(|d| d != value);
                defaults.len() < before
            }
            NodeKind::Choice {
                default_name,
                default,
            } => {
                if default_name.as_deref() == Some(value.as_str()) {
                    *default_name = None;
                    *default = None;
                    true
                } else {
                    false
                }
            }
            _ => false,
        };
        if !removed {
            return Err(deviate_error(
                target_name,
                "Deleting a \"default\" that does not match the target's.",
            ));
        }
    }

    if let Some(units) = &deviate.units {
        let removed = match &mut ctx.nodes[target].kind {
            NodeKind::Leaf { units: slot, .. } | NodeKind::LeafList { units: slot, .. } => {
                if slot.as_deref() == Some(units.as_str()) {
                    *slot = None;
                    true
                } else {
                    false
                }
            }
            _ => false,
        };
        if !removed {
            return Err(deviate_error(
                target_name,
                "Deleting \"units\" that do not match the target's.",
            ));
        }
    }

    Ok(())
}

fn apply_deviate_replace(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
    target: NodeId,
    target_name: &str,
    deviate: &Deviate,
) -> ResolveResult {
    if let Some(new_type) = deviate.type_id {
        match &mut ctx.nodes[target].kind {
            NodeKind::Leaf { type_id, .. } | NodeKind::LeafList { type_id, .. } => {
                *type_id = new_type;
            }
            _ => {
                return Err(deviate_error(
                    target_name,
                    "Only a leaf or leaf-list type can be replaced.",
                ))
            }
        }
        ctx.types[new_type].parent_node = Some(target);
        if ctx.types[new_type].base.is_none() {
            add_schema_item(
                ctx,
                unres,
                module,
                SchemaItem::TypeDerivation {
                    type_id: new_type,
                    node: Some(target),
                },
            )?;
        }
    }

    if let Some(units) = &deviate.units {
        match &mut ctx.nodes[target].kind {
            NodeKind::Leaf { units: slot, .. } | NodeKind::LeafList { units: slot, .. } => {
                if slot.is_none() {
                    return Err(deviate_error(
                        target_name,
                        "Replacing \"units\" that do not exist on the target.",
                    ));
                }
                *slot = Some(units.clone());
            }
            _ => {
                return Err(deviate_error(
                    target_name,
                    "The target node cannot carry \"units\".",
                ))
            }
        }
    }

    if let Some(value) = &deviate.default {
        let mut choice_changed = false;
        match &mut ctx.nodes[target].kind {
            NodeKind::Leaf { default, .. } => {
                if default.is_none() {
                    return Err(deviate_error(
                        target_name,
                        "Replacing a \"default\" that does not exist on the target.",
                    ));
                }
                *default = Some(value.clone());
            }
            NodeKind::Choice { default_name, .. } => {
                if default_name.is_none() {
                    return Err(deviate_error(
                        target_name,
                        "Replacing a \"default\" that does not exist on the target.",
                    ));
                }
                *default_name = Some(value.clone());
                choice_changed = true;
            }
            _ => {
                return Err(deviate_error(
                    target_name,
                    "The target node cannot carry a \"default\".",
                ))
            }
        }
        if choice_changed {
            add_schema_item(ctx, unres, module, SchemaItem::ChoiceDefault { choice: target })?;
        }
    }

    if let Some(config) = deviate.config {
        if !ctx.nodes[target].flags.contains(NodeFlags::CONFIG_SET) {
            return Err(deviate_error(
                target_name,
                "Replacing a \"config\" that is not set on the target.",
            ));
        }
        set_config(ctx, target, config);
    }

    if let Some(mandatory) = deviate.mandatory {
        if !ctx.nodes[target].flags.intersects(NodeFlags::MAND_MASK) {
            return Err(deviate_error(
                target_name,
                "Replacing a \"mandatory\" that is not set on the target.",
            ));
        }
        ctx.nodes[target].flags &= !NodeFlags::MAND_MASK;
        ctx.nodes[target].flags |= if mandatory {
            NodeFlags::MAND_TRUE
        } else {
            NodeFlags::MAND_FALSE
        };
    }

    if deviate.min_elements.is_some() || deviate.max_elements.is_some() {
        set_min_max(ctx, target, target_name, deviate, false)?;
    }

    Ok(())
}

fn set_config(ctx: &mut SchemaContext, target: NodeId, config: bool) {
    let flag = if config {
        NodeFlags::CONFIG_W
    } else {
        NodeFlags::CONFIG_R
    };
    ctx.nodes[target].flags &= !NodeFlags::CONFIG_MASK;
    ctx.nodes[target].flags |= flag | NodeFlags::CONFIG_SET;

    // descendants follow unless they set config explicitly
    let mut stack = ctx.nodes[target].children.clone();
    while let Some(cur) = stack.pop() {
        if ctx.nodes[cur].flags.contains(NodeFlags::CONFIG_SET) {
            continue;
        }
        ctx.nodes[cur].flags &= !NodeFlags::CONFIG_MASK;
        ctx.nodes[cur].flags |= flag;
        stack.extend_from_slice(&ctx.nodes[cur].children);
    }
}

fn set_min_max(
    ctx: &mut SchemaContext,
    target: NodeId,
    target_name: &str,
    deviate: &Deviate,
    add: bool,
) -> ResolveResult {
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
            if let Some(min) = deviate.min_elements {
                if add && *min_elements != 0 {
                    return Err(deviate_error(
                        target_name,
                        "Adding \"min-elements\" to a node where it is already set.",
                    ));
                }
                if !add && *min_elements == 0 {
                    return Err(deviate_error(
                        target_name,
                        "Replacing \"min-elements\" that is not set on the target.",
                    ));
                }
                *min_elements = min;
            }
            if let Some(max) = deviate.max_elements {
                if add && *max_elements != 0 {
                    return Err(deviate_error(
                        target_name,
                        "Adding \"max-elements\" to a node where it is already set.",
                    ));
                }
                if !add && *max_elements == 0 {
                    return Err(deviate_error(
                        target_name,
                        "Replacing \"max-elements\" that is not set on the target.",
                    ));
                }
                *max_elements = max;
            }
            Ok(())
        }
        _ => Err(deviate_error(
            target_name,
            "The target node cannot carry \"min-elements\"/\"max-elements\".",
        )),
    }
}
