//! `when`/`must` condition handling and the XPath collaborator boundary.
//!
//! The resolver never evaluates XPath itself: it schedules registrations at
//! schema time and asks the [`XPathEvaluator`] collaborator for verdicts at
//! data time. A `when` is evaluated only once every ancestor `when` is in a
//! terminal state; a false verdict marks the instance subtree for
//! auto-deletion (driver's job).

use thiserror::Error;

use yang_compiler_diagnostics::{Diagnostic, DiagnosticCode};
use yang_compiler_schema::{DataNodeId, DataTree, NodeId, NodeKind, SchemaContext};

use crate::error::{ResolveError, ResolveResult};

/// Which kind of constraint an XPath expression belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XPathKind {
    When,
    Must,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum XPathError {
    /// The expression depends on nodes whose own `when` is not decided
    /// yet; retry after more conditions settle.
    #[error("condition depends on unresolved nodes")]
    Unresolvable,
    #[error("xpath evaluation failed")]
    Internal,
}

/// XPath collaborator: receives schema-time registrations and evaluates
/// expressions against instance data.
pub trait XPathEvaluator {
    /// Register a `when`/`must` expression attached to a schema node.
    fn register(&mut self, _node: NodeId, _expr: &str, _kind: XPathKind) {}

    /// Evaluate an expression with `node` as context node, cast to boolean.
    fn evaluate(
        &self,
        ctx: &SchemaContext,
        tree: &DataTree,
        node: DataNodeId,
        expr: &str,
        kind: XPathKind,
    ) -> Result<bool, XPathError>;
}

/// Register all `when`/`must` expressions of a schema node with the XPath
/// collaborator.
pub fn register_node_xpath(
    ctx: &SchemaContext,
    node: NodeId,
    evaluator: &mut dyn XPathEvaluator,
) {
    if let Some(when) = &ctx.nodes[node].when {
        evaluator.register(node, &when.condition, XPathKind::When);
    }
    for must in ctx.nodes[node].musts() {
        evaluator.register(node, &must.expr, XPathKind::Must);
    }
}

/// Whether any `must` constraints apply to an instance of this schema node.
pub fn applies_must(ctx: &SchemaContext, schema: NodeId) -> bool {
    !ctx.nodes[schema].musts().is_empty()
}

/// Whether any `when` condition applies to an instance of this schema node:
/// its own, one on an enclosing uses/choice/case, or one on the augment
/// that introduced an ancestor.
pub fn applies_when(ctx: &SchemaContext, schema: NodeId) -> bool {
    if ctx.nodes[schema].when.is_some() {
        return true;
    }

    let mut cursor = schema;
    loop {
        if let Some(aug) = ctx.nodes[cursor].origin_augment {
            if ctx.nodes[aug].when.is_some() {
                return true;
            }
        }
        let parent = match ctx.nodes[cursor].parent {
            Some(parent) => parent,
            None => return false,
        };
        if !matches!(
            ctx.nodes[parent].kind,
            NodeKind::Uses { .. } | NodeKind::Choice { .. } | NodeKind::Case
        ) {
            return false;
        }
        if ctx.nodes[parent].when.is_some() {
            return true;
        }
        cursor = parent;
    }
}

/// Find the data node serving as XPath context for a `when` carried by a
/// schema-only ancestor (uses/choice/case/augment) of `node`'s schema.
fn resolve_when_ctx_node(
    ctx: &SchemaContext,
    tree: &DataTree,
    node: DataNodeId,
    mut schema: NodeId,
) -> Option<DataNodeId> {
    // climb off schema-only nodes
    loop {
        if !matches!(
            ctx.nodes[schema].kind,
            NodeKind::Uses { .. }
                | NodeKind::Choice { .. }
                | NodeKind::Case
                | NodeKind::Augment { .. }
                | NodeKind::Input { .. }
                | NodeKind::Output { .. }
        ) {
            break;
        }
        schema = ctx.nodes[schema].parent?;
    }

    // depth of the data node
    let mut data_depth = 0;
    let mut cursor = Some(node);
    while let Some(cur) = cursor {
        data_depth += 1;
        cursor = tree.nodes[cur].parent;
    }

    // depth of the schema node, counting only data-bearing ancestors
    let mut schema_depth = 1;
    let mut cursor = ctx.nodes[schema].parent;
    while let Some(cur) = cursor {
        if matches!(
            ctx.nodes[cur].kind,
            NodeKind::Container { .. }
                | NodeKind::Leaf { .. }
                | NodeKind::LeafList { .. }
                | NodeKind::List { .. }
                | NodeKind::AnyXml { .. }
                | NodeKind::Notification { .. }
                | NodeKind::Rpc { .. }
                | NodeKind::Action { .. }
        ) {
            schema_depth += 1;
        }
        cursor = ctx.nodes[cur].parent;
    }
    if data_depth < schema_depth {
        return None;
    }

    let mut data_node = node;
    for _ in 0..(data_depth - schema_depth) {
        data_node = tree.nodes[data_node].parent?;
    }
    if tree.nodes[data_node].schema != schema {
        return None;
    }
    Some(data_node)
}

/// Terminal verdict of `when` evaluation. A false verdict carries the
/// ready-made `NoWhen` diagnostic for the driver to use when auto-deletion
/// is disabled.
#[derive(Debug, Clone)]
pub enum WhenVerdict {
    True,
    False(Diagnostic),
}

/// Evaluate every `when` condition relevant for a data node: its own, then
/// the conditions of enclosing uses/choice/case schema nodes and of the
/// augments that introduced them.
///
/// An `Unresolvable` verdict defers with the `InWhen` diagnostic.
pub fn resolve_when(
    ctx: &SchemaContext,
    tree: &DataTree,
    evaluator: &dyn XPathEvaluator,
    node: DataNodeId,
) -> ResolveResult<WhenVerdict> {
    let schema = tree.nodes[node].schema;

    let eval = |expr: &str, ctx_node: DataNodeId| -> ResolveResult<bool> {
        match evaluator.evaluate(ctx, tree, ctx_node, expr, XPathKind::When) {
            Ok(verdict) => Ok(verdict),
            Err(XPathError::Unresolvable) => Err(ResolveError::deferred(Diagnostic::error(
                DiagnosticCode::InWhen,
                format!("Irresolvable when condition \"{expr}\"."),
            ))),
            Err(XPathError::Internal) => Err(ResolveError::fatal(Diagnostic::internal(
                "xpath evaluation failed",
            ))),
        }
    };
    let false_when = |expr: &str| {
        Diagnostic::error(
            DiagnosticCode::NoWhen,
            format!("When condition \"{expr}\" not satisfied."),
        )
        .with_path(tree.data_path(ctx, node))
    };

    // the node's own when
    if let Some(when) = &ctx.nodes[schema].when {
        if !matches!(
            ctx.nodes[schema].kind,
            NodeKind::Notification { .. } | NodeKind::Rpc { .. } | NodeKind::Action { .. }
        ) && !eval(&when.condition, node)?
        {
            return Ok(WhenVerdict::False(false_when(&when.condition)));
        }
    }

    // conditions on schema-only ancestors that affect this node
    let mut cursor = schema;
    loop {
        if let Some(aug) = ctx.nodes[cursor].origin_augment {
            if let Some(when) = &ctx.nodes[aug].when {
                let ctx_node = resolve_when_ctx_node(ctx, tree, node, cursor)
                    .ok_or_else(|| {
                        ResolveError::fatal(Diagnostic::internal("when context node not found"))
                    })?;
                if !eval(&when.condition, ctx_node)? {
                    return Ok(WhenVerdict::False(false_when(&when.condition)));
                }
            }
        }

        let parent = match ctx.nodes[cursor].parent {
            Some(parent) => parent,
            None => break,
        };
        if !matches!(
            ctx.nodes[parent].kind,
            NodeKind::Uses { .. } | NodeKind::Choice { .. } | NodeKind::Case
        ) {
            break;
        }
        if let Some(when) = &ctx.nodes[parent].when {
            let ctx_node = resolve_when_ctx_node(ctx, tree, node, parent).ok_or_else(|| {
                ResolveError::fatal(Diagnostic::internal("when context node not found"))
            })?;
            if !eval(&when.condition, ctx_node)? {
                return Ok(WhenVerdict::False(false_when(&when.condition)));
            }
        }
        cursor = parent;
    }

    Ok(WhenVerdict::True)
}

/// Check all `must` constraints of a data node. A violated constraint is a
/// soft failure carrying the `error-app-tag`; the driver's diagnostic pass
/// reports it.
pub fn resolve_must(
    ctx: &SchemaContext,
    tree: &DataTree,
    evaluator: &dyn XPathEvaluator,
    node: DataNodeId,
) -> ResolveResult {
    let schema = tree.nodes[node].schema;
    for must in ctx.nodes[schema].musts() {
        let verdict = evaluator
            .evaluate(ctx, tree, node, &must.expr, XPathKind::Must)
            .map_err(|_| {
                ResolveError::fatal(Diagnostic::internal("xpath evaluation failed"))
            })?;
        if !verdict {
            let mut diagnostic = Diagnostic::error(
                DiagnosticCode::NoMust,
                format!("Must condition \"{}\" not satisfied.", must.expr),
            )
            .with_path(tree.data_path(ctx, node));
            if let Some(emsg) = &must.error_message {
                diagnostic = diagnostic.with_related(emsg.clone());
            }
            if let Some(tag) = &must.error_app_tag {
                diagnostic = diagnostic.with_app_tag(tag.clone());
            }
            return Err(ResolveError::deferred(diagnostic));
        }
    }
    Ok(())
}
