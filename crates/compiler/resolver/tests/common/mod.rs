//! Shared helpers for resolver integration tests: a programmatic schema
//! builder standing in for the parser collaborator, and a table-driven
//! XPath stub standing in for the evaluation engine.

#![allow(dead_code)]

use std::collections::HashMap;

use yang_compiler_diagnostics::DiagnosticCollection;
use yang_compiler_resolver::cond::{XPathError, XPathEvaluator, XPathKind};
use yang_compiler_resolver::unres::{SchemaItem, UnresSchema};
use yang_compiler_resolver::resolve_unres_schema;
use yang_compiler_schema::{
    DataNodeId, DataTree, IdentityId, Import, Module, ModuleId, NodeFlags, NodeId, NodeKind,
    Identity, SchemaContext, SchemaNode, TypeSpec, When,
};

pub fn context() -> SchemaContext {
    SchemaContext::new()
}

pub fn module(ctx: &mut SchemaContext, name: &str, prefix: &str) -> ModuleId {
    let name = ctx.intern(name);
    let prefix = ctx.intern(prefix);
    ctx.add_module(Module::new(name, prefix))
}

pub fn import(ctx: &mut SchemaContext, from: ModuleId, to: ModuleId, prefix: &str) {
    let prefix = ctx.intern(prefix);
    ctx.modules[from].imports.push(Import { module: to, prefix });
}

fn attach(
    ctx: &mut SchemaContext,
    module: ModuleId,
    parent: Option<NodeId>,
    name: &str,
    kind: NodeKind,
) -> NodeId {
    let sym = ctx.intern(name);
    let mut node = SchemaNode::new(sym, module, kind);
    // config true is the YANG default
    node.flags |= NodeFlags::CONFIG_W;
    let id = ctx.add_node(node);
    match parent {
        Some(parent) => ctx.add_child(parent, id),
        None => ctx.modules[module].data.push(id),
    }
    id
}

pub fn container(
    ctx: &mut SchemaContext,
    module: ModuleId,
    parent: Option<NodeId>,
    name: &str,
) -> NodeId {
    attach(
        ctx,
        module,
        parent,
        name,
        NodeKind::Container {
            presence: None,
            musts: Vec::new(),
            typedefs: Vec::new(),
        },
    )
}

pub fn string_type() -> TypeSpec {
    TypeSpec::named(None, "string")
}

pub fn named_type(name: &str) -> TypeSpec {
    TypeSpec::named(None, name)
}

/// A leaf with its type enqueued for derivation.
pub fn leaf(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
    parent: Option<NodeId>,
    name: &str,
    spec: TypeSpec,
) -> NodeId {
    let type_id = ctx.add_type(spec);
    let id = attach(
        ctx,
        module,
        parent,
        name,
        NodeKind::Leaf {
            type_id,
            default: None,
            units: None,
            musts: Vec::new(),
        },
    );
    ctx.types[type_id].parent_node = Some(id);
    unres.add(
        module,
        SchemaItem::TypeDerivation {
            type_id,
            node: Some(id),
        },
    );
    id
}

pub fn list(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
    parent: Option<NodeId>,
    name: &str,
    keys: &str,
) -> NodeId {
    let id = attach(
        ctx,
        module,
        parent,
        name,
        NodeKind::List {
            key_names: Some(keys.to_string()),
            keys: Vec::new(),
            uniques: Vec::new(),
            musts: Vec::new(),
            typedefs: Vec::new(),
            min_elements: 0,
            max_elements: 0,
        },
    );
    unres.add(module, SchemaItem::ListKeys { list: id });
    id
}

pub fn choice(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
    parent: Option<NodeId>,
    name: &str,
    default: Option<&str>,
) -> NodeId {
    let id = attach(
        ctx,
        module,
        parent,
        name,
        NodeKind::Choice {
            default_name: default.map(str::to_string),
            default: None,
        },
    );
    if default.is_some() {
        unres.add(module, SchemaItem::ChoiceDefault { choice: id });
    }
    id
}

pub fn grouping(
    ctx: &mut SchemaContext,
    module: ModuleId,
    parent: Option<NodeId>,
    name: &str,
) -> NodeId {
    let sym = ctx.intern(name);
    let node = SchemaNode::new(
        sym,
        module,
        NodeKind::Grouping {
            typedefs: Vec::new(),
            pending_uses: 0,
        },
    );
    let id = ctx.add_node(node);
    match parent {
        Some(parent) => ctx.add_child(parent, id),
        None => ctx.modules[module].groupings.push(id),
    }
    id
}

pub fn uses(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
    parent: Option<NodeId>,
    grouping_name: &str,
) -> NodeId {
    let id = attach(
        ctx,
        module,
        parent,
        grouping_name,
        NodeKind::Uses {
            grouping_name: grouping_name.to_string(),
            grouping: None,
            refines: Vec::new(),
            augments: Vec::new(),
        },
    );
    unres.add(module, SchemaItem::UsesExpand { uses: id });
    id
}

/// A module-level augment; children are attached with the augment node as
/// parent.
pub fn augment(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
    target: &str,
) -> NodeId {
    let sym = ctx.intern(target);
    let node = SchemaNode::new(
        sym,
        module,
        NodeKind::Augment {
            target_name: target.to_string(),
            target: None,
        },
    );
    let id = ctx.add_node(node);
    ctx.modules[module].augments.push(id);
    unres.add(module, SchemaItem::AugmentTarget { augment: id });
    id
}

pub fn identity(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
    name: &str,
    base: Option<&str>,
) -> IdentityId {
    let sym = ctx.intern(name);
    let mut record = Identity::new(sym, module);
    if let Some(base) = base {
        record.base_names.push(base.to_string());
    }
    let id = ctx.add_identity(record);
    ctx.modules[module].identities.push(id);
    if let Some(base) = base {
        unres.add(
            module,
            SchemaItem::IdentBase {
                ident: id,
                base_name: base.to_string(),
            },
        );
    }
    id
}

pub fn set_when(ctx: &mut SchemaContext, node: NodeId, condition: &str) {
    ctx.nodes[node].when = Some(When::new(condition));
}

pub fn find_type(ctx: &SchemaContext, node: NodeId) -> yang_compiler_schema::TypeId {
    ctx.nodes[node].type_id().expect("node carries a type")
}

/// Table-driven XPath stub: expressions resolve through a verdict map;
/// unknown expressions are unresolvable.
#[derive(Default)]
pub struct StubXPath {
    pub verdicts: HashMap<String, bool>,
    pub registered: Vec<(NodeId, String)>,
}

impl StubXPath {
    pub fn new(pairs: &[(&str, bool)]) -> Self {
        Self {
            verdicts: pairs
                .iter()
                .map(|(expr, verdict)| (expr.to_string(), *verdict))
                .collect(),
            registered: Vec::new(),
        }
    }
}

impl XPathEvaluator for StubXPath {
    fn register(&mut self, node: NodeId, expr: &str, _kind: XPathKind) {
        self.registered.push((node, expr.to_string()));
    }

    fn evaluate(
        &self,
        _ctx: &SchemaContext,
        _tree: &DataTree,
        _node: DataNodeId,
        expr: &str,
        _kind: XPathKind,
    ) -> Result<bool, XPathError> {
        self.verdicts
            .get(expr)
            .copied()
            .ok_or(XPathError::Unresolvable)
    }
}

/// Run a schema batch, returning the outcome and the diagnostics.
pub fn resolve_schema(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
) -> (Result<(), ()>, DiagnosticCollection) {
    let mut evaluator = StubXPath::default();
    let mut diagnostics = DiagnosticCollection::new();
    let result = resolve_unres_schema(ctx, unres, &mut evaluator, &mut diagnostics);
    (result, diagnostics)
}
