//! Fixpoint worklists and the schema/data resolution drivers.
//!
//! Schema resolution runs in rounds: round A resolves only `uses`
//! expansions and type derivations to a fixed point (expansion creates
//! fresh nodes with their own unresolved items), deviations are applied,
//! and round B resolves everything else. Diagnostics of soft failures are
//! suppressed during intermediate rounds; a final diagnostic pass re-runs
//! the leftovers with suppression lifted so the first unresolvable item
//! reports its true cause.
//!
//! Data resolution evaluates `when` conditions first (a false condition
//! marks its subtree for auto-deletion, cascading resolution of items
//! inside), then the remaining item kinds.

use bitflags::bitflags;
use tracing::{debug, info};

use yang_compiler_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollection};
use yang_compiler_schema::{
    DataNodeId, DataTree, FeatureId, IdentityId, ModuleId, NodeId, NodeKind, SchemaContext,
    TypeId, WhenStatus,
};

use crate::cond::{
    register_node_xpath, resolve_must, resolve_when, WhenVerdict, XPathEvaluator,
};
use crate::error::ResolveError;
use crate::{augment, deviation, feature, ident, instance, keys, leafref, lookup, type_resolution, uses};

bitflags! {
    /// Configuration of a data-time resolution batch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ResolveFlags: u8 {
        /// Keep non-presence containers emptied by a false `when`.
        const KEEP_EMPTY_CONTAINERS = 1 << 0;
        /// Steer instance-identifier resolution to the input side of rpcs.
        const RPC_INPUT = 1 << 1;
        /// Steer instance-identifier resolution to the output side of rpcs.
        const RPC_OUTPUT = 1 << 2;
        /// A false `when` is a hard error instead of an auto-deletion.
        const NO_AUTO_DEL = 1 << 3;
    }
}

/// Where an `if-feature` reference lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfFeatureTarget {
    Node(NodeId),
    Feature(FeatureId),
}

/// One unresolved schema-time item.
#[derive(Debug, Clone)]
pub enum SchemaItem {
    /// `base` of an identity.
    IdentBase {
        ident: IdentityId,
        base_name: String,
    },
    /// `base` of an identityref type.
    TypeIdentrefBase { type_id: TypeId },
    /// Leafref path of a type; `node` is the leaf carrying it, `None` for
    /// a top-level typedef.
    TypeLeafref {
        type_id: TypeId,
        node: Option<NodeId>,
    },
    /// Link a named type to its superior and validate restrictions.
    TypeDerivation {
        type_id: TypeId,
        node: Option<NodeId>,
    },
    /// One `if-feature` reference.
    IfFeature {
        target: IfFeatureTarget,
        index: usize,
    },
    /// Expand a `uses` once its grouping is complete.
    UsesExpand { uses: NodeId },
    /// Validate a default value against its (resolved) type.
    TypeDefaultCheck { type_id: TypeId, value: String },
    /// Resolve a choice's default case.
    ChoiceDefault { choice: NodeId },
    /// Resolve a list's `key` argument into leaf references.
    ListKeys { list: NodeId },
    /// Resolve one `unique` statement of a list.
    ListUnique { list: NodeId, index: usize },
    /// Resolve an augment target and splice.
    AugmentTarget { augment: NodeId },
    /// Register a node's `when`/`must` with the XPath collaborator.
    XPathRegister { node: NodeId },
}

impl SchemaItem {
    /// Whether the item belongs to the priority round (items whose
    /// resolution creates new schema nodes or types).
    fn is_round_a(&self) -> bool {
        matches!(
            self,
            Self::UsesExpand { .. } | Self::TypeDerivation { .. }
        )
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::IdentBase { .. } => "identity",
            Self::TypeIdentrefBase { .. } => "identityref",
            Self::TypeLeafref { .. } => "leafref",
            Self::TypeDerivation { .. } => "derived type",
            Self::IfFeature { .. } => "if-feature",
            Self::UsesExpand { .. } => "uses",
            Self::TypeDefaultCheck { .. } => "type default",
            Self::ChoiceDefault { .. } => "choice default",
            Self::ListKeys { .. } => "list keys",
            Self::ListUnique { .. } => "list unique",
            Self::AugmentTarget { .. } => "augment target",
            Self::XPathRegister { .. } => "xpath registration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemState {
    Pending,
    Resolved,
}

#[derive(Debug)]
pub struct SchemaEntry {
    pub item: SchemaItem,
    pub module: ModuleId,
    state: ItemState,
}

/// Append-mostly schema worklist; entries carry a resolved mark instead of
/// being removed, so enqueue order (and with it diagnostic order) is
/// stable.
#[derive(Debug, Default)]
pub struct UnresSchema {
    items: Vec<SchemaEntry>,
}

impl UnresSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue without an immediate resolution attempt (parser-collaborator
    /// surface).
    pub fn add(&mut self, module: ModuleId, item: SchemaItem) {
        self.items.push(SchemaEntry {
            item,
            module,
            state: ItemState::Pending,
        });
    }

    pub fn pending_count(&self) -> usize {
        self.items
            .iter()
            .filter(|e| e.state == ItemState::Pending)
            .count()
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.pending_count() == 0
    }
}

/// Enqueue an item created during resolution, attempting to resolve it
/// right away; only soft failures are stored. Fatal failures propagate.
pub(crate) fn add_schema_item(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
    item: SchemaItem,
) -> Result<(), ResolveError> {
    // registrations need the XPath collaborator, only the driver holds it
    if matches!(item, SchemaItem::XPathRegister { .. }) {
        unres.add(module, item);
        return Ok(());
    }

    match resolve_schema_item(ctx, unres, module, &item) {
        Ok(()) => Ok(()),
        Err(ResolveError::Deferred(_)) => {
            debug!(
                kind = item.kind_name(),
                "resolving failed, it will be attempted later"
            );
            unres.add(module, item);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Resolve a single schema item. `XPathRegister` is handled by the driver,
/// which owns the collaborator.
fn resolve_schema_item(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
    item: &SchemaItem,
) -> Result<(), ResolveError> {
    match item {
        SchemaItem::IdentBase { ident, base_name } => {
            ident::resolve_identity_base(ctx, module, *ident, base_name)
        }
        SchemaItem::TypeIdentrefBase { type_id } => {
            ident::resolve_identref_base(ctx, module, *type_id)
        }
        SchemaItem::TypeLeafref { type_id, node } => {
            leafref::resolve_schema_leafref(ctx, *type_id, *node)
        }
        SchemaItem::TypeDerivation { type_id, node } => {
            type_resolution::resolve_type_derivation(ctx, unres, module, *type_id, *node)
        }
        SchemaItem::IfFeature { target, index } => {
            resolve_if_feature(ctx, module, *target, *index)
        }
        SchemaItem::UsesExpand { uses } => uses::resolve_unres_schema_uses(ctx, unres, *uses),
        SchemaItem::TypeDefaultCheck { type_id, value } => {
            type_resolution::check_default(ctx, *type_id, value)
        }
        SchemaItem::ChoiceDefault { choice } => resolve_choice_default(ctx, *choice),
        SchemaItem::ListKeys { list } => keys::resolve_list_keys(ctx, *list),
        SchemaItem::ListUnique { list, index } => keys::resolve_unique(ctx, *list, *index),
        SchemaItem::AugmentTarget { augment } => {
            augment::resolve_augment(ctx, unres, *augment, None)
        }
        SchemaItem::XPathRegister { .. } => Err(ResolveError::fatal(Diagnostic::internal(
            "xpath registration outside the driver",
        ))),
    }
}

fn resolve_if_feature(
    ctx: &mut SchemaContext,
    module: ModuleId,
    target: IfFeatureTarget,
    index: usize,
) -> Result<(), ResolveError> {
    let (name, flags, referring) = match target {
        IfFeatureTarget::Node(node) => {
            let record = ctx.nodes[node]
                .if_features
                .get(index)
                .ok_or_else(|| {
                    ResolveError::fatal(Diagnostic::internal("if-feature index out of range"))
                })?;
            (
                record.name.clone(),
                ctx.nodes[node].flags,
                ctx.str(ctx.nodes[node].name).to_string(),
            )
        }
        IfFeatureTarget::Feature(feat) => {
            let record = ctx.features[feat].if_features.get(index).ok_or_else(|| {
                ResolveError::fatal(Diagnostic::internal("if-feature index out of range"))
            })?;
            (
                record.name.clone(),
                ctx.features[feat].flags,
                ctx.str(ctx.features[feat].name).to_string(),
            )
        }
    };

    let resolved = feature::resolve_feature(ctx, &name, module, flags, &referring)?;

    match target {
        IfFeatureTarget::Node(node) => {
            ctx.nodes[node].if_features[index].feature = Some(resolved);
        }
        IfFeatureTarget::Feature(feat) => {
            ctx.features[feat].if_features[index].feature = Some(resolved);
        }
    }
    Ok(())
}

fn resolve_choice_default(ctx: &mut SchemaContext, choice: NodeId) -> Result<(), ResolveError> {
    let name = match &ctx.nodes[choice].kind {
        NodeKind::Choice {
            default_name: Some(name),
            ..
        } => name.clone(),
        NodeKind::Choice { .. } => return Ok(()),
        _ => {
            return Err(ResolveError::fatal(Diagnostic::internal(
                "choice default on non-choice",
            )))
        }
    };

    match lookup::resolve_choice_dflt(ctx, choice, &name) {
        Some(case) => {
            if let NodeKind::Choice { default, .. } = &mut ctx.nodes[choice].kind {
                *default = Some(case);
            }
            Ok(())
        }
        None => Err(ResolveError::deferred(Diagnostic::unresolved(
            "choice default",
            &name,
        ))),
    }
}

/// Prime the grouping gates: count every pending `uses` that sits inside a
/// grouping in that grouping's pending-uses counter, so a grouping can
/// never be instantiated before its own `uses` are expanded, regardless of
/// worklist order. The counters drain as the `uses` resolve.
fn prime_uses_counters(ctx: &mut SchemaContext, unres: &UnresSchema) {
    for entry in &unres.items {
        let uses = match (&entry.item, entry.state) {
            (SchemaItem::UsesExpand { uses }, ItemState::Pending) => *uses,
            _ => continue,
        };
        if ctx.nodes[uses]
            .flags
            .contains(yang_compiler_schema::NodeFlags::USES_PENDING)
        {
            continue;
        }
        let mut cursor = ctx.nodes[uses].parent;
        while let Some(cur) = cursor {
            if let NodeKind::Grouping { pending_uses, .. } = &mut ctx.nodes[cur].kind {
                *pending_uses += 1;
                ctx.nodes[uses].flags |= yang_compiler_schema::NodeFlags::USES_PENDING;
                break;
            }
            cursor = ctx.nodes[cur].parent;
        }
    }
}

/// Round A: resolve `uses` expansions and type derivations to a fixed
/// point. Repeats rounds while partial progress is made; no progress with
/// pending items is a hard failure.
fn schema_round_a(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    diagnostics: &mut DiagnosticCollection,
) -> Result<(), ()> {
    loop {
        let mut unres_count = 0usize;
        let mut res_count = 0usize;

        let mut i = 0;
        while i < unres.items.len() {
            let eligible = unres.items[i].state == ItemState::Pending
                && unres.items[i].item.is_round_a();
            if eligible {
                unres_count += 1;
                let item = unres.items[i].item.clone();
                let module = unres.items[i].module;
                match resolve_schema_item(ctx, unres, module, &item) {
                    Ok(()) => {
                        unres.items[i].state = ItemState::Resolved;
                        res_count += 1;
                    }
                    Err(ResolveError::Deferred(_)) => {
                        debug!(
                            kind = item.kind_name(),
                            "resolving failed, it will be attempted later"
                        );
                    }
                    Err(ResolveError::Fatal(d)) => {
                        diagnostics.add(d);
                        return Err(());
                    }
                }
            }
            i += 1;
        }

        if unres_count == res_count {
            return Ok(());
        }
        if res_count == 0 {
            // stuck: re-run the leftovers with diagnostics unsuppressed
            let mut i = 0;
            while i < unres.items.len() {
                let eligible = unres.items[i].state == ItemState::Pending
                    && unres.items[i].item.is_round_a();
                if eligible {
                    let item = unres.items[i].item.clone();
                    let module = unres.items[i].module;
                    if let Err(e) = resolve_schema_item(ctx, unres, module, &item) {
                        diagnostics.add(e.into_diagnostic());
                    }
                }
                i += 1;
            }
            return Err(());
        }
    }
}

/// Round B: everything else, iterated while progress is made, followed by
/// the diagnostic pass for leftovers.
fn schema_round_b(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    evaluator: &mut dyn XPathEvaluator,
    diagnostics: &mut DiagnosticCollection,
) -> Result<(), ()> {
    loop {
        let mut progress = false;

        let mut i = 0;
        while i < unres.items.len() {
            if unres.items[i].state == ItemState::Pending {
                let item = unres.items[i].item.clone();
                let module = unres.items[i].module;
                let outcome = match &item {
                    SchemaItem::XPathRegister { node } => {
                        register_node_xpath(ctx, *node, evaluator);
                        Ok(())
                    }
                    other => resolve_schema_item(ctx, unres, module, other),
                };
                match outcome {
                    Ok(()) => {
                        unres.items[i].state = ItemState::Resolved;
                        progress = true;
                    }
                    Err(ResolveError::Deferred(_)) => {
                        debug!(
                            kind = item.kind_name(),
                            "resolving failed, it will be attempted later"
                        );
                    }
                    Err(ResolveError::Fatal(d)) => {
                        diagnostics.add(d);
                        return Err(());
                    }
                }
            }
            i += 1;
        }

        if unres.is_fully_resolved() {
            return Ok(());
        }
        if !progress {
            break;
        }
    }

    // diagnostic pass: re-run the leftovers so the first unresolvable item
    // prints its true cause
    let mut i = 0;
    while i < unres.items.len() {
        if unres.items[i].state == ItemState::Pending {
            let item = unres.items[i].item.clone();
            let module = unres.items[i].module;
            if let Err(e) = resolve_schema_item(ctx, unres, module, &item) {
                diagnostics.add(e.into_diagnostic());
            }
        }
        i += 1;
    }
    Err(())
}

/// Drive the schema worklist to a fixed point: round A (uses expansion,
/// type derivations), deviations, another round A for deviation-created
/// derivations, then round B.
pub fn resolve_unres_schema(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    evaluator: &mut dyn XPathEvaluator,
    diagnostics: &mut DiagnosticCollection,
) -> Result<(), ()> {
    info!("resolving unresolved schema nodes and their constraints");

    prime_uses_counters(ctx, unres);
    schema_round_a(ctx, unres, diagnostics)?;

    // deviations are applied once every node they may target exists
    for module in (0..ctx.modules.len()).map(ModuleId::new) {
        if ctx.modules[module].deviations.is_empty() {
            continue;
        }
        if let Err(e) = deviation::apply_module_deviations(ctx, unres, module) {
            diagnostics.add(e.into_diagnostic());
            return Err(());
        }
    }
    // a deviate replace may have enqueued new type derivations
    schema_round_a(ctx, unres, diagnostics)?;

    schema_round_b(ctx, unres, evaluator, diagnostics)?;

    info!("all schema nodes and constraints resolved");
    Ok(())
}

// ---------------------------------------------------------------------------
// data worklist
// ---------------------------------------------------------------------------

/// One unresolved data-time item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataItem {
    Leafref,
    InstanceId,
    WhenEval,
    MustEval,
    EmptyNpContainerPrune,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataState {
    Pending,
    Resolved,
    /// Unlinked by a false `when`; the subtree is freed after phase 1.
    Delete,
}

#[derive(Debug)]
pub struct DataEntry {
    pub node: DataNodeId,
    pub item: DataItem,
    state: DataState,
}

/// Data-time worklist.
#[derive(Debug, Default)]
pub struct UnresData {
    items: Vec<DataEntry>,
}

impl UnresData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tree: &mut DataTree, node: DataNodeId, item: DataItem) {
        if item == DataItem::WhenEval {
            // remove any previous result
            tree.nodes[node].when_status = WhenStatus::Pending;
        }
        self.items.push(DataEntry {
            node,
            item,
            state: DataState::Pending,
        });
    }

    pub fn pending_count(&self) -> usize {
        self.items
            .iter()
            .filter(|e| e.state == DataState::Pending)
            .count()
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.pending_count() == 0
    }
}

/// Resolve one non-`when` data item.
fn resolve_data_item(
    ctx: &SchemaContext,
    tree: &mut DataTree,
    evaluator: &dyn XPathEvaluator,
    options: ResolveFlags,
    node: DataNodeId,
    item: DataItem,
) -> Result<(), ResolveError> {
    match item {
        DataItem::Leafref => leafref::resolve_data_leafref(ctx, tree, node),
        DataItem::InstanceId => resolve_data_instid(ctx, tree, options, node),
        DataItem::MustEval => resolve_must(ctx, tree, evaluator, node),
        DataItem::EmptyNpContainerPrune => {
            prune_empty_containers(ctx, tree, node);
            Ok(())
        }
        DataItem::WhenEval => Err(ResolveError::fatal(Diagnostic::internal(
            "when evaluation outside phase 1",
        ))),
    }
}

fn resolve_data_instid(
    ctx: &SchemaContext,
    tree: &mut DataTree,
    options: ResolveFlags,
    node: DataNodeId,
) -> Result<(), ResolveError> {
    let schema = tree.nodes[node].schema;
    let type_id = ctx.nodes[schema].type_id().ok_or_else(|| {
        ResolveError::fatal(Diagnostic::internal("instance-identifier on a non-leaf"))
    })?;
    let require = ctx.types[type_id].require_instance.unwrap_or(true);
    let value = tree.nodes[node].value.clone().unwrap_or_default();

    match instance::resolve_instid(ctx, tree, &value, options).map_err(ResolveError::fatal)? {
        Some(target) => {
            tree.nodes[node].instance = Some(target);
            Ok(())
        }
        None if require => Err(ResolveError::deferred(Diagnostic::error(
            DiagnosticCode::NoRequiredInstance,
            format!("Required instance of \"{value}\" does not exists."),
        ))),
        None => {
            debug!(path = %value, "no instance exists, but it is not required");
            Ok(())
        }
    }
}

/// Remove an emptied non-presence container and every ancestor container
/// the removal empties in turn.
fn prune_empty_containers(ctx: &SchemaContext, tree: &mut DataTree, node: DataNodeId) {
    let mut cursor = Some(node);
    while let Some(cur) = cursor {
        let parent = tree.nodes[cur].parent;
        tree.unlink(cur);
        tree.free_subtree(cur);

        cursor = parent.filter(|&p| {
            tree.nodes[p].children.is_empty()
                && matches!(
                    ctx.nodes[tree.nodes[p].schema].kind,
                    NodeKind::Container { presence: None, .. }
                )
        });
    }
}

/// Phase 1: `when` evaluation with auto-deletion.
fn data_phase_when(
    ctx: &SchemaContext,
    tree: &mut DataTree,
    unres: &mut UnresData,
    evaluator: &dyn XPathEvaluator,
    options: ResolveFlags,
    diagnostics: &mut DiagnosticCollection,
) -> Result<(), ()> {
    let mut progress = true;
    while progress {
        progress = false;

        for i in 0..unres.items.len() {
            if unres.items[i].state != DataState::Pending
                || unres.items[i].item != DataItem::WhenEval
            {
                continue;
            }
            let node = unres.items[i].node;

            // evaluate only after every ancestor when is terminal
            let mut blocked = false;
            let mut doomed = false;
            let mut cursor = tree.nodes[node].parent;
            while let Some(p) = cursor {
                match tree.nodes[p].when_status {
                    WhenStatus::Pending => {
                        blocked = true;
                        break;
                    }
                    WhenStatus::False => {
                        // ancestor subtree is marked for deletion
                        doomed = true;
                        break;
                    }
                    WhenStatus::True => {}
                }
                cursor = tree.nodes[p].parent;
            }
            if doomed {
                tree.nodes[node].when_status = WhenStatus::False;
                unres.items[i].state = DataState::Resolved;
                progress = true;
                continue;
            }
            if blocked {
                continue;
            }

            match resolve_when(ctx, tree, evaluator, node) {
                Ok(WhenVerdict::True) => {
                    tree.nodes[node].when_status = WhenStatus::True;
                    unres.items[i].state = DataState::Resolved;
                    progress = true;
                }
                Ok(WhenVerdict::False(diag)) => {
                    tree.nodes[node].when_status = WhenStatus::False;

                    if options.contains(ResolveFlags::NO_AUTO_DEL) {
                        diagnostics.add(diag);
                        return Err(());
                    }

                    // prune enclosing non-presence containers emptied by
                    // the deletion
                    let mut target = node;
                    if !options.contains(ResolveFlags::KEEP_EMPTY_CONTAINERS) {
                        while let Some(p) = tree.nodes[target].parent {
                            let np_container = matches!(
                                ctx.nodes[tree.nodes[p].schema].kind,
                                NodeKind::Container { presence: None, .. }
                            );
                            if np_container && tree.nodes[p].children.len() == 1 {
                                target = p;
                            } else {
                                break;
                            }
                        }
                    }

                    debug!(
                        path = %tree.data_path(ctx, target),
                        "auto-delete node due to when condition"
                    );
                    tree.unlink(target);
                    unres.items[i].node = target;
                    unres.items[i].state = DataState::Delete;

                    // cascade: everything anchored inside the deleted
                    // subtree is resolved
                    for j in 0..unres.items.len() {
                        if j != i
                            && unres.items[j].state == DataState::Pending
                            && tree.is_in_subtree(unres.items[j].node, target)
                        {
                            if unres.items[j].item == DataItem::WhenEval {
                                tree.nodes[unres.items[j].node].when_status = WhenStatus::False;
                            }
                            unres.items[j].state = DataState::Resolved;
                        }
                    }
                    progress = true;
                }
                Err(ResolveError::Deferred(_)) => {}
                Err(ResolveError::Fatal(d)) => {
                    diagnostics.add(d);
                    return Err(());
                }
            }
        }
    }

    // unresolved when conditions remain: emit their true causes
    let mut failed = false;
    for i in 0..unres.items.len() {
        if unres.items[i].state == DataState::Pending
            && unres.items[i].item == DataItem::WhenEval
        {
            failed = true;
            match resolve_when(ctx, tree, evaluator, unres.items[i].node) {
                Err(e) => diagnostics.add(e.into_diagnostic()),
                Ok(_) => diagnostics.add(Diagnostic::error(
                    DiagnosticCode::InWhen,
                    "Irresolvable when condition.".to_string(),
                )),
            }
        }
    }
    if failed {
        return Err(());
    }

    // physically remove the unlinked subtrees
    for i in 0..unres.items.len() {
        if unres.items[i].state == DataState::Delete {
            tree.free_subtree(unres.items[i].node);
            unres.items[i].state = DataState::Resolved;
        }
    }

    Ok(())
}

/// Drive the data worklist: phase 1 evaluates `when` conditions (with
/// auto-deletion and cascade), phase 2 resolves leafrefs,
/// instance-identifiers, musts and container prunes.
pub fn resolve_unres_data(
    ctx: &SchemaContext,
    tree: &mut DataTree,
    unres: &mut UnresData,
    evaluator: &dyn XPathEvaluator,
    options: ResolveFlags,
    diagnostics: &mut DiagnosticCollection,
) -> Result<(), ()> {
    if unres.items.is_empty() {
        return Ok(());
    }
    info!("resolving unresolved data nodes and their constraints");

    data_phase_when(ctx, tree, unres, evaluator, options, diagnostics)?;

    // phase 2
    loop {
        let mut progress = false;
        for i in 0..unres.items.len() {
            if unres.items[i].state != DataState::Pending {
                continue;
            }
            let node = unres.items[i].node;
            let item = unres.items[i].item;
            match resolve_data_item(ctx, tree, evaluator, options, node, item) {
                Ok(()) => {
                    unres.items[i].state = DataState::Resolved;
                    progress = true;
                }
                Err(ResolveError::Deferred(_)) => {}
                Err(ResolveError::Fatal(d)) => {
                    diagnostics.add(d);
                    return Err(());
                }
            }
        }

        if unres.is_fully_resolved() {
            info!("all data nodes and constraints resolved");
            return Ok(());
        }
        if !progress {
            break;
        }
    }

    // diagnostic pass
    for i in 0..unres.items.len() {
        if unres.items[i].state == DataState::Pending {
            let node = unres.items[i].node;
            let item = unres.items[i].item;
            if let Err(e) = resolve_data_item(ctx, tree, evaluator, options, node, item) {
                diagnostics.add(e.into_diagnostic());
            }
        }
    }
    Err(())
}
