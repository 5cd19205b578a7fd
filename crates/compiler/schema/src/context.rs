//! The schema context: arena owner and module-lookup collaborator.
//!
//! All schema objects live in `IndexVec` arenas owned by [`SchemaContext`];
//! every cross-link in the model is an index into one of them. The context
//! also implements the module-lookup surface the resolver depends on:
//! module-by-name, prefix-to-module resolution and main-module resolution
//! through submodules.

use bitflags::bitflags;
use index_vec::IndexVec;
use rustc_hash::FxHashMap;

use crate::ids::{FeatureId, IdentityId, ModuleId, NodeId, TypeId, TypedefId};
use crate::interner::{Interner, Symbol};
use crate::module::{Feature, Identity, Module};
use crate::node::{NodeKind, SchemaNode};
use crate::types::{TypeSpec, Typedef};

bitflags! {
    /// Options steering visible-sibling traversal.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GetNext: u8 {
        /// Yield `choice` nodes instead of descending into them.
        const WITH_CHOICE = 1 << 0;
        /// Yield `case` nodes instead of descending into them.
        const WITH_CASE = 1 << 1;
        /// Yield `input`/`output` nodes instead of descending into them.
        const WITH_INOUT = 1 << 2;
        /// Yield `grouping` nodes (otherwise skipped entirely).
        const WITH_GROUPING = 1 << 3;
    }
}

/// Arena owner for the whole schema model.
#[derive(Debug, Default)]
pub struct SchemaContext {
    pub interner: Interner,
    pub modules: IndexVec<ModuleId, Module>,
    pub nodes: IndexVec<NodeId, SchemaNode>,
    pub types: IndexVec<TypeId, TypeSpec>,
    pub typedefs: IndexVec<TypedefId, Typedef>,
    pub identities: IndexVec<IdentityId, Identity>,
    pub features: IndexVec<FeatureId, Feature>,
    /// Reverse leafref index: target leaf to the leaves whose type targets
    /// it. Used by data validators for integrity checks.
    pub leafref_backlinks: FxHashMap<NodeId, Vec<NodeId>>,
}

impl SchemaContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        self.interner.intern(s)
    }

    pub fn str(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    pub fn add_module(&mut self, module: Module) -> ModuleId {
        self.modules.push(module)
    }

    pub fn add_node(&mut self, node: SchemaNode) -> NodeId {
        self.nodes.push(node)
    }

    /// Append `child` to `parent`'s child list and set its parent link.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    pub fn add_type(&mut self, spec: TypeSpec) -> TypeId {
        self.types.push(spec)
    }

    pub fn add_typedef(&mut self, tpdf: Typedef) -> TypedefId {
        self.typedefs.push(tpdf)
    }

    pub fn add_identity(&mut self, ident: Identity) -> IdentityId {
        self.identities.push(ident)
    }

    pub fn add_feature(&mut self, feature: Feature) -> FeatureId {
        self.features.push(feature)
    }

    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id]
    }

    pub fn node_name(&self, id: NodeId) -> &str {
        self.str(self.nodes[id].name)
    }

    /// Find a module by name in the whole context.
    pub fn module_by_name(&self, name: &str) -> Option<ModuleId> {
        self.modules
            .iter_enumerated()
            .find(|(_, m)| self.str(m.name) == name)
            .map(|(id, _)| id)
    }

    /// Find a module by namespace in the whole context.
    pub fn module_by_namespace(&self, namespace: &str) -> Option<ModuleId> {
        self.modules
            .iter_enumerated()
            .find(|(_, m)| m.namespace.as_deref() == Some(namespace))
            .map(|(id, _)| id)
    }

    /// Main module of `module`, resolving a submodule's `belongs-to`.
    pub fn main_module(&self, module: ModuleId) -> ModuleId {
        match self.modules[module].belongs_to {
            Some(main) => self.main_module(main),
            None => module,
        }
    }

    /// Main module owning a schema node.
    pub fn node_module(&self, node: NodeId) -> ModuleId {
        self.main_module(self.nodes[node].module)
    }

    /// Resolve a module-name reference appearing in a path inside `from`.
    ///
    /// `None` and the module's own name map to the main module of `from`;
    /// other names are searched among the imports (by import prefix or by
    /// imported module name). Returns `None` for unknown references.
    pub fn resolve_reference_module(&self, from: ModuleId, name: Option<&str>) -> Option<ModuleId> {
        let main = self.main_module(from);
        let name = match name {
            None => return Some(main),
            Some(name) => name,
        };

        let main_mod = &self.modules[main];
        if self.str(main_mod.name) == name || self.str(main_mod.prefix) == name {
            return Some(main);
        }
        // a submodule may be referenced by its own name as well
        let from_mod = &self.modules[from];
        if from != main && self.str(from_mod.name) == name {
            return Some(main);
        }

        for import in main_mod.imports.iter().chain(
            main_mod
                .includes
                .iter()
                .flat_map(|&inc| self.modules[inc].imports.iter()),
        ) {
            if self.str(import.prefix) == name
                || self.str(self.modules[import.module].name) == name
            {
                return Some(import.module);
            }
        }
        None
    }

    /// Children visible under `parent` (or at the top level of `module`),
    /// flattening `uses` expansions and, depending on `opts`, choices,
    /// cases and rpc input/output wrappers.
    pub fn visible_children(
        &self,
        parent: Option<NodeId>,
        module: ModuleId,
        opts: GetNext,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        match parent {
            Some(parent) => {
                let raw = self.nodes[parent].children.clone();
                self.collect_visible(&raw, opts, &mut out);
            }
            None => {
                let main = self.main_module(module);
                let mut raw: Vec<NodeId> = self.modules[main].data.clone();
                for &inc in &self.modules[main].includes {
                    raw.extend_from_slice(&self.modules[inc].data);
                }
                if opts.contains(GetNext::WITH_GROUPING) {
                    raw.extend_from_slice(&self.modules[main].groupings);
                    for &inc in &self.modules[main].includes {
                        raw.extend_from_slice(&self.modules[inc].groupings);
                    }
                }
                self.collect_visible(&raw, opts, &mut out);
            }
        }
        out
    }

    fn collect_visible(&self, raw: &[NodeId], opts: GetNext, out: &mut Vec<NodeId>) {
        for &id in raw {
            let node = &self.nodes[id];
            match node.kind {
                NodeKind::Uses { .. } => self.collect_visible(&node.children, opts, out),
                NodeKind::Choice { .. } => {
                    if opts.contains(GetNext::WITH_CHOICE) {
                        out.push(id);
                    } else {
                        self.collect_visible(&node.children, opts, out);
                    }
                }
                NodeKind::Case => {
                    if opts.contains(GetNext::WITH_CASE) {
                        out.push(id);
                    } else {
                        self.collect_visible(&node.children, opts, out);
                    }
                }
                NodeKind::Input { .. } | NodeKind::Output { .. } => {
                    if opts.contains(GetNext::WITH_INOUT) {
                        out.push(id);
                    } else {
                        self.collect_visible(&node.children, opts, out);
                    }
                }
                NodeKind::Grouping { .. } => {
                    if opts.contains(GetNext::WITH_GROUPING) {
                        out.push(id);
                    }
                }
                NodeKind::Augment { .. } => {}
                _ => out.push(id),
            }
        }
    }

    /// Render the schema path of a node, `/mod:a/b` style. The module name
    /// is printed on the first segment and wherever the owning module
    /// changes.
    pub fn schema_path(&self, node: NodeId) -> String {
        let mut segments = Vec::new();
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            let n = &self.nodes[id];
            if !matches!(n.kind, NodeKind::Uses { .. } | NodeKind::Augment { .. }) {
                segments.push(id);
            }
            cursor = n.parent;
        }
        segments.reverse();

        let mut path = String::new();
        let mut prev_module = None;
        for id in segments {
            let n = &self.nodes[id];
            let module = self.main_module(n.module);
            path.push('/');
            if prev_module != Some(module) {
                path.push_str(self.str(self.modules[module].name));
                path.push(':');
            }
            path.push_str(self.str(n.name));
            prev_module = Some(module);
        }
        path
    }

    /// Record a leafref back-reference on its target.
    pub fn add_leafref_backlink(&mut self, target: NodeId, referring: NodeId) {
        let entry = self.leafref_backlinks.entry(target).or_default();
        if !entry.contains(&referring) {
            entry.push(referring);
        }
    }
}
