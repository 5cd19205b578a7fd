//! Instance-data tree used by data-time resolution.
//!
//! The data tree mirrors the schema arenas: nodes live in one `IndexVec`
//! and link by [`DataNodeId`]. Unlinking detaches a subtree from its parent
//! (or the root list) without destroying records; `free_subtree` then marks
//! the records deleted so pending worklist items anchored inside can be
//! cascaded.

use index_vec::IndexVec;

use crate::context::SchemaContext;
use crate::ids::{DataNodeId, NodeId};
use crate::node::NodeKind;

/// Tri-state result of `when` evaluation on a data node. Nodes without any
/// applicable `when` stay `True` (the terminal default); enqueueing a
/// when-evaluation item resets the node to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhenStatus {
    /// Queued for evaluation.
    Pending,
    #[default]
    True,
    False,
}

impl WhenStatus {
    /// Whether evaluation reached a terminal state.
    pub fn is_done(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// An instance-data node.
#[derive(Debug, Clone)]
pub struct DataNode {
    pub schema: NodeId,
    pub parent: Option<DataNodeId>,
    pub children: Vec<DataNodeId>,
    /// Canonical string value of a leaf/leaf-list instance.
    pub value: Option<String>,
    pub when_status: WhenStatus,
    /// Resolved leafref target instance.
    pub leafref: Option<DataNodeId>,
    /// Resolved instance-identifier target.
    pub instance: Option<DataNodeId>,
    /// Set once the node was removed from the tree.
    pub deleted: bool,
}

impl DataNode {
    fn new(schema: NodeId) -> Self {
        Self {
            schema,
            parent: None,
            children: Vec::new(),
            value: None,
            when_status: WhenStatus::True,
            leafref: None,
            instance: None,
            deleted: false,
        }
    }
}

/// An instance-data tree with an explicit top-level sibling list.
#[derive(Debug, Default)]
pub struct DataTree {
    pub nodes: IndexVec<DataNodeId, DataNode>,
    pub roots: Vec<DataNodeId>,
}

impl DataTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a top-level node.
    pub fn add_root(&mut self, schema: NodeId) -> DataNodeId {
        let id = self.nodes.push(DataNode::new(schema));
        self.roots.push(id);
        id
    }

    /// Create a node under `parent`.
    pub fn add_child(&mut self, parent: DataNodeId, schema: NodeId) -> DataNodeId {
        let id = self.nodes.push(DataNode::new(schema));
        self.nodes[id].parent = Some(parent);
        self.nodes[parent].children.push(id);
        id
    }

    /// Create a leaf node under `parent` with a value.
    pub fn add_leaf(&mut self, parent: DataNodeId, schema: NodeId, value: &str) -> DataNodeId {
        let id = self.add_child(parent, schema);
        self.nodes[id].value = Some(value.to_string());
        id
    }

    /// Create a top-level leaf node with a value.
    pub fn add_root_leaf(&mut self, schema: NodeId, value: &str) -> DataNodeId {
        let id = self.add_root(schema);
        self.nodes[id].value = Some(value.to_string());
        id
    }

    pub fn node(&self, id: DataNodeId) -> &DataNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: DataNodeId) -> &mut DataNode {
        &mut self.nodes[id]
    }

    /// Detach `id` from its parent's child list (or the root list). The
    /// subtree stays allocated.
    pub fn unlink(&mut self, id: DataNodeId) {
        match self.nodes[id].parent {
            Some(parent) => {
                self.nodes[parent].children.retain(|&c| c != id);
            }
            None => {
                self.roots.retain(|&r| r != id);
            }
        }
        self.nodes[id].parent = None;
    }

    /// Mark `id` and its whole subtree deleted.
    pub fn free_subtree(&mut self, id: DataNodeId) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            self.nodes[cur].deleted = true;
            stack.extend_from_slice(&self.nodes[cur].children);
        }
    }

    /// Whether `id` lies inside the subtree rooted at `root` (inclusive).
    pub fn is_in_subtree(&self, id: DataNodeId, root: DataNodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(cur) = cursor {
            if cur == root {
                return true;
            }
            cursor = self.nodes[cur].parent;
        }
        false
    }

    /// Siblings of `id`: children of its parent, or the root list.
    pub fn siblings(&self, id: DataNodeId) -> &[DataNodeId] {
        match self.nodes[id].parent {
            Some(parent) => &self.nodes[parent].children,
            None => &self.roots,
        }
    }

    /// Render the data path of a node, `/mod:list[key='v']/leaf` style.
    pub fn data_path(&self, ctx: &SchemaContext, id: DataNodeId) -> String {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(cur) = cursor {
            chain.push(cur);
            cursor = self.nodes[cur].parent;
        }
        chain.reverse();

        let mut path = String::new();
        let mut prev_module = None;
        for cur in chain {
            let node = &self.nodes[cur];
            let schema = ctx.node(node.schema);
            let module = ctx.main_module(schema.module);
            path.push('/');
            if prev_module != Some(module) {
                path.push_str(ctx.str(ctx.modules[module].name));
                path.push(':');
            }
            path.push_str(ctx.str(schema.name));
            prev_module = Some(module);

            if let NodeKind::List { keys, .. } = &schema.kind {
                for &key in keys {
                    if let Some(kv) = node
                        .children
                        .iter()
                        .find(|&&c| self.nodes[c].schema == key)
                        .and_then(|&c| self.nodes[c].value.as_deref())
                    {
                        path.push_str(&format!("[{}='{}']", ctx.node_name(key), kv));
                    }
                }
            }
        }
        path
    }
}
