//! # YANG Schema Model
//!
//! This crate defines the data model the resolver operates on: modules,
//! schema nodes, types, identities and features, all stored in arenas owned
//! by a [`SchemaContext`] and cross-linked by typed indices.
//!
//! ## Architecture
//!
//! The schema tree is a richly cross-linked graph (parents, children, type
//! derivation chains, leafref targets, the identity DAG, reverse indices).
//! Every cross-link is an index into a context-owned arena:
//!
//! 1. **Ids**: `define_index_type!` newtypes for every arena
//! 2. **Interner**: `Symbol` ids for all schema-facing strings
//! 3. **Nodes**: a tagged [`NodeKind`] variant per YANG statement kind
//! 4. **Context**: the owning arena container plus module/prefix lookup
//!
//! Instance data (used by data-time resolution) lives in a parallel
//! [`DataTree`] arena with the same indexing discipline.

pub mod context;
pub mod data;
pub mod ids;
pub mod interner;
pub mod module;
pub mod node;
pub mod types;

pub use context::{GetNext, SchemaContext};
pub use data::{DataNode, DataTree, WhenStatus};
pub use ids::{DataNodeId, FeatureId, IdentityId, ModuleId, NodeId, TypeId, TypedefId};
pub use interner::{Interner, Symbol};
pub use module::{Deviate, DeviateKind, Deviation, Feature, Identity, Import, Module};
pub use node::{IfFeature, Must, NodeFlags, NodeKind, NodeTypeSet, Refine, SchemaNode, Unique, When};
pub use types::{BitSpec, BuiltinType, EnumSpec, TypeSpec, Typedef};
