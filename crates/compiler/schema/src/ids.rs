//! Typed arena indices for the schema and data models.

use index_vec;

index_vec::define_index_type! {
    /// A unique ID for a module (or submodule) within a context
    pub struct ModuleId = usize;

    MAX_INDEX = usize::MAX;
}

index_vec::define_index_type! {
    /// A unique ID for a schema node within a context
    pub struct NodeId = usize;

    MAX_INDEX = usize::MAX;
}

index_vec::define_index_type! {
    /// A unique ID for a type within a context
    pub struct TypeId = usize;

    MAX_INDEX = usize::MAX;
}

index_vec::define_index_type! {
    /// A unique ID for a typedef within a context
    pub struct TypedefId = usize;

    MAX_INDEX = usize::MAX;
}

index_vec::define_index_type! {
    /// A unique ID for an identity within a context
    pub struct IdentityId = usize;

    MAX_INDEX = usize::MAX;
}

index_vec::define_index_type! {
    /// A unique ID for a feature within a context
    pub struct FeatureId = usize;

    MAX_INDEX = usize::MAX;
}

index_vec::define_index_type! {
    /// A unique ID for an instance-data node within a data tree
    pub struct DataNodeId = usize;

    MAX_INDEX = usize::MAX;
}
