//! Modules, submodules, identities, features and deviations.

use crate::ids::{FeatureId, IdentityId, ModuleId, NodeId, TypeId, TypedefId};
use crate::interner::Symbol;
use crate::node::{IfFeature, Must, NodeFlags};

/// An `import` of another module under a local prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Import {
    pub module: ModuleId,
    pub prefix: Symbol,
}

/// A named, versioned namespace holding the module's definitions.
///
/// A submodule is a `Module` with `belongs_to` set; it shares the main
/// module's namespace and its definitions are found through the main
/// module's `includes`.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: Symbol,
    pub prefix: Symbol,
    pub namespace: Option<String>,
    pub revision: Option<String>,
    pub implemented: bool,
    /// Some deviation in another module targets this module.
    pub deviated: bool,
    /// Main module of a submodule.
    pub belongs_to: Option<ModuleId>,
    pub imports: Vec<Import>,
    /// Included submodules.
    pub includes: Vec<ModuleId>,
    /// Ordered top-level data-definition nodes.
    pub data: Vec<NodeId>,
    pub typedefs: Vec<TypedefId>,
    pub groupings: Vec<NodeId>,
    pub augments: Vec<NodeId>,
    pub deviations: Vec<Deviation>,
    pub identities: Vec<IdentityId>,
    pub features: Vec<FeatureId>,
}

impl Module {
    pub fn new(name: Symbol, prefix: Symbol) -> Self {
        Self {
            name,
            prefix,
            namespace: None,
            revision: None,
            implemented: true,
            deviated: false,
            belongs_to: None,
            imports: Vec::new(),
            includes: Vec::new(),
            data: Vec::new(),
            typedefs: Vec::new(),
            groupings: Vec::new(),
            augments: Vec::new(),
            deviations: Vec::new(),
            identities: Vec::new(),
            features: Vec::new(),
        }
    }
}

/// A named, hierarchically based symbol.
///
/// `bases` is filled by resolution; `derived` holds back-links from every
/// transitive base to this identity, used for identityref validation.
#[derive(Debug, Clone)]
pub struct Identity {
    pub name: Symbol,
    pub module: ModuleId,
    /// `base` arguments as written, `[prefix:]name`.
    pub base_names: Vec<String>,
    pub bases: Vec<IdentityId>,
    pub derived: Vec<IdentityId>,
    pub flags: NodeFlags,
    pub description: Option<String>,
    pub reference: Option<String>,
}

impl Identity {
    pub fn new(name: Symbol, module: ModuleId) -> Self {
        Self {
            name,
            module,
            base_names: Vec::new(),
            bases: Vec::new(),
            derived: Vec::new(),
            flags: NodeFlags::empty(),
            description: None,
            reference: None,
        }
    }
}

/// A `feature` declaration.
#[derive(Debug, Clone)]
pub struct Feature {
    pub name: Symbol,
    pub module: ModuleId,
    pub if_features: Vec<IfFeature>,
    pub flags: NodeFlags,
}

impl Feature {
    pub fn new(name: Symbol, module: ModuleId) -> Self {
        Self {
            name,
            module,
            if_features: Vec::new(),
            flags: NodeFlags::empty(),
        }
    }
}

/// A `deviation` declaration: a target nodeid plus an ordered list of
/// `deviate` records.
#[derive(Debug, Clone)]
pub struct Deviation {
    /// Absolute schema nodeid of the target.
    pub target_name: String,
    /// Resolved target; cleared again by `not-supported`.
    pub target: Option<NodeId>,
    pub deviates: Vec<Deviate>,
    /// All deviates were applied to the target.
    pub applied: bool,
}

impl Deviation {
    pub fn new(target_name: impl Into<String>) -> Self {
        Self {
            target_name: target_name.into(),
            target: None,
            deviates: Vec::new(),
            applied: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviateKind {
    NotSupported,
    Add,
    Delete,
    Replace,
}

/// One `deviate` record. Which fields are meaningful depends on `kind`.
#[derive(Debug, Clone)]
pub struct Deviate {
    pub kind: DeviateKind,
    pub musts: Vec<Must>,
    pub uniques: Vec<String>,
    pub default: Option<String>,
    pub config: Option<bool>,
    pub mandatory: Option<bool>,
    pub min_elements: Option<u32>,
    /// `Some(0)` means unbounded.
    pub max_elements: Option<u32>,
    pub units: Option<String>,
    /// Replacement type for `deviate replace`.
    pub type_id: Option<TypeId>,
}

impl Deviate {
    pub fn new(kind: DeviateKind) -> Self {
        Self {
            kind,
            musts: Vec::new(),
            uniques: Vec::new(),
            default: None,
            config: None,
            mandatory: None,
            min_elements: None,
            max_elements: None,
            units: None,
            type_id: None,
        }
    }
}
