//! Type definitions: built-in kinds, type specifications and typedefs.
//!
//! A [`TypeSpec`] is one `type` statement: a reference to a built-in or a
//! superior typedef plus the local refinements (range, length, patterns,
//! enums, bits, fraction-digits, leafref path, identityref base, union
//! members). The resolver links `superior`/`base` and fills the resolution
//! results (`leafref_target`, `identity_base`).

use crate::ids::{IdentityId, ModuleId, NodeId, TypeId, TypedefId};
use crate::interner::Symbol;
use crate::node::NodeFlags;

/// The YANG built-in types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Binary,
    Bits,
    Boolean,
    Decimal64,
    Empty,
    Enumeration,
    Identityref,
    InstanceIdentifier,
    Int8,
    Int16,
    Int32,
    Int64,
    Leafref,
    String,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Union,
}

impl BuiltinType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Bits => "bits",
            Self::Boolean => "boolean",
            Self::Decimal64 => "decimal64",
            Self::Empty => "empty",
            Self::Enumeration => "enumeration",
            Self::Identityref => "identityref",
            Self::InstanceIdentifier => "instance-identifier",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Leafref => "leafref",
            Self::String => "string",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Union => "union",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "binary" => Self::Binary,
            "bits" => Self::Bits,
            "boolean" => Self::Boolean,
            "decimal64" => Self::Decimal64,
            "empty" => Self::Empty,
            "enumeration" => Self::Enumeration,
            "identityref" => Self::Identityref,
            "instance-identifier" => Self::InstanceIdentifier,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "leafref" => Self::Leafref,
            "string" => Self::String,
            "uint8" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "union" => Self::Union,
            _ => return None,
        })
    }

    /// Whether values of this type are constrained by `range`.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Decimal64
                | Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Uint8
                | Self::Uint16
                | Self::Uint32
                | Self::Uint64
        )
    }

    /// Whether values of this type are constrained by `length`.
    pub fn has_length(self) -> bool {
        matches!(self, Self::Binary | Self::String)
    }
}

/// One `enum` member of an enumeration type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSpec {
    pub name: String,
    /// Explicit `value` statement, if any.
    pub value: Option<i32>,
    /// Effective value after auto-assignment.
    pub resolved_value: i32,
}

impl EnumSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            resolved_value: 0,
        }
    }

    pub fn with_value(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            resolved_value: value,
        }
    }
}

/// One `bit` member of a bits type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSpec {
    pub name: String,
    /// Explicit `position` statement, if any.
    pub position: Option<u32>,
    /// Effective position after auto-assignment.
    pub resolved_position: u32,
}

impl BitSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: None,
            resolved_position: 0,
        }
    }

    pub fn with_position(name: impl Into<String>, position: u32) -> Self {
        Self {
            name: name.into(),
            position: Some(position),
            resolved_position: position,
        }
    }
}

/// A `type` statement: reference plus local refinements and resolution
/// results.
#[derive(Debug, Clone, Default)]
pub struct TypeSpec {
    /// The referenced type name as written: optional module prefix and the
    /// name. `None` only for types synthesized by the resolver.
    pub prefix: Option<String>,
    pub type_name: String,
    /// Resolved built-in kind, filled by derivation resolution.
    pub base: Option<BuiltinType>,
    /// Superior typedef when the name resolves to a derived type.
    pub superior: Option<TypedefId>,
    /// Node carrying this type (its leaf/leaf-list), `None` for typedef
    /// bodies; used for scoped typedef search and diagnostics.
    pub parent_node: Option<NodeId>,

    // Local refinements
    pub range: Option<String>,
    pub length: Option<String>,
    pub patterns: Vec<String>,
    pub enums: Vec<EnumSpec>,
    pub bits: Vec<BitSpec>,
    pub fraction_digits: Option<u8>,
    /// Leafref `path` argument.
    pub path: Option<String>,
    pub require_instance: Option<bool>,
    /// Identityref `base` argument as written.
    pub identity_base_name: Option<String>,
    pub union_types: Vec<TypeId>,

    // Resolution results
    pub leafref_target: Option<NodeId>,
    pub identity_base: Option<IdentityId>,
}

impl TypeSpec {
    /// A reference to a named type, to be resolved later.
    pub fn named(prefix: Option<&str>, type_name: &str) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            type_name: type_name.to_string(),
            ..Self::default()
        }
    }

    /// A direct use of a built-in type.
    pub fn builtin(base: BuiltinType) -> Self {
        Self {
            type_name: base.name().to_string(),
            base: Some(base),
            ..Self::default()
        }
    }
}

/// A `typedef` record; owned by a module or by a node that can carry local
/// typedefs.
#[derive(Debug, Clone)]
pub struct Typedef {
    pub name: Symbol,
    pub module: ModuleId,
    /// Enclosing node for node-local typedefs, `None` for module-level.
    pub parent_node: Option<NodeId>,
    pub type_id: TypeId,
    pub units: Option<String>,
    pub default: Option<String>,
    pub flags: NodeFlags,
    pub description: Option<String>,
    pub reference: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_roundtrip() {
        for ty in [
            BuiltinType::Binary,
            BuiltinType::Decimal64,
            BuiltinType::InstanceIdentifier,
            BuiltinType::Uint64,
            BuiltinType::Union,
        ] {
            assert_eq!(BuiltinType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(BuiltinType::from_name("int128"), None);
    }

    #[test]
    fn test_numeric_classes() {
        assert!(BuiltinType::Int8.is_numeric());
        assert!(BuiltinType::Decimal64.is_numeric());
        assert!(!BuiltinType::String.is_numeric());
        assert!(BuiltinType::String.has_length());
        assert!(BuiltinType::Binary.has_length());
        assert!(!BuiltinType::Uint32.has_length());
    }
}
