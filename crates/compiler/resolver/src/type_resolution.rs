//! Type-derivation resolution: linking named types to their superiors,
//! validating restrictions and checking default values.
//!
//! Derived types resolve bottom-up: a `type` statement naming a typedef is
//! deferred until that typedef's own derivation is resolved, which the
//! fixpoint driver guarantees by running derivation items to a fixed point
//! before anything else.

use yang_compiler_diagnostics::{Diagnostic, DiagnosticCode};
use yang_compiler_schema::{BuiltinType, ModuleId, NodeId, SchemaContext, TypeId, TypedefId};

use crate::error::{ResolveError, ResolveResult};
use crate::interval::{
    effective_intervals, parse_scalar, resolve_intervals, IntervalError, IntervalKind, RestrKind,
};
use crate::unres::{add_schema_item, SchemaItem, UnresSchema};

/// Result of a superior-type search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuperiorType {
    Builtin(BuiltinType),
    Typedef(TypedefId),
}

/// Find the type a `type` statement refers to: a built-in, a typedef in an
/// enclosing scope, or a module-level typedef (searching submodules too).
/// Only typedefs whose own derivation is already resolved are returned; an
/// unresolved or missing typedef is a forward reference.
pub fn resolve_superior_type(
    ctx: &SchemaContext,
    name: &str,
    mod_name: Option<&str>,
    module: ModuleId,
    parent: Option<NodeId>,
) -> ResolveResult<SuperiorType> {
    if mod_name.is_none() {
        if let Some(builtin) = BuiltinType::from_name(name) {
            return Ok(SuperiorType::Builtin(builtin));
        }
    }

    let target = ctx
        .resolve_reference_module(module, mod_name)
        .ok_or_else(|| {
            ResolveError::fatal(Diagnostic::error(
                DiagnosticCode::InMod,
                format!(
                    "Module name \"{}\" refers to an unknown module.",
                    mod_name.unwrap_or("")
                ),
            ))
        })?;
    let local = target == ctx.main_module(module);

    // search typedefs of the enclosing scopes
    if local {
        let mut cursor = parent;
        while let Some(node) = cursor {
            for &tpdf in ctx.nodes[node].typedefs() {
                if ctx.str(ctx.typedefs[tpdf].name) == name
                    && ctx.types[ctx.typedefs[tpdf].type_id].base.is_some()
                {
                    return Ok(SuperiorType::Typedef(tpdf));
                }
            }
            cursor = ctx.nodes[node].parent;
        }
    }

    // module-level typedefs, then included submodules
    for &tpdf in ctx.modules[target].typedefs.iter().chain(
        ctx.modules[target]
            .includes
            .iter()
            .flat_map(|&inc| ctx.modules[inc].typedefs.iter()),
    ) {
        if ctx.str(ctx.typedefs[tpdf].name) == name
            && ctx.types[ctx.typedefs[tpdf].type_id].base.is_some()
        {
            return Ok(SuperiorType::Typedef(tpdf));
        }
    }

    Err(ResolveError::deferred(Diagnostic::unresolved("type", name)))
}

/// Resolve one `type` statement: link the superior, validate the local
/// restrictions and enqueue the dependent checks (leafref path, identityref
/// base, union members).
pub fn resolve_type_derivation(
    ctx: &mut SchemaContext,
    unres: &mut UnresSchema,
    module: ModuleId,
    type_id: TypeId,
    parent: Option<NodeId>,
) -> ResolveResult {
    if ctx.types[type_id].base.is_none() {
        let name = ctx.types[type_id].type_name.clone();
        let prefix = ctx.types[type_id].prefix.clone();

        match resolve_superior_type(ctx, &name, prefix.as_deref(), module, parent)? {
            SuperiorType::Builtin(builtin) => {
                ctx.types[type_id].base = Some(builtin);
                ctx.types[type_id].superior = None;
            }
            SuperiorType::Typedef(tpdf) => {
                let base = ctx.types[ctx.typedefs[tpdf].type_id].base.ok_or_else(|| {
                    ResolveError::fatal(Diagnostic::internal("unresolved typedef returned"))
                })?;
                ctx.types[type_id].superior = Some(tpdf);
                ctx.types[type_id].base = Some(base);
            }
        }
    }

    validate_restrictions(ctx, type_id)?;

    // dependent checks, attempted immediately and kept on failure
    let spec = &ctx.types[type_id];
    let base = spec
        .base
        .ok_or_else(|| ResolveError::fatal(Diagnostic::internal("type base missing")))?;
    let mut followups = Vec::new();
    match base {
        BuiltinType::Leafref => {
            if spec.leafref_target.is_none() && spec.path.is_some() {
                followups.push(SchemaItem::TypeLeafref {
                    type_id,
                    node: parent,
                });
            }
        }
        BuiltinType::Identityref => {
            if spec.identity_base.is_none() {
                followups.push(SchemaItem::TypeIdentrefBase { type_id });
            }
        }
        BuiltinType::Union => {
            for &member in &spec.union_types {
                if ctx.types[member].base.is_none() {
                    followups.push(SchemaItem::TypeDerivation {
                        type_id: member,
                        node: parent,
                    });
                }
            }
        }
        _ => {}
    }
    for item in followups {
        add_schema_item(ctx, unres, module, item)?;
    }

    Ok(())
}

fn restriction_error(stmt: &str, err: IntervalError, restr: &str) -> ResolveError {
    match err {
        IntervalError::NotContained | IntervalError::OutOfOrder => {
            ResolveError::fatal(Diagnostic::error(
                DiagnosticCode::NoConstraint,
                format!(
                    "Value \"{restr}\" does not satisfy a constraint (range, length, or pattern)."
                ),
            ))
        }
        IntervalError::Syntax(offset) => ResolveError::fatal(
            Diagnostic::invalid_arg(restr, stmt)
                .with_related(format!("Unexpected character at offset {offset}.")),
        ),
        IntervalError::PrecisionOverflow => {
            ResolveError::fatal(Diagnostic::invalid_arg(restr, stmt).with_related(
                "Value does not fit the decimal64 value space.".to_string(),
            ))
        }
        IntervalError::NotApplicable => ResolveError::fatal(invalid_child(stmt)),
        IntervalError::UnresolvedBase => {
            ResolveError::deferred(Diagnostic::unresolved("type", restr))
        }
    }
}

fn invalid_child(stmt: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::InChildStmt,
        format!("Invalid keyword \"{stmt}\" as a child to \"type\"."),
    )
}

fn missing_child(stmt: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::MissChildStmt,
        format!("Missing keyword \"{stmt}\" as a child to \"type\"."),
    )
}

/// Validate the local restrictions of a freshly linked type against its
/// resolved base: statement applicability, enum/bit sets and interval
/// containment.
fn validate_restrictions(ctx: &mut SchemaContext, type_id: TypeId) -> ResolveResult {
    let spec = &ctx.types[type_id];
    let base = spec
        .base
        .ok_or_else(|| ResolveError::fatal(Diagnostic::internal("type base missing")))?;
    let direct = spec.superior.is_none();

    // statement applicability
    if spec.range.is_some() && !base.is_numeric() {
        return Err(ResolveError::fatal(invalid_child("range")));
    }
    if spec.length.is_some() && !base.has_length() {
        return Err(ResolveError::fatal(invalid_child("length")));
    }
    if !spec.patterns.is_empty() && base != BuiltinType::String {
        return Err(ResolveError::fatal(invalid_child("pattern")));
    }
    if !spec.enums.is_empty() && base != BuiltinType::Enumeration {
        return Err(ResolveError::fatal(invalid_child("enum")));
    }
    if !spec.bits.is_empty() && base != BuiltinType::Bits {
        return Err(ResolveError::fatal(invalid_child("bit")));
    }
    if spec.fraction_digits.is_some() && base != BuiltinType::Decimal64 {
        return Err(ResolveError::fatal(invalid_child("fraction-digits")));
    }
    if spec.path.is_some() && base != BuiltinType::Leafref {
        return Err(ResolveError::fatal(invalid_child("path")));
    }
    if spec.identity_base_name.is_some() && base != BuiltinType::Identityref {
        return Err(ResolveError::fatal(invalid_child("base")));
    }

    // mandatory sub-statements of direct built-in uses
    if direct {
        match base {
            BuiltinType::Decimal64 if spec.fraction_digits.is_none() => {
                return Err(ResolveError::fatal(missing_child("fraction-digits")));
            }
            BuiltinType::Leafref if spec.path.is_none() => {
                return Err(ResolveError::fatal(missing_child("path")));
            }
            BuiltinType::Identityref if spec.identity_base_name.is_none() => {
                return Err(ResolveError::fatal(missing_child("base")));
            }
            BuiltinType::Enumeration if spec.enums.is_empty() => {
                return Err(ResolveError::fatal(missing_child("enum")));
            }
            BuiltinType::Bits if spec.bits.is_empty() => {
                return Err(ResolveError::fatal(missing_child("bit")));
            }
            BuiltinType::Union if spec.union_types.is_empty() => {
                return Err(ResolveError::fatal(missing_child("type")));
            }
            _ => {}
        }
    } else {
        // fraction-digits may only appear on the direct decimal64 use
        if spec.fraction_digits.is_some() {
            return Err(ResolveError::fatal(invalid_child("fraction-digits")));
        }
    }

    if !ctx.types[type_id].enums.is_empty() {
        validate_enums(ctx, type_id)?;
    }
    if !ctx.types[type_id].bits.is_empty() {
        validate_bits(ctx, type_id)?;
    }

    let spec = &ctx.types[type_id];
    if spec.range.is_some() {
        let restr = spec.range.clone().unwrap_or_default();
        resolve_intervals(ctx, type_id, RestrKind::Range)
            .map_err(|e| restriction_error("range", e, &restr))?;
    }
    let spec = &ctx.types[type_id];
    if spec.length.is_some() {
        let restr = spec.length.clone().unwrap_or_default();
        resolve_intervals(ctx, type_id, RestrKind::Length)
            .map_err(|e| restriction_error("length", e, &restr))?;
    }

    Ok(())
}

/// The enum set in effect for a type: the nearest non-empty set along the
/// derivation chain.
pub fn effective_enums(ctx: &SchemaContext, type_id: TypeId) -> Option<(TypeId, usize)> {
    let mut cursor = Some(type_id);
    while let Some(id) = cursor {
        let spec = &ctx.types[id];
        if !spec.enums.is_empty() {
            return Some((id, spec.enums.len()));
        }
        cursor = spec.superior.map(|t| ctx.typedefs[t].type_id);
    }
    None
}

/// The bit set in effect for a type.
pub fn effective_bits(ctx: &SchemaContext, type_id: TypeId) -> Option<TypeId> {
    let mut cursor = Some(type_id);
    while let Some(id) = cursor {
        if !ctx.types[id].bits.is_empty() {
            return Some(id);
        }
        cursor = ctx.types[id].superior.map(|t| ctx.typedefs[t].type_id);
    }
    None
}

/// Validate an enum set: no leading/trailing whitespace, unique names,
/// unique values; values auto-assigned where absent. A restricted set (the
/// superior chain already defines enums) must be a name-subset inheriting
/// the superior values.
fn validate_enums(ctx: &mut SchemaContext, type_id: TypeId) -> ResolveResult {
    let superior_set = ctx.types[type_id]
        .superior
        .map(|t| ctx.typedefs[t].type_id)
        .and_then(|sup| effective_enums(ctx, sup).map(|(id, _)| id));
    let base_enums: Option<Vec<(String, i32)>> = superior_set.map(|id| {
        ctx.types[id]
            .enums
            .iter()
            .map(|e| (e.name.clone(), e.resolved_value))
            .collect()
    });

    let enums = &mut ctx.types[type_id].enums;
    let mut seen_names: Vec<String> = Vec::new();
    let mut seen_values: Vec<i32> = Vec::new();
    let mut next_auto: i32 = 0;

    for spec in enums.iter_mut() {
        if spec.name.trim() != spec.name || spec.name.is_empty() {
            return Err(ResolveError::fatal(Diagnostic::error(
                DiagnosticCode::EnumWhitespace,
                format!(
                    "The enum name \"{}\" includes invalid leading or trailing whitespaces.",
                    spec.name
                ),
            )));
        }
        if seen_names.contains(&spec.name) {
            return Err(ResolveError::fatal(Diagnostic::error(
                DiagnosticCode::EnumDupName,
                format!(
                    "The enum name \"{}\" has already been assigned to another enum.",
                    spec.name
                ),
            )));
        }

        let value = match &base_enums {
            Some(base) => {
                // a restricted enumeration keeps the superior values
                let inherited = base.iter().find(|(name, _)| *name == spec.name).map(|(_, v)| *v);
                let inherited = inherited.ok_or_else(|| {
                    ResolveError::fatal(Diagnostic::invalid_arg(&spec.name, "enum"))
                })?;
                if spec.value.is_some_and(|v| v != inherited) {
                    return Err(ResolveError::fatal(Diagnostic::invalid_arg(
                        &spec.name, "enum",
                    )));
                }
                inherited
            }
            None => match spec.value {
                Some(value) => value,
                None => next_auto,
            },
        };

        if seen_values.contains(&value) {
            return Err(ResolveError::fatal(Diagnostic::error(
                DiagnosticCode::EnumDupVal,
                format!(
                    "The value \"{}\" of \"{}\" enum has already been assigned to another enum value.",
                    value, spec.name
                ),
            )));
        }

        spec.resolved_value = value;
        seen_names.push(spec.name.clone());
        seen_values.push(value);
        next_auto = value.saturating_add(1).max(next_auto);
    }

    Ok(())
}

/// Validate a bit set: unique names and positions, positions auto-assigned
/// where absent.
fn validate_bits(ctx: &mut SchemaContext, type_id: TypeId) -> ResolveResult {
    let bits = &mut ctx.types[type_id].bits;
    let mut seen_names: Vec<String> = Vec::new();
    let mut seen_positions: Vec<u32> = Vec::new();
    let mut next_auto: u32 = 0;

    for spec in bits.iter_mut() {
        if seen_names.contains(&spec.name) {
            return Err(ResolveError::fatal(Diagnostic::error(
                DiagnosticCode::BitsDupName,
                format!(
                    "The bit name \"{}\" has already been assigned to another bit.",
                    spec.name
                ),
            )));
        }
        let position = spec.position.unwrap_or(next_auto);
        if seen_positions.contains(&position) {
            return Err(ResolveError::fatal(Diagnostic::error(
                DiagnosticCode::BitsDupVal,
                format!(
                    "The position \"{}\" of \"{}\" bits has already been used to another named bit.",
                    position, spec.name
                ),
            )));
        }

        spec.resolved_position = position;
        seen_names.push(spec.name.clone());
        seen_positions.push(position);
        next_auto = position.saturating_add(1).max(next_auto);
    }

    Ok(())
}

/// Check a default value against a resolved type. Leafrefs defer until the
/// target is known and then validate against the target's type.
pub fn check_default(ctx: &SchemaContext, type_id: TypeId, value: &str) -> ResolveResult {
    let spec = &ctx.types[type_id];
    let base = match spec.base {
        Some(base) => base,
        None => {
            return Err(ResolveError::deferred(Diagnostic::unresolved(
                "type default",
                value,
            )))
        }
    };

    let invalid = || {
        ResolveError::fatal(Diagnostic::error(
            DiagnosticCode::InVal,
            format!("Invalid value \"{value}\" in \"default\" element."),
        ))
    };

    match base {
        BuiltinType::Leafref => match spec.leafref_target {
            None => Err(ResolveError::deferred(Diagnostic::no_resolvents(
                spec.path.as_deref().unwrap_or(value),
            ))),
            Some(target) => {
                let target_type = ctx.nodes[target].type_id().ok_or_else(|| {
                    ResolveError::fatal(Diagnostic::internal("leafref target is not a leaf"))
                })?;
                check_default(ctx, target_type, value)
            }
        },
        // converted to JSON format before, nothing else sensible to check
        BuiltinType::InstanceIdentifier | BuiltinType::Identityref => Ok(()),
        BuiltinType::Empty => Err(invalid()),
        BuiltinType::Boolean => {
            if value == "true" || value == "false" {
                Ok(())
            } else {
                Err(invalid())
            }
        }
        BuiltinType::Enumeration => {
            let found = effective_enums(ctx, type_id)
                .map(|(id, _)| ctx.types[id].enums.iter().any(|e| e.name == value))
                .unwrap_or(false);
            if found {
                Ok(())
            } else {
                Err(invalid())
            }
        }
        BuiltinType::Bits => {
            let set = effective_bits(ctx, type_id);
            for token in value.split_whitespace() {
                let found = set
                    .map(|id| ctx.types[id].bits.iter().any(|b| b.name == token))
                    .unwrap_or(false);
                if !found {
                    return Err(invalid());
                }
            }
            Ok(())
        }
        BuiltinType::String | BuiltinType::Binary => {
            if let Some(set) = effective_intervals(ctx, type_id, RestrKind::Length)
                .map_err(|e| restriction_error("length", e, value))?
            {
                if !set.contains(value.len() as i128) {
                    return Err(ResolveError::fatal(Diagnostic::error(
                        DiagnosticCode::NoConstraint,
                        format!(
                            "Value \"{value}\" does not satisfy a constraint (range, length, or pattern)."
                        ),
                    )));
                }
            }
            Ok(())
        }
        BuiltinType::Union => {
            let mut deferred = None;
            for &member in &spec.union_types {
                match check_default(ctx, member, value) {
                    Ok(()) => return Ok(()),
                    Err(e @ ResolveError::Deferred(_)) => deferred = Some(e),
                    Err(ResolveError::Fatal(_)) => {}
                }
            }
            match deferred {
                Some(e) => Err(e),
                None => Err(invalid()),
            }
        }
        _ => {
            // numeric kinds
            let kind = match base {
                BuiltinType::Decimal64 => IntervalKind::Decimal {
                    fraction_digits: crate::interval::effective_fraction_digits(ctx, type_id),
                },
                BuiltinType::Uint8 | BuiltinType::Uint16 | BuiltinType::Uint32
                | BuiltinType::Uint64 => IntervalKind::Unsigned,
                _ => IntervalKind::Signed,
            };
            let parsed = parse_scalar(value, kind).map_err(|_| invalid())?;
            let set = resolve_intervals(ctx, type_id, RestrKind::Range)
                .map_err(|e| restriction_error("range", e, value))?;
            if !set.contains(parsed) {
                return Err(ResolveError::fatal(Diagnostic::error(
                    DiagnosticCode::NoConstraint,
                    format!(
                        "Value \"{value}\" does not satisfy a constraint (range, length, or pattern)."
                    ),
                )));
            }
            Ok(())
        }
    }
}

/// Check that a node's (or typedef's) status may reference its type's
/// superior typedef, walking nothing else. Used when linking derivations.
pub fn type_display_name(ctx: &SchemaContext, type_id: TypeId) -> String {
    let spec = &ctx.types[type_id];
    match (&spec.prefix, spec.base) {
        (Some(prefix), _) => format!("{prefix}:{}", spec.type_name),
        (None, _) if !spec.type_name.is_empty() => spec.type_name.clone(),
        (None, Some(base)) => base.name().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yang_compiler_schema::{EnumSpec, Module, NodeFlags, TypeSpec, Typedef};

    fn ctx_with_module() -> (SchemaContext, ModuleId) {
        let mut ctx = SchemaContext::new();
        let name = ctx.intern("m");
        let prefix = ctx.intern("m");
        let module = ctx.add_module(Module::new(name, prefix));
        (ctx, module)
    }

    fn add_module_typedef(
        ctx: &mut SchemaContext,
        module: ModuleId,
        name: &str,
        spec: TypeSpec,
        default: Option<&str>,
    ) -> TypedefId {
        let type_id = ctx.add_type(spec);
        let sym = ctx.intern(name);
        let tpdf = ctx.add_typedef(Typedef {
            name: sym,
            module,
            parent_node: None,
            type_id,
            units: None,
            default: default.map(str::to_string),
            flags: NodeFlags::empty(),
            description: None,
            reference: None,
        });
        ctx.modules[module].typedefs.push(tpdf);
        tpdf
    }

    #[test]
    fn test_superior_type_builtin() {
        let (ctx, m) = ctx_with_module();
        assert_eq!(
            resolve_superior_type(&ctx, "uint8", None, m, None).unwrap(),
            SuperiorType::Builtin(BuiltinType::Uint8)
        );
    }

    #[test]
    fn test_superior_type_forward_reference_is_deferred() {
        let (ctx, m) = ctx_with_module();
        let err = resolve_superior_type(&ctx, "missing", None, m, None).unwrap_err();
        assert!(err.is_deferred());
    }

    #[test]
    fn test_superior_type_unknown_module_is_fatal() {
        let (ctx, m) = ctx_with_module();
        let err = resolve_superior_type(&ctx, "t", Some("nowhere"), m, None).unwrap_err();
        assert!(!err.is_deferred());
    }

    #[test]
    fn test_derivation_links_typedef() {
        let (mut ctx, m) = ctx_with_module();
        let mut resolved = TypeSpec::named(None, "int32");
        resolved.base = Some(BuiltinType::Int32);
        resolved.range = Some("0..100".to_string());
        add_module_typedef(&mut ctx, m, "percent", resolved, None);

        let spec = TypeSpec::named(None, "percent");
        let ty = ctx.add_type(spec);

        let mut unres = UnresSchema::new();
        resolve_type_derivation(&mut ctx, &mut unres, m, ty, None).unwrap();
        assert_eq!(ctx.types[ty].base, Some(BuiltinType::Int32));
        assert!(ctx.types[ty].superior.is_some());
    }

    #[test]
    fn test_decimal64_requires_fraction_digits() {
        let (mut ctx, m) = ctx_with_module();
        let spec = TypeSpec::named(None, "decimal64");
        let ty = ctx.add_type(spec);

        let mut unres = UnresSchema::new();
        let err = resolve_type_derivation(&mut ctx, &mut unres, m, ty, None).unwrap_err();
        assert!(!err.is_deferred());
        assert_eq!(err.diagnostic().code, DiagnosticCode::MissChildStmt);
    }

    #[test]
    fn test_enum_validation() {
        let (mut ctx, m) = ctx_with_module();
        let mut spec = TypeSpec::named(None, "enumeration");
        spec.enums = vec![
            EnumSpec::new("a"),
            EnumSpec::with_value("b", 5),
            EnumSpec::new("c"),
        ];
        let ty = ctx.add_type(spec);

        let mut unres = UnresSchema::new();
        resolve_type_derivation(&mut ctx, &mut unres, m, ty, None).unwrap();
        let values: Vec<i32> = ctx.types[ty].enums.iter().map(|e| e.resolved_value).collect();
        assert_eq!(values, vec![0, 5, 6]);
    }

    #[test]
    fn test_enum_duplicate_value_rejected() {
        let (mut ctx, m) = ctx_with_module();
        let mut spec = TypeSpec::named(None, "enumeration");
        spec.enums = vec![EnumSpec::with_value("a", 1), EnumSpec::with_value("b", 1)];
        let ty = ctx.add_type(spec);

        let mut unres = UnresSchema::new();
        let err = resolve_type_derivation(&mut ctx, &mut unres, m, ty, None).unwrap_err();
        assert_eq!(err.diagnostic().code, DiagnosticCode::EnumDupVal);
    }

    #[test]
    fn test_enum_whitespace_rejected() {
        let (mut ctx, m) = ctx_with_module();
        let mut spec = TypeSpec::named(None, "enumeration");
        spec.enums = vec![EnumSpec::new(" padded")];
        let ty = ctx.add_type(spec);

        let mut unres = UnresSchema::new();
        let err = resolve_type_derivation(&mut ctx, &mut unres, m, ty, None).unwrap_err();
        assert_eq!(err.diagnostic().code, DiagnosticCode::EnumWhitespace);
    }

    #[test]
    fn test_check_default_numeric_range() {
        let (mut ctx, m) = ctx_with_module();
        let mut resolved = TypeSpec::named(None, "int32");
        resolved.base = Some(BuiltinType::Int32);
        resolved.range = Some("0..100".to_string());
        let tpdf = add_module_typedef(&mut ctx, m, "percent", resolved, None);
        let leaf_type_id = ctx.typedefs[tpdf].type_id;

        assert!(check_default(&ctx, leaf_type_id, "50").is_ok());
        let err = check_default(&ctx, leaf_type_id, "101").unwrap_err();
        assert_eq!(err.diagnostic().code, DiagnosticCode::NoConstraint);
        let err = check_default(&ctx, leaf_type_id, "abc").unwrap_err();
        assert_eq!(err.diagnostic().code, DiagnosticCode::InVal);
    }

    #[test]
    fn test_check_default_boolean_and_enum() {
        let (mut ctx, _m) = ctx_with_module();
        let b = ctx.add_type(TypeSpec::builtin(BuiltinType::Boolean));
        assert!(check_default(&ctx, b, "true").is_ok());
        assert!(check_default(&ctx, b, "yes").is_err());

        let mut spec = TypeSpec::builtin(BuiltinType::Enumeration);
        spec.enums = vec![EnumSpec::with_value("on", 0), EnumSpec::with_value("off", 1)];
        let e = ctx.add_type(spec);
        assert!(check_default(&ctx, e, "on").is_ok());
        assert!(check_default(&ctx, e, "standby").is_err());
    }
}
