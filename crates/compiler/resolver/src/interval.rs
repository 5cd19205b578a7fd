//! Interval-constraint engine for `range` and `length` restrictions.
//!
//! Effective interval sets are computed recursively over the type-derivation
//! chain: the base type's effective set is computed first, the local
//! restriction is parsed into intervals, each local interval is checked for
//! containment in some base interval (in ascending order), and the local set
//! becomes the effective set. An unbounded local set inherits the base set
//! verbatim.
//!
//! All three numeric domains (unsigned, signed, decimal64 scaled by
//! fraction-digits) are carried as `i128` values; decimal64 bounds are
//! scaled mantissas, never floating point, so comparison across derivation
//! chains is exact.

use thiserror::Error;

use yang_compiler_schema::{BuiltinType, SchemaContext, TypeId};

/// Numeric domain of an interval set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    Unsigned,
    Signed,
    /// decimal64 value space, values scaled by `10^fraction_digits`.
    Decimal { fraction_digits: u8 },
}

/// A closed interval over the domain, `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub min: i128,
    pub max: i128,
}

impl Interval {
    pub const fn new(min: i128, max: i128) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: i128) -> bool {
        value >= self.min && value <= self.max
    }
}

/// An ordered set of disjoint intervals with its domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalSet {
    pub kind: IntervalKind,
    pub intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn contains(&self, value: i128) -> bool {
        self.intervals.iter().any(|i| i.contains(value))
    }
}

/// Which restriction of a type the engine is computing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrKind {
    Range,
    Length,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntervalError {
    /// A local interval is not contained in any base interval.
    #[error("range restriction is not contained in the base type restriction")]
    NotContained,
    /// Local intervals are not in ascending, disjoint order.
    #[error("range restriction parts are not in ascending order")]
    OutOfOrder,
    /// Malformed restriction text; the payload is the byte offset of the
    /// offending character.
    #[error("invalid range restriction syntax at offset {0}")]
    Syntax(usize),
    /// A decimal literal does not fit the decimal64 value space under the
    /// declared fraction-digits.
    #[error("decimal value does not fit the value space")]
    PrecisionOverflow,
    /// The restriction does not apply to the base type (`range` on a
    /// string, `length` on a number).
    #[error("restriction not applicable to the base type")]
    NotApplicable,
    /// The derivation chain below this type is not resolved yet.
    #[error("base type not yet resolved")]
    UnresolvedBase,
}

/// Absolute domain and kind of a built-in under the given restriction.
fn builtin_domain(
    base: BuiltinType,
    fraction_digits: u8,
    which: RestrKind,
) -> Result<(IntervalKind, Interval), IntervalError> {
    let (kind, min, max) = match (which, base) {
        (RestrKind::Length, BuiltinType::Binary | BuiltinType::String) => {
            (IntervalKind::Unsigned, 0, u64::MAX as i128)
        }
        (RestrKind::Range, BuiltinType::Decimal64) => (
            IntervalKind::Decimal { fraction_digits },
            i64::MIN as i128,
            i64::MAX as i128,
        ),
        (RestrKind::Range, BuiltinType::Int8) => (IntervalKind::Signed, -128, 127),
        (RestrKind::Range, BuiltinType::Int16) => (IntervalKind::Signed, -32768, 32767),
        (RestrKind::Range, BuiltinType::Int32) => {
            (IntervalKind::Signed, i32::MIN as i128, i32::MAX as i128)
        }
        (RestrKind::Range, BuiltinType::Int64) => {
            (IntervalKind::Signed, i64::MIN as i128, i64::MAX as i128)
        }
        (RestrKind::Range, BuiltinType::Uint8) => (IntervalKind::Unsigned, 0, 255),
        (RestrKind::Range, BuiltinType::Uint16) => (IntervalKind::Unsigned, 0, 65535),
        (RestrKind::Range, BuiltinType::Uint32) => {
            (IntervalKind::Unsigned, 0, u32::MAX as i128)
        }
        (RestrKind::Range, BuiltinType::Uint64) => {
            (IntervalKind::Unsigned, 0, u64::MAX as i128)
        }
        _ => return Err(IntervalError::NotApplicable),
    };
    Ok((kind, Interval::new(min, max)))
}

/// Compute the effective interval set of a type for the given restriction
/// kind, recursing through the derivation chain. Returns `None` when the
/// restriction kind does not apply to the type's base.
pub fn effective_intervals(
    ctx: &SchemaContext,
    type_id: TypeId,
    which: RestrKind,
) -> Result<Option<IntervalSet>, IntervalError> {
    match resolve_intervals(ctx, type_id, which) {
        Ok(set) => Ok(Some(set)),
        Err(IntervalError::NotApplicable) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Like [`effective_intervals`], but failing with `NotApplicable` when the
/// type has no such value space.
pub fn resolve_intervals(
    ctx: &SchemaContext,
    type_id: TypeId,
    which: RestrKind,
) -> Result<IntervalSet, IntervalError> {
    let spec = &ctx.types[type_id];
    let base = spec.base.ok_or(IntervalError::UnresolvedBase)?;
    let fraction_digits = effective_fraction_digits(ctx, type_id);
    let (kind, domain) = builtin_domain(base, fraction_digits, which)?;

    // effective set of the superior type
    let base_set = match spec.superior {
        Some(tpdf) => {
            let sup = resolve_intervals(ctx, ctx.typedefs[tpdf].type_id, which)?;
            debug_assert_eq!(sup.kind, kind);
            sup.intervals
        }
        None => Vec::new(),
    };

    let restr = match which {
        RestrKind::Range => spec.range.as_deref(),
        RestrKind::Length => spec.length.as_deref(),
    };
    let restr = match restr {
        Some(restr) => restr,
        None => {
            // no local restriction, inherit the superior set verbatim
            let intervals = if base_set.is_empty() {
                vec![domain]
            } else {
                base_set
            };
            return Ok(IntervalSet { kind, intervals });
        }
    };

    // min/max tokens resolve to the effective bounds of the base
    let (bound_min, bound_max) = match (base_set.first(), base_set.last()) {
        (Some(first), Some(last)) => (first.min, last.max),
        _ => (domain.min, domain.max),
    };

    let locals = parse_restriction(restr, kind, bound_min, bound_max)?;

    // ascending, disjoint order of the local intervals
    for pair in locals.windows(2) {
        if pair[1].min <= pair[0].max {
            return Err(IntervalError::OutOfOrder);
        }
    }

    // containment: every local interval inside some base interval, walked
    // in order; a local interval straddling base intervals fails
    let effective_base = if base_set.is_empty() {
        std::slice::from_ref(&domain)
    } else {
        &base_set[..]
    };
    let mut bi = 0;
    for local in &locals {
        loop {
            let base_intv = match effective_base.get(bi) {
                Some(base_intv) => base_intv,
                None => return Err(IntervalError::NotContained),
            };
            if local.min >= base_intv.min && local.min <= base_intv.max {
                if local.max <= base_intv.max {
                    break;
                }
                return Err(IntervalError::NotContained);
            }
            bi += 1;
        }
    }

    Ok(IntervalSet {
        kind,
        intervals: locals,
    })
}

/// Fraction-digits in effect for a type: the nearest explicit declaration
/// along the derivation chain.
pub fn effective_fraction_digits(ctx: &SchemaContext, type_id: TypeId) -> u8 {
    let mut cursor = Some(type_id);
    while let Some(id) = cursor {
        let spec = &ctx.types[id];
        if let Some(digits) = spec.fraction_digits {
            return digits;
        }
        cursor = spec.superior.map(|t| ctx.typedefs[t].type_id);
    }
    0
}

/// Parse a full scalar literal of the given domain (used for default-value
/// checking). The whole input must be consumed.
pub fn parse_scalar(text: &str, kind: IntervalKind) -> Result<i128, IntervalError> {
    let trimmed = text.trim();
    let mut pos = 0;
    let value = parse_literal(trimmed, &mut pos, kind)?;
    if pos != trimmed.len() {
        return Err(IntervalError::Syntax(pos));
    }
    Ok(value)
}

/// Parse a `a..b | c..d` restriction into intervals.
fn parse_restriction(
    restr: &str,
    kind: IntervalKind,
    bound_min: i128,
    bound_max: i128,
) -> Result<Vec<Interval>, IntervalError> {
    let mut intervals = Vec::new();
    let mut pos = 0;
    let bytes = restr.as_bytes();

    loop {
        skip_ws(bytes, &mut pos);
        let min = parse_bound(restr, &mut pos, kind, bound_min, bound_max)?;
        skip_ws(bytes, &mut pos);

        let max = if restr[pos..].starts_with("..") {
            pos += 2;
            skip_ws(bytes, &mut pos);
            let max = parse_bound(restr, &mut pos, kind, bound_min, bound_max)?;
            skip_ws(bytes, &mut pos);
            max
        } else {
            min
        };

        if min > max {
            return Err(IntervalError::OutOfOrder);
        }
        intervals.push(Interval::new(min, max));

        match bytes.get(pos) {
            None => break,
            Some(b'|') => pos += 1,
            Some(_) => return Err(IntervalError::Syntax(pos)),
        }
    }

    Ok(intervals)
}

fn skip_ws(bytes: &[u8], pos: &mut usize) {
    while bytes.get(*pos).is_some_and(u8::is_ascii_whitespace) {
        *pos += 1;
    }
}

/// Parse one bound: a literal, `min` or `max`.
fn parse_bound(
    restr: &str,
    pos: &mut usize,
    kind: IntervalKind,
    bound_min: i128,
    bound_max: i128,
) -> Result<i128, IntervalError> {
    if restr[*pos..].starts_with("min") {
        *pos += 3;
        return Ok(bound_min);
    }
    if restr[*pos..].starts_with("max") {
        *pos += 3;
        return Ok(bound_max);
    }
    parse_literal(restr, pos, kind)
}

fn parse_literal(restr: &str, pos: &mut usize, kind: IntervalKind) -> Result<i128, IntervalError> {
    let bytes = restr.as_bytes();
    let start = *pos;

    let mut negative = false;
    match bytes.get(*pos) {
        Some(b'+') => *pos += 1,
        Some(b'-') => {
            if matches!(kind, IntervalKind::Unsigned) {
                return Err(IntervalError::Syntax(*pos));
            }
            negative = true;
            *pos += 1;
        }
        _ => {}
    }

    let digits_start = *pos;
    while bytes.get(*pos).is_some_and(u8::is_ascii_digit) {
        *pos += 1;
    }
    if *pos == digits_start {
        return Err(IntervalError::Syntax(start));
    }
    if *pos - digits_start > 39 {
        return Err(IntervalError::PrecisionOverflow);
    }
    let mut value: i128 = restr[digits_start..*pos]
        .parse()
        .map_err(|_| IntervalError::PrecisionOverflow)?;

    // a dot starts a fractional part only when a digit follows; otherwise it
    // is the ".." separator
    let has_fraction =
        bytes.get(*pos) == Some(&b'.') && bytes.get(*pos + 1).is_some_and(u8::is_ascii_digit);

    let fraction_digits = match kind {
        IntervalKind::Decimal { fraction_digits } => fraction_digits,
        _ => {
            if has_fraction {
                return Err(IntervalError::Syntax(*pos));
            }
            return Ok(if negative { -value } else { value });
        }
    };

    // scale the integer part
    for _ in 0..fraction_digits {
        value = value
            .checked_mul(10)
            .ok_or(IntervalError::PrecisionOverflow)?;
    }

    // fractional part, at most fraction-digits digits
    if has_fraction {
        *pos += 1;
        let frac_start = *pos;
        while bytes.get(*pos).is_some_and(u8::is_ascii_digit) {
            *pos += 1;
        }
        let frac_len = *pos - frac_start;
        if frac_len > fraction_digits as usize {
            return Err(IntervalError::PrecisionOverflow);
        }
        let frac: i128 = restr[frac_start..*pos]
            .parse()
            .map_err(|_| IntervalError::PrecisionOverflow)?;
        let mut scaled = frac;
        for _ in 0..(fraction_digits as usize - frac_len) {
            scaled = scaled
                .checked_mul(10)
                .ok_or(IntervalError::PrecisionOverflow)?;
        }
        value = value
            .checked_add(scaled)
            .ok_or(IntervalError::PrecisionOverflow)?;
    }

    let value = if negative { -value } else { value };
    if value < i64::MIN as i128 || value > i64::MAX as i128 {
        if matches!(kind, IntervalKind::Decimal { .. }) {
            return Err(IntervalError::PrecisionOverflow);
        }
        if value > u64::MAX as i128 || value < i64::MIN as i128 {
            return Err(IntervalError::PrecisionOverflow);
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yang_compiler_schema::{Module, NodeFlags, TypeSpec, Typedef};

    fn ctx_with_module() -> (SchemaContext, yang_compiler_schema::ModuleId) {
        let mut ctx = SchemaContext::new();
        let name = ctx.intern("test-mod");
        let prefix = ctx.intern("t");
        let module = ctx.add_module(Module::new(name, prefix));
        (ctx, module)
    }

    /// `typedef` deriving from `base_of` with a local range.
    fn add_typedef(
        ctx: &mut SchemaContext,
        module: yang_compiler_schema::ModuleId,
        name: &str,
        base: BuiltinType,
        superior: Option<yang_compiler_schema::TypedefId>,
        range: Option<&str>,
    ) -> yang_compiler_schema::TypedefId {
        let mut spec = TypeSpec::named(None, name);
        spec.base = Some(base);
        spec.superior = superior;
        spec.range = range.map(str::to_string);
        let type_id = ctx.add_type(spec);
        let sym = ctx.intern(name);
        ctx.add_typedef(Typedef {
            name: sym,
            module,
            parent_node: None,
            type_id,
            units: None,
            default: None,
            flags: NodeFlags::empty(),
            description: None,
            reference: None,
        })
    }

    #[test]
    fn test_plain_builtin_range() {
        let (mut ctx, _m) = ctx_with_module();
        let mut spec = TypeSpec::builtin(BuiltinType::Uint8);
        spec.range = Some("1..10 | 20".to_string());
        let ty = ctx.add_type(spec);

        let set = resolve_intervals(&ctx, ty, RestrKind::Range).unwrap();
        assert_eq!(set.kind, IntervalKind::Unsigned);
        assert_eq!(
            set.intervals,
            vec![Interval::new(1, 10), Interval::new(20, 20)]
        );
    }

    #[test]
    fn test_builtin_domain_containment() {
        let (mut ctx, _m) = ctx_with_module();
        let mut spec = TypeSpec::builtin(BuiltinType::Uint8);
        spec.range = Some("0..300".to_string());
        let ty = ctx.add_type(spec);

        assert_eq!(
            resolve_intervals(&ctx, ty, RestrKind::Range),
            Err(IntervalError::NotContained)
        );
    }

    #[test]
    fn test_typedef_chain_narrowing() {
        // typedef T1 { type int32 { range "0..100" } }
        // typedef T2 { type T1 { range "10..50 | 80..90" } }
        // leaf L { type T2 { range "20..40" } }
        let (mut ctx, m) = ctx_with_module();
        let t1 = add_typedef(&mut ctx, m, "T1", BuiltinType::Int32, None, Some("0..100"));
        let t2 = add_typedef(
            &mut ctx,
            m,
            "T2",
            BuiltinType::Int32,
            Some(t1),
            Some("10..50 | 80..90"),
        );

        let mut leaf_type = TypeSpec::named(None, "T2");
        leaf_type.base = Some(BuiltinType::Int32);
        leaf_type.superior = Some(t2);
        leaf_type.range = Some("20..40".to_string());
        let ty = ctx.add_type(leaf_type);

        let set = resolve_intervals(&ctx, ty, RestrKind::Range).unwrap();
        assert_eq!(set.kind, IntervalKind::Signed);
        assert_eq!(set.intervals, vec![Interval::new(20, 40)]);
    }

    #[test]
    fn test_straddling_interval_rejected() {
        let (mut ctx, m) = ctx_with_module();
        let t1 = add_typedef(&mut ctx, m, "T1", BuiltinType::Int32, None, Some("0..100"));
        let t2 = add_typedef(
            &mut ctx,
            m,
            "T2",
            BuiltinType::Int32,
            Some(t1),
            Some("10..50 | 80..90"),
        );

        // 20..60 straddles out of the 10..50 base interval
        let mut leaf_type = TypeSpec::named(None, "T2");
        leaf_type.base = Some(BuiltinType::Int32);
        leaf_type.superior = Some(t2);
        leaf_type.range = Some("20..60".to_string());
        let ty = ctx.add_type(leaf_type);

        assert_eq!(
            resolve_intervals(&ctx, ty, RestrKind::Range),
            Err(IntervalError::NotContained)
        );
    }

    #[test]
    fn test_out_of_order_rejected() {
        let (mut ctx, _m) = ctx_with_module();
        let mut spec = TypeSpec::builtin(BuiltinType::Int32);
        spec.range = Some("50..60 | 10..20".to_string());
        let ty = ctx.add_type(spec);

        assert_eq!(
            resolve_intervals(&ctx, ty, RestrKind::Range),
            Err(IntervalError::OutOfOrder)
        );
    }

    #[test]
    fn test_min_max_tokens_resolve_to_base_bounds() {
        let (mut ctx, m) = ctx_with_module();
        let t1 = add_typedef(&mut ctx, m, "T1", BuiltinType::Int32, None, Some("10..100"));

        let mut leaf_type = TypeSpec::named(None, "T1");
        leaf_type.base = Some(BuiltinType::Int32);
        leaf_type.superior = Some(t1);
        leaf_type.range = Some("min..50 | max".to_string());
        let ty = ctx.add_type(leaf_type);

        let set = resolve_intervals(&ctx, ty, RestrKind::Range).unwrap();
        assert_eq!(
            set.intervals,
            vec![Interval::new(10, 50), Interval::new(100, 100)]
        );
    }

    #[test]
    fn test_decimal_mantissa_comparison() {
        let (mut ctx, _m) = ctx_with_module();
        let mut spec = TypeSpec::builtin(BuiltinType::Decimal64);
        spec.fraction_digits = Some(2);
        spec.range = Some("-1.5..2.25".to_string());
        let ty = ctx.add_type(spec);

        let set = resolve_intervals(&ctx, ty, RestrKind::Range).unwrap();
        assert_eq!(set.kind, IntervalKind::Decimal { fraction_digits: 2 });
        assert_eq!(set.intervals, vec![Interval::new(-150, 225)]);
    }

    #[test]
    fn test_decimal_precision_overflow() {
        let (mut ctx, _m) = ctx_with_module();
        let mut spec = TypeSpec::builtin(BuiltinType::Decimal64);
        spec.fraction_digits = Some(2);
        // three fractional digits under fraction-digits 2
        spec.range = Some("0.125..1".to_string());
        let ty = ctx.add_type(spec);

        assert_eq!(
            resolve_intervals(&ctx, ty, RestrKind::Range),
            Err(IntervalError::PrecisionOverflow)
        );
    }

    #[test]
    fn test_length_on_string() {
        let (mut ctx, _m) = ctx_with_module();
        let mut spec = TypeSpec::builtin(BuiltinType::String);
        spec.length = Some("1..255".to_string());
        let ty = ctx.add_type(spec);

        let set = resolve_intervals(&ctx, ty, RestrKind::Length).unwrap();
        assert_eq!(set.intervals, vec![Interval::new(1, 255)]);

        // range does not apply to string
        assert_eq!(
            resolve_intervals(&ctx, ty, RestrKind::Range),
            Err(IntervalError::NotApplicable)
        );
        assert_eq!(effective_intervals(&ctx, ty, RestrKind::Range), Ok(None));
    }

    #[test]
    fn test_unrestricted_inherits_base_set() {
        let (mut ctx, m) = ctx_with_module();
        let t1 = add_typedef(&mut ctx, m, "T1", BuiltinType::Uint16, None, Some("1..9"));

        let mut leaf_type = TypeSpec::named(None, "T1");
        leaf_type.base = Some(BuiltinType::Uint16);
        leaf_type.superior = Some(t1);
        let ty = ctx.add_type(leaf_type);

        let set = resolve_intervals(&ctx, ty, RestrKind::Range).unwrap();
        assert_eq!(set.intervals, vec![Interval::new(1, 9)]);
    }

    #[test]
    fn test_syntax_error_offset() {
        let (mut ctx, _m) = ctx_with_module();
        let mut spec = TypeSpec::builtin(BuiltinType::Uint8);
        spec.range = Some("1..x".to_string());
        let ty = ctx.add_type(spec);

        assert_eq!(
            resolve_intervals(&ctx, ty, RestrKind::Range),
            Err(IntervalError::Syntax(3))
        );
    }
}
