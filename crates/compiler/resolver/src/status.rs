//! Status-compatibility checking.
//!
//! Within one main module, a definition may only reference definitions of
//! the same or a less mature status: `current` may not reference
//! `deprecated` or `obsolete`, and `deprecated` may not reference
//! `obsolete`. Cross-module references are exempt.

use yang_compiler_diagnostics::Diagnostic;
use yang_compiler_schema::{ModuleId, NodeFlags, SchemaContext};

/// Check that a reference from a definition with `from_flags` in
/// `from_module` to one with `to_flags` in `to_module` is
/// status-compatible.
pub fn check_status(
    ctx: &SchemaContext,
    from_flags: NodeFlags,
    from_module: ModuleId,
    from_name: &str,
    to_flags: NodeFlags,
    to_module: ModuleId,
    to_name: &str,
) -> Result<(), Diagnostic> {
    if ctx.main_module(from_module) != ctx.main_module(to_module) {
        return Ok(());
    }

    if from_flags.status_rank() < to_flags.status_rank() {
        return Err(Diagnostic::status(
            from_flags.status_name(),
            from_name,
            to_flags.status_name(),
            to_name,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use yang_compiler_schema::Module;

    fn two_modules() -> (SchemaContext, ModuleId, ModuleId) {
        let mut ctx = SchemaContext::new();
        let a_name = ctx.intern("mod-a");
        let a_prefix = ctx.intern("a");
        let a = ctx.add_module(Module::new(a_name, a_prefix));
        let b_name = ctx.intern("mod-b");
        let b_prefix = ctx.intern("b");
        let b = ctx.add_module(Module::new(b_name, b_prefix));
        (ctx, a, b)
    }

    #[test]
    fn test_current_may_not_reference_obsolete() {
        let (ctx, a, _) = two_modules();
        let err = check_status(
            &ctx,
            NodeFlags::empty(),
            a,
            "ref",
            NodeFlags::STATUS_OBSOLETE,
            a,
            "target",
        )
        .unwrap_err();
        assert!(err.message.contains("current"));
        assert!(err.message.contains("obsolete"));
    }

    #[test]
    fn test_deprecated_matrix() {
        let (ctx, a, _) = two_modules();
        // deprecated -> deprecated is fine
        assert!(check_status(
            &ctx,
            NodeFlags::STATUS_DEPRECATED,
            a,
            "x",
            NodeFlags::STATUS_DEPRECATED,
            a,
            "y"
        )
        .is_ok());
        // deprecated -> obsolete is not
        assert!(check_status(
            &ctx,
            NodeFlags::STATUS_DEPRECATED,
            a,
            "x",
            NodeFlags::STATUS_OBSOLETE,
            a,
            "y"
        )
        .is_err());
        // obsolete -> current is fine
        assert!(check_status(
            &ctx,
            NodeFlags::STATUS_OBSOLETE,
            a,
            "x",
            NodeFlags::empty(),
            a,
            "y"
        )
        .is_ok());
    }

    #[test]
    fn test_cross_module_references_exempt() {
        let (ctx, a, b) = two_modules();
        assert!(check_status(
            &ctx,
            NodeFlags::empty(),
            a,
            "x",
            NodeFlags::STATUS_OBSOLETE,
            b,
            "y"
        )
        .is_ok());
    }
}
