//! # YANG Schema Resolver
//!
//! The forward-reference resolver core of the YANG schema compiler: the
//! phase that runs after a module's syntactic skeleton is built and closes
//! every cross-reference in it.
//!
//! ## Architecture
//!
//! The resolver is a worklist-driven fixpoint engine layered as:
//!
//! 1. **Path micro-parsers** ([`path`]): recursive-descent recognizers for
//!    YANG's textual sub-languages (identifiers, nodeids, leafref paths,
//!    instance-identifiers, predicates)
//! 2. **Schema-tree lookup** ([`lookup`]): nodeid resolution over the
//!    partially built tree, honoring the shorthand-case rule
//! 3. **Interval-constraint engine** ([`interval`]): `range`/`length`
//!    merging across type-derivation chains with containment checking
//! 4. **Fixpoint drivers** ([`unres`]): the schema worklist (uses/derived
//!    types first, then the rest, then a diagnostic pass) and the data
//!    worklist (`when` first with auto-deletion, then the rest)
//! 5. **Application passes**: [`uses`] expansion with refinements,
//!    [`augment`] splicing and [`deviation`] application
//!
//! The XPath engine is a collaborator behind [`XPathEvaluator`]; the
//! resolver only schedules registrations and asks for verdicts.
//!
//! ## Entry points
//!
//! [`resolve_unres_schema`] drives a schema batch, [`resolve_unres_data`] a
//! data batch. Both are synchronous and single-owner: the caller hands the
//! context (and tree) in, and on the first hard error the partially
//! resolved state is left behind with all resolved portions intact.

pub mod augment;
pub mod cond;
pub mod deviation;
pub mod error;
pub mod feature;
pub mod ident;
pub mod instance;
pub mod interval;
pub mod keys;
pub mod leafref;
pub mod lookup;
pub mod path;
pub mod status;
pub mod type_resolution;
pub mod unres;
pub mod uses;

pub use cond::{WhenVerdict, XPathError, XPathEvaluator, XPathKind};
pub use error::{ResolveError, ResolveResult};
pub use interval::{Interval, IntervalError, IntervalKind, IntervalSet, RestrKind};
pub use lookup::{JsonNodeidFlavor, LookupError};
pub use unres::{
    resolve_unres_data, resolve_unres_schema, DataItem, IfFeatureTarget, ResolveFlags,
    SchemaItem, UnresData, UnresSchema,
};
