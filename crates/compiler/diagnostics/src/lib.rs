//! # Diagnostic System for Schema Resolution
//!
//! This crate provides the diagnostic infrastructure for reporting errors
//! found while resolving YANG schema and instance-data references: structured
//! records carrying an error code, a source path and a formatted message.

mod diagnostics;

pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollection, DiagnosticSeverity};
