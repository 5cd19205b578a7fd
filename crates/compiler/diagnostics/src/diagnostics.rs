//! Diagnostic records produced by schema and data resolution.
//!
//! A diagnostic carries a closed error code, the source path it applies to
//! (a schema path such as `/mod:a/b` or a data path with predicates) and a
//! formatted message. Formatting is decoupled from production: the resolver
//! only fills the record, rendering lives at the boundary.

use std::fmt;

/// A diagnostic message from schema or data resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: DiagnosticCode,
    pub message: String,
    /// Schema path (`/mod:a/b`) or data path (`/mod:list[k='v']/leaf`) the
    /// diagnostic applies to. Empty when no path is known.
    pub path: String,
    /// `error-app-tag` of a violated `must` constraint, surfaced to the
    /// caller for protocol-level reporting.
    pub app_tag: Option<String>,
    /// Additional context lines (secondary explanations).
    pub related: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// Closed catalog of resolution error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // Path syntax (100-199)
    PathInChar,
    PathInMod,
    PathMissMod,
    PathInNode,
    PathInKey,
    PathMissKey,
    PathExists,
    PathMissPar,

    // Identifiers and statements (200-299)
    InId,
    InMod,
    InStmt,
    InChildStmt,
    MissStmt,
    MissChildStmt,
    MissArg,
    TooMany,
    DupId,

    // List keys and unique (300-399)
    KeyNotLeaf,
    KeyType,
    KeyConfig,
    KeyMiss,
    KeyDup,
    NoUnique,

    // Constraints (400-499)
    InArg,
    InVal,
    NoConstraint,
    EnumDupVal,
    EnumDupName,
    EnumWhitespace,
    BitsDupVal,
    BitsDupName,

    // References (500-599)
    InResolve,
    NoResolvents,
    InStatus,
    NoLeafref,
    NoRequiredInstance,
    InWhen,

    // Conditions (600-699)
    NoMust,
    NoWhen,
    NoMandChoice,

    // Cardinality (700-799)
    NoMin,
    NoMax,
    DupLeafList,
    DupList,
    MultipleCaseData,

    // Reserved for invariant violations (900)
    Internal,
}

impl From<DiagnosticCode> for u32 {
    fn from(code: DiagnosticCode) -> Self {
        match code {
            DiagnosticCode::PathInChar => 101,
            DiagnosticCode::PathInMod => 102,
            DiagnosticCode::PathMissMod => 103,
            DiagnosticCode::PathInNode => 104,
            DiagnosticCode::PathInKey => 105,
            DiagnosticCode::PathMissKey => 106,
            DiagnosticCode::PathExists => 107,
            DiagnosticCode::PathMissPar => 108,
            DiagnosticCode::InId => 201,
            DiagnosticCode::InMod => 202,
            DiagnosticCode::InStmt => 203,
            DiagnosticCode::InChildStmt => 204,
            DiagnosticCode::MissStmt => 205,
            DiagnosticCode::MissChildStmt => 206,
            DiagnosticCode::MissArg => 207,
            DiagnosticCode::TooMany => 208,
            DiagnosticCode::DupId => 209,
            DiagnosticCode::KeyNotLeaf => 301,
            DiagnosticCode::KeyType => 302,
            DiagnosticCode::KeyConfig => 303,
            DiagnosticCode::KeyMiss => 304,
            DiagnosticCode::KeyDup => 305,
            DiagnosticCode::NoUnique => 306,
            DiagnosticCode::InArg => 401,
            DiagnosticCode::InVal => 402,
            DiagnosticCode::NoConstraint => 403,
            DiagnosticCode::EnumDupVal => 404,
            DiagnosticCode::EnumDupName => 405,
            DiagnosticCode::EnumWhitespace => 406,
            DiagnosticCode::BitsDupVal => 407,
            DiagnosticCode::BitsDupName => 408,
            DiagnosticCode::InResolve => 501,
            DiagnosticCode::NoResolvents => 502,
            DiagnosticCode::InStatus => 503,
            DiagnosticCode::NoLeafref => 504,
            DiagnosticCode::NoRequiredInstance => 505,
            DiagnosticCode::InWhen => 506,
            DiagnosticCode::NoMust => 601,
            DiagnosticCode::NoWhen => 602,
            DiagnosticCode::NoMandChoice => 603,
            DiagnosticCode::NoMin => 701,
            DiagnosticCode::NoMax => 702,
            DiagnosticCode::DupLeafList => 703,
            DiagnosticCode::DupList => 704,
            DiagnosticCode::MultipleCaseData => 705,
            DiagnosticCode::Internal => 900,
        }
    }
}

impl Diagnostic {
    /// Create an error diagnostic without a path.
    pub fn error(code: DiagnosticCode, message: String) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            code,
            message,
            path: String::new(),
            app_tag: None,
            related: Vec::new(),
        }
    }

    /// Create a warning diagnostic without a path.
    pub fn warning(code: DiagnosticCode, message: String) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            code,
            message,
            path: String::new(),
            app_tag: None,
            related: Vec::new(),
        }
    }

    /// Attach a source path to this diagnostic.
    pub fn with_path(mut self, path: String) -> Self {
        self.path = path;
        self
    }

    /// Attach an `error-app-tag` to this diagnostic.
    pub fn with_app_tag(mut self, tag: String) -> Self {
        self.app_tag = Some(tag);
        self
    }

    /// Attach a secondary explanation line.
    pub fn with_related(mut self, message: String) -> Self {
        self.related.push(message);
        self
    }

    /// Unexpected character while parsing a path or identifier.
    pub fn unexpected_char(rest: &str) -> Self {
        let ch = rest.chars().next().unwrap_or('\0');
        Self::error(
            DiagnosticCode::PathInChar,
            format!("Unexpected character '{ch}' ({rest:.15})."),
        )
    }

    /// Generic unresolved-reference error.
    pub fn unresolved(kind: &str, name: &str) -> Self {
        Self::error(
            DiagnosticCode::InResolve,
            format!("Failed to resolve {kind} \"{name}\"."),
        )
    }

    /// No resolvents found for a path expression.
    pub fn no_resolvents(expr: &str) -> Self {
        Self::error(
            DiagnosticCode::NoResolvents,
            format!("No resolvents found for \"{expr}\"."),
        )
    }

    /// Duplicated identifier within a kind-group.
    pub fn duplicate_id(kind: &str, name: &str) -> Self {
        Self::error(
            DiagnosticCode::DupId,
            format!("Duplicated {kind} identifier \"{name}\"."),
        )
    }

    /// Invalid value of a statement argument.
    pub fn invalid_arg(value: &str, stmt: &str) -> Self {
        Self::error(
            DiagnosticCode::InArg,
            format!("Invalid value \"{value}\" of \"{stmt}\"."),
        )
    }

    /// Status-compatibility violation between two definitions.
    pub fn status(from_status: &str, from_name: &str, to_status: &str, to_name: &str) -> Self {
        Self::error(
            DiagnosticCode::InStatus,
            format!(
                "A {from_status} definition \"{from_name}\" references {to_status} definition \"{to_name}\"."
            ),
        )
    }

    /// Internal invariant violation.
    pub fn internal(message: &str) -> Self {
        Self::error(DiagnosticCode::Internal, format!("Internal error: {message}."))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if !self.path.is_empty() {
            write!(f, " (path: {})", self.path)?;
        }
        for related in &self.related {
            write!(f, "\n  note: {related}")?;
        }
        Ok(())
    }
}

/// Collection of diagnostics from a resolution batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiagnosticCollection {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic to the collection.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Add multiple diagnostics.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// All diagnostics in production order.
    pub fn all(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Only error diagnostics.
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .collect()
    }

    /// Only warning diagnostics.
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    pub const fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Sort by severity (errors first), then by message.
    pub fn sort(&mut self) {
        self.diagnostics
            .sort_by(|a, b| a.severity.cmp(&b.severity).then_with(|| a.message.cmp(&b.message)));
    }

    /// Summary statistics line.
    pub fn summary(&self) -> String {
        if self.diagnostics.is_empty() {
            "No issues found".to_string()
        } else {
            format!("{} errors, {} warnings", self.errors().len(), self.warnings().len())
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }
}

impl From<Vec<Diagnostic>> for DiagnosticCollection {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

impl IntoIterator for DiagnosticCollection {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}
