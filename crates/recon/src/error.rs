use std::fmt;

use serde::Serialize;

/// Fatal errors. Anything that can be scoped to one group, receipt or file
/// is a [`Diagnostic`] instead.
#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad default version, clashing dirs, etc.).
    ConfigValidation(String),
    /// Root input directory missing or unreadable. Halts before any output.
    MissingRoot(String),
    /// Two groups resolved to the same composite slug under the `reject` policy.
    DuplicateSlug { slug: String, first: String, second: String },
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingRoot(path) => write!(f, "input directory missing or unreadable: {path}"),
            Self::DuplicateSlug { slug, first, second } => {
                write!(f, "duplicate slug '{slug}': produced by '{first}' and '{second}'")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

// ---------------------------------------------------------------------------
// Non-fatal diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No groups, or a group without receipts or documents.
    MissingInput,
    /// Malformed receipt record.
    UnreadableReceipt,
    /// Declared target hash differs from the computed one.
    HashMismatch,
    /// No document could be paired with a receipt.
    UnmatchedReceipt,
    /// A single file could not be read, hashed, copied or linked.
    FileIo,
    /// Two groups resolved to the same composite slug.
    DuplicateSlug,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput => write!(f, "missing_input"),
            Self::UnreadableReceipt => write!(f, "unreadable_receipt"),
            Self::HashMismatch => write!(f, "hash_mismatch"),
            Self::UnmatchedReceipt => write!(f, "unmatched_receipt"),
            Self::FileIo => write!(f, "file_io"),
            Self::DuplicateSlug => write!(f, "duplicate_slug"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Group label, empty for run-level conditions.
    pub group: String,
    /// File name or slug the condition is about.
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(
        kind: DiagnosticKind,
        group: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            group: group.into(),
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn error(
        kind: DiagnosticKind,
        group: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            ..Self::warning(kind, group, subject, message)
        }
    }

    /// Forward to the `log` facade at the matching level.
    pub fn emit(&self) {
        match self.severity {
            Severity::Warning => log::warn!("[{}] {}: {}", self.kind, self.subject, self.message),
            Severity::Error => log::error!("[{}] {}: {}", self.kind, self.subject, self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}: {}: {}", self.kind, self.subject, self.message)
        } else {
            write!(f, "{} [{}] {}: {}", self.kind, self.group, self.subject, self.message)
        }
    }
}
