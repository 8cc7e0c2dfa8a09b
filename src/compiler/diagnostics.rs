use std::fmt::Display;

use indexmap::IndexSet;
use serde_derive::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{result::NodeError, template::TemplateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
    /// Blocks producing program text.
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MissingInput,
    InvalidCast,
    TypeMismatch,
    UnknownOutput,
    DuplicateName,
    DuplicateChannel,
    CycleDetected,
    DepthExceeded,
    DanglingReference,
    AssetCompilationFailure,
    UnknownNode,
    InvalidSettings,
    FutureVersion,
    Validation,
    Node,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Node the diagnostic is attributed to, nil for graph level problems.
    pub node: Uuid,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, kind: DiagnosticKind, node: Uuid, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            node,
            message: message.into(),
        }
    }

    pub fn warning(kind: DiagnosticKind, node: Uuid, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, node, message)
    }

    pub fn error(kind: DiagnosticKind, node: Uuid, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, node, message)
    }

    pub fn fatal(kind: DiagnosticKind, node: Uuid, message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, kind, node, message)
    }

    /// Diagnostic for a node output that failed. `InvalidUpstream` and
    /// `Cycle` are reported where they originate, so they map to `None`.
    pub fn from_node_error(node: Uuid, err: &NodeError) -> Option<Self> {
        let message = err.to_string();
        Some(match err {
            NodeError::MissingInput(_) => Self::error(DiagnosticKind::MissingInput, node, message),
            NodeError::InvalidCast { .. } => Self::error(DiagnosticKind::InvalidCast, node, message),
            NodeError::TypeMismatch(_) => Self::error(DiagnosticKind::TypeMismatch, node, message),
            NodeError::UnknownOutput(_) => Self::error(DiagnosticKind::UnknownOutput, node, message),
            NodeError::DuplicateName(_) => Self::fatal(DiagnosticKind::DuplicateName, node, message),
            NodeError::Message(_) => Self::error(DiagnosticKind::Node, node, message),
            NodeError::InvalidUpstream(_) | NodeError::Cycle(_) => return None,
        })
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} [{:?}]", self.severity, self.kind)?;
        if !self.node.is_nil() {
            write!(f, " {}", self.node)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered, deduplicated diagnostic list of one compile pass.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: IndexSet<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self.entries.insert(diagnostic.clone()) {
            match diagnostic.severity {
                Severity::Warning => tracing::debug!(%diagnostic, "compile warning"),
                Severity::Error | Severity::Fatal => tracing::debug!(%diagnostic, "compile error"),
            }
        }
    }

    pub fn has_fatal(&self) -> bool {
        self.entries.iter().any(|x| x.severity == Severity::Fatal)
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|x| x.severity >= Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries.into_iter().collect()
    }
}

/// API misuse that prevents a compile pass from running at all. Problems in
/// the graph itself are reported as diagnostics instead.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("graph has no {0} node")]
    MissingRoot(&'static str),
    #[error("preview target is not connected")]
    PreviewTargetDisconnected,
    #[error("unknown preview target node: {0}")]
    UnknownPreviewTarget(Uuid),
    #[error("template error: {0}")]
    TemplateError(#[from] TemplateError),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_diagnostics_dedup_and_severity() {
        let node = Uuid::new_v4();
        let mut diagnostics = Diagnostics::default();
        diagnostics.push(Diagnostic::warning(DiagnosticKind::FutureVersion, node, "v3"));
        diagnostics.push(Diagnostic::warning(DiagnosticKind::FutureVersion, node, "v3"));
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics.has_errors());

        let err = NodeError::DuplicateName("Roughness".to_owned());
        diagnostics.push(Diagnostic::from_node_error(node, &err).unwrap());
        assert!(diagnostics.has_fatal());
        assert!(diagnostics.has_errors());

        let upstream = NodeError::InvalidUpstream("a".to_owned());
        assert!(Diagnostic::from_node_error(node, &upstream).is_none());
    }
}
