//! Structural anomalies found while assembling the router tree.
//!
//! None of these stop initialization. Each one is logged through `tracing`
//! and kept on the [`Application`](crate::lifecycle::Application) so callers
//! can inspect them.

use serde::Serialize;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Reached through the tree but never declared as a controller.
    UndeclaredController,
    /// Action without an explicit route; a `GET /<name>` fallback was added.
    UndeclaredAction,
    /// Mount condition evaluated false; the subtree is not routed.
    DisabledController,
    /// Child whose declared parent was never registered.
    OrphanedController,
    /// Child that no root reaches, e.g. a mount cycle.
    UnreachableController,
    /// An explicitly required module group does not exist.
    MissingModule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn warn(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(kind = %kind, "{}", message);
        self.entries.push(Diagnostic { kind, message });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
