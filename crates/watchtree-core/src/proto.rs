#![forbid(unsafe_code)]

//! Immutable binding templates.
//!
//! A [`ProtoRecord`] describes one binding as produced by the compile
//! pipeline: what kind of access it performs, which sibling records feed it
//! (for multi-part expressions), and where it came from in the source. The
//! pipeline builds protos once per template position; the tree instantiates
//! one live record per proto per tree instance.
//!
//! Protos never change after construction. Everything observable about a
//! live record except its enable state comes from here.

use std::fmt;

/// The kind of access a binding performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecordKind {
    /// A literal value; never changes after the first cycle.
    Const,
    /// A property read on the context.
    Property,
    /// A method invocation on the context.
    InvokeMethod,
    /// A closure invocation.
    InvokeClosure,
    /// A pipe (value transformer) application.
    Pipe,
}

impl RecordKind {
    /// Short lowercase label used by diagnostics.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Const => "const",
            RecordKind::Property => "property",
            RecordKind::InvokeMethod => "method",
            RecordKind::InvokeClosure => "closure",
            RecordKind::Pipe => "pipe",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Default for RecordKind {
    fn default() -> Self {
        RecordKind::Property
    }
}

/// Immutable template for one binding.
///
/// Equality is by identity of the live record it backs; two protos with the
/// same fields are still distinct template positions, so `ProtoRecord`
/// deliberately does not implement `PartialEq`.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProtoRecord {
    kind: RecordKind,
    /// Indices of sibling records this record depends on.
    args: Vec<usize>,
    name: String,
    group: String,
    source: String,
}

impl ProtoRecord {
    /// Create a proto of the given kind and display name.
    #[must_use]
    pub fn new(kind: RecordKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            args: Vec::new(),
            name: name.into(),
            group: String::new(),
            source: String::new(),
        }
    }

    /// Builder: set dependency indices.
    #[must_use]
    pub fn with_args(mut self, args: Vec<usize>) -> Self {
        self.args = args;
        self
    }

    /// Builder: set group label.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Builder: set source expression text.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// The binding kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Dependency indices referencing sibling records.
    #[inline]
    #[must_use]
    pub fn args(&self) -> &[usize] {
        &self.args
    }

    /// Display name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Group label.
    #[inline]
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Source expression text.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}
