#![forbid(unsafe_code)]

//! Diagnostic descriptions of live bindings.
//!
//! Descriptions are plain strings meant for logs and test assertions:
//! kind label, name, enable state, then group and source text when
//! present. A constant binding named `name` that is enabled describes
//! itself as `const, name, enabled, ...`.

use std::fmt::Write as _;

use crate::tree::{RangeId, RecordId, RecordTree};

impl<C> RecordTree<C> {
    /// Describe one record. Pure; never touches tree state.
    #[must_use]
    pub fn inspect_record(&self, rec: RecordId) -> String {
        let proto = self.proto(rec);
        let state = if self.is_record_disabled(rec) {
            "disabled"
        } else {
            "enabled"
        };
        let mut out = String::new();
        let _ = write!(out, "{}, {}, {}", proto.kind().label(), proto.name(), state);
        if !proto.group().is_empty() {
            let _ = write!(out, ", {}", proto.group());
        }
        if !proto.source().is_empty() {
            let _ = write!(out, ", \"{}\"", proto.source());
        }
        out
    }

    /// Describe every effectively-enabled leaf in `range`, in structural
    /// order. Disabled sub-ranges are skipped, not descended into.
    #[must_use]
    pub fn inspect_range(&self, range: RangeId) -> Vec<String> {
        self.enabled_records(range)
            .map(|rec| self.inspect_record(rec))
            .collect()
    }
}
