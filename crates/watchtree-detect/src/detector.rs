#![forbid(unsafe_code)]

//! Per-cycle walk over the enabled binding chain.
//!
//! A [`ChangeDetector`] owns one [`RecordTree`] rooted at a single range
//! that mirrors a view hierarchy. Each call to
//! [`ChangeDetector::run_cycle`] walks the enabled chain front to back and
//! hands every visited record to the caller's visitor. What the visitor
//! does with a binding — evaluation, comparison, notification — is
//! entirely its business; the detector only guarantees *which* records are
//! visited and in what order.
//!
//! Constant bindings are retired after their first visit: a `Const` record
//! can never change again, so the detector disables it once evaluated and
//! later cycles skip it for free. This is the one place the driver mutates
//! the tree on its own.

use tracing::{debug, trace};

use watchtree_core::{ProtoRecord, RangeId, RecordId, RecordKind, RecordTree};

/// Summary of one detection cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleStats {
    /// 1-based cycle number.
    pub cycle: u64,
    /// Number of records visited this cycle.
    pub visited: usize,
}

/// Detection driver: owns the binding tree and walks it once per cycle.
pub struct ChangeDetector<C> {
    tree: RecordTree<C>,
    root: RangeId,
    cycles: u64,
}

impl<C> Default for ChangeDetector<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ChangeDetector<C> {
    /// Create a detector with an empty root range.
    #[must_use]
    pub fn new() -> Self {
        let mut tree = RecordTree::new();
        let root = tree.new_range();
        Self {
            tree,
            root,
            cycles: 0,
        }
    }

    /// The root range mirroring the top of the view hierarchy.
    #[must_use]
    pub fn root(&self) -> RangeId {
        self.root
    }

    /// The underlying tree, for assembly and queries.
    #[must_use]
    pub fn tree(&self) -> &RecordTree<C> {
        &self.tree
    }

    /// Mutable access to the underlying tree.
    #[must_use]
    pub fn tree_mut(&mut self) -> &mut RecordTree<C> {
        &mut self.tree
    }

    /// Number of completed cycles.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Walk the enabled chain once, visiting every effectively-enabled
    /// record in structural order.
    ///
    /// The visitor receives the record id, its immutable template, and
    /// mutable access to its evaluation context.
    pub fn run_cycle<F>(&mut self, mut visit: F) -> CycleStats
    where
        F: FnMut(RecordId, &ProtoRecord, &mut C),
    {
        self.cycles += 1;
        let mut visited = 0;
        let mut cur = self.tree.find_first_enabled(self.root);
        while let Some(rec) = cur {
            // Capture the successor first: retiring a constant below
            // unlinks the current record.
            cur = self.tree.next_enabled(rec);
            let (proto, ctx) = self.tree.record_parts_mut(rec);
            let kind = proto.kind();
            visit(rec, proto, ctx);
            visited += 1;
            if kind == RecordKind::Const {
                trace!(record = ?rec, "retiring constant binding");
                self.tree.disable_record(rec);
            }
        }
        debug!(cycle = self.cycles, visited, "detection cycle complete");
        CycleStats {
            cycle: self.cycles,
            visited,
        }
    }
}
