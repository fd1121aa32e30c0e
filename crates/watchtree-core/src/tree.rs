#![forbid(unsafe_code)]

//! Record/range tree with an incrementally maintained "enabled" skip chain.
//!
//! A [`RecordTree`] is an arena of two node kinds: record leaves (one live
//! binding each) and range composites (one view scope each). Ranges own an
//! ordered child list of records and nested ranges; every node carries an
//! enable flag. The tree maintains a doubly linked chain over the
//! effectively-enabled leaves so a detection cycle can visit exactly the
//! active bindings in structural order without rescanning.
//!
//! # Invariants
//!
//! 1. The forward walk ([`RecordTree::find_first_enabled`] +
//!    [`RecordTree::next_enabled`] to exhaustion) is the exact reverse of
//!    the backward walk ([`RecordTree::find_last_enabled`] +
//!    [`RecordTree::prev_enabled`]).
//! 2. Skip links always match a full rescan: a leaf is linked iff its own
//!    flag and every range flag up to its scope root are set.
//! 3. An empty range never alters an ancestor's traversal.
//! 4. Detaching a range preserves the relative traversal order inside the
//!    detached subtree, and the subtree stays queryable in isolation.
//! 5. Toggling a range's flag never touches descendant flags; re-enabling
//!    exposes exactly the descendants that stayed transitively enabled.
//!
//! # Scopes
//!
//! The *scope root* of a node is its nearest ancestor range that is
//! disabled or parentless. Inside every scope the chain over
//! scope-relative enabled leaves is kept fully linked at all times, with
//! the two ends severed (`None` outward). Disabling or detaching a range
//! therefore leaves its subtree carrying a self-contained chain, which is
//! what makes re-enabling and re-attaching an O(1) segment splice. Each
//! range caches the first/last chain leaf inside its own subtree
//! (computed relative to itself; its own flag does not gate its own find
//! ops). Caches are maintained eagerly on every mutation by an upward
//! walk with O(1) endpoint checks per ancestor.
//!
//! # Complexity
//!
//! | Operation | Time |
//! |-----------|------|
//! | add_record / add_range | O(1) splice + O(depth) cache walk |
//! | remove_range | O(1) bridge + O(depth) cache walk |
//! | disable (record or range) | O(1) bridge + O(depth) cache walk |
//! | enable (record or range) | neighbor scan bounded by tree shape |
//! | find_first_enabled / find_last_enabled | O(1) |
//! | next_enabled / prev_enabled | O(1) |

use std::fmt;

use crate::proto::ProtoRecord;

#[cfg(feature = "tracing")]
use tracing::trace;

/// Identifier of a record leaf. Only meaningful for the tree that minted it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordId(pub(crate) usize);

/// Identifier of a range composite. Only meaningful for the tree that minted it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RangeId(pub(crate) usize);

/// A direct child of a range, in structural order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Child {
    Record(RecordId),
    Range(RangeId),
}

/// Structural invariant violations raised by attach operations.
///
/// These indicate a defect in the calling pipeline; a corrupted chain would
/// silently skip or duplicate bindings on every later cycle, so the
/// offending attach is refused outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureError {
    /// The child range is already attached to a parent.
    AlreadyAttached,
    /// Attaching would nest a range inside its own subtree.
    CyclicNesting,
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyAttached => write!(f, "range is already attached to a parent"),
            Self::CyclicNesting => write!(f, "attaching range would nest it inside itself"),
        }
    }
}

impl std::error::Error for StructureError {}

struct RecordNode<C> {
    proto: ProtoRecord,
    ctx: C,
    prev_en: Option<RecordId>,
    next_en: Option<RecordId>,
}

struct RangeNode {
    first_child: Option<usize>,
    last_child: Option<usize>,
    /// First scope-relative enabled leaf in this range's subtree.
    first_en: Option<RecordId>,
    /// Last scope-relative enabled leaf in this range's subtree.
    last_en: Option<RecordId>,
}

enum Body<C> {
    Record(RecordNode<C>),
    Range(RangeNode),
}

struct Node<C> {
    parent: Option<RangeId>,
    prev_sib: Option<usize>,
    next_sib: Option<usize>,
    enabled: bool,
    body: Body<C>,
}

/// Arena-backed tree of record leaves and range composites.
///
/// `C` is the opaque per-record evaluation context handed back to the
/// detection driver on every visit; the tree never interprets it.
///
/// Detached ranges stay resident in the arena until the tree is dropped,
/// so their ids remain valid for re-attachment.
pub struct RecordTree<C> {
    nodes: Vec<Node<C>>,
}

impl<C> Default for RecordTree<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for RecordTree<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordTree")
            .field("records", &self.record_count())
            .field("ranges", &self.range_count())
            .finish()
    }
}

impl<C> RecordTree<C> {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Create a new detached, enabled, empty range.
    pub fn new_range(&mut self) -> RangeId {
        let slot = self.nodes.len();
        self.nodes.push(Node {
            parent: None,
            prev_sib: None,
            next_sib: None,
            enabled: true,
            body: Body::Range(RangeNode {
                first_child: None,
                last_child: None,
                first_en: None,
                last_en: None,
            }),
        });
        RangeId(slot)
    }

    /// Append a new record at the structural end of `range`.
    ///
    /// The record starts enabled and is immediately spliced into its
    /// scope's chain. Records stay attached to their range for life, so
    /// double-attachment is unrepresentable.
    pub fn add_record(&mut self, range: RangeId, proto: ProtoRecord, ctx: C) -> RecordId {
        let slot = self.nodes.len();
        self.nodes.push(Node {
            parent: None,
            prev_sib: None,
            next_sib: None,
            enabled: true,
            body: Body::Record(RecordNode {
                proto,
                ctx,
                prev_en: None,
                next_en: None,
            }),
        });
        self.append_child(range, slot);

        let id = RecordId(slot);
        let (p, n) = self.chain_neighbors(slot, range);
        self.link_segment(id, id, p, n);
        self.caches_after_link(range, id, id);
        #[cfg(feature = "tracing")]
        trace!(record = ?id, range = ?range, "add_record");
        id
    }

    /// Append `child` (a whole subtree) at the structural end of `parent`.
    ///
    /// The child's self-contained chain segment is spliced into the
    /// enclosing scope iff the child itself is enabled; its interior order
    /// is untouched either way.
    pub fn add_range(&mut self, parent: RangeId, child: RangeId) -> Result<(), StructureError> {
        if self.nodes[child.0].parent.is_some() {
            return Err(StructureError::AlreadyAttached);
        }
        let mut cursor = Some(parent);
        while let Some(r) = cursor {
            if r == child {
                return Err(StructureError::CyclicNesting);
            }
            cursor = self.nodes[r.0].parent;
        }

        self.append_child(parent, child.0);

        if self.nodes[child.0].enabled {
            let (first, last) = {
                let rn = self.rng(child);
                (rn.first_en, rn.last_en)
            };
            if let (Some(first), Some(last)) = (first, last) {
                let (p, n) = self.chain_neighbors(child.0, parent);
                self.link_segment(first, last, p, n);
                self.caches_after_link(parent, first, last);
            }
        }
        #[cfg(feature = "tracing")]
        trace!(child = ?child, parent = ?parent, "add_range");
        Ok(())
    }

    /// Detach `range` and its entire subtree from its parent.
    ///
    /// The enclosing chain is bridged across the removed span; the subtree
    /// keeps its internal chain and stays queryable in isolation. Safe
    /// no-op when the range is already detached.
    pub fn remove_range(&mut self, range: RangeId) {
        let Some(parent) = self.nodes[range.0].parent else {
            return;
        };
        if self.nodes[range.0].enabled {
            let (first, last) = {
                let rn = self.rng(range);
                (rn.first_en, rn.last_en)
            };
            if let (Some(first), Some(last)) = (first, last) {
                let (p, n) = self.unlink_segment(first, last);
                self.caches_after_unlink(parent, first, last, p, n);
            }
        }
        self.unlink_child(parent, range.0);
        #[cfg(feature = "tracing")]
        trace!(range = ?range, "remove_range");
    }

    /// Re-enable a record. Splices it back into its scope's chain at its
    /// structural position. Idempotent.
    pub fn enable_record(&mut self, rec: RecordId) {
        if self.nodes[rec.0].enabled {
            return;
        }
        self.nodes[rec.0].enabled = true;
        let owner = self.owner_of(rec);
        let (p, n) = self.chain_neighbors(rec.0, owner);
        self.link_segment(rec, rec, p, n);
        self.caches_after_link(owner, rec, rec);
        #[cfg(feature = "tracing")]
        trace!(record = ?rec, "enable_record");
    }

    /// Disable a record. Bridges the chain around it in O(1). Idempotent.
    pub fn disable_record(&mut self, rec: RecordId) {
        if !self.nodes[rec.0].enabled {
            return;
        }
        self.nodes[rec.0].enabled = false;
        let owner = self.owner_of(rec);
        let (p, n) = self.unlink_segment(rec, rec);
        self.caches_after_unlink(owner, rec, rec, p, n);
        #[cfg(feature = "tracing")]
        trace!(record = ?rec, "disable_record");
    }

    /// Re-enable a range. Splices the subtree's cached chain segment back
    /// into the enclosing scope at the range's structural position; the
    /// segment stayed self-consistent while the range was disabled.
    /// Idempotent.
    pub fn enable_range(&mut self, range: RangeId) {
        if self.nodes[range.0].enabled {
            return;
        }
        self.nodes[range.0].enabled = true;
        let Some(parent) = self.nodes[range.0].parent else {
            return;
        };
        let (first, last) = {
            let rn = self.rng(range);
            (rn.first_en, rn.last_en)
        };
        if let (Some(first), Some(last)) = (first, last) {
            let (p, n) = self.chain_neighbors(range.0, parent);
            self.link_segment(first, last, p, n);
            self.caches_after_link(parent, first, last);
        }
        #[cfg(feature = "tracing")]
        trace!(range = ?range, "enable_range");
    }

    /// Disable a range. Bridges the enclosing chain across the whole
    /// subtree span in O(1), regardless of subtree size; interior links
    /// and descendant flags are untouched. Idempotent.
    pub fn disable_range(&mut self, range: RangeId) {
        if !self.nodes[range.0].enabled {
            return;
        }
        if let Some(parent) = self.nodes[range.0].parent {
            let (first, last) = {
                let rn = self.rng(range);
                (rn.first_en, rn.last_en)
            };
            if let (Some(first), Some(last)) = (first, last) {
                let (p, n) = self.unlink_segment(first, last);
                self.caches_after_unlink(parent, first, last, p, n);
            }
        }
        self.nodes[range.0].enabled = false;
        #[cfg(feature = "tracing")]
        trace!(range = ?range, "disable_range");
    }

    // --- Queries ---

    /// First effectively-enabled leaf in this range's subtree, in
    /// structural order. O(1). The range's own flag does not gate its own
    /// find ops, so disabled and detached subtrees stay queryable.
    #[must_use]
    pub fn find_first_enabled(&self, range: RangeId) -> Option<RecordId> {
        self.rng(range).first_en
    }

    /// Last effectively-enabled leaf in this range's subtree. O(1).
    #[must_use]
    pub fn find_last_enabled(&self, range: RangeId) -> Option<RecordId> {
        self.rng(range).last_en
    }

    /// Next effectively-enabled leaf after `rec`, or `None` at the end of
    /// its scope's chain.
    #[must_use]
    pub fn next_enabled(&self, rec: RecordId) -> Option<RecordId> {
        self.rec(rec).next_en
    }

    /// Previous effectively-enabled leaf before `rec`.
    #[must_use]
    pub fn prev_enabled(&self, rec: RecordId) -> Option<RecordId> {
        self.rec(rec).prev_en
    }

    /// Whether the record's own flag is cleared.
    #[must_use]
    pub fn is_record_disabled(&self, rec: RecordId) -> bool {
        !self.nodes[rec.0].enabled
    }

    /// Whether the range's own flag is cleared.
    #[must_use]
    pub fn is_range_disabled(&self, range: RangeId) -> bool {
        !self.nodes[range.0].enabled
    }

    /// The record's immutable template.
    #[must_use]
    pub fn proto(&self, rec: RecordId) -> &ProtoRecord {
        &self.rec(rec).proto
    }

    /// The record's evaluation context.
    #[must_use]
    pub fn context(&self, rec: RecordId) -> &C {
        &self.rec(rec).ctx
    }

    /// Mutable access to the record's evaluation context.
    #[must_use]
    pub fn context_mut(&mut self, rec: RecordId) -> &mut C {
        &mut self.rec_mut(rec).ctx
    }

    /// The record's template together with mutable context access, for
    /// drivers that read the proto while updating evaluation state.
    #[must_use]
    pub fn record_parts_mut(&mut self, rec: RecordId) -> (&ProtoRecord, &mut C) {
        let node = self.rec_mut(rec);
        (&node.proto, &mut node.ctx)
    }

    /// The range that owns this record. Diagnostic use only.
    #[must_use]
    pub fn owner_of(&self, rec: RecordId) -> RangeId {
        self.nodes[rec.0]
            .parent
            .expect("record leaves are always attached to a range")
    }

    /// The range's parent, or `None` when detached or root.
    #[must_use]
    pub fn parent_of(&self, range: RangeId) -> Option<RangeId> {
        self.nodes[range.0].parent
    }

    /// Direct children of `range`, in structural order.
    pub fn children(&self, range: RangeId) -> Children<'_, C> {
        Children {
            tree: self,
            cur: self.rng(range).first_child,
        }
    }

    /// Effectively-enabled leaves of `range`, in structural order.
    ///
    /// Follows the chain between the range's cached boundaries, so
    /// disabled sub-ranges are skipped without being descended into.
    pub fn enabled_records(&self, range: RangeId) -> EnabledRecords<'_, C> {
        let rn = self.rng(range);
        EnabledRecords {
            tree: self,
            cur: rn.first_en,
            stop: rn.last_en,
        }
    }

    /// Number of record leaves in the arena, attached or detached.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.body, Body::Record(_)))
            .count()
    }

    /// Number of ranges in the arena, attached or detached.
    #[must_use]
    pub fn range_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.body, Body::Range(_)))
            .count()
    }

    // --- Node access ---

    fn rec(&self, id: RecordId) -> &RecordNode<C> {
        match &self.nodes[id.0].body {
            Body::Record(r) => r,
            Body::Range(_) => panic!("record id resolves to a range node"),
        }
    }

    fn rec_mut(&mut self, id: RecordId) -> &mut RecordNode<C> {
        match &mut self.nodes[id.0].body {
            Body::Record(r) => r,
            Body::Range(_) => panic!("record id resolves to a range node"),
        }
    }

    fn rng(&self, id: RangeId) -> &RangeNode {
        match &self.nodes[id.0].body {
            Body::Range(r) => r,
            Body::Record(_) => panic!("range id resolves to a record node"),
        }
    }

    fn rng_mut(&mut self, id: RangeId) -> &mut RangeNode {
        match &mut self.nodes[id.0].body {
            Body::Range(r) => r,
            Body::Record(_) => panic!("range id resolves to a record node"),
        }
    }

    // --- Structural child list ---

    fn append_child(&mut self, parent: RangeId, slot: usize) {
        match self.rng(parent).last_child {
            None => {
                let rn = self.rng_mut(parent);
                rn.first_child = Some(slot);
                rn.last_child = Some(slot);
            }
            Some(last) => {
                self.nodes[last].next_sib = Some(slot);
                self.nodes[slot].prev_sib = Some(last);
                self.rng_mut(parent).last_child = Some(slot);
            }
        }
        self.nodes[slot].parent = Some(parent);
    }

    fn unlink_child(&mut self, parent: RangeId, slot: usize) {
        let prev = self.nodes[slot].prev_sib;
        let next = self.nodes[slot].next_sib;
        match prev {
            Some(p) => self.nodes[p].next_sib = next,
            None => self.rng_mut(parent).first_child = next,
        }
        match next {
            Some(n) => self.nodes[n].prev_sib = prev,
            None => self.rng_mut(parent).last_child = prev,
        }
        let node = &mut self.nodes[slot];
        node.prev_sib = None;
        node.next_sib = None;
        node.parent = None;
    }

    // --- Scoped chain maintenance ---

    /// A range bounds its scope when it is disabled or parentless.
    fn is_scope_root(&self, range: RangeId) -> bool {
        let node = &self.nodes[range.0];
        !node.enabled || node.parent.is_none()
    }

    fn scope_root_from(&self, range: RangeId) -> RangeId {
        let mut r = range;
        while !self.is_scope_root(r) {
            match self.nodes[r.0].parent {
                Some(p) => r = p,
                None => break,
            }
        }
        r
    }

    /// Last chain leaf contributed by the subtree at `slot`, seen from its
    /// enclosing scope. `None` when the node is disabled or empty.
    fn last_visible_leaf(&self, slot: usize) -> Option<RecordId> {
        let node = &self.nodes[slot];
        if !node.enabled {
            return None;
        }
        match &node.body {
            Body::Record(_) => Some(RecordId(slot)),
            Body::Range(rn) => rn.last_en,
        }
    }

    /// Nearest chain leaf structurally before `start_slot` within its
    /// scope: scans left siblings (jumping whole sub-ranges via their
    /// caches), then climbs, stopping at the scope boundary.
    fn prev_in_scope(&self, start_slot: usize) -> Option<RecordId> {
        let mut cur = start_slot;
        loop {
            let mut sib = self.nodes[cur].prev_sib;
            while let Some(s) = sib {
                if let Some(hit) = self.last_visible_leaf(s) {
                    return Some(hit);
                }
                sib = self.nodes[s].prev_sib;
            }
            let owner = self.nodes[cur].parent?;
            if self.is_scope_root(owner) {
                return None;
            }
            cur = owner.0;
        }
    }

    /// Chain neighbors for a segment about to be spliced in at
    /// `start_slot` (a node inside `enclosing`). When nothing precedes the
    /// segment, its successor is the scope chain's current head.
    fn chain_neighbors(
        &self,
        start_slot: usize,
        enclosing: RangeId,
    ) -> (Option<RecordId>, Option<RecordId>) {
        match self.prev_in_scope(start_slot) {
            Some(p) => (Some(p), self.rec(p).next_en),
            None => (None, self.rng(self.scope_root_from(enclosing)).first_en),
        }
    }

    /// Link the self-contained segment `[first, last]` between `prev` and
    /// `next`.
    fn link_segment(
        &mut self,
        first: RecordId,
        last: RecordId,
        prev: Option<RecordId>,
        next: Option<RecordId>,
    ) {
        self.rec_mut(first).prev_en = prev;
        self.rec_mut(last).next_en = next;
        if let Some(p) = prev {
            self.rec_mut(p).next_en = Some(first);
        }
        if let Some(n) = next {
            self.rec_mut(n).prev_en = Some(last);
        }
    }

    /// Bridge the chain across `[first, last]` and sever the segment's
    /// outward links, leaving it self-contained. Returns the old outside
    /// neighbors.
    fn unlink_segment(
        &mut self,
        first: RecordId,
        last: RecordId,
    ) -> (Option<RecordId>, Option<RecordId>) {
        let prev = self.rec(first).prev_en;
        let next = self.rec(last).next_en;
        if let Some(p) = prev {
            self.rec_mut(p).next_en = next;
        }
        if let Some(n) = next {
            self.rec_mut(n).prev_en = prev;
        }
        self.rec_mut(first).prev_en = None;
        self.rec_mut(last).next_en = None;
        (prev, next)
    }

    /// After linking `[first, last]`, refresh boundary caches from `start`
    /// up to and including the scope root.
    ///
    /// Subtree spans are contiguous in structural order, so an ancestor's
    /// `first_en` moves to `first` exactly when it currently equals the
    /// segment's outward successor (symmetrically for `last_en`).
    fn caches_after_link(&mut self, start: RangeId, first: RecordId, last: RecordId) {
        let before = self.rec(first).prev_en;
        let after = self.rec(last).next_en;
        let mut a = start;
        loop {
            let rn = self.rng_mut(a);
            if rn.first_en.is_none() {
                rn.first_en = Some(first);
                rn.last_en = Some(last);
            } else {
                if rn.first_en == after {
                    rn.first_en = Some(first);
                }
                if rn.last_en == before {
                    rn.last_en = Some(last);
                }
            }
            if !self.nodes[a.0].enabled {
                break;
            }
            match self.nodes[a.0].parent {
                Some(p) => a = p,
                None => break,
            }
        }
    }

    /// After bridging across `[first, last]` (old outside neighbors
    /// `prev`/`next`), refresh boundary caches from `start` up to and
    /// including the scope root.
    fn caches_after_unlink(
        &mut self,
        start: RangeId,
        first: RecordId,
        last: RecordId,
        prev: Option<RecordId>,
        next: Option<RecordId>,
    ) {
        let mut a = start;
        loop {
            let rn = self.rng_mut(a);
            if rn.first_en == Some(first) && rn.last_en == Some(last) {
                rn.first_en = None;
                rn.last_en = None;
            } else if rn.first_en == Some(first) {
                rn.first_en = next;
            } else if rn.last_en == Some(last) {
                rn.last_en = prev;
            }
            if !self.nodes[a.0].enabled {
                break;
            }
            match self.nodes[a.0].parent {
                Some(p) => a = p,
                None => break,
            }
        }
    }
}

/// Iterator over a range's direct children in structural order.
pub struct Children<'a, C> {
    tree: &'a RecordTree<C>,
    cur: Option<usize>,
}

impl<C> Iterator for Children<'_, C> {
    type Item = Child;

    fn next(&mut self) -> Option<Child> {
        let slot = self.cur?;
        self.cur = self.tree.nodes[slot].next_sib;
        Some(match self.tree.nodes[slot].body {
            Body::Record(_) => Child::Record(RecordId(slot)),
            Body::Range(_) => Child::Range(RangeId(slot)),
        })
    }
}

/// Iterator over a range's effectively-enabled leaves in structural order.
pub struct EnabledRecords<'a, C> {
    tree: &'a RecordTree<C>,
    cur: Option<RecordId>,
    stop: Option<RecordId>,
}

impl<C> Iterator for EnabledRecords<'_, C> {
    type Item = RecordId;

    fn next(&mut self) -> Option<RecordId> {
        let rec = self.cur?;
        self.cur = if Some(rec) == self.stop {
            None
        } else {
            self.tree.rec(rec).next_en
        };
        Some(rec)
    }
}

// =========================================================================
// Tests
// =========================================================================
