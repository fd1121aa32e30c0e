#![forbid(unsafe_code)]

//! Structural kernel for dirty-checking change detection.
//!
//! # Role in watchtree
//! `watchtree-core` is the deterministic structural engine under the
//! change detector: an enable-aware tree of binding records grouped into
//! nested ranges, with an incrementally maintained skip chain over the
//! effectively-enabled leaves.
//!
//! # Primary responsibilities
//! - **ProtoRecord**: immutable binding templates from the compile
//!   pipeline.
//! - **RecordTree**: the record/range arena — O(1) insertion, removal,
//!   enabling and disabling of single bindings and whole subtrees.
//! - **Enabled chain**: `find_first_enabled`/`next_enabled` traversal that
//!   visits exactly the active bindings, in structural order, once each.
//! - **inspect**: diagnostic descriptions of live bindings.
//!
//! # How it fits in the system
//! The compile pipeline builds `ProtoRecord`s and assembles the tree to
//! mirror the view hierarchy; structural directives enable and disable
//! sub-ranges as views appear and disappear; `watchtree-detect` walks the
//! enabled chain once per detection cycle and evaluates each visited
//! record. This crate never interprets what a binding computes — only
//! whether and in what order it is visited.

pub mod inspect;
pub mod proto;
pub mod tree;

pub use proto::{ProtoRecord, RecordKind};
pub use tree::{Child, Children, EnabledRecords, RangeId, RecordId, RecordTree, StructureError};
