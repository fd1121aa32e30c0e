#![forbid(unsafe_code)]

//! Dirty-checking detection driver over the watchtree binding tree.
//!
//! # Role in watchtree
//! `watchtree-detect` sits on top of `watchtree-core`: it owns a binding
//! tree rooted at one range, instantiates compile-pipeline templates into
//! it, and walks the enabled chain once per detection cycle. Evaluation
//! and value comparison belong to the embedding UI layer; this crate only
//! delivers every active binding, in stable structural order, exactly
//! once per cycle.

pub mod detector;
pub mod proto_range;

pub use detector::{ChangeDetector, CycleStats};
pub use proto_range::ProtoRecordRange;
