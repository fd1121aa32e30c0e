#![forbid(unsafe_code)]

//! Range templates from the compile pipeline.
//!
//! A [`ProtoRecordRange`] is the compile-time shape of one view scope: an
//! ordered list of binding templates. Instantiating it creates a fresh
//! range holding one live record per template, attached under a parent of
//! the caller's choosing — once per view instance, any number of times.

use watchtree_core::{ProtoRecord, RangeId, RecordTree, StructureError};

/// Ordered binding templates for one view scope.
#[derive(Clone, Debug, Default)]
pub struct ProtoRecordRange {
    protos: Vec<ProtoRecord>,
}

impl ProtoRecordRange {
    /// Create an empty template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding template at the structural end.
    pub fn push(&mut self, proto: ProtoRecord) {
        self.protos.push(proto);
    }

    /// Builder: append a binding template.
    #[must_use]
    pub fn with(mut self, proto: ProtoRecord) -> Self {
        self.protos.push(proto);
        self
    }

    /// Number of binding templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.protos.len()
    }

    /// Whether the template holds no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.protos.is_empty()
    }

    /// The templates in structural order.
    #[must_use]
    pub fn protos(&self) -> &[ProtoRecord] {
        &self.protos
    }

    /// Instantiate into a fresh range attached under `parent`.
    ///
    /// `make_ctx` produces the evaluation context for each record from its
    /// template.
    pub fn instantiate<C>(
        &self,
        tree: &mut RecordTree<C>,
        parent: RangeId,
        mut make_ctx: impl FnMut(&ProtoRecord) -> C,
    ) -> Result<RangeId, StructureError> {
        let range = tree.new_range();
        for proto in &self.protos {
            tree.add_record(range, proto.clone(), make_ctx(proto));
        }
        tree.add_range(parent, range)?;
        Ok(range)
    }
}
