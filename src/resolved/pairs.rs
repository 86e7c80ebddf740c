//! Ordered, deduplicated `(target, is_public)` lists.

use indexmap::IndexMap;

use crate::graph::TargetId;

/// One inherited link-time library: the target and whether every hop on
/// some path to it was public.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetPublicPair {
    pub target: TargetId,
    pub is_public: bool,
}

/// Builds a pair list preserving first-insertion order. Re-pushing a target
/// never moves it; a public push upgrades a private entry in place.
#[derive(Default)]
pub(crate) struct PairListBuilder {
    entries: IndexMap<TargetId, bool>,
}

impl PairListBuilder {
    pub(crate) fn push(&mut self, target: TargetId, is_public: bool) {
        let entry = self.entries.entry(target).or_insert(is_public);
        // Once public, always public.
        *entry |= is_public;
    }

    /// The recorded publicness of `target`, if present.
    pub(crate) fn publicness(&self, target: TargetId) -> Option<bool> {
        self.entries.get(&target).copied()
    }

    pub(crate) fn finish(self) -> Vec<TargetPublicPair> {
        self.entries
            .into_iter()
            .map(|(target, is_public)| TargetPublicPair { target, is_public })
            .collect()
    }
}
