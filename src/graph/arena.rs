//! Flat storage for targets, toolchains, and pools.
//!
//! The arena owns every record and hands out small copyable ids. Labels map
//! to ids through hash lookups; the engine and the writers only ever hold
//! ids or borrowed references, never ownership.

use std::collections::HashMap;
use std::ops::Index;

use crate::label::Label;
use crate::target::Target;
use crate::toolchain::{Pool, Toolchain};

/// Index of a target in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u32);

impl TargetId {
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("arena index fits in u32"))
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a toolchain in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToolchainId(u32);

impl ToolchainId {
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("arena index fits in u32"))
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The resolved (or in-resolution) build graph.
#[derive(Debug, Default)]
pub struct BuildGraph {
    targets: Vec<Target>,
    targets_by_label: HashMap<Label, TargetId>,
    toolchains: Vec<Toolchain>,
    toolchains_by_label: HashMap<Label, ToolchainId>,
    pools: HashMap<Label, Pool>,
}

impl BuildGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a target; the label must not already be present.
    ///
    /// Returns `None` when a target with the same label already exists.
    pub fn insert_target(&mut self, target: Target) -> Option<TargetId> {
        if self.targets_by_label.contains_key(&target.label) {
            return None;
        }
        let id = TargetId::from_index(self.targets.len());
        self.targets_by_label.insert(target.label, id);
        self.targets.push(target);
        Some(id)
    }

    #[must_use]
    pub fn lookup(&self, label: &Label) -> Option<TargetId> {
        self.targets_by_label.get(label).copied()
    }

    #[must_use]
    pub fn target(&self, id: TargetId) -> &Target {
        &self.targets[id.index()]
    }

    pub fn target_mut(&mut self, id: TargetId) -> &mut Target {
        &mut self.targets[id.index()]
    }

    #[must_use]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// All targets with their ids, in insertion order.
    pub fn targets(&self) -> impl Iterator<Item = (TargetId, &Target)> {
        self.targets
            .iter()
            .enumerate()
            .map(|(index, target)| (TargetId::from_index(index), target))
    }

    /// Target ids sorted by label, the order emitters iterate in.
    #[must_use]
    pub fn targets_in_label_order(&self) -> Vec<TargetId> {
        let mut ids: Vec<TargetId> = (0..self.targets.len()).map(TargetId::from_index).collect();
        ids.sort_by(|a, b| self.target(*a).label.cmp(&self.target(*b).label));
        ids
    }

    /// Insert a toolchain, or return the existing id for its label.
    pub fn insert_toolchain(&mut self, toolchain: Toolchain) -> ToolchainId {
        if let Some(id) = self.toolchains_by_label.get(&toolchain.label) {
            return *id;
        }
        let id = ToolchainId::from_index(self.toolchains.len());
        self.toolchains_by_label.insert(toolchain.label, id);
        self.toolchains.push(toolchain);
        id
    }

    #[must_use]
    pub fn toolchain(&self, id: ToolchainId) -> &Toolchain {
        &self.toolchains[id.index()]
    }

    #[must_use]
    pub fn toolchain_by_label(&self, label: &Label) -> Option<ToolchainId> {
        self.toolchains_by_label.get(label).copied()
    }

    pub fn toolchains(&self) -> impl Iterator<Item = &Toolchain> {
        self.toolchains.iter()
    }

    /// Insert a pool keyed by its label. Reinsertion keeps the first record.
    pub fn insert_pool(&mut self, pool: Pool) {
        self.pools.entry(pool.label).or_insert(pool);
    }

    #[must_use]
    pub fn pool(&self, label: &Label) -> Option<&Pool> {
        self.pools.get(label)
    }

    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }
}

impl Index<TargetId> for BuildGraph {
    type Output = Target;

    fn index(&self, id: TargetId) -> &Target {
        self.target(id)
    }
}

impl Index<ToolchainId> for BuildGraph {
    type Output = Toolchain;

    fn index(&self, id: ToolchainId) -> &Toolchain {
        self.toolchain(id)
    }
}
