//! Memoized transitive queries over the resolved graph.
//!
//! [`ResolvedTargetData`] computes, on first request, everything a rule
//! emitter needs to know about a target's dependency tree: inherited
//! link-time libraries, the transitive `libs`/`lib_dirs`/framework lists,
//! and the hard-dep closure. Every answer is cached per target, so repeated
//! queries for targets sharing subtrees are cheap, and repeated calls return
//! the identical slice.
//!
//! The cache uses single-threaded interior mutability; an engine instance is
//! not shared across threads. Callers wanting parallel queries allocate one
//! engine per thread over the same graph, which is safe because resolved
//! targets are never mutated.

use std::cell::OnceCell;
use std::collections::{BTreeSet, HashMap};

use indexmap::IndexSet;

use crate::graph::{BuildGraph, TargetId};
use crate::lib_file::LibFile;
use crate::source_dir::SourceDir;
use crate::target::{OutputType, Target};

use super::pairs::PairListBuilder;
use super::TargetPublicPair;

/// Link-time library information for one target.
#[derive(Clone, Copy, Debug)]
pub struct LibInfo<'a> {
    pub all_lib_dirs: &'a [SourceDir],
    pub all_libs: &'a [LibFile],
}

/// Link-time framework information for one target.
#[derive(Clone, Copy, Debug)]
pub struct FrameworkInfo<'a> {
    pub all_framework_dirs: &'a [SourceDir],
    pub all_frameworks: &'a [String],
    pub all_weak_frameworks: &'a [String],
}

/// Everything the engine knows about one target. Built exactly once.
#[derive(Debug, Default)]
struct TargetInfo {
    all_lib_dirs: Vec<SourceDir>,
    all_libs: Vec<LibFile>,
    all_framework_dirs: Vec<SourceDir>,
    all_frameworks: Vec<String>,
    all_weak_frameworks: Vec<String>,
    recursive_hard_deps: Vec<TargetId>,
    inherited_libraries: Vec<TargetPublicPair>,
    rust_inherited_libraries: Vec<TargetPublicPair>,
}

/// Memoized transitive data over a resolved [`BuildGraph`].
pub struct ResolvedTargetData<'g> {
    graph: &'g BuildGraph,
    infos: Vec<OnceCell<TargetInfo>>,
}

impl<'g> ResolvedTargetData<'g> {
    /// An empty cache over `graph`. Cheap; allocate one per thread.
    #[must_use]
    pub fn new(graph: &'g BuildGraph) -> Self {
        let infos = std::iter::repeat_with(OnceCell::new)
            .take(graph.target_count())
            .collect();
        Self { graph, infos }
    }

    #[must_use]
    pub fn graph(&self) -> &'g BuildGraph {
        self.graph
    }

    /// Library search paths for the final link, in first-use order.
    #[must_use]
    pub fn all_lib_dirs(&self, target: TargetId) -> &[SourceDir] {
        &self.info(target).all_lib_dirs
    }

    /// Libraries for the final link: `-l` names and file paths.
    #[must_use]
    pub fn all_libs(&self, target: TargetId) -> &[LibFile] {
        &self.info(target).all_libs
    }

    /// Both library slices in one call.
    #[must_use]
    pub fn lib_info(&self, target: TargetId) -> LibInfo<'_> {
        let info = self.info(target);
        LibInfo {
            all_lib_dirs: &info.all_lib_dirs,
            all_libs: &info.all_libs,
        }
    }

    #[must_use]
    pub fn all_framework_dirs(&self, target: TargetId) -> &[SourceDir] {
        &self.info(target).all_framework_dirs
    }

    #[must_use]
    pub fn all_frameworks(&self, target: TargetId) -> &[String] {
        &self.info(target).all_frameworks
    }

    #[must_use]
    pub fn all_weak_frameworks(&self, target: TargetId) -> &[String] {
        &self.info(target).all_weak_frameworks
    }

    /// All three framework slices in one call.
    #[must_use]
    pub fn framework_info(&self, target: TargetId) -> FrameworkInfo<'_> {
        let info = self.info(target);
        FrameworkInfo {
            all_framework_dirs: &info.all_framework_dirs,
            all_frameworks: &info.all_frameworks,
            all_weak_frameworks: &info.all_weak_frameworks,
        }
    }

    /// Transitive deps that must finish before this target starts, sorted
    /// by id.
    #[must_use]
    pub fn recursive_hard_deps(&self, target: TargetId) -> &[TargetId] {
        &self.info(target).recursive_hard_deps
    }

    /// Inherited link-time libraries in declaration-then-depth order, each
    /// tagged public iff some path to it is public all the way.
    #[must_use]
    pub fn inherited_libraries(&self, target: TargetId) -> &[TargetPublicPair] {
        &self.info(target).inherited_libraries
    }

    /// Inherited libraries ordered for `rustc`: a DFS postorder across the
    /// link deps, so every entry's dependencies appear before it.
    #[must_use]
    pub fn rust_transitive_inherited_libs(&self, target: TargetId) -> &[TargetPublicPair] {
        &self.info(target).rust_inherited_libraries
    }

    fn info(&self, target: TargetId) -> &TargetInfo {
        debug_assert!(
            self.graph.target(target).is_resolved(),
            "querying an unresolved target"
        );
        self.infos[target.index()].get_or_init(|| self.compute(target))
    }

    fn compute(&self, id: TargetId) -> TargetInfo {
        let target = self.graph.target(id);

        let inherited_libraries = self.compute_inherited(target);
        let rust_inherited_libraries = self.compute_rust_inherited(id);
        let recursive_hard_deps = self.compute_hard_deps(target);

        // Library lists aggregate over the static-link inheritance, which
        // stops at shared library boundaries.
        let mut lib_dirs: IndexSet<SourceDir> = target.lib_dirs.iter().copied().collect();
        let mut libs: IndexSet<LibFile> = target.libs.iter().copied().collect();
        for pair in &inherited_libraries {
            let dep = self.graph.target(pair.target);
            lib_dirs.extend(dep.lib_dirs.iter().copied());
            libs.extend(dep.libs.iter().copied());
        }

        // Framework lists take their own walk: a shared library's frameworks
        // and those of everything beneath it still reach the final link, so
        // this recursion keeps crossing shared library boundaries.
        let mut framework_dirs: IndexSet<SourceDir> =
            target.framework_dirs.iter().copied().collect();
        let mut frameworks: IndexSet<String> = target.frameworks.iter().cloned().collect();
        let mut weak_frameworks: IndexSet<String> =
            target.weak_frameworks.iter().cloned().collect();
        for (dep_id, _) in target.link_dep_pairs() {
            if !self
                .graph
                .target(dep_id)
                .output_type
                .propagates_frameworks()
            {
                continue;
            }
            let dep_info = self.info(dep_id);
            framework_dirs.extend(dep_info.all_framework_dirs.iter().copied());
            frameworks.extend(dep_info.all_frameworks.iter().cloned());
            weak_frameworks.extend(dep_info.all_weak_frameworks.iter().cloned());
        }

        TargetInfo {
            all_lib_dirs: lib_dirs.into_iter().collect(),
            all_libs: libs.into_iter().collect(),
            all_framework_dirs: framework_dirs.into_iter().collect(),
            all_frameworks: frameworks.into_iter().collect(),
            all_weak_frameworks: weak_frameworks.into_iter().collect(),
            recursive_hard_deps,
            inherited_libraries,
            rust_inherited_libraries,
        }
    }

    /// Declaration-order walk over the link deps. Shared libraries stop the
    /// walk past themselves; groups pass their inheritance through without
    /// appearing; static libraries and source sets contribute themselves and
    /// their inheritance.
    fn compute_inherited(&self, target: &Target) -> Vec<TargetPublicPair> {
        let mut builder = PairListBuilder::default();
        for (dep_id, is_public) in target.link_dep_pairs() {
            let dep = self.graph.target(dep_id);
            match dep.output_type {
                OutputType::SharedLibrary => builder.push(dep_id, is_public),
                OutputType::Group => {
                    for pair in self.inherited_libraries(dep_id) {
                        builder.push(pair.target, is_public && pair.is_public);
                    }
                }
                OutputType::StaticLibrary | OutputType::SourceSet => {
                    builder.push(dep_id, is_public);
                    for pair in self.inherited_libraries(dep_id) {
                        builder.push(pair.target, is_public && pair.is_public);
                    }
                }
                _ => {}
            }
        }
        builder.finish()
    }

    fn compute_rust_inherited(&self, id: TargetId) -> Vec<TargetPublicPair> {
        let mut walk = RustWalk {
            graph: self.graph,
            builder: PairListBuilder::default(),
            group_publicness: HashMap::new(),
        };
        walk.visit_deps(id, true);
        walk.builder.finish()
    }

    fn compute_hard_deps(&self, target: &Target) -> Vec<TargetId> {
        let mut set = BTreeSet::new();
        for (dep_id, _) in target.link_dep_pairs() {
            if self.graph.target(dep_id).is_hard_dep() {
                set.insert(dep_id);
            }
            set.extend(self.recursive_hard_deps(dep_id).iter().copied());
        }
        set.into_iter().collect()
    }
}

/// Postorder DFS for the Rust link order. A node is appended after its own
/// deps, and revisited only when a later path upgrades it to public, which
/// bounds the walk at two passes per node.
struct RustWalk<'g> {
    graph: &'g BuildGraph,
    builder: PairListBuilder,
    /// Best publicness seen per group, tracked separately because groups
    /// never enter the list themselves.
    group_publicness: HashMap<TargetId, bool>,
}

impl RustWalk<'_> {
    fn visit_deps(&mut self, id: TargetId, path_public: bool) {
        let target = self.graph.target(id);
        for (dep_id, dep_public) in target.link_dep_pairs() {
            let is_public = path_public && dep_public;
            let dep = self.graph.target(dep_id);
            match dep.output_type {
                OutputType::SharedLibrary => self.builder.push(dep_id, is_public),
                OutputType::Group => match self.group_publicness.get(&dep_id) {
                    None => {
                        self.group_publicness.insert(dep_id, is_public);
                        self.visit_deps(dep_id, is_public);
                    }
                    Some(&seen) if !seen && is_public => {
                        self.group_publicness.insert(dep_id, true);
                        self.visit_deps(dep_id, is_public);
                    }
                    Some(_) => {}
                },
                OutputType::StaticLibrary | OutputType::SourceSet => {
                    match self.builder.publicness(dep_id) {
                        None => {
                            self.visit_deps(dep_id, is_public);
                            self.builder.push(dep_id, is_public);
                        }
                        Some(seen) if !seen && is_public => {
                            self.visit_deps(dep_id, is_public);
                            self.builder.push(dep_id, is_public);
                        }
                        Some(_) => {}
                    }
                }
                _ => {}
            }
        }
    }
}
