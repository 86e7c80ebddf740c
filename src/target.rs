//! Build target records and their resolution states.
//!
//! A [`Target`] starts life *declared*: its dependency lists hold labels the
//! resolution driver has not yet bound to arena entries. The driver walks it
//! through [`ResolveState::Resolving`] to [`ResolveState::Resolved`], after
//! which the record is frozen and only read.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::graph::{TargetId, ToolchainId};
use crate::label::Label;
use crate::lib_file::LibFile;
use crate::source_dir::SourceDir;

/// What a target produces. Drives link inheritance and hard-dep semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    Executable,
    SharedLibrary,
    StaticLibrary,
    SourceSet,
    Action,
    ActionForeach,
    Copy,
    Group,
    GeneratedFile,
    BundleData,
    CreateBundle,
}

impl OutputType {
    /// Targets that produce a linkable artifact of their own.
    #[must_use]
    pub fn is_linkable(self) -> bool {
        matches!(self, Self::SharedLibrary | Self::StaticLibrary)
    }

    /// Targets that are always hard deps: their rules must run before any
    /// dependent compiles, even without a file edge.
    #[must_use]
    pub fn is_hard(self) -> bool {
        matches!(
            self,
            Self::Action | Self::ActionForeach | Self::Copy | Self::BundleData | Self::CreateBundle
        )
    }

    /// Groups forward their deps without contributing an artifact.
    #[must_use]
    pub fn is_group(self) -> bool {
        matches!(self, Self::Group)
    }

    /// Targets whose framework requirements flow on to dependents. Unlike
    /// the static-link walk, this set includes shared libraries: their
    /// frameworks are still needed at the dependent's final link.
    #[must_use]
    pub fn propagates_frameworks(self) -> bool {
        matches!(
            self,
            Self::SharedLibrary | Self::StaticLibrary | Self::SourceSet | Self::Group
        )
    }

    /// Targets whose manifests must list at least one output file.
    #[must_use]
    pub fn must_declare_outputs(self) -> bool {
        matches!(self, Self::Action | Self::ActionForeach | Self::Copy)
    }

    /// Whether a target of this type may depend on a `dep`-typed target.
    /// `bundle_data` only feeds bundles and the groups that gather them.
    #[must_use]
    pub fn allows_dep_on(self, dep: Self) -> bool {
        match dep {
            Self::BundleData => {
                matches!(self, Self::BundleData | Self::CreateBundle | Self::Group)
            }
            _ => true,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Executable => "executable",
            Self::SharedLibrary => "shared_library",
            Self::StaticLibrary => "static_library",
            Self::SourceSet => "source_set",
            Self::Action => "action",
            Self::ActionForeach => "action_foreach",
            Self::Copy => "copy",
            Self::Group => "group",
            Self::GeneratedFile => "generated_file",
            Self::BundleData => "bundle_data",
            Self::CreateBundle => "create_bundle",
        }
    }
}

impl std::fmt::Display for OutputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a target is in the resolution pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResolveState {
    #[default]
    Declared,
    Resolving,
    Resolved,
}

/// One dependency edge: the resolved label, and the arena entry it binds to
/// once the driver has resolved the dep.
#[derive(Clone, Copy, Debug)]
pub struct DepPair {
    pub label: Label,
    pub id: Option<TargetId>,
}

impl DepPair {
    #[must_use]
    pub fn unresolved(label: Label) -> Self {
        Self { label, id: None }
    }
}

/// A build target: declared configuration plus resolution state.
#[derive(Debug)]
pub struct Target {
    pub label: Label,
    pub output_type: OutputType,

    /// Private deps, in declaration order.
    pub deps: Vec<DepPair>,
    /// Deps whose public interface propagates onward.
    pub public_deps: Vec<DepPair>,
    /// Runtime-only deps; never part of link inheritance.
    pub data_deps: Vec<DepPair>,

    pub libs: Vec<LibFile>,
    pub lib_dirs: Vec<SourceDir>,
    pub frameworks: Vec<String>,
    pub framework_dirs: Vec<SourceDir>,
    pub weak_frameworks: Vec<String>,

    /// Files this target writes under the build directory.
    pub outputs: Vec<Utf8PathBuf>,

    /// Whether other directories may depend on this target.
    pub public: bool,
    /// Forces dependents to wait for this target even without a file edge.
    pub hard_dep: bool,
    /// Concurrency pool for this target's actions, if any.
    pub pool: Option<Label>,

    toolchain: Option<ToolchainId>,
    state: ResolveState,
}

impl Target {
    #[must_use]
    pub fn new(label: Label, output_type: OutputType) -> Self {
        Self {
            label,
            output_type,
            deps: Vec::new(),
            public_deps: Vec::new(),
            data_deps: Vec::new(),
            libs: Vec::new(),
            lib_dirs: Vec::new(),
            frameworks: Vec::new(),
            framework_dirs: Vec::new(),
            weak_frameworks: Vec::new(),
            outputs: Vec::new(),
            public: true,
            hard_dep: false,
            pool: None,
            toolchain: None,
            state: ResolveState::Declared,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ResolveState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.state == ResolveState::Resolved
    }

    /// Enter the `Resolving` state. Only valid from `Declared`.
    pub fn begin_resolve(&mut self) {
        debug_assert_eq!(self.state, ResolveState::Declared);
        self.state = ResolveState::Resolving;
    }

    /// Freeze the target. Only valid from `Resolving` with a bound toolchain;
    /// the driver verifies the toolchain before calling this.
    pub fn mark_resolved(&mut self) {
        debug_assert_eq!(self.state, ResolveState::Resolving);
        debug_assert!(self.toolchain.is_some(), "freezing without a toolchain");
        self.state = ResolveState::Resolved;
    }

    pub fn bind_toolchain(&mut self, toolchain: ToolchainId) {
        debug_assert_ne!(self.state, ResolveState::Resolved, "mutating a frozen target");
        self.toolchain = Some(toolchain);
    }

    #[inline]
    #[must_use]
    pub fn toolchain(&self) -> Option<ToolchainId> {
        self.toolchain
    }

    /// True when this target must complete before dependents start.
    #[must_use]
    pub fn is_hard_dep(&self) -> bool {
        self.hard_dep || self.output_type.is_hard()
    }

    /// Link-relevant deps in declaration order: public deps first, each
    /// tagged with its publicness. Data deps are excluded.
    pub fn link_dep_pairs(&self) -> impl Iterator<Item = (TargetId, bool)> + '_ {
        self.public_deps
            .iter()
            .map(|dep| (dep, true))
            .chain(self.deps.iter().map(|dep| (dep, false)))
            .filter_map(|(dep, is_public)| dep.id.map(|id| (id, is_public)))
    }

}
