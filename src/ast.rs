//! Kannafile manifest Abstract Syntax Tree structures.
//!
//! This module defines the data structures used to represent a parsed
//! `Kannafile`, the per-directory build manifest. They are deserialised with
//! `serde_yml`; label-valued fields stay raw strings here and are resolved
//! against the declaring directory by the resolution driver.
//!
//! ```rust
//! use kanna::ast::KannaManifest;
//!
//! let yaml = "kanna_version: \"1.0.0\"\ntargets:\n  - name: hello\n    type: action\n    outputs: [\"//out/hello.out\"]";
//! let manifest: KannaManifest = serde_yml::from_str(yaml).expect("parse");
//! assert_eq!(manifest.targets[0].name, "hello");
//! ```
//!
//! Prefer the validating [`manifest::from_str`](crate::manifest::from_str)
//! helper, which reports parse failures as diagnostics with source spans.

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::target::OutputType;

/// Top-level structure parsed from a `Kannafile`.
///
/// Each field mirrors a key in the YAML manifest. Optional collections
/// default to empty to simplify deserialisation.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KannaManifest {
    /// Semantic version of the manifest format.
    pub kanna_version: Version,

    /// Label of the toolchain targets get when none is written. Only
    /// meaningful in the source root's manifest.
    #[serde(default)]
    pub default_toolchain: Option<String>,

    /// Toolchains this directory defines.
    #[serde(default)]
    pub toolchains: Vec<ToolchainDecl>,

    /// Pools this directory defines.
    #[serde(default)]
    pub pools: Vec<PoolDecl>,

    /// Targets this directory defines.
    #[serde(default)]
    pub targets: Vec<TargetDecl>,
}

/// A toolchain definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainDecl {
    /// Target-style name; the toolchain's label is the declaring directory
    /// plus this name.
    pub name: String,
}

/// A concurrency pool definition.
///
/// The pool's identity is the declaring directory plus `name`, qualified by
/// `toolchain` (or the default toolchain when omitted).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolDecl {
    pub name: String,
    /// Maximum concurrent actions; must be at least 1.
    pub depth: u32,
    /// Label of the toolchain this pool belongs to.
    #[serde(default)]
    pub toolchain: Option<String>,
}

/// A single target declaration.
///
/// Dependency and pool fields hold label strings exactly as written; the
/// driver resolves them in this directory's context.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDecl {
    /// The target's name within the declaring directory.
    pub name: String,

    /// What the target produces.
    #[serde(rename = "type")]
    pub output_type: OutputType,

    /// Files written under the build directory.
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Private dependencies.
    #[serde(default)]
    pub deps: Vec<String>,

    /// Dependencies whose public interface propagates onward.
    #[serde(default)]
    pub public_deps: Vec<String>,

    /// Runtime-only dependencies.
    #[serde(default)]
    pub data_deps: Vec<String>,

    /// Libraries to link: bare names or paths.
    #[serde(default)]
    pub libs: Vec<String>,

    /// Library search paths.
    #[serde(default)]
    pub lib_dirs: Vec<String>,

    /// macOS/iOS frameworks to link.
    #[serde(default)]
    pub frameworks: Vec<String>,

    /// Framework search paths.
    #[serde(default)]
    pub framework_dirs: Vec<String>,

    /// Frameworks linked weakly.
    #[serde(default)]
    pub weak_frameworks: Vec<String>,

    /// Whether targets in other directories may depend on this one.
    #[serde(default = "default_public")]
    pub public: bool,

    /// Forces dependents to wait for this target to finish.
    #[serde(default)]
    pub hard_dep: bool,

    /// Concurrency pool for this target's actions.
    #[serde(default)]
    pub pool: Option<String>,
}

fn default_public() -> bool {
    true
}
