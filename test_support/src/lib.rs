//! Shared helpers for kanna tests.
//!
//! [`TestSetup`] owns a build graph with a registered default toolchain and
//! offers a builder for already-resolved targets, so tests can construct
//! dependency trees in a few lines without driving the resolution pipeline.
//! [`MapLoader`] is an in-memory [`FileLoader`] for tests that do exercise
//! the driver.

use std::collections::HashMap;
use std::sync::Arc;

use camino::Utf8PathBuf;

use kanna::graph::{BuildGraph, TargetId, ToolchainId};
use kanna::label::Label;
use kanna::lib_file::LibFile;
use kanna::manifest::{self, FileLoader, LoadedFile, LoaderError, MANIFEST_FILE_NAME};
use kanna::source_dir::SourceDir;
use kanna::target::{DepPair, OutputType, Target};
use kanna::toolchain::{Pool, Toolchain};

/// Parse a source directory literal, panicking on bad test input.
#[must_use]
pub fn src_dir(value: &str) -> SourceDir {
    SourceDir::new(value).expect("valid source dir literal")
}

/// A graph under construction with a default toolchain already registered.
pub struct TestSetup {
    graph: BuildGraph,
    default_toolchain: Label,
}

impl TestSetup {
    /// A fresh graph whose default toolchain is `//toolchain:default`.
    #[must_use]
    pub fn new() -> Self {
        let default_toolchain = Label::new(src_dir("//toolchain/"), "default");
        let mut graph = BuildGraph::new();
        graph.insert_toolchain(Toolchain::new(default_toolchain));
        Self {
            graph,
            default_toolchain,
        }
    }

    #[must_use]
    pub fn graph(&self) -> &BuildGraph {
        &self.graph
    }

    #[must_use]
    pub fn into_graph(self) -> BuildGraph {
        self.graph
    }

    #[must_use]
    pub fn default_toolchain(&self) -> &Label {
        &self.default_toolchain
    }

    /// Register another toolchain and return its label.
    pub fn add_toolchain(&mut self, dir: &str, name: &str) -> Label {
        let label = Label::new(src_dir(dir), name);
        self.graph.insert_toolchain(Toolchain::new(label));
        label
    }

    /// Register a pool under `toolchain`.
    pub fn add_pool(&mut self, dir: &str, name: &str, toolchain: &Label, depth: u32) -> Label {
        let label = Label::in_toolchain(src_dir(dir), name, toolchain);
        self.graph.insert_pool(Pool::new(label, depth));
        label
    }

    /// Start building a resolved target from a label spec such as
    /// `//foo:bar` or `//baz:baz(//other:toolchain)`. An omitted toolchain
    /// inherits the default.
    pub fn target(&mut self, spec: &str, output_type: OutputType) -> TargetBuilder<'_> {
        let label = Label::resolve(
            &SourceDir::source_root(),
            Some(&self.default_toolchain),
            spec,
        )
        .expect("valid target label spec");
        TargetBuilder {
            setup: self,
            target: Target::new(label, output_type),
        }
    }
}

impl Default for TestSetup {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds one resolved target; [`TargetBuilder::finish`] freezes it into
/// the graph.
pub struct TargetBuilder<'a> {
    setup: &'a mut TestSetup,
    target: Target,
}

impl TargetBuilder<'_> {
    #[must_use]
    pub fn dep(mut self, dep: TargetId) -> Self {
        let pair = self.pair(dep);
        self.target.deps.push(pair);
        self
    }

    #[must_use]
    pub fn public_dep(mut self, dep: TargetId) -> Self {
        let pair = self.pair(dep);
        self.target.public_deps.push(pair);
        self
    }

    #[must_use]
    pub fn data_dep(mut self, dep: TargetId) -> Self {
        let pair = self.pair(dep);
        self.target.data_deps.push(pair);
        self
    }

    #[must_use]
    pub fn lib(mut self, value: &str) -> Self {
        let dir = *self.target.label.dir();
        self.target.libs.push(LibFile::resolve(&dir, value));
        self
    }

    #[must_use]
    pub fn lib_dir(mut self, value: &str) -> Self {
        self.target.lib_dirs.push(src_dir(value));
        self
    }

    #[must_use]
    pub fn framework(mut self, name: &str) -> Self {
        self.target.frameworks.push(name.to_owned());
        self
    }

    #[must_use]
    pub fn framework_dir(mut self, value: &str) -> Self {
        self.target.framework_dirs.push(src_dir(value));
        self
    }

    #[must_use]
    pub fn weak_framework(mut self, name: &str) -> Self {
        self.target.weak_frameworks.push(name.to_owned());
        self
    }

    #[must_use]
    pub fn output(mut self, path: &str) -> Self {
        self.target.outputs.push(Utf8PathBuf::from(path));
        self
    }

    #[must_use]
    pub fn hard_dep(mut self) -> Self {
        self.target.hard_dep = true;
        self
    }

    #[must_use]
    pub fn private(mut self) -> Self {
        self.target.public = false;
        self
    }

    #[must_use]
    pub fn pool(mut self, pool: Label) -> Self {
        self.target.pool = Some(pool);
        self
    }

    /// Freeze the target and insert it. The label's toolchain must already
    /// be registered on the setup.
    pub fn finish(mut self) -> TargetId {
        let toolchain = self
            .target
            .label
            .toolchain_label()
            .expect("target labels carry a toolchain");
        let toolchain_id: ToolchainId = self
            .setup
            .graph
            .toolchain_by_label(&toolchain)
            .expect("toolchain registered before use");
        self.target.begin_resolve();
        self.target.bind_toolchain(toolchain_id);
        self.target.mark_resolved();
        self.setup
            .graph
            .insert_target(self.target)
            .expect("unique target label")
    }

    fn pair(&self, dep: TargetId) -> DepPair {
        DepPair {
            label: self.setup.graph.target(dep).label,
            id: Some(dep),
        }
    }
}

/// In-memory manifest source for driver tests.
#[derive(Default)]
pub struct MapLoader {
    files: HashMap<SourceDir, Arc<LoadedFile>>,
}

impl MapLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `yaml` as the manifest of `dir`. Panics on invalid YAML so
    /// tests fail at the fixture, not the assertion.
    pub fn insert(&mut self, dir: &str, yaml: &str) -> &mut Self {
        let dir = src_dir(dir);
        let name = manifest_path(&dir);
        let manifest = manifest::from_str(yaml, name.as_str()).expect("valid fixture manifest");
        self.files
            .insert(dir, Arc::new(LoadedFile { dir, manifest }));
        self
    }
}

fn manifest_path(dir: &SourceDir) -> Utf8PathBuf {
    let mut path = Utf8PathBuf::new();
    for component in dir.components() {
        path.push(component);
    }
    path.push(MANIFEST_FILE_NAME);
    path
}

impl FileLoader for MapLoader {
    fn load(&mut self, dir: &SourceDir) -> Result<Arc<LoadedFile>, LoaderError> {
        self.files
            .get(dir)
            .map(Arc::clone)
            .ok_or_else(|| LoaderError::MissingBuildFile {
                dir: *dir,
                path: manifest_path(dir),
            })
    }
}

/// Assert that `haystack` contains `needle`, with a readable failure.
pub fn assert_contains(haystack: &str, needle: &str) {
    assert!(
        haystack.contains(needle),
        "expected to find:\n{needle}\nwithin:\n{haystack}"
    );
}
