//! The resolution driver.
//!
//! [`resolve_all`] walks declared targets depth-first from the requested
//! roots, loading build files on demand, resolving every label in the
//! declaring directory's context, binding toolchains, and checking the
//! frozen-graph invariants. Errors are collected rather than short-circuited
//! so one broken file does not hide problems in another; any collected error
//! fails the run.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::ast::TargetDecl;
use crate::graph::{BuildGraph, TargetId};
use crate::label::{Label, LabelError};
use crate::lib_file::LibFile;
use crate::manifest::{FileLoader, LoadedFile, LoaderError};
use crate::source_dir::SourceDir;
use crate::target::{DepPair, OutputType, ResolveState, Target};
use crate::toolchain::{Pool, Toolchain, CONSOLE_POOL};

/// One problem found during resolution. Each carries the label or directory
/// it was found at.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A label string in a build file failed to parse.
    #[error("invalid label in {dir}")]
    BadLabel {
        dir: SourceDir,
        #[source]
        source: LabelError,
    },

    /// A dep names a target its build file does not declare.
    #[error("{dependent} depends on {label}, which is not declared")]
    MissingTarget { label: Label, dependent: Label },

    /// The `deps` relation loops back on itself.
    #[error("dependency cycle: {}", format_cycle(.cycle))]
    DependencyCycle { cycle: Vec<Label> },

    /// Two targets write the same output file.
    #[error("two or more targets generate the same output: {output}\n  {first}\n  {second}")]
    DuplicateOutput {
        output: Utf8PathBuf,
        first: Label,
        second: Label,
    },

    /// A target reached freeze without a toolchain.
    #[error("{label} has no toolchain")]
    ToolchainUnbound { label: Label },

    /// A referenced toolchain was never declared.
    #[error("toolchain {toolchain} is not defined")]
    UndefinedToolchain { toolchain: Label },

    /// A referenced pool was never declared.
    #[error("pool {pool} referenced by {label} is not defined")]
    UndefinedPool { pool: Label, label: Label },

    /// A private target was depended on from outside its directory.
    #[error("{dependent} may not depend on private target {dep}")]
    VisibilityViolation { dep: Label, dependent: Label },

    /// The dep's output type is not allowed in this position.
    #[error("{dependent} ({dependent_type}) may not depend on {dep} ({dep_type})")]
    IncompatibleDep {
        dependent: Label,
        dependent_type: OutputType,
        dep: Label,
        dep_type: OutputType,
    },

    /// One build file declares the same target name twice.
    #[error("duplicate target definition {label}")]
    DuplicateDefinition { label: Label },

    /// A target type that requires outputs declared none.
    #[error("{label} must declare at least one output")]
    MissingOutputs { label: Label },

    /// The external loader failed.
    #[error("failed to load build file for {dir}")]
    Loader {
        dir: SourceDir,
        #[source]
        source: LoaderError,
    },
}

fn format_cycle(cycle: &[Label]) -> String {
    let mut out = String::new();
    for (index, label) in cycle.iter().enumerate() {
        if index > 0 {
            out.push_str(" -> ");
        }
        out.push_str(&label.user_visible(false));
    }
    out
}

/// Every error collected during a failed resolution run.
#[derive(Debug)]
pub struct ResolveFailure {
    pub errors: Vec<ResolveError>,
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resolution failed with {} error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  {error}")?;
            let mut source = std::error::Error::source(error);
            while let Some(cause) = source {
                write!(f, ": {cause}")?;
                source = cause.source();
            }
        }
        Ok(())
    }
}

impl std::error::Error for ResolveFailure {}

/// Resolve every target reachable from `roots`.
///
/// Roots without a toolchain are qualified with `default_toolchain`. On
/// success the returned graph is frozen: every target is `Resolved` and
/// only read from then on.
///
/// # Errors
///
/// Returns a [`ResolveFailure`] carrying every collected [`ResolveError`].
pub fn resolve_all(
    loader: &mut dyn FileLoader,
    default_toolchain: &Label,
    roots: &[Label],
) -> Result<BuildGraph, ResolveFailure> {
    let mut resolver = Resolver::new(loader, *default_toolchain);
    resolver.check_default_toolchain();
    for root in roots {
        let root = if root.has_toolchain() {
            *root
        } else {
            Label::in_toolchain(*root.dir(), root.name(), default_toolchain)
        };
        resolver.resolve_target(root, None);
    }
    resolver.check_duplicate_outputs();
    resolver.finish()
}

enum DepKind {
    Private,
    Public,
    Data,
}

struct Resolver<'a> {
    loader: &'a mut dyn FileLoader,
    default_toolchain: Label,
    graph: BuildGraph,
    errors: Vec<ResolveError>,
    /// Labels currently on the DFS path, for cycle reporting.
    stack: Vec<Label>,
    /// Targets that already produced an error; suppresses cascades.
    failed: HashSet<Label>,
    /// Directories whose toolchains and pools are already registered.
    registered_dirs: HashSet<SourceDir>,
}

impl<'a> Resolver<'a> {
    fn new(loader: &'a mut dyn FileLoader, default_toolchain: Label) -> Self {
        let mut graph = BuildGraph::new();
        // Ninja's console pool exists without being declared.
        graph.insert_pool(Pool::new(
            Label::in_toolchain(SourceDir::source_root(), CONSOLE_POOL, &default_toolchain),
            1,
        ));
        Self {
            loader,
            default_toolchain,
            graph,
            errors: Vec::new(),
            stack: Vec::new(),
            failed: HashSet::new(),
            registered_dirs: HashSet::new(),
        }
    }

    fn finish(self) -> Result<BuildGraph, ResolveFailure> {
        if self.errors.is_empty() {
            Ok(self.graph)
        } else {
            Err(ResolveFailure {
                errors: self.errors,
            })
        }
    }

    fn check_default_toolchain(&mut self) {
        let toolchain = self.default_toolchain;
        if self.load(*toolchain.dir()).is_some()
            && self.graph.toolchain_by_label(&toolchain).is_none()
        {
            self.errors
                .push(ResolveError::UndefinedToolchain { toolchain });
        }
    }

    /// Load `dir` and register its toolchain and pool declarations once.
    fn load(&mut self, dir: SourceDir) -> Option<Arc<LoadedFile>> {
        let file = match self.loader.load(&dir) {
            Ok(file) => file,
            Err(source) => {
                self.errors.push(ResolveError::Loader { dir, source });
                return None;
            }
        };
        if self.registered_dirs.insert(dir) {
            self.register_declarations(&file);
        }
        Some(file)
    }

    fn register_declarations(&mut self, file: &LoadedFile) {
        let dir = file.dir;
        let mut seen = HashSet::new();
        for decl in &file.manifest.targets {
            if !seen.insert(decl.name.as_str()) {
                self.errors.push(ResolveError::DuplicateDefinition {
                    label: Label::new(dir, &decl.name),
                });
            }
        }
        for decl in &file.manifest.toolchains {
            self.graph
                .insert_toolchain(Toolchain::new(Label::new(dir, &decl.name)));
        }
        for decl in &file.manifest.pools {
            let toolchain = match &decl.toolchain {
                Some(spec) => match Label::resolve(&dir, None, spec) {
                    Ok(toolchain) => toolchain,
                    Err(source) => {
                        self.errors.push(ResolveError::BadLabel { dir, source });
                        continue;
                    }
                },
                None => self.default_toolchain,
            };
            self.graph.insert_pool(Pool::new(
                Label::in_toolchain(dir, &decl.name, &toolchain),
                decl.depth,
            ));
        }
    }

    /// Resolve one target, recursing into its deps. Returns `None` when the
    /// target (or anything below it) produced an error; the error itself is
    /// already collected.
    fn resolve_target(&mut self, label: Label, dependent: Option<Label>) -> Option<TargetId> {
        if self.failed.contains(&label) {
            return None;
        }
        let id = match self.graph.lookup(&label) {
            Some(id) => id,
            None => self.instantiate(label, dependent)?,
        };
        match self.graph.target(id).state() {
            ResolveState::Resolved => Some(id),
            ResolveState::Resolving => {
                let cycle = self.cycle_from(&label);
                self.errors.push(ResolveError::DependencyCycle { cycle });
                self.failed.insert(label);
                None
            }
            ResolveState::Declared => self.resolve_deps(id, label),
        }
    }

    /// Materialize `label`'s declaration into a `Declared` target.
    fn instantiate(&mut self, label: Label, dependent: Option<Label>) -> Option<TargetId> {
        let file = self.load(*label.dir())?;
        let Some(decl) = file
            .manifest
            .targets
            .iter()
            .find(|decl| decl.name == label.name())
        else {
            let dependent = dependent.unwrap_or(label);
            self.errors
                .push(ResolveError::MissingTarget { label, dependent });
            self.failed.insert(label);
            return None;
        };

        let Some(toolchain) = label.toolchain_label() else {
            self.errors.push(ResolveError::ToolchainUnbound { label });
            self.failed.insert(label);
            return None;
        };

        match self.declare(label, &toolchain, decl) {
            Some(target) => {
                tracing::debug!(target = %label, "declared");
                // lookup() miss was checked by the caller; duplicate names in
                // one file are reported by register_declarations.
                self.graph.insert_target(target)
            }
            None => {
                self.failed.insert(label);
                None
            }
        }
    }

    /// Build the target record, resolving every label-valued field in the
    /// declaring directory's context. Collects all field errors before
    /// giving up on the target.
    fn declare(&mut self, label: Label, toolchain: &Label, decl: &TargetDecl) -> Option<Target> {
        let dir = *label.dir();
        let mut ok = true;
        let mut target = Target::new(label, decl.output_type);

        let mut dep_list = |errors: &mut Vec<ResolveError>, specs: &[String]| -> Vec<DepPair> {
            let mut pairs = Vec::with_capacity(specs.len());
            for spec in specs {
                match Label::resolve(&dir, Some(toolchain), spec) {
                    Ok(dep) => pairs.push(DepPair::unresolved(dep)),
                    Err(source) => {
                        errors.push(ResolveError::BadLabel { dir, source });
                        ok = false;
                    }
                }
            }
            pairs
        };
        target.deps = dep_list(&mut self.errors, &decl.deps);
        target.public_deps = dep_list(&mut self.errors, &decl.public_deps);
        target.data_deps = dep_list(&mut self.errors, &decl.data_deps);

        for value in &decl.libs {
            target.libs.push(LibFile::resolve(&dir, value));
        }
        for spec in &decl.lib_dirs {
            match dir.resolve_dir(spec) {
                Ok(resolved) => target.lib_dirs.push(resolved),
                Err(source) => {
                    self.errors.push(ResolveError::BadLabel {
                        dir,
                        source: source.into(),
                    });
                    ok = false;
                }
            }
        }
        for spec in &decl.framework_dirs {
            match dir.resolve_dir(spec) {
                Ok(resolved) => target.framework_dirs.push(resolved),
                Err(source) => {
                    self.errors.push(ResolveError::BadLabel {
                        dir,
                        source: source.into(),
                    });
                    ok = false;
                }
            }
        }
        target.frameworks = decl.frameworks.clone();
        target.weak_frameworks = decl.weak_frameworks.clone();
        target.outputs = decl.outputs.iter().cloned().map(Utf8PathBuf::from).collect();
        target.public = decl.public;
        target.hard_dep = decl.hard_dep;

        if let Some(spec) = &decl.pool {
            match Label::resolve(&dir, Some(toolchain), spec) {
                Ok(pool) => target.pool = Some(pool),
                Err(source) => {
                    self.errors.push(ResolveError::BadLabel { dir, source });
                    ok = false;
                }
            }
        }

        if decl.output_type.must_declare_outputs() && target.outputs.is_empty() {
            self.errors.push(ResolveError::MissingOutputs { label });
            ok = false;
        }

        ok.then_some(target)
    }

    /// Walk the target's deps, then verify the freeze invariants.
    fn resolve_deps(&mut self, id: TargetId, label: Label) -> Option<TargetId> {
        self.graph.target_mut(id).begin_resolve();
        self.stack.push(label);

        let dependent_type = self.graph.target(id).output_type;
        let edges: Vec<(DepKind, usize, Label)> = {
            let target = self.graph.target(id);
            let tag = |kind: fn() -> DepKind, deps: &[DepPair]| {
                deps.iter()
                    .enumerate()
                    .map(|(index, dep)| (kind(), index, dep.label))
                    .collect::<Vec<_>>()
            };
            let mut edges = tag(|| DepKind::Private, &target.deps);
            edges.extend(tag(|| DepKind::Public, &target.public_deps));
            edges.extend(tag(|| DepKind::Data, &target.data_deps));
            edges
        };

        let mut ok = true;
        let mut bound: Vec<(DepKind, usize, TargetId)> = Vec::with_capacity(edges.len());
        for (kind, index, dep_label) in edges {
            let Some(dep_id) = self.resolve_target(dep_label, Some(label)) else {
                ok = false;
                continue;
            };
            let dep = self.graph.target(dep_id);
            if !dep.public && dep.label.dir() != label.dir() {
                self.errors.push(ResolveError::VisibilityViolation {
                    dep: dep.label,
                    dependent: label,
                });
                ok = false;
            }
            if !dependent_type.allows_dep_on(dep.output_type) {
                self.errors.push(ResolveError::IncompatibleDep {
                    dependent: label,
                    dependent_type,
                    dep: dep.label,
                    dep_type: dep.output_type,
                });
                ok = false;
            }
            bound.push((kind, index, dep_id));
        }
        self.stack.pop();

        for (kind, index, dep_id) in bound {
            let target = self.graph.target_mut(id);
            match kind {
                DepKind::Private => target.deps[index].id = Some(dep_id),
                DepKind::Public => target.public_deps[index].id = Some(dep_id),
                DepKind::Data => target.data_deps[index].id = Some(dep_id),
            }
        }

        ok &= self.bind_toolchain(id, label);
        ok &= self.check_pool(id, label);

        if ok {
            self.graph.target_mut(id).mark_resolved();
            tracing::debug!(target = %label, "resolved");
            Some(id)
        } else {
            self.failed.insert(label);
            None
        }
    }

    fn bind_toolchain(&mut self, id: TargetId, label: Label) -> bool {
        let Some(toolchain) = label.toolchain_label() else {
            self.errors.push(ResolveError::ToolchainUnbound { label });
            return false;
        };
        if self.load(*toolchain.dir()).is_none() {
            return false;
        }
        match self.graph.toolchain_by_label(&toolchain) {
            Some(toolchain_id) => {
                self.graph.target_mut(id).bind_toolchain(toolchain_id);
                true
            }
            None => {
                self.errors
                    .push(ResolveError::UndefinedToolchain { toolchain });
                false
            }
        }
    }

    fn check_pool(&mut self, id: TargetId, label: Label) -> bool {
        let Some(pool) = self.graph.target(id).pool else {
            return true;
        };
        if self.load(*pool.dir()).is_none() {
            return false;
        }
        if self.graph.pool(&pool).is_none() {
            self.errors.push(ResolveError::UndefinedPool { pool, label });
            return false;
        }
        true
    }

    /// The labels on the DFS path from the first occurrence of `label`,
    /// closed by repeating it, rotated so the smallest label leads.
    fn cycle_from(&self, label: &Label) -> Vec<Label> {
        let start = self
            .stack
            .iter()
            .position(|entry| entry == label)
            .unwrap_or(0);
        let mut cycle: Vec<Label> = self.stack[start..].to_vec();
        cycle.push(*label);
        canonicalize_cycle(cycle)
    }

    /// Report every pair of targets that write the same output file.
    fn check_duplicate_outputs(&mut self) {
        let mut first_writer: HashMap<&Utf8PathBuf, Label> = HashMap::new();
        let mut collisions = Vec::new();
        for id in self.graph.targets_in_label_order() {
            let target = self.graph.target(id);
            for output in &target.outputs {
                match first_writer.get(output) {
                    Some(first) => collisions.push(ResolveError::DuplicateOutput {
                        output: output.clone(),
                        first: *first,
                        second: target.label,
                    }),
                    None => {
                        first_writer.insert(output, target.label);
                    }
                }
            }
        }
        self.errors.extend(collisions);
    }
}

/// Rotate a cycle so the smallest label comes first, keeping the repeated
/// closing entry in sync. Cycle reports stay stable across traversal orders.
fn canonicalize_cycle(mut cycle: Vec<Label>) -> Vec<Label> {
    if cycle.len() < 2 {
        return cycle;
    }
    let len = cycle.len() - 1;
    let start = cycle
        .iter()
        .take(len)
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(index, _)| index);
    let (prefix, suffix) = cycle.split_at_mut(len);
    prefix.rotate_left(start);
    if let (Some(first), Some(slot)) = (prefix.first().copied(), suffix.first_mut()) {
        *slot = first;
    }
    cycle
}
