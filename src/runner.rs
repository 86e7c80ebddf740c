//! CLI execution and command dispatch logic.
//!
//! This module keeps [`main`] minimal: it loads the manifest tree, drives
//! resolution, and hands the resolved graph to whichever command the user
//! asked for. Failures surface as miette diagnostics via the crate's
//! `ResultExt` adapter.

use camino::Utf8PathBuf;
use miette::{miette, Result};

use crate::cli::{Cli, Commands};
use crate::desc;
use crate::diagnostics::ResultExt;
use crate::graph::{resolve_all, BuildGraph};
use crate::label::Label;
use crate::manifest::{DiskLoader, FileLoader};
use crate::ninja_gen;
use crate::resolved::ResolvedTargetData;
use crate::settings::BuildSettings;
use crate::source_dir::SourceDir;

/// Toolchain assumed when the root manifest does not name one.
const DEFAULT_TOOLCHAIN: &str = "//toolchain:default";

/// Execute the parsed [`Cli`] command.
///
/// # Errors
///
/// Returns an error when loading, resolution, or the command itself fails.
pub fn run(cli: &Cli) -> Result<()> {
    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)
            .diag_with(|| format!("failed to change directory to {dir}"))?;
    }
    match &cli.command {
        Commands::Gen { build_dir } => gen(cli, build_dir),
        Commands::Desc { build_dir, label } => describe(cli, build_dir, label),
        Commands::Serve { build_dir, socket } => serve(cli, build_dir, socket.as_deref()),
    }
}

/// Everything a command needs after resolution.
struct Session {
    settings: BuildSettings,
    graph: BuildGraph,
    default_toolchain: Label,
    manifest_paths: Vec<Utf8PathBuf>,
}

fn load_session(cli: &Cli, build_dir: &str) -> Result<Session> {
    let build_dir =
        SourceDir::new(build_dir).diag_with(|| format!("invalid build directory {build_dir}"))?;
    let settings = BuildSettings::new(cli.root.clone(), build_dir, cli.dotfile.clone());

    let mut loader = DiskLoader::new(settings.root_path().to_owned());
    let source_root = SourceDir::source_root();
    let root_file = loader
        .load(&source_root)
        .diag("failed to load the root manifest")?;

    let toolchain_spec = root_file
        .manifest
        .default_toolchain
        .clone()
        .unwrap_or_else(|| DEFAULT_TOOLCHAIN.to_owned());
    let default_toolchain = Label::resolve(&source_root, None, &toolchain_spec)
        .diag("invalid default_toolchain in the root manifest")?;

    let roots: Vec<Label> = root_file
        .manifest
        .targets
        .iter()
        .map(|decl| Label::in_toolchain(source_root, &decl.name, &default_toolchain))
        .collect();

    let graph =
        resolve_all(&mut loader, &default_toolchain, &roots).diag("resolving the target graph")?;
    tracing::info!(targets = graph.target_count(), "graph resolved");

    Ok(Session {
        settings,
        graph,
        default_toolchain,
        manifest_paths: loader.loaded_paths().to_vec(),
    })
}

fn gen(cli: &Cli, build_dir: &str) -> Result<()> {
    let session = load_session(cli, build_dir)?;
    let ninja = ninja_gen::generate(
        &session.settings,
        &session.graph,
        &session.default_toolchain,
    );

    let out_dir = session.settings.build_dir_path();
    std::fs::create_dir_all(&out_dir)
        .diag_with(|| format!("failed to create build directory {out_dir}"))?;

    let ninja_path = out_dir.join("build.ninja");
    std::fs::write(&ninja_path, ninja).diag_with(|| format!("failed to write {ninja_path}"))?;

    let depfile = render_depfile(&session.manifest_paths);
    let depfile_path = out_dir.join("build.ninja.d");
    std::fs::write(&depfile_path, depfile)
        .diag_with(|| format!("failed to write {depfile_path}"))?;

    println!("Wrote {ninja_path}");
    Ok(())
}

/// The depfile making Ninja re-run the generator when a manifest changes.
fn render_depfile(manifest_paths: &[Utf8PathBuf]) -> String {
    let mut out = String::from("build.ninja:");
    for path in manifest_paths {
        out.push(' ');
        out.push_str(path.as_str());
    }
    out.push('\n');
    out
}

fn describe(cli: &Cli, build_dir: &str, label_spec: &str) -> Result<()> {
    let session = load_session(cli, build_dir)?;
    let label = Label::resolve(
        &SourceDir::source_root(),
        Some(&session.default_toolchain),
        label_spec,
    )
    .diag_with(|| format!("invalid target label {label_spec}"))?;
    let id = session
        .graph
        .lookup(&label)
        .ok_or_else(|| miette!("no target named {label_spec}"))?;
    let data = ResolvedTargetData::new(&session.graph);
    print!(
        "{}",
        desc::describe(&session.graph, &data, id, &session.default_toolchain)
    );
    Ok(())
}

#[cfg(unix)]
fn serve(cli: &Cli, build_dir: &str, socket: Option<&camino::Utf8Path>) -> Result<()> {
    let session = load_session(cli, build_dir)?;
    let socket_path = match socket {
        Some(path) => path.to_owned(),
        None => session.settings.build_dir_path().join("kanna.sock"),
    };
    let server = crate::server::QueryServer::bind(
        &socket_path,
        &session.graph,
        session.default_toolchain,
    )?;
    server.run()
}

#[cfg(not(unix))]
fn serve(_cli: &Cli, _build_dir: &str, _socket: Option<&camino::Utf8Path>) -> Result<()> {
    miette::bail!("the query server requires a Unix platform")
}
