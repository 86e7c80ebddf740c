//! Ninja build file generator.
//!
//! Converts a resolved [`BuildGraph`] into the top-level `build.ninja`: the
//! self-invocation rule that regenerates the file when manifests change,
//! pool declarations, phony aliases for every target, and the aggregate
//! `all` target. Targets are emitted in label order so output is
//! deterministic for snapshot tests.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use itertools::Itertools;

use crate::graph::{BuildGraph, TargetId};
use crate::label::Label;
use crate::settings::BuildSettings;
use crate::toolchain::Pool;

/// Arguments the generated file uses to re-invoke the generator from inside
/// the build directory: `--root` pointing back at the source root and, when
/// a dotfile override is configured, `--dotfile` rewritten the same way.
#[must_use]
pub fn self_invocation_args(settings: &BuildSettings) -> Vec<String> {
    let mut args = vec![format!("--root={}", settings.build_dir_to_source_root())];
    if let Some(dotfile) = settings.dotfile() {
        args.push(format!("--dotfile={}", settings.rebase_to_build_dir(dotfile)));
    }
    args
}

/// Render the top-level `build.ninja` for a resolved graph.
#[must_use]
pub fn generate(
    settings: &BuildSettings,
    graph: &BuildGraph,
    default_toolchain: &Label,
) -> String {
    let mut out = String::new();
    let ordered = graph.targets_in_label_order();

    write_self_invocation(&mut out, settings);
    write_pools(&mut out, graph, &ordered, default_toolchain);
    write_subninjas(&mut out, graph, default_toolchain);
    write_phony_rules(&mut out, graph, &ordered);

    out
}

fn write_self_invocation(out: &mut String, settings: &BuildSettings) {
    writeln!(out, "rule kanna").expect("write Ninja rule");
    writeln!(
        out,
        "  command = kanna {} gen .",
        self_invocation_args(settings).iter().join(" ")
    )
    .expect("write Ninja rule");
    writeln!(out).expect("write Ninja rule");
    writeln!(out, "build build.ninja: kanna").expect("write Ninja rule");
    writeln!(out, "  generator = 1").expect("write Ninja rule");
    writeln!(out, "  depfile = build.ninja.d").expect("write Ninja rule");
    writeln!(out).expect("write Ninja rule");
}

/// Every pool referenced by a target, sorted by synthesized name. Ninja's
/// built-in console pool is never declared.
fn write_pools(
    out: &mut String,
    graph: &BuildGraph,
    ordered: &[TargetId],
    default_toolchain: &Label,
) {
    let mut referenced: HashSet<Label> = HashSet::new();
    for id in ordered {
        if let Some(pool) = graph.target(*id).pool {
            referenced.insert(pool);
        }
    }
    let mut pools: Vec<&Pool> = referenced
        .iter()
        .filter_map(|label| graph.pool(label))
        .filter(|pool| !pool.is_builtin_console(default_toolchain))
        .collect();
    pools.sort_by_key(|pool| pool.ninja_name(default_toolchain));

    for pool in pools {
        writeln!(out, "pool {}", pool.ninja_name(default_toolchain)).expect("write Ninja pool");
        writeln!(out, "  depth = {}", pool.depth).expect("write Ninja pool");
        writeln!(out).expect("write Ninja pool");
    }
}

/// One subninja per non-default toolchain, named after the toolchain.
fn write_subninjas(out: &mut String, graph: &BuildGraph, default_toolchain: &Label) {
    let mut names: Vec<&str> = graph
        .toolchains()
        .filter(|toolchain| toolchain.label != *default_toolchain)
        .map(|toolchain| toolchain.label.name())
        .collect();
    names.sort_unstable();
    for name in &names {
        writeln!(out, "subninja {name}.ninja").expect("write subninja");
    }
    if !names.is_empty() {
        writeln!(out).expect("write subninja");
    }
}

/// Phony aliases: a short name when it is unambiguous, the directory path
/// when the target is named after its directory, and always the full
/// `dir:name` spelling. Ends with the aggregate `all` target.
fn write_phony_rules(out: &mut String, graph: &BuildGraph, ordered: &[TargetId]) {
    // Directory aliases are unique by construction and win over short
    // names; short names are only written when exactly one target wants
    // them and no directory alias claims the same string.
    let mut dir_aliases: HashMap<String, TargetId> = HashMap::new();
    let mut short_counts: HashMap<&str, usize> = HashMap::new();
    for id in ordered {
        let label = &graph.target(*id).label;
        if label.dir().last_component() == label.name() {
            dir_aliases.insert(dir_without_slashes(label), *id);
        } else {
            *short_counts.entry(label.name()).or_insert(0) += 1;
        }
    }

    for id in ordered {
        let label = &graph.target(*id).label;
        let stamp = stamp_path(label);
        if label.dir().last_component() == label.name() {
            write_phony(out, &dir_without_slashes(label), &stamp);
        } else if short_counts.get(label.name()) == Some(&1)
            && !dir_aliases.contains_key(label.name())
        {
            write_phony(out, label.name(), &stamp);
        }
    }
    for id in ordered {
        let label = &graph.target(*id).label;
        write_phony(out, &long_alias(label), &stamp_path(label));
    }

    if ordered.is_empty() {
        return;
    }
    out.push_str("build all: phony");
    for id in ordered {
        let stamp = stamp_path(&graph.target(*id).label);
        write!(out, " $\n    {stamp}").expect("write all target");
    }
    out.push('\n');
    writeln!(out, "default all").expect("write default");
}

fn write_phony(out: &mut String, alias: &str, stamp: &str) {
    writeln!(out, "build {}: phony {}", ninja_escape(alias), stamp).expect("write phony rule");
}

/// `//foo/bar/` -> `foo/bar`; the source root contributes nothing.
fn dir_without_slashes(label: &Label) -> String {
    label
        .dir()
        .display_no_slash()
        .trim_start_matches('/')
        .to_owned()
}

/// `//foo:bar` -> `foo:bar`, `//:top` -> `:top`.
fn long_alias(label: &Label) -> String {
    let dir = dir_without_slashes(label);
    format!("{dir}:{}", label.name())
}

/// The stamp file collecting a target's outputs: `obj/<dir>/<name>.stamp`.
fn stamp_path(label: &Label) -> String {
    let dir = dir_without_slashes(label);
    if dir.is_empty() {
        format!("obj/{}.stamp", label.name())
    } else {
        format!("obj/{dir}/{}.stamp", label.name())
    }
}

/// Escape `$`, space, and `:` the way Ninja expects in build lines.
fn ninja_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '$' => out.push_str("$$"),
            ' ' => out.push_str("$ "),
            ':' => out.push_str("$:"),
            _ => out.push(ch),
        }
    }
    out
}
