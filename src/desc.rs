//! Human-readable target descriptions.
//!
//! Renders one resolved target the way the `desc` command prints it: the
//! declared configuration first, then the transitive answers from the
//! resolved-data engine. Empty sections are skipped.

use std::fmt::Write;

use crate::graph::{BuildGraph, TargetId};
use crate::label::Label;
use crate::resolved::ResolvedTargetData;
use crate::target::DepPair;

/// Describe `target` as a multi-line string.
#[must_use]
pub fn describe(
    graph: &BuildGraph,
    data: &ResolvedTargetData<'_>,
    target: TargetId,
    default_toolchain: &Label,
) -> String {
    let t = graph.target(target);
    let mut out = String::new();
    let show = |label: &Label| label.user_visible_with_default(default_toolchain);

    writeln!(out, "{}", show(&t.label)).expect("write desc");
    writeln!(out, "  type: {}", t.output_type).expect("write desc");
    if let Some(toolchain) = t.toolchain() {
        writeln!(out, "  toolchain: {}", graph.toolchain(toolchain).label.user_visible(false))
            .expect("write desc");
    }
    if !t.public {
        writeln!(out, "  visibility: private").expect("write desc");
    }
    if t.hard_dep {
        writeln!(out, "  hard_dep: true").expect("write desc");
    }
    if let Some(pool) = &t.pool {
        writeln!(out, "  pool: {}", show(pool)).expect("write desc");
    }

    let dep_section = |out: &mut String, title: &str, deps: &[DepPair]| {
        if deps.is_empty() {
            return;
        }
        writeln!(out, "  {title}:").expect("write desc");
        for dep in deps {
            writeln!(out, "    {}", show(&dep.label)).expect("write desc");
        }
    };
    dep_section(&mut out, "public_deps", &t.public_deps);
    dep_section(&mut out, "deps", &t.deps);
    dep_section(&mut out, "data_deps", &t.data_deps);

    if !t.outputs.is_empty() {
        writeln!(out, "  outputs:").expect("write desc");
        for output in &t.outputs {
            writeln!(out, "    {output}").expect("write desc");
        }
    }

    let list = |out: &mut String, title: &str, items: &[String]| {
        if items.is_empty() {
            return;
        }
        writeln!(out, "  {title}:").expect("write desc");
        for item in items {
            writeln!(out, "    {item}").expect("write desc");
        }
    };
    let lib_info = data.lib_info(target);
    list(
        &mut out,
        "all_lib_dirs",
        &lib_info
            .all_lib_dirs
            .iter()
            .map(|dir| dir.value().to_owned())
            .collect::<Vec<_>>(),
    );
    list(
        &mut out,
        "all_libs",
        &lib_info
            .all_libs
            .iter()
            .map(|lib| lib.as_str().to_owned())
            .collect::<Vec<_>>(),
    );
    let framework_info = data.framework_info(target);
    list(
        &mut out,
        "all_framework_dirs",
        &framework_info
            .all_framework_dirs
            .iter()
            .map(|dir| dir.value().to_owned())
            .collect::<Vec<_>>(),
    );
    list(&mut out, "all_frameworks", framework_info.all_frameworks);
    list(
        &mut out,
        "all_weak_frameworks",
        framework_info.all_weak_frameworks,
    );

    let inherited = data.inherited_libraries(target);
    if !inherited.is_empty() {
        writeln!(out, "  inherited_libraries:").expect("write desc");
        for pair in inherited {
            let visibility = if pair.is_public { "public" } else { "private" };
            writeln!(
                out,
                "    {} ({visibility})",
                show(&graph.target(pair.target).label)
            )
            .expect("write desc");
        }
    }

    let hard = data.recursive_hard_deps(target);
    if !hard.is_empty() {
        writeln!(out, "  recursive_hard_deps:").expect("write desc");
        for dep in hard {
            writeln!(out, "    {}", show(&graph.target(*dep).label)).expect("write desc");
        }
    }

    out
}
