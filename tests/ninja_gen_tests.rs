//! Integration tests for the Ninja build file writer.

use kanna::ninja_gen::{generate, self_invocation_args};
use kanna::settings::BuildSettings;
use kanna::source_dir::SourceDir;
use kanna::target::OutputType;
use test_support::{assert_contains, src_dir, TestSetup};

fn settings() -> BuildSettings {
    BuildSettings::new(".", src_dir("//out/Debug/"), None)
}

#[test]
fn self_invocation_points_back_at_the_source_root() {
    // From //out/Debug the generator re-invokes itself with --root=../..
    // and no --dotfile flag when none is configured.
    let args = self_invocation_args(&settings());
    assert_eq!(args, vec!["--root=../..".to_owned()]);
}

#[test]
fn self_invocation_rebases_the_dotfile() {
    let settings = BuildSettings::new(
        ".",
        src_dir("//out/Debug/"),
        Some("foo/.kanna".into()),
    );
    let args = self_invocation_args(&settings);
    assert_eq!(
        args,
        vec![
            "--root=../..".to_owned(),
            "--dotfile=../../foo/.kanna".to_owned(),
        ]
    );
}

#[test]
fn two_targets_get_stamps_aliases_and_an_all_target() {
    let mut setup = TestSetup::new();
    setup
        .target("//foo:bar", OutputType::Action)
        .output("//out/Debug/out1.out")
        .output("//out/Debug/out2.out")
        .finish();
    setup
        .target("//bar:bar", OutputType::Action)
        .output("//out/Debug/out3.out")
        .output("//out/Debug/out4.out")
        .finish();

    let default_toolchain = *setup.default_toolchain();
    let graph = setup.into_graph();
    let ninja = generate(&settings(), &graph, &default_toolchain);

    assert_contains(&ninja, "rule kanna\n");
    assert_contains(&ninja, "  command = kanna --root=../.. gen .\n");
    assert_contains(
        &ninja,
        "build build.ninja: kanna\n  generator = 1\n  depfile = build.ninja.d\n",
    );
    assert_contains(&ninja, "build foo$:bar: phony obj/foo/bar.stamp\n");
    assert_contains(&ninja, "build bar$:bar: phony obj/bar/bar.stamp\n");
    // //bar:bar is named after its directory, so it owns the bare alias;
    // //foo:bar's short name collides with it and is skipped.
    assert_contains(&ninja, "build bar: phony obj/bar/bar.stamp\n");
    assert!(!ninja.contains("build bar: phony obj/foo/bar.stamp"));
    assert_contains(
        &ninja,
        "build all: phony $\n    obj/bar/bar.stamp $\n    obj/foo/bar.stamp\n",
    );
    assert_contains(&ninja, "default all\n");
}

#[test]
fn pools_are_emitted_with_synthesized_names() {
    let mut setup = TestSetup::new();
    let default_toolchain = *setup.default_toolchain();
    let other_toolchain = setup.add_toolchain("//other/", "toolchain");
    let regular_pool = setup.add_pool("//other/", "depth_pool", &other_toolchain, 42);
    let another_pool = setup.add_pool("//another/", "depth_pool", &other_toolchain, 7);
    let console = setup.add_pool("//", "console", &default_toolchain, 1);

    setup
        .target("//baz:baz(//other:toolchain)", OutputType::Action)
        .output("//out/Debug/out5.out")
        .pool(regular_pool)
        .finish();
    setup
        .target("//qux:qux(//other:toolchain)", OutputType::Action)
        .output("//out/Debug/out6.out")
        .pool(another_pool)
        .finish();
    setup
        .target("//quiet:quiet", OutputType::Action)
        .output("//out/Debug/out7.out")
        .pool(console)
        .finish();

    let graph = setup.into_graph();
    let ninja = generate(&settings(), &graph, &default_toolchain);

    assert_contains(&ninja, "pool other_toolchain_other_depth_pool\n  depth = 42\n");
    assert_contains(&ninja, "pool other_toolchain_another_depth_pool\n  depth = 7\n");
    // Sorted by synthesized name: another_ before other_.
    let another_at = ninja
        .find("pool other_toolchain_another_depth_pool")
        .expect("another pool present");
    let other_at = ninja
        .find("pool other_toolchain_other_depth_pool")
        .expect("other pool present");
    assert!(another_at < other_at);
    // Ninja's built-in console pool must never be declared.
    assert!(!ninja.contains("pool console"));
}

#[test]
fn non_default_toolchains_get_subninjas() {
    let mut setup = TestSetup::new();
    setup.add_toolchain("//other/", "toolchain");
    setup
        .target("//foo:bar", OutputType::Action)
        .output("//out/Debug/out1.out")
        .finish();

    let default_toolchain = *setup.default_toolchain();
    let graph = setup.into_graph();
    let ninja = generate(&settings(), &graph, &default_toolchain);
    assert_contains(&ninja, "subninja toolchain.ninja\n");
}

#[test]
fn root_targets_stamp_under_obj() {
    let mut setup = TestSetup::new();
    setup
        .target("//:top", OutputType::Group)
        .finish();

    let default_toolchain = *setup.default_toolchain();
    let graph = setup.into_graph();
    let ninja = generate(&settings(), &graph, &default_toolchain);
    assert_contains(&ninja, "build $:top: phony obj/top.stamp\n");
    assert_contains(&ninja, "build top: phony obj/top.stamp\n");
}

#[test]
fn deep_directory_alias_uses_the_full_path() {
    let mut setup = TestSetup::new();
    setup
        .target("//tools/gen/gen:gen", OutputType::Group)
        .finish();

    let default_toolchain = *setup.default_toolchain();
    let graph = setup.into_graph();
    let ninja = generate(&settings(), &graph, &default_toolchain);
    assert_contains(&ninja, "build tools/gen/gen: phony obj/tools/gen/gen/gen.stamp\n");
}

#[test]
fn empty_graph_produces_no_all_target() {
    let setup = TestSetup::new();
    let default_toolchain = *setup.default_toolchain();
    let graph = setup.into_graph();
    let ninja = generate(&settings(), &graph, &default_toolchain);
    assert!(!ninja.contains("build all"));
    assert!(!ninja.contains("default all"));
    assert_contains(&ninja, "rule kanna\n");
}

#[test]
fn build_dir_variants_change_the_root_arg() {
    let shallow = BuildSettings::new(".", src_dir("//out/"), None);
    assert_eq!(self_invocation_args(&shallow), vec!["--root=..".to_owned()]);

    let at_root = BuildSettings::new(".", SourceDir::source_root(), None);
    assert_eq!(self_invocation_args(&at_root), vec!["--root=.".to_owned()]);
}
