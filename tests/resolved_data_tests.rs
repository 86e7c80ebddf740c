//! Integration tests for the resolved-target data engine.

use kanna::graph::TargetId;
use kanna::resolved::ResolvedTargetData;
use kanna::target::OutputType;
use test_support::TestSetup;

#[test]
fn public_upgrade_keeps_single_entry() {
    // A -> B (private), A -> C (public), C -> B (public): the public path
    // through C upgrades B, which still appears exactly once.
    let mut setup = TestSetup::new();
    let b = setup.target("//b", OutputType::StaticLibrary).finish();
    let c = setup
        .target("//c", OutputType::StaticLibrary)
        .public_dep(b)
        .finish();
    let a = setup
        .target("//a:app", OutputType::Executable)
        .public_dep(c)
        .dep(b)
        .finish();

    let graph = setup.into_graph();
    let data = ResolvedTargetData::new(&graph);
    let inherited = data.inherited_libraries(a);

    let b_entries: Vec<_> = inherited.iter().filter(|p| p.target == b).collect();
    assert_eq!(b_entries.len(), 1);
    assert!(b_entries[0].is_public);
}

#[test]
fn publicness_requires_an_all_public_path() {
    // A -> B (public) -> C (private): C is inherited, but not public.
    let mut setup = TestSetup::new();
    let c = setup.target("//c", OutputType::StaticLibrary).finish();
    let b = setup
        .target("//b", OutputType::StaticLibrary)
        .dep(c)
        .finish();
    let a = setup
        .target("//a:app", OutputType::Executable)
        .public_dep(b)
        .finish();

    let graph = setup.into_graph();
    let data = ResolvedTargetData::new(&graph);
    let inherited = data.inherited_libraries(a);

    let c_entry = inherited.iter().find(|p| p.target == c).expect("c inherited");
    assert!(!c_entry.is_public);
    let b_entry = inherited.iter().find(|p| p.target == b).expect("b inherited");
    assert!(b_entry.is_public);
}

#[test]
fn rust_order_places_dependencies_first() {
    // A -> B -> C and A -> D: the rustc link order starts with the deepest
    // dependency.
    let mut setup = TestSetup::new();
    let c = setup.target("//c", OutputType::StaticLibrary).finish();
    let b = setup
        .target("//b", OutputType::StaticLibrary)
        .dep(c)
        .finish();
    let d = setup.target("//d", OutputType::StaticLibrary).finish();
    let a = setup
        .target("//a:app", OutputType::Executable)
        .dep(b)
        .dep(d)
        .finish();

    let graph = setup.into_graph();
    let data = ResolvedTargetData::new(&graph);
    let order: Vec<TargetId> = data
        .rust_transitive_inherited_libs(a)
        .iter()
        .map(|p| p.target)
        .collect();
    assert_eq!(order, vec![c, b, d]);
}

#[test]
fn rust_order_is_deduplicated_with_shared_subtrees() {
    // Diamond: A -> B -> D, A -> C -> D. D appears once, before B and C.
    let mut setup = TestSetup::new();
    let d = setup.target("//d", OutputType::StaticLibrary).finish();
    let b = setup
        .target("//b", OutputType::StaticLibrary)
        .dep(d)
        .finish();
    let c = setup
        .target("//c", OutputType::StaticLibrary)
        .dep(d)
        .finish();
    let a = setup
        .target("//a:app", OutputType::Executable)
        .dep(b)
        .dep(c)
        .finish();

    let graph = setup.into_graph();
    let data = ResolvedTargetData::new(&graph);
    let order: Vec<TargetId> = data
        .rust_transitive_inherited_libs(a)
        .iter()
        .map(|p| p.target)
        .collect();
    assert_eq!(order, vec![d, b, c]);
}

#[test]
fn no_target_repeats_in_inherited_libraries() {
    let mut setup = TestSetup::new();
    let shared_dep = setup.target("//shared_dep", OutputType::StaticLibrary).finish();
    let left = setup
        .target("//left", OutputType::StaticLibrary)
        .dep(shared_dep)
        .finish();
    let right = setup
        .target("//right", OutputType::StaticLibrary)
        .dep(shared_dep)
        .finish();
    let app = setup
        .target("//app", OutputType::Executable)
        .dep(left)
        .dep(right)
        .finish();

    let graph = setup.into_graph();
    let data = ResolvedTargetData::new(&graph);
    let inherited = data.inherited_libraries(app);
    let mut seen = std::collections::HashSet::new();
    for pair in inherited {
        assert!(seen.insert(pair.target), "duplicate entry in inherited list");
    }
}

#[test]
fn lib_and_framework_lists_concatenate_and_dedup() {
    let mut setup = TestSetup::new();
    let base = setup
        .target("//base", OutputType::StaticLibrary)
        .lib("z")
        .lib("/opt/vendor/libv.a")
        .lib_dir("//third_party/lib/")
        .framework("Foundation")
        .framework_dir("//sdk/frameworks/")
        .weak_framework("Metal")
        .finish();
    let mid = setup
        .target("//mid", OutputType::StaticLibrary)
        .lib("z")
        .lib_dir("//third_party/lib/")
        .framework("Foundation")
        .framework("Security")
        .dep(base)
        .finish();
    let app = setup
        .target("//app", OutputType::Executable)
        .lib("m")
        .dep(mid)
        .finish();

    let graph = setup.into_graph();
    let data = ResolvedTargetData::new(&graph);

    let libs: Vec<&str> = data.all_libs(app).iter().map(|l| l.as_str()).collect();
    assert_eq!(libs, vec!["m", "z", "/opt/vendor/libv.a"]);

    let lib_dirs: Vec<&str> = data.all_lib_dirs(app).iter().map(|d| d.value()).collect();
    assert_eq!(lib_dirs, vec!["//third_party/lib/"]);

    let frameworks: Vec<&str> = data
        .all_frameworks(app)
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(frameworks, vec!["Foundation", "Security"]);

    let weak: Vec<&str> = data
        .all_weak_frameworks(app)
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(weak, vec!["Metal"]);
}

#[test]
fn data_deps_do_not_join_link_inheritance() {
    let mut setup = TestSetup::new();
    let tool = setup
        .target("//tool", OutputType::StaticLibrary)
        .lib("toolsupport")
        .finish();
    let app = setup
        .target("//app", OutputType::Executable)
        .data_dep(tool)
        .finish();

    let graph = setup.into_graph();
    let data = ResolvedTargetData::new(&graph);
    assert!(data.inherited_libraries(app).is_empty());
    assert!(data.all_libs(app).is_empty());
}

#[test]
fn hard_deps_close_over_the_dep_relation() {
    let mut setup = TestSetup::new();
    let generator = setup
        .target("//generator", OutputType::Action)
        .output("//out/Debug/gen.h")
        .finish();
    let copier = setup
        .target("//copier", OutputType::Copy)
        .output("//out/Debug/copied.txt")
        .finish();
    let lib = setup
        .target("//lib", OutputType::StaticLibrary)
        .dep(generator)
        .finish();
    let marked = setup
        .target("//marked", OutputType::StaticLibrary)
        .hard_dep()
        .dep(copier)
        .finish();
    let app = setup
        .target("//app", OutputType::Executable)
        .dep(lib)
        .public_dep(marked)
        .finish();

    let graph = setup.into_graph();
    let data = ResolvedTargetData::new(&graph);
    let hard = data.recursive_hard_deps(app);
    assert!(hard.contains(&generator));
    assert!(hard.contains(&copier));
    assert!(hard.contains(&marked));
    assert!(!hard.contains(&lib));
}

#[test]
fn results_are_deterministic_and_memoized() {
    let mut setup = TestSetup::new();
    let b = setup.target("//b", OutputType::StaticLibrary).lib("z").finish();
    let a = setup
        .target("//a:app", OutputType::Executable)
        .public_dep(b)
        .finish();

    let graph = setup.into_graph();

    // Two engines over the same graph agree bit for bit.
    let one = ResolvedTargetData::new(&graph);
    let two = ResolvedTargetData::new(&graph);
    assert_eq!(one.inherited_libraries(a), two.inherited_libraries(a));
    assert_eq!(one.all_libs(a), two.all_libs(a));

    // Repeated calls on one engine return the identical slice.
    let first = one.inherited_libraries(a);
    let second = one.inherited_libraries(a);
    assert_eq!(first.as_ptr(), second.as_ptr());
    assert_eq!(first.len(), second.len());
    let libs_first = one.all_libs(a);
    let libs_second = one.all_libs(a);
    assert_eq!(libs_first.as_ptr(), libs_second.as_ptr());
}

#[test]
fn group_contribution_keeps_its_publicness() {
    // app -> group (private) -> lib (public): lib inherits, private overall.
    let mut setup = TestSetup::new();
    let lib = setup.target("//lib", OutputType::StaticLibrary).finish();
    let group = setup
        .target("//group", OutputType::Group)
        .public_dep(lib)
        .finish();
    let app = setup
        .target("//app", OutputType::Executable)
        .dep(group)
        .finish();

    let graph = setup.into_graph();
    let data = ResolvedTargetData::new(&graph);
    let inherited = data.inherited_libraries(app);
    assert_eq!(inherited.len(), 1);
    assert_eq!(inherited[0].target, lib);
    assert!(!inherited[0].is_public);
}

#[test]
fn shared_libraries_stop_the_static_walk_but_appear_themselves() {
    let mut setup = TestSetup::new();
    let inner = setup
        .target("//inner", OutputType::StaticLibrary)
        .lib("inner_support")
        .finish();
    let shared = setup
        .target("//shared", OutputType::SharedLibrary)
        .dep(inner)
        .finish();
    let app = setup
        .target("//app", OutputType::Executable)
        .dep(shared)
        .finish();

    let graph = setup.into_graph();
    let data = ResolvedTargetData::new(&graph);
    let inherited = data.inherited_libraries(app);
    assert_eq!(inherited.len(), 1);
    assert_eq!(inherited[0].target, shared);
    assert!(data.all_libs(app).is_empty());
}

#[test]
fn frameworks_propagate_past_shared_library_boundaries() {
    // inner declares frameworks strictly beneath a shared library dep;
    // they still reach app's final link even though inner's libs do not.
    let mut setup = TestSetup::new();
    let inner = setup
        .target("//inner", OutputType::StaticLibrary)
        .lib("inner_support")
        .framework("Metal")
        .weak_framework("CoreVideo")
        .framework_dir("//sdk/frameworks/")
        .finish();
    let shared = setup
        .target("//shared", OutputType::SharedLibrary)
        .framework("QuartzCore")
        .dep(inner)
        .finish();
    let app = setup
        .target("//app", OutputType::Executable)
        .dep(shared)
        .finish();

    let graph = setup.into_graph();
    let data = ResolvedTargetData::new(&graph);

    assert!(data.all_libs(app).is_empty());
    let frameworks: Vec<&str> = data
        .all_frameworks(app)
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(frameworks, vec!["QuartzCore", "Metal"]);
    let weak: Vec<&str> = data
        .all_weak_frameworks(app)
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(weak, vec!["CoreVideo"]);
    let dirs: Vec<&str> = data
        .all_framework_dirs(app)
        .iter()
        .map(|dir| dir.value())
        .collect();
    assert_eq!(dirs, vec!["//sdk/frameworks/"]);
}
