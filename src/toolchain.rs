//! Toolchains and concurrency pools.
//!
//! A toolchain is a named environment that every label is implicitly or
//! explicitly qualified by. Pools cap how many of a target's actions run at
//! once; Ninja identifies them by a flat name synthesized from their label.

use crate::label::Label;
use crate::source_dir::SourceDir;

/// The built-in console pool name. Ninja defines it; it is never emitted.
pub const CONSOLE_POOL: &str = "console";

/// A named container of tools. Participates in identity only; the core
/// carries no tool definitions.
#[derive(Debug)]
pub struct Toolchain {
    pub label: Label,
}

impl Toolchain {
    #[must_use]
    pub fn new(label: Label) -> Self {
        Self { label }
    }
}

/// A named concurrency limit applied to a group of build actions.
#[derive(Debug, Clone)]
pub struct Pool {
    /// Pool identity, toolchain-qualified.
    pub label: Label,
    /// Maximum concurrent actions. Always at least 1.
    pub depth: u32,
}

impl Pool {
    #[must_use]
    pub fn new(label: Label, depth: u32) -> Self {
        debug_assert!(depth >= 1);
        Self { label, depth }
    }

    /// Whether this is the implicit `console` pool of the default toolchain.
    #[must_use]
    pub fn is_builtin_console(&self, default_toolchain: &Label) -> bool {
        self.label.name() == CONSOLE_POOL
            && self.label.dir().is_source_root()
            && toolchain_matches(&self.label, default_toolchain)
    }

    /// The flat name Ninja sees. Pools outside the default toolchain are
    /// prefixed with their toolchain's mangled dir and name, so
    /// `//other:depth_pool(//other:toolchain)` becomes
    /// `other_toolchain_other_depth_pool`.
    #[must_use]
    pub fn ninja_name(&self, default_toolchain: &Label) -> String {
        let include_toolchain = !toolchain_matches(&self.label, default_toolchain);
        let mut out = String::new();
        if include_toolchain {
            push_mangled_dir(&mut out, self.label.toolchain_dir());
            out.push_str(self.label.toolchain_name());
            out.push('_');
        }
        push_mangled_dir(&mut out, self.label.dir());
        out.push_str(self.label.name());
        out
    }
}

fn toolchain_matches(label: &Label, toolchain: &Label) -> bool {
    label.toolchain_dir() == toolchain.dir() && label.toolchain_name() == toolchain.name()
}

/// Append `dir` with the leading `//` dropped and `/` turned into `_`, so
/// `//foo/bar/` contributes `foo_bar_`.
fn push_mangled_dir(out: &mut String, dir: &SourceDir) {
    for ch in dir.value().chars().skip(2) {
        out.push(if ch == '/' { '_' } else { ch });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(value: &str) -> SourceDir {
        SourceDir::new(value).expect("dir")
    }

    fn default_toolchain() -> Label {
        Label::new(dir("//toolchain/"), "default")
    }

    fn other_toolchain() -> Label {
        Label::new(dir("//other/"), "toolchain")
    }

    #[test]
    fn pool_in_other_toolchain_gets_prefixed_name() {
        let tc = other_toolchain();
        let pool = Pool::new(
            Label::with_toolchain(dir("//other/"), "depth_pool", *tc.dir(), tc.name()),
            42,
        );
        assert_eq!(
            pool.ninja_name(&default_toolchain()),
            "other_toolchain_other_depth_pool"
        );
    }

    #[test]
    fn pool_in_default_toolchain_uses_bare_name() {
        let tc = default_toolchain();
        let pool = Pool::new(
            Label::with_toolchain(dir("//foo/"), "io_pool", *tc.dir(), tc.name()),
            4,
        );
        assert_eq!(pool.ninja_name(&tc), "foo_io_pool");
    }

    #[test]
    fn builtin_console_pool_detection() {
        let tc = default_toolchain();
        let console = Pool::new(
            Label::with_toolchain(SourceDir::source_root(), CONSOLE_POOL, *tc.dir(), tc.name()),
            1,
        );
        assert!(console.is_builtin_console(&tc));
        // A user pool named console in another toolchain is a distinct pool.
        let other = other_toolchain();
        let shadow = Pool::new(
            Label::with_toolchain(SourceDir::source_root(), CONSOLE_POOL, *other.dir(), other.name()),
            1,
        );
        assert!(!shadow.is_builtin_console(&tc));
        assert_eq!(shadow.ninja_name(&tc), "other_toolchain_console");
    }
}
