//! Source-rooted directory paths.
//!
//! A [`SourceDir`] is a directory inside the project source tree, written
//! with a leading `//` for the source root and always ending in `/`, for
//! example `//` or `//chrome/renderer/`. The canonical string is interned,
//! so copies are cheap and hashing reuses the pool-assigned hash.
//!
//! A default-constructed `SourceDir` is *null*: it names nothing and is used
//! for the absent-toolchain half of a label.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::intern::StringAtom;

/// A relative directory walked above `//`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("path `{input}` walks above the source root")]
pub struct RootEscapeError {
    /// The offending user-written path.
    pub input: String,
}

/// A normalized absolute-within-source directory path.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SourceDir(StringAtom);

impl SourceDir {
    /// The source root, `//`.
    #[must_use]
    pub fn source_root() -> Self {
        Self(StringAtom::new("//"))
    }

    /// Normalize `input` against the source root.
    ///
    /// Accepts both `//`-absolute and root-relative spellings.
    ///
    /// # Errors
    ///
    /// Returns [`RootEscapeError`] when `..` components walk above `//`.
    pub fn new(input: &str) -> Result<Self, RootEscapeError> {
        Self::source_root().resolve_dir(input)
    }

    /// Normalize `input` against this directory.
    ///
    /// `//`-prefixed inputs are absolute; anything else is joined onto
    /// `self`. `.` and empty components collapse, `..` pops one component.
    ///
    /// # Errors
    ///
    /// Returns [`RootEscapeError`] when the path walks above `//`.
    pub fn resolve_dir<'a>(&self, input: &'a str) -> Result<Self, RootEscapeError> {
        debug_assert!(!self.is_null(), "resolving against a null SourceDir");
        let (base, rest) = match input.strip_prefix("//") {
            Some(abs) => (None, abs),
            None => (Some(self), input),
        };

        let mut parts: Vec<&'a str> = Vec::new();
        if let Some(base) = base {
            for component in base.components() {
                parts.push(component);
            }
        }
        for comp in rest.split('/') {
            match comp {
                "" | "." => {}
                ".." => {
                    if parts.pop().is_none() {
                        return Err(RootEscapeError {
                            input: input.to_owned(),
                        });
                    }
                }
                other => parts.push(other),
            }
        }
        Ok(Self::from_parts(&parts))
    }

    fn from_parts(parts: &[&str]) -> Self {
        if parts.is_empty() {
            return Self::source_root();
        }
        let mut value = String::with_capacity(2 + parts.iter().map(|p| p.len() + 1).sum::<usize>());
        value.push_str("//");
        for part in parts {
            value.push_str(part);
            value.push('/');
        }
        Self(StringAtom::new(value))
    }

    /// The canonical string, e.g. `//foo/bar/`. Empty for a null dir.
    #[inline]
    #[must_use]
    pub fn value(&self) -> &'static str {
        self.0.as_str()
    }

    /// A null `SourceDir` names nothing; see the module docs.
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_source_root(&self) -> bool {
        self.value() == "//"
    }

    /// Path components past the leading `//`.
    pub fn components(&self) -> impl Iterator<Item = &'static str> {
        self.value()
            .trim_start_matches('/')
            .split('/')
            .filter(|c| !c.is_empty())
    }

    /// The last path component, or `""` for the source root and null dirs.
    #[must_use]
    pub fn last_component(&self) -> &'static str {
        self.components().last().unwrap_or("")
    }

    /// The canonical string without its trailing slash, as users write it.
    /// The source root renders as `//`.
    #[must_use]
    pub fn display_no_slash(&self) -> &'static str {
        let value = self.value();
        if value.len() > 2 {
            value.trim_end_matches('/')
        } else {
            value
        }
    }

    /// The pool-assigned hash of the canonical string.
    #[inline]
    #[must_use]
    pub fn pool_hash(&self) -> u64 {
        self.0.pool_hash()
    }

    /// The backing atom.
    #[inline]
    #[must_use]
    pub fn atom(&self) -> StringAtom {
        self.0
    }
}

impl PartialOrd for SourceDir {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceDir {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Debug for SourceDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceDir({:?})", self.value())
    }
}

impl fmt::Display for SourceDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("//", "foo", "//foo/")]
    #[case("//", "foo/bar", "//foo/bar/")]
    #[case("//base/", "sub", "//base/sub/")]
    #[case("//base/", "//other", "//other/")]
    #[case("//base/", "", "//base/")]
    #[case("//base/", ".", "//base/")]
    #[case("//base/sub/", "..", "//base/")]
    #[case("//base/sub/", "../peer", "//base/peer/")]
    #[case("//base/", "a/./b//c/", "//base/a/b/c/")]
    #[case("//base/", "//", "//")]
    fn resolve_dir_normalizes(#[case] base: &str, #[case] input: &str, #[case] expected: &str) {
        let base = SourceDir::new(base).expect("base");
        let resolved = base.resolve_dir(input).expect("resolve");
        assert_eq!(resolved.value(), expected);
    }

    #[rstest]
    #[case("//", "..")]
    #[case("//base/", "../..")]
    #[case("//", "//..")]
    fn resolve_dir_rejects_root_escape(#[case] base: &str, #[case] input: &str) {
        let base = SourceDir::new(base).expect("base");
        let err = base.resolve_dir(input).expect_err("escape");
        assert_eq!(err.input, input);
    }

    #[test]
    fn display_no_slash_keeps_root() {
        assert_eq!(SourceDir::source_root().display_no_slash(), "//");
        let dir = SourceDir::new("//foo/bar").expect("dir");
        assert_eq!(dir.display_no_slash(), "//foo/bar");
    }

    #[test]
    fn last_component() {
        let dir = SourceDir::new("//foo/bar").expect("dir");
        assert_eq!(dir.last_component(), "bar");
        assert_eq!(SourceDir::source_root().last_component(), "");
    }

    #[test]
    fn null_dir_is_default() {
        let null = SourceDir::default();
        assert!(null.is_null());
        assert!(!SourceDir::source_root().is_null());
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = SourceDir::new("//a/").expect("a");
        let b = SourceDir::new("//b/").expect("b");
        assert!(a < b);
    }
}
