//! Canonical target identity.
//!
//! A [`Label`] names a target, toolchain, or pool: an absolute source
//! directory plus a name, optionally qualified by the toolchain it is built
//! under. Users write labels like `//chrome/renderer:renderer_config` or
//! `:local(//build/toolchain:arm)`; [`Label::resolve`] turns those
//! context-sensitive spellings into canonical identities.
//!
//! Labels cache their hash at construction. All four components are interned
//! atoms, so the composite hash is a cheap chain over pool-assigned hashes
//! and equality is component-wise identity.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use thiserror::Error;

use crate::intern::StringAtom;
use crate::source_dir::{RootEscapeError, SourceDir};

/// An ill-formed or unresolvable label string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    /// The string does not match the label grammar.
    #[error("invalid label `{input}`: {reason}")]
    BadFormat {
        /// The user-written label.
        input: String,
        /// What the grammar objected to.
        reason: &'static str,
    },

    /// The directory part walks above the source root.
    #[error(transparent)]
    EscapesRoot(#[from] RootEscapeError),

    /// The name was omitted and cannot be derived from the directory.
    #[error("label `{input}` has no name and none can be derived")]
    EmptyName {
        /// The user-written label.
        input: String,
    },

    /// A toolchain label may not itself carry a toolchain.
    #[error("toolchain label in `{input}` contains a nested toolchain")]
    NestedToolchain {
        /// The user-written label.
        input: String,
    },
}

/// Canonical identity of a named build item.
///
/// The toolchain half is either fully present or fully absent; constructors
/// keep that invariant.
#[derive(Clone, Copy)]
pub struct Label {
    dir: SourceDir,
    name: StringAtom,
    toolchain_dir: SourceDir,
    toolchain_name: StringAtom,
    hash: u64,
}

impl Label {
    /// A label with no toolchain.
    #[must_use]
    pub fn new(dir: SourceDir, name: impl AsRef<str>) -> Self {
        Self::build(dir, StringAtom::new(name), SourceDir::default(), StringAtom::default())
    }

    /// A label qualified by an explicit toolchain.
    #[must_use]
    pub fn with_toolchain(
        dir: SourceDir,
        name: impl AsRef<str>,
        toolchain_dir: SourceDir,
        toolchain_name: impl AsRef<str>,
    ) -> Self {
        debug_assert!(!toolchain_dir.is_null(), "partial toolchain");
        Self::build(
            dir,
            StringAtom::new(name),
            toolchain_dir,
            StringAtom::new(toolchain_name),
        )
    }

    /// A label qualified by `toolchain`'s own dir and name.
    #[must_use]
    pub fn in_toolchain(dir: SourceDir, name: impl AsRef<str>, toolchain: &Label) -> Self {
        Self::build(dir, StringAtom::new(name), toolchain.dir, toolchain.name)
    }

    fn build(
        dir: SourceDir,
        name: StringAtom,
        toolchain_dir: SourceDir,
        toolchain_name: StringAtom,
    ) -> Self {
        debug_assert_eq!(
            toolchain_dir.is_null(),
            toolchain_name.is_empty(),
            "partial toolchain"
        );
        let hash = Self::compute_hash(dir, name, toolchain_dir, toolchain_name);
        Self {
            dir,
            name,
            toolchain_dir,
            toolchain_name,
            hash,
        }
    }

    fn compute_hash(
        dir: SourceDir,
        name: StringAtom,
        toolchain_dir: SourceDir,
        toolchain_name: StringAtom,
    ) -> u64 {
        ((dir
            .pool_hash()
            .wrapping_mul(131)
            .wrapping_add(name.pool_hash()))
        .wrapping_mul(131)
        .wrapping_add(toolchain_dir.pool_hash()))
        .wrapping_mul(131)
        .wrapping_add(toolchain_name.pool_hash())
    }

    /// Resolve a user-written label against the referring directory and the
    /// toolchain in effect there.
    ///
    /// Grammar: `[//abs_dir | rel_dir][:name][(toolchain_label)]`. An omitted
    /// name is derived from the last directory component; an omitted
    /// toolchain inherits `current_toolchain`.
    ///
    /// # Errors
    ///
    /// Returns a [`LabelError`] describing the first grammar or path problem.
    pub fn resolve(
        current_dir: &SourceDir,
        current_toolchain: Option<&Label>,
        input: &str,
    ) -> Result<Self, LabelError> {
        if input.is_empty() {
            return Err(LabelError::BadFormat {
                input: input.to_owned(),
                reason: "empty label",
            });
        }

        // Split off the toolchain suffix at the outermost parens.
        let (rest, toolchain_part) = match input.find('(') {
            Some(open) => {
                let Some(inner) = input[open + 1..].strip_suffix(')') else {
                    return Err(LabelError::BadFormat {
                        input: input.to_owned(),
                        reason: "unterminated toolchain suffix",
                    });
                };
                (&input[..open], Some(inner))
            }
            None => {
                if input.contains(')') {
                    return Err(LabelError::BadFormat {
                        input: input.to_owned(),
                        reason: "`)` without `(`",
                    });
                }
                (input, None)
            }
        };

        let (dir_part, name_part) = match rest.split_once(':') {
            Some((dir_part, name)) => (dir_part, Some(name)),
            None => (rest, None),
        };

        if rest.is_empty() {
            return Err(LabelError::BadFormat {
                input: input.to_owned(),
                reason: "missing directory and name",
            });
        }

        let dir = current_dir.resolve_dir(dir_part)?;

        let name = match name_part {
            Some("") => {
                return Err(LabelError::EmptyName {
                    input: input.to_owned(),
                })
            }
            Some(name) => {
                if name.contains(':') {
                    return Err(LabelError::BadFormat {
                        input: input.to_owned(),
                        reason: "more than one `:`",
                    });
                }
                if name.contains('/') {
                    return Err(LabelError::BadFormat {
                        input: input.to_owned(),
                        reason: "name may not contain `/`",
                    });
                }
                name
            }
            None => {
                let derived = dir.last_component();
                if derived.is_empty() {
                    return Err(LabelError::EmptyName {
                        input: input.to_owned(),
                    });
                }
                derived
            }
        };

        let (toolchain_dir, toolchain_name) = match toolchain_part {
            Some(tc) => {
                if tc.contains('(') || tc.contains(')') {
                    return Err(LabelError::NestedToolchain {
                        input: input.to_owned(),
                    });
                }
                // The toolchain label resolves in an empty toolchain context.
                let toolchain = Self::resolve(current_dir, None, tc)?;
                (toolchain.dir, toolchain.name)
            }
            None => current_toolchain
                .map(|tc| (tc.dir, tc.name))
                .unwrap_or_default(),
        };

        Ok(Self::build(
            dir,
            StringAtom::new(name),
            toolchain_dir,
            toolchain_name,
        ))
    }

    #[inline]
    #[must_use]
    pub fn dir(&self) -> &SourceDir {
        &self.dir
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name.as_str()
    }

    #[inline]
    #[must_use]
    pub fn name_atom(&self) -> StringAtom {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn toolchain_dir(&self) -> &SourceDir {
        &self.toolchain_dir
    }

    #[inline]
    #[must_use]
    pub fn toolchain_name(&self) -> &'static str {
        self.toolchain_name.as_str()
    }

    #[inline]
    #[must_use]
    pub fn has_toolchain(&self) -> bool {
        !self.toolchain_dir.is_null()
    }

    /// This label's toolchain as its own label, when present.
    #[must_use]
    pub fn toolchain_label(&self) -> Option<Self> {
        self.has_toolchain()
            .then(|| Self::build(self.toolchain_dir, self.toolchain_name, SourceDir::default(), StringAtom::default()))
    }

    /// A copy of this label with the toolchain stripped.
    #[must_use]
    pub fn without_toolchain(&self) -> Self {
        Self::build(self.dir, self.name, SourceDir::default(), StringAtom::default())
    }

    /// Whether the toolchain halves of two labels match.
    #[must_use]
    pub fn toolchains_equal(&self, other: &Self) -> bool {
        self.toolchain_dir == other.toolchain_dir
            && self.toolchain_name.same_as(&other.toolchain_name)
    }

    /// The hash cached at construction.
    #[inline]
    #[must_use]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    /// Recompute the hash from scratch. Always equals [`Self::hash_value`];
    /// exposed so tests can check the cache.
    #[must_use]
    pub fn recomputed_hash(&self) -> u64 {
        Self::compute_hash(self.dir, self.name, self.toolchain_dir, self.toolchain_name)
    }

    /// Format the label the way users write it, `//dir:name`, optionally
    /// with its `(toolchain)` suffix.
    #[must_use]
    pub fn user_visible(&self, include_toolchain: bool) -> String {
        let mut out = String::new();
        out.push_str(self.dir.display_no_slash());
        out.push(':');
        out.push_str(self.name());
        if include_toolchain {
            if let Some(toolchain) = self.toolchain_label() {
                out.push('(');
                out.push_str(&toolchain.user_visible(false));
                out.push(')');
            }
        }
        out
    }

    /// Like [`Self::user_visible`], but the toolchain is shown only when it
    /// differs from `default_toolchain`. Users rarely care about the default.
    #[must_use]
    pub fn user_visible_with_default(&self, default_toolchain: &Label) -> String {
        let include = self.has_toolchain() && !self.toolchains_equal_label(default_toolchain);
        self.user_visible(include)
    }

    fn toolchains_equal_label(&self, toolchain: &Label) -> bool {
        self.toolchain_dir == *toolchain.dir() && self.toolchain_name() == toolchain.name()
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.name.same_as(&other.name)
            && self.dir == other.dir
            && self.toolchain_dir == other.toolchain_dir
            && self.toolchain_name.same_as(&other.toolchain_name)
    }
}

impl Eq for Label {}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.dir, self.name, self.toolchain_dir, self.toolchain_name).cmp(&(
            other.dir,
            other.name,
            other.toolchain_dir,
            other.toolchain_name,
        ))
    }
}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({})", self.user_visible(true))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_visible(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn root() -> SourceDir {
        SourceDir::source_root()
    }

    fn default_toolchain() -> Label {
        Label::new(SourceDir::new("//toolchain/").expect("dir"), "default")
    }

    #[rstest]
    #[case("//foo:bar", "//foo/", "bar")]
    #[case("//foo/bar", "//foo/bar/", "bar")]
    #[case("//foo", "//foo/", "foo")]
    #[case("//:top", "//", "top")]
    fn resolve_absolute(#[case] input: &str, #[case] dir: &str, #[case] name: &str) {
        let label = Label::resolve(&root(), None, input).expect("resolve");
        assert_eq!(label.dir().value(), dir);
        assert_eq!(label.name(), name);
        assert!(!label.has_toolchain());
    }

    #[rstest]
    #[case("bar", "//base/bar/", "bar")]
    #[case(":local", "//base/", "local")]
    #[case("sub:thing", "//base/sub/", "thing")]
    #[case("../peer:thing", "//peer/", "thing")]
    fn resolve_relative(#[case] input: &str, #[case] dir: &str, #[case] name: &str) {
        let base = SourceDir::new("//base/").expect("base");
        let label = Label::resolve(&base, None, input).expect("resolve");
        assert_eq!(label.dir().value(), dir);
        assert_eq!(label.name(), name);
    }

    #[test]
    fn resolve_inherits_current_toolchain() {
        let tc = default_toolchain();
        let label = Label::resolve(&root(), Some(&tc), "//foo:bar").expect("resolve");
        assert!(label.has_toolchain());
        assert_eq!(label.toolchain_label().expect("tc"), tc);
    }

    #[test]
    fn resolve_explicit_toolchain_overrides() {
        let tc = default_toolchain();
        let label =
            Label::resolve(&root(), Some(&tc), "//foo:bar(//other:arm)").expect("resolve");
        assert_eq!(label.toolchain_dir().value(), "//other/");
        assert_eq!(label.toolchain_name(), "arm");
    }

    #[rstest]
    #[case("", "empty")]
    #[case("//foo:bar(//tc:x", "unterminated")]
    #[case("//foo:bar)", "stray paren")]
    #[case("//foo:a:b", "double colon")]
    #[case("//foo:a/b", "slash in name")]
    #[case(":", "only colon")]
    fn resolve_rejects_bad_format(#[case] input: &str, #[case] _why: &str) {
        let err = Label::resolve(&root(), None, input).expect_err("must fail");
        assert!(
            matches!(err, LabelError::BadFormat { .. } | LabelError::EmptyName { .. }),
            "unexpected error for {input:?}: {err:?}"
        );
    }

    #[test]
    fn resolve_rejects_root_escape() {
        let err = Label::resolve(&root(), None, "../foo:bar").expect_err("escape");
        assert!(matches!(err, LabelError::EscapesRoot(_)));
    }

    #[test]
    fn resolve_rejects_nested_toolchain() {
        let err = Label::resolve(&root(), None, "//foo:bar(//tc:x(//tc:y))")
            .expect_err("nested");
        assert!(matches!(err, LabelError::NestedToolchain { .. }));
    }

    #[test]
    fn resolve_rejects_nameless_root() {
        let err = Label::resolve(&root(), None, "//").expect_err("no name");
        assert!(matches!(err, LabelError::EmptyName { .. }));
    }

    #[test]
    fn cached_hash_matches_recomputation() {
        let tc = default_toolchain();
        let label = Label::resolve(&root(), Some(&tc), "//foo/bar:baz").expect("resolve");
        assert_eq!(label.hash_value(), label.recomputed_hash());
    }

    #[test]
    fn equal_labels_share_hash() {
        let a = Label::resolve(&root(), None, "//foo:bar").expect("a");
        let b = Label::resolve(&root(), None, "//foo:bar").expect("b");
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());
    }

    #[test]
    fn user_visible_round_trips() {
        let tc = default_toolchain();
        let label = Label::resolve(&root(), Some(&tc), "//foo:bar").expect("resolve");
        let rendered = label.user_visible(true);
        assert_eq!(rendered, "//foo:bar(//toolchain:default)");
        let back = Label::resolve(&root(), None, &rendered).expect("round trip");
        assert_eq!(back, label);
    }

    #[test]
    fn user_visible_with_default_hides_default_toolchain() {
        let tc = default_toolchain();
        let label = Label::resolve(&root(), Some(&tc), "//foo:bar").expect("resolve");
        assert_eq!(label.user_visible_with_default(&tc), "//foo:bar");

        let other = Label::resolve(&root(), None, "//foo:bar(//other:arm)").expect("resolve");
        assert_eq!(
            other.user_visible_with_default(&tc),
            "//foo:bar(//other:arm)"
        );
    }

    #[test]
    fn root_dir_renders_with_double_slash() {
        let label = Label::resolve(&root(), None, "//:top").expect("resolve");
        assert_eq!(label.user_visible(false), "//:top");
    }

    #[test]
    fn ordering_is_lexicographic_on_components() {
        let a = Label::resolve(&root(), None, "//a:x").expect("a");
        let b = Label::resolve(&root(), None, "//b:x").expect("b");
        let b_y = Label::resolve(&root(), None, "//b:y").expect("b:y");
        assert!(a < b);
        assert!(b < b_y);
    }
}
