//! Per-invocation build settings.
//!
//! [`BuildSettings`] ties together the three paths every command needs: the
//! filesystem directory the source root `//` maps to, the build directory
//! the generated files land in, and the optional dotfile override.

use camino::{Utf8Path, Utf8PathBuf};

use crate::source_dir::SourceDir;

/// Paths for one generator invocation.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    root_path: Utf8PathBuf,
    build_dir: SourceDir,
    dotfile: Option<Utf8PathBuf>,
}

impl BuildSettings {
    /// `root_path` is where `//` lives on disk; `build_dir` is
    /// source-absolute, e.g. `//out/Debug/`; `dotfile` is relative to the
    /// source root when set.
    #[must_use]
    pub fn new(
        root_path: impl Into<Utf8PathBuf>,
        build_dir: SourceDir,
        dotfile: Option<Utf8PathBuf>,
    ) -> Self {
        Self {
            root_path: root_path.into(),
            build_dir,
            dotfile,
        }
    }

    #[must_use]
    pub fn root_path(&self) -> &Utf8Path {
        &self.root_path
    }

    #[must_use]
    pub fn build_dir(&self) -> &SourceDir {
        &self.build_dir
    }

    #[must_use]
    pub fn dotfile(&self) -> Option<&Utf8Path> {
        self.dotfile.as_deref()
    }

    /// The relative path from the build directory back up to the source
    /// root: `//out/Debug/` yields `../..`.
    #[must_use]
    pub fn build_dir_to_source_root(&self) -> Utf8PathBuf {
        let mut path = Utf8PathBuf::new();
        for _ in self.build_dir.components() {
            path.push("..");
        }
        if path.as_str().is_empty() {
            path.push(".");
        }
        path
    }

    /// A root-relative path rewritten so it works from inside the build
    /// directory.
    #[must_use]
    pub fn rebase_to_build_dir(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.build_dir_to_source_root().join(path)
    }

    /// The build directory on disk.
    #[must_use]
    pub fn build_dir_path(&self) -> Utf8PathBuf {
        let mut path = self.root_path.clone();
        for component in self.build_dir.components() {
            path.push(component);
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(build_dir: &str) -> BuildSettings {
        BuildSettings::new(".", SourceDir::new(build_dir).expect("dir"), None)
    }

    #[test]
    fn two_levels_up_from_out_debug() {
        assert_eq!(
            settings("//out/Debug/").build_dir_to_source_root(),
            Utf8PathBuf::from("../..")
        );
    }

    #[test]
    fn root_build_dir_stays_in_place() {
        assert_eq!(
            settings("//").build_dir_to_source_root(),
            Utf8PathBuf::from(".")
        );
    }

    #[test]
    fn rebase_prefixes_updirs() {
        let rebased = settings("//out/Debug/").rebase_to_build_dir(Utf8Path::new("foo/.kanna"));
        assert_eq!(rebased, Utf8PathBuf::from("../../foo/.kanna"));
    }

    #[test]
    fn build_dir_path_joins_root() {
        let s = BuildSettings::new("/src", SourceDir::new("//out/Debug/").expect("dir"), None);
        assert_eq!(s.build_dir_path(), Utf8PathBuf::from("/src/out/Debug"));
    }
}
