//! Build-file loading.
//!
//! The resolution driver never touches the filesystem directly. It asks a
//! [`FileLoader`] for the declarations of a source directory; the loader
//! parses that directory's `Kannafile` once and caches the result, so
//! repeated requests for the same directory are free and idempotent.

use std::collections::HashMap;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::ast::KannaManifest;
use crate::source_dir::SourceDir;

/// Name of the per-directory build manifest.
pub const MANIFEST_FILE_NAME: &str = "Kannafile";

/// A parsed manifest together with the directory that declared it.
#[derive(Debug)]
pub struct LoadedFile {
    /// The source directory the manifest lives in.
    pub dir: SourceDir,
    pub manifest: KannaManifest,
}

/// A directory whose declarations could not be produced.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The directory has no build manifest.
    #[error("no {MANIFEST_FILE_NAME} for {dir} (expected {path})")]
    MissingBuildFile { dir: SourceDir, path: Utf8PathBuf },

    /// The manifest exists but failed to parse or validate.
    #[error("failed to load {MANIFEST_FILE_NAME} for {dir}")]
    Manifest {
        dir: SourceDir,
        #[source]
        source: crate::manifest::ManifestError,
    },
}

/// Source of per-directory target declarations.
pub trait FileLoader {
    /// Produce the declarations of `dir`. Must be idempotent: a second call
    /// for the same directory returns the same parse.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError`] when the directory has no manifest or the
    /// manifest is invalid.
    fn load(&mut self, dir: &SourceDir) -> Result<Arc<LoadedFile>, LoaderError>;
}

/// Loads `Kannafile`s from a source tree on disk.
pub struct DiskLoader {
    root: Utf8PathBuf,
    cache: HashMap<SourceDir, Arc<LoadedFile>>,
    loaded_paths: Vec<Utf8PathBuf>,
}

impl DiskLoader {
    /// A loader rooted at the directory `//` maps to.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
            loaded_paths: Vec::new(),
        }
    }

    /// The on-disk path of `dir`'s manifest.
    #[must_use]
    pub fn manifest_path(&self, dir: &SourceDir) -> Utf8PathBuf {
        let mut path = self.root.clone();
        for component in dir.components() {
            path.push(component);
        }
        path.push(MANIFEST_FILE_NAME);
        path
    }

    /// Every manifest read so far, in load order. Feeds the generator's
    /// depfile so edits retrigger generation.
    #[must_use]
    pub fn loaded_paths(&self) -> &[Utf8PathBuf] {
        &self.loaded_paths
    }

    fn read(&mut self, dir: &SourceDir) -> Result<LoadedFile, LoaderError> {
        let path = self.manifest_path(dir);
        if !path.exists() {
            return Err(LoaderError::MissingBuildFile {
                dir: *dir,
                path,
            });
        }
        tracing::debug!(dir = %dir, path = %path, "loading manifest");
        let text = read_manifest(&path).map_err(|source| LoaderError::Manifest {
            dir: *dir,
            source,
        })?;
        let manifest =
            crate::manifest::from_str(&text, path.as_str()).map_err(|source| {
                LoaderError::Manifest {
                    dir: *dir,
                    source,
                }
            })?;
        self.loaded_paths.push(path);
        Ok(LoadedFile {
            dir: *dir,
            manifest,
        })
    }
}

fn read_manifest(path: &Utf8Path) -> Result<String, crate::manifest::ManifestError> {
    std::fs::read_to_string(path).map_err(|source| crate::manifest::ManifestError::Read {
        path: path.to_owned(),
        source,
    })
}

impl FileLoader for DiskLoader {
    fn load(&mut self, dir: &SourceDir) -> Result<Arc<LoadedFile>, LoaderError> {
        if let Some(loaded) = self.cache.get(dir) {
            return Ok(Arc::clone(loaded));
        }
        let loaded = Arc::new(self.read(dir)?);
        self.cache.insert(*dir, Arc::clone(&loaded));
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(root: &Utf8Path, dir: &str, yaml: &str) {
        let mut path = root.to_owned();
        for component in dir.trim_matches('/').split('/').filter(|c| !c.is_empty()) {
            path.push(component);
        }
        std::fs::create_dir_all(&path).expect("mkdir");
        path.push(MANIFEST_FILE_NAME);
        std::fs::write(&path, yaml).expect("write manifest");
    }

    #[test]
    fn disk_loader_reads_and_caches() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = Utf8Path::from_path(tmp.path()).expect("utf8 root");
        write_manifest(
            root,
            "foo",
            "kanna_version: \"1.0.0\"\ntargets:\n  - name: bar\n    type: group\n",
        );

        let mut loader = DiskLoader::new(root.to_owned());
        let dir = SourceDir::new("//foo/").expect("dir");
        let first = loader.load(&dir).expect("load");
        let second = loader.load(&dir).expect("reload");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.loaded_paths().len(), 1);
        assert_eq!(first.manifest.targets[0].name, "bar");
    }

    #[test]
    fn missing_manifest_is_reported_with_path() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = Utf8Path::from_path(tmp.path()).expect("utf8 root");
        let mut loader = DiskLoader::new(root.to_owned());
        let dir = SourceDir::new("//nowhere/").expect("dir");
        let err = loader.load(&dir).expect_err("missing");
        assert!(matches!(err, LoaderError::MissingBuildFile { .. }));
        assert!(err.to_string().contains("nowhere"));
    }
}
