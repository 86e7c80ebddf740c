//! Manifest loading helpers.
//!
//! A `Kannafile` is parsed into [`crate::ast::KannaManifest`] and validated
//! before the resolution driver sees it. Parse failures are reported as
//! [`miette`] diagnostics carrying the YAML source and a span when the
//! parser provides one.
//!
//! [`FileLoader`] is the seam between the driver and the filesystem: the
//! driver asks for directories, the loader answers with declarations, and
//! loading is idempotent per directory.

use crate::ast::KannaManifest;

mod diagnostics;
mod loader;

pub use diagnostics::ManifestError;
pub use loader::{DiskLoader, FileLoader, LoadedFile, LoaderError, MANIFEST_FILE_NAME};

/// Parse and validate a manifest string.
///
/// `name` labels the source in diagnostics, usually the file path.
///
/// # Errors
///
/// Returns [`ManifestError`] when the YAML is malformed, a field fails to
/// deserialise, or a declaration is invalid (for example a pool depth of 0).
pub fn from_str(yaml: &str, name: &str) -> Result<KannaManifest, ManifestError> {
    let manifest: KannaManifest = serde_yml::from_str(yaml)
        .map_err(|err| diagnostics::map_yaml_error(&err, yaml, name))?;
    validate(&manifest)?;
    Ok(manifest)
}

fn validate(manifest: &KannaManifest) -> Result<(), ManifestError> {
    for pool in &manifest.pools {
        if pool.depth == 0 {
            return Err(ManifestError::PoolDepth {
                name: pool.name.clone(),
            });
        }
    }
    Ok(())
}
