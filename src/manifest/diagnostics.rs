//! Translates manifest parsing errors into actionable diagnostics.
//!
//! Raw `serde_yml` failures are wrapped in [`ManifestError::Parse`], which
//! carries the YAML source and, when the parser reports a location, a span
//! pointing at the offending byte. `miette` renders these with context.

use camino::Utf8PathBuf;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A manifest that could not be read, parsed, or validated.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest at {path}")]
    #[diagnostic(code(kanna::manifest::read))]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The YAML failed to parse or deserialise.
    #[error("invalid manifest: {message}")]
    #[diagnostic(code(kanna::manifest::parse))]
    Parse {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("problem is here")]
        span: Option<SourceSpan>,
    },

    /// A pool declared a depth below 1.
    #[error("pool `{name}` must have a depth of at least 1")]
    #[diagnostic(code(kanna::manifest::pool_depth))]
    PoolDepth { name: String },
}

/// Convert a `serde_yml` error into a [`ManifestError::Parse`] with a span
/// when the parser reports a document location.
pub(crate) fn map_yaml_error(err: &serde_yml::Error, src: &str, name: &str) -> ManifestError {
    let span = err
        .location()
        .map(|loc| SourceSpan::new(loc.index().into(), 1));
    ManifestError::Parse {
        message: err.to_string(),
        src: NamedSource::new(name, src.to_owned()),
        span,
    }
}
