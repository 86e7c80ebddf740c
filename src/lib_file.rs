//! Link-time library references.
//!
//! A `libs` entry in a manifest is either a bare library name, handed to the
//! linker as a `-l` switch, or a path to a library file. The two spellings
//! stay distinct: `z` and `/usr/lib/libz.a` never deduplicate against each
//! other.

use std::fmt;

use crate::intern::StringAtom;
use crate::source_dir::SourceDir;

/// One declared library: a `-l` style name or a resolved file path.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LibFile {
    /// A bare name, e.g. `z` for `-lz`.
    Lib(StringAtom),
    /// A library file path, absolute or source-absolute.
    Path(StringAtom),
}

impl LibFile {
    /// Classify and resolve a manifest `libs` entry.
    ///
    /// Values without a `/` are bare names. Values with a `/` are paths:
    /// absolute paths are kept verbatim, relative ones become
    /// source-absolute against `current_dir`.
    #[must_use]
    pub fn resolve(current_dir: &SourceDir, value: &str) -> Self {
        if !value.contains('/') {
            return Self::Lib(StringAtom::new(value));
        }
        if value.starts_with('/') {
            return Self::Path(StringAtom::new(value));
        }
        let mut resolved = String::with_capacity(current_dir.value().len() + value.len());
        resolved.push_str(current_dir.value());
        resolved.push_str(value);
        Self::Path(StringAtom::new(resolved))
    }

    /// The value as the linker sees it (name without `-l`, or the path).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lib(name) | Self::Path(name) => name.as_str(),
        }
    }

    #[must_use]
    pub fn is_path(&self) -> bool {
        matches!(self, Self::Path(_))
    }
}

impl fmt::Debug for LibFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lib(name) => write!(f, "LibFile::Lib({name:?})"),
            Self::Path(path) => write!(f, "LibFile::Path({path:?})"),
        }
    }
}

impl fmt::Display for LibFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
