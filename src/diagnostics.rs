//! Adapters from plain error types to miette diagnostics.
//!
//! Application-level plumbing (the runner, the query server) reports
//! failures as [`miette::Report`]s. This trait converts any std error into
//! one and attaches the caller's context in a single call.

use miette::{Context, IntoDiagnostic, Result};
use std::fmt::Display;

pub(crate) trait ResultExt<T> {
    /// Convert the error into a diagnostic with a fixed context message.
    fn diag(self, context: impl Display + Send + Sync + 'static) -> Result<T>;

    /// Convert the error into a diagnostic with a lazily built context
    /// message, for paths where formatting is not free.
    fn diag_with(self, f: impl FnOnce() -> String) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn diag(self, context: impl Display + Send + Sync + 'static) -> Result<T> {
        self.into_diagnostic().wrap_err(context)
    }

    fn diag_with(self, f: impl FnOnce() -> String) -> Result<T> {
        self.into_diagnostic().wrap_err_with(f)
    }
}
