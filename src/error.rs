//! Startup error taxonomy.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The exported site root is missing entirely.
    #[error("site root '{0}' does not exist; export the site before serving it")]
    MissingSiteRoot(PathBuf),

    /// The site root exists but was exported without server-side support.
    #[error(
        "site root '{0}' has no system/ subfolder, which means the site was \
         exported as a static layout; re-export it as fullstack, or serve it \
         with the static layout instead"
    )]
    MissingSystemFolder(PathBuf),

    /// Configuration file could not be loaded or validated.
    #[error("configuration: {0}")]
    Config(#[from] crate::config::loader::ConfigError),

    /// A redirect pattern failed to compile.
    #[error("redirect pattern: {0}")]
    Redirect(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
