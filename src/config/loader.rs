//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::SiteConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Why a site configuration file could not be turned into a usable
/// [`SiteConfig`]. Every variant carries the offending path so startup
/// failures name the file that needs fixing.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read at all.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file is not valid YAML for the site config schema.
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    /// The file parsed but fails the semantic checks.
    Invalid {
        path: PathBuf,
        errors: Vec<ValidationError>,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "could not read site config '{}': {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => match source.location() {
                Some(loc) => write!(
                    f,
                    "site config '{}' is not valid at line {}, column {}: {}",
                    path.display(),
                    loc.line(),
                    loc.column(),
                    source
                ),
                None => write!(
                    f,
                    "site config '{}' is not valid: {}",
                    path.display(),
                    source
                ),
            },
            ConfigError::Invalid { path, errors } => {
                write!(f, "site config '{}' failed validation: ", path.display())?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}

/// Load and validate a site configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: SiteConfig =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    validate_config(&config).map_err(|errors| ConfigError::Invalid {
        path: path.to_path_buf(),
        errors,
    })?;

    Ok(config)
}
