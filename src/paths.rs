//! XDG-compliant path resolution for canon-kg.
//!
//! The CLI uses these as defaults when `--data-dir` or `--config` are not
//! given. The library itself never reads the environment.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Application directory name under each XDG base directory.
const APP_DIR: &str = "canon-kg";

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(canon::paths::no_home),
        help("Set the HOME environment variable, or pass --data-dir and --config explicitly.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(canon::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Global XDG directories for canon-kg.
#[derive(Debug, Clone)]
pub struct CanonPaths {
    /// `$XDG_CONFIG_HOME/canon-kg/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/canon-kg/`
    pub data_dir: PathBuf,
}

impl CanonPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join(APP_DIR);

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/share"))
            .join(APP_DIR);

        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    /// Path to the config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Create both directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [&self.config_dir, &self.data_dir] {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }
}
