use directories::ProjectDirs;
use std::path::PathBuf;

/// Environment override for the data directory, used by tests and
/// portable installs.
pub const DATA_DIR_ENV: &str = "MEMOBIT_DATA_DIR";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Directory holding the configuration and high-score documents.
    pub fn data_dir() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            Some(PathBuf::from(dir))
        } else {
            ProjectDirs::from("", "", "memobit").map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
        }
    }
}
