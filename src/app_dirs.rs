use directories::ProjectDirs;
use std::path::PathBuf;

/// Where lyrik keeps its files
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "lyrik")
    }

    /// `$HOME/.local/state/lyrik` when HOME is set, else the platform data dir
    pub fn state_dir() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home).join(".local").join("state").join("lyrik")
        } else if let Some(dirs) = Self::project() {
            dirs.data_local_dir().to_path_buf()
        } else {
            PathBuf::from(".")
        }
    }

    pub fn db_path() -> PathBuf {
        Self::state_dir().join("results.db")
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir().join("lyrik.log")
    }

    pub fn config_path() -> PathBuf {
        Self::project()
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("lyrik_config.json"))
    }
}
