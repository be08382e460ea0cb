use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "seqmem";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Directory holding the persisted key-value files (run history)
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn log_dir() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|proj_dirs| proj_dirs.cache_dir().join("logs"))
            .unwrap_or_else(|| std::env::temp_dir().join(APP_NAME).join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_dir_is_named_after_app() {
        let dir = AppDirs::log_dir();
        assert!(dir.ends_with("logs"));
        assert!(dir.to_string_lossy().contains(APP_NAME));
    }
}
