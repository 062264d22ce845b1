use std::path::{Path, PathBuf};

const APP_DIR: &str = "phonacq";

/// Where phonacq keeps its configuration.
///
/// On Linux this follows the XDG Base Directory Specification
/// (`$XDG_CONFIG_HOME/phonacq`, usually `~/.config/phonacq`); on macOS it is
/// `~/Library/Application Support/phonacq`. The `dirs` crate handles the
/// platform detection. Resolved once in `main` and passed down by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    /// Platform defaults, falling back to the working directory when the
    /// platform has no config location.
    pub fn resolve() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        Self { config_dir }
    }

    pub fn with_config_dir(dir: &Path) -> Self {
        Self {
            config_dir: dir.to_path_buf(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Config file path: <config_dir>/config.toml
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn resolved_dir_ends_with_app_name() {
        assert!(AppPaths::resolve().config_dir().ends_with("phonacq"));
    }

    #[test]
    fn config_file_structure() {
        let tmp = TempDir::new().unwrap();
        let paths = AppPaths::with_config_dir(tmp.path());
        assert_eq!(paths.config_file(), tmp.path().join("config.toml"));
    }
}
