//! Path resolution for Myzel: state directory, state files and manifests

pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// Overrides the directory holding state files
pub const CONFIG_DIR_VAR: &str = "MYZEL_CONFIG_DIR";
/// Points directly at a manifest file
pub const MANIFEST_VAR: &str = "MYZEL_MANIFEST";

const DEFAULT_CONFIG_DIR: &str = "config";
const STATE_PREFIX: &str = "app_";
const STATE_EXT: &str = "yaml";
const MANIFEST_CANDIDATES: [&str; 3] = ["myzel.local.yaml", "myzel.yaml", ".myzel.yaml"];

/// Directory holding the per-application state files.
///
/// `MYZEL_CONFIG_DIR` when set and non-empty, otherwise `./config`. The
/// directory is not created here; the state store creates it on first save.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_VAR).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    Ok(std::env::current_dir()?.join(DEFAULT_CONFIG_DIR))
}

/// Per-user Myzel directory (`~/.config/myzel` on Linux), created if missing
pub fn global_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("myzel");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// `<dir>/app_<app_name>.yaml`
pub fn state_file(dir: impl AsRef<Path>, app_name: &str) -> PathBuf {
    dir.as_ref()
        .join(format!("{}{}.{}", STATE_PREFIX, app_name, STATE_EXT))
}

/// Locate the application manifest.
///
/// Search order:
/// 1. `MYZEL_MANIFEST` (used only if the file exists)
/// 2. current directory: `myzel.local.yaml`, `myzel.yaml`, `.myzel.yaml`
pub fn find_manifest() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(MANIFEST_VAR).map(PathBuf::from) {
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    MANIFEST_CANDIDATES
        .iter()
        .map(|name| current_dir.join(name))
        .find(|path| path.exists())
        .ok_or(ConfigError::ManifestNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    struct CwdGuard(PathBuf);

    impl CwdGuard {
        fn enter(dir: &Path) -> Self {
            let original = std::env::current_dir().unwrap();
            std::env::set_current_dir(dir).unwrap();
            Self(original)
        }
    }

    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.0);
        }
    }

    #[test]
    fn test_state_file_name() {
        let path = state_file("/var/lib/myzel", "shop");
        assert_eq!(path, PathBuf::from("/var/lib/myzel/app_shop.yaml"));
    }

    #[test]
    fn test_global_config_dir() {
        if let Ok(dir) = global_config_dir() {
            assert!(dir.ends_with("myzel"));
            assert!(dir.exists());
        }
    }

    #[test]
    #[serial]
    fn test_config_dir_default() {
        unsafe {
            std::env::remove_var(CONFIG_DIR_VAR);
        }
        let temp_dir = tempfile::tempdir().unwrap();
        let _cwd = CwdGuard::enter(temp_dir.path());

        let dir = config_dir().unwrap();
        assert!(dir.ends_with("config"));
        assert!(!dir.exists());
    }

    #[test]
    #[serial]
    fn test_config_dir_env_var() {
        unsafe {
            std::env::set_var(CONFIG_DIR_VAR, "/tmp/myzel-state");
        }
        let dir = config_dir().unwrap();
        unsafe {
            std::env::remove_var(CONFIG_DIR_VAR);
        }
        assert_eq!(dir, PathBuf::from("/tmp/myzel-state"));
    }

    #[test]
    #[serial]
    fn test_config_dir_ignores_empty_env_var() {
        unsafe {
            std::env::set_var(CONFIG_DIR_VAR, "");
        }
        let dir = config_dir().unwrap();
        unsafe {
            std::env::remove_var(CONFIG_DIR_VAR);
        }
        assert!(dir.ends_with("config"));
    }

    #[test]
    #[serial]
    fn test_find_manifest_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("myzel.yaml"), "name: demo").unwrap();
        let _cwd = CwdGuard::enter(temp_dir.path());

        let manifest = find_manifest().unwrap();
        assert!(manifest.ends_with("myzel.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_manifest_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("myzel.yaml"), "name: shared").unwrap();
        fs::write(temp_dir.path().join("myzel.local.yaml"), "name: local").unwrap();
        fs::write(temp_dir.path().join(".myzel.yaml"), "name: hidden").unwrap();
        let _cwd = CwdGuard::enter(temp_dir.path());

        assert!(find_manifest().unwrap().ends_with("myzel.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_manifest_hidden_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(".myzel.yaml"), "name: hidden").unwrap();
        let _cwd = CwdGuard::enter(temp_dir.path());

        assert!(find_manifest().unwrap().ends_with(".myzel.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_manifest_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("custom.yaml");
        fs::write(&path, "name: custom").unwrap();

        unsafe {
            std::env::set_var(MANIFEST_VAR, &path);
        }
        let result = find_manifest();
        unsafe {
            std::env::remove_var(MANIFEST_VAR);
        }
        assert_eq!(result.unwrap(), path);
    }

    #[test]
    #[serial]
    fn test_find_manifest_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let _cwd = CwdGuard::enter(temp_dir.path());

        let result = find_manifest();
        assert!(matches!(result, Err(ConfigError::ManifestNotFound)));
    }
}
