//! Locations of committed test data and scratch directories.

use std::path::{Path, PathBuf};

/// Workspace root, two levels above `crates/test-utils`.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .unwrap_or(manifest_dir)
        .to_path_buf()
}

/// `crates/{crate_name}/testdata/`, e.g. the committed membership tables.
pub fn crate_testdata_dir(crate_name: &str) -> PathBuf {
    workspace_root().join("crates").join(crate_name).join("testdata")
}

/// `services/{service_name}/testdata/`, e.g. example run files.
pub fn service_testdata_dir(service_name: &str) -> PathBuf {
    workspace_root()
        .join("services")
        .join(service_name)
        .join("testdata")
}

/// Scratch directory for tables, field files and reports; removed on drop.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("hmc-test-")
        .tempdir()
        .expect("Failed to create temporary test directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_committed_testdata_present() {
        assert!(workspace_root().join("Cargo.toml").exists());
        assert!(crate_testdata_dir("fuzzy-classifier")
            .join("standard_cband.txt")
            .exists());
        assert!(service_testdata_dir("hmc-cli").join("run.yaml").exists());
    }

    #[test]
    fn test_temp_test_dir_is_scratch() {
        let dir = temp_test_dir();
        let path = dir.path().to_path_buf();
        assert!(path.exists());
        drop(dir);
        assert!(!path.exists());
    }
}
