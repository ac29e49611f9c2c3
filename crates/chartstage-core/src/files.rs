//! Virtual file manifests and chart tree copying
//!
//! Assembly never writes the final output tree itself. It produces a
//! [`VirtualFileManifest`] mapping absolute destination paths to file text,
//! and the caller decides whether to persist it (or only preview it).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};

/// Mapping of absolute output path to full UTF-8 file content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualFileManifest {
    files: BTreeMap<PathBuf, String>,
    skipped: Vec<PathBuf>,
}

impl VirtualFileManifest {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `source_root` and map every text file to its location under `output_root`
    ///
    /// Files that are not valid UTF-8 are logged and left out; they never
    /// abort the walk.
    pub fn collect(source_root: &Path, output_root: &Path) -> Result<Self> {
        let output_root = std::path::absolute(output_root)?;
        let mut manifest = Self::new();

        for entry in WalkDir::new(source_root).sort_by_file_name() {
            let entry = entry.map_err(|e| CoreError::Walk {
                path: source_root.display().to_string(),
                message: e.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(source_root)
                .map_err(|e| CoreError::Walk {
                    path: entry.path().display().to_string(),
                    message: e.to_string(),
                })?;
            let destination = output_root.join(relative);

            let bytes = std::fs::read(entry.path())?;
            match String::from_utf8(bytes) {
                Ok(content) => {
                    manifest.files.insert(destination, content);
                }
                Err(_) => {
                    warn!(
                        "{} is not a text file so it will not be included",
                        relative.display()
                    );
                    manifest.skipped.push(destination);
                }
            }
        }

        Ok(manifest)
    }

    /// Insert or replace a file
    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    /// Get a file's content
    pub fn get(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Check whether a path is present
    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Iterate over paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    /// Iterate over (path, content) pairs in sorted order
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files.iter().map(|(p, c)| (p.as_path(), c.as_str()))
    }

    /// Destinations of files left out because they were not text
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    /// Number of text files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the manifest is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Consume into the underlying map
    pub fn into_inner(self) -> BTreeMap<PathBuf, String> {
        self.files
    }

    /// Persist every entry, creating parent directories as needed
    pub fn write_all(&self) -> Result<usize> {
        for (path, content) in &self.files {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        Ok(self.files.len())
    }
}

/// Copy a directory tree into `dest`, overwriting files that exist in both
///
/// Anything already under `dest` that is not part of `src` is left alone.
/// Returns the number of files copied.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<usize> {
    let mut copied = 0;

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| CoreError::Walk {
            path: src.display().to_string(),
            message: e.to_string(),
        })?;

        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| CoreError::Walk {
                path: entry.path().display().to_string(),
                message: e.to_string(),
            })?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    debug!("copied {} file(s) from {} to {}", copied, src.display(), dest.display());
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_maps_to_output_root() {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("templates")).unwrap();
        fs::write(src.path().join("Chart.yaml"), "name: x\n").unwrap();
        fs::write(src.path().join("templates/deploy.yaml"), "kind: Deployment\n").unwrap();

        let manifest = VirtualFileManifest::collect(src.path(), Path::new("/out/stage")).unwrap();

        let paths: Vec<_> = manifest.paths().collect();
        assert_eq!(
            paths,
            vec![
                Path::new("/out/stage/Chart.yaml"),
                Path::new("/out/stage/templates/deploy.yaml"),
            ]
        );
        assert_eq!(
            manifest.get(Path::new("/out/stage/templates/deploy.yaml")),
            Some("kind: Deployment\n")
        );
    }

    #[test]
    fn test_collect_skips_binary_files() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("values.yaml"), "a: 1\n").unwrap();
        fs::write(src.path().join("logo.png"), [0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe]).unwrap();

        let manifest = VirtualFileManifest::collect(src.path(), Path::new("/out")).unwrap();

        assert_eq!(manifest.len(), 1);
        assert!(manifest.contains(Path::new("/out/values.yaml")));
        assert_eq!(manifest.skipped(), &[PathBuf::from("/out/logo.png")]);
    }

    #[test]
    fn test_write_all() {
        let out = TempDir::new().unwrap();
        let mut manifest = VirtualFileManifest::new();
        manifest.insert(out.path().join("a/b/c.yaml"), "c: 1\n");

        assert_eq!(manifest.write_all().unwrap(), 1);
        assert_eq!(fs::read_to_string(out.path().join("a/b/c.yaml")).unwrap(), "c: 1\n");
    }

    #[test]
    fn test_copy_tree_overwrites_and_preserves() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        fs::write(src.path().join("values.yaml"), "new: true\n").unwrap();
        fs::create_dir_all(src.path().join("templates")).unwrap();
        fs::write(src.path().join("templates/svc.yaml"), "kind: Service\n").unwrap();

        fs::write(dest.path().join("values.yaml"), "old: true\n").unwrap();
        fs::create_dir_all(dest.path().join("charts/redis")).unwrap();
        fs::write(dest.path().join("charts/redis/values.yaml"), "cached: true\n").unwrap();

        let copied = copy_tree(src.path(), dest.path()).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(dest.path().join("values.yaml")).unwrap(), "new: true\n");
        assert!(dest.path().join("templates/svc.yaml").is_file());
        assert_eq!(
            fs::read_to_string(dest.path().join("charts/redis/values.yaml")).unwrap(),
            "cached: true\n"
        );
    }
}
