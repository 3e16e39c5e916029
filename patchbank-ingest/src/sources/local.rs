//! Local directory source

use super::{AssetSource, SourceEntry};
use crate::error::SourceError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Reads assets from a directory tree on disk
#[derive(Debug, Clone)]
pub struct LocalDirectorySource {
    root: PathBuf,
}

impl LocalDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Root-relative path with '/' separators regardless of platform
fn logical_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn walk(root: &Path, prefix: &str) -> Result<Vec<SourceEntry>, SourceError> {
    let start = if prefix.is_empty() {
        root.to_path_buf()
    } else {
        root.join(prefix)
    };

    if !start.is_dir() {
        return Err(SourceError::List {
            prefix: prefix.to_string(),
            reason: format!("{} is not a directory", start.display()),
        });
    }

    let mut entries = Vec::new();
    let walker = WalkDir::new(&start)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if let Some(path) = logical_path(root, entry.path()) {
                    entries.push(SourceEntry {
                        path,
                        descriptor: entry.path().to_string_lossy().into_owned(),
                    });
                }
            }
            Ok(_) => {}
            Err(e) => {
                // Unreadable subtrees are skipped, the rest of the listing stands
                tracing::warn!(prefix, error = %e, "Error accessing entry");
            }
        }
    }

    Ok(entries)
}

#[async_trait]
impl AssetSource for LocalDirectorySource {
    fn name(&self) -> &str {
        "local"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<SourceEntry>, SourceError> {
        let root = self.root.clone();
        let prefix_owned = prefix.to_string();
        tokio::task::spawn_blocking(move || walk(&root, &prefix_owned))
            .await
            .map_err(|e| SourceError::List {
                prefix: prefix.to_string(),
                reason: format!("listing task failed: {}", e),
            })?
    }

    async fn fetch(&self, entry: &SourceEntry) -> Result<Vec<u8>, SourceError> {
        tokio::fs::read(&entry.descriptor)
            .await
            .map_err(|e| SourceError::Fetch {
                path: entry.path.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("wavetables").join("basic");
        std::fs::create_dir_all(&base).unwrap();
        std::fs::write(base.join("b.wt"), b"b").unwrap();
        std::fs::write(base.join("a.wt"), b"a").unwrap();
        std::fs::write(dir.path().join("top.fxp"), b"top").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_list_recurses_in_stable_order() {
        let dir = tree();
        let source = LocalDirectorySource::new(dir.path());

        let paths: Vec<String> = source.list("").await.unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["top.fxp", "wavetables/basic/a.wt", "wavetables/basic/b.wt"]);
    }

    #[tokio::test]
    async fn test_list_prefix_and_fetch() {
        let dir = tree();
        let source = LocalDirectorySource::new(dir.path());

        let entries = source.list("wavetables").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "wavetables/basic/a.wt");
        assert_eq!(source.fetch(&entries[0]).await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_missing_prefix_and_file_are_errors() {
        let dir = tree();
        let source = LocalDirectorySource::new(dir.path());

        assert!(matches!(source.list("nope").await, Err(SourceError::List { .. })));

        let ghost = SourceEntry {
            path: "ghost.wt".to_string(),
            descriptor: dir.path().join("ghost.wt").to_string_lossy().into_owned(),
        };
        assert!(matches!(source.fetch(&ghost).await, Err(SourceError::Fetch { .. })));
    }
}
