//! Local filesystem vault backend.
//!
//! Implements `VaultFs` on top of `std::fs`. Every call runs on tokio's
//! blocking pool; the recursive scan in particular can touch thousands of
//! entries.

use crate::kernel::services::ports::{BackendError, BackendResult, BoxFuture, VaultFs};
use crate::models::path_tree::{is_image_path, sort_nodes};
use crate::models::Node;
use std::fs;
use std::path::{Path, PathBuf};

const NOTE_EXTENSION: &str = "md";
const UNTITLED_NOTE: &str = "Untitled";
const UNTITLED_FOLDER: &str = "Untitled Folder";

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalVaultFs;

impl LocalVaultFs {
    pub fn new() -> Self {
        Self
    }
}

/// Hidden entries (dot files and folders) never show up in a vault.
pub fn should_ignore(name: &str) -> bool {
    name.starts_with('.')
}

/// Notes and images; everything else in the vault folder is invisible.
pub fn is_supported_file(path: &Path) -> bool {
    let is_note = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(NOTE_EXTENSION));
    is_note || is_image_path(path)
}

#[cfg(unix)]
fn is_same_entry(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_entry(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

async fn blocking<T, F>(f: F) -> BackendResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> BackendResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BackendError::new(format!("blocking task failed: {}", e)))?
}

fn scan(path: &Path) -> BackendResult<Vec<Node>> {
    let mut nodes = Vec::new();

    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if should_ignore(&name) {
            continue;
        }

        let entry_path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let children = match scan(&entry_path) {
                Ok(children) => children,
                Err(e) => {
                    tracing::warn!(path = %entry_path.display(), error = %e, "unreadable folder");
                    Vec::new()
                }
            };
            nodes.push(Node::folder(entry_path, children));
        } else if is_supported_file(&entry_path) {
            nodes.push(Node::file(entry_path));
        }
    }

    sort_nodes(&mut nodes);
    Ok(nodes)
}

/// First free `stem.ext`, `stem 1.ext`, `stem 2.ext`, ... inside `dir`.
fn unique_path(dir: &Path, stem: &str, ext: Option<&str>) -> PathBuf {
    let file_name = |suffix: Option<usize>| {
        let base = match suffix {
            Some(n) => format!("{stem} {n}"),
            None => stem.to_string(),
        };
        match ext {
            Some(ext) => format!("{base}.{ext}"),
            None => base,
        }
    };

    let mut candidate = dir.join(file_name(None));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(file_name(Some(n)));
        n += 1;
    }
    candidate
}

fn require_dir(path: &Path) -> BackendResult<()> {
    if !path.is_dir() {
        return Err(BackendError::new(format!(
            "Not a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

fn require_exists(path: &Path) -> BackendResult<()> {
    if !path.exists() {
        return Err(BackendError::new(format!("Not found: {}", path.display())));
    }
    Ok(())
}

fn node_for(path: PathBuf) -> BackendResult<Node> {
    if path.is_dir() {
        let children = scan(&path)?;
        Ok(Node::folder(path, children))
    } else {
        Ok(Node::file(path))
    }
}

impl VaultFs for LocalVaultFs {
    fn scan_directory<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<Vec<Node>>> {
        let path = path.to_path_buf();
        Box::pin(blocking(move || {
            require_dir(&path)?;
            scan(&path)
        }))
    }

    fn read_file<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<String>> {
        let path = path.to_path_buf();
        Box::pin(blocking(move || {
            if !path.is_file() {
                return Err(BackendError::new(format!("Not a file: {}", path.display())));
            }
            Ok(fs::read_to_string(&path)?)
        }))
    }

    fn write_file<'a>(
        &'a self,
        path: &'a Path,
        content: &'a str,
    ) -> BoxFuture<'a, BackendResult<()>> {
        let path = path.to_path_buf();
        let content = content.to_string();
        Box::pin(blocking(move || {
            if let Some(parent) = path.parent() {
                require_dir(parent)?;
            }
            Ok(fs::write(&path, content)?)
        }))
    }

    fn create_note<'a>(&'a self, parent: &'a Path) -> BoxFuture<'a, BackendResult<Node>> {
        let parent = parent.to_path_buf();
        Box::pin(blocking(move || {
            require_dir(&parent)?;
            let path = unique_path(&parent, UNTITLED_NOTE, Some(NOTE_EXTENSION));
            fs::write(&path, "")?;
            Ok(Node::file(path))
        }))
    }

    fn create_folder<'a>(&'a self, parent: &'a Path) -> BoxFuture<'a, BackendResult<Node>> {
        let parent = parent.to_path_buf();
        Box::pin(blocking(move || {
            require_dir(&parent)?;
            let path = unique_path(&parent, UNTITLED_FOLDER, None);
            fs::create_dir(&path)?;
            Ok(Node::folder(path, Vec::new()))
        }))
    }

    fn delete_path<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<()>> {
        let path = path.to_path_buf();
        Box::pin(blocking(move || {
            require_exists(&path)?;
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
            Ok(())
        }))
    }

    fn duplicate_file<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<Node>> {
        let path = path.to_path_buf();
        Box::pin(blocking(move || {
            if !path.is_file() {
                return Err(BackendError::new(format!("Not a file: {}", path.display())));
            }
            let dir = path.parent().unwrap_or(Path::new(""));
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let ext = path.extension().map(|e| e.to_string_lossy().to_string());
            let target = unique_path(dir, &format!("{stem} copy"), ext.as_deref());
            fs::copy(&path, &target)?;
            Ok(Node::file(target))
        }))
    }

    fn rename_path<'a>(
        &'a self,
        from: &'a Path,
        to: &'a Path,
    ) -> BoxFuture<'a, BackendResult<Node>> {
        let from = from.to_path_buf();
        let to = to.to_path_buf();
        Box::pin(blocking(move || {
            require_exists(&from)?;
            // a case-only rename on a case-insensitive filesystem reports the
            // target as existing, but it is the source entry itself
            if to.exists() && !is_same_entry(&from, &to) {
                return Err(BackendError::new(format!(
                    "Already exists: {}",
                    to.display()
                )));
            }
            fs::rename(&from, &to)?;
            node_for(to)
        }))
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/file/local.rs"]
mod tests;
