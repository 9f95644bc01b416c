//! In-memory fakes for the service ports.

use crate::kernel::services::adapters::MemoryStore;
use crate::kernel::services::ports::{
    BackendError, BackendResult, BoxFuture, ChangeEvent, ChangeStream, ChangeWatcher, Clock,
    FolderPicker, KvStore, StoreName, VaultFs,
};
use crate::models::Node;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

#[derive(Clone, Debug)]
enum Entry {
    Folder,
    File(String),
}

#[derive(Default)]
struct FsState {
    entries: BTreeMap<PathBuf, Entry>,
    calls: FxHashMap<&'static str, usize>,
    failures: FxHashMap<&'static str, String>,
}

/// Scripted `VaultFs`: a path map plus per-operation call counters and
/// one-shot failures.
#[derive(Default)]
pub struct FakeFs {
    state: Mutex<FsState>,
}

impl FakeFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `root` and every `(relative path, content)` file below it.
    /// Relative paths ending in `/` are folders.
    pub fn with_files(root: &str, files: &[(&str, &str)]) -> Self {
        let fs = Self::new();
        fs.add_folder(root);
        for (rel, content) in files {
            let path = Path::new(root).join(rel.trim_end_matches('/'));
            if rel.ends_with('/') {
                fs.add_folder(&path);
            } else {
                fs.add_file(&path, content);
            }
        }
        fs
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FsState> {
        self.state.lock().unwrap()
    }

    pub fn add_folder(&self, path: impl AsRef<Path>) {
        let mut state = self.lock();
        let mut current = Some(path.as_ref());
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            state.entries.insert(dir.to_path_buf(), Entry::Folder);
            current = dir.parent();
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_folder(parent);
        }
        self.lock()
            .entries
            .insert(path.to_path_buf(), Entry::File(content.to_string()));
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.lock().entries.retain(|p, _| !p.starts_with(path));
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.lock().entries.contains_key(path.as_ref())
    }

    pub fn content(&self, path: impl AsRef<Path>) -> Option<String> {
        match self.lock().entries.get(path.as_ref()) {
            Some(Entry::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    pub fn calls(&self, op: &str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or(0)
    }

    /// The next call to `op` fails with `message`.
    pub fn fail_next(&self, op: &'static str, message: &str) {
        self.lock().failures.insert(op, message.to_string());
    }

    fn enter(&self, op: &'static str) -> BackendResult<std::sync::MutexGuard<'_, FsState>> {
        let mut state = self.lock();
        *state.calls.entry(op).or_default() += 1;
        if let Some(message) = state.failures.remove(op) {
            return Err(BackendError::new(message));
        }
        Ok(state)
    }
}

fn is_folder(state: &FsState, path: &Path) -> bool {
    matches!(state.entries.get(path), Some(Entry::Folder))
}

fn build(state: &FsState, dir: &Path) -> Vec<Node> {
    state
        .entries
        .iter()
        .filter(|(p, _)| p.parent() == Some(dir))
        .map(|(p, entry)| match entry {
            Entry::Folder => Node::folder(p.clone(), build(state, p)),
            Entry::File(_) => Node::file(p.clone()),
        })
        .collect()
}

fn unique(state: &FsState, dir: &Path, stem: &str, ext: Option<&str>) -> PathBuf {
    let name = |n: usize| {
        let base = if n == 0 {
            stem.to_string()
        } else {
            format!("{stem} {n}")
        };
        match ext {
            Some(ext) => format!("{base}.{ext}"),
            None => base,
        }
    };
    let mut n = 0;
    while state.entries.contains_key(&dir.join(name(n))) {
        n += 1;
    }
    dir.join(name(n))
}

impl VaultFs for FakeFs {
    fn scan_directory<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<Vec<Node>>> {
        Box::pin(async move {
            let state = self.enter("scan_directory")?;
            if !is_folder(&state, path) {
                return Err(BackendError::new(format!("Not a directory: {}", path.display())));
            }
            // reversed so the core has to sort
            let mut nodes = build(&state, path);
            nodes.reverse();
            Ok(nodes)
        })
    }

    fn read_file<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<String>> {
        Box::pin(async move {
            let state = self.enter("read_file")?;
            match state.entries.get(path) {
                Some(Entry::File(content)) => Ok(content.clone()),
                _ => Err(BackendError::new(format!("Not a file: {}", path.display()))),
            }
        })
    }

    fn write_file<'a>(&'a self, path: &'a Path, content: &'a str) -> BoxFuture<'a, BackendResult<()>> {
        Box::pin(async move {
            let mut state = self.enter("write_file")?;
            let parent = path.parent().unwrap_or(Path::new(""));
            if !is_folder(&state, parent) {
                return Err(BackendError::new("parent missing"));
            }
            state
                .entries
                .insert(path.to_path_buf(), Entry::File(content.to_string()));
            Ok(())
        })
    }

    fn create_note<'a>(&'a self, parent: &'a Path) -> BoxFuture<'a, BackendResult<Node>> {
        Box::pin(async move {
            let mut state = self.enter("create_note")?;
            if !is_folder(&state, parent) {
                return Err(BackendError::new("parent missing"));
            }
            let path = unique(&state, parent, "Untitled", Some("md"));
            state.entries.insert(path.clone(), Entry::File(String::new()));
            Ok(Node::file(path))
        })
    }

    fn create_folder<'a>(&'a self, parent: &'a Path) -> BoxFuture<'a, BackendResult<Node>> {
        Box::pin(async move {
            let mut state = self.enter("create_folder")?;
            if !is_folder(&state, parent) {
                return Err(BackendError::new("parent missing"));
            }
            let path = unique(&state, parent, "Untitled Folder", None);
            state.entries.insert(path.clone(), Entry::Folder);
            Ok(Node::folder(path, Vec::new()))
        })
    }

    fn delete_path<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<()>> {
        Box::pin(async move {
            let mut state = self.enter("delete_path")?;
            if !state.entries.contains_key(path) {
                return Err(BackendError::new(format!("Not found: {}", path.display())));
            }
            state.entries.retain(|p, _| !p.starts_with(path));
            Ok(())
        })
    }

    fn duplicate_file<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<Node>> {
        Box::pin(async move {
            let mut state = self.enter("duplicate_file")?;
            let Some(Entry::File(content)) = state.entries.get(path).cloned() else {
                return Err(BackendError::new("Not a file"));
            };
            let dir = path.parent().unwrap_or(Path::new(""));
            let stem = path.file_stem().unwrap_or_default().to_string_lossy().to_string();
            let ext = path.extension().map(|e| e.to_string_lossy().to_string());
            let target = unique(&state, dir, &format!("{stem} copy"), ext.as_deref());
            state.entries.insert(target.clone(), Entry::File(content));
            Ok(Node::file(target))
        })
    }

    fn rename_path<'a>(&'a self, from: &'a Path, to: &'a Path) -> BoxFuture<'a, BackendResult<Node>> {
        Box::pin(async move {
            let mut state = self.enter("rename_path")?;
            if !state.entries.contains_key(from) {
                return Err(BackendError::new(format!("Not found: {}", from.display())));
            }
            if state.entries.contains_key(to) {
                return Err(BackendError::new(format!("Already exists: {}", to.display())));
            }
            let moved: Vec<(PathBuf, Entry)> = state
                .entries
                .iter()
                .filter(|(p, _)| p.starts_with(from))
                .map(|(p, e)| (p.clone(), e.clone()))
                .collect();
            for (path, entry) in moved {
                state.entries.remove(&path);
                let rel = path.strip_prefix(from).unwrap_or(Path::new(""));
                let target = if rel.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(rel)
                };
                state.entries.insert(target, entry);
            }
            Ok(match state.entries.get(to) {
                Some(Entry::Folder) => Node::folder(to.to_path_buf(), build(&state, to)),
                _ => Node::file(to.to_path_buf()),
            })
        })
    }
}

/// `ChangeWatcher` whose events are pushed by the test.
#[derive(Default)]
pub struct FakeWatcher {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ChangeEvent>>>,
    watched: Mutex<Option<PathBuf>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    fail_start: AtomicBool,
}

impl FakeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ChangeEvent) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn watched(&self) -> Option<PathBuf> {
        self.watched.lock().unwrap().clone()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }
}

impl ChangeWatcher for FakeWatcher {
    fn start_watching<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<()>> {
        Box::pin(async move {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail_start.load(Ordering::SeqCst) {
                return Err(BackendError::new("inotify limit reached"));
            }
            *self.watched.lock().unwrap() = Some(path.to_path_buf());
            Ok(())
        })
    }

    fn stop_watching(&self) -> BoxFuture<'_, BackendResult<()>> {
        Box::pin(async move {
            self.stops.fetch_add(1, Ordering::SeqCst);
            *self.watched.lock().unwrap() = None;
            Ok(())
        })
    }

    fn subscribe(&self) -> ChangeStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}

/// Clock the test moves by hand.
#[derive(Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn at(millis: u64) -> Self {
        Self {
            now: AtomicU64::new(millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// `MemoryStore` with switchable failures and a save counter.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl KvStore for FlakyStore {
    fn load<'a>(&'a self, store: StoreName, key: &'a str) -> BoxFuture<'a, BackendResult<Option<Value>>> {
        Box::pin(async move {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(BackendError::new("store unavailable"));
            }
            Ok(self.inner.get(store, key))
        })
    }

    fn save<'a>(&'a self, store: StoreName, key: &'a str, record: Value) -> BoxFuture<'a, BackendResult<()>> {
        Box::pin(async move {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(BackendError::new("disk full"));
            }
            self.inner.insert(store, key, record);
            Ok(())
        })
    }
}

/// Folder picker that hands out queued answers, then cancels.
#[derive(Default)]
pub struct QueuedPicker {
    answers: Mutex<Vec<Option<PathBuf>>>,
}

impl QueuedPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, answer: Option<&str>) {
        self.answers.lock().unwrap().insert(0, answer.map(PathBuf::from));
    }
}

impl FolderPicker for QueuedPicker {
    fn choose_folder(&self) -> BoxFuture<'_, BackendResult<Option<PathBuf>>> {
        Box::pin(async move { Ok(self.answers.lock().unwrap().pop().flatten()) })
    }
}
