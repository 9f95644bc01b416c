//! Service adapters: OS/runtime specific implementations (IO/async).

pub mod dialog;
pub mod file;
pub mod file_watcher;
pub mod paths;
pub mod store;

pub use dialog::PresetFolderPicker;
pub use file::LocalVaultFs;
pub use file_watcher::NotifyWatcher;
pub use paths::{ensure_data_dir, ensure_log_dir, get_data_dir, get_log_dir};
pub use store::{JsonFileStore, MemoryStore};
