//! Service ports: traits + data contracts for every external capability the
//! workspace core depends on.

pub mod config;
pub mod dialog;
pub mod error;
pub mod fs;
pub mod runtime;
pub mod settings;
pub mod store;
pub mod watch;

pub use config::WorkspaceConfig;
pub use dialog::FolderPicker;
pub use error::{BackendError, BackendResult};
pub use fs::VaultFs;
pub use runtime::{BoxFuture, Clock, SystemClock};
pub use settings::Settings;
pub use store::{KvStore, StoreName};
pub use watch::{ChangeEvent, ChangeKind, ChangeStream, ChangeWatcher};
