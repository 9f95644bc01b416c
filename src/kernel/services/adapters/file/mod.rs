//! Filesystem backends for vault content.

pub mod local;

pub use local::LocalVaultFs;
