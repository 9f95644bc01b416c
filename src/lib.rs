//! notevault - workspace state core of a note-taking app
//!
//! Module layout:
//! - models: file tree snapshot, vaults, tabs
//! - kernel: controllers, the `Workspace` context and its service ports
//!   and adapters

pub mod kernel;
pub mod models;

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
mod test_support;
