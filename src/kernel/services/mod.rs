//! Services layer (ports + adapters).
//!
//! - `ports`: contracts for every external capability the workspace core uses.
//! - `adapters`: local implementations of those contracts (filesystem, notify,
//!   JSON store).

pub mod adapters;
pub mod ports;
