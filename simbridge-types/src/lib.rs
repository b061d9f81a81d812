//! Core type definitions for simbridge.
//!
//! This crate defines the data shared by both ends of the bridge:
//! - Run identifiers (UUID v7)
//! - The [`Vector`] position type
//! - Entity snapshots ([`InstanceData`] and the concrete per-kind records)
//!
//! Snapshots are plain data. How the host builds them from live simulation
//! state, and how the engine caches them, lives in the host and engine crates.

mod ids;
mod kinds;
mod snapshot;
mod vector;

pub use ids::RunId;
pub use kinds::{BuildingData, NetPrefabData, NodeData, PropData, SegmentData, TreeData};
pub use snapshot::{EntityKind, InstanceData, Snapshot};
pub use vector::Vector;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),
}
