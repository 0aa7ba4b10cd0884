//! Score tree: the hierarchical model built by the pipeline.
//!
//! Score > System > Part > (Staff, Measure > (Slot, Chord > Note)).
//!
//! Modules
//! - `node` – closed set of node kinds and their per-kind data.
//! - `tree` – arena, mutation with upward invalidation, lazy geometry.
//! - `visitor` – double-dispatch traversal, dumps and snapshots.
//! - `locate` – point to system lookup with a recent-system cache.
//! - `layout` – display origins and score-wide measure numbers.

pub mod layout;
pub mod locate;
pub mod node;
pub mod tree;
pub mod visitor;

pub use layout::{apply_layout, LayoutParams, LayoutReport};
pub use node::{
    ChordData, MeasureData, Node, NodeId, NodeKind, NoteData, PartData, ScoreData, SlotData,
    StaffData, StaffPosition, SystemData,
};
pub use tree::ScoreTree;
pub use visitor::{NodeSnapshot, ScoreVisitor, TreeDumper};

use crate::geometry::GeometryError;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum TreeError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// Operation not meaningful for this node kind.
    #[error("unsupported operation `{operation}` on {kind}")]
    Unsupported {
        kind: &'static str,
        operation: &'static str,
    },
    #[error("{kind} {id} has no geometry: {source}")]
    Geometry {
        id: NodeId,
        kind: &'static str,
        source: GeometryError,
    },
}
