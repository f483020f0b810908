//! Error types.
//!
//! Degenerate geometry is never an error: it resolves to a culled region.
//! Everything here is either a resource limit or a broken invariant in the
//! data handed to the renderer, and aborts the frame.

use std::path::PathBuf;

use thiserror::Error;

use crate::bsp::{NodeId, PortalId, SurfaceId};

/// The frame scratch arena ran out of cells.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScratchError {
    #[error("scratch arena exhausted: requested {requested} cells, {available} of {capacity} available")]
    Exhausted {
        requested: usize,
        available: usize,
        capacity: usize,
    },
}

/// Fatal conditions raised while rendering a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Scratch(#[from] ScratchError),

    #[error("polygon has {count} near-clipped edges, a convex polygon has 0 or 2")]
    NearClipEdges { count: usize },

    #[error("polygon with {count} vertices exceeds the vertex scratch capacity of {capacity}")]
    PolygonTooLarge { count: usize, capacity: usize },

    #[error("node {0:?} has no parent but is not the root")]
    OrphanNode(NodeId),

    #[error("PVS bit for leaf {leaf} lies outside the {bytes}-byte visibility set")]
    PvsIndexOutOfBounds { leaf: usize, bytes: usize },
}

/// Problems found while assembling a [`Level`](crate::Level).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelError {
    #[error("node {node:?} references missing child {child:?}")]
    MissingChild { node: NodeId, child: NodeId },

    #[error("node {child:?} is referenced by both {first:?} and {second:?}")]
    MultipleParents {
        child: NodeId,
        first: NodeId,
        second: NodeId,
    },

    #[error("root {0:?} is not a node of this level")]
    MissingRoot(NodeId),

    #[error("root {0:?} is referenced as a child")]
    RootHasParent(NodeId),

    #[error("{count} nodes are unreachable from the root")]
    Unreachable { count: usize },

    #[error("leaf references missing surface {0:?}")]
    MissingSurface(SurfaceId),

    #[error("node {node:?} references missing portal {portal:?}")]
    MissingPortal { node: NodeId, portal: PortalId },

    #[error("portal {portal:?} has {count} vertices, at least 3 are required")]
    DegeneratePortal { portal: PortalId, count: usize },
}

/// Failure to load or validate a [`RenderConfig`](crate::RenderConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
