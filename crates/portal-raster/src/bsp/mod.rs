//! Level BSP: node storage, construction and visible-leaf visitors.
//!
//! Nodes live in a single arena owned by [`Level`] and refer to each other by
//! [`NodeId`]. Interior nodes and leaves are two variants of [`BspNode`]
//! sharing one header with the parent link, bounds and visibility stamp.
//!
//! # Example
//!
//! ```ignore
//! use portal_raster::bsp::{LeafContents, LeafDesc, LevelBuilder};
//! use portal_raster::{Axis, BoundingBox, BspPlane};
//! use nalgebra::Point3;
//!
//! let mut builder = LevelBuilder::new();
//! let west = builder.add_leaf(LeafDesc::new(LeafContents::Regular, west_bounds));
//! let east = builder.add_leaf(LeafDesc::new(LeafContents::Regular, east_bounds));
//! let root = builder.add_interior(BspPlane::axial(Axis::X, 64), east, west, None);
//! let level = builder.build(root)?;
//!
//! let leaf = level.find_leaf(Point3::new(10, 10, 10));
//! ```
//!
//! # Architecture
//!
//! - [`Level`]: The node arena, surfaces, portals and PVS blob
//! - [`LevelBuilder`]: Validating construction of a [`Level`]
//! - [`BspNode`]: One node, either [`NodeKind::Interior`] or [`NodeKind::Leaf`]
//! - [`VisibilityVisitor`]: Visitor trait called for every visible leaf

mod level;
mod node;
mod visitor;

pub use level::{LeafDesc, Level, LevelBuilder, Portal, Surface};
pub use node::{
    BspNode, InteriorNode, LeafContents, LeafIndex, LeafNode, NodeHeader, NodeId, NodeKind,
    PortalId, SurfaceId,
};
pub use visitor::{
    CollectingVisitor, FnVisitor, LeafSpans, VisibilityVisitor, VisibleLeaf, VisibleSet,
};
