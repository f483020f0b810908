//! Scanline rasterization of edges and convex polygons into span regions.

mod edge;
mod intersect;
mod region;

pub use edge::{EdgeFlags, NearClip, RasterEdge};
pub use intersect::{ClipResult, intersect};
pub use region::{RasterRegion, RegionSpans, RegionView};
