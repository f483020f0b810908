//! Portal-clipped scanline visibility for BSP levels.
//!
//! Each frame walks the level BSP front to back, decompresses the camera
//! leaf's potentially visible set, and narrows a per-scanline span region
//! through every portal on the way, so each visible leaf is reported with the
//! exact part of the screen it may draw into.

pub mod bsp;
mod camera;
mod config;
mod error;
mod math;
mod plane;
pub mod pvs;
pub mod raster;
mod render;
mod scratch;

pub use bsp::{Level, LevelBuilder, VisibilityVisitor, VisibleSet};
pub use camera::{BoxProjection, Camera, ClipVertex, Projection};
pub use config::RenderConfig;
pub use error::{ConfigError, LevelError, RenderError, ScratchError};
pub use math::{
    Fixed, MAX_SCREEN_ROWS, RoundedDda, SCREEN_COORD_LIMIT, ScreenRect, ScreenSize, Span, Vertex2D,
    YRange, lerp,
};
pub use plane::{Axis, BoundingBox, BspPlane, PLANE_EPSILON, PlaneSide};
pub use pvs::PotentiallyVisibleSet;
pub use raster::{ClipResult, RasterEdge, RasterRegion, RegionSpans, RegionView, intersect};
pub use render::{FrameStats, RenderContext};
pub use scratch::{Mark, ScratchArena, ScratchSlice};
