//! Core types shared across the QuadRay workspace.
//!
//! This crate holds the pieces that have no opinion about scene topology or
//! rendering: the arena allocator (§4.1), the `Transform3D` math (§3), the
//! error taxonomy (§7), the bitflag option sets, and the external
//! collaborator "ports" (allocator + thread pool) that the engine is driven
//! through (§6).

pub mod arena;
pub mod errors;
pub mod options;
pub mod ports;
pub mod transform;

pub use arena::{Arena, ArenaIndex, ScratchPool};
pub use errors::{QuadRayError, Result};
pub use options::{FsaaMode, RenderOpts, SimdWidth};
pub use ports::{AllocPort, Phase, SystemAlloc, ThreadPoolPort};
#[cfg(feature = "rayon-pool")]
pub use ports::RayonThreadPool;
pub use transform::Transform3D;
