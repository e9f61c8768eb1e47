#![warn(clippy::all)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_arguments)]

//! QuadRay: an offline/interactive CPU ray tracer for scenes of analytic
//! primitives (§1-§3 of the design), with a hierarchical animatable
//! object tree, a two-phase per-frame update pipeline (§4.3-§4.4), and a
//! tile-sorted packetized SIMD rendering backend (§4.5-§4.6).
//!
//! This crate is the public facade over the three workspace crates that
//! do the actual work:
//!
//! - [`quadray_core`]: arena allocator, `Transform3D`, error taxonomy,
//!   option bitflags, and the thread-pool/allocator ports.
//! - [`quadray_scene`]: the scene graph, its literal construction format,
//!   and the sequential Phase 0 update walk.
//! - [`quadray_render`]: Phase 1 bounds, tiling/sorting, and the
//!   packetized tracer.
//!
//! Embedding applications construct a [`Scene`] (minting any material or
//! texture ids the literal's surfaces reference, then attaching the root
//! literal via [`Scene::attach_root`]), hand it to [`Engine::new`] (or
//! [`Engine::with_rayon_pool`]; [`Engine::from_literal`] covers a literal
//! with no materials of its own), then drive it one frame at a time with
//! [`Engine::update`]/[`Engine::render`].

pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::{CameraAction, Engine};

pub use quadray_core::options::{FsaaMode, RenderOpts, SimdWidth};
pub use quadray_core::{QuadRayError, Result};
pub use quadray_scene::literal::{ArrayLiteral, CameraLiteral, LightLiteral, ObjectLiteral, SideLiteral, SurfaceLiteral};
pub use quadray_scene::material::{Material, MaterialProps, MaterialTag, UvTransform};
pub use quadray_scene::node::ShapeKind;
pub use quadray_scene::{MaterialId, NodeId, Scene, TextureId};
