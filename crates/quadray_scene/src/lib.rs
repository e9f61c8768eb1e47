//! Scene graph, registries, and the sequential Phase 0 update pipeline.
//!
//! `quadray_render` depends on this crate for everything Phase 1 and the
//! tracer read: the node arena, materials/textures, and the per-frame
//! `trnode`/clipper-list state Phase 0 rebuilds here.

pub mod camera;
pub mod clipper;
pub mod ids;
pub mod light;
pub mod literal;
pub mod material;
pub mod node;
pub mod relation;
pub mod scene;
pub mod texture;
pub mod update;

pub use camera::CameraData;
pub use ids::{MaterialId, NodeId, TextureId};
pub use light::LightData;
pub use material::{Material, MaterialProps, MaterialTag, UvTransform};
pub use node::{ArrayData, NodeKind, ObjectNode, ShapeKind, Side, SurfaceData};
pub use relation::{Relation, RelationKind};
pub use scene::{BuildStats, Scene};
pub use texture::Texture;
pub use update::update_phase0;
