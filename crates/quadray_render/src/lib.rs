//! Phase 1 bounds recomputation, tiling/sorting, and the packetized
//! tracer backend (§4.4-§4.6).
//!
//! `quadray_scene` owns the graph and Phase 0; everything in this crate
//! either runs in parallel across that graph's surfaces (bounds, Phase 1)
//! or reads it once per frame to produce pixels (tiling, tracing). No
//! module here mutates scene topology.

pub mod array_bounds;
pub mod bounds;
pub mod framebuffer;
pub mod intersect;
pub mod packet;
pub mod shade;
pub mod tile;

pub use array_bounds::update_array_bounds;
pub use bounds::update_surface;
pub use framebuffer::{pack_xrgb, FrameBuffer};
pub use intersect::{intersect_surface, Hit, SideKind};
pub use packet::{PacketTracer, Ray, RayPacket, ScalarPacketTracer};
pub use tile::{build_tiles, sort_lights, CameraFrame, TileGrid};
