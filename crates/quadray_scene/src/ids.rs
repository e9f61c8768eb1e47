//! Slotmap key types for the scene graph and its registries (§3 of the
//! spec). Every cross-reference in the engine — parent links, `trnode`/
//! `bvnode` pointers, material/texture references, relation operands —
//! is one of these keys rather than an owning pointer, so the graph can
//! contain cycles-as-DAGs and arbitrary sharing without fighting the
//! borrow checker.

use slotmap::new_key_type;

new_key_type! {
    /// Key into [`crate::scene::Scene::nodes`]: identifies any object in
    /// the scene tree (Array, Surface, Camera or Light).
    pub struct NodeId;
}

new_key_type! {
    /// Key into [`crate::scene::Scene::materials`].
    pub struct MaterialId;
}

new_key_type! {
    /// Key into [`crate::scene::Scene::textures`].
    pub struct TextureId;
}
