//! The scene graph container and its construction from a literal tree
//! (§3 `Scene`, §4.2).

use std::collections::HashMap;

use slotmap::SlotMap;

use quadray_core::options::RenderOpts;
use quadray_core::{QuadRayError, Result};

use crate::ids::{MaterialId, NodeId, TextureId};
use crate::literal::{ArrayLiteral, ObjectLiteral};
use crate::material::Material;
use crate::node::{ArrayData, NodeKind, ObjectNode};
use crate::texture::Texture;

/// Construction-time diagnostics (§4.2): how many literal nodes were
/// skipped for carrying an unrecognized tag, and the resulting graph
/// shape, so callers can decide whether a malformed literal is tolerable.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildStats {
    pub unsupported_tags: u32,
    pub node_count: usize,
    pub surface_count: usize,
    pub array_count: usize,
    pub camera_count: usize,
    pub light_count: usize,
}

/// The scene graph: node/material/texture registries plus the bookkeeping
/// the update pipeline and the public facade need (active camera,
/// insertion-ordered surface/camera/light lists, render options).
pub struct Scene {
    pub(crate) nodes: SlotMap<NodeId, ObjectNode>,
    pub(crate) materials: SlotMap<MaterialId, Material>,
    pub(crate) textures: SlotMap<TextureId, Texture>,
    texture_names: HashMap<String, TextureId>,
    pub(crate) root: NodeId,
    /// Insertion order of every `Surface` node, used by Phase 1's parallel
    /// iteration and by the tiler's scene-order fallback.
    pub(crate) surface_order: Vec<NodeId>,
    /// Insertion order of every `Array` node, used by Phase 1's parallel
    /// iteration over interior bound records.
    pub(crate) array_order: Vec<NodeId>,
    camera_order: Vec<NodeId>,
    light_order: Vec<NodeId>,
    active_camera: usize,
    pub opts: RenderOpts,
    pub(crate) last_time: Option<f32>,
    stats: BuildStats,
}

impl Scene {
    /// Builds an empty scene with no root yet (§4.1 "Registry/Heap" — the
    /// material/texture registries exist before any graph node does).
    /// Callers that need `SurfaceLiteral`/`SideLiteral`s to reference
    /// materials or textures must mint those ids from *this* scene via
    /// [`Scene::insert_material`]/[`Scene::insert_texture`] before calling
    /// [`Scene::attach_root`] — a `MaterialId` only resolves within the
    /// registry that produced it, so a literal built against a different
    /// `Scene` instance's ids would silently fail every material lookup.
    #[must_use]
    pub fn empty(opts: RenderOpts) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            texture_names: HashMap::new(),
            root: NodeId::default(),
            surface_order: Vec::new(),
            array_order: Vec::new(),
            camera_order: Vec::new(),
            light_order: Vec::new(),
            active_camera: 0,
            opts,
            last_time: None,
            stats: BuildStats::default(),
        }
    }

    /// Builds this scene's tree from a root array literal (§4.2) and
    /// records it as the scene's root. Unrecognized tags are skipped and
    /// counted in [`Scene::stats`] rather than failing the build; a
    /// structurally malformed literal (e.g. a relation operand index out
    /// of range) fails with [`QuadRayError::MalformedScene`].
    pub fn attach_root(&mut self, root: ArrayLiteral) -> Result<()> {
        let root_id = self.build_array(root, None)?;
        self.root = root_id;
        self.stats.node_count = self.nodes.len();
        self.stats.surface_count = self.surface_order.len();
        self.stats.array_count = self.array_order.len();
        self.stats.camera_count = self.camera_order.len();
        self.stats.light_count = self.light_order.len();
        log::debug!(
            "scene built: {} nodes ({} surfaces, {} arrays, {} cameras, {} lights), {} unsupported tags skipped",
            self.stats.node_count,
            self.stats.surface_count,
            self.stats.array_count,
            self.stats.camera_count,
            self.stats.light_count,
            self.stats.unsupported_tags,
        );
        Ok(())
    }

    /// Convenience constructor for literals that reference no materials or
    /// textures of their own (`Scene::empty` + `Scene::attach_root` in one
    /// call). Scenes whose surfaces carry materials must use the two-step
    /// form so the material ids are minted from the same registry the
    /// literal is built into.
    pub fn build(root: ArrayLiteral, opts: RenderOpts) -> Result<Self> {
        let mut scene = Self::empty(opts);
        scene.attach_root(root)?;
        Ok(scene)
    }

    fn build_array(&mut self, literal: ArrayLiteral, parent: Option<NodeId>) -> Result<NodeId> {
        let mut node = ObjectNode::new(literal.transform, NodeKind::Array(ArrayData::default()));
        node.animation = literal.animation;
        node.parent = parent;
        let id = self.nodes.insert(node);
        self.array_order.push(id);

        let mut children = Vec::with_capacity(literal.children.len());
        for child in literal.children {
            if let Some(child_id) = self.build_node(child, Some(id))? {
                children.push(child_id);
            }
        }

        let child_count = children.len();
        for relation in &literal.relations {
            let ok1 = relation.obj1 == -1 || (relation.obj1 as usize) < child_count;
            let ok2 = relation.obj2 == -1 || (relation.obj2 as usize) < child_count;
            if !ok1 || !ok2 {
                return Err(QuadRayError::MalformedScene(format!(
                    "relation operand out of range: obj1={}, obj2={}, child_count={child_count}",
                    relation.obj1, relation.obj2
                )));
            }
        }

        let array = self
            .nodes
            .get_mut(id)
            .and_then(|n| n.kind.as_array_mut())
            .expect("just inserted as Array");
        array.children = children;
        array.relations = literal.relations;
        Ok(id)
    }

    fn build_node(&mut self, literal: ObjectLiteral, parent: Option<NodeId>) -> Result<Option<NodeId>> {
        match literal {
            ObjectLiteral::Array(array) => Ok(Some(self.build_array(array, parent)?)),
            ObjectLiteral::Surface(surface) => {
                let shape = surface.shape;
                let outer = crate::node::Side {
                    material: surface.outer.material,
                };
                let inner = surface.inner.map(|s| crate::node::Side { material: s.material });
                let mut surface_data = crate::node::SurfaceData::new(shape, surface.coeffs, outer, inner);
                surface_data.clipper_min = surface.clipper_min;
                surface_data.clipper_max = surface.clipper_max;
                let mut node = ObjectNode::new(surface.transform, NodeKind::Surface(surface_data));
                node.animation = surface.animation;
                node.parent = parent;
                let id = self.nodes.insert(node);
                self.surface_order.push(id);
                Ok(Some(id))
            }
            ObjectLiteral::Camera(camera) => {
                let mut data = crate::camera::CameraData::new(
                    camera.ambient_color,
                    camera.ambient_intensity,
                    camera.pov,
                );
                data.pos_delta = camera.pos_delta;
                data.rot_delta = camera.rot_delta;
                let mut node = ObjectNode::new(camera.transform, NodeKind::Camera(data));
                node.animation = camera.animation;
                node.parent = parent;
                let id = self.nodes.insert(node);
                self.camera_order.push(id);
                Ok(Some(id))
            }
            ObjectLiteral::Light(light) => {
                let data = crate::light::LightData::new(light.color, light.lum, light.atten);
                let mut node = ObjectNode::new(light.transform, NodeKind::Light(data));
                node.animation = light.animation;
                node.parent = parent;
                let id = self.nodes.insert(node);
                self.light_order.push(id);
                Ok(Some(id))
            }
            ObjectLiteral::Unsupported => {
                self.stats.unsupported_tags += 1;
                Ok(None)
            }
        }
    }

    /// Inserts a material, returning a stable reference to it.
    pub fn insert_material(&mut self, mut material: Material) -> MaterialId {
        material.derive_props();
        self.materials.insert(material)
    }

    /// Inserts or, if `name` is already registered, returns the existing
    /// texture's id (§3 `Texture`: interned by name).
    pub fn insert_texture(&mut self, name: impl Into<String>, texture: Texture) -> TextureId {
        let name = name.into();
        if let Some(existing) = self.texture_names.get(&name) {
            return *existing;
        }
        let id = self.textures.insert(texture);
        self.texture_names.insert(name, id);
        id
    }

    #[must_use]
    pub fn texture_by_name(&self, name: &str) -> Option<TextureId> {
        self.texture_names.get(name).copied()
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ObjectNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ObjectNode> {
        self.nodes.get_mut(id)
    }

    #[must_use]
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    #[must_use]
    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id)
    }

    #[must_use]
    pub fn surfaces(&self) -> &[NodeId] {
        &self.surface_order
    }

    #[must_use]
    pub fn arrays(&self) -> &[NodeId] {
        &self.array_order
    }

    #[must_use]
    pub fn cameras(&self) -> &[NodeId] {
        &self.camera_order
    }

    #[must_use]
    pub fn lights(&self) -> &[NodeId] {
        &self.light_order
    }

    #[must_use]
    pub fn active_camera(&self) -> Option<NodeId> {
        self.camera_order.get(self.active_camera).copied()
    }

    /// Cycles to the next registered camera, wrapping around, and returns
    /// its id (§4.7 `next_cam`).
    pub fn next_cam(&mut self) -> Option<NodeId> {
        if self.camera_order.is_empty() {
            return None;
        }
        self.active_camera = (self.active_camera + 1) % self.camera_order.len();
        self.active_camera()
    }

    #[must_use]
    pub fn stats(&self) -> BuildStats {
        self.stats
    }
}
