//! CPU rasterizer producing aligned position, normal and coverage maps.
//!
//! Each view transforms the mesh into camera space with the rigid inverse of
//! its camera-to-world matrix, projects orthographically through the rig's
//! shared bounds and scans pixel centres with edge functions. The depth test
//! keeps the surface nearest to the eye along the viewing direction. Near and
//! far are unbounded and both windings are drawn.

use ndarray::{Array3, Array4, Axis, s};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::camera::{CameraRig, OrthoBounds};
use super::mesh::{TexturedMesh, compute_vertex_normals};
use super::{Point3, Transform, Vec3};
use crate::error::{
    InvalidMeshError, InvalidRenderInputError, RenderError, ResourceAcquisitionError,
};

/// Largest side length a context accepts unless configured otherwise.
pub const DEFAULT_MAX_RESOLUTION: usize = 4096;

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// Working memory for rasterization, reused across calls.
///
/// A context is passed explicitly to every render call and borrowed mutably
/// for its duration, so independent contexts can coexist.
#[derive(Debug)]
pub struct RasterContext {
    max_resolution: usize,
    depth: Vec<Vec<f64>>,
}

impl RasterContext {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_resolution(DEFAULT_MAX_RESOLUTION)
    }

    #[must_use]
    pub fn with_max_resolution(max_resolution: usize) -> Self {
        Self {
            max_resolution,
            depth: Vec::new(),
        }
    }

    #[must_use]
    pub fn max_resolution(&self) -> usize {
        self.max_resolution
    }

    /// Number of per-view depth buffers currently held.
    #[must_use]
    pub fn scratch_views(&self) -> usize {
        self.depth.len()
    }

    /// Ensures `views` depth buffers of `height * width` entries, reset to +inf.
    pub fn reserve(
        &mut self,
        views: usize,
        height: usize,
        width: usize,
    ) -> Result<(), ResourceAcquisitionError> {
        if height > self.max_resolution || width > self.max_resolution {
            return Err(ResourceAcquisitionError::ResolutionLimit {
                height,
                width,
                limit: self.max_resolution,
            });
        }
        let pixels = height.saturating_mul(width);
        let bytes = pixels
            .saturating_mul(std::mem::size_of::<f64>())
            .saturating_mul(views);

        if self.depth.len() < views {
            self.depth
                .try_reserve_exact(views - self.depth.len())
                .map_err(|_| ResourceAcquisitionError::Allocation { bytes })?;
            self.depth.resize_with(views, Vec::new);
        }
        for buffer in &mut self.depth[..views] {
            buffer.clear();
            buffer
                .try_reserve_exact(pixels)
                .map_err(|_| ResourceAcquisitionError::Allocation { bytes })?;
            buffer.resize(pixels, f64::INFINITY);
        }
        Ok(())
    }
}

impl Default for RasterContext {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outputs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Value written to every normal channel of uncovered pixels.
    pub normal_background: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            normal_background: 0.0,
        }
    }
}

/// Raw per-view attributes in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOutput {
    /// `(N, H, W, 3)` world positions; uncovered pixels hold 0.0.
    pub position: Array4<f32>,
    /// `(N, H, W, 3)` unit normals; uncovered pixels hold the background value.
    pub normal: Array4<f32>,
    /// `(N, H, W, 1)` coverage, 1.0 where a triangle was drawn.
    pub mask: Array4<f32>,
}

/// Remapped maps ready to be used as control images.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    /// `clamp(position + 0.5, 0, 1)`.
    pub position_map: Array4<f32>,
    /// `clamp(normal / 2 + 0.5, 0, 1)`.
    pub normal_map: Array4<f32>,
    pub mask: Array4<f32>,
}

impl RasterOutput {
    #[must_use]
    pub fn views(&self) -> usize {
        self.mask.shape()[0]
    }

    #[must_use]
    pub fn to_render_output(&self) -> RenderOutput {
        RenderOutput {
            position_map: self.position.mapv(|v| (v + 0.5).clamp(0.0, 1.0)),
            normal_map: self.normal.mapv(|v| (v / 2.0 + 0.5).clamp(0.0, 1.0)),
            mask: self.mask.clone(),
        }
    }
}

impl From<RasterOutput> for RenderOutput {
    fn from(raw: RasterOutput) -> Self {
        raw.to_render_output()
    }
}

impl RenderOutput {
    #[must_use]
    pub fn views(&self) -> usize {
        self.mask.shape()[0]
    }

    /// `(height, width)` of every map.
    #[must_use]
    pub fn size(&self) -> (usize, usize) {
        (self.mask.shape()[1], self.mask.shape()[2])
    }

    /// Masks without the trailing channel axis, `(N, H, W)`.
    #[must_use]
    pub fn masks_squeezed(&self) -> Array3<f32> {
        self.mask.index_axis(Axis(3), 0).to_owned()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Render
// ─────────────────────────────────────────────────────────────────────────────

/// Renders every view of `rig` with default options and remaps the result.
pub fn render(
    ctx: &mut RasterContext,
    mesh: &TexturedMesh,
    rig: &CameraRig,
    height: usize,
    width: usize,
) -> Result<RenderOutput, RenderError> {
    rasterize(ctx, mesh, rig, height, width, RenderOptions::default()).map(RenderOutput::from)
}

/// Renders every view of `rig` in rig order, returning raw world-space attributes.
pub fn rasterize(
    ctx: &mut RasterContext,
    mesh: &TexturedMesh,
    rig: &CameraRig,
    height: usize,
    width: usize,
    options: RenderOptions,
) -> Result<RasterOutput, RenderError> {
    validate_inputs(mesh, rig, height, width)?;
    ctx.reserve(rig.len(), height, width)?;

    let scene = PreparedMesh::new(mesh);
    let views = rig.len();
    let bounds = rig.bounds;
    let scratch = &mut ctx.depth[..views];
    let targets = rasterize_views(&scene, &rig.camera_to_world, bounds, scratch, height, width, options);

    let mut out = RasterOutput {
        position: Array4::zeros((views, height, width, 3)),
        normal: Array4::from_elem((views, height, width, 3), options.normal_background),
        mask: Array4::zeros((views, height, width, 1)),
    };
    for (i, target) in targets.into_iter().enumerate() {
        out.position.slice_mut(s![i, .., .., ..]).assign(&target.position);
        out.normal.slice_mut(s![i, .., .., ..]).assign(&target.normal);
        out.mask.slice_mut(s![i, .., .., 0]).assign(&target.mask);
    }

    log::debug!(
        "rasterized {} triangles into {views} views at {height}x{width}",
        mesh.triangle_count()
    );
    Ok(out)
}

fn validate_inputs(
    mesh: &TexturedMesh,
    rig: &CameraRig,
    height: usize,
    width: usize,
) -> Result<(), RenderError> {
    if height == 0 || width == 0 {
        return Err(InvalidRenderInputError::ZeroSize { height, width }.into());
    }
    if mesh.triangle_indices.is_empty() {
        return Err(InvalidRenderInputError::NoTriangles.into());
    }
    if let Some((view, &distance)) = rig
        .distance
        .iter()
        .enumerate()
        .find(|(_, d)| !(d.is_finite() && **d > 0.0))
    {
        return Err(InvalidRenderInputError::InvalidDistance { view, distance }.into());
    }
    let OrthoBounds {
        left,
        right,
        bottom,
        top,
    } = rig.bounds;
    if rig.bounds.is_degenerate() {
        return Err(InvalidRenderInputError::DegenerateBounds {
            left,
            right,
            bottom,
            top,
        }
        .into());
    }

    let vertex_count = mesh.vertex_count();
    for (triangle, tri) in mesh.triangle_indices.iter().enumerate() {
        if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(InvalidMeshError::IndexOutOfRange {
                triangle,
                index,
                vertex_count,
            }
            .into());
        }
    }
    if let Some(index) = mesh
        .vertex_positions
        .iter()
        .position(|p| !p.iter().all(|v| v.is_finite()))
    {
        return Err(InvalidMeshError::NonFiniteVertex { index }.into());
    }
    Ok(())
}

/// World-space attributes shared by every view.
struct PreparedMesh<'a> {
    points: Vec<Point3>,
    vertex_normals: Vec<Vec3>,
    face_normals: Vec<Vec3>,
    triangles: &'a [[u32; 3]],
}

impl<'a> PreparedMesh<'a> {
    fn new(mesh: &'a TexturedMesh) -> Self {
        let points: Vec<Point3> = mesh
            .vertex_positions
            .iter()
            .copied()
            .map(Point3::from_f32)
            .collect();
        let vertex_normals = compute_vertex_normals(&points, &mesh.triangle_indices);
        let face_normals = mesh
            .triangle_indices
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| points[i as usize]);
                b.sub_point(a).cross(c.sub_point(a)).normalized().unwrap_or(Vec3::ZERO)
            })
            .collect();
        Self {
            points,
            vertex_normals,
            face_normals,
            triangles: &mesh.triangle_indices,
        }
    }
}

/// Attributes of one view before they are packed into the batch.
struct ViewTarget {
    position: Array3<f32>,
    normal: Array3<f32>,
    mask: ndarray::Array2<f32>,
}

#[cfg(feature = "parallel")]
fn rasterize_views(
    scene: &PreparedMesh<'_>,
    cameras: &[Transform],
    bounds: OrthoBounds,
    scratch: &mut [Vec<f64>],
    height: usize,
    width: usize,
    options: RenderOptions,
) -> Vec<ViewTarget> {
    cameras
        .par_iter()
        .zip(scratch.par_iter_mut())
        .map(|(c2w, depth)| rasterize_view(scene, *c2w, bounds, depth, height, width, options))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn rasterize_views(
    scene: &PreparedMesh<'_>,
    cameras: &[Transform],
    bounds: OrthoBounds,
    scratch: &mut [Vec<f64>],
    height: usize,
    width: usize,
    options: RenderOptions,
) -> Vec<ViewTarget> {
    cameras
        .iter()
        .zip(scratch.iter_mut())
        .map(|(c2w, depth)| rasterize_view(scene, *c2w, bounds, depth, height, width, options))
        .collect()
}

/// Signed doubled area of `(a, b, p)`; the sign tells which side of `ab` `p` lies on.
fn edge_function(a: [f64; 2], b: [f64; 2], p: [f64; 2]) -> f64 {
    (p[0] - a[0]) * (b[1] - a[1]) - (p[1] - a[1]) * (b[0] - a[0])
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::too_many_lines
)]
fn rasterize_view(
    scene: &PreparedMesh<'_>,
    c2w: Transform,
    bounds: OrthoBounds,
    depth: &mut [f64],
    height: usize,
    width: usize,
    options: RenderOptions,
) -> ViewTarget {
    let mut target = ViewTarget {
        position: Array3::zeros((height, width, 3)),
        normal: Array3::from_elem((height, width, 3), options.normal_background),
        mask: ndarray::Array2::zeros((height, width)),
    };

    let w2c = c2w.rigid_inverse();
    let (w, h) = (width as f64, height as f64);

    // Screen space: x right in [0, W], y down in [0, H], z = distance along forward.
    let screen: Vec<[f64; 3]> = scene
        .points
        .iter()
        .map(|&p| {
            let cam = w2c.apply_point(p);
            let (xn, yn) = bounds.camera_to_ndc(cam.x, cam.y);
            [(xn + 1.0) * 0.5 * w, (1.0 - yn) * 0.5 * h, -cam.z]
        })
        .collect();

    for (face, tri) in scene.triangles.iter().enumerate() {
        let [ia, ib, ic] = tri.map(|i| i as usize);
        let (a, b, c) = (screen[ia], screen[ib], screen[ic]);
        let area = edge_function([a[0], a[1]], [b[0], b[1]], [c[0], c[1]]);
        if !area.is_finite() || area.abs() < 1e-12 {
            continue;
        }

        let min_x = a[0].min(b[0]).min(c[0]);
        let max_x = a[0].max(b[0]).max(c[0]);
        let min_y = a[1].min(b[1]).min(c[1]);
        let max_y = a[1].max(b[1]).max(c[1]);

        let col_start = (min_x - 0.5).ceil().max(0.0);
        let col_end = (max_x - 0.5).floor().min(w - 1.0);
        let row_start = (min_y - 0.5).ceil().max(0.0);
        let row_end = (max_y - 0.5).floor().min(h - 1.0);
        if col_start > col_end || row_start > row_end {
            continue;
        }

        for row in row_start as usize..=row_end as usize {
            let py = row as f64 + 0.5;
            for col in col_start as usize..=col_end as usize {
                let p = [col as f64 + 0.5, py];
                let la = edge_function([b[0], b[1]], [c[0], c[1]], p) / area;
                let lb = edge_function([c[0], c[1]], [a[0], a[1]], p) / area;
                let lc = edge_function([a[0], a[1]], [b[0], b[1]], p) / area;
                if la < 0.0 || lb < 0.0 || lc < 0.0 {
                    continue;
                }

                let z = la * a[2] + lb * b[2] + lc * c[2];
                let slot = row * width + col;
                if z >= depth[slot] {
                    continue;
                }
                depth[slot] = z;

                let pa = scene.points[ia].to_vec3();
                let pb = scene.points[ib].to_vec3();
                let pc = scene.points[ic].to_vec3();
                let position = pa * la + pb * lb + pc * lc;

                let blended = scene.vertex_normals[ia] * la
                    + scene.vertex_normals[ib] * lb
                    + scene.vertex_normals[ic] * lc;
                let normal = blended.normalized().unwrap_or(scene.face_normals[face]);

                for (ch, (pv, nv)) in position
                    .to_array()
                    .into_iter()
                    .zip(normal.to_array())
                    .enumerate()
                {
                    target.position[[row, col, ch]] = pv as f32;
                    target.normal[[row, col, ch]] = nv as f32;
                }
                target.mask[[row, col]] = 1.0;
            }
        }
    }

    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::camera::build_orthographic_rig;

    fn single_triangle() -> TexturedMesh {
        TexturedMesh {
            vertex_positions: vec![[0.0, -0.5, -0.5], [0.0, 0.5, -0.5], [0.0, 0.0, 0.5]],
            triangle_indices: vec![[0, 1, 2]],
            uv_coordinates: None,
            uv_triangle_indices: None,
            base_color_texture: None,
            stitched: None,
        }
    }

    fn front_rig() -> CameraRig {
        build_orthographic_rig(&[0.0], &[0.0], &[2.0], OrthoBounds::symmetric(2.0)).unwrap()
    }

    #[test]
    fn test_resolution_limit() {
        let mut ctx = RasterContext::with_max_resolution(16);
        let err = ctx.reserve(1, 32, 8).unwrap_err();
        assert!(matches!(err, ResourceAcquisitionError::ResolutionLimit { limit: 16, .. }));
        assert!(ctx.reserve(2, 16, 16).is_ok());
        assert_eq!(ctx.scratch_views(), 2);
    }

    #[test]
    fn test_triangle_normal_faces_camera() {
        let mut ctx = RasterContext::new();
        let raw = rasterize(&mut ctx, &single_triangle(), &front_rig(), 8, 8, RenderOptions::default())
            .unwrap();
        // The triangle lies in x = 0 with its normal along +x, toward the eye.
        let covered: Vec<(usize, usize)> = (0..8)
            .flat_map(|r| (0..8).map(move |c| (r, c)))
            .filter(|&(r, c)| raw.mask[[0, r, c, 0]] > 0.5)
            .collect();
        assert!(!covered.is_empty());
        for (r, c) in covered {
            assert!((raw.normal[[0, r, c, 0]] - 1.0).abs() < 1e-5);
            assert!(raw.position[[0, r, c, 0]].abs() < 1e-6);
        }
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        let mut ctx = RasterContext::new();
        let mesh = single_triangle();
        assert!(matches!(
            render(&mut ctx, &mesh, &front_rig(), 0, 8),
            Err(RenderError::InvalidInput(InvalidRenderInputError::ZeroSize { .. }))
        ));

        let mut empty = mesh.clone();
        empty.triangle_indices.clear();
        assert!(matches!(
            render(&mut ctx, &empty, &front_rig(), 8, 8),
            Err(RenderError::InvalidInput(InvalidRenderInputError::NoTriangles))
        ));

        let mut rig = front_rig();
        rig.distance[0] = 0.0;
        assert!(matches!(
            render(&mut ctx, &mesh, &rig, 8, 8),
            Err(RenderError::InvalidInput(InvalidRenderInputError::InvalidDistance { view: 0, .. }))
        ));

        let mut rig = front_rig();
        rig.bounds = OrthoBounds::new(1.0, -1.0, -1.0, 1.0);
        assert!(matches!(
            render(&mut ctx, &mesh, &rig, 8, 8),
            Err(RenderError::InvalidInput(InvalidRenderInputError::DegenerateBounds { .. }))
        ));

        let mut broken = mesh;
        broken.triangle_indices[0][2] = 9;
        assert!(matches!(
            render(&mut ctx, &broken, &front_rig(), 8, 8),
            Err(RenderError::InvalidMesh(InvalidMeshError::IndexOutOfRange { index: 9, .. }))
        ));
    }
}
