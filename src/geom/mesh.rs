//! Mesh loading and normalization.
//!
//! A [`MeshAsset`] is what comes off disk: one or more parts with their own
//! index spaces. [`normalize`] flattens it into a single [`TexturedMesh`] in the
//! canonical frame (front +X, up +Z), optionally centered and rescaled, with
//! flipped UVs and a duplicate-free stitched topology for seam-aware work.

use std::collections::HashMap;

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use super::axis::{AxisDirection, FrameRemap};
use super::diagnostics::NormalizeDiagnostics;
use super::metrics::{PipelineMetrics, TimingBucket};
use super::{BBox, Point3, Tolerance, Vec3};
use crate::error::{ConfigurationError, InvalidMeshError, MeshError};

// ─────────────────────────────────────────────────────────────────────────────
// Source asset
// ─────────────────────────────────────────────────────────────────────────────

/// One object of a source file, indexed into its own vertex list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshPart {
    pub name: Option<String>,
    pub positions: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
    /// One UV per vertex when present.
    pub uvs: Option<Vec<[f32; 2]>>,
}

impl MeshPart {
    #[must_use]
    pub fn new(positions: Vec<[f32; 3]>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            name: None,
            positions,
            triangles,
            uvs: None,
        }
    }

    #[must_use]
    pub fn with_uvs(mut self, uvs: Vec<[f32; 2]>) -> Self {
        self.uvs = Some(uvs);
        self
    }
}

/// A raw mesh or multi-part scene plus an optional base-colour raster.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshAsset {
    pub parts: Vec<MeshPart>,
    /// `(H, W, C)` in `[0, 1]`, `C` is 3 or 4. Alpha is dropped on normalize.
    pub base_color: Option<Array3<f32>>,
}

impl MeshAsset {
    #[must_use]
    pub fn from_part(part: MeshPart) -> Self {
        Self {
            parts: vec![part],
            base_color: None,
        }
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|p| p.positions.len()).sum()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(|p| p.triangles.len()).sum()
    }

    #[must_use]
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(
            self.parts
                .iter()
                .flat_map(|p| p.positions.iter().copied().map(Point3::from_f32)),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Normalized mesh
// ─────────────────────────────────────────────────────────────────────────────

/// Base-colour texture of a normalized mesh.
#[derive(Debug, Clone, PartialEq)]
pub enum Texture {
    /// Decoded RGB raster, `(H, W, 3)` in `[0, 1]`.
    Decoded(Array3<f32>),
    /// Zero-filled `size x size` RGB raster, allocated only when materialized.
    Blank { size: usize },
}

impl Texture {
    /// `(height, width)` of the raster.
    #[must_use]
    pub fn dims(&self) -> (usize, usize) {
        match self {
            Self::Decoded(data) => (data.shape()[0], data.shape()[1]),
            Self::Blank { size } => (*size, *size),
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank { .. })
    }

    #[must_use]
    pub fn to_array(&self) -> Array3<f32> {
        match self {
            Self::Decoded(data) => data.clone(),
            Self::Blank { size } => Array3::zeros((*size, *size, 3)),
        }
    }
}

/// Duplicate-free topology produced by vertex merging.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StitchedMesh {
    pub positions: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
    /// Stitched vertex for every primary vertex.
    pub vertex_remap: Vec<u32>,
}

/// Renderer-ready mesh in the canonical frame. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TexturedMesh {
    pub vertex_positions: Vec<[f32; 3]>,
    pub triangle_indices: Vec<[u32; 3]>,
    pub uv_coordinates: Option<Vec<[f32; 2]>>,
    pub uv_triangle_indices: Option<Vec<[u32; 3]>>,
    pub base_color_texture: Option<Texture>,
    pub stitched: Option<StitchedMesh>,
}

impl TexturedMesh {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_positions.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangle_indices.len()
    }

    #[must_use]
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.vertex_positions.iter().copied().map(Point3::from_f32))
    }

    /// Area-weighted unit vertex normals over the primary triangles.
    ///
    /// Vertices touched only by degenerate triangles (or by none) get a zero
    /// normal so interpolation can detect them.
    #[must_use]
    pub fn vertex_normals(&self) -> Vec<[f32; 3]> {
        let points: Vec<Point3> = self
            .vertex_positions
            .iter()
            .copied()
            .map(Point3::from_f32)
            .collect();
        compute_vertex_normals(&points, &self.triangle_indices)
            .into_iter()
            .map(Vec3::to_f32)
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Which attributes two vertices must share to be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Merge on position alone, collapsing UV seams.
    #[default]
    PositionOnly,
    /// Keep UV seams split.
    PositionAndUv,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    pub rescale: bool,
    pub move_to_center: bool,
    /// Target max absolute coordinate when `rescale` is set.
    pub scale: f64,
    pub flip_uv: bool,
    pub merge_vertices: bool,
    pub merge_mode: MergeMode,
    /// Quantization cell used by the merge hash.
    pub merge_tolerance: f64,
    /// Side of the blank texture used when UVs exist without a base-colour image.
    pub default_uv_size: usize,
    pub up_axis: AxisDirection,
    pub front_axis: AxisDirection,
    pub front_x_to_y: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            rescale: false,
            move_to_center: false,
            scale: 0.5,
            flip_uv: true,
            merge_vertices: true,
            merge_mode: MergeMode::PositionOnly,
            merge_tolerance: Tolerance::WELD.eps,
            default_uv_size: 2048,
            up_axis: AxisDirection::PosY,
            front_axis: AxisDirection::PosX,
            front_x_to_y: false,
        }
    }
}

/// Maps normalized coordinates back to the source: `source = normalized * scale_factor + centroid`
/// (before the frame remap).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizeTransform {
    pub centroid: [f64; 3],
    pub scale_factor: f64,
}

impl Default for NormalizeTransform {
    fn default() -> Self {
        Self {
            centroid: [0.0; 3],
            scale_factor: 1.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Normalize
// ─────────────────────────────────────────────────────────────────────────────

pub fn normalize(
    asset: &MeshAsset,
    options: &NormalizeOptions,
) -> Result<(TexturedMesh, NormalizeDiagnostics), MeshError> {
    let mut metrics = PipelineMetrics::default();
    normalize_with_metrics(asset, options, &mut metrics)
}

pub fn normalize_with_metrics(
    asset: &MeshAsset,
    options: &NormalizeOptions,
    metrics: &mut PipelineMetrics,
) -> Result<(TexturedMesh, NormalizeDiagnostics), MeshError> {
    metrics.begin();
    let remap = FrameRemap::new(options.up_axis, options.front_axis, options.front_x_to_y)?;
    if options.rescale && !(options.scale.is_finite() && options.scale > 0.0) {
        return Err(ConfigurationError::InvalidRescaleTarget(options.scale).into());
    }

    let (flat, transform) = metrics.time(TimingBucket::MeshNormalize, || {
        let mut flat = flatten_parts(&asset.parts)?;
        let transform = center_and_rescale(&mut flat.points, options)?;
        if !remap.is_identity() {
            for p in &mut flat.points {
                *p = remap.apply(*p);
            }
        }
        Ok::<_, MeshError>((flat, transform))
    })?;

    let FlatMesh {
        points,
        triangles,
        uvs,
        uv_parts_missing,
    } = flat;

    let mut diagnostics = NormalizeDiagnostics {
        vertex_count: points.len(),
        triangle_count: triangles.len(),
        part_count: asset.parts.len(),
        transform,
        ..NormalizeDiagnostics::default()
    };
    if uv_parts_missing > 0 {
        diagnostics.add_warning(format!(
            "{uv_parts_missing} part(s) without UVs were given zero UV coordinates"
        ));
    }

    let vertex_positions: Vec<[f32; 3]> = points.iter().map(|p| p.to_f32()).collect();

    let (uv_coordinates, uv_triangle_indices, base_color_texture) = match uvs {
        Some(mut uvs) => {
            if options.flip_uv {
                for uv in &mut uvs {
                    uv[1] = 1.0 - uv[1];
                }
            }
            let texture = match &asset.base_color {
                Some(image) => Texture::Decoded(drop_alpha(image)),
                None => Texture::Blank {
                    size: options.default_uv_size,
                },
            };
            (Some(uvs), Some(triangles.clone()), Some(texture))
        }
        None => {
            if asset.base_color.is_some() {
                diagnostics.add_warning("base colour texture ignored: mesh has no UVs");
            }
            (None, None, None)
        }
    };

    let f32_points: Vec<Point3> = vertex_positions.iter().copied().map(Point3::from_f32).collect();
    let stitched = if options.merge_vertices {
        let key_uvs = match options.merge_mode {
            MergeMode::PositionOnly => None,
            MergeMode::PositionAndUv => uv_coordinates.as_deref(),
        };
        let tol = Tolerance::new(options.merge_tolerance);
        Some(metrics.time(TimingBucket::Welding, || {
            merge_vertices(&f32_points, key_uvs, &triangles, tol)
        }))
    } else {
        None
    };

    metrics.time(TimingBucket::Diagnostics, || {
        diagnostics.degenerate_triangle_count =
            count_degenerate_triangles(&f32_points, &triangles, Tolerance::DEFAULT);
        let topology = stitched.as_ref().map_or(&triangles, |s| &s.triangles);
        let (open, non_manifold) = count_edge_topology(topology);
        diagnostics.open_edge_count = open;
        diagnostics.non_manifold_edge_count = non_manifold;
        if let Some(stitched) = &stitched {
            diagnostics.merged_vertex_count =
                vertex_positions.len().saturating_sub(stitched.positions.len());
        }
    });
    if diagnostics.non_manifold_edge_count > 0 {
        diagnostics.add_warning("mesh has non-manifold edges");
    }
    diagnostics.timing = metrics.end();

    log::debug!("normalize: {}", diagnostics.summary());

    let mesh = TexturedMesh {
        vertex_positions,
        triangle_indices: triangles,
        uv_coordinates,
        uv_triangle_indices,
        base_color_texture,
        stitched,
    };
    Ok((mesh, diagnostics))
}

struct FlatMesh {
    points: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    uvs: Option<Vec<[f32; 2]>>,
    uv_parts_missing: usize,
}

/// Concatenates parts, offsetting each part's indices by the running vertex count.
fn flatten_parts(parts: &[MeshPart]) -> Result<FlatMesh, InvalidMeshError> {
    let vertex_total: usize = parts.iter().map(|p| p.positions.len()).sum();
    if vertex_total == 0 {
        return Err(InvalidMeshError::Empty);
    }
    if u32::try_from(vertex_total).is_err() {
        return Err(InvalidMeshError::TooManyVertices(vertex_total));
    }

    let any_uvs = parts.iter().any(|p| p.uvs.is_some());
    let mut points = Vec::with_capacity(vertex_total);
    let mut triangles = Vec::with_capacity(parts.iter().map(|p| p.triangles.len()).sum());
    let mut uvs = any_uvs.then(|| Vec::with_capacity(vertex_total));
    let mut uv_parts_missing = 0usize;

    for (part_index, part) in parts.iter().enumerate() {
        // vertex_total fits u32, so every running offset does too
        #[allow(clippy::cast_possible_truncation)]
        let offset = points.len() as u32;
        let part_len = part.positions.len();

        for p in &part.positions {
            let v = Vec3::from_f32(*p);
            if !v.is_finite() {
                return Err(InvalidMeshError::NonFiniteVertex {
                    index: points.len(),
                });
            }
            points.push(v);
        }

        for tri in &part.triangles {
            for &index in tri {
                if index as usize >= part_len {
                    return Err(InvalidMeshError::IndexOutOfRange {
                        triangle: triangles.len(),
                        index: index + offset,
                        vertex_count: vertex_total,
                    });
                }
            }
            triangles.push([tri[0] + offset, tri[1] + offset, tri[2] + offset]);
        }

        if let Some(out) = uvs.as_mut() {
            match &part.uvs {
                Some(part_uvs) if part_uvs.len() == part_len => out.extend_from_slice(part_uvs),
                Some(part_uvs) => {
                    return Err(InvalidMeshError::UvLengthMismatch {
                        part: part_index,
                        uvs: part_uvs.len(),
                        vertices: part_len,
                    });
                }
                None => {
                    uv_parts_missing += 1;
                    out.extend(std::iter::repeat_n([0.0, 0.0], part_len));
                }
            }
        }
    }

    Ok(FlatMesh {
        points,
        triangles,
        uvs,
        uv_parts_missing,
    })
}

fn center_and_rescale(
    points: &mut [Vec3],
    options: &NormalizeOptions,
) -> Result<NormalizeTransform, InvalidMeshError> {
    let mut transform = NormalizeTransform::default();

    if options.move_to_center {
        #[allow(clippy::cast_precision_loss)]
        let count = points.len() as f64;
        let sum = points.iter().fold(Vec3::ZERO, |acc, p| acc + *p);
        let centroid = sum / count;
        for p in points.iter_mut() {
            *p = *p - centroid;
        }
        transform.centroid = centroid.to_array();
    }

    if options.rescale {
        let max_abs = points.iter().fold(0.0_f64, |acc, p| acc.max(p.max_abs()));
        if max_abs <= 0.0 || !max_abs.is_finite() {
            return Err(InvalidMeshError::DegenerateExtent);
        }
        for p in points.iter_mut() {
            *p = *p / max_abs * options.scale;
        }
        transform.scale_factor = max_abs / options.scale;
    }

    Ok(transform)
}

fn drop_alpha(image: &Array3<f32>) -> Array3<f32> {
    let channels = image.shape()[2];
    if channels <= 3 {
        return image.clone();
    }
    image.slice(ndarray::s![.., .., 0..3]).to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Fit to extent
// ─────────────────────────────────────────────────────────────────────────────

/// Uniformly scales `asset` so its longest bounding-box side equals `size`,
/// negating the factor on every axis flagged in `flip`.
///
/// Extents at or below 1e-6 keep a factor of 1. An odd number of flips mirrors
/// the mesh, so triangle winding is reversed to keep faces pointing outward.
#[must_use]
pub fn fit_to_extent(asset: &MeshAsset, size: f64, flip: [bool; 3]) -> MeshAsset {
    let extent = asset.bbox().map_or(0.0, BBox::max_extent);
    let factor = if extent <= Tolerance::EXTENT.eps {
        1.0
    } else {
        size / extent
    };
    let scales = flip.map(|f| if f { -factor } else { factor });
    let mirrored = flip.iter().filter(|&&f| f).count() % 2 == 1;

    let parts = asset
        .parts
        .iter()
        .map(|part| {
            let positions = part
                .positions
                .iter()
                .map(|p| {
                    let v = Vec3::from_f32(*p);
                    Vec3::new(v.x * scales[0], v.y * scales[1], v.z * scales[2]).to_f32()
                })
                .collect();
            let triangles = if mirrored {
                part.triangles.iter().map(|t| [t[0], t[2], t[1]]).collect()
            } else {
                part.triangles.clone()
            };
            MeshPart {
                name: part.name.clone(),
                positions,
                triangles,
                uvs: part.uvs.clone(),
            }
        })
        .collect();

    log::debug!("fit_to_extent: extent {extent} -> factor {factor}, flips {flip:?}");

    MeshAsset {
        parts,
        base_color: asset.base_color.clone(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Merge and topology helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Merges vertices whose positions (and UVs, when given) agree within `tol`.
///
/// Positions are hashed into a grid of `tol`-sized cells; each vertex checks
/// the 27 neighbouring cells, so the pass is linear in vertices plus triangles.
/// The first occurrence of a position is kept, which makes the result
/// independent of hash iteration order.
#[must_use]
pub fn merge_vertices(
    points: &[Point3],
    uvs: Option<&[[f32; 2]]>,
    triangles: &[[u32; 3]],
    tol: Tolerance,
) -> StitchedMesh {
    #[allow(clippy::cast_possible_truncation)]
    fn quantize(value: f64, inv: f64) -> i64 {
        (value * inv).floor().clamp(i64::MIN as f64, i64::MAX as f64) as i64
    }

    fn uv_matches(uvs: Option<&[[f32; 2]]>, a: usize, b: usize, eps: f64) -> bool {
        let Some(uvs) = uvs else {
            return true;
        };
        let (ua, ub) = (uvs[a], uvs[b]);
        (f64::from(ua[0]) - f64::from(ub[0])).abs() <= eps
            && (f64::from(ua[1]) - f64::from(ub[1])).abs() <= eps
    }

    if !tol.eps.is_finite() || tol.eps <= 0.0 {
        let positions = points.iter().map(|p| p.to_vec3().to_f32()).collect();
        #[allow(clippy::cast_possible_truncation)]
        let vertex_remap = (0..points.len()).map(|i| i as u32).collect();
        return StitchedMesh {
            positions,
            triangles: triangles.to_vec(),
            vertex_remap,
        };
    }

    let inv = 1.0 / tol.eps;
    let mut buckets: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    // Source index of every kept vertex, for UV comparisons.
    let mut kept_source: Vec<usize> = Vec::with_capacity(points.len());
    let mut out_points: Vec<Point3> = Vec::with_capacity(points.len());
    let mut remap: Vec<u32> = Vec::with_capacity(points.len());

    for (i, p) in points.iter().copied().enumerate() {
        let key = (quantize(p.x, inv), quantize(p.y, inv), quantize(p.z, inv));

        let mut found = None;
        'search: for dx in -1i64..=1 {
            for dy in -1i64..=1 {
                for dz in -1i64..=1 {
                    let lookup = (
                        key.0.saturating_add(dx),
                        key.1.saturating_add(dy),
                        key.2.saturating_add(dz),
                    );
                    let Some(candidates) = buckets.get(&lookup) else {
                        continue;
                    };
                    for &cand in candidates {
                        let c = cand as usize;
                        if tol.approx_eq_point3(out_points[c], p)
                            && uv_matches(uvs, kept_source[c], i, tol.eps)
                        {
                            found = Some(cand);
                            break 'search;
                        }
                    }
                }
            }
        }

        let out_idx = if let Some(existing) = found {
            existing
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let new_idx = out_points.len() as u32;
            out_points.push(p);
            kept_source.push(i);
            buckets.entry(key).or_default().push(new_idx);
            new_idx
        };
        remap.push(out_idx);
    }

    let out_triangles = triangles
        .iter()
        .map(|t| t.map(|idx| remap[idx as usize]))
        .collect();

    StitchedMesh {
        positions: out_points.iter().map(|p| p.to_vec3().to_f32()).collect(),
        triangles: out_triangles,
        vertex_remap: remap,
    }
}

/// Counts boundary edges (one triangle) and non-manifold edges (three or more).
#[must_use]
pub fn count_edge_topology(triangles: &[[u32; 3]]) -> (usize, usize) {
    let mut edge_counts: HashMap<(u32, u32), u32> = HashMap::new();

    for &[i0, i1, i2] in triangles {
        if i0 == i1 || i1 == i2 || i0 == i2 {
            continue;
        }
        for (a, b) in [(i0, i1), (i1, i2), (i2, i0)] {
            let edge = if a <= b { (a, b) } else { (b, a) };
            *edge_counts.entry(edge).or_insert(0) += 1;
        }
    }

    let mut open = 0usize;
    let mut non_manifold = 0usize;
    for count in edge_counts.into_values() {
        if count == 1 {
            open += 1;
        } else if count > 2 {
            non_manifold += 1;
        }
    }
    (open, non_manifold)
}

fn count_degenerate_triangles(points: &[Point3], triangles: &[[u32; 3]], tol: Tolerance) -> usize {
    triangles
        .iter()
        .filter(|t| {
            let a = points[t[0] as usize];
            let b = points[t[1] as usize];
            let c = points[t[2] as usize];
            let area2 = b.sub_point(a).cross(c.sub_point(a)).length_squared();
            !area2.is_finite() || area2 <= tol.eps_squared() * tol.eps_squared()
        })
        .count()
}

/// Sums unnormalized face normals (twice the triangle area) into each corner.
pub(crate) fn compute_vertex_normals(points: &[Point3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; points.len()];

    for tri in triangles {
        let [i0, i1, i2] = tri.map(|i| i as usize);
        let (Some(a), Some(b), Some(c)) = (points.get(i0), points.get(i1), points.get(i2)) else {
            continue;
        };
        let n = b.sub_point(*a).cross(c.sub_point(*a));
        if !n.is_finite() {
            continue;
        }
        normals[i0] = normals[i0] + n;
        normals[i1] = normals[i1] + n;
        normals[i2] = normals[i2] + n;
    }

    for n in &mut normals {
        *n = n.normalized().unwrap_or(Vec3::ZERO);
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_with_seam() -> MeshAsset {
        // Two triangles that share an edge but carry duplicated vertices.
        let positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let uvs = vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
        ];
        MeshAsset::from_part(MeshPart::new(positions, vec![[0, 1, 2], [3, 4, 5]]).with_uvs(uvs))
    }

    #[test]
    fn test_merge_collapses_duplicates() {
        let asset = quad_with_seam();
        let (mesh, diag) = normalize(&asset, &NormalizeOptions::default()).unwrap();

        let stitched = mesh.stitched.as_ref().unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(stitched.positions.len(), 4);
        assert_eq!(stitched.vertex_remap.len(), 6);
        assert_eq!(diag.merged_vertex_count, 2);
        assert_eq!(diag.open_edge_count, 4);
        assert!(diag.is_manifold());
    }

    #[test]
    fn test_merge_position_and_uv_keeps_seams() {
        let mut asset = quad_with_seam();
        if let Some(uvs) = asset.parts[0].uvs.as_mut() {
            uvs[3] = [0.5, 0.5];
        }
        let options = NormalizeOptions {
            merge_mode: MergeMode::PositionAndUv,
            ..NormalizeOptions::default()
        };
        let (mesh, _) = normalize(&asset, &options).unwrap();
        assert_eq!(mesh.stitched.unwrap().positions.len(), 5);
    }

    #[test]
    fn test_flip_uv_and_blank_texture() {
        let (mesh, _) = normalize(&quad_with_seam(), &NormalizeOptions::default()).unwrap();
        let uvs = mesh.uv_coordinates.as_ref().unwrap();
        assert!((uvs[5][1] - 0.0).abs() < 1e-6);
        assert!((uvs[0][1] - 1.0).abs() < 1e-6);
        assert_eq!(mesh.uv_triangle_indices.as_ref(), Some(&mesh.triangle_indices));
        let texture = mesh.base_color_texture.unwrap();
        assert!(texture.is_blank());
        assert_eq!(texture.dims(), (2048, 2048));
    }

    #[test]
    fn test_decoded_texture_drops_alpha() {
        let mut asset = quad_with_seam();
        asset.base_color = Some(Array3::from_elem((4, 2, 4), 0.25));
        let (mesh, _) = normalize(&asset, &NormalizeOptions::default()).unwrap();
        match mesh.base_color_texture {
            Some(Texture::Decoded(data)) => assert_eq!(data.shape(), &[4, 2, 3]),
            other => panic!("expected decoded texture, got {other:?}"),
        }
    }

    #[test]
    fn test_vertex_normals_unit_length() {
        let (mesh, _) = normalize(&quad_with_seam(), &NormalizeOptions::default()).unwrap();
        for n in mesh.vertex_normals() {
            let len = Vec3::from_f32(n).length();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_fit_to_extent_scales_longest_side() {
        let asset = MeshAsset::from_part(MeshPart::new(
            vec![[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 2.0, 1.0]],
            vec![[0, 1, 2]],
        ));
        let fitted = fit_to_extent(&asset, 1.0, [false, false, false]);
        let extent = fitted.bbox().unwrap().max_extent();
        assert!((extent - 1.0).abs() < 1e-6);

        let flipped = fit_to_extent(&asset, 1.0, [true, false, false]);
        assert!((flipped.parts[0].positions[1][0] + 1.0).abs() < 1e-6);
        assert_eq!(flipped.parts[0].triangles[0], [0, 2, 1]);
    }

    #[test]
    fn test_fit_to_extent_tiny_mesh_unscaled() {
        let asset = MeshAsset::from_part(MeshPart::new(vec![[1e-8, 0.0, 0.0]], vec![]));
        let fitted = fit_to_extent(&asset, 2.0, [false; 3]);
        assert_eq!(fitted.parts[0].positions, asset.parts[0].positions);
    }

    #[test]
    fn test_edge_topology_closed_tetrahedron() {
        let tris = [[0, 1, 2], [0, 3, 1], [1, 3, 2], [2, 3, 0]];
        assert_eq!(count_edge_topology(&tris), (0, 0));
        assert_eq!(count_edge_topology(&tris[..1]), (3, 0));
    }
}
