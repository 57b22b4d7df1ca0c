//! Asset loading and export: Wavefront OBJ meshes, base-colour textures and
//! PNG dumps of rendered maps.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use ndarray::{Array3, ArrayView3, Axis, s};
use wavefront_obj::obj::{self, Primitive, VTNIndex};

use crate::error::{AssetError, InvalidMeshError};
use crate::geom::{MeshAsset, MeshPart};

// ─────────────────────────────────────────────────────────────────────────────
// OBJ
// ─────────────────────────────────────────────────────────────────────────────

/// Reads an OBJ file and, when given, a base-colour texture for it.
pub fn load_obj(path: impl AsRef<Path>, texture: Option<&Path>) -> Result<MeshAsset, AssetError> {
    let text = fs::read_to_string(path.as_ref())?;
    let mut asset = parse_obj(&text)?;
    if let Some(texture) = texture {
        asset.base_color = Some(load_texture(texture)?);
    }
    Ok(asset)
}

/// Parses OBJ text into one part per object.
///
/// Each distinct (position, texture coordinate) pair becomes one vertex, so
/// parts carry per-vertex UVs when the object has texture coordinates.
/// Corners without a texture index get UV `(0, 0)`. Points and lines are
/// skipped; objects without triangles are dropped.
pub fn parse_obj(text: &str) -> Result<MeshAsset, AssetError> {
    let set = obj::parse(text).map_err(|e| AssetError::Obj {
        line: e.line_number,
        message: e.message,
    })?;

    let mut parts = Vec::with_capacity(set.objects.len());
    let mut skipped = 0usize;
    for object in &set.objects {
        let textured = !object.tex_vertices.is_empty();
        let mut corners: HashMap<(usize, Option<usize>), u32> = HashMap::new();
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut uvs: Vec<[f32; 2]> = Vec::new();
        let mut triangles: Vec<[u32; 3]> = Vec::new();

        for shape in object.geometry.iter().flat_map(|g| &g.shapes) {
            let &Primitive::Triangle(a, b, c) = &shape.primitive else {
                skipped += 1;
                continue;
            };
            let triangle = triangles.len();
            let mut tri = [0u32; 3];
            for (slot, corner) in tri.iter_mut().zip([a, b, c]) {
                *slot = resolve_corner(
                    object,
                    corner,
                    triangle,
                    textured,
                    &mut corners,
                    &mut positions,
                    &mut uvs,
                )?;
            }
            triangles.push(tri);
        }

        if triangles.is_empty() {
            log::debug!("object '{}' has no triangles, skipping", object.name);
            continue;
        }
        let part = MeshPart {
            name: (!object.name.is_empty()).then(|| object.name.clone()),
            positions,
            triangles,
            uvs: textured.then_some(uvs),
        };
        parts.push(part);
    }
    if skipped > 0 {
        log::warn!("ignored {skipped} point/line primitives");
    }
    if parts.is_empty() {
        return Err(InvalidMeshError::Empty.into());
    }

    log::debug!(
        "parsed OBJ: {} parts, {} vertices",
        parts.len(),
        parts.iter().map(|p| p.positions.len()).sum::<usize>()
    );
    Ok(MeshAsset {
        parts,
        base_color: None,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn resolve_corner(
    object: &obj::Object,
    (vertex, texture, _normal): VTNIndex,
    triangle: usize,
    textured: bool,
    corners: &mut HashMap<(usize, Option<usize>), u32>,
    positions: &mut Vec<[f32; 3]>,
    uvs: &mut Vec<[f32; 2]>,
) -> Result<u32, AssetError> {
    let texture = if textured { texture } else { None };
    if let Some(&index) = corners.get(&(vertex, texture)) {
        return Ok(index);
    }
    let out_of_range = |index: usize, count: usize| InvalidMeshError::IndexOutOfRange {
        triangle,
        index: u32::try_from(index).unwrap_or(u32::MAX),
        vertex_count: count,
    };
    let v = object
        .vertices
        .get(vertex)
        .ok_or_else(|| out_of_range(vertex, object.vertices.len()))?;
    let uv = match texture {
        Some(t) => {
            let tv = object
                .tex_vertices
                .get(t)
                .ok_or_else(|| out_of_range(t, object.tex_vertices.len()))?;
            [tv.u as f32, tv.v as f32]
        }
        None => [0.0, 0.0],
    };

    let index = u32::try_from(positions.len())
        .map_err(|_| InvalidMeshError::TooManyVertices(positions.len()))?;
    positions.push([v.x as f32, v.y as f32, v.z as f32]);
    uvs.push(uv);
    corners.insert((vertex, texture), index);
    Ok(index)
}

// ─────────────────────────────────────────────────────────────────────────────
// Images
// ─────────────────────────────────────────────────────────────────────────────

/// Decodes an image file into an `(H, W, 3)` raster in `[0, 1]`.
pub fn load_texture(path: &Path) -> Result<Array3<f32>, AssetError> {
    let rgb = image::open(path)?.to_rgb32f();
    let (w, h) = (rgb.width() as usize, rgb.height() as usize);
    Array3::from_shape_vec((h, w, 3), rgb.into_raw()).map_err(|_| AssetError::Export {
        shape: vec![h, w, 3],
        reason: "decoded buffer does not match image size",
    })
}

/// Decodes an image file into an `(H, W, 4)` raster in `[0, 1]`.
pub fn load_rgba(path: &Path) -> Result<Array3<f32>, AssetError> {
    let rgba = image::open(path)?.to_rgba32f();
    let (w, h) = (rgba.width() as usize, rgba.height() as usize);
    Array3::from_shape_vec((h, w, 4), rgba.into_raw()).map_err(|_| AssetError::Export {
        shape: vec![h, w, 4],
        reason: "decoded buffer does not match image size",
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Writes one PNG per view of an `(N, H, W, C)` batch in `[0, 1]` and returns the paths.
///
/// `C` may be 1 (gray), 3 (RGB) or 6, which is written as two RGB files
/// suffixed `_a` and `_b`.
pub fn save_views_png(
    maps: &ndarray::Array4<f32>,
    dir: &Path,
    prefix: &str,
) -> Result<Vec<PathBuf>, AssetError> {
    let channels = maps.shape()[3];
    if !matches!(channels, 1 | 3 | 6) {
        return Err(AssetError::Export {
            shape: maps.shape().to_vec(),
            reason: "expected 1, 3 or 6 channels",
        });
    }
    fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for (i, view) in maps.axis_iter(Axis(0)).enumerate() {
        match channels {
            1 => {
                let path = dir.join(format!("{prefix}_{i:02}.png"));
                gray_image(view.index_axis(Axis(2), 0))?.save(&path)?;
                written.push(path);
            }
            3 => {
                let path = dir.join(format!("{prefix}_{i:02}.png"));
                rgb_image(view)?.save(&path)?;
                written.push(path);
            }
            _ => {
                for (half, suffix) in [(0..3, "a"), (3..6, "b")] {
                    let path = dir.join(format!("{prefix}_{i:02}_{suffix}.png"));
                    rgb_image(view.slice(s![.., .., half]))?.save(&path)?;
                    written.push(path);
                }
            }
        }
    }
    log::info!("wrote {} images with prefix '{prefix}' to {}", written.len(), dir.display());
    Ok(written)
}

/// Writes `(N, H, W)` masks as gray PNGs.
pub fn save_masks_png(masks: &Array3<f32>, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, AssetError> {
    save_views_png(&masks.view().insert_axis(Axis(3)).to_owned(), dir, prefix)
}

fn image_dims(h: usize, w: usize) -> Result<(u32, u32), AssetError> {
    match (u32::try_from(w), u32::try_from(h)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(AssetError::Export {
            shape: vec![h, w],
            reason: "image side exceeds u32",
        }),
    }
}

fn rgb_image(view: ArrayView3<'_, f32>) -> Result<RgbImage, AssetError> {
    let (h, w, _) = view.dim();
    let (width, height) = image_dims(h, w)?;
    Ok(ImageBuffer::from_fn(width, height, |x, y| {
        let (r, c) = (y as usize, x as usize);
        Rgb([
            to_byte(view[[r, c, 0]]),
            to_byte(view[[r, c, 1]]),
            to_byte(view[[r, c, 2]]),
        ])
    }))
}

fn gray_image(view: ndarray::ArrayView2<'_, f32>) -> Result<GrayImage, AssetError> {
    let (h, w) = view.dim();
    let (width, height) = image_dims(h, w)?;
    Ok(ImageBuffer::from_fn(width, height, |x, y| {
        Luma([to_byte(view[[y as usize, x as usize]])])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3
f 1/1 3/3 4/4
";

    /// Corner positions of a triangle, rotated so the smallest corner leads.
    /// Winding is preserved, the starting corner is not.
    fn corners(part: &MeshPart, triangle: usize) -> [[f32; 3]; 3] {
        let tri = part.triangles[triangle].map(|i| part.positions[i as usize]);
        let lead = (0..3)
            .min_by(|&a, &b| tri[a].partial_cmp(&tri[b]).unwrap())
            .unwrap();
        [tri[lead], tri[(lead + 1) % 3], tri[(lead + 2) % 3]]
    }

    #[test]
    fn test_parse_textured_quad() {
        let asset = parse_obj(QUAD).unwrap();
        assert_eq!(asset.parts.len(), 1);
        let part = &asset.parts[0];
        assert_eq!(part.name.as_deref(), Some("quad"));
        assert_eq!(part.positions.len(), 4);
        assert_eq!(part.triangles.len(), 2);
        assert_eq!(
            corners(part, 0),
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]]
        );
        assert_eq!(
            corners(part, 1),
            [[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]
        );

        // UVs follow their positions.
        let uvs = part.uvs.as_ref().unwrap();
        for (p, uv) in part.positions.iter().zip(uvs) {
            assert_eq!([p[0], p[1]], *uv);
        }
    }

    #[test]
    fn test_uv_seams_split_vertices() {
        let text = "\
o seam
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vt 0.5 0.5
f 1/1 2/2 3/3
f 1/4 3/3 2/2
";
        let asset = parse_obj(text).unwrap();
        let part = &asset.parts[0];
        // Vertex 1 appears with two texture coordinates.
        assert_eq!(part.positions.len(), 4);
        let origins: Vec<usize> = (0..part.positions.len())
            .filter(|&i| part.positions[i] == [0.0, 0.0, 0.0])
            .collect();
        assert_eq!(origins.len(), 2);
        let uvs = part.uvs.as_ref().unwrap();
        assert_ne!(uvs[origins[0]], uvs[origins[1]]);

        // The two triangles share the corners at (1, 0, 0) and (0, 1, 0) but not the origin.
        let [a, b] = [part.triangles[0], part.triangles[1]];
        let shared = a.iter().filter(|i| b.contains(i)).count();
        assert_eq!(shared, 2);
        assert_eq!(
            corners(part, 1),
            [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_obj("o point\nv 0 0 0\n"), Err(AssetError::Mesh(InvalidMeshError::Empty))));
        assert!(matches!(parse_obj("o broken\nv 0 0 0\nf 1 2 zz\n"), Err(AssetError::Obj { .. })));
    }
}
