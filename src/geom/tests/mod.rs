mod test_mesh_normalize;
mod test_plucker;

use crate::geom::{MeshAsset, MeshPart, TexturedMesh};

/// Axis-aligned cube of side 1 centred on the origin, outward winding.
pub(super) fn unit_cube_part() -> MeshPart {
    let positions = vec![
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ];
    let triangles = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [3, 6, 2],
        [3, 7, 6],
        [0, 4, 7],
        [0, 7, 3],
        [1, 2, 6],
        [1, 6, 5],
    ];
    MeshPart::new(positions, triangles)
}

pub(super) fn unit_cube_asset() -> MeshAsset {
    MeshAsset::from_part(unit_cube_part())
}

/// The cube as a renderer-ready mesh, already in the canonical frame.
pub(super) fn unit_cube_mesh() -> TexturedMesh {
    let part = unit_cube_part();
    TexturedMesh {
        vertex_positions: part.positions,
        triangle_indices: part.triangles,
        uv_coordinates: None,
        uv_triangle_indices: None,
        base_color_texture: None,
        stitched: None,
    }
}

pub(super) fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}
