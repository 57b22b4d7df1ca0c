use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{approx_eq, unit_cube_asset, unit_cube_part};
use crate::error::{ConfigurationError, InvalidMeshError, MeshError};
use crate::geom::{
    AxisDirection, MeshAsset, MeshPart, NormalizeOptions, Vec3, normalize,
};

fn random_part(rng: &mut StdRng, vertices: usize) -> MeshPart {
    let positions = (0..vertices)
        .map(|_| {
            [
                rng.random_range(-3.0..3.0),
                rng.random_range(-1.0..5.0),
                rng.random_range(-2.0..0.5),
            ]
        })
        .collect();
    #[allow(clippy::cast_possible_truncation)]
    let n = vertices as u32;
    let triangles = (0..vertices / 3)
        .map(|_| {
            [
                rng.random_range(0..n),
                rng.random_range(0..n),
                rng.random_range(0..n),
            ]
        })
        .collect();
    MeshPart::new(positions, triangles)
}

fn max_abs_coordinate(positions: &[[f32; 3]]) -> f64 {
    positions
        .iter()
        .map(|p| Vec3::from_f32(*p).max_abs())
        .fold(0.0, f64::max)
}

#[test]
fn rescale_hits_target_for_every_orthogonal_axis_pair() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let asset = MeshAsset::from_part(random_part(&mut rng, 60));

    for up in AxisDirection::ALL {
        for front in AxisDirection::ALL {
            if up.letter_index() == front.letter_index() {
                continue;
            }
            for scale in [0.5, 0.8, 2.0] {
                let options = NormalizeOptions {
                    rescale: true,
                    move_to_center: true,
                    scale,
                    up_axis: up,
                    front_axis: front,
                    ..NormalizeOptions::default()
                };
                let (mesh, diag) = normalize(&asset, &options).unwrap();
                let max_abs = max_abs_coordinate(&mesh.vertex_positions);
                assert!(
                    approx_eq(max_abs, scale, 1e-5),
                    "up {up} front {front}: max abs {max_abs} != {scale}"
                );
                assert!(diag.transform.scale_factor > 0.0);
            }
        }
    }
}

#[test]
fn normalize_is_bit_identical_across_calls() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut part = random_part(&mut rng, 90);
    part.uvs = Some((0..90).map(|_| [rng.random::<f32>(), rng.random::<f32>()]).collect());
    let asset = MeshAsset::from_part(part);
    let options = NormalizeOptions {
        rescale: true,
        move_to_center: true,
        front_x_to_y: true,
        ..NormalizeOptions::default()
    };

    let (first, first_diag) = normalize(&asset, &options).unwrap();
    let (second, second_diag) = normalize(&asset, &options).unwrap();
    assert_eq!(first, second);
    assert_eq!(first_diag.transform, second_diag.transform);
    for (a, b) in first.vertex_positions.iter().zip(&second.vertex_positions) {
        for k in 0..3 {
            assert_eq!(a[k].to_bits(), b[k].to_bits());
        }
    }
}

#[test]
fn move_to_center_records_centroid() {
    let mut part = unit_cube_part();
    for p in &mut part.positions {
        p[0] += 2.0;
        p[2] -= 1.0;
    }
    let options = NormalizeOptions {
        move_to_center: true,
        up_axis: AxisDirection::PosZ,
        front_axis: AxisDirection::PosX,
        ..NormalizeOptions::default()
    };
    let (mesh, diag) = normalize(&MeshAsset::from_part(part), &options).unwrap();

    assert!(approx_eq(diag.transform.centroid[0], 2.0, 1e-9));
    assert!(approx_eq(diag.transform.centroid[2], -1.0, 1e-9));
    assert!(approx_eq(diag.transform.scale_factor, 1.0, 0.0));
    let bbox = mesh.bbox().unwrap();
    assert!(approx_eq(bbox.center().x, 0.0, 1e-6));
    assert!(approx_eq(bbox.center().z, 0.0, 1e-6));
}

#[test]
fn scene_parts_are_concatenated_with_offsets() {
    let mut second = unit_cube_part();
    for p in &mut second.positions {
        p[1] += 3.0;
    }
    let asset = MeshAsset {
        parts: vec![unit_cube_part(), second],
        base_color: None,
    };
    let (mesh, diag) = normalize(&asset, &NormalizeOptions::default()).unwrap();

    assert_eq!(mesh.vertex_count(), 16);
    assert_eq!(mesh.triangle_count(), 24);
    assert_eq!(diag.part_count, 2);
    assert_eq!(mesh.triangle_indices[12], [8, 10, 9]);
    assert!(mesh.triangle_indices.iter().flatten().all(|&i| i < 16));
    // Two closed cubes: no boundary edges once stitched.
    assert!(diag.is_watertight());
    assert!(diag.is_manifold());
}

#[test]
fn merge_leaves_primary_buffers_untouched() {
    let asset = unit_cube_asset();
    let merged = normalize(&asset, &NormalizeOptions::default()).unwrap().0;
    let plain = normalize(
        &asset,
        &NormalizeOptions {
            merge_vertices: false,
            ..NormalizeOptions::default()
        },
    )
    .unwrap()
    .0;

    assert_eq!(merged.vertex_positions, plain.vertex_positions);
    assert_eq!(merged.triangle_indices, plain.triangle_indices);
    assert!(plain.stitched.is_none());
    let stitched = merged.stitched.unwrap();
    assert!(stitched.positions.len() <= merged.vertex_positions.len());
    assert_eq!(stitched.positions.len(), 8);
}

#[test]
fn default_frame_maps_source_up_to_z() {
    let part = MeshPart::new(
        vec![[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
        vec![[0, 1, 2]],
    );
    let (mesh, _) = normalize(&MeshAsset::from_part(part), &NormalizeOptions::default()).unwrap();
    assert_eq!(mesh.vertex_positions[0], [0.0, 0.0, 1.0]);
    assert_eq!(mesh.vertex_positions[1], [1.0, 0.0, 0.0]);
    assert_eq!(mesh.vertex_positions[2], [0.0, -1.0, 0.0]);
    assert!(mesh.uv_coordinates.is_none());
    assert!(mesh.base_color_texture.is_none());
}

#[test]
fn invalid_inputs_are_rejected() {
    let options = NormalizeOptions::default();

    let empty = MeshAsset::default();
    assert!(matches!(
        normalize(&empty, &options),
        Err(MeshError::InvalidMesh(InvalidMeshError::Empty))
    ));

    let mut part = unit_cube_part();
    part.triangles.push([0, 1, 8]);
    assert!(matches!(
        normalize(&MeshAsset::from_part(part), &options),
        Err(MeshError::InvalidMesh(InvalidMeshError::IndexOutOfRange { index: 8, .. }))
    ));

    let mut part = unit_cube_part();
    part.positions[3][1] = f32::NAN;
    assert!(matches!(
        normalize(&MeshAsset::from_part(part), &options),
        Err(MeshError::InvalidMesh(InvalidMeshError::NonFiniteVertex { index: 3 }))
    ));

    let part = unit_cube_part().with_uvs(vec![[0.0, 0.0]; 3]);
    assert!(matches!(
        normalize(&MeshAsset::from_part(part), &options),
        Err(MeshError::InvalidMesh(InvalidMeshError::UvLengthMismatch { uvs: 3, vertices: 8, .. }))
    ));

    let flat = MeshAsset::from_part(MeshPart::new(vec![[0.0; 3]; 3], vec![[0, 1, 2]]));
    let rescale = NormalizeOptions {
        rescale: true,
        ..NormalizeOptions::default()
    };
    assert!(matches!(
        normalize(&flat, &rescale),
        Err(MeshError::InvalidMesh(InvalidMeshError::DegenerateExtent))
    ));
}

#[test]
fn same_letter_axes_fail_as_configuration_error() {
    let options = NormalizeOptions {
        up_axis: AxisDirection::PosX,
        front_axis: AxisDirection::NegX,
        ..NormalizeOptions::default()
    };
    match normalize(&unit_cube_asset(), &options) {
        Err(MeshError::Configuration(ConfigurationError::NonOrthogonalAxes { up, front })) => {
            assert_eq!(up, AxisDirection::PosX);
            assert_eq!(front, AxisDirection::NegX);
        }
        other => panic!("expected NonOrthogonalAxes, got {other:?}"),
    }
}

#[test]
fn options_deserialize_with_defaults() {
    let options: NormalizeOptions =
        serde_json::from_str(r#"{ "rescale": true, "up_axis": "+z", "front_axis": "-y" }"#).unwrap();
    assert!(options.rescale);
    assert_eq!(options.up_axis, AxisDirection::PosZ);
    assert_eq!(options.front_axis, AxisDirection::NegY);
    assert!(approx_eq(options.scale, 0.5, 0.0));
    assert!(options.flip_uv);
    assert_eq!(options.default_uv_size, 2048);
}

#[test]
fn merge_handles_coordinates_beyond_the_hash_grid() {
    let part = MeshPart::new(
        vec![
            [1.0e13, 0.0, 0.0],
            [-2.0e13, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0e13, 0.0, 0.0],
        ],
        vec![[0, 1, 2], [3, 2, 1]],
    );
    let (mesh, diag) = normalize(&MeshAsset::from_part(part), &NormalizeOptions::default()).unwrap();

    let stitched = mesh.stitched.unwrap();
    assert_eq!(stitched.positions.len(), 3);
    assert_eq!(stitched.vertex_remap[3], stitched.vertex_remap[0]);
    assert_eq!(diag.vertex_count, 4);
}

#[test]
fn rescale_target_must_be_positive_and_finite() {
    for scale in [f64::NAN, f64::INFINITY, 0.0, -0.5] {
        let options = NormalizeOptions {
            rescale: true,
            scale,
            ..NormalizeOptions::default()
        };
        assert!(
            matches!(
                normalize(&unit_cube_asset(), &options),
                Err(MeshError::Configuration(ConfigurationError::InvalidRescaleTarget(_)))
            ),
            "scale {scale} accepted"
        );
    }

    // Without rescale the target is unused.
    let options = NormalizeOptions {
        scale: f64::NAN,
        ..NormalizeOptions::default()
    };
    assert!(normalize(&unit_cube_asset(), &options).is_ok());
}
