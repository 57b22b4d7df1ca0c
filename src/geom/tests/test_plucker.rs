use super::approx_eq;
use crate::geom::{
    OrthoBounds, PLUCKER_CHANNELS, Vec3, build_orthographic_rig, pixel_center_ndc_x,
    pixel_center_ndc_y, plucker_control_image, plucker_embed,
};

const DEFAULT_AZIMUTHS: [f32; 6] = [-90.0, 0.0, 90.0, 180.0, 90.0, 90.0];
const DEFAULT_ELEVATIONS: [f32; 6] = [0.0, 0.0, 0.0, 0.0, 89.99, -89.99];

fn channel_vec(embed: &ndarray::Array4<f32>, v: usize, r: usize, c: usize, offset: usize) -> Vec3 {
    Vec3::new(
        f64::from(embed[[v, r, c, offset]]),
        f64::from(embed[[v, r, c, offset + 1]]),
        f64::from(embed[[v, r, c, offset + 2]]),
    )
}

#[test]
fn default_rig_embedding_shape_and_range() {
    let rig = build_orthographic_rig(
        &DEFAULT_AZIMUTHS,
        &DEFAULT_ELEVATIONS,
        &[1.8],
        OrthoBounds::symmetric(1.1),
    )
    .unwrap();
    let embed = plucker_embed(&rig.camera_to_world, &[1.1], 16, 12).unwrap();

    assert_eq!(embed.shape(), &[6, 16, 12, PLUCKER_CHANNELS]);
    assert!(embed.iter().all(|v| v.is_finite() && (-1.0..=1.0).contains(v)));

    let control = plucker_control_image(&embed);
    assert_eq!(control.shape(), embed.shape());
    for (e, c) in embed.iter().zip(control.iter()) {
        assert!(approx_eq(f64::from(*c), f64::from((e + 1.0) / 2.0), 1e-6));
    }
}

#[test]
fn direction_is_constant_and_moment_orthogonal() {
    let rig = build_orthographic_rig(&[25.0, 140.0], &[10.0, -35.0], &[1.8, 2.5], OrthoBounds::default())
        .unwrap();
    let embed = plucker_embed(&rig.camera_to_world, &[1.1, 0.7], 9, 7).unwrap();

    for v in 0..2 {
        let forward = rig.forward(v);
        for r in 0..9 {
            for c in 0..7 {
                let dir = channel_vec(&embed, v, r, c, 0);
                let moment = channel_vec(&embed, v, r, c, 3);
                assert!(dir.sub(forward).length() < 1e-6);
                assert!(approx_eq(dir.dot(moment), 0.0, 1e-5));
            }
        }
    }
}

#[test]
fn ray_origins_follow_the_pixel_grid() {
    // Moment = origin x dir, so dir x moment recovers the component of the
    // origin orthogonal to dir, which is x * right + y * up for our rays.
    let rig = build_orthographic_rig(&[60.0], &[20.0], &[1.8], OrthoBounds::default()).unwrap();
    let (height, width) = (6, 10);
    let scale = 1.1;
    let embed = plucker_embed(&rig.camera_to_world, &[scale], height, width).unwrap();

    let c2w = rig.camera_to_world[0];
    let (right, up) = (c2w.axis(0), c2w.axis(1));
    let bounds = OrthoBounds::symmetric(scale);
    for r in 0..height {
        for c in 0..width {
            let dir = channel_vec(&embed, 0, r, c, 0);
            let moment = channel_vec(&embed, 0, r, c, 3);
            let offset = dir.cross(moment);
            let (x, y) = bounds.ndc_to_camera(pixel_center_ndc_x(c, width), pixel_center_ndc_y(r, height));
            assert!(approx_eq(offset.dot(right), x, 1e-5), "row {r} col {c}");
            assert!(approx_eq(offset.dot(up), y, 1e-5), "row {r} col {c}");
        }
    }
    // Row 0 is the top of the image: its rays sit above the view axis.
    let top = channel_vec(&embed, 0, 0, 0, 0).cross(channel_vec(&embed, 0, 0, 0, 3));
    assert!(top.dot(up) > 0.0);
    assert!(top.dot(right) < 0.0);
}
