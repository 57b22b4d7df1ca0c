//! Per-pixel Plücker ray embeddings for orthographic rigs.
//!
//! Every pixel of an orthographic view casts a ray parallel to the viewing
//! direction, starting on the image plane through the eye. The ray is encoded
//! as `(direction, origin x direction)`, six floats that identify the line
//! independently of where along it the origin was taken.

use ndarray::{Array3, Array4, Axis};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::camera::{pixel_center_ndc_x, pixel_center_ndc_y};
use super::Transform;
use crate::error::ConfigurationError;

/// Channels per pixel: three for the direction, three for the moment.
pub const PLUCKER_CHANNELS: usize = 6;

/// Computes the `(N, H, W, 6)` embedding for every camera.
///
/// `ortho_scale` is the side of the square view window and holds one value per
/// camera or a single value for all of them. Pixel centres are sampled with row
/// 0 at the top, the same grid the rasterizer uses.
pub fn plucker_embed(
    camera_to_world: &[Transform],
    ortho_scale: &[f32],
    height: usize,
    width: usize,
) -> Result<Array4<f32>, ConfigurationError> {
    if camera_to_world.is_empty() {
        return Err(ConfigurationError::EmptyCameraList);
    }
    if height == 0 || width == 0 {
        return Err(ConfigurationError::ZeroSize { height, width });
    }
    let scales = super::camera::broadcast("ortho_scale", ortho_scale, camera_to_world.len())?;
    if let Some(&bad) = scales.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
        return Err(ConfigurationError::InvalidOrthoScale(bad));
    }

    let jobs: Vec<(Transform, f64)> = camera_to_world
        .iter()
        .copied()
        .zip(scales.iter().map(|&s| f64::from(s)))
        .collect();
    let views = embed_views(&jobs, height, width);

    let mut out = Array4::<f32>::zeros((jobs.len(), height, width, PLUCKER_CHANNELS));
    for (mut slot, view) in out.axis_iter_mut(Axis(0)).zip(&views) {
        slot.assign(view);
    }
    log::debug!(
        "plucker embedding: {} views at {height}x{width}",
        camera_to_world.len()
    );
    Ok(out)
}

/// Maps an embedding from `[-1, 1]` to `[0, 1]` for use as a control image.
///
/// All six channels are kept; consumers treat them as two RGB halves.
#[must_use]
pub fn plucker_control_image(embedding: &Array4<f32>) -> Array4<f32> {
    embedding.mapv(|v| ((v + 1.0) / 2.0).clamp(0.0, 1.0))
}

#[cfg(feature = "parallel")]
fn embed_views(jobs: &[(Transform, f64)], height: usize, width: usize) -> Vec<Array3<f32>> {
    jobs.par_iter()
        .map(|&(c2w, scale)| embed_view(c2w, scale, height, width))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn embed_views(jobs: &[(Transform, f64)], height: usize, width: usize) -> Vec<Array3<f32>> {
    jobs.iter()
        .map(|&(c2w, scale)| embed_view(c2w, scale, height, width))
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn embed_view(c2w: Transform, ortho_scale: f64, height: usize, width: usize) -> Array3<f32> {
    let right = c2w.axis(0);
    let up = c2w.axis(1);
    let direction = c2w.axis(2).neg();
    let eye = c2w.origin().to_vec3();
    let half = 0.5 * ortho_scale;

    let mut view = Array3::<f32>::zeros((height, width, PLUCKER_CHANNELS));
    for row in 0..height {
        let y = pixel_center_ndc_y(row, height) * half;
        for col in 0..width {
            let x = pixel_center_ndc_x(col, width) * half;
            let origin = eye + right * x + up * y;
            let moment = origin.cross(direction);
            let values = [
                direction.x,
                direction.y,
                direction.z,
                moment.x,
                moment.y,
                moment.z,
            ];
            for (ch, value) in values.into_iter().enumerate() {
                view[[row, col, ch]] = value as f32;
            }
        }
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::camera::camera_frame;

    #[test]
    fn test_center_ray_passes_through_origin() {
        // Odd sizes put a pixel centre exactly on the view axis.
        let c2w = camera_frame(30.0, 20.0, 1.8);
        let embed = plucker_embed(&[c2w], &[1.1], 5, 5).unwrap();
        for ch in 3..6 {
            assert!(embed[[0, 2, 2, ch]].abs() < 1e-6);
        }
    }

    #[test]
    fn test_rejects_bad_scale_and_size() {
        let c2w = camera_frame(0.0, 0.0, 1.0);
        assert!(matches!(
            plucker_embed(&[c2w], &[0.0], 4, 4),
            Err(ConfigurationError::InvalidOrthoScale(_))
        ));
        assert!(matches!(
            plucker_embed(&[c2w], &[1.0], 0, 4),
            Err(ConfigurationError::ZeroSize { .. })
        ));
        assert!(matches!(
            plucker_embed(&[c2w, c2w], &[1.0, 1.0, 1.0], 2, 2),
            Err(ConfigurationError::BroadcastLength { .. })
        ));
        assert!(matches!(
            plucker_embed(&[], &[1.0], 2, 2),
            Err(ConfigurationError::EmptyCameraList)
        ));
    }

    #[test]
    fn test_control_image_range() {
        let c2w = camera_frame(0.0, 0.0, 1.8);
        let embed = plucker_embed(&[c2w], &[1.1], 3, 3).unwrap();
        let control = plucker_control_image(&embed);
        assert_eq!(control.shape(), &[1, 3, 3, 6]);
        assert!(control.iter().all(|v| (0.0..=1.0).contains(v)));
        // direction -X maps to 0 on the first channel
        assert!(control[[0, 1, 1, 0]].abs() < 1e-6);
    }
}
