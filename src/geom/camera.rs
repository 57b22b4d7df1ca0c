//! Orthographic camera rigs built from azimuth/elevation/distance.
//!
//! World up is +Z. A camera at azimuth `a`, elevation `e` and distance `d`
//! sits at `d * (cos e cos a, cos e sin a, sin e)` and looks at the origin.
//! Its camera-to-world matrix has columns `[right | up | back | eye]`, so the
//! camera looks down its local -Z axis.

use serde::{Deserialize, Serialize};

use super::{Point3, Tolerance, Transform, Vec3};
use crate::error::ConfigurationError;

/// Orthographic frustum extent in camera space, shared by every view of a rig.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrthoBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl OrthoBounds {
    #[must_use]
    pub const fn new(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
        }
    }

    /// Square bounds of side `ortho_scale` centred on the view axis.
    #[must_use]
    pub fn symmetric(ortho_scale: f32) -> Self {
        let half = 0.5 * ortho_scale;
        Self::new(-half, half, -half, half)
    }

    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.right > self.left && self.top > self.bottom)
            || ![self.left, self.right, self.bottom, self.top]
                .iter()
                .all(|v| v.is_finite())
    }

    /// Camera-space `(x, y)` to normalized device coordinates in `[-1, 1]`.
    #[must_use]
    pub fn camera_to_ndc(&self, x: f64, y: f64) -> (f64, f64) {
        let (l, r) = (f64::from(self.left), f64::from(self.right));
        let (b, t) = (f64::from(self.bottom), f64::from(self.top));
        ((2.0 * x - (r + l)) / (r - l), (2.0 * y - (t + b)) / (t - b))
    }

    /// Inverse of [`camera_to_ndc`](Self::camera_to_ndc).
    #[must_use]
    pub fn ndc_to_camera(&self, x_ndc: f64, y_ndc: f64) -> (f64, f64) {
        let (l, r) = (f64::from(self.left), f64::from(self.right));
        let (b, t) = (f64::from(self.bottom), f64::from(self.top));
        (
            0.5 * (x_ndc * (r - l) + (r + l)),
            0.5 * (y_ndc * (t - b) + (t + b)),
        )
    }
}

impl Default for OrthoBounds {
    fn default() -> Self {
        Self::symmetric(1.1)
    }
}

/// NDC x of the centre of column `col` in an image `width` pixels wide.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pixel_center_ndc_x(col: usize, width: usize) -> f64 {
    (2.0 * col as f64 + 1.0) / width as f64 - 1.0
}

/// NDC y of the centre of row `row`; row 0 is the top of the image.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pixel_center_ndc_y(row: usize, height: usize) -> f64 {
    1.0 - (2.0 * row as f64 + 1.0) / height as f64
}

/// A batch of orthographic views sharing one set of bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRig {
    pub azimuth_deg: Vec<f32>,
    pub elevation_deg: Vec<f32>,
    /// One entry per view after broadcasting.
    pub distance: Vec<f32>,
    pub bounds: OrthoBounds,
    pub camera_to_world: Vec<Transform>,
}

impl CameraRig {
    #[must_use]
    pub fn len(&self) -> usize {
        self.camera_to_world.len()
    }

    /// Always false for a rig from [`build_orthographic_rig`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.camera_to_world.is_empty()
    }

    /// Viewing direction of view `i` in world space.
    #[must_use]
    pub fn forward(&self, i: usize) -> Vec3 {
        self.camera_to_world[i].axis(2).neg()
    }

    #[must_use]
    pub fn eye(&self, i: usize) -> Point3 {
        self.camera_to_world[i].origin()
    }

    /// Row-major camera-to-world matrices in single precision.
    #[must_use]
    pub fn matrices_f32(&self) -> Vec<[[f32; 4]; 4]> {
        self.camera_to_world.iter().map(Transform::to_f32_rows).collect()
    }
}

/// Builds one camera-to-world matrix per view.
///
/// `distance` may hold a single value, which is broadcast to every view.
/// Azimuths are used as given; any convention offset belongs to the caller.
pub fn build_orthographic_rig(
    azimuth_deg: &[f32],
    elevation_deg: &[f32],
    distance: &[f32],
    bounds: OrthoBounds,
) -> Result<CameraRig, ConfigurationError> {
    let views = azimuth_deg.len();
    if views != elevation_deg.len() {
        return Err(ConfigurationError::MismatchedViewLists {
            azimuths: views,
            elevations: elevation_deg.len(),
        });
    }
    if views == 0 {
        return Err(ConfigurationError::EmptyCameraList);
    }
    let distance = broadcast("distance", distance, views)?;
    ensure_finite("azimuth", azimuth_deg)?;
    ensure_finite("elevation", elevation_deg)?;

    let camera_to_world = azimuth_deg
        .iter()
        .zip(elevation_deg)
        .zip(&distance)
        .map(|((&a, &e), &d)| camera_frame(f64::from(a), f64::from(e), f64::from(d)))
        .collect();

    log::debug!("built orthographic rig with {views} views, bounds {bounds:?}");

    Ok(CameraRig {
        azimuth_deg: azimuth_deg.to_vec(),
        elevation_deg: elevation_deg.to_vec(),
        distance,
        bounds,
        camera_to_world,
    })
}

/// Camera-to-world matrix for a single view looking at the origin.
#[must_use]
pub fn camera_frame(azimuth_deg: f64, elevation_deg: f64, distance: f64) -> Transform {
    let (sin_a, cos_a) = azimuth_deg.to_radians().sin_cos();
    let (sin_e, cos_e) = elevation_deg.to_radians().sin_cos();

    let outward = Vec3::new(cos_e * cos_a, cos_e * sin_a, sin_e);
    let eye = Point3::from(outward * distance);
    let forward = outward.neg();

    let side = forward.cross(Vec3::Z);
    let right = if Tolerance::ZERO_LENGTH.is_zero_vec3(side) {
        // Looking straight along world up: use the limit of `up` as elevation
        // approaches +-90 degrees at this azimuth.
        let up_hint = Vec3::new(cos_a, sin_a, 0.0) * forward.z;
        forward.cross(up_hint).normalized().unwrap_or(Vec3::X)
    } else {
        side.normalized().unwrap_or(Vec3::X)
    };
    let up = right.cross(forward);

    Transform::from_axes(eye, right, up, forward.neg())
}

/// Repeats a single value `views` times, or passes through a list of exactly `views` values.
pub(crate) fn broadcast(
    name: &'static str,
    values: &[f32],
    views: usize,
) -> Result<Vec<f32>, ConfigurationError> {
    match values.len() {
        1 => Ok(vec![values[0]; views]),
        len if len == views => Ok(values.to_vec()),
        len => Err(ConfigurationError::BroadcastLength { name, len, views }),
    }
}

fn ensure_finite(name: &'static str, values: &[f32]) -> Result<(), ConfigurationError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ConfigurationError::NonFiniteValue { name, index }),
        None => Ok(()),
    }
}
