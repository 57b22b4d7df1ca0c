//! Camera configuration records shared by the render and embedding stages.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::geom::{CameraRig, OrthoBounds, build_orthographic_rig};

/// Offset added to every configured azimuth so that azimuth 0 faces the
/// mesh's front after normalization.
pub const AZIMUTH_OFFSET_DEG: f32 = -90.0;

const DEFAULT_AZIMUTHS: [f32; 6] = [0.0, 90.0, 180.0, 270.0, 180.0, 180.0];
const DEFAULT_ELEVATIONS: [f32; 6] = [0.0, 0.0, 0.0, 0.0, 89.99, -89.99];

fn default_camera_dist() -> f32 {
    1.8
}

fn default_ortho_scale() -> f32 {
    1.1
}

/// Views to render or embed, as exchanged with callers.
///
/// Bounds left unset derive from `ortho_scale` as `±0.5 * ortho_scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub camera_azims: Vec<f32>,
    pub camera_elevs: Vec<f32>,
    #[serde(default = "default_camera_dist")]
    pub camera_dist: f32,
    #[serde(default = "default_ortho_scale")]
    pub ortho_scale: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f32>,
}

impl Default for CameraConfig {
    /// Four side views, one from above and one from below.
    fn default() -> Self {
        Self {
            camera_azims: DEFAULT_AZIMUTHS.to_vec(),
            camera_elevs: DEFAULT_ELEVATIONS.to_vec(),
            camera_dist: default_camera_dist(),
            ortho_scale: default_ortho_scale(),
            left: None,
            right: None,
            bottom: None,
            top: None,
        }
    }
}

impl CameraConfig {
    /// Builds a config from comma-separated angle lists such as `"0, 90, 180"`.
    ///
    /// Whitespace is ignored. Bounds are set explicitly from `ortho_scale`.
    pub fn from_lists(
        azimuths: &str,
        elevations: &str,
        camera_dist: f32,
        ortho_scale: f32,
    ) -> Result<Self, ConfigurationError> {
        let camera_azims = parse_list("azimuth", azimuths)?;
        let camera_elevs = parse_list("elevation", elevations)?;
        if camera_azims.len() != camera_elevs.len() {
            return Err(ConfigurationError::MismatchedViewLists {
                azimuths: camera_azims.len(),
                elevations: camera_elevs.len(),
            });
        }
        let half = 0.5 * ortho_scale;
        let config = Self {
            camera_azims,
            camera_elevs,
            camera_dist,
            ortho_scale,
            left: Some(-half),
            right: Some(half),
            bottom: Some(-half),
            top: Some(half),
        };
        config.validate()?;
        Ok(config)
    }

    /// Horizontal ring of views at zero elevation with the default distance and scale.
    #[must_use]
    pub fn turntable(azimuths: &[f32]) -> Self {
        Self {
            camera_azims: azimuths.to_vec(),
            camera_elevs: vec![0.0; azimuths.len()],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn num_views(&self) -> usize {
        self.camera_azims.len()
    }

    /// Checks everything that can be checked without geometry.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.camera_azims.len() != self.camera_elevs.len() {
            return Err(ConfigurationError::MismatchedViewLists {
                azimuths: self.camera_azims.len(),
                elevations: self.camera_elevs.len(),
            });
        }
        if self.camera_azims.is_empty() {
            return Err(ConfigurationError::EmptyCameraList);
        }
        for (name, values) in [("azimuth", &self.camera_azims), ("elevation", &self.camera_elevs)] {
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(ConfigurationError::NonFiniteValue { name, index });
            }
        }
        if !self.camera_dist.is_finite() {
            return Err(ConfigurationError::NonFiniteValue {
                name: "distance",
                index: 0,
            });
        }
        if !(self.ortho_scale.is_finite() && self.ortho_scale > 0.0) {
            return Err(ConfigurationError::InvalidOrthoScale(self.ortho_scale));
        }
        Ok(())
    }

    /// Resolved orthographic bounds.
    #[must_use]
    pub fn bounds(&self) -> OrthoBounds {
        let derived = OrthoBounds::symmetric(self.ortho_scale);
        OrthoBounds::new(
            self.left.unwrap_or(derived.left),
            self.right.unwrap_or(derived.right),
            self.bottom.unwrap_or(derived.bottom),
            self.top.unwrap_or(derived.top),
        )
    }

    /// Builds the rig with [`AZIMUTH_OFFSET_DEG`] applied and the distance broadcast.
    pub fn to_rig(&self) -> Result<CameraRig, ConfigurationError> {
        self.validate()?;
        let azimuths: Vec<f32> = self
            .camera_azims
            .iter()
            .map(|a| a + AZIMUTH_OFFSET_DEG)
            .collect();
        build_orthographic_rig(&azimuths, &self.camera_elevs, &[self.camera_dist], self.bounds())
    }
}

fn parse_list(name: &'static str, text: &str) -> Result<Vec<f32>, ConfigurationError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .split(',')
        .map(|token| {
            token
                .parse::<f32>()
                .map_err(|_| ConfigurationError::UnparsableList {
                    name,
                    token: token.to_string(),
                })
        })
        .collect()
}
