//! Signed coordinate axes and the frame remap applied to imported meshes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::core::Vec3;
use crate::error::ConfigurationError;

/// One of the six signed coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisDirection {
    #[serde(rename = "+x")]
    PosX,
    #[serde(rename = "+y")]
    PosY,
    #[serde(rename = "+z")]
    PosZ,
    #[serde(rename = "-x")]
    NegX,
    #[serde(rename = "-y")]
    NegY,
    #[serde(rename = "-z")]
    NegZ,
}

const AXIS_VECTORS: [Vec3; 6] = [
    Vec3::X,
    Vec3::Y,
    Vec3::Z,
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::new(0.0, -1.0, 0.0),
    Vec3::new(0.0, 0.0, -1.0),
];

impl AxisDirection {
    pub const ALL: [Self; 6] = [
        Self::PosX,
        Self::PosY,
        Self::PosZ,
        Self::NegX,
        Self::NegY,
        Self::NegZ,
    ];

    const fn table_index(self) -> usize {
        match self {
            Self::PosX => 0,
            Self::PosY => 1,
            Self::PosZ => 2,
            Self::NegX => 3,
            Self::NegY => 4,
            Self::NegZ => 5,
        }
    }

    #[must_use]
    pub const fn unit(self) -> Vec3 {
        AXIS_VECTORS[self.table_index()]
    }

    /// 0 for x, 1 for y, 2 for z regardless of sign.
    #[must_use]
    pub const fn letter_index(self) -> usize {
        self.table_index() % 3
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PosX => "+x",
            Self::PosY => "+y",
            Self::PosZ => "+z",
            Self::NegX => "-x",
            Self::NegY => "-y",
            Self::NegZ => "-z",
        }
    }
}

impl fmt::Display for AxisDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AxisDirection {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|axis| axis.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ConfigurationError::UnknownAxis(trimmed.to_string()))
    }
}

/// Maps mesh coordinates into the canonical frame: front becomes +X, up becomes
/// +Z, and `front_x_to_y` optionally rotates front onto -Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRemap {
    rows: [Vec3; 3],
    front_x_to_y: bool,
}

impl FrameRemap {
    /// Fails when `up` and `front` lie on the same axis.
    pub fn new(
        up: AxisDirection,
        front: AxisDirection,
        front_x_to_y: bool,
    ) -> Result<Self, ConfigurationError> {
        if up.letter_index() == front.letter_index() {
            return Err(ConfigurationError::NonOrthogonalAxes { up, front });
        }
        let z = up.unit();
        let x = front.unit();
        let y = z.cross(x);
        // Basis (x, y, z) as columns is orthonormal, so its inverse is its transpose.
        Ok(Self {
            rows: [x, y, z],
            front_x_to_y,
        })
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        !self.front_x_to_y && self.rows == [Vec3::X, Vec3::Y, Vec3::Z]
    }

    #[must_use]
    pub fn apply(&self, v: Vec3) -> Vec3 {
        let mapped = Vec3::new(self.rows[0].dot(v), self.rows[1].dot(v), self.rows[2].dot(v));
        if self.front_x_to_y {
            Vec3::new(mapped.y, -mapped.x, mapped.z)
        } else {
            mapped
        }
    }
}

impl Default for FrameRemap {
    fn default() -> Self {
        Self {
            rows: [Vec3::X, Vec3::Y, Vec3::Z],
            front_x_to_y: false,
        }
    }
}
