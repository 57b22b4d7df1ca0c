//! Error types shared across the conditioning pipeline.
//!
//! Each concern has its own enum; the stage-level aggregates (`MeshError`,
//! `RenderError`, `PipelineError`) wrap them with `#[from]` so `?` threads
//! them through without manual mapping.

use crate::geom::AxisDirection;

/// Invalid camera or axis configuration. Raised before any geometry work.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("up axis {up} and front axis {front} share the same axis letter")]
    NonOrthogonalAxes {
        up: AxisDirection,
        front: AxisDirection,
    },
    #[error("unknown axis direction '{0}', expected one of +x, +y, +z, -x, -y, -z")]
    UnknownAxis(String),
    #[error("camera list must contain at least one view")]
    EmptyCameraList,
    #[error("azimuth list has {azimuths} entries but elevation list has {elevations}")]
    MismatchedViewLists { azimuths: usize, elevations: usize },
    #[error("{name} list has {len} entries, expected 1 or {views}")]
    BroadcastLength {
        name: &'static str,
        len: usize,
        views: usize,
    },
    #[error("{name} entry {index} is not finite")]
    NonFiniteValue { name: &'static str, index: usize },
    #[error("could not parse '{token}' in {name} list")]
    UnparsableList { name: &'static str, token: String },
    #[error("orthographic scale must be positive and finite, got {0}")]
    InvalidOrthoScale(f32),
    #[error("rescale target must be positive and finite, got {0}")]
    InvalidRescaleTarget(f64),
    #[error("output size must be non-zero, got {height}x{width}")]
    ZeroSize { height: usize, width: usize },
}

/// Mesh content that cannot be normalized or rendered.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidMeshError {
    #[error("mesh has no vertices")]
    Empty,
    #[error("triangle {triangle} references vertex {index} but only {vertex_count} vertices exist")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("vertex {index} has non-finite coordinates")]
    NonFiniteVertex { index: usize },
    #[error("mesh part {part} has {uvs} UV coordinates for {vertices} vertices")]
    UvLengthMismatch {
        part: usize,
        uvs: usize,
        vertices: usize,
    },
    #[error("mesh extent is zero, cannot rescale")]
    DegenerateExtent,
    #[error("mesh has too many vertices for 32-bit indices ({0})")]
    TooManyVertices(usize),
}

/// Render inputs that are structurally valid but unusable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidRenderInputError {
    #[error("mesh has no triangles to rasterize")]
    NoTriangles,
    #[error("output size must be non-zero, got {height}x{width}")]
    ZeroSize { height: usize, width: usize },
    #[error("view {view} has invalid camera distance {distance}")]
    InvalidDistance { view: usize, distance: f32 },
    #[error("orthographic bounds are degenerate (left {left}, right {right}, bottom {bottom}, top {top})")]
    DegenerateBounds {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
    },
}

/// Tensor shapes that do not line up.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeMismatchError {
    #[error("control batch has {batch} images, expected {expected} (position + normal per view)")]
    ControlBatch { batch: usize, expected: usize },
    #[error("position maps {position:?} and normal maps {normal:?} differ in shape")]
    PairShape {
        position: [usize; 4],
        normal: [usize; 4],
    },
    #[error("{name} has {channels} channels, expected {expected}")]
    Channels {
        name: &'static str,
        channels: usize,
        expected: &'static str,
    },
    #[error("control maps cover {maps} views but the camera configuration has {views}")]
    ViewCount { maps: usize, views: usize },
    #[error("{name} batch is empty")]
    EmptyBatch { name: &'static str },
}

/// The rasterizer could not obtain its working memory.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResourceAcquisitionError {
    #[error("resolution {height}x{width} exceeds the context limit of {limit} pixels per side")]
    ResolutionLimit {
        height: usize,
        width: usize,
        limit: usize,
    },
    #[error("could not reserve {bytes} bytes of raster scratch memory")]
    Allocation { bytes: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    InvalidMesh(#[from] InvalidMeshError),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidRenderInputError),
    #[error(transparent)]
    Resource(#[from] ResourceAcquisitionError),
    #[error(transparent)]
    InvalidMesh(#[from] InvalidMeshError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatchError),
}

/// Failures while reading or writing assets on disk.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse OBJ at line {line}: {message}")]
    Obj { line: usize, message: String },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("cannot export tensor of shape {shape:?}: {reason}")]
    Export {
        shape: Vec<usize>,
        reason: &'static str,
    },
    #[error(transparent)]
    Mesh(#[from] InvalidMeshError),
}

impl PipelineError {
    /// True when the failure was caught before any rendering started.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::Mesh(MeshError::Configuration(_))
                | Self::Render(RenderError::Configuration(_))
        )
    }
}
