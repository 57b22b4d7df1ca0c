mod axis;
mod camera;
mod core;
mod diagnostics;
mod mesh;
mod metrics;
mod plucker;
mod raster;

pub use axis::{AxisDirection, FrameRemap};
pub use camera::{
    CameraRig, OrthoBounds, build_orthographic_rig, camera_frame, pixel_center_ndc_x,
    pixel_center_ndc_y,
};
pub use core::{BBox, Point3, Tolerance, Transform, Vec3};
pub use diagnostics::NormalizeDiagnostics;
pub use mesh::{
    MergeMode, MeshAsset, MeshPart, NormalizeOptions, NormalizeTransform, StitchedMesh, Texture,
    TexturedMesh, count_edge_topology, fit_to_extent, merge_vertices, normalize,
    normalize_with_metrics,
};
pub use metrics::{PipelineMetrics, PipelineTimingReport, TimingBucket};
pub use plucker::{PLUCKER_CHANNELS, plucker_control_image, plucker_embed};
pub use raster::{
    DEFAULT_MAX_RESOLUTION, RasterContext, RasterOutput, RenderOptions, RenderOutput, rasterize,
    render,
};

#[cfg(test)]
mod tests;
