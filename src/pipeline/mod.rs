//! End-to-end stages: render a mesh from a camera configuration, embed the
//! cameras as rays, and hand both to the compositor.

mod compositor;
mod config;

pub use compositor::{
    ConditioningInputs, ConditioningPayload, ControlConditioning, ControlImages, ControlSource,
    ReferenceConditioning, compose, prepare_reference_image, stack_views,
};
pub use config::{AZIMUTH_OFFSET_DEG, CameraConfig};

use ndarray::{Array3, Array4};

use crate::error::PipelineError;
use crate::geom::{
    MeshAsset, NormalizeDiagnostics, NormalizeOptions, PipelineMetrics, RasterContext,
    RenderOutput, TimingBucket, normalize_with_metrics, plucker_control_image, plucker_embed,
    render,
};

/// Position and normal maps of every configured view, remapped to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiViewMaps {
    /// `(N, H, W, 3)`.
    pub position_maps: Array4<f32>,
    /// `(N, H, W, 3)`.
    pub normal_maps: Array4<f32>,
    /// `(N, H, W)`, 1.0 where the mesh covers the pixel.
    pub masks: Array3<f32>,
    pub diagnostics: NormalizeDiagnostics,
}

impl MultiViewMaps {
    #[must_use]
    pub fn views(&self) -> usize {
        self.masks.shape()[0]
    }

    /// The maps as an explicit control pair for [`compose`].
    #[must_use]
    pub fn into_control(self) -> ControlSource {
        ControlSource::Explicit(ControlImages::Pair {
            position: self.position_maps,
            normal: self.normal_maps,
        })
    }
}

/// Normalizes `asset` into the unit frame and renders it from every view of
/// `camera` (the default six-view configuration when `None`) at `size x size`.
///
/// The configuration is validated before any geometry work.
pub fn render_multiview(
    ctx: &mut RasterContext,
    asset: &MeshAsset,
    size: usize,
    camera: Option<&CameraConfig>,
) -> Result<MultiViewMaps, PipelineError> {
    let fallback;
    let camera = match camera {
        Some(camera) => camera,
        None => {
            fallback = CameraConfig::default();
            &fallback
        }
    };
    camera.validate()?;

    let options = NormalizeOptions {
        rescale: true,
        ..NormalizeOptions::default()
    };
    let mut metrics = PipelineMetrics::default();
    let (mesh, mut diagnostics) = normalize_with_metrics(asset, &options, &mut metrics)?;
    let rig = metrics.time(TimingBucket::CameraRig, || camera.to_rig())?;
    let output: RenderOutput = metrics.time(TimingBucket::Rasterization, || {
        render(ctx, &mesh, &rig, size, size)
    })?;
    if let Some(report) = metrics.end() {
        log::debug!("render_multiview took {:.3} ms", report.total_ms());
        diagnostics.timing = Some(report);
    }

    let masks = output.masks_squeezed();
    log::info!(
        "rendered {} views at {size}x{size} ({})",
        rig.len(),
        diagnostics.summary()
    );
    Ok(MultiViewMaps {
        position_maps: output.position_map,
        normal_maps: output.normal_map,
        masks,
        diagnostics,
    })
}

/// Plücker control image `(N, size, size, 6)` for `camera`, values in `[0, 1]`.
pub fn camera_embedding(camera: &CameraConfig, size: usize) -> Result<Array4<f32>, PipelineError> {
    let rig = camera.to_rig()?;
    let mut metrics = PipelineMetrics::default();
    metrics.begin();
    let control = metrics.time(TimingBucket::RayEmbedding, || {
        plucker_embed(&rig.camera_to_world, &[camera.ortho_scale], size, size)
            .map(|embedding| plucker_control_image(&embedding))
    })?;
    if let Some(report) = metrics.end() {
        log::debug!("camera embedding took {} ns", report.ray_embedding_ns);
    }
    Ok(control)
}
