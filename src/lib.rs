#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod geom;
pub mod io;
pub mod pipeline;

use std::fmt;

use serde::Serialize;
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

use error::PipelineError;
use geom::{MeshAsset, RasterContext};
use pipeline::{CameraConfig, MultiViewMaps};

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {}

#[cfg(all(feature = "parallel", target_arch = "wasm32"))]
#[wasm_bindgen]
pub async fn initialize_parallel(worker_count: Option<u32>) -> Result<(), JsError> {
    let threads = worker_count
        .map(|count| count.max(1) as usize)
        .or_else(|| {
            std::thread::available_parallelism()
                .map(|value| value.get())
                .ok()
        })
        .unwrap_or(1);

    wasm_bindgen_rayon::init_thread_pool(threads)
        .await
        .map_err(|err| JsError::new(&format!("could not start rayon thread pool: {err}")))
}

/// Flat row-major tensor handed to JavaScript.
#[derive(Debug, Serialize)]
struct TensorExport {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl<D: ndarray::Dimension> From<&ndarray::Array<f32, D>> for TensorExport {
    fn from(array: &ndarray::Array<f32, D>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data: array.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MapsExport {
    views: usize,
    position: TensorExport,
    normal: TensorExport,
    mask: TensorExport,
    summary: String,
    warnings: Vec<String>,
}

impl From<&MultiViewMaps> for MapsExport {
    fn from(maps: &MultiViewMaps) -> Self {
        Self {
            views: maps.views(),
            position: (&maps.position_maps).into(),
            normal: (&maps.normal_maps).into(),
            mask: (&maps.masks).into(),
            summary: maps.diagnostics.summary(),
            warnings: maps.diagnostics.warnings.clone(),
        }
    }
}

/// Public entry point for browser consumers.
///
/// Holds the loaded mesh, the active camera configuration and a raster
/// context that is reused across renders.
#[wasm_bindgen]
pub struct ConditioningEngine {
    ctx: RasterContext,
    asset: Option<MeshAsset>,
    camera: CameraConfig,
}

#[wasm_bindgen]
impl ConditioningEngine {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> ConditioningEngine {
        ConditioningEngine {
            ctx: RasterContext::new(),
            asset: None,
            camera: CameraConfig::default(),
        }
    }

    #[wasm_bindgen]
    #[must_use]
    pub fn has_mesh(&self) -> bool {
        self.asset.is_some()
    }

    /// Parses OBJ text and keeps it as the mesh to render.
    #[wasm_bindgen]
    pub fn load_obj(&mut self, text: &str) -> Result<(), JsValue> {
        let asset = io::parse_obj(text).map_err(to_js_error)?;
        log::debug!(
            "loaded mesh: {} vertices, {} triangles",
            asset.vertex_count(),
            asset.triangle_count()
        );
        self.asset = Some(asset);
        Ok(())
    }

    /// Replaces the camera configuration with a JS object of the same shape as
    /// [`CameraConfig`]. The configuration is validated before it is stored.
    #[wasm_bindgen]
    pub fn set_camera_config(&mut self, config: JsValue) -> Result<(), JsValue> {
        let config: CameraConfig = serde_wasm_bindgen::from_value(config).map_err(to_js_error)?;
        self.apply_camera_config(config).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn get_camera_config(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.camera).map_err(|err| JsError::new(&err.to_string()).into())
    }

    /// Renders position maps, normal maps and masks for every configured view.
    #[wasm_bindgen]
    pub fn render(&mut self, size: u32) -> Result<JsValue, JsValue> {
        let maps = self.render_maps(size as usize).map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&MapsExport::from(&maps))
            .map_err(|err| JsError::new(&err.to_string()).into())
    }

    /// Plücker control image of the active configuration.
    #[wasm_bindgen]
    pub fn camera_embedding(&self, size: u32) -> Result<JsValue, JsValue> {
        let control = pipeline::camera_embedding(&self.camera, size as usize).map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&TensorExport::from(&control))
            .map_err(|err| JsError::new(&err.to_string()).into())
    }
}

impl Default for ConditioningEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditioningEngine {
    fn apply_camera_config(&mut self, config: CameraConfig) -> Result<(), PipelineError> {
        config.validate()?;
        log::debug!("camera configuration set: {} views", config.num_views());
        self.camera = config;
        Ok(())
    }

    fn render_maps(&mut self, size: usize) -> Result<MultiViewMaps, PipelineError> {
        let Some(asset) = self.asset.as_ref() else {
            return Err(error::MeshError::from(error::InvalidMeshError::Empty).into());
        };
        pipeline::render_multiview(&mut self.ctx, asset, size, Some(&self.camera))
    }
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    #[test]
    fn test_engine_renders_loaded_mesh() {
        let mut engine = ConditioningEngine::new();
        assert!(!engine.has_mesh());
        assert!(engine.render_maps(8).is_err());

        engine.load_obj(TRIANGLE).unwrap();
        assert!(engine.has_mesh());
        engine
            .apply_camera_config(CameraConfig::turntable(&[0.0, 90.0]))
            .unwrap();
        let maps = engine.render_maps(8).unwrap();
        assert_eq!(maps.views(), 2);

        let export = MapsExport::from(&maps);
        assert_eq!(export.position.shape, vec![2, 8, 8, 3]);
        assert_eq!(export.mask.data.len(), 2 * 8 * 8);
    }

    #[test]
    fn test_invalid_camera_config_is_not_stored() {
        let mut engine = ConditioningEngine::new();
        let bad = CameraConfig {
            camera_azims: Vec::new(),
            camera_elevs: Vec::new(),
            ..CameraConfig::default()
        };
        assert!(engine.apply_camera_config(bad).is_err());
        assert_eq!(engine.camera, CameraConfig::default());
    }
}
