//! Assembles control and reference conditioning for a multi-view sampler.
//!
//! Geometric control maps travel as one channel-first tensor `(N, 6, H, W)`:
//! three position (or ray direction) channels followed by three normal (or
//! ray moment) channels. A reference image rides alongside untouched.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb, Rgb32FImage, Rgba, RgbaImage};
use ndarray::{Array3, Array4, ArrayView4, Axis, concatenate, s};

use super::camera_embedding;
use super::config::CameraConfig;
use crate::error::{ConfigurationError, PipelineError, ShapeMismatchError};
use crate::geom::{PipelineMetrics, RenderOutput, TimingBucket};

/// Fraction of the target size the subject's longer side is resized to.
const REFERENCE_FILL: f64 = 0.9;
const REFERENCE_BACKGROUND: f32 = 0.5;

// ─────────────────────────────────────────────────────────────────────────────
// Inputs and payload
// ─────────────────────────────────────────────────────────────────────────────

/// Caller-supplied geometric maps, all values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlImages {
    /// Position and normal maps, each `(N, H, W, 3)`.
    Pair {
        position: Array4<f32>,
        normal: Array4<f32>,
    },
    /// One `(2N, H, W, 3)` batch: N position maps followed by N normal maps.
    Concatenated(Array4<f32>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlSource {
    Explicit(ControlImages),
    Rendered(RenderOutput),
    /// Plücker control image of the camera configuration, `width x width`.
    RayEmbedding { width: usize },
    Absent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditioningInputs {
    pub control: ControlSource,
    pub control_scale: f32,
    /// `(count, H, W, C)` with `C` of 3 or 4; only the first image is used.
    pub reference: Option<Array4<f32>>,
}

impl ConditioningInputs {
    #[must_use]
    pub fn new(control: ControlSource) -> Self {
        Self {
            control,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_reference(mut self, reference: Array4<f32>) -> Self {
        self.reference = Some(reference);
        self
    }
}

impl Default for ConditioningInputs {
    fn default() -> Self {
        Self {
            control: ControlSource::Absent,
            control_scale: 1.0,
            reference: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlConditioning {
    /// `(N, 6, H, W)`.
    pub tensor: Array4<f32>,
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceConditioning {
    /// `(H, W, C)`.
    pub image: Array3<f32>,
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditioningPayload {
    pub num_views: usize,
    pub control: Option<ControlConditioning>,
    pub reference: Option<ReferenceConditioning>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Compose
// ─────────────────────────────────────────────────────────────────────────────

/// Packs control maps and the reference image for `camera`'s views.
///
/// The camera configuration is validated first; no map is touched when it fails.
pub fn compose(
    inputs: ConditioningInputs,
    camera: &CameraConfig,
) -> Result<ConditioningPayload, PipelineError> {
    camera.validate()?;
    let views = camera.num_views();
    let ConditioningInputs {
        control,
        control_scale,
        reference,
    } = inputs;

    let mut metrics = PipelineMetrics::default();
    metrics.begin();

    let tensor = match control {
        ControlSource::Explicit(ControlImages::Pair { position, normal }) => Some(
            metrics.time(TimingBucket::Composite, || {
                pack_pair(position.view(), normal.view(), views)
            })?,
        ),
        ControlSource::Explicit(ControlImages::Concatenated(batch)) => {
            let batch_len = batch.len_of(Axis(0));
            if batch_len != 2 * views {
                return Err(ShapeMismatchError::ControlBatch {
                    batch: batch_len,
                    expected: 2 * views,
                }
                .into());
            }
            let position = batch.slice(s![..views, .., .., ..]);
            let normal = batch.slice(s![views.., .., .., ..]);
            Some(metrics.time(TimingBucket::Composite, || pack_pair(position, normal, views))?)
        }
        ControlSource::Rendered(output) => Some(metrics.time(TimingBucket::Composite, || {
            pack_pair(output.position_map.view(), output.normal_map.view(), views)
        })?),
        ControlSource::RayEmbedding { width } => {
            let control = camera_embedding(camera, width)?;
            Some(metrics.time(TimingBucket::Composite, || channels_first(control.view())))
        }
        ControlSource::Absent => None,
    };

    let reference = reference
        .map(|batch| first_reference(&batch))
        .transpose()?;

    if let Some(report) = metrics.end() {
        log::debug!("composite took {} ns", report.composite_ns);
    }
    log::debug!(
        "composed payload: {views} views, control {}, reference {}",
        tensor.is_some(),
        reference.is_some()
    );

    Ok(ConditioningPayload {
        num_views: views,
        control: tensor.map(|tensor| ControlConditioning {
            tensor,
            scale: control_scale,
        }),
        reference,
    })
}

fn dims(array: ArrayView4<'_, f32>) -> [usize; 4] {
    let (n, h, w, c) = array.dim();
    [n, h, w, c]
}

fn pack_pair<'a>(
    position: ArrayView4<'a, f32>,
    normal: ArrayView4<'a, f32>,
    views: usize,
) -> Result<Array4<f32>, ShapeMismatchError> {
    let (p, n) = (dims(position), dims(normal));
    for (name, channels) in [("position maps", p[3]), ("normal maps", n[3])] {
        if channels != 3 {
            return Err(ShapeMismatchError::Channels {
                name,
                channels,
                expected: "3",
            });
        }
    }
    if p != n {
        return Err(ShapeMismatchError::PairShape {
            position: p,
            normal: n,
        });
    }
    if p[0] != views {
        return Err(ShapeMismatchError::ViewCount { maps: p[0], views });
    }
    let joined = concatenate(Axis(3), &[position, normal]).map_err(|_| {
        ShapeMismatchError::PairShape {
            position: p,
            normal: n,
        }
    })?;
    Ok(channels_first(joined.view()))
}

/// `(N, H, W, C)` to a contiguous `(N, C, H, W)`.
fn channels_first(maps: ArrayView4<'_, f32>) -> Array4<f32> {
    maps.permuted_axes([0, 3, 1, 2])
        .as_standard_layout()
        .into_owned()
}

fn first_reference(batch: &Array4<f32>) -> Result<ReferenceConditioning, ShapeMismatchError> {
    let (count, _, _, channels) = batch.dim();
    if count == 0 {
        return Err(ShapeMismatchError::EmptyBatch { name: "reference" });
    }
    if channels != 3 && channels != 4 {
        return Err(ShapeMismatchError::Channels {
            name: "reference",
            channels,
            expected: "3 or 4",
        });
    }
    Ok(ReferenceConditioning {
        image: batch.index_axis(Axis(0), 0).to_owned(),
        scale: 1.0,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Image helpers
// ─────────────────────────────────────────────────────────────────────────────

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Centres the opaque subject of `rgba` on a gray `height x width` canvas.
///
/// The subject is cropped to its alpha bounding box with a one pixel margin,
/// resized so its longer side fills 90% of the target, composited over 0.5
/// gray and quantized to 8 bits. A fully transparent image keeps its full
/// frame. Three-channel input is treated as opaque.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn prepare_reference_image(
    rgba: &Array3<f32>,
    height: usize,
    width: usize,
) -> Result<Array3<f32>, PipelineError> {
    let (h, w, channels) = rgba.dim();
    if channels != 3 && channels != 4 {
        return Err(ShapeMismatchError::Channels {
            name: "reference",
            channels,
            expected: "3 or 4",
        }
        .into());
    }
    if h == 0 || w == 0 {
        return Err(ShapeMismatchError::EmptyBatch { name: "reference" }.into());
    }
    if height == 0 || width == 0 {
        return Err(ConfigurationError::ZeroSize { height, width }.into());
    }

    let source: RgbaImage = ImageBuffer::from_fn(w as u32, h as u32, |x, y| {
        let (r, c) = (y as usize, x as usize);
        let alpha = if channels == 4 { rgba[[r, c, 3]] } else { 1.0 };
        Rgba([
            to_u8(rgba[[r, c, 0]]),
            to_u8(rgba[[r, c, 1]]),
            to_u8(rgba[[r, c, 2]]),
            to_u8(alpha),
        ])
    });

    let (y0, y1, x0, x1) = alpha_bounds(&source).unwrap_or((0, h, 0, w));
    let crop = imageops::crop_imm(&source, x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
        .to_image();

    let (crop_h, crop_w) = ((y1 - y0) as f64, (x1 - x0) as f64);
    let (fit_h, fit_w) = if crop_h > crop_w {
        let fit_h = height as f64 * REFERENCE_FILL;
        (fit_h as usize, (crop_w * fit_h / crop_h) as usize)
    } else {
        let fit_w = width as f64 * REFERENCE_FILL;
        ((crop_h * fit_w / crop_w) as usize, fit_w as usize)
    };
    let fit_h = fit_h.clamp(1, height);
    let fit_w = fit_w.clamp(1, width);
    let resized = imageops::resize(&crop, fit_w as u32, fit_h as u32, FilterType::CatmullRom);

    let (start_h, start_w) = ((height - fit_h) / 2, (width - fit_w) / 2);
    let mut out = Array3::<f32>::zeros((height, width, 3));
    for r in 0..height {
        for c in 0..width {
            let pixel = if (start_h..start_h + fit_h).contains(&r) && (start_w..start_w + fit_w).contains(&c) {
                resized.get_pixel((c - start_w) as u32, (r - start_h) as u32).0
            } else {
                [0; 4]
            };
            let alpha = f32::from(pixel[3]) / 255.0;
            for ch in 0..3 {
                let color = f32::from(pixel[ch]) / 255.0;
                let blended = color * alpha + (1.0 - alpha) * REFERENCE_BACKGROUND;
                // Truncate like an 8-bit cast.
                out[[r, c, ch]] = (blended * 255.0).clamp(0.0, 255.0).floor() / 255.0;
            }
        }
    }
    Ok(out)
}

/// Row and column ranges `[y0, y1) x [x0, x1)` around pixels with non-zero alpha.
fn alpha_bounds(image: &RgbaImage) -> Option<(usize, usize, usize, usize)> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let mut bounds: Option<(usize, usize, usize, usize)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[3] == 0 {
            continue;
        }
        let (r, c) = (y as usize, x as usize);
        bounds = Some(match bounds {
            None => (r, r, c, c),
            Some((r0, r1, c0, c1)) => (r0.min(r), r1.max(r), c0.min(c), c1.max(c)),
        });
    }
    bounds.map(|(r0, r1, c0, c1)| {
        (
            r0.saturating_sub(1),
            (r1 + 1).min(h),
            c0.saturating_sub(1),
            (c1 + 1).min(w),
        )
    })
}

/// Resizes every view to `height x width` RGB and stacks them into `(N, H, W, 3)`.
///
/// Single-channel views are broadcast to gray; an alpha channel is dropped.
#[allow(clippy::cast_possible_truncation)]
pub fn stack_views(
    views: &[Array3<f32>],
    height: usize,
    width: usize,
) -> Result<Array4<f32>, PipelineError> {
    if views.is_empty() {
        return Err(ShapeMismatchError::EmptyBatch { name: "views" }.into());
    }
    if height == 0 || width == 0 {
        return Err(ConfigurationError::ZeroSize { height, width }.into());
    }

    let mut stacked = Array4::<f32>::zeros((views.len(), height, width, 3));
    for (mut slot, view) in stacked.axis_iter_mut(Axis(0)).zip(views) {
        let (h, w, channels) = view.dim();
        if !matches!(channels, 1 | 3 | 4) {
            return Err(ShapeMismatchError::Channels {
                name: "view",
                channels,
                expected: "1, 3 or 4",
            }
            .into());
        }
        if h == 0 || w == 0 {
            return Err(ShapeMismatchError::EmptyBatch { name: "view" }.into());
        }
        let rgb: Rgb32FImage = ImageBuffer::from_fn(w as u32, h as u32, |x, y| {
            let (r, c) = (y as usize, x as usize);
            if channels == 1 {
                Rgb([view[[r, c, 0]]; 3])
            } else {
                Rgb([view[[r, c, 0]], view[[r, c, 1]], view[[r, c, 2]]])
            }
        });
        let resized = if (h, w) == (height, width) {
            rgb
        } else {
            imageops::resize(&rgb, width as u32, height as u32, FilterType::CatmullRom)
        };
        for (x, y, pixel) in resized.enumerate_pixels() {
            for ch in 0..3 {
                slot[[y as usize, x as usize, ch]] = pixel.0[ch].clamp(0.0, 1.0);
            }
        }
    }
    Ok(stacked)
}
