//! Opt-in timing hooks for the conditioning pipeline.
//!
//! Timing is only collected when the `pipeline_metrics` feature is enabled and
//! the target is not WASM (`std::time::Instant` is unavailable there). In every
//! other configuration the calls compile down to plain closure invocations.
//!
//! ```ignore
//! use mvcond_engine::geom::{PipelineMetrics, TimingBucket};
//!
//! let mut metrics = PipelineMetrics::default();
//! metrics.begin();
//! let rig = metrics.time(TimingBucket::CameraRig, || config.to_rig())?;
//! if let Some(report) = metrics.end() {
//!     println!("rig: {} ns", report.camera_rig_ns);
//! }
//! ```

/// Phases of the pipeline that accumulate time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingBucket {
    /// Flattening, centering, rescaling and frame remap.
    MeshNormalize,
    /// Duplicate vertex merging.
    Welding,
    /// Edge topology and other mesh diagnostics.
    Diagnostics,
    /// Camera-to-world matrix construction.
    CameraRig,
    /// Plücker embedding and control image.
    RayEmbedding,
    /// Triangle rasterization across all views.
    Rasterization,
    /// Control tensor assembly.
    Composite,
}

/// Cumulative nanoseconds per bucket.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineTimingReport {
    pub mesh_normalize_ns: u64,
    pub welding_ns: u64,
    pub diagnostics_ns: u64,
    pub camera_rig_ns: u64,
    pub ray_embedding_ns: u64,
    pub rasterization_ns: u64,
    pub composite_ns: u64,
}

impl PipelineTimingReport {
    #[must_use]
    pub fn total_ns(&self) -> u64 {
        self.mesh_normalize_ns
            .saturating_add(self.welding_ns)
            .saturating_add(self.diagnostics_ns)
            .saturating_add(self.camera_rig_ns)
            .saturating_add(self.ray_embedding_ns)
            .saturating_add(self.rasterization_ns)
            .saturating_add(self.composite_ns)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }
}

/// Accumulator for timing pipeline phases.
///
/// Call [`begin`](Self::begin) to reset, wrap work in [`time`](Self::time) and
/// read the result with [`end`](Self::end), which is `None` when metrics are
/// compiled out.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    #[cfg(all(feature = "pipeline_metrics", not(target_arch = "wasm32")))]
    report: PipelineTimingReport,
}

impl PipelineMetrics {
    pub fn begin(&mut self) {
        #[cfg(all(feature = "pipeline_metrics", not(target_arch = "wasm32")))]
        {
            self.report = PipelineTimingReport::default();
        }
    }

    #[must_use]
    pub fn end(&self) -> Option<PipelineTimingReport> {
        #[cfg(all(feature = "pipeline_metrics", not(target_arch = "wasm32")))]
        {
            Some(self.report.clone())
        }
        #[cfg(not(all(feature = "pipeline_metrics", not(target_arch = "wasm32"))))]
        {
            None
        }
    }

    /// Runs `f` and adds its wall time to `bucket`.
    pub fn time<R>(&mut self, bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
        #[cfg(all(feature = "pipeline_metrics", not(target_arch = "wasm32")))]
        {
            let start = std::time::Instant::now();
            let result = f();
            #[allow(clippy::cast_possible_truncation)]
            let nanos = start.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64;
            self.add_to_bucket(bucket, nanos);
            result
        }

        #[cfg(not(all(feature = "pipeline_metrics", not(target_arch = "wasm32"))))]
        {
            let _ = bucket;
            f()
        }
    }

    #[cfg(all(feature = "pipeline_metrics", not(target_arch = "wasm32")))]
    fn add_to_bucket(&mut self, bucket: TimingBucket, nanos: u64) {
        let slot = match bucket {
            TimingBucket::MeshNormalize => &mut self.report.mesh_normalize_ns,
            TimingBucket::Welding => &mut self.report.welding_ns,
            TimingBucket::Diagnostics => &mut self.report.diagnostics_ns,
            TimingBucket::CameraRig => &mut self.report.camera_rig_ns,
            TimingBucket::RayEmbedding => &mut self.report.ray_embedding_ns,
            TimingBucket::Rasterization => &mut self.report.rasterization_ns,
            TimingBucket::Composite => &mut self.report.composite_ns,
        };
        *slot = slot.saturating_add(nanos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_report_total() {
        let report = PipelineTimingReport {
            rasterization_ns: 1500,
            ray_embedding_ns: 500,
            welding_ns: 4000,
            ..PipelineTimingReport::default()
        };
        assert_eq!(report.total_ns(), 6000);
        assert!((report.total_ms() - 0.006).abs() < 1e-9);
    }

    #[test]
    fn test_time_returns_closure_result() {
        let mut metrics = PipelineMetrics::default();
        metrics.begin();
        let value = metrics.time(TimingBucket::CameraRig, || 7 * 6);
        assert_eq!(value, 42);
        let report = metrics.end();
        if cfg!(all(feature = "pipeline_metrics", not(target_arch = "wasm32"))) {
            assert!(report.is_some());
        } else {
            assert!(report.is_none());
        }
    }
}
