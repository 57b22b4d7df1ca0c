//! Diagnostics returned alongside a normalized mesh.
//!
//! ```ignore
//! let (mesh, diagnostics) = normalize(&asset, &NormalizeOptions::default())?;
//! if !diagnostics.is_watertight() {
//!     log::warn!("{}", diagnostics.summary());
//! }
//! ```

use std::fmt;

use super::mesh::NormalizeTransform;
use super::metrics::PipelineTimingReport;

/// Counts and repairs observed while normalizing a mesh.
///
/// Edge topology counts describe the stitched (merged) topology when vertex
/// merging was requested, and the raw triangle list otherwise. Unwelded seams
/// in the raw list show up as open edges.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NormalizeDiagnostics {
    /// Vertices in the primary buffers.
    pub vertex_count: usize,
    pub triangle_count: usize,
    /// Parts concatenated while flattening a scene.
    pub part_count: usize,
    /// Vertices removed by merging (primary count minus stitched count).
    pub merged_vertex_count: usize,
    /// Zero-area triangles. They are kept but contribute nothing to normals.
    pub degenerate_triangle_count: usize,
    /// Edges with exactly one adjacent triangle.
    pub open_edge_count: usize,
    /// Edges with more than two adjacent triangles.
    pub non_manifold_edge_count: usize,
    /// Centering and rescaling applied to the input coordinates.
    pub transform: NormalizeTransform,
    /// Only populated with `pipeline_metrics` on non-wasm targets.
    pub timing: Option<PipelineTimingReport>,
    pub warnings: Vec<String>,
}

impl NormalizeDiagnostics {
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.open_edge_count == 0
    }

    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count == 0
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.is_watertight()
            && self.is_manifold()
            && self.degenerate_triangle_count == 0
            && self.warnings.is_empty()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Short single-line form for logging: `"V:{vertices} T:{triangles} [issues...]"`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("V:{} T:{}", self.vertex_count, self.triangle_count)];

        if self.part_count > 1 {
            parts.push(format!("parts:{}", self.part_count));
        }
        if self.merged_vertex_count > 0 {
            parts.push(format!("merged:{}", self.merged_vertex_count));
        }
        if self.degenerate_triangle_count > 0 {
            parts.push(format!("degenerate:{}", self.degenerate_triangle_count));
        }
        if self.open_edge_count > 0 {
            parts.push(format!("open:{}", self.open_edge_count));
        }
        if self.non_manifold_edge_count > 0 {
            parts.push(format!("non-manifold:{}", self.non_manifold_edge_count));
        }

        parts.join(" ")
    }
}

impl fmt::Display for NormalizeDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Normalize Diagnostics:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Triangles: {}", self.triangle_count)?;
        writeln!(
            f,
            "  Transform: centroid {:?}, scale factor {}",
            self.transform.centroid, self.transform.scale_factor
        )?;

        if self.merged_vertex_count > 0 {
            writeln!(f, "  Merged vertices: {}", self.merged_vertex_count)?;
        }
        if self.degenerate_triangle_count > 0 {
            writeln!(f, "  Degenerate triangles: {}", self.degenerate_triangle_count)?;
        }
        if self.open_edge_count > 0 || self.non_manifold_edge_count > 0 {
            writeln!(f, "  Topology issues:")?;
            if self.open_edge_count > 0 {
                writeln!(f, "    - Open edges: {}", self.open_edge_count)?;
            }
            if self.non_manifold_edge_count > 0 {
                writeln!(f, "    - Non-manifold edges: {}", self.non_manifold_edge_count)?;
            }
        }

        if let Some(timing) = &self.timing {
            writeln!(f, "  Timing: {:.3} ms", timing.total_ms())?;
        }

        if !self.warnings.is_empty() {
            writeln!(f, "  Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "    - {warning}")?;
            }
        }

        Ok(())
    }
}
