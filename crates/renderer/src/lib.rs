//! Two-pass GPU Voronoi renderer.
//!
//! ```text
//!   SeedSet ──▶ SeedTexture (N×1, Rg32Float)
//!                    │
//!                    ▼
//!   distance pass ──▶ DistanceField (R×R, Rg32Float or Rg16Float)
//!                    │
//!                    ▼
//!   edge pass ──────▶ presentation target (window surface or PNG)
//! ```
//!
//! Both passes draw the same screen-space quad. Their shader programs are
//! compiled from GLSL, reflected, and checked against a typed parameter table
//! before any GPU resource of the render exists. [`render_diagram`] is the
//! single-shot entry point; [`Renderer`] wraps it for the command line.

pub mod bindings;
pub mod compile;
pub mod error;
pub mod export;
pub mod gpu;
pub mod points;
pub mod render;
pub mod types;
mod window;

use anyhow::{Context, Result};

pub use compile::{check_program, compile_stage, ShaderSet};
pub use error::{RenderError, ShaderStageKind};
pub use gpu::graph::{GraphError, RenderGraph, RenderNode, ResourceId};
pub use gpu::{FieldImage, GpuContext, PresentTarget, SeedTexture};
pub use points::{generate_points, SeedSet};
pub use render::{render_diagram, render_to_image, DiagramImage, RenderReport};
pub use types::*;

/// Entry point used by the binary: generates the seeds and sends the render
/// to the configured output.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn run(&self) -> Result<()> {
        let seeds = SeedSet::random(self.config.point_count, self.config.seed);
        tracing::debug!(points = seeds.len(), seed = ?self.config.seed, "generated seed points");
        match &self.config.mode {
            RenderMode::Headless { output } => self.run_headless(&seeds, output),
            RenderMode::Windowed => {
                window::run(&seeds, &self.config.settings, self.config.gpu_power)
            }
        }
    }

    fn run_headless(&self, seeds: &SeedSet, output: &std::path::Path) -> Result<()> {
        let ctx = GpuContext::headless(self.config.gpu_power)?;
        tracing::info!(adapter = ctx.adapter_name(), "using GPU adapter");

        let capture_field = self.config.field_dump.is_some();
        let rendered = render_to_image(&ctx, seeds, &self.config.settings, capture_field)
            .context("failed to render diagram")?;
        export::save_diagram(&rendered.image, output)?;
        tracing::info!(
            path = %output.display(),
            points = rendered.report.point_count,
            resolution = rendered.report.resolution,
            elapsed_ms = rendered.report.elapsed.as_millis() as u64,
            "wrote diagram"
        );

        if let (Some(path), Some(field)) = (&self.config.field_dump, &rendered.report.field) {
            export::save_field(&field.to_grayscale(), path)?;
            tracing::info!(path = %path.display(), "wrote distance field");
        }
        Ok(())
    }
}
