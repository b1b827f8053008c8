use std::time::{Duration, Instant};

use image::RgbaImage;

use crate::bindings::{DISTANCE_PARAMETERS, EDGE_PARAMETERS};
use crate::compile::{check_program, link_program, ShaderSet};
use crate::error::RenderError;
use crate::gpu::distance::DistancePass;
use crate::gpu::edge::EdgePass;
use crate::gpu::graph::{RenderGraph, ResourceId};
use crate::gpu::{DistanceField, FieldImage, GpuContext, HeadlessTarget, PresentTarget, ScreenQuad, SeedTexture};
use crate::points::SeedSet;
use crate::types::DiagramSettings;

/// Seed count up to which `index / N` survives a half-float round trip.
const HALF_FLOAT_EXACT_POINTS: usize = 1024;

/// What one render invocation did.
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub point_count: usize,
    pub resolution: u32,
    /// Format the distance field was stored in on this adapter.
    pub field_format: wgpu::TextureFormat,
    /// Draw calls recorded; one per executed pass.
    pub draws: usize,
    pub pass_order: Vec<&'static str>,
    pub elapsed: Duration,
    /// Host copy of the distance field, when it was requested.
    pub field: Option<FieldImage>,
}

/// Offscreen render result.
#[derive(Debug, Clone)]
pub struct DiagramImage {
    pub image: RgbaImage,
    pub report: RenderReport,
}

/// Renders the diagram for `seeds` into `target`.
///
/// Both programs are compiled and linked before any texture is created, so a
/// broken shader fails the render without recording a draw. Every GPU object
/// created here is dropped when the call returns.
pub fn render_diagram(
    ctx: &GpuContext,
    seeds: &SeedSet,
    settings: &DiagramSettings,
    target: PresentTarget<'_>,
) -> Result<RenderReport, RenderError> {
    validate_request(ctx, seeds, settings)?;
    render(ctx, seeds, settings, target, false)
}

/// Renders into a fresh headless target and reads the picture back.
///
/// With `capture_field` set, the distance field is read back as well.
pub fn render_to_image(
    ctx: &GpuContext,
    seeds: &SeedSet,
    settings: &DiagramSettings,
    capture_field: bool,
) -> Result<DiagramImage, RenderError> {
    validate_request(ctx, seeds, settings)?;
    let headless = with_error_scope(ctx, "allocating presentation target", || {
        Ok(HeadlessTarget::new(ctx, settings.resolution))
    })?;
    let report = render(ctx, seeds, settings, headless.target(), capture_field)?;
    let image = headless.read_rgba(ctx)?;
    Ok(DiagramImage { image, report })
}

/// Expects a request that already passed [`validate_request`].
fn render(
    ctx: &GpuContext,
    seeds: &SeedSet,
    settings: &DiagramSettings,
    target: PresentTarget<'_>,
    capture_field: bool,
) -> Result<RenderReport, RenderError> {
    let started = Instant::now();
    let shaders = &settings.shaders;
    check_programs(shaders)?;
    let field_format = DistanceField::select_format(ctx)?;
    if field_format == wgpu::TextureFormat::Rg16Float && seeds.len() > HALF_FLOAT_EXACT_POINTS {
        tracing::warn!(
            points = seeds.len(),
            "half-float distance field cannot separate every seed index; edges may be lost"
        );
    }

    let distance_program = link_program(
        &ctx.device,
        &DISTANCE_PARAMETERS,
        &shaders.vertex,
        &shaders.distance,
        field_format,
    )?;
    let edge_program = link_program(
        &ctx.device,
        &EDGE_PARAMETERS,
        &shaders.vertex,
        &shaders.edge,
        target.format,
    )?;

    let (quad, seed_texture, field) = with_error_scope(ctx, "allocating render resources", || {
        Ok((
            ScreenQuad::new(&ctx.device),
            SeedTexture::encode(ctx, seeds)?,
            DistanceField::new(ctx, settings.resolution, field_format),
        ))
    })?;

    let (draws, pass_order) = with_error_scope(ctx, "recording render passes", || {
        let mut graph = RenderGraph::new(&[ResourceId::SeedTexture]);
        graph.add_pass(DistancePass::new(
            ctx,
            &distance_program,
            &quad,
            &seed_texture,
            &field,
            settings.metric,
        )?);
        graph.add_pass(EdgePass::new(
            ctx,
            &edge_program,
            &quad,
            &field,
            seeds.len(),
            &settings.edge_style,
            target.view,
        )?);
        let pass_order = graph.execution_order()?;

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("voronoi render"),
            });
        let draws = graph.execute(&mut encoder)?;
        ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok((draws, pass_order))
    })?;

    let field = if capture_field {
        Some(field.read_back(ctx, seeds.len())?)
    } else {
        None
    };

    let report = RenderReport {
        point_count: seeds.len(),
        resolution: settings.resolution,
        field_format,
        draws,
        pass_order,
        elapsed: started.elapsed(),
        field,
    };
    tracing::debug!(
        points = report.point_count,
        resolution = report.resolution,
        draws = report.draws,
        metric = %settings.metric,
        ?field_format,
        elapsed_ms = report.elapsed.as_secs_f64() * 1000.0,
        "rendered diagram"
    );
    Ok(report)
}

/// Compiles and link-checks both programs on the CPU, so a broken stage is
/// reported before any pipeline is created on the device.
fn check_programs(shaders: &ShaderSet) -> Result<(), RenderError> {
    check_program(&DISTANCE_PARAMETERS, &shaders.vertex, &shaders.distance)?;
    check_program(&EDGE_PARAMETERS, &shaders.vertex, &shaders.edge)?;
    Ok(())
}

fn validate_request(
    ctx: &GpuContext,
    seeds: &SeedSet,
    settings: &DiagramSettings,
) -> Result<(), RenderError> {
    if seeds.is_empty() {
        return Err(RenderError::InvalidConfig(
            "at least one seed point is required".to_string(),
        ));
    }
    let max = ctx.max_texture_dimension();
    if settings.resolution == 0 || settings.resolution > max {
        return Err(RenderError::InvalidConfig(format!(
            "resolution {} must be between 1 and {max}",
            settings.resolution
        )));
    }
    let threshold = settings.edge_style.threshold;
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(RenderError::InvalidConfig(format!(
            "edge threshold must be a non-negative number, got {threshold}"
        )));
    }
    Ok(())
}

/// Runs `f` inside out-of-memory and validation error scopes and turns any
/// captured device error into [`RenderError::Resource`].
fn with_error_scope<T>(
    ctx: &GpuContext,
    what: &str,
    f: impl FnOnce() -> Result<T, RenderError>,
) -> Result<T, RenderError> {
    ctx.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let result = f();
    let validation = pollster::block_on(ctx.device.pop_error_scope());
    let out_of_memory = pollster::block_on(ctx.device.pop_error_scope());

    let value = result?;
    if let Some(error) = validation.or(out_of_memory) {
        return Err(RenderError::Resource(format!("{what}: {error}")));
    }
    Ok(value)
}
