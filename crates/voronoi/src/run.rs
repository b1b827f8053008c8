use anyhow::{Context, Result};
use renderer::bindings::{DISTANCE_PARAMETERS, EDGE_PARAMETERS};
use renderer::{check_program, Renderer};
use tracing_subscriber::EnvFilter;

use crate::cli::{CheckShadersArgs, RunArgs};
use crate::settings;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = settings::load_config(args.config.as_deref())?;
    let renderer_config = settings::resolve(&args, config.as_ref())?;
    tracing::debug!(
        points = renderer_config.point_count,
        resolution = renderer_config.settings.resolution,
        metric = %renderer_config.settings.metric,
        "resolved renderer configuration"
    );
    Renderer::new(renderer_config).run()
}

/// Compiles both programs and runs every link check that needs no device.
pub fn check_shaders(args: CheckShadersArgs) -> Result<()> {
    let config = settings::load_config(args.config.as_deref())?;
    let shaders = settings::load_shader_set(&args.shaders, config.as_ref())?;

    for (table, fragment) in [
        (&DISTANCE_PARAMETERS, &shaders.distance),
        (&EDGE_PARAMETERS, &shaders.edge),
    ] {
        check_program(table, &shaders.vertex, fragment)
            .with_context(|| format!("{} failed shader checks", table.program))?;
        println!("{}: ok", table.program);
    }
    Ok(())
}
