use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use diagramconfig::{DiagramConfig, ShaderSection};
use renderer::{
    DiagramSettings, EdgeStyle, RenderMode, RendererConfig, ShaderSet, DEFAULT_POINT_COUNT,
    DEFAULT_RESOLUTION,
};

use crate::cli::{metric_from_setting, RunArgs, ShaderArgs};

const DEFAULT_OUTPUT: &str = "voronoi.png";

pub fn load_config(path: Option<&Path>) -> Result<Option<DiagramConfig>> {
    path.map(|path| {
        DiagramConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))
    })
    .transpose()
}

/// Shader paths after applying CLI overrides on top of the config file.
fn shader_paths(args: &ShaderArgs, section: Option<&ShaderSection>) -> [Option<PathBuf>; 3] {
    let pick = |flag: &Option<PathBuf>, file: Option<&PathBuf>| flag.clone().or_else(|| file.cloned());
    [
        pick(&args.vertex_shader, section.and_then(|s| s.vertex.as_ref())),
        pick(&args.distance_shader, section.and_then(|s| s.distance.as_ref())),
        pick(&args.edge_shader, section.and_then(|s| s.edge.as_ref())),
    ]
}

fn read_shader(path: Option<&PathBuf>, fallback: &Cow<'static, str>) -> Result<Cow<'static, str>> {
    match path {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read shader {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded shader override");
            Ok(Cow::Owned(source))
        }
        None => Ok(fallback.clone()),
    }
}

/// Built-in shaders with any file overrides swapped in.
pub fn load_shader_set(args: &ShaderArgs, config: Option<&DiagramConfig>) -> Result<ShaderSet> {
    let defaults = ShaderSet::default();
    let [vertex, distance, edge] = shader_paths(args, config.map(|c| &c.shaders));
    Ok(ShaderSet {
        vertex: read_shader(vertex.as_ref(), &defaults.vertex)?,
        distance: read_shader(distance.as_ref(), &defaults.distance)?,
        edge: read_shader(edge.as_ref(), &defaults.edge)?,
    })
}

/// Merges CLI flags over the config file over built-in defaults.
pub fn resolve(args: &RunArgs, config: Option<&DiagramConfig>) -> Result<RendererConfig> {
    let defaults = EdgeStyle::default();
    let edges = config.map(|c| &c.edges);

    let edge_style = EdgeStyle {
        threshold: args
            .edge_threshold
            .or_else(|| edges.and_then(|e| e.threshold))
            .unwrap_or(defaults.threshold),
        color: args
            .edge_color
            .or_else(|| edges.and_then(|e| e.color).map(|c| c.0))
            .unwrap_or(defaults.color),
        cell_tint: args
            .cell_tint
            .or_else(|| edges.and_then(|e| e.background_tint).map(|c| c.0))
            .unwrap_or(defaults.cell_tint),
    };

    let settings = DiagramSettings {
        resolution: args
            .resolution
            .or_else(|| config.and_then(|c| c.resolution))
            .unwrap_or(DEFAULT_RESOLUTION),
        metric: args
            .metric
            .or_else(|| config.and_then(|c| c.metric).map(metric_from_setting))
            .unwrap_or_default(),
        edge_style,
        shaders: load_shader_set(&args.shaders, config)?,
    };

    let mode = if args.window {
        RenderMode::Windowed
    } else {
        let output = args
            .output
            .clone()
            .or_else(|| config.and_then(|c| c.output.clone()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        RenderMode::Headless { output }
    };

    Ok(RendererConfig {
        point_count: args
            .points
            .or_else(|| config.and_then(|c| c.points))
            .unwrap_or(DEFAULT_POINT_COUNT),
        seed: args.seed.or_else(|| config.and_then(|c| c.seed)),
        settings,
        mode,
        field_dump: args.dump_field.clone(),
        gpu_power: args.gpu_power,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::DistanceMetric;

    fn config(text: &str) -> DiagramConfig {
        DiagramConfig::from_toml_str(text).unwrap()
    }

    #[test]
    fn defaults_apply_without_flags_or_config() {
        let resolved = resolve(&RunArgs::default(), None).unwrap();
        assert_eq!(resolved.point_count, DEFAULT_POINT_COUNT);
        assert_eq!(resolved.settings.resolution, DEFAULT_RESOLUTION);
        assert_eq!(resolved.settings.metric, DistanceMetric::Euclidean);
        assert_eq!(resolved.settings.shaders, ShaderSet::default());
        assert_eq!(
            resolved.mode,
            RenderMode::Headless {
                output: PathBuf::from("voronoi.png")
            }
        );
        assert!(resolved.seed.is_none());
    }

    #[test]
    fn config_fills_what_flags_leave_out() {
        let file = config(
            "version = 1\npoints = 40\nresolution = 256\nmetric = \"chebyshev\"\n[edges]\nthreshold = 0.1\ncolor = \"#00ff00\"",
        );
        let args = RunArgs {
            points: Some(7),
            ..RunArgs::default()
        };
        let resolved = resolve(&args, Some(&file)).unwrap();
        assert_eq!(resolved.point_count, 7);
        assert_eq!(resolved.settings.resolution, 256);
        assert_eq!(resolved.settings.metric, DistanceMetric::Chebyshev);
        assert_eq!(resolved.settings.edge_style.threshold, 0.1);
        assert_eq!(resolved.settings.edge_style.color, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(
            resolved.settings.edge_style.cell_tint,
            EdgeStyle::default().cell_tint
        );
    }

    #[test]
    fn window_flag_selects_windowed_mode() {
        let file = config("version = 1\noutput = \"ignored.png\"");
        let args = RunArgs {
            window: true,
            ..RunArgs::default()
        };
        assert_eq!(resolve(&args, Some(&file)).unwrap().mode, RenderMode::Windowed);
    }

    #[test]
    fn shader_override_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edge.frag");
        fs::write(&path, "// custom edge shader").unwrap();
        let args = ShaderArgs {
            edge_shader: Some(path),
            ..ShaderArgs::default()
        };

        let shaders = load_shader_set(&args, None).unwrap();
        assert_eq!(shaders.edge, "// custom edge shader");
        assert_eq!(shaders.distance, ShaderSet::default().distance);
    }

    #[test]
    fn missing_shader_file_names_the_path() {
        let args = ShaderArgs {
            vertex_shader: Some(PathBuf::from("/nonexistent/quad.vert")),
            ..ShaderArgs::default()
        };
        let err = load_shader_set(&args, None).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/quad.vert"));
    }
}
