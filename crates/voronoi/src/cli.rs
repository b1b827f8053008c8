use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use diagramconfig::{parse_color, MetricSetting};
use renderer::{DistanceMetric, GpuPowerPreference};

#[derive(Parser, Debug)]
#[command(
    name = "voronoi",
    author,
    version,
    about = "Render a Voronoi diagram of random seed points on the GPU"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// TOML file with diagram settings; flags given here take precedence.
    #[arg(long, value_name = "FILE", env = "VORONOI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of random seed points.
    #[arg(short = 'n', long, value_name = "COUNT", value_parser = parse_point_count)]
    pub points: Option<usize>,

    /// Side length of the square render target in pixels.
    #[arg(long, value_name = "PIXELS", value_parser = parse_resolution)]
    pub resolution: Option<u32>,

    /// RNG seed for reproducible diagrams.
    #[arg(long, value_name = "U64")]
    pub seed: Option<u64>,

    /// Distance metric: `euclidean`, `manhattan`, or `chebyshev`.
    #[arg(long, value_name = "METRIC", value_parser = parse_metric)]
    pub metric: Option<DistanceMetric>,

    /// Minimum index change between neighbouring pixels drawn as an edge.
    #[arg(long, value_name = "VALUE", value_parser = parse_threshold)]
    pub edge_threshold: Option<f32>,

    /// Edge color as `#rrggbb` or `#rrggbbaa`.
    #[arg(long, value_name = "HEX", value_parser = parse_rgba)]
    pub edge_color: Option<[f32; 4]>,

    /// Base tint for cell interiors as `#rrggbb` or `#rrggbbaa`.
    #[arg(long, value_name = "HEX", value_parser = parse_rgba)]
    pub cell_tint: Option<[f32; 4]>,

    #[command(flatten)]
    pub shaders: ShaderArgs,

    /// Present the diagram in a desktop window instead of writing a PNG.
    #[arg(long, conflicts_with_all = ["output", "dump_field"])]
    pub window: bool,

    /// PNG path for headless output (default `voronoi.png`).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Also write the distance field index channel as a grayscale PNG.
    #[arg(long, value_name = "PATH")]
    pub dump_field: Option<PathBuf>,

    /// GPU adapter preference: `low` (default) or `high`.
    #[arg(
        long,
        value_name = "PREFERENCE",
        value_parser = parse_gpu_power,
        default_value = "low"
    )]
    pub gpu_power: GpuPowerPreference,
}

/// GLSL files replacing the built-in shaders.
#[derive(Args, Debug, Default, Clone)]
pub struct ShaderArgs {
    /// Vertex shader shared by both passes.
    #[arg(long, value_name = "FILE")]
    pub vertex_shader: Option<PathBuf>,

    /// Fragment shader for the distance pass.
    #[arg(long, value_name = "FILE")]
    pub distance_shader: Option<PathBuf>,

    /// Fragment shader for the edge pass.
    #[arg(long, value_name = "FILE")]
    pub edge_shader: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile and link-check the shader programs without touching the GPU.
    CheckShaders(CheckShadersArgs),
}

#[derive(Args, Debug)]
pub struct CheckShadersArgs {
    /// TOML file whose `[shaders]` table names the sources to check.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub shaders: ShaderArgs,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_point_count(value: &str) -> Result<usize, String> {
    let count: usize = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid point count '{value}'"))?;
    if count == 0 {
        return Err("at least one point is required".to_string());
    }
    Ok(count)
}

pub fn parse_resolution(value: &str) -> Result<u32, String> {
    let resolution: u32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid resolution '{value}'"))?;
    if resolution == 0 {
        return Err("resolution must be greater than zero".to_string());
    }
    Ok(resolution)
}

pub fn parse_metric(value: &str) -> Result<DistanceMetric, String> {
    MetricSetting::parse(value).map(metric_from_setting)
}

pub fn metric_from_setting(setting: MetricSetting) -> DistanceMetric {
    match setting {
        MetricSetting::Euclidean => DistanceMetric::Euclidean,
        MetricSetting::Manhattan => DistanceMetric::Manhattan,
        MetricSetting::Chebyshev => DistanceMetric::Chebyshev,
    }
}

pub fn parse_threshold(value: &str) -> Result<f32, String> {
    let threshold: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid edge threshold '{value}'"))?;
    if !threshold.is_finite() || threshold < 0.0 {
        return Err("edge threshold must be a non-negative number".to_string());
    }
    Ok(threshold)
}

pub fn parse_rgba(value: &str) -> Result<[f32; 4], String> {
    parse_color(value).map(|color| color.0)
}

pub fn parse_gpu_power(value: &str) -> Result<GpuPowerPreference, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" | "integrated" => Ok(GpuPowerPreference::Low),
        "high" | "high-performance" | "discrete" => Ok(GpuPowerPreference::High),
        other => Err(format!("unknown GPU power preference '{other}' (expected low or high)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metric_names() {
        assert_eq!(parse_metric("manhattan").unwrap(), DistanceMetric::Manhattan);
        assert_eq!(parse_metric(" Euclidean ").unwrap(), DistanceMetric::Euclidean);
        assert!(parse_metric("hamming").is_err());
    }

    #[test]
    fn rejects_zero_counts() {
        assert!(parse_point_count("0").is_err());
        assert_eq!(parse_point_count("12").unwrap(), 12);
        assert!(parse_resolution("0").is_err());
        assert!(parse_resolution("-4").is_err());
    }

    #[test]
    fn threshold_must_be_non_negative() {
        assert_eq!(parse_threshold("0.5").unwrap(), 0.5);
        assert!(parse_threshold("-0.1").is_err());
        assert!(parse_threshold("inf").is_err());
    }

    #[test]
    fn parses_gpu_power() {
        assert_eq!(parse_gpu_power("HIGH").unwrap(), GpuPowerPreference::High);
        assert_eq!(parse_gpu_power("low").unwrap(), GpuPowerPreference::Low);
        assert!(parse_gpu_power("medium").is_err());
    }

    #[test]
    fn window_conflicts_with_headless_outputs() {
        let result = Cli::try_parse_from(["voronoi", "--window", "--output", "x.png"]);
        assert!(result.is_err());
        let cli = Cli::try_parse_from(["voronoi", "--window", "-n", "9"]).unwrap();
        assert!(cli.run.window);
        assert_eq!(cli.run.points, Some(9));
    }

    #[test]
    fn check_shaders_subcommand_parses() {
        let cli = Cli::try_parse_from(["voronoi", "check-shaders", "--edge-shader", "e.frag"]).unwrap();
        match cli.command {
            Some(Command::CheckShaders(args)) => {
                assert_eq!(args.shaders.edge_shader, Some(PathBuf::from("e.frag")));
            }
            None => panic!("expected subcommand"),
        }
    }
}
