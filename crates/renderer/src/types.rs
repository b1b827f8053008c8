use std::path::PathBuf;

use crate::compile::ShaderSet;

/// Width and height, in pixels, used when the caller does not pick one.
pub const DEFAULT_RESOLUTION: u32 = 800;

/// Number of seed points generated when the caller does not pick one.
pub const DEFAULT_POINT_COUNT: usize = 5;

/// Index discontinuity above which a pixel is classified as a cell boundary.
pub const DEFAULT_EDGE_THRESHOLD: f32 = 0.5;

/// Distance function the distance pass minimises per pixel.
///
/// The discriminant is written verbatim into the `metric` uniform, so the
/// values must stay in sync with `shaders/distance.frag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
    Chebyshev,
}

impl DistanceMetric {
    pub(crate) fn shader_code(self) -> u32 {
        match self {
            DistanceMetric::Euclidean => 0,
            DistanceMetric::Manhattan => 1,
            DistanceMetric::Chebyshev => 2,
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMetric::Euclidean => f.write_str("euclidean"),
            DistanceMetric::Manhattan => f.write_str("manhattan"),
            DistanceMetric::Chebyshev => f.write_str("chebyshev"),
        }
    }
}

/// Visual parameters of the edge pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStyle {
    /// Minimum index change between neighbouring pixels that counts as an edge.
    pub threshold: f32,
    /// RGBA colour written on boundary pixels.
    pub color: [f32; 4],
    /// RGBA base colour for cell interiors; shaded per cell index.
    pub cell_tint: [f32; 4],
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_EDGE_THRESHOLD,
            color: [1.0, 1.0, 1.0, 1.0],
            cell_tint: [0.2, 0.3, 0.45, 1.0],
        }
    }
}

/// Everything a single render invocation needs besides the seed set.
#[derive(Debug, Clone)]
pub struct DiagramSettings {
    /// Side length of the square render target in pixels.
    pub resolution: u32,
    pub metric: DistanceMetric,
    pub edge_style: EdgeStyle,
    /// GLSL sources for the shared vertex stage and both fragment stages.
    pub shaders: ShaderSet,
}

impl Default for DiagramSettings {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            metric: DistanceMetric::default(),
            edge_style: EdgeStyle::default(),
            shaders: ShaderSet::default(),
        }
    }
}

/// Adapter power preference forwarded to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

/// Where the edge pass output ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderMode {
    /// Render offscreen and write the result as a PNG.
    Headless { output: PathBuf },
    /// Present into a desktop window sized to the render resolution.
    Windowed,
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors CLI flags: how many seeds to generate, how to
/// render them, and where the picture should go.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Number of seed points to generate.
    pub point_count: usize,
    /// Optional RNG seed; `None` produces a different diagram every run.
    pub seed: Option<u64>,
    pub settings: DiagramSettings,
    pub mode: RenderMode,
    /// Optional path for a grayscale dump of the distance field index channel.
    pub field_dump: Option<PathBuf>,
    pub gpu_power: GpuPowerPreference,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            point_count: DEFAULT_POINT_COUNT,
            seed: None,
            settings: DiagramSettings::default(),
            mode: RenderMode::Headless {
                output: PathBuf::from("voronoi.png"),
            },
            field_dump: None,
            gpu_power: GpuPowerPreference::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_codes_are_distinct() {
        let codes = [
            DistanceMetric::Euclidean.shader_code(),
            DistanceMetric::Manhattan.shader_code(),
            DistanceMetric::Chebyshev.shader_code(),
        ];
        assert_eq!(codes, [0, 1, 2]);
    }

    #[test]
    fn default_edge_colour_never_matches_cell_interior() {
        let style = EdgeStyle::default();
        // Interiors are the tint scaled by a shade <= 1.0.
        assert!(style.cell_tint[..3]
            .iter()
            .zip(style.color[..3].iter())
            .any(|(tint, edge)| tint < edge));
    }
}
