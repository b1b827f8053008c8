use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricSetting {
    Euclidean,
    Manhattan,
    Chebyshev,
}

impl MetricSetting {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "manhattan" | "taxicab" | "l1" => Ok(Self::Manhattan),
            "chebyshev" | "linf" => Ok(Self::Chebyshev),
            other => Err(format!(
                "invalid metric '{other}'; expected euclidean, manhattan, or chebyshev"
            )),
        }
    }
}

/// Linear RGBA color, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub [f32; 4]);

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0.map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8);
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

/// Parses `#rrggbb` or `#rrggbbaa` (leading `#` optional). Alpha defaults to
/// opaque.
pub fn parse_color(raw: &str) -> Result<Color, String> {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(format!(
            "invalid color '{raw}'; expected #rrggbb or #rrggbbaa"
        ));
    }

    let mut channels = [1.0f32; 4];
    for (index, channel) in channels.iter_mut().enumerate().take(hex.len() / 2) {
        let byte = u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16)
            .map_err(|err| format!("invalid color '{raw}': {err}"))?;
        *channel = f32::from(byte) / 255.0;
    }
    Ok(Color(channels))
}

fn deserialize_color_opt<'de, D>(deserializer: D) -> Result<Option<Color>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| parse_color(&value).map_err(de::Error::custom))
        .transpose()
}

/// `[edges]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeSection {
    pub threshold: Option<f32>,
    #[serde(default, deserialize_with = "deserialize_color_opt")]
    pub color: Option<Color>,
    #[serde(default, deserialize_with = "deserialize_color_opt")]
    pub background_tint: Option<Color>,
}

/// `[shaders]` table: GLSL files replacing the built-in programs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShaderSection {
    pub vertex: Option<PathBuf>,
    pub distance: Option<PathBuf>,
    pub edge: Option<PathBuf>,
}

/// Diagram settings loaded from a TOML file. Every field is optional so
/// command line flags can override them one by one.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagramConfig {
    pub version: u32,
    pub resolution: Option<u32>,
    pub points: Option<usize>,
    pub seed: Option<u64>,
    pub metric: Option<MetricSetting>,
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub edges: EdgeSection,
    #[serde(default)]
    pub shaders: ShaderSection,
}

impl DiagramConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: DiagramConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates a config file. Relative shader and output paths are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_paths(base);
        }
        Ok(config)
    }

    fn resolve_relative_paths(&mut self, base: &Path) {
        let resolve = |slot: &mut Option<PathBuf>| {
            if let Some(path) = slot.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        };
        resolve(&mut self.shaders.vertex);
        resolve(&mut self.shaders.distance);
        resolve(&mut self.shaders.edge);
        resolve(&mut self.output);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.resolution == Some(0) {
            return Err(ConfigError::Invalid(
                "resolution must be greater than zero".into(),
            ));
        }

        if self.points == Some(0) {
            return Err(ConfigError::Invalid(
                "points must be greater than zero".into(),
            ));
        }

        if let Some(threshold) = self.edges.threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "edges.threshold must be a non-negative number, got {threshold}"
                )));
            }
        }

        Ok(())
    }
}
