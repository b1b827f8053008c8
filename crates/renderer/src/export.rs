use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use image::{GrayImage, RgbaImage};

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

/// Writes the rendered diagram as a PNG, creating parent directories.
pub fn save_diagram(image: &RgbaImage, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write diagram to {}", path.display()))
}

/// Writes a grayscale dump of the distance field index channel.
pub fn save_field(image: &GrayImage, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write distance field to {}", path.display()))
}
