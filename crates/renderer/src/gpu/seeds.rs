use wgpu::util::{DeviceExt, TextureDataOrder};

use super::context::GpuContext;
use super::readback::read_texture;
use crate::error::RenderError;
use crate::points::SeedSet;

pub(crate) const SEED_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg32Float;

/// A seed set uploaded as an N×1 two-channel float texture.
///
/// Texel `i` holds point `i` verbatim. The sampler is nearest-only with
/// clamp-to-edge addressing, so sampling at `(i + 0.5) / N` returns exactly
/// that texel.
pub struct SeedTexture {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    count: u32,
}

impl SeedTexture {
    pub fn encode(ctx: &GpuContext, seeds: &SeedSet) -> Result<Self, RenderError> {
        let count = checked_width(seeds.len(), ctx.max_texture_dimension())?;

        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = ctx.device.create_texture_with_data(
            &ctx.queue,
            &wgpu::TextureDescriptor {
                label: Some("seed texture"),
                size: wgpu::Extent3d {
                    width: count,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: SEED_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            seeds.as_bytes(),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("seed sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        if let Some(error) = pollster::block_on(ctx.device.pop_error_scope()) {
            return Err(RenderError::Resource(format!(
                "failed to create seed texture: {error}"
            )));
        }

        tracing::debug!(points = count, "encoded seed texture");
        Ok(Self {
            texture,
            view,
            sampler,
            count,
        })
    }

    /// Number of texels, which equals the number of seeds.
    pub fn width(&self) -> u32 {
        self.count
    }

    /// Reads the texture back as interleaved `x, y` coordinates.
    pub fn read_back(&self, ctx: &GpuContext) -> Result<Vec<f32>, RenderError> {
        let bytes = read_texture(&ctx.device, &ctx.queue, &self.texture)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }
}

/// Validates a seed count against the device texture limit.
pub(crate) fn checked_width(count: usize, max_dimension: u32) -> Result<u32, RenderError> {
    if count == 0 {
        return Err(RenderError::InvalidConfig(
            "at least one seed point is required".to_string(),
        ));
    }
    match u32::try_from(count) {
        Ok(width) if width <= max_dimension => Ok(width),
        _ => Err(RenderError::Resource(format!(
            "{count} seed points exceed the maximum texture width of {max_dimension}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_seed_set_is_a_config_error() {
        assert!(matches!(
            checked_width(0, 8192),
            Err(RenderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn oversized_seed_set_is_a_resource_error() {
        assert_eq!(checked_width(8192, 8192).unwrap(), 8192);
        assert!(matches!(
            checked_width(8193, 8192),
            Err(RenderError::Resource(_))
        ));
    }
}
