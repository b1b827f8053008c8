use half::f16;
use image::{GrayImage, Luma, RgbaImage};

use super::context::GpuContext;
use super::readback::read_texture;
use crate::error::RenderError;

/// Distance field formats in order of preference. Downlevel GL adapters
/// cannot render to `Rg32Float`, so half floats are the fallback.
pub(crate) const FIELD_FORMATS: [wgpu::TextureFormat; 2] = [
    wgpu::TextureFormat::Rg32Float,
    wgpu::TextureFormat::Rg16Float,
];
pub(crate) const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Color attachment the edge pass draws into: a surface texture view in
/// windowed mode or a [`HeadlessTarget`] view offscreen.
#[derive(Clone, Copy)]
pub struct PresentTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

fn square_texture(
    ctx: &GpuContext,
    label: &'static str,
    resolution: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: resolution,
            height: resolution,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}

fn pick_field_format(
    supported: impl Fn(wgpu::TextureFormat) -> bool,
) -> Option<wgpu::TextureFormat> {
    FIELD_FORMATS.into_iter().find(|format| supported(*format))
}

/// Offscreen `(index / N, distance)` target written by the distance pass and
/// sampled by the edge pass.
pub struct DistanceField {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    resolution: u32,
    format: wgpu::TextureFormat,
}

impl DistanceField {
    /// Most precise two-channel float format the adapter can render into.
    pub fn select_format(ctx: &GpuContext) -> Result<wgpu::TextureFormat, RenderError> {
        pick_field_format(|format| ctx.supports_render_target(format)).ok_or_else(|| {
            RenderError::Resource(format!(
                "adapter {} cannot render to any distance field format ({FIELD_FORMATS:?})",
                ctx.adapter_name()
            ))
        })
    }

    pub(crate) fn new(ctx: &GpuContext, resolution: u32, format: wgpu::TextureFormat) -> Self {
        let texture = square_texture(
            ctx,
            "distance field",
            resolution,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        // The edge pass uses texelFetch; the sampler only satisfies the binding.
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("distance field sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
            resolution,
            format,
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub(crate) fn read_back(
        &self,
        ctx: &GpuContext,
        point_count: usize,
    ) -> Result<FieldImage, RenderError> {
        let bytes = read_texture(&ctx.device, &ctx.queue, &self.texture)?;
        let texels = decode_field_texels(self.format, &bytes)?;
        Ok(FieldImage {
            resolution: self.resolution,
            point_count,
            texels,
        })
    }
}

fn decode_field_texels(
    format: wgpu::TextureFormat,
    bytes: &[u8],
) -> Result<Vec<[f32; 2]>, RenderError> {
    match format {
        wgpu::TextureFormat::Rg32Float => Ok(bytemuck::pod_collect_to_vec(bytes)),
        wgpu::TextureFormat::Rg16Float => Ok(bytes
            .chunks_exact(4)
            .map(|texel| {
                let channel = |lo: usize| {
                    f16::from_bits(u16::from_le_bytes([texel[lo], texel[lo + 1]])).to_f32()
                };
                [channel(0), channel(2)]
            })
            .collect()),
        other => Err(RenderError::Resource(format!(
            "cannot decode distance field stored as {other:?}"
        ))),
    }
}

/// Host copy of a distance field, row-major with row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldImage {
    pub resolution: u32,
    pub point_count: usize,
    pub texels: Vec<[f32; 2]>,
}

impl FieldImage {
    /// `(index / N, distance)` at pixel `(x, y)`, or `None` outside the field.
    pub fn texel(&self, x: u32, y: u32) -> Option<[f32; 2]> {
        if x >= self.resolution || y >= self.resolution {
            return None;
        }
        let offset = y as usize * self.resolution as usize + x as usize;
        self.texels.get(offset).copied()
    }

    /// Seed index of the nearest point at pixel `(x, y)`, recovered from the
    /// normalized index channel.
    pub fn index_at(&self, x: u32, y: u32) -> Option<usize> {
        self.texel(x, y)
            .map(|[index, _]| (index * self.point_count as f32).round() as usize)
    }

    pub fn distance_at(&self, x: u32, y: u32) -> Option<f32> {
        self.texel(x, y).map(|[_, distance]| distance)
    }

    /// Index channel scaled to 8-bit grayscale.
    pub fn to_grayscale(&self) -> GrayImage {
        GrayImage::from_fn(self.resolution, self.resolution, |x, y| {
            let value = self.texel(x, y).map_or(0.0, |[index, _]| index.clamp(0.0, 1.0));
            Luma([(value * 255.0).round() as u8])
        })
    }
}

/// Offscreen presentation texture used when no window is open.
pub struct HeadlessTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl HeadlessTarget {
    pub fn new(ctx: &GpuContext, resolution: u32) -> Self {
        let texture = square_texture(
            ctx,
            "headless presentation target",
            resolution,
            HEADLESS_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn target(&self) -> PresentTarget<'_> {
        PresentTarget {
            view: &self.view,
            format: HEADLESS_FORMAT,
        }
    }

    pub fn read_rgba(&self, ctx: &GpuContext) -> Result<RgbaImage, RenderError> {
        let bytes = read_texture(&ctx.device, &ctx.queue, &self.texture)?;
        RgbaImage::from_raw(self.texture.width(), self.texture.height(), bytes).ok_or_else(|| {
            RenderError::Resource("presentation readback has the wrong size".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(point_count: usize, indices: &[usize]) -> FieldImage {
        let resolution = (indices.len() as f64).sqrt() as u32;
        FieldImage {
            resolution,
            point_count,
            texels: indices
                .iter()
                .map(|index| [*index as f32 / point_count as f32, 0.25])
                .collect(),
        }
    }

    #[test]
    fn index_is_recovered_from_normalized_channel() {
        let image = field(7, &[0, 3, 6, 5]);
        assert_eq!(image.index_at(0, 0), Some(0));
        assert_eq!(image.index_at(1, 0), Some(3));
        assert_eq!(image.index_at(0, 1), Some(6));
        assert_eq!(image.index_at(1, 1), Some(5));
        assert_eq!(image.distance_at(1, 1), Some(0.25));
    }

    #[test]
    fn lookups_outside_the_field_are_none() {
        let image = field(3, &[0, 1, 2, 1]);
        assert_eq!(image.texel(2, 0), None);
        assert_eq!(image.index_at(0, 2), None);
        assert_eq!(image.distance_at(7, 7), None);
    }

    #[test]
    fn prefers_full_precision_and_falls_back_to_half_floats() {
        use wgpu::TextureFormat;

        assert_eq!(pick_field_format(|_| true), Some(TextureFormat::Rg32Float));
        // Downlevel GL: 32-bit float targets are sample-only.
        let gl = |format: TextureFormat| format == TextureFormat::Rg16Float;
        assert_eq!(pick_field_format(gl), Some(TextureFormat::Rg16Float));
        assert_eq!(pick_field_format(|_| false), None);
    }

    #[test]
    fn half_float_texels_decode_to_f32() {
        let bytes: Vec<u8> = [f16::from_f32(0.75), f16::from_f32(1.9375)]
            .iter()
            .flat_map(|value| value.to_bits().to_le_bytes())
            .collect();
        let texels = decode_field_texels(wgpu::TextureFormat::Rg16Float, &bytes).unwrap();
        assert_eq!(texels, vec![[0.75, 1.9375]]);

        let full: Vec<u8> = bytemuck::cast_slice(&[0.5f32, 2.0]).to_vec();
        let texels = decode_field_texels(wgpu::TextureFormat::Rg32Float, &full).unwrap();
        assert_eq!(texels, vec![[0.5, 2.0]]);

        assert!(decode_field_texels(wgpu::TextureFormat::Rgba8Unorm, &bytes).is_err());
    }

    #[test]
    fn grayscale_dump_spans_index_range() {
        let image = field(2, &[0, 1, 1, 0]);
        let gray = image.to_grayscale();
        assert_eq!(gray.dimensions(), (2, 2));
        assert_eq!(gray.get_pixel(0, 0)[0], 0);
        assert_eq!(gray.get_pixel(1, 0)[0], 128);
    }
}
