use crate::error::RenderError;

/// Rounds a tightly packed row up to the copy alignment wgpu requires.
pub(crate) fn padded_bytes_per_row(unpadded: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drops the per-row alignment padding from a mapped staging buffer.
pub(crate) fn strip_row_padding(padded: &[u8], unpadded: usize, padded_row: usize, rows: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(unpadded * rows);
    for row in 0..rows {
        let start = row * padded_row;
        out.extend_from_slice(&padded[start..start + unpadded]);
    }
    out
}

/// Copies mip 0 of `texture` into host memory, tightly packed row by row.
///
/// Submits its own command buffer and blocks until the GPU has finished, so
/// every previously submitted write to `texture` is visible in the result.
pub(crate) fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> Result<Vec<u8>, RenderError> {
    let format = texture.format();
    let texel_size = format
        .block_copy_size(None)
        .ok_or_else(|| RenderError::Resource(format!("{format:?} cannot be copied to a buffer")))?;
    let width = texture.width();
    let height = texture.height();
    let unpadded = width * texel_size;
    let padded = padded_bytes_per_row(unpadded);

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback staging"),
        size: u64::from(padded) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|err| RenderError::Resource(format!("device poll failed: {err}")))?;
    rx.recv()
        .map_err(|err| RenderError::Resource(format!("readback channel closed: {err}")))?
        .map_err(|err| RenderError::Resource(format!("failed to map readback buffer: {err}")))?;

    let bytes = {
        let mapped = slice.get_mapped_range();
        strip_row_padding(&mapped, unpadded as usize, padded as usize, height as usize)
    };
    staging.unmap();
    Ok(bytes)
}
