use wgpu::util::DeviceExt;

use super::context::GpuContext;
use super::graph::{RenderNode, ResourceId};
use super::quad::ScreenQuad;
use super::seeds::SeedTexture;
use super::targets::DistanceField;
use super::uniforms::DistanceUniforms;
use crate::bindings::DISTANCE_PARAMETERS;
use crate::compile::LinkedProgram;
use crate::error::RenderError;
use crate::types::DistanceMetric;

/// First pass: writes `(closest index / N, distance)` for every pixel of the
/// distance field.
pub(crate) struct DistancePass<'a> {
    program: &'a LinkedProgram,
    quad: &'a ScreenQuad,
    target: &'a wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

impl<'a> DistancePass<'a> {
    pub fn new(
        ctx: &GpuContext,
        program: &'a LinkedProgram,
        quad: &'a ScreenQuad,
        seeds: &SeedTexture,
        field: &'a DistanceField,
        metric: DistanceMetric,
    ) -> Result<Self, RenderError> {
        let table = &DISTANCE_PARAMETERS;
        let uniforms =
            DistanceUniforms::new(field.resolution(), seeds.width() as usize, metric);
        let buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("distance pass parameters"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("distance pass bind group"),
            layout: &program.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: table.uniform_binding,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: table.required_binding("points")?,
                    resource: wgpu::BindingResource::TextureView(&seeds.view),
                },
                wgpu::BindGroupEntry {
                    binding: table.required_binding("pointsSampler")?,
                    resource: wgpu::BindingResource::Sampler(&seeds.sampler),
                },
            ],
        });

        Ok(Self {
            program,
            quad,
            target: &field.view,
            bind_group,
        })
    }
}

impl RenderNode for DistancePass<'_> {
    fn name(&self) -> &'static str {
        DISTANCE_PARAMETERS.program
    }

    fn inputs(&self) -> &[ResourceId] {
        &[ResourceId::SeedTexture]
    }

    fn outputs(&self) -> &[ResourceId] {
        &[ResourceId::DistanceField]
    }

    fn encode(&self, encoder: &mut wgpu::CommandEncoder) {
        self.quad.record(
            encoder,
            "distance pass",
            self.target,
            wgpu::Color::TRANSPARENT,
            &self.program.pipeline,
            &self.bind_group,
        );
    }
}
