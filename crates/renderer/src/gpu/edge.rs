use wgpu::util::DeviceExt;

use super::context::GpuContext;
use super::graph::{RenderNode, ResourceId};
use super::quad::ScreenQuad;
use super::targets::DistanceField;
use super::uniforms::EdgeUniforms;
use crate::bindings::EDGE_PARAMETERS;
use crate::compile::LinkedProgram;
use crate::error::RenderError;
use crate::types::EdgeStyle;

/// Second pass: turns index discontinuities in the distance field into
/// boundary pixels on the visible target.
pub(crate) struct EdgePass<'a> {
    program: &'a LinkedProgram,
    quad: &'a ScreenQuad,
    target: &'a wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

impl<'a> EdgePass<'a> {
    pub fn new(
        ctx: &GpuContext,
        program: &'a LinkedProgram,
        quad: &'a ScreenQuad,
        field: &DistanceField,
        point_count: usize,
        style: &EdgeStyle,
        target: &'a wgpu::TextureView,
    ) -> Result<Self, RenderError> {
        let table = &EDGE_PARAMETERS;
        let uniforms = EdgeUniforms::new(point_count, style);
        let buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("edge pass parameters"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("edge pass bind group"),
            layout: &program.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: table.uniform_binding,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: table.required_binding("pixelState")?,
                    resource: wgpu::BindingResource::TextureView(&field.view),
                },
                wgpu::BindGroupEntry {
                    binding: table.required_binding("pixelStateSampler")?,
                    resource: wgpu::BindingResource::Sampler(&field.sampler),
                },
            ],
        });

        Ok(Self {
            program,
            quad,
            target,
            bind_group,
        })
    }
}

impl RenderNode for EdgePass<'_> {
    fn name(&self) -> &'static str {
        EDGE_PARAMETERS.program
    }

    fn inputs(&self) -> &[ResourceId] {
        &[ResourceId::DistanceField]
    }

    fn outputs(&self) -> &[ResourceId] {
        &[ResourceId::Presentation]
    }

    fn encode(&self, encoder: &mut wgpu::CommandEncoder) {
        self.quad.record(
            encoder,
            "edge pass",
            self.target,
            wgpu::Color::BLACK,
            &self.program.pipeline,
            &self.bind_group,
        );
    }
}
