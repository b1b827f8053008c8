use std::borrow::Cow;
use std::collections::BTreeSet;

use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::{Binding, Handle, Module, ShaderStage, Type, TypeInner};

use crate::bindings::ParameterTable;
use crate::error::{RenderError, ShaderStageKind};
use crate::gpu::quad::ScreenQuad;

/// Pass-through vertex shader shared by both passes.
pub const VERTEX_SHADER_GLSL: &str = include_str!("../shaders/fullscreen.vert");
/// Nearest-seed search written into the distance field.
pub const DISTANCE_SHADER_GLSL: &str = include_str!("../shaders/distance.frag");
/// Boundary detection over the distance field.
pub const EDGE_SHADER_GLSL: &str = include_str!("../shaders/edge.frag");

/// GLSL sources for one render. Defaults to the shaders bundled with the
/// crate; callers may swap any of them for their own text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSet {
    pub vertex: Cow<'static, str>,
    pub distance: Cow<'static, str>,
    pub edge: Cow<'static, str>,
}

impl Default for ShaderSet {
    fn default() -> Self {
        Self {
            vertex: Cow::Borrowed(VERTEX_SHADER_GLSL),
            distance: Cow::Borrowed(DISTANCE_SHADER_GLSL),
            edge: Cow::Borrowed(EDGE_SHADER_GLSL),
        }
    }
}

/// A stage that parsed and validated cleanly, kept around for reflection.
pub struct CompiledStage {
    pub stage: ShaderStageKind,
    pub module: Module,
}

/// Parses and validates one GLSL stage on the CPU.
///
/// No device is needed, so broken sources are rejected before any GPU object
/// exists. The error log is naga's rendered diagnostic, source excerpt included.
pub fn compile_stage(
    program: &'static str,
    stage: ShaderStageKind,
    source: &str,
) -> Result<CompiledStage, RenderError> {
    let mut frontend = glsl::Frontend::default();
    let options = glsl::Options::from(stage.naga_stage());
    let module = frontend
        .parse(&options, source)
        .map_err(|errors| RenderError::ShaderCompile {
            program,
            stage,
            log: errors.emit_to_string(source),
        })?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|error| RenderError::ShaderCompile {
            program,
            stage,
            log: error.emit_to_string(source),
        })?;

    Ok(CompiledStage { stage, module })
}

/// Compiles both stages and performs every link check that does not need a
/// device: stage interface matching and the parameter table.
pub fn check_program(
    table: &ParameterTable,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<(CompiledStage, CompiledStage), RenderError> {
    let vertex = compile_stage(table.program, ShaderStageKind::Vertex, vertex_source)?;
    let fragment = compile_stage(table.program, ShaderStageKind::Fragment, fragment_source)?;

    let outputs = stage_locations(&vertex.module, ShaderStage::Vertex, Direction::Output);
    let inputs = stage_locations(&fragment.module, ShaderStage::Fragment, Direction::Input);
    let missing: Vec<String> = inputs
        .difference(&outputs)
        .map(|location| location.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RenderError::ProgramLink {
            program: table.program,
            log: format!(
                "fragment inputs at location(s) {} are not written by the vertex stage",
                missing.join(", ")
            ),
        });
    }

    if !stage_locations(&fragment.module, ShaderStage::Fragment, Direction::Output).contains(&0)
    {
        return Err(RenderError::ProgramLink {
            program: table.program,
            log: "fragment stage does not write a colour at location 0".to_string(),
        });
    }

    table
        .validate(&vertex.module, &fragment.module)
        .map_err(|log| RenderError::ProgramLink {
            program: table.program,
            log,
        })?;

    Ok((vertex, fragment))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

fn stage_locations(module: &Module, stage: ShaderStage, direction: Direction) -> BTreeSet<u32> {
    let mut locations = BTreeSet::new();
    let Some(entry) = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage && ep.name == "main")
    else {
        return locations;
    };

    let mut collect = |ty: Handle<Type>, binding: Option<&Binding>| match binding {
        Some(Binding::Location { location, .. }) => {
            locations.insert(*location);
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    if let Some(Binding::Location { location, .. }) = &member.binding {
                        locations.insert(*location);
                    }
                }
            }
        }
    };

    match direction {
        Direction::Input => {
            for argument in &entry.function.arguments {
                collect(argument.ty, argument.binding.as_ref());
            }
        }
        Direction::Output => {
            if let Some(result) = &entry.function.result {
                collect(result.ty, result.binding.as_ref());
            }
        }
    }
    locations
}

/// A linked program: the render pipeline plus the bind group layout its
/// parameter table describes.
pub(crate) struct LinkedProgram {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Links a vertex+fragment pair that already passed [`check_program`] into a
/// pipeline that renders the screen quad into `target_format`.
///
/// Errors raised by the device carry the driver's message as
/// [`RenderError::ProgramLink`].
pub(crate) fn link_program(
    device: &wgpu::Device,
    table: &ParameterTable,
    vertex_source: &str,
    fragment_source: &str,
    target_format: wgpu::TextureFormat,
) -> Result<LinkedProgram, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(table.program),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(vertex_source.to_owned()),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    });
    let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(table.program),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(fragment_source.to_owned()),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(table.program),
        entries: &table.layout_entries(),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(table.program),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(table.program),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &vertex_module,
            entry_point: Some("main"),
            buffers: &[ScreenQuad::vertex_layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });

    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(RenderError::ProgramLink {
            program: table.program,
            log: error.to_string(),
        });
    }

    tracing::debug!(program = table.program, ?target_format, "linked shader program");

    Ok(LinkedProgram {
        pipeline,
        bind_group_layout,
    })
}
