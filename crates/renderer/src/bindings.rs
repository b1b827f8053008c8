//! Typed parameter tables shared by host code and shader code.
//!
//! Each pass declares, once, which named parameters its shaders expose and
//! where they live (a uniform block offset or a bind group slot). The table is
//! checked against the reflected shader modules when a program is linked, so
//! a renamed uniform or a shifted binding fails loudly at link time instead of
//! silently reading zeroes at draw time.

use std::mem::{offset_of, size_of};
use std::num::NonZeroU64;

use wgpu::naga::{
    AddressSpace, Binding, ImageDimension, Module, ResourceBinding, ScalarKind, TypeInner,
    VectorSize,
};

use crate::error::RenderError;
use crate::gpu::uniforms::{DistanceUniforms, EdgeUniforms};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Float,
    Uint,
    Vec4,
    Texture2d,
    Sampler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotLocation {
    /// Member of the pass uniform block at the given byte offset.
    Uniform { offset: u32 },
    /// Standalone binding inside the pass bind group.
    Binding(u32),
}

#[derive(Debug, Clone, Copy)]
pub struct ParameterSlot {
    pub name: &'static str,
    pub kind: ParameterKind,
    pub location: SlotLocation,
}

/// Named contract between one pass and its vertex/fragment program.
#[derive(Debug)]
pub struct ParameterTable {
    pub program: &'static str,
    pub group: u32,
    pub uniform_binding: u32,
    pub uniform_size: u64,
    /// Vertex attribute carrying the quad position and its location.
    pub attribute: (&'static str, u32),
    pub slots: &'static [ParameterSlot],
}

const fn uniform(name: &'static str, kind: ParameterKind, offset: usize) -> ParameterSlot {
    ParameterSlot {
        name,
        kind,
        location: SlotLocation::Uniform {
            offset: offset as u32,
        },
    }
}

const fn binding(name: &'static str, kind: ParameterKind, slot: u32) -> ParameterSlot {
    ParameterSlot {
        name,
        kind,
        location: SlotLocation::Binding(slot),
    }
}

pub const QUAD_ATTRIBUTE: (&str, u32) = ("vertPosition", 0);

pub const DISTANCE_PARAMETERS: ParameterTable = ParameterTable {
    program: "distance pass",
    group: 0,
    uniform_binding: 0,
    uniform_size: size_of::<DistanceUniforms>() as u64,
    attribute: QUAD_ATTRIBUTE,
    slots: &[
        uniform(
            "inverseResolution",
            ParameterKind::Float,
            offset_of!(DistanceUniforms, inverse_resolution),
        ),
        uniform(
            "pointCount",
            ParameterKind::Uint,
            offset_of!(DistanceUniforms, point_count),
        ),
        uniform(
            "inversePointCount",
            ParameterKind::Float,
            offset_of!(DistanceUniforms, inverse_point_count),
        ),
        uniform(
            "metric",
            ParameterKind::Uint,
            offset_of!(DistanceUniforms, metric),
        ),
        binding("points", ParameterKind::Texture2d, 1),
        binding("pointsSampler", ParameterKind::Sampler, 2),
    ],
};

pub const EDGE_PARAMETERS: ParameterTable = ParameterTable {
    program: "edge pass",
    group: 0,
    uniform_binding: 0,
    uniform_size: size_of::<EdgeUniforms>() as u64,
    attribute: QUAD_ATTRIBUTE,
    slots: &[
        uniform(
            "edgeColor",
            ParameterKind::Vec4,
            offset_of!(EdgeUniforms, edge_color),
        ),
        uniform(
            "cellTint",
            ParameterKind::Vec4,
            offset_of!(EdgeUniforms, cell_tint),
        ),
        uniform(
            "inversePointCount",
            ParameterKind::Float,
            offset_of!(EdgeUniforms, inverse_point_count),
        ),
        uniform(
            "edgeThreshold",
            ParameterKind::Float,
            offset_of!(EdgeUniforms, edge_threshold),
        ),
        binding("pixelState", ParameterKind::Texture2d, 1),
        binding("pixelStateSampler", ParameterKind::Sampler, 2),
    ],
};

impl ParameterTable {
    /// Bind group slot of a texture or sampler parameter.
    pub fn binding_of(&self, name: &str) -> Option<u32> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .and_then(|slot| match slot.location {
                SlotLocation::Binding(index) => Some(index),
                SlotLocation::Uniform { .. } => None,
            })
    }

    pub(crate) fn required_binding(&self, name: &str) -> Result<u32, RenderError> {
        self.binding_of(name).ok_or_else(|| {
            RenderError::Resource(format!("{} has no bind group slot named `{name}`", self.program))
        })
    }

    /// Checks the reflected modules against the table and reports every
    /// mismatch in one message.
    pub fn validate(&self, vertex: &Module, fragment: &Module) -> Result<(), String> {
        let mut problems = Vec::new();
        self.check_attribute(vertex, &mut problems);
        self.check_uniform_block(fragment, &mut problems);
        for slot in self.slots {
            if let SlotLocation::Binding(index) = slot.location {
                check_resource(fragment, self.group, index, slot, &mut problems);
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("\n"))
        }
    }

    fn check_attribute(&self, vertex: &Module, problems: &mut Vec<String>) {
        let (name, location) = self.attribute;
        let Some(entry) = vertex.entry_points.iter().find(|ep| ep.name == "main") else {
            problems.push("vertex stage has no `main` entry point".to_string());
            return;
        };
        let has_location = entry.function.arguments.iter().any(|arg| {
            matches!(arg.binding, Some(Binding::Location { location: loc, .. }) if loc == location)
        });
        if !has_location {
            problems.push(format!(
                "vertex stage has no input at location {location} for `{name}`"
            ));
        }
        let named = entry
            .function
            .arguments
            .iter()
            .any(|arg| arg.name.as_deref() == Some(name))
            || vertex
                .global_variables
                .iter()
                .any(|(_, var)| var.name.as_deref() == Some(name));
        if !named {
            problems.push(format!("vertex stage does not declare attribute `{name}`"));
        }
    }

    fn check_uniform_block(&self, fragment: &Module, problems: &mut Vec<String>) {
        let expected = ResourceBinding {
            group: self.group,
            binding: self.uniform_binding,
        };
        let Some((_, block)) = fragment.global_variables.iter().find(|(_, var)| {
            var.space == AddressSpace::Uniform && var.binding.as_ref() == Some(&expected)
        }) else {
            problems.push(format!(
                "no uniform block at set {} binding {}",
                self.group, self.uniform_binding
            ));
            return;
        };

        let TypeInner::Struct { members, span } = &fragment.types[block.ty].inner else {
            problems.push("uniform binding is not a block".to_string());
            return;
        };
        if u64::from(*span) > self.uniform_size {
            problems.push(format!(
                "uniform block is {span} bytes but the host provides {}",
                self.uniform_size
            ));
        }

        for slot in self.slots {
            let SlotLocation::Uniform { offset } = slot.location else {
                continue;
            };
            let Some(member) = members
                .iter()
                .find(|member| member.name.as_deref() == Some(slot.name))
            else {
                problems.push(format!("uniform `{}` is missing", slot.name));
                continue;
            };
            if member.offset != offset {
                problems.push(format!(
                    "uniform `{}` sits at offset {} but the host writes offset {offset}",
                    slot.name, member.offset
                ));
            }
            if !kind_matches(&fragment.types[member.ty].inner, slot.kind) {
                problems.push(format!(
                    "uniform `{}` does not have type {:?}",
                    slot.name, slot.kind
                ));
            }
        }
    }

    /// Bind group layout mirroring the table.
    pub(crate) fn layout_entries(&self) -> Vec<wgpu::BindGroupLayoutEntry> {
        let mut entries = Vec::with_capacity(self.slots.len());
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: self.uniform_binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(self.uniform_size),
            },
            count: None,
        });
        for slot in self.slots {
            let SlotLocation::Binding(index) = slot.location else {
                continue;
            };
            let ty = match slot.kind {
                // Both sampled textures are 32-bit float, which is not filterable.
                ParameterKind::Texture2d => wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                ParameterKind::Sampler => {
                    wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering)
                }
                ParameterKind::Float | ParameterKind::Uint | ParameterKind::Vec4 => continue,
            };
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: index,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty,
                count: None,
            });
        }
        entries
    }
}

fn check_resource(
    fragment: &Module,
    group: u32,
    index: u32,
    slot: &ParameterSlot,
    problems: &mut Vec<String>,
) {
    let Some((_, var)) = fragment
        .global_variables
        .iter()
        .find(|(_, var)| var.name.as_deref() == Some(slot.name))
    else {
        problems.push(format!("`{}` is not declared", slot.name));
        return;
    };
    let expected = ResourceBinding {
        group,
        binding: index,
    };
    if var.binding.as_ref() != Some(&expected) {
        problems.push(format!(
            "`{}` is bound at {:?}, expected set {group} binding {index}",
            slot.name, var.binding
        ));
    }
    if !kind_matches(&fragment.types[var.ty].inner, slot.kind) {
        problems.push(format!("`{}` does not have type {:?}", slot.name, slot.kind));
    }
}

fn kind_matches(inner: &TypeInner, kind: ParameterKind) -> bool {
    match (kind, inner) {
        (ParameterKind::Float, TypeInner::Scalar(scalar)) => {
            scalar.kind == ScalarKind::Float && scalar.width == 4
        }
        (ParameterKind::Uint, TypeInner::Scalar(scalar)) => {
            scalar.kind == ScalarKind::Uint && scalar.width == 4
        }
        (ParameterKind::Vec4, TypeInner::Vector { size, scalar }) => {
            *size == VectorSize::Quad && scalar.kind == ScalarKind::Float
        }
        (
            ParameterKind::Texture2d,
            TypeInner::Image {
                dim: ImageDimension::D2,
                arrayed: false,
                ..
            },
        ) => true,
        (ParameterKind::Sampler, TypeInner::Sampler { comparison: false }) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{compile_stage, ShaderSet};
    use crate::error::ShaderStageKind;

    fn modules(fragment: &str) -> (Module, Module) {
        let shaders = ShaderSet::default();
        let vertex = compile_stage("test", ShaderStageKind::Vertex, &shaders.vertex).unwrap();
        let fragment = compile_stage("test", ShaderStageKind::Fragment, fragment).unwrap();
        (vertex.module, fragment.module)
    }

    #[test]
    fn builtin_shaders_satisfy_their_tables() {
        let shaders = ShaderSet::default();
        let (vertex, distance) = modules(&shaders.distance);
        DISTANCE_PARAMETERS.validate(&vertex, &distance).unwrap();
        let (vertex, edge) = modules(&shaders.edge);
        EDGE_PARAMETERS.validate(&vertex, &edge).unwrap();
    }

    #[test]
    fn edge_shader_does_not_satisfy_distance_table() {
        let shaders = ShaderSet::default();
        let (vertex, edge) = modules(&shaders.edge);
        let err = DISTANCE_PARAMETERS.validate(&vertex, &edge).unwrap_err();
        assert!(err.contains("points"), "{err}");
    }

    #[test]
    fn renamed_uniform_is_reported() {
        let shaders = ShaderSet::default();
        let renamed = shaders.distance.replace("inverseResolution", "invRes");
        let (vertex, distance) = modules(&renamed);
        let err = DISTANCE_PARAMETERS.validate(&vertex, &distance).unwrap_err();
        assert!(err.contains("inverseResolution"), "{err}");
    }

    #[test]
    fn layout_has_buffer_texture_and_sampler() {
        let entries = EDGE_PARAMETERS.layout_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(EDGE_PARAMETERS.binding_of("pixelState"), Some(1));
        assert_eq!(DISTANCE_PARAMETERS.binding_of("points"), Some(1));
        assert_eq!(DISTANCE_PARAMETERS.binding_of("pointCount"), None);
    }
}
