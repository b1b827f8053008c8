use bytemuck::{Pod, Zeroable};

use crate::types::{DistanceMetric, EdgeStyle};

/// Host mirror of the `DistanceParams` std140 block in `distance.frag`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct DistanceUniforms {
    pub inverse_resolution: f32,
    pub point_count: u32,
    pub inverse_point_count: f32,
    pub metric: u32,
}

impl DistanceUniforms {
    pub fn new(resolution: u32, point_count: usize, metric: DistanceMetric) -> Self {
        Self {
            inverse_resolution: 1.0 / resolution.max(1) as f32,
            point_count: point_count as u32,
            inverse_point_count: 1.0 / point_count.max(1) as f32,
            metric: metric.shader_code(),
        }
    }
}

/// Host mirror of the `EdgeParams` std140 block in `edge.frag`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct EdgeUniforms {
    pub edge_color: [f32; 4],
    pub cell_tint: [f32; 4],
    pub inverse_point_count: f32,
    pub edge_threshold: f32,
    pub padding: [f32; 2],
}

impl EdgeUniforms {
    pub fn new(point_count: usize, style: &EdgeStyle) -> Self {
        Self {
            edge_color: style.color,
            cell_tint: style.cell_tint,
            inverse_point_count: 1.0 / point_count.max(1) as f32,
            edge_threshold: style.threshold,
            padding: [0.0; 2],
        }
    }
}
