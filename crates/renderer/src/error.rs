use std::fmt;

use crate::gpu::graph::GraphError;

/// Pipeline stage a shader source is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStageKind {
    Vertex,
    Fragment,
}

impl ShaderStageKind {
    pub(crate) fn naga_stage(self) -> wgpu::naga::ShaderStage {
        match self {
            ShaderStageKind::Vertex => wgpu::naga::ShaderStage::Vertex,
            ShaderStageKind::Fragment => wgpu::naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStageKind::Vertex => f.write_str("vertex"),
            ShaderStageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Every way a render invocation can fail. None of them are recovered
/// locally; the render is aborted and the diagnostic surfaces to the caller.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{program}: {stage} shader failed to compile:\n{log}")]
    ShaderCompile {
        program: &'static str,
        stage: ShaderStageKind,
        log: String,
    },
    #[error("{program}: program failed to link:\n{log}")]
    ProgramLink { program: &'static str, log: String },
    #[error("GPU resource error: {0}")]
    Resource(String),
    #[error("no usable GPU adapter: {0}")]
    Adapter(String),
    #[error("render graph rejected: {0}")]
    Graph(#[from] GraphError),
    #[error("invalid render configuration: {0}")]
    InvalidConfig(String),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

impl RenderError {
    /// Stage that failed to compile, if this is a compile error.
    pub fn failed_stage(&self) -> Option<ShaderStageKind> {
        match self {
            RenderError::ShaderCompile { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
