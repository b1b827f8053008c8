//! GPU side of the diagram renderer.
//!
//! - `context` owns the wgpu instance/adapter/device/queue, either headless or
//!   bound to a window surface.
//! - `quad` holds the static screen-space quad both passes draw.
//! - `seeds` encodes a [`SeedSet`](crate::SeedSet) into the 1×N seed texture.
//! - `targets` allocates the distance field and the headless presentation
//!   texture, and reads textures back to the host.
//! - `uniforms` mirrors the std140 parameter blocks of both fragment shaders.
//! - `graph` orders passes by their declared input/output resources.
//! - `distance` and `edge` are the two full-screen passes.

pub(crate) mod context;
pub(crate) mod distance;
pub(crate) mod edge;
pub mod graph;
pub mod quad;
pub(crate) mod readback;
pub mod seeds;
pub mod targets;
pub(crate) mod uniforms;

pub use context::GpuContext;
pub use quad::{ScreenQuad, QUAD_INDICES, QUAD_VERTICES};
pub use seeds::SeedTexture;
pub use targets::{DistanceField, FieldImage, HeadlessTarget, PresentTarget};
