//! GPU pipeline: context, buffer lifecycle, culling kernel, indirect draw.

pub mod buffers;
pub mod context;
pub mod culling;
pub mod draw;
pub mod frame_uniforms;
pub mod readback;
pub mod recovery;
pub mod renderer;

pub use buffers::{DrawIndexedIndirectArgs, GrassBuffers};
pub use context::GpuContext;
pub use culling::CullPipeline;
pub use draw::GrassDrawPipeline;
pub use recovery::{PipelineState, RecoverySchedule};
pub use renderer::GrassRenderer;
