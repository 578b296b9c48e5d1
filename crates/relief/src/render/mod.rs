//! GPU plumbing shared by the renderer: device/surface setup and the
//! scene render pass.

pub mod gpu;
pub mod pass;

pub use gpu::GpuContext;
pub use pass::{ClearColor, begin_scene_pass};
