//! GPU plumbing shared by the sort orchestrator
//!
//! Byte layouts the shaders agree on, shader assembly, device acquisition for
//! headless use, and buffer readback.

pub mod context;
pub mod layouts;
pub mod preprocessor;
pub mod readback;
pub mod shader_includes;

pub use context::GpuContext;
pub use layouts::{dispatch_grid, DrawIndirectArgs, SortUniforms};
pub use preprocessor::WgslPreprocessor;
pub use readback::{map_staging, read_buffer};
pub use shader_includes::build_sort_shader;
