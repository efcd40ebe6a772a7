//! Per-frame GPU depth sort for Gaussian splat rendering
//!
//! Every frame the splats are ordered by view-space depth with a stable
//! four-pass LSD radix sort on the device (one-sweep binning with decoupled
//! lookback), and the sorted entries plus an indirect draw record are handed to
//! the renderer without a host round trip.
//!
//! [`sort::HostRadixSorter`] runs the same pipeline on the CPU and is what the
//! property tests check against.

pub mod camera;
pub mod config;
pub mod constants;
pub mod error;
pub mod gpu;
pub mod renderer;
pub mod scene;
pub mod sort;

pub use camera::CameraUniforms;
pub use config::{SortConfig, SortOrder};
pub use error::{SortError, SortErrorContext, SortResult};
pub use gpu::{DrawIndirectArgs, GpuContext};
pub use renderer::{GpuPassTimer, PassInstrumentation, SortEvent, SplatSorter};
pub use scene::SplatCloud;
pub use sort::{Entry, HostRadixSorter, SortReport};
