pub mod indirect_draw;
pub mod pass_timer;
pub mod sort_buffers;
pub mod splat_sorter;

pub use indirect_draw::IndirectDrawBuffer;
pub use pass_timer::{EventTiming, GpuPassTimer, PassInstrumentation, SortEvent};
pub use sort_buffers::{SortBufferSizes, SortBuffers};
pub use splat_sorter::SplatSorter;
