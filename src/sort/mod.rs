/// Depth sort engine, host side
///
/// Key derivation, per-tile histograms, the decoupled lookback scan and the
/// ping-pong pass schedule, shared by the device orchestrator and by
/// `HostRadixSorter`, which executes the whole pipeline on the CPU.

pub mod histogram;
pub mod host_sorter;
pub mod key;
pub mod lookback;
pub mod passes;

#[cfg(test)]
mod tests;

pub use histogram::{digit_of, tile_count, TileHistogram};
pub use host_sorter::{HostRadixSorter, PassReport, SortReport};
pub use key::{depth_to_key, derive_entries, entries_from_depths, sort_key, view_depth, Entry};
pub use lookback::{LookbackScanner, LookbackStats, StatusBoard, StatusTable, TileStatus};
pub use passes::{final_buffer, pass_buffers, BufferRole, PassBuffers};
