//! Device buffers owned by the splat sorter
//!
//! Everything is sized once per scene load from the entry count and tile size.
//! Zero-sized bindings are not allowed, so an empty scene still gets one slot.

use crate::constants::RADIX_SIZE;
use crate::error::{SortError, SortResult};
use crate::sort::histogram::tile_count;
use crate::sort::key::Entry;
use crate::sort::passes::BufferRole;

pub struct SortBuffers {
    pub entries_a: wgpu::Buffer,
    pub entries_b: wgpu::Buffer,

    /// Per-tile digit counts for the current pass, tile-major
    pub tile_histograms: wgpu::Buffer,

    /// Lookback status words, one per (tile, digit)
    pub status: wgpu::Buffer,

    /// Global per-digit counts for the current pass
    pub digit_totals: wgpu::Buffer,

    tile_count: u32,
}

/// Byte sizes of every sort buffer for a given scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortBufferSizes {
    pub entries: u64,
    pub tile_table: u64,
    pub digit_totals: u64,
}

impl SortBufferSizes {
    pub fn new(entry_count: u32, tile_size: u32) -> Self {
        let tiles = tile_count(entry_count as usize, tile_size as usize).max(1) as u64;
        let word = std::mem::size_of::<u32>() as u64;

        Self {
            entries: (entry_count.max(1) as u64) * std::mem::size_of::<Entry>() as u64,
            tile_table: tiles * RADIX_SIZE as u64 * word,
            digit_totals: RADIX_SIZE as u64 * word,
        }
    }

    /// Total bytes allocated by one sorter
    pub fn total(&self) -> u64 {
        2 * self.entries + 2 * self.tile_table + self.digit_totals
    }

    /// Reject sizes the device cannot allocate or bind
    pub fn check_limits(&self, limits: &wgpu::Limits) -> SortResult<()> {
        let limit = limits
            .max_buffer_size
            .min(limits.max_storage_buffer_binding_size as u64);

        let checks: [(&'static str, u64); 3] = [
            (BufferRole::A.label(), self.entries),
            ("Tile Histogram Buffer", self.tile_table),
            ("Lookback Status Buffer", self.tile_table),
        ];

        for (label, requested) in checks {
            if requested > limit {
                return Err(SortError::BufferTooLarge {
                    label,
                    requested,
                    limit,
                });
            }
        }
        Ok(())
    }
}

impl SortBuffers {
    /// Allocate every buffer, surfacing device memory exhaustion as an error
    pub async fn new(device: &wgpu::Device, entry_count: u32, tile_size: u32) -> SortResult<Self> {
        let sizes = SortBufferSizes::new(entry_count, tile_size);
        sizes.check_limits(&device.limits())?;

        log::debug!(
            "[SortBuffers] Allocating {} KB for {} entries",
            sizes.total() / 1024,
            entry_count
        );

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let storage = |label: &'static str, size: u64, extra: wgpu::BufferUsages| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::STORAGE | extra,
                mapped_at_creation: false,
            })
        };

        let copy = wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST;
        let entries_a = storage(BufferRole::A.label(), sizes.entries, copy);
        let entries_b = storage(BufferRole::B.label(), sizes.entries, copy);
        let tile_histograms = storage("Tile Histogram Buffer", sizes.tile_table, copy);
        let status = storage("Lookback Status Buffer", sizes.tile_table, wgpu::BufferUsages::COPY_DST);
        let digit_totals = storage("Digit Totals Buffer", sizes.digit_totals, copy);

        if let Some(error) = device.pop_error_scope().await {
            for buffer in [&entries_a, &entries_b, &tile_histograms, &status, &digit_totals] {
                buffer.destroy();
            }
            log::error!("[SortBuffers] Allocation failed: {}", error);
            return Err(SortError::OutOfDeviceMemory(error.to_string()));
        }

        Ok(Self {
            entries_a,
            entries_b,
            tile_histograms,
            status,
            digit_totals,
            tile_count: tile_count(entry_count as usize, tile_size as usize) as u32,
        })
    }

    pub fn entries(&self, role: BufferRole) -> &wgpu::Buffer {
        role.select(&self.entries_a, &self.entries_b)
    }

    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }

    /// Zero the per-pass scratch state
    ///
    /// Tile histogram rows are rewritten in full by every histogram dispatch,
    /// so only the lookback status and the digit totals need clearing.
    pub fn clear_pass_state(&self, encoder: &mut wgpu::CommandEncoder) {
        for buffer in self.pass_scratch() {
            encoder.clear_buffer(buffer, 0, None);
        }
    }

    /// Buffers accumulated into during a pass
    fn pass_scratch(&self) -> [&wgpu::Buffer; 2] {
        [&self.status, &self.digit_totals]
    }

    pub fn destroy(&self) {
        self.entries_a.destroy();
        self.entries_b.destroy();
        self.tile_histograms.destroy();
        self.status.destroy();
        self.digit_totals.destroy();
    }
}
