//! Byte layouts shared between host code and the sort shaders
//!
//! Every struct here has a WGSL twin in `shaders/sort_common.wgsl`; the size
//! checks at the bottom keep the two from drifting apart.

use bytemuck::{Pod, Zeroable};

use crate::config::{SortConfig, SortOrder};

/// Indirect draw record consumed by `draw_indirect`
///
/// This matches wgpu's DrawIndirect command layout.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndirectArgs {
    /// Vertices per splat quad
    pub vertex_count: u32,

    /// Number of splats to draw, written on the device after sorting
    pub instance_count: u32,

    pub first_vertex: u32,
    pub first_instance: u32,
}

impl DrawIndirectArgs {
    /// Byte offset of `instance_count` inside the record
    pub const INSTANCE_COUNT_OFFSET: u64 = 4;

    pub fn new(vertex_count: u32, instance_count: u32) -> Self {
        Self {
            vertex_count,
            instance_count,
            first_vertex: 0,
            first_instance: 0,
        }
    }
}

/// Per-pass parameters, one uniform buffer per digit pass
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SortUniforms {
    /// Digit pass this bind group runs (0 = lowest byte)
    pub pass_index: u32,

    pub entry_count: u32,
    pub tile_count: u32,

    /// Workgroups along x of the dispatch grid
    pub tile_columns: u32,

    /// Floats per splat record in the scene buffer
    pub splat_stride: u32,

    /// Non-zero when keys are bit-inverted for descending order
    pub descending: u32,

    pub spin_limit: u32,
    pub _padding: u32,
}

impl SortUniforms {
    pub fn new(
        pass_index: u32,
        entry_count: u32,
        tile_count: u32,
        tile_columns: u32,
        splat_stride: u32,
        config: &SortConfig,
    ) -> Self {
        Self {
            pass_index,
            entry_count,
            tile_count,
            tile_columns,
            splat_stride,
            descending: (config.order == SortOrder::Descending) as u32,
            spin_limit: config.lookback_spin_limit,
            _padding: 0,
        }
    }
}

/// Workgroup grid covering `tiles` tiles without exceeding the per-dimension limit
pub fn dispatch_grid(tiles: u32, max_per_dimension: u32) -> (u32, u32) {
    if tiles == 0 {
        return (0, 0);
    }
    let columns = tiles.min(max_per_dimension);
    (columns, tiles.div_ceil(columns))
}
