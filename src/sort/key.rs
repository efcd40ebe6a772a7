//! Depth to sort-key mapping
//!
//! IEEE-754 floats order like sign-magnitude integers. Flipping the sign bit of
//! non-negative values and inverting every bit of negative ones yields an
//! unsigned integer whose natural order matches the float order, including
//! across zero.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rayon::prelude::*;

use crate::config::SortOrder;

const SIGN_BIT: u32 = 0x8000_0000;

/// One sortable record: the depth key plus the primitive it came from
///
/// Matches the WGSL `Entry` struct byte for byte.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Entry {
    pub key: u32,
    pub index: u32,
}

impl Entry {
    pub fn new(key: u32, index: u32) -> Self {
        Self { key, index }
    }
}

/// Map a depth onto an order-preserving unsigned key
#[inline]
pub fn depth_to_key(depth: f32) -> u32 {
    let bits = depth.to_bits();
    if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits | SIGN_BIT
    }
}

/// Key for a depth under the requested draw order
#[inline]
pub fn sort_key(depth: f32, order: SortOrder) -> u32 {
    match order {
        SortOrder::Ascending => depth_to_key(depth),
        SortOrder::Descending => !depth_to_key(depth),
    }
}

/// View-space z of a world-space position
#[inline]
pub fn view_depth(view: &Mat4, position: Vec3) -> f32 {
    (*view * position.extend(1.0)).z
}

/// Build the unsorted entry list for a set of depths
pub fn entries_from_depths(depths: &[f32], order: SortOrder) -> Vec<Entry> {
    depths
        .par_iter()
        .enumerate()
        .map(|(index, &depth)| Entry::new(sort_key(depth, order), index as u32))
        .collect()
}

/// Derive entries from splat positions and the camera's view matrix
pub fn derive_entries(view: &Mat4, positions: &[Vec3], order: SortOrder, out: &mut Vec<Entry>) {
    out.clear();
    out.par_extend(
        positions
            .par_iter()
            .enumerate()
            .map(|(index, &position)| {
                Entry::new(sort_key(view_depth(view, position), order), index as u32)
            }),
    );
}
