//! Embedded sort shaders
//!
//! Shaders are compiled into the binary and assembled by the preprocessor, so
//! nothing is resolved against the filesystem at runtime.

use crate::constants::GENERATED_WGSL;
use crate::error::SortResult;
use crate::gpu::preprocessor::WgslPreprocessor;

/// Key, status and layout helpers shared by every sort kernel
pub const SORT_COMMON_WGSL: &str = include_str!("shaders/sort_common.wgsl");

/// The sort kernels themselves
pub const SPLAT_SORT_WGSL: &str = include_str!("shaders/splat_sort.wgsl");

/// Get shader include content by name
pub fn get_shader_include(name: &str) -> Option<&'static str> {
    match name {
        "sort_constants.wgsl" => Some(GENERATED_WGSL),
        "sort_common.wgsl" => Some(SORT_COMMON_WGSL),
        _ => None,
    }
}

/// Assemble the sort shader for a given tile size
pub fn build_sort_shader(tile_size: u32) -> SortResult<String> {
    let mut preprocessor = WgslPreprocessor::new();
    for name in ["sort_constants.wgsl", "sort_common.wgsl"] {
        if let Some(source) = get_shader_include(name) {
            preprocessor.add_include(name, source);
        }
    }
    preprocessor.define("tile_size", tile_size);
    preprocessor.process(SPLAT_SORT_WGSL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_shader_assembles() {
        let source = build_sort_shader(128).unwrap();

        assert!(source.contains("const TILE_SIZE: u32 = 128u;"));
        assert!(source.contains("const RADIX_SIZE: u32 = 256u;"));
        assert!(source.contains("fn depth_to_key"));
        for entry_point in ["fn derive_keys", "fn histogram", "fn bin", "fn publish_draw_args"] {
            assert!(source.contains(entry_point), "missing {entry_point}");
        }
        assert!(!source.contains("#include"));
    }

    #[test]
    fn test_unknown_include_is_none() {
        assert!(get_shader_include("nope.wgsl").is_none());
    }
}
