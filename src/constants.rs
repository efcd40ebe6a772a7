//! Radix and status-packing constants shared by host code and shaders
//!
//! The values live in the crate-root `constants.rs`, which build.rs also turns
//! into `sort_constants.wgsl`.

include!("../constants.rs");

pub use self::radix::{DIGIT_BITS, DIGIT_MASK, PASS_COUNT, RADIX_SIZE};

/// The generated WGSL constants, as compiled into the shaders
pub const GENERATED_WGSL: &str = include_str!(concat!(env!("OUT_DIR"), "/sort_constants.wgsl"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_wgsl_matches_rust_constants() {
        assert_eq!(GENERATED_WGSL, generate_wgsl_constants());
        assert!(GENERATED_WGSL.contains("const RADIX_SIZE: u32 = 256u;"));
        assert!(GENERATED_WGSL.contains("const STATUS_FLAG_SHIFT: u32 = 30u;"));
    }

    #[test]
    fn test_radix_layout_covers_key() {
        assert_eq!(DIGIT_BITS * PASS_COUNT, radix::KEY_BITS);
        assert_eq!(RADIX_SIZE, 256);
        assert_eq!(PASS_COUNT % 2, 0, "final data must land back in the first buffer");
    }

    #[test]
    fn test_status_flags_fit_above_value() {
        assert!(status::FLAG_PREFIX < (1 << (32 - status::FLAG_SHIFT)));
        assert_eq!(status::MAX_ENTRY_COUNT, (1 << 30) - 1);
    }
}
