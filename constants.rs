// Splat Sort Constants - SINGLE SOURCE OF TRUTH
//
// This file is included by the library (src/gpu/constants.rs) and by build.rs,
// which turns it into sort_constants.wgsl for the shaders.
//
// CRITICAL: Do NOT redefine these values in WGSL or elsewhere in the crate!

/// Radix layout of the 32-bit sort key
pub mod radix {
    /// Bits per digit (one byte per LSD pass)
    pub const DIGIT_BITS: u32 = 8;

    /// Number of distinct digit values
    pub const RADIX_SIZE: u32 = 1 << DIGIT_BITS;

    /// Mask selecting one digit after shifting
    pub const DIGIT_MASK: u32 = RADIX_SIZE - 1;

    /// Key width in bits
    pub const KEY_BITS: u32 = 32;

    /// Passes needed to sort a full key
    pub const PASS_COUNT: u32 = KEY_BITS / DIGIT_BITS;
}

/// Tile geometry
pub mod tiles {
    /// Largest tile the device kernels support (max workgroup invocations)
    pub const MAX_TILE_SIZE: u32 = 256;

    /// Smallest tile the device kernels support
    pub const MIN_DEVICE_TILE_SIZE: u32 = 32;

    /// Default entries per tile
    pub const DEFAULT_TILE_SIZE: u32 = 256;

    /// Workgroups per dispatch dimension (wgpu default limit)
    pub const MAX_WORKGROUPS_PER_DIMENSION: u32 = 65535;
}

/// Decoupled lookback status word packing
pub mod status {
    /// Flag lives in the top two bits
    pub const FLAG_SHIFT: u32 = 30;

    /// Low bits hold the published count
    pub const VALUE_MASK: u32 = (1 << FLAG_SHIFT) - 1;

    pub const FLAG_NOT_READY: u32 = 0;
    pub const FLAG_AGGREGATE: u32 = 1;
    pub const FLAG_PREFIX: u32 = 2;

    /// Largest entry count representable in a status word
    pub const MAX_ENTRY_COUNT: u32 = VALUE_MASK;

    /// Default polls of one predecessor before reading its raw aggregate
    pub const DEFAULT_SPIN_LIMIT: u32 = 64;
}

/// Generate the WGSL constants shared by every sort kernel
pub fn generate_wgsl_constants() -> String {
    format!(
        "// AUTO-GENERATED - DO NOT EDIT\n\
         // Generated from constants.rs by build.rs\n\
         const DIGIT_BITS: u32 = {}u;\n\
         const RADIX_SIZE: u32 = {}u;\n\
         const DIGIT_MASK: u32 = {}u;\n\
         const PASS_COUNT: u32 = {}u;\n\
         const STATUS_FLAG_SHIFT: u32 = {}u;\n\
         const STATUS_VALUE_MASK: u32 = {}u;\n\
         const FLAG_NOT_READY: u32 = {}u;\n\
         const FLAG_AGGREGATE: u32 = {}u;\n\
         const FLAG_PREFIX: u32 = {}u;\n",
        radix::DIGIT_BITS,
        radix::RADIX_SIZE,
        radix::DIGIT_MASK,
        radix::PASS_COUNT,
        status::FLAG_SHIFT,
        status::VALUE_MASK,
        status::FLAG_NOT_READY,
        status::FLAG_AGGREGATE,
        status::FLAG_PREFIX,
    )
}
