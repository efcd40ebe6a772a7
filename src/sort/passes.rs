//! Ping-pong buffer roles
//!
//! The buffer a pass reads and the buffer it writes follow from the pass index
//! alone. Even passes read A and write B, odd passes read B and write A, so
//! after the four passes of a 32-bit key the result is back in A.

use crate::constants::PASS_COUNT;

/// One of the two equally sized entry buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    A,
    B,
}

impl BufferRole {
    /// Pick the matching item of an (A, B) pair
    #[inline]
    pub fn select<'a, T: ?Sized>(self, a: &'a T, b: &'a T) -> &'a T {
        match self {
            BufferRole::A => a,
            BufferRole::B => b,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BufferRole::A => "Entry Buffer A",
            BufferRole::B => "Entry Buffer B",
        }
    }
}

/// Source and destination of one digit pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassBuffers {
    pub source: BufferRole,
    pub destination: BufferRole,
}

#[inline]
pub fn pass_buffers(pass: u32) -> PassBuffers {
    debug_assert!(pass < PASS_COUNT, "pass index {pass} out of range");
    if pass % 2 == 0 {
        PassBuffers {
            source: BufferRole::A,
            destination: BufferRole::B,
        }
    } else {
        PassBuffers {
            source: BufferRole::B,
            destination: BufferRole::A,
        }
    }
}

/// Buffer holding valid data once `passes` passes have run
#[inline]
pub fn final_buffer(passes: u32) -> BufferRole {
    if passes % 2 == 0 {
        BufferRole::A
    } else {
        BufferRole::B
    }
}
