//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep the three kinds of 64/32-bit identities a
//! timer record carries apart: a thread id is never a timeline hash.

use std::fmt;

/// Thread ID as reported by the capture backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub i32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

/// Hash of a GPU timeline name ("gfx", "sdma0", ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimelineHash(pub u64);

impl fmt::Display for TimelineHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TIMELINE:{:#018x}", self.0)
    }
}

/// Absolute address of an instrumented function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionAddress(pub u64);

impl fmt::Display for FunctionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        assert_eq!(ThreadId(42).to_string(), "TID:42");
        assert_eq!(FunctionAddress(0x1000).to_string(), "0x1000");
        assert_eq!(TimelineHash(1).to_string(), "TIMELINE:0x0000000000000001");
    }
}
