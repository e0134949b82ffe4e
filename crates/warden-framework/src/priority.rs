//! Priority constants.
//!
//! Listeners, filters and interceptors are ordered by an `i32` priority:
//! smaller values run first, ties keep registration order.

/// Well-known priority values.
pub struct Priority;

impl Priority {
    /// Runs before everything else.
    pub const HIGHEST: i32 = i32::MIN;
    /// Runs before normal entries.
    pub const HIGH: i32 = -100;
    /// The default for listeners and interceptors.
    pub const NORMAL: i32 = 0;
    /// Runs after normal entries.
    pub const LOW: i32 = 100;
    /// Runs after everything else. The default for filters inside a group.
    pub const LOWEST: i32 = i32::MAX;
}
