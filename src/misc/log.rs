/*!
Miscellaneous items related to [logging](log).

Calls to the log macro are made throughout the library.
These are intended to provide useful information for extending the library and/or fixing issues.

Note, no log implementation is provided.
For more details, see [log].
*/

/// Targets to be used within a [log]! macro.
pub mod targets {
    /// Logs related to the [transform pipeline](crate::transform).
    pub const TRANSFORM: &str = "transform";

    /// Logs related to the [semantic checker](crate::checks).
    pub const CHECKS: &str = "checks";

    /// Logs related to [type analysis](crate::analysis::typing).
    pub const TYPING: &str = "typing";

    /// Logs related to the [precedence graph](crate::analysis::precedence) and scheduling.
    pub const PRECEDENCE: &str = "precedence";

    /// Logs related to [lowering](crate::translate).
    pub const TRANSLATE: &str = "translate";

    /// Logs related to the [magic-set transform](crate::transform::magic).
    pub const MAGIC: &str = "magic";

    /// Logs related to [relation inlining](crate::transform::inline).
    pub const INLINE: &str = "inline";
}
