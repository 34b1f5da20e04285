/// Default rolling window, in months, kept filled with materialized instances.
pub const DEFAULT_GENERATION_WINDOW_MONTHS: u32 = 12;

/// Hard cap on occurrences produced by a single rule expansion.
///
/// Expansion past this limit is treated as a validation failure rather than
/// silently truncating the series.
pub const MAX_EXPANSION_OCCURRENCES: u16 = 5000;

/// Default interval applied when a recurrence rule row stores none.
pub const DEFAULT_RECURRENCE_INTERVAL: u16 = 1;
