/// Upper bound on configured slots.
pub const MAX_SLOTS: usize = 10_000;

pub const MAX_SLOT_ID_LEN: usize = 32;

/// Used when a reservation request omits a duration or sends a non-positive one.
pub const DEFAULT_RESERVATION_MINUTES: i64 = 20;

/// One day.
pub const MAX_RESERVATION_MINUTES: i64 = 24 * 60;

pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 5_000;
