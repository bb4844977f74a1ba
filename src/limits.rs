use crate::model::Minutes;

// ── Business window ──────────────────────────────────────────────

pub const OPEN: Minutes = 8 * 60;
pub const CLOSE: Minutes = 18 * 60;
pub const LUNCH_START: Minutes = 12 * 60;
pub const LUNCH_END: Minutes = 13 * 60 + 30;

/// Default grid for `business_slots`.
pub const SLOT_STEP_MINUTES: Minutes = 15;

/// End of the day; reservations never cross midnight.
pub const DAY_END: Minutes = 24 * 60;

// ── Input bounds ─────────────────────────────────────────────────

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_LABEL_LEN: usize = 1024;
pub const MAX_BAYS: usize = 512;

/// Largest journal payload; a longer length prefix marks a corrupt record.
pub const MAX_RECORD_LEN: usize = 1 << 20;
