use std::time::Instant;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::conflict::check_no_conflict;
use super::Engine;

// ── Free-bay resolution ───────────────────────────────────────────

/// Bays with no active occupancy overlapping `span` on `date`, in the order given.
///
/// Only active bays are considered. A `preferred` type is a strict filter: bays of
/// the other type are never offered as a fallback. Occupancies created for
/// `exclude_appt` are ignored so an appointment being edited does not collide
/// with its own reservation.
///
/// Reservations are single-day; `date` is the day of the window's start.
pub fn resolve_free_bays<'a>(
    bays: &'a [Bay],
    occupancies: &[Occupancy],
    date: NaiveDate,
    span: &Span,
    preferred: Option<BayType>,
    exclude_appt: Option<Ulid>,
) -> Vec<&'a Bay> {
    bays.iter()
        .filter(|b| b.active)
        .filter(|b| preferred.is_none_or(|t| b.bay_type == t))
        .filter(|b| check_no_conflict(occupancies, b.id, date, span, exclude_appt).is_ok())
        .collect()
}

impl Engine {
    /// Registry-ordered free bays for the window. Empty means fully booked.
    pub fn free_bays(
        &self,
        date: NaiveDate,
        span: Span,
        preferred: Option<BayType>,
        exclude_appt: Option<Ulid>,
    ) -> Vec<&Bay> {
        let start = Instant::now();
        let free = resolve_free_bays(
            self.bays.as_slice(),
            self.occupancies.as_slice(),
            date,
            &span,
            preferred,
            exclude_appt,
        );
        metrics::histogram!(crate::observability::FREE_BAYS_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
        free
    }
}
