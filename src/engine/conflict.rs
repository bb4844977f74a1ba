use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::EngineError;

/// Two same-day windows conflict iff `s1 < e2 && e1 > s2`.
pub fn conflicts(a: &Span, b: &Span) -> bool {
    a.overlaps(b)
}

/// True if `occ` is the reservation made for appointment `appt_id`.
pub(crate) fn belongs_to_appointment(occ: &Occupancy, appt_id: Ulid) -> bool {
    occ.source_kind == SourceKind::Appointment && occ.source_ref == appt_id
}

/// Active occupancies on `bay_id` for `date`, minus the excluded appointment's own.
pub(crate) fn blocking_occupancies<'a>(
    occupancies: &'a [Occupancy],
    bay_id: Ulid,
    date: NaiveDate,
    exclude_appt: Option<Ulid>,
) -> impl Iterator<Item = &'a Occupancy> {
    occupancies.iter().filter(move |o| {
        o.bay_id == bay_id
            && o.start_date == date
            && o.blocks()
            && !exclude_appt.is_some_and(|appt| belongs_to_appointment(o, appt))
    })
}

pub(crate) fn check_no_conflict(
    occupancies: &[Occupancy],
    bay_id: Ulid,
    date: NaiveDate,
    span: &Span,
    exclude_appt: Option<Ulid>,
) -> Result<(), EngineError> {
    match blocking_occupancies(occupancies, bay_id, date, exclude_appt)
        .find(|o| conflicts(&o.span, span))
    {
        Some(o) => Err(EngineError::Conflict(o.id)),
        None => Ok(()),
    }
}
