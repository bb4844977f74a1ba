use chrono::NaiveDate;
use tracing::debug;
use ulid::Ulid;

use crate::clock::business_spans;
use crate::model::*;

use super::allocation::derive_preferred_type;
use super::conflict::conflicts;
use super::Engine;

impl Engine {
    /// Start times on `date` where a `duration`-minute service of this label can
    /// still get a bay.
    ///
    /// Each business slot goes through three gates:
    /// 1. on today's date, slots starting at or before now are dropped;
    /// 2. if the other appointments overlapping the slot already number as many as
    ///    the compatible bays, it is dropped without consulting the ledger;
    /// 3. otherwise the slot is kept iff the resolver finds a free bay.
    ///
    /// Past dates have no slots.
    pub fn available_slots(
        &self,
        date: NaiveDate,
        duration: Minutes,
        service_label: &str,
        exclude_appt: Option<Ulid>,
    ) -> Vec<TimeSlot> {
        metrics::counter!(crate::observability::SLOT_QUERIES_TOTAL).increment(1);

        let today = self.clock.today();
        if date < today {
            return Vec::new();
        }
        let now = self.clock.minutes_now();
        let preferred = derive_preferred_type(service_label);
        let capacity = self.compatible_bay_count(preferred);
        if capacity == 0 {
            return Vec::new();
        }

        let same_day: Vec<Span> = self
            .appointments
            .iter()
            .filter(|a| a.date == date && exclude_appt != Some(a.id))
            .filter_map(|a| a.window())
            .collect();

        let mut slots = Vec::new();
        for span in business_spans(duration) {
            if date == today && span.start <= now {
                continue;
            }

            let overlapping = same_day.iter().filter(|w| conflicts(w, &span)).count();
            if overlapping >= capacity {
                metrics::counter!(crate::observability::SLOT_PREFILTER_REJECTS_TOTAL).increment(1);
                debug!(
                    "slot {}-{} on {date}: {overlapping} appointments >= {capacity} bays",
                    span.start, span.end
                );
                continue;
            }

            let free = self.free_bays(date, span, preferred, exclude_appt).len();
            if free > 0 {
                slots.push(TimeSlot { span, free_bays: free });
            }
        }
        slots
    }
}
