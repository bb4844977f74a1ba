use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Minutes since local midnight in the business timezone.
pub type Minutes = u32;

/// Half-open interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Minutes,
    pub end: Minutes,
}

impl Span {
    pub fn new(start: Minutes, end: Minutes) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Build `[start, start + duration)`, or `None` for an empty or past-midnight window.
    pub fn starting_at(start: Minutes, duration: Minutes) -> Option<Self> {
        let end = start.checked_add(duration)?;
        if duration == 0 || end > crate::limits::DAY_END {
            return None;
        }
        Some(Self { start, end })
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

// ── Bays ─────────────────────────────────────────────────────────

/// Category of a work bay. Services are steered to a type by keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BayType {
    WashBay,
    GeneralService,
}

impl BayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BayType::WashBay => "washBay",
            BayType::GeneralService => "generalService",
        }
    }
}

impl fmt::Display for BayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BayType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "washBay" | "wash" => Ok(BayType::WashBay),
            "generalService" | "general" => Ok(BayType::GeneralService),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bay {
    pub id: Ulid,
    pub name: String,
    pub bay_type: BayType,
    pub partner_id: Option<Ulid>,
    pub partner_name: Option<String>,
    pub active: bool,
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBay {
    pub name: String,
    pub bay_type: BayType,
    pub partner_id: Option<Ulid>,
    pub partner_name: Option<String>,
    pub color: Option<String>,
}

impl NewBay {
    pub fn new(name: impl Into<String>, bay_type: BayType) -> Self {
        Self {
            name: name.into(),
            bay_type,
            partner_id: None,
            partner_name: None,
            color: None,
        }
    }
}

/// Partial update: `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct BayPatch {
    pub name: Option<String>,
    pub bay_type: Option<BayType>,
    pub partner_id: Option<Option<Ulid>>,
    pub partner_name: Option<Option<String>>,
    pub active: Option<bool>,
    pub color: Option<Option<String>>,
}

impl BayPatch {
    pub fn apply(self, bay: &mut Bay) {
        if let Some(name) = self.name {
            bay.name = name;
        }
        if let Some(bay_type) = self.bay_type {
            bay.bay_type = bay_type;
        }
        if let Some(partner_id) = self.partner_id {
            bay.partner_id = partner_id;
        }
        if let Some(partner_name) = self.partner_name {
            bay.partner_name = partner_name;
        }
        if let Some(active) = self.active {
            bay.active = active;
        }
        if let Some(color) = self.color {
            bay.color = color;
        }
    }
}

// ── Occupancies ──────────────────────────────────────────────────

/// What an occupancy was reserved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    Appointment,
    ServiceOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OccupancyStatus {
    Scheduled,
    InUse,
    Completed,
    Cancelled,
}

impl OccupancyStatus {
    /// Only scheduled and in-use occupancies block a bay.
    pub fn is_active(&self) -> bool {
        matches!(self, OccupancyStatus::Scheduled | OccupancyStatus::InUse)
    }

    /// The forward lifecycle: scheduled → inUse → completed, or either active state → cancelled.
    /// Re-applying the current status is also allowed.
    pub fn is_forward_transition(&self, to: OccupancyStatus) -> bool {
        use OccupancyStatus::*;
        matches!(
            (self, to),
            (Scheduled, Scheduled)
                | (Scheduled, InUse)
                | (Scheduled, Cancelled)
                | (InUse, InUse)
                | (InUse, Completed)
                | (InUse, Cancelled)
                | (Completed, Completed)
                | (Cancelled, Cancelled)
        )
    }
}

/// A time-ranged reservation of a bay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupancy {
    pub id: Ulid,
    pub bay_id: Ulid,
    pub bay_name: String,
    pub source_ref: Ulid,
    pub source_kind: SourceKind,
    pub client_name: String,
    pub vehicle_label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub span: Span,
    pub status: OccupancyStatus,
}

impl Occupancy {
    pub fn blocks(&self) -> bool {
        self.status.is_active()
    }
}

/// Occupancy fields supplied by the caller; id and status are assigned by the ledger.
#[derive(Debug, Clone)]
pub struct NewOccupancy {
    pub bay_id: Ulid,
    pub bay_name: String,
    pub source_ref: Ulid,
    pub source_kind: SourceKind,
    pub client_name: String,
    pub vehicle_label: String,
    pub date: NaiveDate,
    pub span: Span,
}

// ── Appointments ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OriginTag {
    Internal,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Ulid,
    pub title: String,
    pub plate: String,
    pub responsible_id: Option<Ulid>,
    pub client_name: String,
    pub phone: String,
    pub service_type: String,
    pub origin: OriginTag,
    pub date: NaiveDate,
    pub time: Minutes,
    pub duration_minutes: Minutes,
    pub bay_id: Option<Ulid>,
    pub bay_name: Option<String>,
    pub client_ref: Option<Ulid>,
    pub payment_terms: Option<String>,
    pub payment_method: Option<String>,
}

impl Appointment {
    /// The booked window, `None` if the stored time/duration do not form a same-day span.
    pub fn window(&self) -> Option<Span> {
        Span::starting_at(self.time, self.duration_minutes)
    }

    pub fn vehicle_label(&self) -> String {
        if self.title.is_empty() {
            self.plate.clone()
        } else if self.plate.is_empty() {
            self.title.clone()
        } else {
            format!("{} ({})", self.title, self.plate)
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub title: String,
    pub plate: String,
    pub responsible_id: Option<Ulid>,
    pub client_name: String,
    pub phone: String,
    pub service_type: String,
    pub origin: OriginTag,
    pub date: NaiveDate,
    pub time: Minutes,
    pub duration_minutes: Minutes,
    pub client_ref: Option<Ulid>,
    pub payment_terms: Option<String>,
    pub payment_method: Option<String>,
}

/// Partial update. Changing `date`, `time`, `duration_minutes` or `service_type`,
/// or setting `clear_bay`, re-runs bay allocation.
#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub title: Option<String>,
    pub plate: Option<String>,
    pub responsible_id: Option<Option<Ulid>>,
    pub client_name: Option<String>,
    pub phone: Option<String>,
    pub service_type: Option<String>,
    pub origin: Option<OriginTag>,
    pub date: Option<NaiveDate>,
    pub time: Option<Minutes>,
    pub duration_minutes: Option<Minutes>,
    pub clear_bay: bool,
    pub client_ref: Option<Option<Ulid>>,
    pub payment_terms: Option<Option<String>>,
    pub payment_method: Option<Option<String>>,
}

impl AppointmentPatch {
    /// True if applying this patch to `appt` requires a new bay decision.
    pub fn needs_reallocation(&self, appt: &Appointment) -> bool {
        self.clear_bay
            || self.date.is_some_and(|d| d != appt.date)
            || self.time.is_some_and(|t| t != appt.time)
            || self.duration_minutes.is_some_and(|d| d != appt.duration_minutes)
            || self.service_type.as_ref().is_some_and(|s| *s != appt.service_type)
    }

    pub fn apply(self, appt: &mut Appointment) {
        if let Some(v) = self.title {
            appt.title = v;
        }
        if let Some(v) = self.plate {
            appt.plate = v;
        }
        if let Some(v) = self.responsible_id {
            appt.responsible_id = v;
        }
        if let Some(v) = self.client_name {
            appt.client_name = v;
        }
        if let Some(v) = self.phone {
            appt.phone = v;
        }
        if let Some(v) = self.service_type {
            appt.service_type = v;
        }
        if let Some(v) = self.origin {
            appt.origin = v;
        }
        if let Some(v) = self.date {
            appt.date = v;
        }
        if let Some(v) = self.time {
            appt.time = v;
        }
        if let Some(v) = self.duration_minutes {
            appt.duration_minutes = v;
        }
        if let Some(v) = self.client_ref {
            appt.client_ref = v;
        }
        if let Some(v) = self.payment_terms {
            appt.payment_terms = v;
        }
        if let Some(v) = self.payment_method {
            appt.payment_method = v;
        }
    }
}

/// Journal records: one whole record per upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    BayUpserted(Bay),
    BayDeleted { id: Ulid },
    OccupancyUpserted(Occupancy),
    OccupancyDeleted { id: Ulid, bay_id: Ulid },
    AppointmentUpserted(Appointment),
    AppointmentDeleted { id: Ulid },
}

impl Event {
    /// The bay a ledger event concerns, used to route notifications.
    pub fn bay_id(&self) -> Option<Ulid> {
        match self {
            Event::OccupancyUpserted(o) => Some(o.bay_id),
            Event::OccupancyDeleted { bay_id, .. } => Some(*bay_id),
            Event::BayUpserted(b) => Some(b.id),
            Event::BayDeleted { id } => Some(*id),
            Event::AppointmentUpserted(_) | Event::AppointmentDeleted { .. } => None,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// Bay chosen by the allocation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub bay_id: Ulid,
    pub bay_name: String,
}

/// A bookable start time with the number of bays still free for the whole window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub span: Span,
    pub free_bays: usize,
}
