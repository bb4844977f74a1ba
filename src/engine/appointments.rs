use chrono::NaiveDate;
use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::check_no_conflict;
use super::{Engine, EngineError};

impl Engine {
    /// Store a new appointment and reserve a bay for it.
    ///
    /// The returned appointment has no `bay_id` when every compatible bay is taken;
    /// the booking is still kept and the caller reports "fully booked".
    pub fn create_appointment(&mut self, new: NewAppointment) -> Result<Appointment, EngineError> {
        let mut appt = Appointment {
            id: Ulid::new(),
            title: new.title,
            plate: new.plate,
            responsible_id: new.responsible_id,
            client_name: new.client_name,
            phone: new.phone,
            service_type: new.service_type,
            origin: new.origin,
            date: new.date,
            time: new.time,
            duration_minutes: new.duration_minutes,
            bay_id: None,
            bay_name: None,
            client_ref: new.client_ref,
            payment_terms: new.payment_terms,
            payment_method: new.payment_method,
        };
        validate_appointment(&appt)?;

        if let Some(alloc) = self.auto_allocate(&appt) {
            appt.bay_id = Some(alloc.bay_id);
            appt.bay_name = Some(alloc.bay_name);
        }
        self.persist_and_apply(Event::AppointmentUpserted(appt.clone()))?;
        self.mirror_occupancy(&appt)?;
        info!(
            "appointment {} on {} at {}: bay {}",
            appt.id,
            appt.date,
            crate::clock::format_time(appt.time),
            appt.bay_name.as_deref().unwrap_or("none")
        );
        Ok(appt)
    }

    /// Apply a partial edit. Moving the window, changing the service, clearing
    /// the bay or a lapsed reservation re-runs allocation; when that fails the bay
    /// is dropped rather than kept in a possibly conflicting window.
    pub fn update_appointment(
        &mut self,
        id: Ulid,
        patch: AppointmentPatch,
    ) -> Result<Appointment, EngineError> {
        let mut appt = self
            .appointments
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;
        let reallocate = patch.needs_reallocation(&appt) || self.reservation_lapsed(&appt);
        patch.apply(&mut appt);
        validate_appointment(&appt)?;

        if reallocate {
            match self.auto_allocate(&appt) {
                Some(alloc) => {
                    appt.bay_id = Some(alloc.bay_id);
                    appt.bay_name = Some(alloc.bay_name);
                }
                None => {
                    if appt.bay_id.is_some() {
                        info!(
                            "appointment {id}: no free bay after edit, releasing {:?}",
                            appt.bay_name
                        );
                        metrics::counter!(crate::observability::ALLOCATIONS_RELEASED_TOTAL)
                            .increment(1);
                    }
                    appt.bay_id = None;
                    appt.bay_name = None;
                }
            }
        }

        self.persist_and_apply(Event::AppointmentUpserted(appt.clone()))?;
        self.mirror_occupancy(&appt)?;
        Ok(appt)
    }

    /// Reschedule to a new date and start time.
    pub fn move_appointment(
        &mut self,
        id: Ulid,
        date: NaiveDate,
        time: Minutes,
    ) -> Result<Appointment, EngineError> {
        self.update_appointment(
            id,
            AppointmentPatch {
                date: Some(date),
                time: Some(time),
                ..Default::default()
            },
        )
    }

    /// Put the appointment in a specific bay chosen by staff.
    pub fn assign_bay(&mut self, id: Ulid, bay_id: Ulid) -> Result<Appointment, EngineError> {
        let mut appt = self
            .appointments
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;
        let bay = self.bays.get(&bay_id).ok_or(EngineError::NotFound(bay_id))?;
        if !bay.active {
            return Err(EngineError::InvalidInput("bay is inactive"));
        }
        let span = appt
            .window()
            .ok_or(EngineError::InvalidInput("appointment window is empty or crosses midnight"))?;
        check_no_conflict(self.occupancies.as_slice(), bay_id, appt.date, &span, Some(id))?;

        appt.bay_id = Some(bay.id);
        appt.bay_name = Some(bay.name.clone());
        self.persist_and_apply(Event::AppointmentUpserted(appt.clone()))?;
        self.mirror_occupancy(&appt)?;
        Ok(appt)
    }

    /// Delete an appointment that was never converted, with its reservation.
    pub fn delete_appointment(&mut self, id: Ulid) -> Result<Appointment, EngineError> {
        let appt = self
            .appointments
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;
        self.remove_occupancy_by_reference(id, SourceKind::Appointment)?;
        self.persist_and_apply(Event::AppointmentDeleted { id })?;
        Ok(appt)
    }

    /// Turn an appointment into a service order: its occupancy is re-tagged to
    /// `order_ref` (never duplicated) and the appointment record is removed.
    ///
    /// Returns the re-tagged occupancy, or `None` if the appointment had no bay.
    pub fn convert_to_service_order(
        &mut self,
        id: Ulid,
        order_ref: Ulid,
    ) -> Result<Option<Occupancy>, EngineError> {
        if !self.appointments.contains(&id) {
            return Err(EngineError::NotFound(id));
        }
        let retagged = match self
            .occupancy_by_reference(id, SourceKind::Appointment)
            .map(|o| o.id)
        {
            Some(occ_id) => {
                Some(self.retag_occupancy(occ_id, order_ref, SourceKind::ServiceOrder)?)
            }
            None => None,
        };
        self.persist_and_apply(Event::AppointmentDeleted { id })?;
        info!("appointment {id} converted to service order {order_ref}");
        Ok(retagged)
    }

    pub fn get_appointment(&self, id: &Ulid) -> Option<&Appointment> {
        self.appointments.get(id)
    }

    pub fn list_appointments(&self) -> &[Appointment] {
        self.appointments.as_slice()
    }

    /// The day's agenda, ordered by start time.
    pub fn appointments_on(&self, date: NaiveDate) -> Vec<&Appointment> {
        let mut appts = self.appointments.list(|a| a.date == date);
        appts.sort_by_key(|a| a.time);
        appts
    }

    /// The appointment names a bay but its occupancy is gone or no longer blocks it,
    /// so the bay may since have gone to someone else.
    fn reservation_lapsed(&self, appt: &Appointment) -> bool {
        appt.bay_id.is_some()
            && self
                .occupancy_by_reference(appt.id, SourceKind::Appointment)
                .is_none_or(|o| !o.blocks())
    }

    /// Bring the ledger in line with the appointment's bay fields: one occupancy
    /// while it has a bay, none otherwise.
    fn mirror_occupancy(&mut self, appt: &Appointment) -> Result<(), EngineError> {
        let existing = self
            .occupancy_by_reference(appt.id, SourceKind::Appointment)
            .cloned();
        let (Some(bay_id), Some(span)) = (appt.bay_id, appt.window()) else {
            if let Some(occ) = existing {
                self.remove_occupancy(occ.id)?;
            }
            return Ok(());
        };
        let bay_name = appt.bay_name.clone().unwrap_or_default();

        match existing {
            Some(mut occ) => {
                let before = occ.clone();
                occ.bay_id = bay_id;
                occ.bay_name = bay_name;
                occ.start_date = appt.date;
                occ.end_date = appt.date;
                occ.span = span;
                occ.client_name = appt.client_name.clone();
                occ.vehicle_label = appt.vehicle_label();
                // A cancelled or completed reservation is live again once the
                // appointment holds a bay.
                if !occ.blocks() {
                    occ.status = OccupancyStatus::Scheduled;
                }
                if occ != before {
                    if before.bay_id != occ.bay_id {
                        // Withdraw from the old bay's timeline before it appears on the new one.
                        let withdrawn = Event::OccupancyDeleted {
                            id: before.id,
                            bay_id: before.bay_id,
                        };
                        self.notify.send(before.bay_id, &withdrawn);
                    }
                    self.persist_and_apply(Event::OccupancyUpserted(occ))?;
                }
            }
            None => {
                self.add_occupancy(NewOccupancy {
                    bay_id,
                    bay_name,
                    source_ref: appt.id,
                    source_kind: SourceKind::Appointment,
                    client_name: appt.client_name.clone(),
                    vehicle_label: appt.vehicle_label(),
                    date: appt.date,
                    span,
                })?;
            }
        }
        Ok(())
    }
}

fn validate_appointment(appt: &Appointment) -> Result<(), EngineError> {
    if appt.window().is_none() {
        return Err(EngineError::InvalidInput(
            "appointment window is empty or crosses midnight",
        ));
    }
    if appt.title.len() > MAX_NAME_LEN || appt.client_name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("name too long"));
    }
    if appt.service_type.len() > MAX_LABEL_LEN {
        return Err(EngineError::LimitExceeded("service label too long"));
    }
    Ok(())
}
