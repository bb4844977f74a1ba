use chrono::NaiveDate;
use tracing::{info, warn};
use ulid::Ulid;

use crate::model::*;

use super::conflict::conflicts;
use super::{Engine, EngineError};

impl Engine {
    /// Append a new `scheduled` occupancy with a generated id.
    ///
    /// The window is not checked against the bay here; callers reserve only
    /// windows the resolver reported free.
    pub fn add_occupancy(&mut self, new: NewOccupancy) -> Result<Occupancy, EngineError> {
        if !self.bays.contains(&new.bay_id) {
            warn!("occupancy for unknown bay {}", new.bay_id);
        }
        let occ = Occupancy {
            id: Ulid::new(),
            bay_id: new.bay_id,
            bay_name: new.bay_name,
            source_ref: new.source_ref,
            source_kind: new.source_kind,
            client_name: new.client_name,
            vehicle_label: new.vehicle_label,
            start_date: new.date,
            end_date: new.date,
            span: new.span,
            status: OccupancyStatus::Scheduled,
        };
        self.persist_and_apply(Event::OccupancyUpserted(occ.clone()))?;
        Ok(occ)
    }

    pub fn get_occupancy(&self, id: &Ulid) -> Option<&Occupancy> {
        self.occupancies.get(id)
    }

    pub fn occupancies_by_bay(&self, bay_id: Ulid) -> Vec<&Occupancy> {
        self.occupancies.list(|o| o.bay_id == bay_id)
    }

    /// One bay's occupancies on `date`, ordered by start time.
    pub fn occupancies_by_date(&self, bay_id: Ulid, date: NaiveDate) -> Vec<&Occupancy> {
        let mut occs = self
            .occupancies
            .list(|o| o.bay_id == bay_id && o.start_date == date);
        occs.sort_by_key(|o| o.span.start);
        occs
    }

    /// Every bay's occupancies on `date`, ordered by start time.
    pub fn occupancies_on(&self, date: NaiveDate) -> Vec<&Occupancy> {
        let mut occs = self.occupancies.list(|o| o.start_date == date);
        occs.sort_by_key(|o| o.span.start);
        occs
    }

    pub fn occupancy_by_reference(&self, source_ref: Ulid, kind: SourceKind) -> Option<&Occupancy> {
        self.occupancies
            .iter()
            .find(|o| o.source_ref == source_ref && o.source_kind == kind)
    }

    /// Move an occupancy to a new status. Any transition is accepted; ones outside
    /// the forward lifecycle are logged.
    pub fn set_occupancy_status(
        &mut self,
        id: Ulid,
        status: OccupancyStatus,
    ) -> Result<Occupancy, EngineError> {
        let mut occ = self
            .occupancies
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;
        if !occ.status.is_forward_transition(status) {
            warn!("occupancy {id}: unusual status transition {:?} -> {:?}", occ.status, status);
            metrics::counter!(crate::observability::ILLEGAL_TRANSITIONS_TOTAL).increment(1);
        }
        occ.status = status;
        self.persist_and_apply(Event::OccupancyUpserted(occ.clone()))?;
        Ok(occ)
    }

    /// Point an occupancy at a different source, keeping its id and window.
    pub fn retag_occupancy(
        &mut self,
        id: Ulid,
        source_ref: Ulid,
        source_kind: SourceKind,
    ) -> Result<Occupancy, EngineError> {
        let mut occ = self
            .occupancies
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;
        occ.source_ref = source_ref;
        occ.source_kind = source_kind;
        self.persist_and_apply(Event::OccupancyUpserted(occ.clone()))?;
        Ok(occ)
    }

    pub fn remove_occupancy(&mut self, id: Ulid) -> Result<Occupancy, EngineError> {
        let occ = self
            .occupancies
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;
        self.persist_and_apply(Event::OccupancyDeleted { id, bay_id: occ.bay_id })?;
        Ok(occ)
    }

    /// Remove the occupancy created for `source_ref`, if there is one.
    pub fn remove_occupancy_by_reference(
        &mut self,
        source_ref: Ulid,
        kind: SourceKind,
    ) -> Result<Option<Occupancy>, EngineError> {
        match self.occupancy_by_reference(source_ref, kind).map(|o| o.id) {
            Some(id) => self.remove_occupancy(id).map(Some),
            None => Ok(None),
        }
    }

    // ── Service-order lifecycle ──────────────────────────────────

    /// The vehicle entered the bay.
    pub fn start_service(&mut self, order_ref: Ulid) -> Result<Occupancy, EngineError> {
        let id = self.service_order_occupancy(order_ref)?;
        let occ = self.set_occupancy_status(id, OccupancyStatus::InUse)?;
        info!("service order {order_ref} in use on bay {}", occ.bay_name);
        Ok(occ)
    }

    /// The vehicle left the bay; the window no longer blocks it.
    pub fn finish_service(&mut self, order_ref: Ulid) -> Result<Occupancy, EngineError> {
        let id = self.service_order_occupancy(order_ref)?;
        self.set_occupancy_status(id, OccupancyStatus::Completed)
    }

    pub fn cancel_occupancy(&mut self, id: Ulid) -> Result<Occupancy, EngineError> {
        self.set_occupancy_status(id, OccupancyStatus::Cancelled)
    }

    fn service_order_occupancy(&self, order_ref: Ulid) -> Result<Ulid, EngineError> {
        self.occupancy_by_reference(order_ref, SourceKind::ServiceOrder)
            .map(|o| o.id)
            .ok_or(EngineError::NotFound(order_ref))
    }

    // ── Audit ────────────────────────────────────────────────────

    /// Pairs of active occupancies on the same bay and date whose windows overlap.
    /// Empty whenever every reservation went through the resolver.
    pub fn verify_no_double_booking(&self) -> Vec<(Ulid, Ulid)> {
        let active: Vec<&Occupancy> = self.occupancies.list(|o| o.blocks());
        let mut pairs = Vec::new();
        for (i, a) in active.iter().enumerate() {
            for b in &active[i + 1..] {
                if a.bay_id == b.bay_id
                    && a.start_date == b.start_date
                    && conflicts(&a.span, &b.span)
                {
                    pairs.push((a.id, b.id));
                }
            }
        }
        pairs
    }
}
