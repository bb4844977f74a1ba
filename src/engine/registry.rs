use tracing::{info, warn};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::{Engine, EngineError};

impl Engine {
    pub fn create_bay(&mut self, new: NewBay) -> Result<Bay, EngineError> {
        if self.bays.len() >= MAX_BAYS {
            return Err(EngineError::LimitExceeded("too many bays"));
        }
        validate_bay_name(&new.name)?;

        let bay = Bay {
            id: Ulid::new(),
            name: new.name,
            bay_type: new.bay_type,
            partner_id: new.partner_id,
            partner_name: new.partner_name,
            active: true,
            color: new.color,
        };
        self.persist_and_apply(Event::BayUpserted(bay.clone()))?;
        info!("bay {} '{}' created ({})", bay.id, bay.name, bay.bay_type);
        Ok(bay)
    }

    pub fn update_bay(&mut self, id: Ulid, patch: BayPatch) -> Result<Bay, EngineError> {
        let mut bay = self.bays.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        if let Some(name) = &patch.name {
            validate_bay_name(name)?;
        }
        if let Some(new_type) = patch.bay_type
            && new_type != bay.bay_type
            && self.occupancies.iter().any(|o| o.bay_id == id && o.blocks())
        {
            warn!("bay {id} retyped to {new_type} while holding active occupancies");
        }

        patch.apply(&mut bay);
        self.persist_and_apply(Event::BayUpserted(bay.clone()))?;
        Ok(bay)
    }

    /// Remove a bay from the registry. Occupancies that reference it stay in the
    /// ledger and simply stop resolving to a bay.
    pub fn delete_bay(&mut self, id: Ulid) -> Result<Bay, EngineError> {
        let bay = self.bays.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        self.persist_and_apply(Event::BayDeleted { id })?;
        self.notify.remove(&id);
        Ok(bay)
    }

    pub fn get_bay(&self, id: &Ulid) -> Option<&Bay> {
        self.bays.get(id)
    }

    /// Every bay in registry order, active or not.
    pub fn list_bays(&self) -> &[Bay] {
        self.bays.as_slice()
    }

    pub fn active_bays(&self) -> Vec<&Bay> {
        self.bays.list(|b| b.active)
    }

    /// Active bays a service of `preferred` type could use; all active bays if unconstrained.
    pub fn compatible_bay_count(&self, preferred: Option<BayType>) -> usize {
        self.bays
            .iter()
            .filter(|b| b.active && preferred.is_none_or(|t| b.bay_type == t))
            .count()
    }
}

fn validate_bay_name(name: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::InvalidInput("bay name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("bay name too long"));
    }
    Ok(())
}
