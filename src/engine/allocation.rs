use tracing::debug;

use crate::model::*;

use super::Engine;

/// Ordered (keywords, bay type) pairs. The first row with a keyword contained in
/// the lowercased service label decides the type.
pub const KEYWORD_TABLE: &[(&[&str], BayType)] = &[
    (
        &[
            "lavagem", "lavar", "lava ", "higieniza", "limpeza", "polimento", "polir",
            "enceramento", "cristaliza", "vitrifica", "estética", "estetica", "manutenção",
            "manutencao", "revisão", "revisao", "troca de óleo", "troca de oleo", "wash",
            "cleaning", "detailing", "maintenance",
        ],
        BayType::WashBay,
    ),
    (
        &[
            "reparo", "conserto", "funilaria", "lataria", "pintura", "elétric", "eletric",
            "diagnóstico", "diagnostico", "mecânic", "mecanic", "motor", "freio", "suspensão",
            "suspensao", "injeção", "injecao", "repair", "paint", "electrical", "diagnostic",
            "bodywork",
        ],
        BayType::GeneralService,
    ),
];

/// Bay type a service label should go to, `None` when no keyword matches
/// (any active bay qualifies).
pub fn derive_preferred_type(service_label: &str) -> Option<BayType> {
    let label = format!("{} ", service_label.to_lowercase());
    KEYWORD_TABLE
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| label.contains(k)))
        .map(|(_, bay_type)| *bay_type)
}

impl Engine {
    /// Pick a bay for the appointment's window: the first free bay of the derived
    /// type in registry order. The appointment's own current reservation is ignored,
    /// so an unchanged appointment keeps its bay while that bay stays first in line.
    ///
    /// `None` means no bay is free; it is not retried.
    pub fn auto_allocate(&self, appt: &Appointment) -> Option<Allocation> {
        let span = appt.window()?;
        let preferred = derive_preferred_type(&appt.service_type);
        let allocation = self
            .free_bays(appt.date, span, preferred, Some(appt.id))
            .first()
            .map(|bay| Allocation {
                bay_id: bay.id,
                bay_name: bay.name.clone(),
            });

        let outcome = if allocation.is_some() { "allocated" } else { "no_bay" };
        metrics::counter!(crate::observability::ALLOCATIONS_TOTAL, "outcome" => outcome)
            .increment(1);
        debug!(
            "allocate {} on {} [{}, {}) type={:?}: {:?}",
            appt.id,
            appt.date,
            span.start,
            span.end,
            preferred,
            allocation.as_ref().map(|a| &a.bay_name)
        );
        allocation
    }
}
