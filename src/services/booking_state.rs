use crate::models::{PatientRef, Slot};

/// Per-call ledger of what the conversation has already established. The
/// realtime agent re-invokes its tool freely mid-conversation; this record is
/// what keeps those repeats from re-running lookups or double-creating
/// appointments. Facts accumulate monotonically within one booking intent and
/// are only cleared together when the caller starts a new one.
#[derive(Debug, Default)]
pub struct BookingState {
    patient: Option<PatientRef>,
    candidate_slots: Vec<Slot>,
    selected_slot: Option<Slot>,
    appointment_id: Option<String>,
}

impl BookingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patient(&self) -> Option<&PatientRef> {
        self.patient.as_ref()
    }

    pub fn candidate_slots(&self) -> &[Slot] {
        &self.candidate_slots
    }

    pub fn selected_slot(&self) -> Option<&Slot> {
        self.selected_slot.as_ref()
    }

    pub fn appointment_id(&self) -> Option<&str> {
        self.appointment_id.as_deref()
    }

    pub fn patient_known(&self) -> bool {
        self.patient.is_some()
    }

    pub fn slots_queried(&self) -> bool {
        !self.candidate_slots.is_empty()
    }

    pub fn appointment_created(&self) -> bool {
        self.appointment_id.is_some()
    }

    /// Idempotent: recording the same patient again is a no-op, and an
    /// identified patient is never replaced mid-call.
    pub fn record_patient(&mut self, patient: PatientRef) {
        if self.patient.is_none() {
            tracing::debug!(patient = %patient.display_name, "patient identified");
            self.patient = Some(patient);
        }
    }

    /// A fresh slot search replaces the previous candidates outright; any
    /// earlier selection referred to the old list and is cleared with it.
    pub fn record_slots(&mut self, slots: Vec<Slot>) {
        self.candidate_slots = slots;
        self.selected_slot = None;
    }

    pub fn record_selection(&mut self, slot: Slot) {
        tracing::debug!(starts_at = %slot.starts_at, "caller selected slot");
        self.selected_slot = Some(slot);
    }

    pub fn record_appointment(&mut self, id: String) {
        tracing::info!(appointment = %id, "appointment recorded");
        self.appointment_id = Some(id);
    }

    /// The booked appointment was cancelled; the caller may book again.
    pub fn record_cancelled(&mut self) {
        self.appointment_id = None;
        self.selected_slot = None;
    }

    /// The caller asked for a separate, additional booking. Slot and
    /// appointment facts reset as a unit; the identified patient stays.
    pub fn begin_new_intent(&mut self) {
        tracing::debug!("starting new booking intent");
        self.candidate_slots.clear();
        self.selected_slot = None;
        self.appointment_id = None;
    }

    /// Directive block prepended to every decision-agent invocation. This is
    /// the mechanism that suppresses duplicate lookups and creates: the agent
    /// sees what is already established before it plans anything.
    pub fn guard_context(&self) -> String {
        let mut lines = Vec::new();

        if let Some(patient) = &self.patient {
            lines.push(format!(
                "EXISTING PATIENT: {} (id {}). Do not look up or create this patient again.",
                patient.display_name, patient.id
            ));
        }

        if !self.candidate_slots.is_empty() {
            let mut block = String::from("OPEN SLOTS ALREADY FOUND (reuse these, do not search again for the same date):");
            for (i, slot) in self.candidate_slots.iter().enumerate() {
                block.push_str(&format!(
                    "\n  {}) {} (provider {}, operatory {})",
                    i + 1,
                    slot.starts_at.format("%Y-%m-%d %-I:%M %p"),
                    slot.provider_id,
                    slot.operatory_id
                ));
            }
            lines.push(block);
        }

        if let Some(slot) = &self.selected_slot {
            lines.push(format!(
                "CALLER SELECTED: {} (provider {}, operatory {}). Book this slot when the caller confirms.",
                slot.starts_at.format("%Y-%m-%d %-I:%M %p"),
                slot.provider_id,
                slot.operatory_id
            ));
        }

        if let Some(id) = &self.appointment_id {
            lines.push(format!(
                "APPOINTMENT ALREADY CREATED (id {id}). Do not create another appointment \
                 unless the caller explicitly asks to book a separate, additional visit."
            ));
        }

        lines.join("\n")
    }
}
