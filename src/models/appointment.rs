use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A concrete bookable opening: a start time in a specific operatory with a
/// specific provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub starts_at: NaiveDateTime,
    pub provider_id: String,
    pub operatory_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: i32,
    pub provider_id: String,
    pub operatory_id: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Asap,
    Broken,
    Complete,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Asap => "asap",
            AppointmentStatus::Broken => "broken",
            AppointmentStatus::Complete => "complete",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "asap" => AppointmentStatus::Asap,
            "broken" => AppointmentStatus::Broken,
            "complete" => AppointmentStatus::Complete,
            _ => AppointmentStatus::Scheduled,
        }
    }

    /// Statuses that occupy a slot. Broken and completed appointments don't.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Asap)
    }
}

/// A write the caller is asking for, checked against the schedule before it
/// reaches the practice-management system.
#[derive(Debug, Clone)]
pub struct ProposedAppointment {
    pub starts_at: NaiveDateTime,
    pub provider_id: String,
    pub operatory_id: String,
    /// Set during reschedule so the appointment being moved doesn't collide
    /// with itself.
    pub exclude_appointment_id: Option<String>,
}
