use chrono::Timelike;

use crate::models::{Appointment, ProposedAppointment};
use crate::services::pms::PmsClient;

/// Appointments starting within this window of each other collide even when
/// they land in different hour buckets. Real durations are unknown at check
/// time, so the hour bucket alone would miss adjacent half-hour slots.
pub const PROXIMITY_MINUTES: i64 = 30;

#[derive(Debug, Default)]
pub struct ConflictCheck {
    pub conflict: bool,
    pub reason: Option<String>,
    pub conflicting: Option<Appointment>,
}

impl ConflictCheck {
    pub fn clear() -> Self {
        Self::default()
    }

    fn against(appt: &Appointment) -> Self {
        let when = appt.starts_at.format("%-I:%M %p");
        Self {
            conflict: true,
            reason: Some(format!("already booked at {when}")),
            conflicting: Some(appt.clone()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatusGuardError {
    /// Caller-facing; the current status is part of the message.
    #[error("that appointment is currently marked {status}, so it can't be cancelled")]
    WrongStatus { status: String },
    #[error(transparent)]
    Lookup(#[from] anyhow::Error),
}

/// Pre-write double-booking check. Looks at the proposed operatory's day
/// first, then the provider's. A failed schedule lookup reports no conflict:
/// the practice-management system is the final authority and will reject on
/// its own constraints if it must.
pub async fn check(pms: &dyn PmsClient, proposed: &ProposedAppointment) -> ConflictCheck {
    let date = proposed.starts_at.date();

    match pms.appointments_on(date, Some(&proposed.operatory_id)).await {
        Ok(existing) => {
            if let Some(hit) = find_collision(&existing, proposed) {
                return ConflictCheck::against(hit);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "operatory schedule lookup failed, allowing write");
            return ConflictCheck::clear();
        }
    }

    match pms
        .provider_appointments_on(date, &proposed.provider_id)
        .await
    {
        Ok(existing) => {
            if let Some(hit) = find_collision(&existing, proposed) {
                return ConflictCheck::against(hit);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "provider schedule lookup failed, allowing write");
        }
    }

    ConflictCheck::clear()
}

fn find_collision<'a>(
    existing: &'a [Appointment],
    proposed: &ProposedAppointment,
) -> Option<&'a Appointment> {
    existing.iter().find(|appt| {
        if proposed.exclude_appointment_id.as_deref() == Some(appt.id.as_str()) {
            return false;
        }
        if !appt.status.is_active() {
            return false;
        }
        let same_hour = appt.starts_at.hour() == proposed.starts_at.hour();
        let minutes_apart = (appt.starts_at - proposed.starts_at).num_minutes().abs();
        same_hour || minutes_apart < PROXIMITY_MINUTES
    })
}

/// Cancel/break is only allowed while the appointment is still scheduled.
pub async fn guard_cancellable(
    pms: &dyn PmsClient,
    appointment_id: &str,
) -> Result<Appointment, StatusGuardError> {
    let appt = pms.get_appointment(appointment_id).await?;
    if appt.status != crate::models::AppointmentStatus::Scheduled {
        return Err(StatusGuardError::WrongStatus {
            status: appt.status.as_str().to_string(),
        });
    }
    Ok(appt)
}
