pub mod appointment;
pub mod call;
pub mod patient;
pub mod plan;
pub mod turn;

pub use appointment::{Appointment, AppointmentStatus, ProposedAppointment, Slot};
pub use call::CallRecord;
pub use patient::{NewPatient, Operatory, Patient, PatientRef, Provider};
pub use plan::{AgentPlan, PlanAction};
pub use turn::{Speaker, Turn};
