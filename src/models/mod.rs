pub mod appointment;
pub mod business;
pub mod knowledge;

pub use appointment::{
    Appointment, AppointmentLookup, AppointmentSummary, AvailabilityReport, Confirmation,
    ScheduledVisit, STATUS_CONFIRMED,
};
pub use business::{Business, BusinessInput, DEFAULT_TIMEZONE};
pub use knowledge::{Doctor, Faq, Service};
