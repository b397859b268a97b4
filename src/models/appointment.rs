use serde::Serialize;

pub const STATUS_CONFIRMED: &str = "Confirmed";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Appointment {
    pub name: String,
    pub phone: String,
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    /// Display string such as `10:00 AM`.
    pub time: String,
    pub status: String,
}

/// What a customer may see about their own booking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentSummary {
    pub date: String,
    pub time: String,
    pub status: String,
}

/// Dispatcher view of a booking on a given day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledVisit {
    pub name: String,
    pub phone: String,
    pub time: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityReport {
    pub date: String,
    pub booked_slots: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Confirmation {
    pub success: bool,
    pub message: String,
}

impl Confirmation {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AppointmentLookup {
    Found { appointments: Vec<AppointmentSummary> },
    Empty { message: String },
}
