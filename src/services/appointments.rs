use std::sync::Arc;

use crate::errors::StoreError;
use crate::models::{
    Appointment, AppointmentLookup, AppointmentSummary, AvailabilityReport, Confirmation,
    ScheduledVisit, STATUS_CONFIRMED,
};
use crate::services::sheets::{SheetBackend, SheetRow, Tab, WriteLocks};

/// Booking writes hold the day lock for their date. Cancel and modify read
/// then write by row handle, so they also hold the tab lock.
pub struct AppointmentStore {
    sheets: Arc<dyn SheetBackend>,
    locks: WriteLocks,
    enforce_booking_conflicts: bool,
}

fn backend(op: &'static str) -> impl FnOnce(anyhow::Error) -> StoreError {
    move |e| {
        tracing::error!(error = %e, op, "sheet backend failure");
        StoreError::Backend { op }
    }
}

fn to_appointment(row: &SheetRow) -> Appointment {
    Appointment {
        name: row.get("Name").to_string(),
        phone: row.get("Phone").to_string(),
        date: row.get("Date").to_string(),
        time: row.get("Time").to_string(),
        status: row.get("Status").to_string(),
    }
}

fn slot_taken(date: &str, time: &str) -> StoreError {
    StoreError::Conflict(format!("The slot on {date} at {time} is already taken."))
}

impl AppointmentStore {
    pub fn new(sheets: Arc<dyn SheetBackend>, enforce_booking_conflicts: bool) -> Self {
        Self {
            sheets,
            locks: WriteLocks::default(),
            enforce_booking_conflicts,
        }
    }

    pub async fn check_availability(
        &self,
        sheet_id: &str,
        date: &str,
    ) -> Result<AvailabilityReport, StoreError> {
        let rows = self
            .sheets
            .query(sheet_id, Tab::Appointments, &[("Date", date)])
            .await
            .map_err(backend("check availability"))?;

        let booked_slots: Vec<String> = rows.iter().map(|r| r.get("Time").to_string()).collect();
        let message = if booked_slots.is_empty() {
            format!("No bookings found for {date}. All slots open.")
        } else {
            format!("Booked slots on {date}: {}", booked_slots.join(", "))
        };

        Ok(AvailabilityReport {
            date: date.to_string(),
            booked_slots,
            message,
        })
    }

    /// Appends a confirmed booking. The slot is only re-checked when the
    /// conflict policy is enabled; otherwise callers are expected to have
    /// asked `check_availability` first.
    pub async fn book_appointment(
        &self,
        sheet_id: &str,
        name: &str,
        phone: &str,
        date: &str,
        time: &str,
    ) -> Result<Confirmation, StoreError> {
        let _day = self.locks.day(sheet_id, date).await;

        if self.enforce_booking_conflicts {
            let taken = self
                .sheets
                .query(sheet_id, Tab::Appointments, &[("Date", date), ("Time", time)])
                .await
                .map_err(backend("book appointment"))?;
            if !taken.is_empty() {
                return Err(slot_taken(date, time));
            }
        }

        self.sheets
            .append(
                sheet_id,
                Tab::Appointments,
                vec![
                    name.to_string(),
                    phone.to_string(),
                    date.to_string(),
                    time.to_string(),
                    STATUS_CONFIRMED.to_string(),
                ],
            )
            .await
            .map_err(backend("book appointment"))?;

        tracing::info!(sheet_id, date, time, "appointment booked");
        Ok(Confirmation::ok(format!(
            "Appointment booked for {name} on {date} at {time}."
        )))
    }

    /// Bookings for exactly this phone number, nobody else's.
    pub async fn get_appointment(
        &self,
        sheet_id: &str,
        phone: &str,
    ) -> Result<AppointmentLookup, StoreError> {
        let rows = self
            .sheets
            .query(sheet_id, Tab::Appointments, &[("Phone", phone)])
            .await
            .map_err(backend("retrieve appointments"))?;

        let appointments: Vec<AppointmentSummary> = rows
            .iter()
            .map(to_appointment)
            .filter(|a| a.phone == phone)
            .map(|a| AppointmentSummary {
                date: a.date,
                time: a.time,
                status: a.status,
            })
            .collect();

        if appointments.is_empty() {
            return Ok(AppointmentLookup::Empty {
                message: "No appointments found for this phone number.".to_string(),
            });
        }
        Ok(AppointmentLookup::Found { appointments })
    }

    pub async fn get_appointments_by_date(
        &self,
        sheet_id: &str,
        date: &str,
    ) -> Result<Vec<ScheduledVisit>, StoreError> {
        let rows = self
            .sheets
            .query(sheet_id, Tab::Appointments, &[("Date", date)])
            .await
            .map_err(backend("fetch appointments"))?;

        Ok(rows
            .iter()
            .map(to_appointment)
            .map(|a| ScheduledVisit {
                name: a.name,
                phone: a.phone,
                time: a.time,
                status: a.status,
            })
            .collect())
    }

    /// Deletes the first booking matching phone and date.
    pub async fn cancel_appointment(
        &self,
        sheet_id: &str,
        phone: &str,
        date: &str,
    ) -> Result<Confirmation, StoreError> {
        let _tab = self.locks.tab(sheet_id, Tab::Appointments).await;

        let rows = self
            .sheets
            .query(sheet_id, Tab::Appointments, &[("Phone", phone), ("Date", date)])
            .await
            .map_err(backend("cancel appointment"))?;

        let Some(row) = rows.first() else {
            return Err(StoreError::NotFound("Appointment not found.".to_string()));
        };

        self.sheets
            .delete(sheet_id, row)
            .await
            .map_err(backend("cancel appointment"))?;

        tracing::info!(sheet_id, date, "appointment cancelled");
        Ok(Confirmation::ok(format!(
            "Appointment on {date} has been cancelled."
        )))
    }

    /// Moves the first booking for (phone, old_date) to a free slot.
    ///
    /// The target slot is checked against every booking on that day before
    /// the existing booking is looked up, so a taken slot is reported even when the
    /// booking to move does not exist.
    pub async fn modify_appointment(
        &self,
        sheet_id: &str,
        phone: &str,
        old_date: &str,
        new_date: &str,
        new_time: &str,
    ) -> Result<Confirmation, StoreError> {
        let _days = self.locks.days(sheet_id, old_date, new_date).await;
        let _tab = self.locks.tab(sheet_id, Tab::Appointments).await;

        let rows = self
            .sheets
            .rows(sheet_id, Tab::Appointments)
            .await
            .map_err(backend("modify appointment"))?;

        if rows
            .iter()
            .any(|r| r.get("Date") == new_date && r.get("Time") == new_time)
        {
            return Err(slot_taken(new_date, new_time));
        }

        let Some(mut row) = rows
            .into_iter()
            .find(|r| r.get("Phone") == phone && r.get("Date") == old_date)
        else {
            return Err(StoreError::NotFound(
                "Original appointment not found.".to_string(),
            ));
        };

        row.set("Date", new_date);
        row.set("Time", new_time);
        self.sheets
            .update(sheet_id, &row)
            .await
            .map_err(backend("modify appointment"))?;

        tracing::info!(sheet_id, old_date, new_date, new_time, "appointment rescheduled");
        Ok(Confirmation::ok(format!(
            "Appointment rescheduled to {new_date} at {new_time}."
        )))
    }
}
