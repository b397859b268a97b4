use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::RoutingFallback;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Business, BusinessInput, DEFAULT_TIMEZONE};

/// Maps the address a message arrived on to the business that owns it.
pub struct BusinessRegistry {
    db: Arc<Mutex<Connection>>,
    fallback: RoutingFallback,
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

fn validate_timezone(tz: &str) -> Result<(), AppError> {
    tz.parse::<chrono_tz::Tz>()
        .map(|_| ())
        .map_err(|_| AppError::Validation(format!("unknown timezone: {tz}")))
}

fn duplicate_phone() -> AppError {
    AppError::Conflict("A business with this phone number already exists.".to_string())
}

impl BusinessRegistry {
    pub fn new(db: Arc<Mutex<Connection>>, fallback: RoutingFallback) -> Self {
        Self { db, fallback }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("registry lock poisoned")))
    }

    /// Exact match on the routing key, then the configured fallback.
    pub fn resolve(&self, routing_key: &str) -> Result<Option<Business>, AppError> {
        let exact = queries::get_business_by_phone(&*self.conn()?, routing_key)?;
        if exact.is_some() {
            return Ok(exact);
        }

        let fallback = self.default_business()?;
        if let Some(b) = &fallback {
            tracing::warn!(
                routing_key,
                business = %b.name,
                "no business for routing key, using fallback"
            );
        }
        Ok(fallback)
    }

    /// The business the fallback policy points at, if any.
    pub fn default_business(&self) -> Result<Option<Business>, AppError> {
        let conn = self.conn()?;
        let business = match &self.fallback {
            RoutingFallback::Reject => None,
            RoutingFallback::FirstRegistered => queries::first_business(&conn)?,
            RoutingFallback::Fixed(key) => queries::get_business_by_phone(&conn, key)?,
        };
        Ok(business)
    }

    pub fn list(&self) -> Result<Vec<Business>, AppError> {
        Ok(queries::list_businesses(&*self.conn()?)?)
    }

    pub fn get(&self, id: &str) -> Result<Business, AppError> {
        queries::get_business(&*self.conn()?, id)?
            .ok_or_else(|| AppError::NotFound("Business not found".to_string()))
    }

    pub fn create(&self, input: BusinessInput) -> Result<Business, AppError> {
        let timezone = input
            .timezone
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        validate_timezone(&timezone)?;

        let business = Business {
            id: uuid::Uuid::new_v4().to_string(),
            phone_number: required(input.phone_number, "phoneNumber")?,
            name: required(input.name, "name")?,
            system_instruction: required(input.system_instruction, "systemInstruction")?,
            sheet_id: required(input.sheet_id, "sheetId")?,
            timezone,
            knowledge_base: input.knowledge_base.unwrap_or(true),
        };

        let conn = self.conn()?;
        if queries::get_business_by_phone(&conn, &business.phone_number)?.is_some() {
            return Err(duplicate_phone());
        }
        queries::insert_business(&conn, &business)?;

        tracing::info!(id = %business.id, name = %business.name, "business created");
        Ok(business)
    }

    /// Partial update: only fields present in `input` are overwritten.
    pub fn update(&self, id: &str, input: BusinessInput) -> Result<Business, AppError> {
        let conn = self.conn()?;
        let mut business = queries::get_business(&conn, id)?
            .ok_or_else(|| AppError::NotFound("Business not found".to_string()))?;

        if let Some(phone) = input.phone_number {
            let phone = required(Some(phone), "phoneNumber")?;
            if let Some(other) = queries::get_business_by_phone(&conn, &phone)? {
                if other.id != business.id {
                    return Err(duplicate_phone());
                }
            }
            business.phone_number = phone;
        }
        if let Some(name) = input.name {
            business.name = required(Some(name), "name")?;
        }
        if let Some(instruction) = input.system_instruction {
            business.system_instruction = required(Some(instruction), "systemInstruction")?;
        }
        if let Some(sheet_id) = input.sheet_id {
            business.sheet_id = required(Some(sheet_id), "sheetId")?;
        }
        if let Some(tz) = input.timezone {
            validate_timezone(&tz)?;
            business.timezone = tz;
        }
        if let Some(kb) = input.knowledge_base {
            business.knowledge_base = kb;
        }

        queries::update_business(&conn, &business)?;
        tracing::info!(id = %business.id, "business updated");
        Ok(business)
    }

    pub fn delete(&self, id: &str) -> Result<(), AppError> {
        if !queries::delete_business(&*self.conn()?, id)? {
            return Err(AppError::NotFound("Business not found".to_string()));
        }
        tracing::info!(id, "business deleted");
        Ok(())
    }
}
