//! Tools the model may call during a conversation.
//!
//! Names and argument names are the contract with the model and must stay
//! stable across providers.

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::errors::StoreError;
use crate::models::Business;
use crate::services::ai::ToolDeclaration;
use crate::services::appointments::AppointmentStore;
use crate::services::knowledge_base::KnowledgeBase;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    CheckAvailability,
    BookAppointment,
    GetAppointment,
    CancelAppointment,
    ModifyAppointment,
    GetDoctorInfo,
    GetServicePrice,
    GetClinicFaq,
}

const BOOKING_TOOLS: [Tool; 5] = [
    Tool::CheckAvailability,
    Tool::BookAppointment,
    Tool::GetAppointment,
    Tool::CancelAppointment,
    Tool::ModifyAppointment,
];

const KNOWLEDGE_TOOLS: [Tool; 3] = [Tool::GetDoctorInfo, Tool::GetServicePrice, Tool::GetClinicFaq];

fn string_schema(fields: &[(&str, &str)]) -> Value {
    let properties: serde_json::Map<String, Value> = fields
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                json!({ "type": "string", "description": description }),
            )
        })
        .collect();
    let required: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
    json!({ "type": "object", "properties": properties, "required": required })
}

impl Tool {
    pub fn name(self) -> &'static str {
        match self {
            Tool::CheckAvailability => "check_availability",
            Tool::BookAppointment => "book_appointment",
            Tool::GetAppointment => "get_appointment",
            Tool::CancelAppointment => "cancel_appointment",
            Tool::ModifyAppointment => "modify_appointment",
            Tool::GetDoctorInfo => "get_doctor_info",
            Tool::GetServicePrice => "get_service_price",
            Tool::GetClinicFaq => "get_clinic_faq",
        }
    }

    pub fn declaration(self) -> ToolDeclaration {
        const DATE: &str = "Date in YYYY-MM-DD format";
        const PHONE: &str = "Customer phone number";

        let (description, parameters) = match self {
            Tool::CheckAvailability => (
                "Check which appointment slots are already booked on a specific date.",
                Some(string_schema(&[("date", DATE)])),
            ),
            Tool::BookAppointment => (
                "Book a new appointment.",
                Some(string_schema(&[
                    ("name", "Customer name"),
                    ("phone", PHONE),
                    ("date", DATE),
                    ("time", "Time of day, e.g. 10:00 AM"),
                ])),
            ),
            Tool::GetAppointment => (
                "Look up the appointments booked under a phone number.",
                Some(string_schema(&[("phone", PHONE)])),
            ),
            Tool::CancelAppointment => (
                "Cancel the appointment booked under a phone number on a date.",
                Some(string_schema(&[("phone", PHONE), ("date", DATE)])),
            ),
            Tool::ModifyAppointment => (
                "Move an existing appointment to a new date and time.",
                Some(string_schema(&[
                    ("phone", PHONE),
                    ("oldDate", "Current appointment date in YYYY-MM-DD format"),
                    ("newDate", "New date in YYYY-MM-DD format"),
                    ("newTime", "New time of day, e.g. 4:00 PM"),
                ])),
            ),
            Tool::GetDoctorInfo => ("List the doctors, their specialties and availability.", None),
            Tool::GetServicePrice => ("List the services offered with prices.", None),
            Tool::GetClinicFaq => ("List frequently asked questions and answers.", None),
        };

        ToolDeclaration {
            name: self.name(),
            description,
            parameters,
        }
    }
}

/// The set of tools a session exposes to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
}

impl ToolCatalog {
    pub fn booking_only() -> Self {
        Self {
            tools: BOOKING_TOOLS.to_vec(),
        }
    }

    pub fn with_knowledge_base() -> Self {
        let mut tools = BOOKING_TOOLS.to_vec();
        tools.extend(KNOWLEDGE_TOOLS);
        Self { tools }
    }

    pub fn for_business(business: &Business) -> Self {
        if business.knowledge_base {
            Self::with_knowledge_base()
        } else {
            Self::booking_only()
        }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools.iter().map(|t| t.declaration()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }
}

/// Models sometimes send phone numbers as JSON numbers.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Raw::deserialize(d)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "name", content = "args", rename_all = "snake_case")]
pub enum ToolCall {
    CheckAvailability {
        date: String,
    },
    BookAppointment {
        name: String,
        #[serde(deserialize_with = "lenient_string")]
        phone: String,
        date: String,
        time: String,
    },
    GetAppointment {
        #[serde(deserialize_with = "lenient_string")]
        phone: String,
    },
    CancelAppointment {
        #[serde(deserialize_with = "lenient_string")]
        phone: String,
        date: String,
    },
    ModifyAppointment {
        #[serde(deserialize_with = "lenient_string")]
        phone: String,
        #[serde(rename = "oldDate")]
        old_date: String,
        #[serde(rename = "newDate")]
        new_date: String,
        #[serde(rename = "newTime")]
        new_time: String,
    },
    GetDoctorInfo {},
    GetServicePrice {},
    GetClinicFaq {},
}

impl ToolCall {
    /// Validates `name` against `catalog` and `args` against the tool's
    /// argument schema. Either failure is fatal for the session.
    pub fn parse(catalog: &ToolCatalog, name: &str, args: &Value) -> anyhow::Result<Self> {
        anyhow::ensure!(catalog.contains(name), "unknown tool: {name}");

        let args = match args {
            Value::Null => json!({}),
            other => other.clone(),
        };
        serde_json::from_value(json!({ "name": name, "args": args }))
            .with_context(|| format!("invalid arguments for {name}"))
    }

    pub fn tool(&self) -> Tool {
        match self {
            ToolCall::CheckAvailability { .. } => Tool::CheckAvailability,
            ToolCall::BookAppointment { .. } => Tool::BookAppointment,
            ToolCall::GetAppointment { .. } => Tool::GetAppointment,
            ToolCall::CancelAppointment { .. } => Tool::CancelAppointment,
            ToolCall::ModifyAppointment { .. } => Tool::ModifyAppointment,
            ToolCall::GetDoctorInfo {} => Tool::GetDoctorInfo,
            ToolCall::GetServicePrice {} => Tool::GetServicePrice,
            ToolCall::GetClinicFaq {} => Tool::GetClinicFaq,
        }
    }
}

/// Store failures become `{"error": ...}` results for the model to explain.
fn outcome<T: Serialize>(result: Result<T, StoreError>) -> anyhow::Result<Value> {
    match result {
        Ok(value) => Ok(serde_json::to_value(value)?),
        Err(e) => Ok(e.to_json()),
    }
}

/// Runs `call` against the stores of the business whose spreadsheet is `sheet_id`.
pub async fn dispatch(
    appointments: &AppointmentStore,
    knowledge_base: &KnowledgeBase,
    sheet_id: &str,
    call: &ToolCall,
) -> anyhow::Result<Value> {
    match call {
        ToolCall::CheckAvailability { date } => {
            outcome(appointments.check_availability(sheet_id, date).await)
        }
        ToolCall::BookAppointment {
            name,
            phone,
            date,
            time,
        } => outcome(
            appointments
                .book_appointment(sheet_id, name, phone, date, time)
                .await,
        ),
        ToolCall::GetAppointment { phone } => {
            outcome(appointments.get_appointment(sheet_id, phone).await)
        }
        ToolCall::CancelAppointment { phone, date } => {
            outcome(appointments.cancel_appointment(sheet_id, phone, date).await)
        }
        ToolCall::ModifyAppointment {
            phone,
            old_date,
            new_date,
            new_time,
        } => outcome(
            appointments
                .modify_appointment(sheet_id, phone, old_date, new_date, new_time)
                .await,
        ),
        ToolCall::GetDoctorInfo {} => outcome(knowledge_base.get_doctors(sheet_id).await),
        ToolCall::GetServicePrice {} => outcome(knowledge_base.get_services(sheet_id).await),
        ToolCall::GetClinicFaq {} => outcome(knowledge_base.get_faq(sheet_id).await),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::db;
    use crate::services::sheets::local::LocalSheets;
    use crate::services::sheets::SheetBackend;

    const SHEET: &str = "sheet-1";

    fn stores() -> (AppointmentStore, KnowledgeBase) {
        let conn = db::init_db(":memory:").unwrap();
        let sheets: Arc<dyn SheetBackend> = Arc::new(LocalSheets::new(Arc::new(Mutex::new(conn))));
        (
            AppointmentStore::new(sheets.clone(), false),
            KnowledgeBase::new(sheets),
        )
    }

    #[test]
    fn test_catalogs() {
        let booking = ToolCatalog::booking_only();
        assert_eq!(booking.tools().len(), 5);
        assert!(!booking.contains("get_doctor_info"));

        let full = ToolCatalog::with_knowledge_base();
        assert_eq!(full.tools().len(), 8);
        let names: Vec<&str> = full.declarations().iter().map(|d| d.name).collect();
        assert!(names.contains(&"get_clinic_faq"));
    }

    #[test]
    fn test_declared_arguments() {
        let decl = Tool::ModifyAppointment.declaration();
        let params = decl.parameters.unwrap();
        assert_eq!(
            params["required"],
            json!(["phone", "oldDate", "newDate", "newTime"])
        );
        assert!(Tool::GetServicePrice.declaration().parameters.is_none());
    }

    #[test]
    fn test_parse_modify_uses_camel_case_args() {
        let catalog = ToolCatalog::booking_only();
        let call = ToolCall::parse(
            &catalog,
            "modify_appointment",
            &json!({"phone": 99999999, "oldDate": "2025-12-25", "newDate": "2025-12-26", "newTime": "4:00 PM"}),
        )
        .unwrap();

        assert_eq!(
            call,
            ToolCall::ModifyAppointment {
                phone: "99999999".to_string(),
                old_date: "2025-12-25".to_string(),
                new_date: "2025-12-26".to_string(),
                new_time: "4:00 PM".to_string(),
            }
        );
        assert_eq!(call.tool(), Tool::ModifyAppointment);
    }

    #[test]
    fn test_parse_rejects_unknown_and_malformed() {
        let catalog = ToolCatalog::booking_only();
        assert!(ToolCall::parse(&catalog, "drop_tables", &json!({})).is_err());
        assert!(ToolCall::parse(&catalog, "get_clinic_faq", &Value::Null).is_err());
        assert!(ToolCall::parse(&catalog, "check_availability", &json!({})).is_err());

        let full = ToolCatalog::with_knowledge_base();
        assert_eq!(
            ToolCall::parse(&full, "get_clinic_faq", &Value::Null).unwrap(),
            ToolCall::GetClinicFaq {}
        );
    }

    #[tokio::test]
    async fn test_dispatch_book_then_lookup() {
        let (appointments, kb) = stores();
        let book = ToolCall::BookAppointment {
            name: "Sara".to_string(),
            phone: "99999999".to_string(),
            date: "2025-12-25".to_string(),
            time: "10:00 AM".to_string(),
        };
        let res = dispatch(&appointments, &kb, SHEET, &book).await.unwrap();
        assert_eq!(res["success"], true);

        let lookup = ToolCall::GetAppointment {
            phone: "99999999".to_string(),
        };
        let res = dispatch(&appointments, &kb, SHEET, &lookup).await.unwrap();
        assert_eq!(res["appointments"][0]["time"], "10:00 AM");
    }

    #[tokio::test]
    async fn test_store_errors_become_results() {
        let (appointments, kb) = stores();
        let cancel = ToolCall::CancelAppointment {
            phone: "99999999".to_string(),
            date: "2025-12-25".to_string(),
        };
        let res = dispatch(&appointments, &kb, SHEET, &cancel).await.unwrap();
        assert_eq!(res, json!({"error": "Appointment not found."}));
    }

    #[tokio::test]
    async fn test_knowledge_tools_return_collections() {
        let (appointments, kb) = stores();
        let res = dispatch(&appointments, &kb, SHEET, &ToolCall::GetDoctorInfo {})
            .await
            .unwrap();
        assert_eq!(res, json!([]));
    }
}
