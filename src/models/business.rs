use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEZONE: &str = "Asia/Muscat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    /// Routing key: the WhatsApp address customers write to.
    pub phone_number: String,
    pub name: String,
    pub system_instruction: String,
    /// Store location: the spreadsheet holding this business's records.
    pub sheet_id: String,
    pub timezone: String,
    pub knowledge_base: bool,
}

impl Business {
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::Asia::Muscat)
    }
}

/// Admin payload for create and update. Update applies only the fields present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInput {
    pub phone_number: Option<String>,
    pub name: Option<String>,
    pub system_instruction: Option<String>,
    pub sheet_id: Option<String>,
    pub timezone: Option<String>,
    pub knowledge_base: Option<bool>,
}
