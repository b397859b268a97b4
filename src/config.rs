use std::env;

use chrono_tz::Tz;

/// What to do with a message whose `To` address matches no registered business.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutingFallback {
    Reject,
    FirstRegistered,
    Fixed(String),
}

impl RoutingFallback {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "" | "reject" | "none" => RoutingFallback::Reject,
            "first" => RoutingFallback::FirstRegistered,
            key => RoutingFallback::Fixed(key.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SheetsBackendKind {
    Google,
    Local,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_username: String,
    pub admin_password: String,
    pub auth_secret: String,
    pub llm_provider: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_whatsapp_number: String,
    pub sheets_backend: SheetsBackendKind,
    pub google_sheets_token: String,
    pub routing_fallback: RoutingFallback,
    pub session_idle_minutes: i64,
    pub enforce_booking_conflicts: bool,
    pub reminder_cron: String,
    pub follow_up_cron: String,
    pub scheduler_timezone: Tz,
    pub scheduler_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "receptionist.db".to_string()),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "changeme".to_string()),
            auth_secret: env::var("AUTH_SECRET").unwrap_or_else(|_| "changeme".to_string()),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".to_string()),
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            groq_model: env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_whatsapp_number: env::var("TWILIO_WHATSAPP_NUMBER")
                .unwrap_or_else(|_| "whatsapp:+14155238886".to_string()),
            sheets_backend: match env::var("SHEETS_BACKEND").as_deref() {
                Ok("google") => SheetsBackendKind::Google,
                _ => SheetsBackendKind::Local,
            },
            google_sheets_token: env::var("GOOGLE_SHEETS_TOKEN").unwrap_or_default(),
            routing_fallback: RoutingFallback::parse(
                &env::var("ROUTING_FALLBACK").unwrap_or_default(),
            ),
            session_idle_minutes: env::var("SESSION_IDLE_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            enforce_booking_conflicts: env_flag("ENFORCE_BOOKING_CONFLICTS", false),
            reminder_cron: env::var("REMINDER_CRON")
                .unwrap_or_else(|_| "0 0 20 * * * *".to_string()),
            follow_up_cron: env::var("FOLLOW_UP_CRON")
                .unwrap_or_else(|_| "0 0 10 * * * *".to_string()),
            scheduler_timezone: env::var("SCHEDULER_TIMEZONE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(chrono_tz::Asia::Muscat),
            scheduler_enabled: env_flag("SCHEDULER_ENABLED", true),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_fallback_parse() {
        assert_eq!(RoutingFallback::parse(""), RoutingFallback::Reject);
        assert_eq!(RoutingFallback::parse("reject"), RoutingFallback::Reject);
        assert_eq!(RoutingFallback::parse("first"), RoutingFallback::FirstRegistered);
        assert_eq!(
            RoutingFallback::parse("whatsapp:+14155238886"),
            RoutingFallback::Fixed("whatsapp:+14155238886".to_string())
        );
    }
}
