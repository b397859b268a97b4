use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::ai::LlmProvider;
use crate::services::appointments::AppointmentStore;
use crate::services::conversation::SessionManager;
use crate::services::knowledge_base::KnowledgeBase;
use crate::services::messaging::MessagingProvider;
use crate::services::registry::BusinessRegistry;
use crate::services::sheets::SheetBackend;

pub struct AppState {
    pub config: AppConfig,
    pub registry: BusinessRegistry,
    pub appointments: AppointmentStore,
    pub knowledge_base: KnowledgeBase,
    pub sessions: SessionManager,
    pub llm: Box<dyn LlmProvider>,
    pub messaging: Box<dyn MessagingProvider>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: Arc<Mutex<Connection>>,
        sheets: Arc<dyn SheetBackend>,
        llm: Box<dyn LlmProvider>,
        messaging: Box<dyn MessagingProvider>,
    ) -> Self {
        Self {
            registry: BusinessRegistry::new(db, config.routing_fallback.clone()),
            appointments: AppointmentStore::new(sheets.clone(), config.enforce_booking_conflicts),
            knowledge_base: KnowledgeBase::new(sheets),
            sessions: SessionManager::new(chrono::Duration::minutes(config.session_idle_minutes)),
            llm,
            messaging,
            config,
        }
    }
}
