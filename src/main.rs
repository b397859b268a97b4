use std::sync::{Arc, Mutex};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use receptionist::config::{AppConfig, SheetsBackendKind};
use receptionist::db;
use receptionist::services::ai::gemini::GeminiProvider;
use receptionist::services::ai::groq::GroqProvider;
use receptionist::services::ai::LlmProvider;
use receptionist::services::conversation::spawn_session_reaper;
use receptionist::services::messaging::twilio::TwilioWhatsAppProvider;
use receptionist::services::notifications::spawn_scheduler;
use receptionist::services::sheets::google::GoogleSheets;
use receptionist::services::sheets::local::LocalSheets;
use receptionist::services::sheets::SheetBackend;
use receptionist::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    let db = Arc::new(Mutex::new(conn));

    let llm: Box<dyn LlmProvider> = match config.llm_provider.as_str() {
        "groq" => {
            anyhow::ensure!(
                !config.groq_api_key.is_empty(),
                "GROQ_API_KEY must be set when LLM_PROVIDER=groq"
            );
            tracing::info!("using Groq LLM provider (model: {})", config.groq_model);
            Box::new(GroqProvider::new(
                config.groq_api_key.clone(),
                config.groq_model.clone(),
            ))
        }
        _ => {
            anyhow::ensure!(
                !config.gemini_api_key.is_empty(),
                "GEMINI_API_KEY must be set"
            );
            tracing::info!("using Gemini LLM provider (model: {})", config.gemini_model);
            Box::new(GeminiProvider::new(
                config.gemini_api_key.clone(),
                config.gemini_model.clone(),
            ))
        }
    };

    let sheets: Arc<dyn SheetBackend> = match config.sheets_backend {
        SheetsBackendKind::Google => {
            anyhow::ensure!(
                !config.google_sheets_token.is_empty(),
                "GOOGLE_SHEETS_TOKEN must be set when SHEETS_BACKEND=google"
            );
            tracing::info!("using Google Sheets backend");
            Arc::new(GoogleSheets::new(config.google_sheets_token.clone()))
        }
        SheetsBackendKind::Local => {
            tracing::info!("using local SQLite sheet backend");
            Arc::new(LocalSheets::new(Arc::clone(&db)))
        }
    };

    let messaging = TwilioWhatsAppProvider::new(
        config.twilio_account_sid.clone(),
        config.twilio_auth_token.clone(),
        config.twilio_whatsapp_number.clone(),
    );

    let state = Arc::new(AppState::new(
        config.clone(),
        db,
        sheets,
        llm,
        Box::new(messaging),
    ));

    if config.scheduler_enabled {
        spawn_scheduler(Arc::clone(&state))?;
    } else {
        tracing::info!("scheduler disabled");
    }
    spawn_session_reaper(Arc::clone(&state));

    let app = receptionist::app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
