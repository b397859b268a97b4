use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Form;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::services::conversation;
use crate::state::AppState;

const WEBHOOK_PATH: &str = "/whatsapp";

/// Twilio signs the full URL followed by every POST parameter, sorted by name.
fn validate_twilio_signature(
    auth_token: &str,
    signature: &str,
    url: &str,
    params: &[(String, String)],
) -> bool {
    let mut data = url.to_string();
    let mut sorted_params: Vec<&(String, String)> = params.iter().collect();
    sorted_params.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, value) in sorted_params {
        data.push_str(key);
        data.push_str(value);
    }

    let Ok(mut mac) = Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()) else {
        return false;
    };
    mac.update(data.as_bytes());
    let Ok(signature) = base64::engine::general_purpose::STANDARD.decode(signature) else {
        return false;
    };
    mac.verify_slice(&signature).is_ok()
}

fn webhook_url(headers: &HeaderMap) -> String {
    // Behind a proxy the public URL comes from X-Forwarded-*.
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("https");
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get("host"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{proto}://{host}{WEBHOOK_PATH}")
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> &'a str {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.trim())
        .unwrap_or("")
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn twiml_response(reply: &str) -> Response {
    (
        [(header::CONTENT_TYPE, "application/xml")],
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
            escape_xml(reply)
        ),
    )
        .into_response()
}

// POST /whatsapp
pub async fn whatsapp_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(params): Form<Vec<(String, String)>>,
) -> Response {
    // Skipped when no auth token is configured (local development).
    if !state.config.twilio_auth_token.is_empty() {
        let signature = headers
            .get("x-twilio-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if signature.is_empty() {
            tracing::warn!("missing X-Twilio-Signature header");
            return (StatusCode::FORBIDDEN, "Missing signature").into_response();
        }

        let url = webhook_url(&headers);
        if !validate_twilio_signature(&state.config.twilio_auth_token, signature, &url, &params) {
            tracing::warn!(url = %url, "invalid Twilio signature");
            return (StatusCode::FORBIDDEN, "Invalid signature").into_response();
        }
    }

    let from = param(&params, "From");
    let to = param(&params, "To");
    let body = param(&params, "Body");
    tracing::info!(from = %from, to = %to, body = %body, "incoming WhatsApp message");

    let reply = conversation::process_message(&state, from, to, body).await;
    twiml_response(&reply)
}
