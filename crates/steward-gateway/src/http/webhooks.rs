//! Webhook ingress (C13) — spec.md §4.13's full path table. Every handler
//! returns within a few milliseconds; nothing here blocks on the AI router —
//! inbound traffic is handed to `AppState::handle` (the `InboundSink`
//! pipeline), which runs the actual C9→C8→C7→C5/C4 dispatch in a spawned task.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{info, warn};

use steward_channels::InboundSink;
use steward_core::config::WebhookAuthMode;
use steward_core::types::{Attachment, ChatId, InboundMessage, Platform, UserId};

use crate::app::{authorized, AppState};

type HmacSha256 = Hmac<Sha256>;

fn auth_error(reason: &str) -> (StatusCode, Json<Value>) {
    warn!(reason, "webhook authentication failed");
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "authentication failed", "reason": reason})))
}

fn verify_hmac_sha256(headers: &HeaderMap, body: &[u8], secret: Option<&str>) -> Result<(), String> {
    let secret = secret.ok_or_else(|| "no HMAC secret configured for this source".to_string())?;
    let sig_header = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing X-Hub-Signature-256 header".to_string())?;
    let sig_hex = sig_header
        .strip_prefix("sha256=")
        .ok_or_else(|| "malformed X-Hub-Signature-256 header".to_string())?;
    let expected = hex::decode(sig_hex).map_err(|_| "X-Hub-Signature-256 is not valid hex".to_string())?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| "invalid HMAC key length".to_string())?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| "HMAC signature mismatch".to_string())
}

fn verify_bearer_token(headers: &HeaderMap, secret: Option<&str>) -> Result<(), String> {
    let expected = secret.ok_or_else(|| "no bearer token configured for this source".to_string())?;
    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing Authorization header".to_string())?;
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| "Authorization header must use Bearer scheme".to_string())?;
    if token == expected {
        Ok(())
    } else {
        Err("bearer token mismatch".to_string())
    }
}

fn verify_source(state: &AppState, source_name: &str, headers: &HeaderMap, body: &[u8]) -> Result<(), String> {
    let cfg = &state.config.webhooks;
    if !cfg.enabled {
        return Err("webhook subsystem is disabled".to_string());
    }
    let source = match cfg.sources.iter().find(|s| s.name == source_name) {
        Some(s) => s,
        None => return Ok(()), // unconfigured source: no auth requirement, operator's choice
    };
    match &source.auth_mode {
        WebhookAuthMode::HmacSha256 => verify_hmac_sha256(headers, body, source.secret.as_deref()),
        WebhookAuthMode::BearerToken => verify_bearer_token(headers, source.secret.as_deref()),
        WebhookAuthMode::None => Ok(()),
    }
}

// ── POST /webhook — secondary platform inbound ──────────────────────────────

#[derive(Debug, Deserialize)]
struct SecondaryInboundPayload {
    id: Option<String>,
    chat_id: String,
    user_id: String,
    text: Option<String>,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

pub async fn secondary_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    verify_source(&state, "secondary", &headers, &body).map_err(|e| auth_error(&e))?;

    let payload: SecondaryInboundPayload = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "secondary webhook: invalid JSON body");
        (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid JSON body"})))
    })?;

    let msg = InboundMessage {
        id: payload.id.unwrap_or_else(steward_core::types::random_id),
        platform: Platform::Secondary,
        chat_id: ChatId(payload.chat_id),
        user_id: UserId(payload.user_id),
        text: payload.text,
        voice_url: None,
        attachments: payload.attachments,
        received_at: Utc::now(),
    };

    // Unauthorized users: silent drop, no reply (spec.md §7).
    if !authorized(&state.config, &msg.user_id) {
        warn!(user_id = %msg.user_id, "secondary webhook: unauthorized user, dropping");
        return Ok(Json(json!({"ok": true, "ignored": true})));
    }

    let state2 = Arc::clone(&state);
    tokio::spawn(async move {
        state2.handle(msg).await;
    });

    Ok(Json(json!({"ok": true})))
}

// ── POST /telegram — primary platform inbound (webhook mode) ───────────────

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    chat: TelegramChat,
    from: Option<TelegramUser>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TelegramUser {
    id: i64,
}

pub async fn telegram_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    verify_source(&state, "primary", &headers, &body).map_err(|e| auth_error(&e))?;

    let update: TelegramUpdate = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "telegram webhook: invalid JSON body");
        (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid JSON body"})))
    })?;

    let Some(message) = update.message else {
        return Ok(Json(json!({"ok": true, "ignored": true})));
    };
    let Some(from) = message.from else {
        return Ok(Json(json!({"ok": true, "ignored": true})));
    };
    let Some(text) = message.text else {
        return Ok(Json(json!({"ok": true, "ignored": true})));
    };

    let msg = InboundMessage {
        id: message.message_id.to_string(),
        platform: Platform::Primary,
        chat_id: ChatId(message.chat.id.to_string()),
        user_id: UserId(from.id.to_string()),
        text: Some(text),
        voice_url: None,
        attachments: Vec::new(),
        received_at: Utc::now(),
    };

    // Unauthorized users: silent drop, no reply (spec.md §7). The long-poll
    // path enforces this in `primary::handler::handle_message`; this webhook
    // path has no allowlist check of its own until now.
    if !authorized(&state.config, &msg.user_id) {
        warn!(user_id = %msg.user_id, "telegram webhook: unauthorized user, dropping");
        return Ok(Json(json!({"ok": true, "ignored": true})));
    }

    let state2 = Arc::clone(&state);
    tokio::spawn(async move {
        state2.handle(msg).await;
    });

    Ok(Json(json!({"ok": true})))
}

// ── POST /github-webhook — repo-provider events, 5-min delivery dedup ──────

pub async fn github_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    verify_source(&state, "github", &headers, &body).map_err(|e| auth_error(&e))?;

    let delivery_id = headers
        .get("x-github-delivery")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !delivery_id.is_empty() && state.github_delivery_seen(&delivery_id) {
        info!(delivery_id, "github webhook: duplicate delivery, dropping");
        return Ok(Json(json!({"ok": true, "duplicate": true})));
    }

    let event = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "github webhook: invalid JSON body");
        (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid JSON body"})))
    })?;

    let repo = payload
        .get("repository")
        .and_then(|r| r.get("full_name"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown repo")
        .to_string();

    info!(event = %event, repo = %repo, delivery_id, "github webhook accepted");

    if let Some(hq_chat_id) = state.config.hq_chat_id.clone() {
        let body_text = crate::status::info(&format!("{event} on {repo}"), Platform::Primary);
        let state2 = Arc::clone(&state);
        tokio::spawn(async move {
            let chat_id = ChatId(hq_chat_id);
            let _ = state2.channels.send_text("primary", &chat_id, &body_text).await;
        });
    }

    Ok(Json(json!({"ok": true, "event": event})))
}

// ── POST /voice/* — outbound-call TwiML, speech recognition, status callbacks ─

/// Voice webhooks speak TwiML/form-encoded bodies, not JSON — this accepts
/// any path under `/voice/` and replies with an empty, valid TwiML document.
/// Speech transcription routing into the dispatch pipeline is left for a
/// dedicated voice adapter; none is implemented here.
pub async fn voice_handler(Path(path): Path<String>, _headers: HeaderMap, _body: Bytes) -> axum::response::Response {
    info!(path, "voice webhook received");
    axum::response::Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/xml")
        .body(axum::body::Body::from("<Response></Response>"))
        .unwrap()
}

// ── /api/* — authenticated REST ─────────────────────────────────────────────

fn check_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), String> {
    let expected = state
        .config
        .webhooks
        .api_key
        .as_deref()
        .ok_or_else(|| "no API key configured".to_string())?;
    let got = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing X-API-Key header".to_string())?;
    if got == expected {
        Ok(())
    } else {
        Err("API key mismatch".to_string())
    }
}

/// GET/POST /api/*. Minimal authenticated REST surface: `jobs` (scheduler)
/// and `chats` (chat registry) — the two entities an operator needs to
/// inspect without direct DB access.
pub async fn api_handler(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    check_api_key(&state, &headers).map_err(|e| auth_error(&e))?;

    match path.as_str() {
        "jobs" => {
            let jobs = state
                .scheduler
                .list_jobs()
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))))?;
            Ok(Json(json!({"jobs": jobs.iter().map(|j| j.id.clone()).collect::<Vec<_>>()})))
        }
        "chats" => {
            let chats = state.registry.list();
            Ok(Json(json!({"count": chats.len()})))
        }
        other => Err((StatusCode::NOT_FOUND, Json(json!({"error": format!("unknown API path: {other}")})))),
    }
}
