//! Axum route handlers for the Import API.

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::import::editor::FieldEdit;
use crate::import::parser::parse_section;
use crate::import::session::RetryRequest;
use crate::import::{EntryId, ImportSession, OpenParams, PreviewView, ReconcileMode};
use crate::models::entry::{ParsedEntry, SectionType, Uncertainty};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseTextRequest {
    pub user_id: Uuid,
    pub section_type: SectionType,
    pub raw_text: String,
}

/// Opens a preview from a parse result produced elsewhere.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenImportRequest {
    pub user_id: Uuid,
    pub section_type: SectionType,
    pub entries: Vec<ParsedEntry>,
    #[serde(default)]
    pub uncertainties: Vec<Uncertainty>,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: ReconcileMode,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceConfirmationRequest {
    pub confirmed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    pub session_id: Uuid,
    pub section: SectionType,
    pub mode: ReconcileMode,
    /// Entries taken from the import.
    pub imported: usize,
    /// Entries in the section after reconciliation; 0 when `saved` is false.
    pub total: usize,
    /// Whether the profile store accepted the write.
    pub saved: bool,
    /// The stored section; empty when `saved` is false.
    pub entries: Vec<ParsedEntry>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/imports/parse
///
/// Parses pasted CV text for one section and opens a preview session on the result.
pub async fn handle_parse_text(
    State(state): State<AppState>,
    Json(request): Json<ParseTextRequest>,
) -> Result<Json<PreviewView>, AppError> {
    let view = parse_and_open(
        &state,
        request.user_id,
        request.section_type,
        request.raw_text,
    )
    .await?;
    Ok(Json(view))
}

/// POST /api/v1/imports/parse/pdf
///
/// Multipart fields: `userId`, `sectionType`, `file` (PDF).
pub async fn handle_parse_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PreviewView>, AppError> {
    let mut user_id: Option<Uuid> = None;
    let mut section: Option<SectionType> = None;
    let mut pdf: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "userId" => {
                let text = read_text_field(field).await?;
                user_id = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| AppError::Validation(format!("Invalid userId '{text}'")))?,
                );
            }
            "sectionType" => {
                let text = read_text_field(field).await?;
                section = Some(text.trim().parse().map_err(AppError::Validation)?);
            }
            "file" => {
                pdf = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("Invalid file upload: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| AppError::Validation("userId is required".to_string()))?;
    let section =
        section.ok_or_else(|| AppError::Validation("sectionType is required".to_string()))?;
    let pdf = pdf.ok_or_else(|| AppError::Validation("file is required".to_string()))?;

    let raw_text = extract_pdf_text(pdf).await?;
    let view = parse_and_open(&state, user_id, section, raw_text).await?;
    Ok(Json(view))
}

/// POST /api/v1/imports
pub async fn handle_open(
    State(state): State<AppState>,
    Json(request): Json<OpenImportRequest>,
) -> Result<Json<PreviewView>, AppError> {
    let existing_count = state
        .profiles
        .count(request.user_id, request.section_type)
        .await?;
    let session = ImportSession::open(OpenParams {
        user_id: request.user_id,
        section: request.section_type,
        entries: request.entries,
        uncertainties: request.uncertainties,
        existing_count,
        source_text: None,
    })?;
    Ok(Json(state.sessions.insert(session).await))
}

/// GET /api/v1/imports/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PreviewView>, AppError> {
    Ok(Json(state.sessions.view(id).await?))
}

/// POST /api/v1/imports/:id/entries/:entry_id/edit
pub async fn handle_begin_edit(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, EntryId)>,
) -> Result<Json<PreviewView>, AppError> {
    let (_, view) = state
        .sessions
        .update(id, |s| s.begin_edit(entry_id))
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/imports/:id/done-editing
pub async fn handle_done_editing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PreviewView>, AppError> {
    let (_, view) = state
        .sessions
        .update(id, |s| {
            s.done_editing();
            Ok(())
        })
        .await?;
    Ok(Json(view))
}

/// PATCH /api/v1/imports/:id/entries/:entry_id
///
/// Body: one `FieldEdit`, e.g. `{"field": "degree", "value": "MSc"}`.
pub async fn handle_edit_field(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, EntryId)>,
    Json(edit): Json<FieldEdit>,
) -> Result<Json<PreviewView>, AppError> {
    let (_, view) = state
        .sessions
        .update(id, |s| s.apply_edit(entry_id, edit))
        .await?;
    Ok(Json(view))
}

/// DELETE /api/v1/imports/:id/entries/:entry_id
pub async fn handle_remove_entry(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, EntryId)>,
) -> Result<Json<PreviewView>, AppError> {
    let (_, view) = state
        .sessions
        .update(id, |s| s.remove_entry(entry_id))
        .await?;
    Ok(Json(view))
}

/// PUT /api/v1/imports/:id/mode
pub async fn handle_set_mode(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ModeRequest>,
) -> Result<Json<PreviewView>, AppError> {
    let (_, view) = state
        .sessions
        .update(id, |s| {
            s.set_mode(request.mode);
            Ok(())
        })
        .await?;
    Ok(Json(view))
}

/// PUT /api/v1/imports/:id/replace-confirmation
pub async fn handle_set_replace_confirmation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReplaceConfirmationRequest>,
) -> Result<Json<PreviewView>, AppError> {
    let (_, view) = state
        .sessions
        .update(id, |s| {
            s.set_replace_confirmed(request.confirmed);
            Ok(())
        })
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/imports/:id/confirm
///
/// Closes the session and merges its entries into the stored section in one store step.
/// A failed write is reported as `saved: false`; the session is closed either way.
pub async fn handle_confirm(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfirmResponse>, AppError> {
    let ((user_id, section), _) = state
        .sessions
        .update(id, |s| Ok((s.user_id(), s.section())))
        .await?;
    let existing_count = state.profiles.count(user_id, section).await?;

    let session = state
        .sessions
        .take_if(id, |s| {
            s.set_existing_count(existing_count);
            s.ensure_confirmable()
        })
        .await?;
    let confirmed = session.confirm()?;
    let imported = confirmed.entries.len();

    let (saved, entries) = match state
        .profiles
        .merge(user_id, section, confirmed.mode, confirmed.entries)
        .await
    {
        Ok(stored) => {
            info!(
                "Import {id}: {section} for user {user_id} now has {} entries (v{})",
                stored.entries.len(),
                stored.version
            );
            (true, stored.entries)
        }
        Err(e) => {
            error!("Import {id}: failed to store {section} for user {user_id}: {e}");
            (false, Vec::new())
        }
    };

    Ok(Json(ConfirmResponse {
        session_id: id,
        section,
        mode: confirmed.mode,
        imported,
        total: entries.len(),
        saved,
        entries,
    }))
}

/// POST /api/v1/imports/:id/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.take(id).await?.cancel();
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/imports/:id/retry
///
/// Closes the session and hands back what the caller needs to run the parse step again.
pub async fn handle_retry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RetryRequest>, AppError> {
    Ok(Json(state.sessions.take(id).await?.retry()))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn parse_and_open(
    state: &AppState,
    user_id: Uuid,
    section: SectionType,
    raw_text: String,
) -> Result<PreviewView, AppError> {
    let parsed = parse_section(&raw_text, section, state.llm.as_ref()).await?;
    let existing_count = state.profiles.count(user_id, section).await?;

    let session = ImportSession::open(OpenParams {
        user_id,
        section,
        entries: parsed.data,
        uncertainties: parsed.uncertainties,
        existing_count,
        source_text: Some(raw_text),
    })?;
    Ok(state.sessions.insert(session).await)
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart field: {e}")))
}

/// pdf-extract is synchronous and CPU-bound.
async fn extract_pdf_text(pdf: Bytes) -> Result<String, AppError> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF extraction task failed: {e}")))?
        .map_err(|e| AppError::UnprocessableEntity(format!("Could not read PDF: {e}")))?;

    if text.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "The PDF contains no extractable text".to_string(),
        ));
    }
    Ok(text)
}
