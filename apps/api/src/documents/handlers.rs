use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::documents::cover_letter::{parse_cover_letter, CoverLetter};
use crate::documents::cv::{parse_cv, CvDocument};
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Cv,
    CoverLetter,
}

#[derive(Debug, Deserialize)]
pub struct ParseDocumentRequest {
    pub kind: DocumentKind,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "document", rename_all = "snake_case")]
pub enum ParsedDocument {
    Cv(CvDocument),
    CoverLetter(CoverLetter),
}

/// POST /api/v1/documents/parse
pub async fn handle_parse_document(
    Json(request): Json<ParseDocumentRequest>,
) -> Result<Json<ParsedDocument>, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    debug!(
        "Structuring {:?} document ({} chars)",
        request.kind,
        request.text.len()
    );
    let document = match request.kind {
        DocumentKind::Cv => ParsedDocument::Cv(parse_cv(&request.text)),
        DocumentKind::CoverLetter => ParsedDocument::CoverLetter(parse_cover_letter(&request.text)),
    };
    Ok(Json(document))
}
