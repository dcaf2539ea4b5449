pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};

use crate::documents::handlers as documents;
use crate::import::handlers as imports;
use crate::profile::handlers as profile;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // Import preview sessions
        .route("/api/v1/imports", post(imports::handle_open))
        .route("/api/v1/imports/parse", post(imports::handle_parse_text))
        .route("/api/v1/imports/parse/pdf", post(imports::handle_parse_pdf))
        .route("/api/v1/imports/:id", get(imports::handle_get))
        .route(
            "/api/v1/imports/:id/entries/:entry_id",
            patch(imports::handle_edit_field).delete(imports::handle_remove_entry),
        )
        .route(
            "/api/v1/imports/:id/entries/:entry_id/edit",
            post(imports::handle_begin_edit),
        )
        .route(
            "/api/v1/imports/:id/done-editing",
            post(imports::handle_done_editing),
        )
        .route("/api/v1/imports/:id/mode", put(imports::handle_set_mode))
        .route(
            "/api/v1/imports/:id/replace-confirmation",
            put(imports::handle_set_replace_confirmation),
        )
        .route("/api/v1/imports/:id/confirm", post(imports::handle_confirm))
        .route("/api/v1/imports/:id/cancel", post(imports::handle_cancel))
        .route("/api/v1/imports/:id/retry", post(imports::handle_retry))
        // Stored profile
        .route("/api/v1/profile/:section", get(profile::handle_get_section))
        // Generated documents
        .route(
            "/api/v1/documents/parse",
            post(documents::handle_parse_document),
        )
        .layer(body_limit)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::Config;
    use crate::errors::AppError;
    use crate::import::registry::SessionRegistry;
    use crate::import::ReconcileMode;
    use crate::llm_client::{LlmError, TextGenerator};
    use crate::models::entry::{ParsedEntry, SectionType, SkillEntry};
    use crate::profile::store::SavedSection;
    use crate::profile::{MemoryProfileStore, ProfileStore};

    const EDUCATION_REPLY: &str = r#"```json
{
  "entries": [
    {"degree": "BSc", "institution": "MIT", "field": "Computer Science",
     "startYear": 2012, "endYear": 2016},
    {"degree": "MSc", "institution": "ETH Zurich", "field": "Computer Science",
     "startYear": "2016", "endYear": 2018, "gpa": "3,9"}
  ],
  "uncertainties": [
    {"entryIndex": 1, "field": "gpa", "reason": "Decimal comma, unclear scale"}
  ]
}
```"#;

    struct Canned(&'static str);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    /// Reads fine, never writes.
    struct ReadOnlyStore;

    #[async_trait]
    impl ProfileStore for ReadOnlyStore {
        async fn load(
            &self,
            _user_id: Uuid,
            _section: SectionType,
        ) -> Result<Vec<ParsedEntry>, AppError> {
            Ok(vec![])
        }

        async fn merge(
            &self,
            _user_id: Uuid,
            _section: SectionType,
            _mode: ReconcileMode,
            _imported: Vec<ParsedEntry>,
        ) -> Result<SavedSection, AppError> {
            Err(AppError::Internal(anyhow::anyhow!("store is read-only")))
        }
    }

    fn test_app(profiles: Arc<dyn ProfileStore>) -> Router {
        build_router(AppState {
            llm: Arc::new(Canned(EDUCATION_REPLY)),
            profiles,
            sessions: Arc::new(SessionRegistry::new(Duration::from_secs(60))),
            config: Config {
                database_url: None,
                anthropic_api_key: "test-key".to_string(),
                port: 0,
                rust_log: "info".to_string(),
                session_ttl: Duration::from_secs(60),
                max_upload_bytes: 1024 * 1024,
            },
        })
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        send_request(app, request).await
    }

    async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// POST to the PDF endpoint with the given multipart fields, in order.
    fn pdf_upload(fields: &[(&str, &[u8])]) -> Request<Body> {
        const BOUNDARY: &str = "cv-upload-boundary";
        let mut body = Vec::new();
        for (name, value) in fields {
            let filename = if *name == "file" {
                "; filename=\"cv.pdf\""
            } else {
                ""
            };
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"{filename}\r\n\r\n")
                    .as_bytes(),
            );
            body.extend_from_slice(value);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/v1/imports/parse/pdf")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn open_skills(app: &Router, user_id: Uuid, names: &[&str]) -> Value {
        let entries: Vec<Value> = names
            .iter()
            .map(|name| json!({"type": "skill", "name": name}))
            .collect();
        let (status, view) = send(
            app,
            "POST",
            "/api/v1/imports",
            Some(json!({"userId": user_id, "sectionType": "skills", "entries": entries})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        view
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app(Arc::new(MemoryProfileStore::new()));
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["openImports"], 0);

        open_skills(&app, Uuid::new_v4(), &["Rust"]).await;
        let (_, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(body["openImports"], 1);
    }

    #[tokio::test]
    async fn test_parse_edit_confirm_flow() {
        let app = test_app(Arc::new(MemoryProfileStore::new()));
        let user_id = Uuid::new_v4();

        let (status, view) = send(
            &app,
            "POST",
            "/api/v1/imports/parse",
            Some(json!({
                "userId": user_id,
                "sectionType": "education",
                "rawText": "BSc CS, MIT 2012-2016\nMSc CS, ETH 2016-2018, GPA 3,9"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["parsedCount"], 2);
        assert_eq!(view["activeUncertainties"], 1);
        assert_eq!(view["entries"][1]["uncertainties"][0]["field"], "gpa");
        assert_eq!(view["mode"], "add");
        assert_eq!(view["canConfirm"], true);
        let id = view["sessionId"].as_str().unwrap().to_string();

        // Editing requires edit mode.
        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/api/v1/imports/{id}/entries/1"),
            Some(json!({"field": "gpa", "value": "3.9"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, view) =
            send(&app, "POST", &format!("/api/v1/imports/{id}/entries/1/edit"), None).await;
        assert_eq!(view["state"]["kind"], "editing_entry");
        assert_eq!(view["state"]["entryId"], 1);

        let (status, view) = send(
            &app,
            "PATCH",
            &format!("/api/v1/imports/{id}/entries/1"),
            Some(json!({"field": "gpa", "value": "3.9"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["activeUncertainties"], 0);
        assert_eq!(view["entries"][1]["entry"]["gpa"], "3.9");

        let (_, view) =
            send(&app, "POST", &format!("/api/v1/imports/{id}/done-editing"), None).await;
        assert_eq!(view["state"]["kind"], "reviewing");

        let (status, confirmed) =
            send(&app, "POST", &format!("/api/v1/imports/{id}/confirm"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(confirmed["saved"], true);
        assert_eq!(confirmed["imported"], 2);
        assert_eq!(confirmed["total"], 2);

        let (_, stored) = send(
            &app,
            "GET",
            &format!("/api/v1/profile/education?userId={user_id}"),
            None,
        )
        .await;
        assert_eq!(stored["count"], 2);
        assert_eq!(stored["entries"][0]["institution"], "MIT");

        // Confirm closed the session.
        let (status, _) = send(&app, "GET", &format!("/api/v1/imports/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_puts_new_entries_first() {
        let store = Arc::new(MemoryProfileStore::new());
        let user_id = Uuid::new_v4();
        let stored = ParsedEntry::Skill(SkillEntry {
            name: "COBOL".to_string(),
            ..Default::default()
        });
        store
            .merge(user_id, SectionType::Skills, ReconcileMode::Add, vec![stored])
            .await
            .unwrap();
        let app = test_app(store);

        let view = open_skills(&app, user_id, &["Rust"]).await;
        assert_eq!(view["existingCount"], 1);
        let id = view["sessionId"].as_str().unwrap().to_string();

        let (_, confirmed) =
            send(&app, "POST", &format!("/api/v1/imports/{id}/confirm"), None).await;
        let names: Vec<&str> = confirmed["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Rust", "COBOL"]);
    }

    #[tokio::test]
    async fn test_replace_requires_confirmation() {
        let store = Arc::new(MemoryProfileStore::new());
        let user_id = Uuid::new_v4();
        let existing: Vec<ParsedEntry> = ["Go", "SQL", "Perl"]
            .iter()
            .map(|name| {
                ParsedEntry::Skill(SkillEntry {
                    name: name.to_string(),
                    ..Default::default()
                })
            })
            .collect();
        store
            .merge(user_id, SectionType::Skills, ReconcileMode::Replace, existing)
            .await
            .unwrap();
        let app = test_app(store);

        let view = open_skills(&app, user_id, &["Rust"]).await;
        assert_eq!(view["existingCount"], 3);
        let id = view["sessionId"].as_str().unwrap().to_string();

        let (_, view) = send(
            &app,
            "PUT",
            &format!("/api/v1/imports/{id}/mode"),
            Some(json!({"mode": "replace"})),
        )
        .await;
        assert_eq!(view["showReplaceConfirmation"], true);
        assert_eq!(view["canConfirm"], false);
        assert_eq!(view["confirmBlocker"], "replace_not_confirmed");

        let (status, _) = send(&app, "POST", &format!("/api/v1/imports/{id}/confirm"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, view) = send(
            &app,
            "PUT",
            &format!("/api/v1/imports/{id}/replace-confirmation"),
            Some(json!({"confirmed": true})),
        )
        .await;
        assert_eq!(view["canConfirm"], true);

        // Leaving replace and coming back clears the checkbox.
        send(
            &app,
            "PUT",
            &format!("/api/v1/imports/{id}/mode"),
            Some(json!({"mode": "add"})),
        )
        .await;
        let (_, view) = send(
            &app,
            "PUT",
            &format!("/api/v1/imports/{id}/mode"),
            Some(json!({"mode": "replace"})),
        )
        .await;
        assert_eq!(view["replaceConfirmed"], false);
        assert_eq!(view["canConfirm"], false);

        send(
            &app,
            "PUT",
            &format!("/api/v1/imports/{id}/replace-confirmation"),
            Some(json!({"confirmed": true})),
        )
        .await;
        let (status, confirmed) =
            send(&app, "POST", &format!("/api/v1/imports/{id}/confirm"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(confirmed["mode"], "replace");
        assert_eq!(confirmed["total"], 1);

        let (_, stored) = send(
            &app,
            "GET",
            &format!("/api/v1/profile/skills?user_id={user_id}"),
            None,
        )
        .await;
        assert_eq!(stored["count"], 1);
        assert_eq!(stored["entries"][0]["name"], "Rust");
    }

    #[tokio::test]
    async fn test_removing_every_entry_leaves_only_retry() {
        let app = test_app(Arc::new(MemoryProfileStore::new()));
        let user_id = Uuid::new_v4();
        let view = open_skills(&app, user_id, &["Rust"]).await;
        let id = view["sessionId"].as_str().unwrap().to_string();

        let (status, view) =
            send(&app, "DELETE", &format!("/api/v1/imports/{id}/entries/0"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["entries"], json!([]));
        assert_eq!(view["actions"], json!(["retry"]));
        assert_eq!(view["canConfirm"], false);
        assert_eq!(view["confirmBlocker"], "nothing_to_import");

        let (status, retry) =
            send(&app, "POST", &format!("/api/v1/imports/{id}/retry"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(retry["section"], "skills");
        assert_eq!(retry["userId"], json!(user_id));

        let (status, _) = send(&app, "POST", &format!("/api/v1/imports/{id}/cancel"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_discards_session() {
        let app = test_app(Arc::new(MemoryProfileStore::new()));
        let view = open_skills(&app, Uuid::new_v4(), &["Rust"]).await;
        let id = view["sessionId"].as_str().unwrap().to_string();

        let (status, body) =
            send(&app, "POST", &format!("/api/v1/imports/{id}/cancel"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = send(&app, "GET", &format!("/api/v1/imports/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_edit_of_wrong_section_field_is_rejected() {
        let app = test_app(Arc::new(MemoryProfileStore::new()));
        let view = open_skills(&app, Uuid::new_v4(), &["Rust"]).await;
        let id = view["sessionId"].as_str().unwrap().to_string();

        send(&app, "POST", &format!("/api/v1/imports/{id}/entries/0/edit"), None).await;
        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/api/v1/imports/{id}/entries/0"),
            Some(json!({"field": "degree", "value": "PhD"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) =
            send(&app, "POST", &format!("/api/v1/imports/{id}/entries/7/edit"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_save_reports_unsaved_and_closes() {
        let app = test_app(Arc::new(ReadOnlyStore));
        let view = open_skills(&app, Uuid::new_v4(), &["Rust"]).await;
        let id = view["sessionId"].as_str().unwrap().to_string();

        let (status, confirmed) =
            send(&app, "POST", &format!("/api/v1/imports/{id}/confirm"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(confirmed["saved"], false);

        let (status, _) = send(&app, "GET", &format!("/api/v1/imports/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let app = test_app(Arc::new(MemoryProfileStore::new()));
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/imports/parse",
            Some(json!({"userId": Uuid::new_v4(), "sectionType": "skills", "rawText": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parse_cover_letter_document() {
        let app = test_app(Arc::new(MemoryProfileStore::new()));
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/documents/parse",
            Some(json!({
                "kind": "cover_letter",
                "text": "Dear Team,\n\nI would love to join.\n\nBest regards,\nSam"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "cover_letter");
        assert_eq!(body["document"]["greeting"], "Dear Team,");
        assert_eq!(body["document"]["signature"], json!(["Sam"]));
    }

    #[tokio::test]
    async fn test_concurrent_confirms_keep_both_imports() {
        let store = Arc::new(MemoryProfileStore::new());
        let app = test_app(store.clone());
        let user_id = Uuid::new_v4();

        let first = open_skills(&app, user_id, &["Rust"]).await;
        let second = open_skills(&app, user_id, &["Go"]).await;
        let confirm_uri = |view: &Value| {
            let id = view["sessionId"].as_str().unwrap();
            format!("/api/v1/imports/{id}/confirm")
        };
        let (first_uri, second_uri) = (confirm_uri(&first), confirm_uri(&second));

        let ((s1, c1), (s2, c2)) = tokio::join!(
            send(&app, "POST", &first_uri, None),
            send(&app, "POST", &second_uri, None)
        );
        assert_eq!((s1, s2), (StatusCode::OK, StatusCode::OK));
        assert_eq!(c1["saved"], true);
        assert_eq!(c2["saved"], true);

        let stored = store.load(user_id, SectionType::Skills).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_pdf_upload_without_file_is_rejected() {
        let app = test_app(Arc::new(MemoryProfileStore::new()));
        let user_id = Uuid::new_v4().to_string();
        let request = pdf_upload(&[
            ("userId", user_id.as_bytes()),
            ("sectionType", b"skills"),
        ]);

        let (status, body) = send_request(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_pdf_upload_of_non_pdf_is_unprocessable() {
        let app = test_app(Arc::new(MemoryProfileStore::new()));
        let user_id = Uuid::new_v4().to_string();
        let request = pdf_upload(&[
            ("userId", user_id.as_bytes()),
            ("sectionType", b"education"),
            ("file", b"BSc CS, MIT 2012-2016"),
        ]);

        let (status, body) = send_request(&app, request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNPROCESSABLE_ENTITY");

        let (_, health) = send(&app, "GET", "/health", None).await;
        assert_eq!(health["openImports"], 0);
    }

    #[tokio::test]
    async fn test_pdf_upload_with_unknown_section_is_rejected() {
        let app = test_app(Arc::new(MemoryProfileStore::new()));
        let user_id = Uuid::new_v4().to_string();
        let request = pdf_upload(&[
            ("userId", user_id.as_bytes()),
            ("sectionType", b"hobbies"),
            ("file", b"%PDF-1.4"),
        ]);

        let (status, body) = send_request(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
