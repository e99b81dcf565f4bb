use super::WebState;
use crate::domain::{ContactForm, ContactFormError, ContactPayload, ValidationError};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Serialize)]
struct ApiResponse {
    status: &'static str,
    message: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<ValidationError>,
}

impl ApiResponse {
    const fn success() -> Self {
        Self {
            status: "success",
            message: "Message success send!",
            errors: Vec::new(),
        }
    }

    const fn invalid(errors: Vec<ValidationError>) -> Self {
        Self {
            status: "error",
            message: "Validation failed",
            errors,
        }
    }

    const fn internal() -> Self {
        Self {
            status: "error",
            message: "Internal error",
            errors: Vec::new(),
        }
    }
}

/// `POST /contact`: validate, store, notify admins.
pub async fn contact(
    State(state): State<Arc<WebState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<ContactPayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            debug!(client = %addr.ip(), error = %rejection, "Unreadable contact body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::invalid(vec![ValidationError::malformed_body()])),
            )
                .into_response();
        }
    };

    let form = match ContactForm::try_from(payload) {
        Ok(form) => form,
        Err(ContactFormError(errors)) => {
            debug!(client = %addr.ip(), errors = errors.len(), "Contact form rejected");
            return (StatusCode::BAD_REQUEST, Json(ApiResponse::invalid(errors))).into_response();
        }
    };

    match state.contacts.submit(&form).await {
        Ok((stored, report)) => {
            info!(
                client = %addr.ip(),
                message_id = stored.id,
                notified = report.delivered,
                "Contact message accepted"
            );
            (StatusCode::OK, Json(ApiResponse::success())).into_response()
        }
        Err(e) => {
            error!(client = %addr.ip(), error = %e, "Failed to store contact message");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::internal())).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::services::ContactService;
    use crate::tg_bot::transport::testing::RecordingTransport;
    use crate::types::{LanguageCode, TelegramId};
    use axum::body::{Body, to_bytes};
    use axum::extract::FromRequest;
    use axum::http::{Request, header};
    use serde_json::{Value, json};

    async fn state() -> (Arc<WebState>, Database, Arc<RecordingTransport>) {
        let db = Database::in_memory().await.expect("db");
        let transport = RecordingTransport::new();
        let contacts = ContactService::new(db.clone(), transport.clone(), LanguageCode::default());
        (Arc::new(WebState { contacts }), db, transport)
    }

    fn client() -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000)))
    }

    async fn parse(body: &str) -> Result<Json<ContactPayload>, JsonRejection> {
        let request = Request::builder()
            .method("POST")
            .uri("/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        Json::<ContactPayload>::from_request(request, &()).await
    }

    async fn call(state: Arc<WebState>, body: &str) -> (StatusCode, Value) {
        let response = contact(State(state), client(), parse(body).await).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn valid_submission_is_stored_and_forwarded() {
        let (state, db, transport) = state().await;
        db.start_session(TelegramId::new(1), None).await.expect("start");
        db.mark_authenticated(TelegramId::new(1), None, None)
            .await
            .expect("auth");

        let (status, body) = call(
            state,
            r#"{"fullName":"Ali","phone":"+998901234567","telegram":"@ali","message":"Salom"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"status": "success", "message": "Message success send!"})
        );
        let stored = db.latest_contact_message().await.expect("latest").expect("row");
        assert_eq!(stored.full_name, "Ali");
        assert_eq!(stored.telegram.as_deref(), Some("ali"));
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn every_invalid_field_is_reported() {
        let (state, db, _transport) = state().await;

        let (status, body) = call(
            state,
            r#"{"fullName":"   ","phone":"12345","message":"hi"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "status": "error",
                "message": "Validation failed",
                "errors": [
                    {"field": "fullName", "rule": "not_empty"},
                    {"field": "phone", "rule": "mobile_phone"}
                ]
            })
        );
        assert_eq!(db.count_contact_messages().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let (state, _db, _transport) = state().await;

        let (status, body) = call(state, "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"], json!([{"field": "body", "rule": "json"}]));
    }

    #[tokio::test]
    async fn storage_failure_is_an_internal_error() {
        let (state, db, transport) = state().await;
        db.close().await;

        let (status, body) = call(
            state,
            r#"{"fullName":"Ali","phone":"901234567","message":"Salom"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"status": "error", "message": "Internal error"}));
        assert!(transport.calls().is_empty());
    }
}
