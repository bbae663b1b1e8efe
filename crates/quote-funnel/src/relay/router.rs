use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::funnel::submission::SubmissionPayload;

use super::message::ContactMessage;
use super::service::MailRelayService;
use super::transport::MailTransport;
use super::RelayError;

/// Relay endpoints: the contact form, funnel lead intake and the relay health probe.
pub fn relay_router<T>(service: Arc<MailRelayService<T>>) -> Router
where
    T: MailTransport + 'static,
{
    Router::new()
        .route("/api/send", post(send_handler::<T>))
        .route("/api/health", get(health_handler::<T>))
        .route("/api/v1/quote/leads", post(lead_handler::<T>))
        .with_state(service)
}

pub(crate) async fn send_handler<T>(
    State(service): State<Arc<MailRelayService<T>>>,
    body: Option<Json<ContactMessage>>,
) -> Response
where
    T: MailTransport + 'static,
{
    let message = body.map(|Json(message)| message).unwrap_or_default();
    match service.relay_contact(&message).await {
        Ok(receipt) => {
            let payload = json!({
                "success": true,
                "message": "Email sent successfully",
                "messageId": receipt.message_id,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => failure(&err),
    }
}

pub(crate) async fn lead_handler<T>(
    State(service): State<Arc<MailRelayService<T>>>,
    body: Option<Json<SubmissionPayload>>,
) -> Response
where
    T: MailTransport + 'static,
{
    let Some(Json(payload)) = body else {
        return failure(&RelayError::Validation("A submission payload is required"));
    };
    match service.relay_lead(&payload).await {
        Ok(receipt) => {
            let payload = json!({
                "success": true,
                "messageId": receipt.message_id,
            });
            (StatusCode::ACCEPTED, Json(payload)).into_response()
        }
        Err(err) => failure(&err),
    }
}

pub(crate) async fn health_handler<T>(State(service): State<Arc<MailRelayService<T>>>) -> Response
where
    T: MailTransport + 'static,
{
    (StatusCode::OK, Json(service.health())).into_response()
}

fn failure(err: &RelayError) -> Response {
    let payload = json!({
        "success": false,
        "error": err.public_message(),
    });
    (err.status(), Json(payload)).into_response()
}
