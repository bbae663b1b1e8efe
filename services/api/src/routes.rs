use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use quote_funnel::error::AppError;
use quote_funnel::funnel::{Answers, Catalog, EstimateRange, PricingModel};
use quote_funnel::relay::{relay_router, MailRelayService, MailTransport};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EstimateResponse {
    pub(crate) currency: String,
    pub(crate) page_count: usize,
    pub(crate) estimate: Option<EstimateRange>,
    pub(crate) description: Option<String>,
}

pub(crate) fn with_service_routes<T>(relay: Arc<MailRelayService<T>>) -> Router
where
    T: MailTransport + 'static,
{
    relay_router(relay)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/quote/estimate",
            axum::routing::post(estimate_endpoint),
        )
        .fallback(not_found)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Price a set of answers. Unknown fields and options are ignored.
pub(crate) async fn estimate_endpoint(
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<EstimateResponse>, AppError> {
    let catalog = Catalog::standard();
    let answers = Answers::from_untrusted(&payload, &catalog);
    Ok(Json(estimate_response(&answers, &PricingModel::standard())))
}

pub(crate) fn estimate_response(answers: &Answers, model: &PricingModel) -> EstimateResponse {
    let estimate = model.estimate(answers);
    EstimateResponse {
        currency: model.currency.clone(),
        page_count: PricingModel::page_count(answers),
        description: estimate.map(|range| range.describe(&model.currency)),
        estimate,
    }
}

pub(crate) async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "Endpoint not found" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use quote_funnel::config::MailSettings;
    use quote_funnel::relay::{OutgoingMail, TransportError};
    use serde_json::Value;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct CapturingTransport {
        sent: Mutex<Vec<OutgoingMail>>,
    }

    #[async_trait]
    impl MailTransport for CapturingTransport {
        async fn send(&self, mail: OutgoingMail) -> Result<String, TransportError> {
            self.sent.lock().expect("transport mutex poisoned").push(mail);
            Ok("<demo@relay>".to_string())
        }
    }

    fn configured_router() -> Router {
        with_service_routes(Arc::new(MailRelayService::new(
            CapturingTransport::default(),
            "inbox@example.ge",
        )))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    #[tokio::test]
    async fn estimate_endpoint_prices_posted_answers() {
        let Json(body) = estimate_endpoint(Json(json!({
            "websiteType": "informational",
            "features": ["contact_form", "made_up"]
        })))
        .await
        .expect("estimate builds");

        let estimate = body.estimate.expect("estimate present");
        // (900 + 50) * 0.85 = 807.5 -> 810
        assert_eq!(estimate.current_min, 810);
        assert_eq!(body.currency, "GEL");
        assert!(body.description.expect("description").contains("GEL"));
    }

    #[tokio::test]
    async fn estimate_without_website_type_is_empty() {
        let Json(body) = estimate_endpoint(Json(json!({ "businessType": "retail" })))
            .await
            .expect("estimate builds");
        assert!(body.estimate.is_none());
        assert!(body.description.is_none());
    }

    #[tokio::test]
    async fn unknown_routes_return_json_404() {
        let response = configured_router()
            .oneshot(
                Request::get("/api/nowhere")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("Endpoint not found"));
    }

    #[tokio::test]
    async fn send_route_relays_valid_messages() {
        let response = configured_router()
            .oneshot(post_json(
                "/api/send",
                json!({
                    "name": "Nino",
                    "email": "nino@example.ge",
                    "subject": "New site",
                    "message": "Hello"
                }),
            ))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["messageId"], json!("<demo@relay>"));
    }

    #[tokio::test]
    async fn send_route_rejects_incomplete_messages() {
        let response = configured_router()
            .oneshot(post_json("/api/send", json!({ "name": "Nino" })))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("All fields are required"));
    }

    #[tokio::test]
    async fn unconfigured_relay_reports_server_configuration_error() {
        let router = with_service_routes(Arc::new(
            MailRelayService::<CapturingTransport>::unconfigured(&MailSettings::default()),
        ));
        let response = router
            .oneshot(post_json(
                "/api/send",
                json!({
                    "name": "Nino",
                    "email": "nino@example.ge",
                    "subject": "New site",
                    "message": "Hello"
                }),
            ))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("Server configuration error"));
    }

    #[tokio::test]
    async fn relay_health_reports_configuration_flags_only() {
        let settings = MailSettings {
            host: Some("smtp.example.ge".to_string()),
            user: Some("relay@example.ge".to_string()),
            ..MailSettings::default()
        };
        let router = with_service_routes(Arc::new(
            MailRelayService::<CapturingTransport>::unconfigured(&settings),
        ));
        let response = router
            .oneshot(
                Request::get("/api/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], json!("OK"));
        assert_eq!(body["environment"]["smtp_configured"], json!(true));
        assert_eq!(body["environment"]["to_email_configured"], json!(false));
        assert!(!body.to_string().contains("smtp.example.ge"));
    }
}
