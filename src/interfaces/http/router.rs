//! HTTP router

use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::application::OchpHandler;

use super::handlers::{health, sessions, soap};

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<OchpHandler>,
    pub started_at: Arc<Instant>,
}

impl AppState {
    pub fn new(handler: Arc<OchpHandler>) -> Self {
        Self {
            handler,
            started_at: Arc::new(Instant::now()),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // SOAP services
        .route("/ochp", post(soap::ochp_soap))
        .route("/ochp/direct", post(soap::ochp_soap))
        // Inspection
        .route("/health", get(health::health_check))
        .route("/direct/sessions/{id}", get(sessions::get_session))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::authorisation::RoamingAuthorisationService;
    use crate::application::direct::{DirectSessionService, DirectSettings};
    use crate::application::endpoints::EndpointRegistry;
    use crate::application::events::create_event_bus;
    use crate::application::status::StatusService;
    use crate::codec::envelope;
    use crate::codec::messages::{GetEvseStatusRequest, GetEvseStatusResponse, SelectEvseRequest};
    use crate::domain::{ContractId, EvseId, EvseMajorStatus};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> (Router, Arc<OchpHandler>) {
        let bus = create_event_bus();
        let handler = Arc::new(OchpHandler::new(
            Arc::new(StatusService::with_event_bus(bus.clone())),
            Arc::new(RoamingAuthorisationService::new()),
            Arc::new(EndpointRegistry::with_event_bus(bus.clone())),
            Arc::new(DirectSessionService::with_event_bus(DirectSettings::default(), bus.clone())),
            bus,
        ));
        (create_router(AppState::new(handler.clone())), handler)
    }

    fn soap_post(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "text/xml")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["direct_sessions"], 0);
    }

    #[tokio::test]
    async fn soap_request_gets_soap_response() {
        let (app, _) = app();
        let request = GetEvseStatusRequest {
            evse_ids: vec![EvseId::parse("DE*GEF*E1").unwrap()],
        };
        let response = app
            .oneshot(soap_post("/ochp/direct", envelope::wrap_message(&request)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/xml; charset=utf-8"
        );

        let reply: GetEvseStatusResponse = envelope::unwrap_message(&body_text(response).await).unwrap();
        assert_eq!(reply.evse.len(), 1);
        assert_eq!(reply.evse[0].major(), EvseMajorStatus::Unknown);
    }

    #[tokio::test]
    async fn unknown_message_is_a_500_fault() {
        let (app, _) = app();
        let response = app
            .oneshot(soap_post("/ochp", "<PingRequest/>".into()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("faultstring"));
    }

    #[tokio::test]
    async fn sessions_are_inspectable() {
        let (app, handler) = app();
        let selected = handler.direct.select_evse(
            &SelectEvseRequest {
                evse_id: EvseId::parse("DE*GEF*E1").unwrap(),
                contract_id: Some(ContractId::parse("DE-GDF-123456789-1").unwrap()),
                reserve_until: None,
            },
            chrono::Utc::now(),
        );
        let direct_id = selected.direct_id.unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/direct/sessions/{}", direct_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(direct_id.as_str()));

        let missing = app
            .oneshot(Request::builder().uri("/direct/sessions/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
