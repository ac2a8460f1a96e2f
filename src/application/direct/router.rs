//! Outbound routing of OCHPdirect messages (provider and operator side)
//!
//! SelectEvse, ControlEvse and ReleaseEvse go to the operator endpoint
//! serving the EVSE; InformProvider goes to the provider endpoint serving
//! the contract. Every failure comes back as a result, never as an error.
//!
//! The server does not build a router: it ships no HTTP client. An embedder
//! that sends OCHPdirect requests supplies its own [`OchpTransport`] and
//! shares the node's endpoint registry:
//!
//! ```ignore
//! let router = DirectRouter::new(handle.handler.endpoints.clone(), Arc::new(MyTransport::new()));
//! let reply = router.select_evse(&request, Utc::now()).await;
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::application::endpoints::SharedEndpointRegistry;
use crate::application::ports::OchpTransport;
use crate::codec::envelope;
use crate::codec::messages::{
    ControlEvseRequest, ControlEvseResponse, InformProviderRequest, InformProviderResponse,
    ReleaseEvseRequest, ReleaseEvseResponse, SelectEvseRequest, SelectEvseResponse,
};
use crate::codec::{OchpMessage, OchpResponse, OchpResult};
use crate::domain::{EndpointRegistration, EndpointRole, EvseId};

pub struct DirectRouter {
    registry: SharedEndpointRegistry,
    transport: Arc<dyn OchpTransport>,
}

impl DirectRouter {
    pub fn new(registry: SharedEndpointRegistry, transport: Arc<dyn OchpTransport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub async fn select_evse(&self, request: &SelectEvseRequest, now: DateTime<Utc>) -> SelectEvseResponse {
        let endpoint = self.registry.lookup_operator(&request.evse_id);
        self.dispatch(EndpointRole::Operator, endpoint, &request.evse_id.to_string(), request, now)
            .await
    }

    /// `evse_id` is the EVSE the session was selected on.
    pub async fn control_evse(
        &self,
        evse_id: &EvseId,
        request: &ControlEvseRequest,
        now: DateTime<Utc>,
    ) -> ControlEvseResponse {
        let endpoint = self.registry.lookup_operator(evse_id);
        self.dispatch(EndpointRole::Operator, endpoint, &evse_id.to_string(), request, now)
            .await
    }

    pub async fn release_evse(
        &self,
        evse_id: &EvseId,
        request: &ReleaseEvseRequest,
        now: DateTime<Utc>,
    ) -> ReleaseEvseResponse {
        let endpoint = self.registry.lookup_operator(evse_id);
        self.dispatch(EndpointRole::Operator, endpoint, &evse_id.to_string(), request, now)
            .await
    }

    pub async fn inform_provider(
        &self,
        request: &InformProviderRequest,
        now: DateTime<Utc>,
    ) -> InformProviderResponse {
        let endpoint = self.registry.lookup_provider(&request.contract_id);
        self.dispatch(EndpointRole::Provider, endpoint, &request.contract_id.to_string(), request, now)
            .await
    }

    async fn dispatch<Req, Resp>(
        &self,
        role: EndpointRole,
        endpoint: Option<EndpointRegistration>,
        routed_by: &str,
        request: &Req,
        now: DateTime<Utc>,
    ) -> Resp
    where
        Req: OchpMessage,
        Resp: OchpResponse,
    {
        let Some(endpoint) = endpoint else {
            warn!(%role, id = routed_by, action = Req::NAME, "No endpoint to route to");
            return Resp::from_result(OchpResult::invalid_id(format!(
                "no {} endpoint serves {}",
                role, routed_by
            )));
        };

        if !endpoint.is_valid_at(now) {
            warn!(%role, url = endpoint.url.as_str(), "Endpoint registration has expired");
            return Resp::from_result(OchpResult::not_authorized(format!(
                "endpoint {} expired at {}",
                endpoint.url, endpoint.valid_date
            )));
        }

        info!(%role, url = endpoint.url.as_str(), action = Req::NAME, "📤 Routing direct message");
        let reply = match self.transport.send(&endpoint, envelope::wrap_message(request)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(url = endpoint.url.as_str(), error = %e, "Transport failure");
                return Resp::from_result(OchpResult::server(e.to_string()));
            }
        };

        match envelope::unwrap_message::<Resp>(&reply) {
            Ok(response) => response,
            Err(e) => {
                warn!(url = endpoint.url.as_str(), error = %e, "Undecodable reply");
                Resp::from_result(OchpResult::format(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::endpoints::EndpointRegistry;
    use crate::application::ports::TransportError;
    use crate::codec::ResultCode;
    use crate::domain::{ContractId, DirectId, DirectOperation, SessionTelemetry};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    /// Records what was sent and answers with a canned reply.
    struct RecordingTransport {
        reply: Result<String, TransportError>,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingTransport {
        fn replying(reply: Result<String, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl OchpTransport for RecordingTransport {
        async fn send(
            &self,
            endpoint: &EndpointRegistration,
            envelope: String,
        ) -> Result<String, TransportError> {
            self.sent.lock().unwrap().push((endpoint.url.clone(), envelope));
            self.reply.clone()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn registry(valid_date: DateTime<Utc>) -> SharedEndpointRegistry {
        let registry = EndpointRegistry::new();
        for (role, url, pattern) in [
            (EndpointRole::Operator, "https://cpo.example/direct", "DE*GEF"),
            (EndpointRole::Provider, "https://emp.example/direct", "DE-GDF"),
        ] {
            registry.upsert(EndpointRegistration {
                role,
                url: url.into(),
                namespace_url: "http://ochp.eu/1.4".into(),
                access_token: "token".into(),
                valid_date,
                whitelist: vec![pattern.into()],
                blacklist: Vec::new(),
            });
        }
        Arc::new(registry)
    }

    fn select_request(evse: &str) -> SelectEvseRequest {
        SelectEvseRequest {
            evse_id: EvseId::parse(evse).unwrap(),
            contract_id: Some(ContractId::parse("DE-GDF-123456789-1").unwrap()),
            reserve_until: None,
        }
    }

    #[tokio::test]
    async fn select_goes_to_the_operator_and_decodes_the_reply() {
        let reply = SelectEvseResponse {
            result: OchpResult::ok(),
            direct_id: Some(DirectId::parse("D1").unwrap()),
            ttl: Some(t0() + Duration::minutes(5)),
        };
        let transport = RecordingTransport::replying(Ok(envelope::wrap_message(&reply)));
        let router = DirectRouter::new(registry(t0() + Duration::days(1)), transport.clone());

        let resp = router.select_evse(&select_request("DE*GEF*E1"), t0()).await;
        assert_eq!(resp, reply);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "https://cpo.example/direct");
        assert!(sent[0].1.contains("<ns:SelectEvseRequest>"));
    }

    #[tokio::test]
    async fn inform_goes_to_the_provider() {
        let reply = InformProviderResponse {
            result: OchpResult::ok(),
        };
        let transport = RecordingTransport::replying(Ok(envelope::wrap_message(&reply)));
        let router = DirectRouter::new(registry(t0() + Duration::days(1)), transport.clone());

        let req = InformProviderRequest {
            message: DirectOperation::Start,
            evse_id: EvseId::parse("DE*GEF*E1").unwrap(),
            contract_id: ContractId::parse("DEGDF1234567891").unwrap(),
            direct_id: DirectId::parse("D1").unwrap(),
            ttl: None,
            telemetry: SessionTelemetry::default(),
        };
        assert!(router.inform_provider(&req, t0()).await.result.is_ok());
        assert_eq!(transport.sent.lock().unwrap()[0].0, "https://emp.example/direct");
    }

    #[tokio::test]
    async fn unroutable_ids_are_invalid_id() {
        let transport = RecordingTransport::replying(Ok(String::new()));
        let router = DirectRouter::new(registry(t0() + Duration::days(1)), transport.clone());
        let resp = router.select_evse(&select_request("AT*XYZ*E1"), t0()).await;
        assert_eq!(resp.result.code, ResultCode::InvalidId);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_registration_is_not_authorized() {
        let transport = RecordingTransport::replying(Ok(String::new()));
        let router = DirectRouter::new(registry(t0() - Duration::days(1)), transport.clone());
        let req = ReleaseEvseRequest {
            direct_id: DirectId::parse("D1").unwrap(),
        };
        let resp = router
            .release_evse(&EvseId::parse("DE*GEF*E1").unwrap(), &req, t0())
            .await;
        assert_eq!(resp.result.code, ResultCode::NotAuthorized);
    }

    #[tokio::test]
    async fn transport_and_decode_failures_become_results() {
        let evse = EvseId::parse("DE*GEF*E1").unwrap();
        let control = ControlEvseRequest {
            direct_id: DirectId::parse("D1").unwrap(),
            operation: DirectOperation::End,
            limits: Default::default(),
        };

        let down = RecordingTransport::replying(Err(TransportError::Timeout("https://cpo.example/direct".into())));
        let router = DirectRouter::new(registry(t0() + Duration::days(1)), down);
        assert_eq!(router.control_evse(&evse, &control, t0()).await.result.code, ResultCode::Server);

        let garbage = RecordingTransport::replying(Ok("<html>oops</html>".into()));
        let router = DirectRouter::new(registry(t0() + Duration::days(1)), garbage);
        assert_eq!(router.control_evse(&evse, &control, t0()).await.result.code, ResultCode::Format);
    }
}
