//! OCHP SOAP message handler

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::application::authorisation::SharedRoamingAuthorisationService;
use crate::application::direct::SharedDirectSessionService;
use crate::application::endpoints::SharedEndpointRegistry;
use crate::application::events::SharedEventBus;
use crate::application::handlers::ochp::ochp_action_matcher;
use crate::application::status::SharedStatusService;
use crate::codec::envelope;

/// Reply to one SOAP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapReply {
    pub envelope: String,
    /// The envelope carries a SOAP fault rather than an OCHP response.
    pub is_fault: bool,
}

impl SoapReply {
    fn response(envelope: String) -> Self {
        Self {
            envelope,
            is_fault: false,
        }
    }

    fn fault(reason: &str) -> Self {
        Self {
            envelope: envelope::fault("Client", reason),
            is_fault: true,
        }
    }
}

/// Handler for inbound OCHP and OCHPdirect requests
pub struct OchpHandler {
    pub status: SharedStatusService,
    pub authorisation: SharedRoamingAuthorisationService,
    pub endpoints: SharedEndpointRegistry,
    pub direct: SharedDirectSessionService,
    pub event_bus: SharedEventBus,
}

impl OchpHandler {
    pub fn new(
        status: SharedStatusService,
        authorisation: SharedRoamingAuthorisationService,
        endpoints: SharedEndpointRegistry,
        direct: SharedDirectSessionService,
        event_bus: SharedEventBus,
    ) -> Self {
        Self {
            status,
            authorisation,
            endpoints,
            direct,
            event_bus,
        }
    }

    /// Handle one SOAP request and produce the SOAP reply.
    ///
    /// A known message always gets its own response element, even when the
    /// body is malformed. Only an unparseable envelope or an unknown message
    /// name yields a SOAP fault.
    pub fn handle(&self, text: &str, now: DateTime<Utc>) -> SoapReply {
        debug!(bytes = text.len(), "Received OCHP request");

        let body = match envelope::unwrap(text) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Unreadable SOAP envelope");
                return SoapReply::fault(&e.to_string());
            }
        };

        match ochp_action_matcher(self, &body, now) {
            Some(reply) => SoapReply::response(envelope::wrap(&reply)),
            None => {
                warn!(message = body.name.as_str(), "Unknown OCHP message");
                SoapReply::fault(&format!("unknown message <{}>", body.name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::authorisation::RoamingAuthorisationService;
    use crate::application::direct::{DirectSessionService, DirectSettings};
    use crate::application::endpoints::EndpointRegistry;
    use crate::application::events::create_event_bus;
    use crate::application::status::StatusService;
    use crate::codec::messages::{GetServiceEndpointsResponse, ReleaseEvseResponse};
    use crate::codec::{OchpMessage, ResultCode};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn handler() -> OchpHandler {
        let bus = create_event_bus();
        OchpHandler::new(
            Arc::new(StatusService::with_event_bus(bus.clone())),
            Arc::new(RoamingAuthorisationService::new()),
            Arc::new(EndpointRegistry::with_event_bus(bus.clone())),
            Arc::new(DirectSessionService::with_event_bus(DirectSettings::default(), bus.clone())),
            bus,
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn replies_are_wrapped_in_an_envelope() {
        let reply = handler().handle(
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:ns="http://ochp.eu/1.4">
                 <soapenv:Body><ns:GetServiceEndpointsRequest/></soapenv:Body>
               </soapenv:Envelope>"#,
            now(),
        );
        assert!(!reply.is_fault);
        let resp: GetServiceEndpointsResponse = envelope::unwrap_message(&reply.envelope).unwrap();
        assert!(resp.result.is_ok());
        assert!(resp.endpoints.is_empty());
    }

    #[test]
    fn malformed_known_message_still_gets_its_response() {
        let reply = handler().handle("<ReleaseEvseRequest/>", now());
        assert!(!reply.is_fault);
        let resp: ReleaseEvseResponse = envelope::unwrap_message(&reply.envelope).unwrap();
        assert_eq!(resp.result.code, ResultCode::Format);
        assert_eq!(
            envelope::unwrap(&reply.envelope).unwrap().name,
            ReleaseEvseResponse::NAME
        );
    }

    #[test]
    fn unknown_message_is_a_fault() {
        let reply = handler().handle("<PingRequest/>", now());
        assert!(reply.is_fault);
        let body = envelope::unwrap(&reply.envelope).unwrap();
        assert_eq!(body.name, "Fault");
        assert!(body.child("faultstring").unwrap().text().contains("PingRequest"));
    }

    #[test]
    fn garbage_is_a_fault() {
        let reply = handler().handle("not xml at all <", now());
        assert!(reply.is_fault);
        assert_eq!(envelope::unwrap(&reply.envelope).unwrap().name, "Fault");
    }
}
