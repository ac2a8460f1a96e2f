//! OCHP message handlers
//!
//! Each service group has its own handler module.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::application::OchpHandler;
use crate::codec::{OchpMessage, OchpResponse, OchpResult, XmlElement};

mod handle_authorisation;
mod handle_direct;
mod handle_endpoints;
mod handle_status;

pub use handle_authorisation::{
    handle_set_roaming_authorisation_list, handle_update_roaming_authorisation_list,
};
pub use handle_direct::{
    handle_control_evse, handle_get_evse_status, handle_inform_provider, handle_release_evse,
    handle_report_discrepancy, handle_select_evse,
};
pub use handle_endpoints::{handle_add_service_endpoints, handle_get_service_endpoints};
pub use handle_status::{handle_get_status, handle_update_status};

/// Routes an OCHP body to its handler. `None` for unknown messages.
pub fn ochp_action_matcher(
    handler: &OchpHandler,
    body: &XmlElement,
    now: DateTime<Utc>,
) -> Option<XmlElement> {
    let reply = match body.name.as_str() {
        // ===== Clearing house services =====
        "UpdateStatusRequest" => {
            respond(body, |req| handle_update_status(handler, req, now))
        }
        "GetStatusRequest" => respond(body, |req| handle_get_status(handler, req, now)),
        "SetRoamingAuthorisationListRequest" => respond(body, |req| {
            handle_set_roaming_authorisation_list(handler, req, now)
        }),
        "UpdateRoamingAuthorisationListRequest" => respond(body, |req| {
            handle_update_roaming_authorisation_list(handler, req, now)
        }),
        "AddServiceEndpointsRequest" => {
            respond(body, |req| handle_add_service_endpoints(handler, req))
        }
        "GetServiceEndpointsRequest" => {
            respond(body, |req| handle_get_service_endpoints(handler, req))
        }

        // ===== OCHPdirect =====
        "SelectEvseRequest" => respond(body, |req| handle_select_evse(handler, req, now)),
        "ControlEvseRequest" => respond(body, |req| handle_control_evse(handler, req, now)),
        "ReleaseEvseRequest" => respond(body, |req| handle_release_evse(handler, req, now)),
        "GetEvseStatusRequest" => {
            respond(body, |req| handle_get_evse_status(handler, req, now))
        }
        "ReportDiscrepancyRequest" => {
            respond(body, |req| handle_report_discrepancy(handler, req, now))
        }
        "InformProviderRequest" => {
            respond(body, |req| handle_inform_provider(handler, req, now))
        }

        _ => return None,
    };
    Some(reply)
}

/// Decode the request, run the handler, encode the response. A decode
/// failure becomes the response's result.
fn respond<Req, Resp>(body: &XmlElement, handle: impl FnOnce(Req) -> Resp) -> XmlElement
where
    Req: OchpMessage,
    Resp: OchpResponse,
{
    match Req::decode(body) {
        Ok(request) => handle(request).encode(),
        Err(e) => {
            warn!(action = Req::NAME, error = %e, "Rejecting malformed request");
            Resp::from_result(OchpResult::from(&e)).encode()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::authorisation::RoamingAuthorisationService;
    use crate::application::direct::{DirectSessionService, DirectSettings};
    use crate::application::endpoints::EndpointRegistry;
    use crate::application::events::{create_event_bus, Event};
    use crate::application::status::StatusService;
    use crate::codec::messages::*;
    use crate::codec::ResultCode;
    use crate::domain::DirectSessionState;
    use chrono::{Duration, TimeZone};
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

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn call<Resp: OchpMessage>(handler: &OchpHandler, xml: &str, now: DateTime<Utc>) -> Resp {
        let body = XmlElement::parse(xml).unwrap();
        let reply = ochp_action_matcher(handler, &body, now).expect("known message");
        Resp::decode(&reply).unwrap()
    }

    #[test]
    fn unknown_messages_are_not_matched() {
        let body = XmlElement::parse("<HeartbeatRequest/>").unwrap();
        assert!(ochp_action_matcher(&handler(), &body, t0()).is_none());
    }

    #[test]
    fn status_upload_is_visible_to_get_status_and_evse_status() {
        let h = handler();
        let resp: UpdateStatusResponse = call(
            &h,
            r#"<UpdateStatusRequest>
                 <evse major="available" minor="available"><evseId>DE*GEF*E1</evseId></evse>
                 <parking status="available"><parkingId>DE*GEF*P1</parkingId></parking>
               </UpdateStatusRequest>"#,
            t0(),
        );
        assert!(resp.result.is_ok());

        let all: GetStatusResponse = call(&h, "<GetStatusRequest/>", t0());
        assert_eq!(all.evse.len(), 1);
        assert_eq!(all.parking.len(), 1);

        let direct: GetEvseStatusResponse = call(
            &h,
            "<GetEvseStatusRequest><evseId>DE*GEF*E1</evseId><evseId>DE*GEF*E9</evseId></GetEvseStatusRequest>",
            t0(),
        );
        assert_eq!(direct.evse.len(), 2);
    }

    #[test]
    fn roaming_list_upload_reports_refused_entries() {
        let h = handler();
        let resp: SetRoamingAuthorisationListResponse = call(
            &h,
            r#"<SetRoamingAuthorisationListRequest>
                 <roamingAuthorisationInfoArray>
                   <EmtId representation="plain"><instance>AABBCCDD</instance><tokenType>rfid</tokenType><tokenSubType>mifareCls</tokenSubType></EmtId>
                   <contractId>DE-GDF-123456789-1</contractId>
                   <expiryDate><DateTime>2030-01-01T00:00:00Z</DateTime></expiryDate>
                 </roamingAuthorisationInfoArray>
                 <roamingAuthorisationInfoArray>
                   <EmtId representation="plain"><instance>11223344</instance><tokenType>rfid</tokenType></EmtId>
                   <contractId>DE-GDF-987654321-1</contractId>
                   <expiryDate><DateTime>2020-01-01T00:00:00Z</DateTime></expiryDate>
                 </roamingAuthorisationInfoArray>
               </SetRoamingAuthorisationListRequest>"#,
            t0(),
        );
        assert_eq!(resp.result.code, ResultCode::Partly);
        assert_eq!(resp.refused.len(), 1);
        assert_eq!(h.authorisation.count(), 1);
    }

    #[test]
    fn direct_session_lifecycle_through_the_matcher() {
        let h = handler();
        let selected: SelectEvseResponse = call(
            &h,
            "<SelectEvseRequest><evseId>DE*GEF*E1</evseId><contractId>DE-GDF-123456789-1</contractId></SelectEvseRequest>",
            t0(),
        );
        assert!(selected.result.is_ok());
        let direct_id = selected.direct_id.expect("direct id");
        assert_eq!(selected.ttl, Some(t0() + Duration::minutes(5)));

        let informed: InformProviderResponse = call(
            &h,
            &format!(
                "<InformProviderRequest><message>start</message><evseId>DE*GEF*E1</evseId>\
                 <contractId>DE-GDF-123456789-1</contractId><directId>{}</directId></InformProviderRequest>",
                direct_id
            ),
            t0() + Duration::minutes(1),
        );
        assert!(informed.result.is_ok());
        assert_eq!(
            h.direct.session(&direct_id, t0() + Duration::minutes(1)).unwrap().state(),
            DirectSessionState::Active
        );

        let released: ReleaseEvseResponse = call(
            &h,
            &format!("<ReleaseEvseRequest><directId>{}</directId></ReleaseEvseRequest>", direct_id),
            t0() + Duration::minutes(2),
        );
        assert!(released.result.is_ok());
    }

    #[test]
    fn unknown_direct_id_is_invalid_id() {
        let resp: ControlEvseResponse = call(
            &handler(),
            "<ControlEvseRequest><directId>nope</directId><operation>end</operation></ControlEvseRequest>",
            t0(),
        );
        assert_eq!(resp.result.code, ResultCode::InvalidId);
    }

    #[test]
    fn discrepancy_report_is_published() {
        let h = handler();
        let mut events = h.event_bus.subscribe();
        let resp: ReportDiscrepancyResponse = call(
            &h,
            "<ReportDiscrepancyRequest><evseId>DE*GEF*E1</evseId><report>plug is broken</report></ReportDiscrepancyRequest>",
            t0(),
        );
        assert!(resp.result.is_ok());
        let message = events.try_recv().expect("event");
        assert!(matches!(message.event, Event::DiscrepancyReported(ref e) if e.report == "plug is broken"));
    }

    #[test]
    fn endpoints_round_trip_through_the_registry() {
        let h = handler();
        let added: AddServiceEndpointsResponse = call(
            &h,
            r#"<AddServiceEndpointsRequest>
                 <operatorEndpointArray>
                   <url>https://cpo.example/direct</url>
                   <namespaceUrl>http://ochp.eu/1.4</namespaceUrl>
                   <accessToken>secret</accessToken>
                   <validDate><DateTime>2030-01-01T00:00:00Z</DateTime></validDate>
                   <whitelist>DE*GEF</whitelist>
                 </operatorEndpointArray>
               </AddServiceEndpointsRequest>"#,
            t0(),
        );
        assert!(added.result.is_ok());

        let listed: GetServiceEndpointsResponse = call(&h, "<GetServiceEndpointsRequest/>", t0());
        assert_eq!(listed.endpoints.len(), 1);
        assert_eq!(listed.endpoints[0].url, "https://cpo.example/direct");
    }
}
