//! OCHPdirect handlers

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::application::events::{DiscrepancyReportedEvent, Event};
use crate::application::OchpHandler;
use crate::codec::messages::{
    ControlEvseRequest, ControlEvseResponse, GetEvseStatusRequest, GetEvseStatusResponse,
    InformProviderRequest, InformProviderResponse, ReleaseEvseRequest, ReleaseEvseResponse,
    ReportDiscrepancyRequest, ReportDiscrepancyResponse, SelectEvseRequest, SelectEvseResponse,
};
use crate::codec::OchpResult;

pub fn handle_select_evse(
    handler: &OchpHandler,
    request: SelectEvseRequest,
    now: DateTime<Utc>,
) -> SelectEvseResponse {
    info!(
        evse_id = %request.evse_id,
        contract_id = ?request.contract_id.as_ref().map(ToString::to_string),
        reserve_until = ?request.reserve_until,
        "SelectEvse"
    );
    handler.direct.select_evse(&request, now)
}

pub fn handle_control_evse(
    handler: &OchpHandler,
    request: ControlEvseRequest,
    now: DateTime<Utc>,
) -> ControlEvseResponse {
    info!(direct_id = %request.direct_id, operation = %request.operation, "ControlEvse");
    handler.direct.control_evse(&request, now)
}

pub fn handle_release_evse(
    handler: &OchpHandler,
    request: ReleaseEvseRequest,
    now: DateTime<Utc>,
) -> ReleaseEvseResponse {
    info!(direct_id = %request.direct_id, "ReleaseEvse");
    handler.direct.release_evse(&request, now)
}

pub fn handle_get_evse_status(
    handler: &OchpHandler,
    request: GetEvseStatusRequest,
    now: DateTime<Utc>,
) -> GetEvseStatusResponse {
    info!(evse = request.evse_ids.len(), "GetEvseStatus");
    handler.status.evse_status(&request.evse_ids, now)
}

pub fn handle_report_discrepancy(
    handler: &OchpHandler,
    request: ReportDiscrepancyRequest,
    now: DateTime<Utc>,
) -> ReportDiscrepancyResponse {
    warn!(evse_id = %request.evse_id, report = request.report.as_str(), "⚠️ Discrepancy reported");

    handler.event_bus.publish(Event::DiscrepancyReported(DiscrepancyReportedEvent {
        evse_id: request.evse_id,
        report: request.report,
        timestamp: now,
    }));

    ReportDiscrepancyResponse {
        result: OchpResult::ok(),
    }
}

pub fn handle_inform_provider(
    handler: &OchpHandler,
    request: InformProviderRequest,
    now: DateTime<Utc>,
) -> InformProviderResponse {
    info!(
        direct_id = %request.direct_id,
        evse_id = %request.evse_id,
        operation = %request.message,
        "InformProvider"
    );
    handler.direct.inform_provider(&request, now)
}
