//! UpdateStatus / GetStatus handlers

use chrono::{DateTime, Utc};
use tracing::info;

use crate::application::OchpHandler;
use crate::codec::messages::{
    GetStatusRequest, GetStatusResponse, UpdateStatusRequest, UpdateStatusResponse,
};

pub fn handle_update_status(
    handler: &OchpHandler,
    request: UpdateStatusRequest,
    now: DateTime<Utc>,
) -> UpdateStatusResponse {
    info!(
        evse = request.evse.len(),
        parking = request.parking.len(),
        "UpdateStatus"
    );
    UpdateStatusResponse {
        result: handler.status.update(&request, now),
    }
}

pub fn handle_get_status(
    handler: &OchpHandler,
    request: GetStatusRequest,
    now: DateTime<Utc>,
) -> GetStatusResponse {
    info!(since = ?request.start_date_time, "GetStatus");
    handler.status.get_status(request.start_date_time, now)
}
