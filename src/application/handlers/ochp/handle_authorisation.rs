//! Roaming authorisation list handlers

use chrono::{DateTime, Utc};
use tracing::info;

use crate::application::OchpHandler;
use crate::codec::messages::{
    SetRoamingAuthorisationListRequest, SetRoamingAuthorisationListResponse,
    UpdateRoamingAuthorisationListRequest, UpdateRoamingAuthorisationListResponse,
};

pub fn handle_set_roaming_authorisation_list(
    handler: &OchpHandler,
    request: SetRoamingAuthorisationListRequest,
    now: DateTime<Utc>,
) -> SetRoamingAuthorisationListResponse {
    info!(entries = request.entries().len(), "SetRoamingAuthorisationList");
    let outcome = handler.authorisation.set(request.entries(), now);
    SetRoamingAuthorisationListResponse {
        result: outcome.result,
        refused: outcome.refused,
    }
}

pub fn handle_update_roaming_authorisation_list(
    handler: &OchpHandler,
    request: UpdateRoamingAuthorisationListRequest,
    now: DateTime<Utc>,
) -> UpdateRoamingAuthorisationListResponse {
    info!(entries = request.entries().len(), "UpdateRoamingAuthorisationList");
    let outcome = handler.authorisation.update(request.entries(), now);
    UpdateRoamingAuthorisationListResponse {
        result: outcome.result,
        refused: outcome.refused,
    }
}
