//! AddServiceEndpoints / GetServiceEndpoints handlers

use tracing::info;

use crate::application::OchpHandler;
use crate::codec::messages::{
    AddServiceEndpointsRequest, AddServiceEndpointsResponse, GetServiceEndpointsRequest,
    GetServiceEndpointsResponse,
};
use crate::codec::OchpResult;

pub fn handle_add_service_endpoints(
    handler: &OchpHandler,
    request: AddServiceEndpointsRequest,
) -> AddServiceEndpointsResponse {
    info!(endpoints = request.endpoints.len(), "AddServiceEndpoints");
    for registration in request.endpoints {
        handler.endpoints.upsert(registration);
    }
    AddServiceEndpointsResponse {
        result: OchpResult::ok(),
    }
}

pub fn handle_get_service_endpoints(
    handler: &OchpHandler,
    _request: GetServiceEndpointsRequest,
) -> GetServiceEndpointsResponse {
    GetServiceEndpointsResponse {
        result: OchpResult::ok(),
        endpoints: handler.endpoints.list(),
    }
}
