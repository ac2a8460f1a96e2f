//! OCHP 1.4 request/response types

pub mod authorisation;
pub mod direct;
pub mod endpoints;
pub mod status;

pub use authorisation::{
    SetRoamingAuthorisationListRequest, SetRoamingAuthorisationListResponse,
    UpdateRoamingAuthorisationListRequest, UpdateRoamingAuthorisationListResponse,
};
pub use direct::{
    ControlEvseRequest, ControlEvseResponse, GetEvseStatusRequest, GetEvseStatusResponse,
    InformProviderRequest, InformProviderResponse, ReleaseEvseRequest, ReleaseEvseResponse,
    ReportDiscrepancyRequest, ReportDiscrepancyResponse, SelectEvseRequest, SelectEvseResponse,
};
pub use endpoints::{
    AddServiceEndpointsRequest, AddServiceEndpointsResponse, GetServiceEndpointsRequest,
    GetServiceEndpointsResponse,
};
pub use status::{GetStatusRequest, GetStatusResponse, UpdateStatusRequest, UpdateStatusResponse};
