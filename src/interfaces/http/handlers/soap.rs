//! SOAP endpoints for OCHP and OCHPdirect

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::interfaces::http::AppState;

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// `POST /ochp` and `POST /ochp/direct`.
///
/// OCHP responses are `200 OK`, including ones carrying a failed result.
/// Faults use `500` as SOAP 1.1 over HTTP requires.
pub async fn ochp_soap(State(state): State<AppState>, body: String) -> Response {
    let reply = state.handler.handle(&body, Utc::now());
    let status = if reply.is_fault {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, [(header::CONTENT_TYPE, SOAP_CONTENT_TYPE)], reply.envelope).into_response()
}
