//! HTTP interfaces
//!
//! - `handlers`: SOAP endpoints, health and session inspection
//! - `router`: axum router wiring

pub mod handlers;
pub mod router;

pub use router::{create_router, AppState};
