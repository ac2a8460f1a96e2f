//! # OCHP service
//!
//! OCHP 1.4 clearing-house node with OCHPdirect session handling.
//!
//! ## Architecture
//!
//! - **domain**: identifiers, status model, direct sessions, endpoints, events
//! - **codec**: XML tree, SOAP envelope and the typed OCHP messages
//! - **application**: stores, the direct session state machine, routing and handlers
//! - **interfaces**: axum HTTP surface
//! - **support**: shutdown coordination and the wire-enum macro

pub mod application;
pub mod codec;
pub mod config;
pub mod domain;
pub mod interfaces;
pub mod server;
pub mod support;

pub use config::{default_config_path, AppConfig, ConfigError};

pub use application::{create_event_bus, Event, EventBus, OchpHandler, SharedEventBus};
pub use interfaces::http::create_router;
