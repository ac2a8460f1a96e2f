pub mod authorisation;
pub mod direct;
pub mod endpoints;
pub mod events;
pub mod handlers;
pub mod ports;
pub mod status;

// Re-export key types for convenience
pub use authorisation::{ListOutcome, RoamingAuthorisationService, SharedRoamingAuthorisationService};
pub use direct::{
    start_session_sweep_task, DirectRouter, DirectSessionService, DirectSettings,
    SharedDirectSessionService, SweepReport,
};
pub use endpoints::{EndpointRegistry, SharedEndpointRegistry};
pub use events::{
    create_event_bus, start_event_log_task, Event, EventBus, EventSubscriber, SharedEventBus,
};
pub use handlers::{OchpHandler, SoapReply};
pub use ports::{OchpTransport, TransportError};
pub use status::{SharedStatusService, StatusService};
