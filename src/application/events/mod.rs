//! Application events (pub/sub)
//!
//! Event types live in `domain::events`; the broadcast bus and the event
//! log task live here.

pub mod event_bus;

pub use crate::domain::events::types;
pub use crate::domain::events::types::*;

pub use event_bus::{create_event_bus, start_event_log_task, EventBus, EventSubscriber, SharedEventBus};
