//! OCHPdirect: session service, outbound router and sweep task

pub mod router;
pub mod service;
pub mod sweep;

pub use router::DirectRouter;
pub use service::{
    DirectSessionService, DirectSettings, SharedDirectSessionService, SweepReport,
};
pub use sweep::start_session_sweep_task;
