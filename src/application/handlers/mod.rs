//! Inbound OCHP message handlers

pub mod ochp;
mod ochp_handler;

pub use ochp_handler::{OchpHandler, SoapReply};
