//! Notification events
//!
//! Facts about direct sessions, statuses and endpoints, broadcast to
//! subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ContractId, DirectId, EndpointRole, EvseId, EvseMajorStatus, EvseMinorStatus,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    DirectSessionSelected(DirectSessionSelectedEvent),
    DirectSessionActivated(DirectSessionActivatedEvent),
    DirectSessionReleased(DirectSessionReleasedEvent),
    DirectSessionExpired(DirectSessionExpiredEvent),
    EvseStatusChanged(EvseStatusChangedEvent),
    EndpointRegistered(EndpointRegisteredEvent),
    DiscrepancyReported(DiscrepancyReportedEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::DirectSessionSelected(_) => "direct_session_selected",
            Event::DirectSessionActivated(_) => "direct_session_activated",
            Event::DirectSessionReleased(_) => "direct_session_released",
            Event::DirectSessionExpired(_) => "direct_session_expired",
            Event::EvseStatusChanged(_) => "evse_status_changed",
            Event::EndpointRegistered(_) => "endpoint_registered",
            Event::DiscrepancyReported(_) => "discrepancy_reported",
        }
    }

    pub fn direct_id(&self) -> Option<&DirectId> {
        match self {
            Event::DirectSessionSelected(e) => Some(&e.direct_id),
            Event::DirectSessionActivated(e) => Some(&e.direct_id),
            Event::DirectSessionReleased(e) => Some(&e.direct_id),
            Event::DirectSessionExpired(e) => Some(&e.direct_id),
            _ => None,
        }
    }

    pub fn evse_id(&self) -> Option<&EvseId> {
        match self {
            Event::DirectSessionSelected(e) => Some(&e.evse_id),
            Event::DirectSessionActivated(e) => Some(&e.evse_id),
            Event::DirectSessionReleased(e) => Some(&e.evse_id),
            Event::DirectSessionExpired(e) => Some(&e.evse_id),
            Event::EvseStatusChanged(e) => Some(&e.evse_id),
            Event::DiscrepancyReported(e) => Some(&e.evse_id),
            Event::EndpointRegistered(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectSessionSelectedEvent {
    pub direct_id: DirectId,
    pub evse_id: EvseId,
    pub contract_id: Option<ContractId>,
    pub ttl: Option<DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectSessionActivatedEvent {
    pub direct_id: DirectId,
    pub evse_id: EvseId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectSessionReleasedEvent {
    pub direct_id: DirectId,
    pub evse_id: EvseId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectSessionExpiredEvent {
    pub direct_id: DirectId,
    pub evse_id: EvseId,
    pub ttl: Option<DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvseStatusChangedEvent {
    pub evse_id: EvseId,
    pub major: EvseMajorStatus,
    pub minor: Option<EvseMinorStatus>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRegisteredEvent {
    pub role: EndpointRole,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyReportedEvent {
    pub evse_id: EvseId,
    pub report: String,
    pub timestamp: DateTime<Utc>,
}

/// Envelope with a unique id, as delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn event_message_serializes_tagged() {
        let event = Event::DirectSessionReleased(DirectSessionReleasedEvent {
            direct_id: DirectId::parse("D1").unwrap(),
            evse_id: EvseId::parse("DE*GEF*E1").unwrap(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        });
        assert_eq!(event.event_type(), "direct_session_released");
        assert_eq!(event.direct_id().map(DirectId::as_str), Some("D1"));
        assert_eq!(event.evse_id().map(ToString::to_string).as_deref(), Some("DE*GEF*E1"));

        let json = serde_json::to_value(EventMessage::new(event.clone())).unwrap();
        assert_eq!(json["type"], "DirectSessionReleased");
        assert_eq!(json["data"]["evse_id"], "DE*GEF*E1");
        assert!(json["id"].is_string());
    }
}
