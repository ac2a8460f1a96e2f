//! Endpoint registry: routes direct messages to partner endpoints

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::application::events::{EndpointRegisteredEvent, Event, SharedEventBus};
use crate::domain::{ContractId, EndpointRegistration, EndpointRole, EvseId};

/// Thread-safe registry of provider and operator endpoints, keyed by
/// `(role, url)`.
pub struct EndpointRegistry {
    endpoints: DashMap<(EndpointRole, String), EndpointRegistration>,
    event_bus: Option<SharedEventBus>,
}

/// Shared, reference-counted endpoint registry
pub type SharedEndpointRegistry = Arc<EndpointRegistry>;

impl EndpointRegistry {
    pub fn new() -> Self {
        Self {
            endpoints: DashMap::new(),
            event_bus: None,
        }
    }

    pub fn with_event_bus(event_bus: SharedEventBus) -> Self {
        Self {
            endpoints: DashMap::new(),
            event_bus: Some(event_bus),
        }
    }

    /// Insert or replace a registration. Returns `true` when it is new.
    pub fn upsert(&self, registration: EndpointRegistration) -> bool {
        let key = (registration.role, registration.url.clone());
        let role = registration.role;
        let url = registration.url.clone();
        let is_new = self.endpoints.insert(key, registration).is_none();

        info!(%role, url = url.as_str(), is_new, "🔗 Endpoint registered");
        if let Some(bus) = &self.event_bus {
            bus.publish(Event::EndpointRegistered(EndpointRegisteredEvent {
                role,
                url,
                timestamp: Utc::now(),
            }));
        }
        is_new
    }

    pub fn remove(&self, role: EndpointRole, url: &str) -> Option<EndpointRegistration> {
        let removed = self
            .endpoints
            .remove(&(role, url.to_string()))
            .map(|(_, registration)| registration);
        if removed.is_some() {
            info!(%role, url, "Endpoint removed");
        } else {
            warn!(%role, url, "Attempted to remove unknown endpoint");
        }
        removed
    }

    /// Most specific registration of `role` serving `id`.
    ///
    /// The longest matching whitelist pattern wins; ties go to the
    /// lexicographically smallest URL so lookups are deterministic.
    pub fn lookup(&self, role: EndpointRole, id: &str) -> Option<EndpointRegistration> {
        let best = self
            .endpoints
            .iter()
            .filter(|entry| entry.role == role)
            .filter_map(|entry| entry.match_score(id).map(|score| (score, entry.value().clone())))
            .min_by(|(a_score, a), (b_score, b)| b_score.cmp(a_score).then_with(|| a.url.cmp(&b.url)))
            .map(|(_, registration)| registration);

        match &best {
            Some(registration) => debug!(%role, id, url = registration.url.as_str(), "Endpoint resolved"),
            None => debug!(%role, id, "No endpoint serves id"),
        }
        best
    }

    /// Operator endpoint responsible for an EVSE.
    pub fn lookup_operator(&self, evse_id: &EvseId) -> Option<EndpointRegistration> {
        self.lookup(EndpointRole::Operator, &evse_id.to_string())
    }

    /// Provider endpoint responsible for a contract.
    pub fn lookup_provider(&self, contract_id: &ContractId) -> Option<EndpointRegistration> {
        self.lookup(EndpointRole::Provider, &contract_id.to_string())
    }

    /// All registrations, providers first, each group ordered by URL.
    pub fn list(&self) -> Vec<EndpointRegistration> {
        let mut all: Vec<EndpointRegistration> =
            self.endpoints.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by(|a, b| a.role.cmp(&b.role).then_with(|| a.url.cmp(&b.url)));
        all
    }

    pub fn count(&self) -> usize {
        self.endpoints.len()
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}
