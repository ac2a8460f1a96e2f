//! Service endpoint registrations used to route OCHPdirect messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::support::wire::wire_enum;

wire_enum! {
    /// Which side of a direct session an endpoint serves.
    pub enum EndpointRole {
        /// Receives InformProvider messages, matched by contract id.
        Provider => "provider",
        /// Receives Select/Control/ReleaseEvse, matched by EVSE id.
        Operator => "operator",
    }
}

/// A provider's or operator's OCHPdirect endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRegistration {
    pub role: EndpointRole,
    pub url: String,
    pub namespace_url: String,
    pub access_token: String,
    /// Advisory; checked by the caller, never enforced by the registry.
    pub valid_date: DateTime<Utc>,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl EndpointRegistration {
    /// Length of the most specific whitelist pattern matching `id`, or
    /// `None` when the endpoint does not serve `id`.
    ///
    /// An empty whitelist serves every id not blacklisted. Matching is
    /// substring based and case-insensitive.
    pub fn match_score(&self, id: &str) -> Option<usize> {
        let id = id.to_ascii_uppercase();
        let contains = |pattern: &String| {
            let pattern = pattern.trim();
            !pattern.is_empty() && id.contains(&pattern.to_ascii_uppercase())
        };

        if self.blacklist.iter().any(contains) {
            return None;
        }

        if self.whitelist.iter().all(|p| p.trim().is_empty()) {
            return Some(0);
        }

        self.whitelist
            .iter()
            .filter(|p| contains(p))
            .map(|p| p.trim().len())
            .max()
    }

    pub fn serves(&self, id: &str) -> bool {
        self.match_score(id).is_some()
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_date > now
    }
}
