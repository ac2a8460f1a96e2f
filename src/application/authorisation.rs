//! Roaming authorisation list store

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{info, warn};

use crate::codec::OchpResult;
use crate::domain::{EmtId, RoamingAuthorisationInfo};

/// Outcome of a list upload: the batch result plus the refused entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOutcome {
    pub result: OchpResult,
    pub refused: Vec<RoamingAuthorisationInfo>,
}

/// Token → contract entries, keyed by the full token identity.
pub struct RoamingAuthorisationService {
    entries: DashMap<EmtId, RoamingAuthorisationInfo>,
}

pub type SharedRoamingAuthorisationService = Arc<RoamingAuthorisationService>;

impl RoamingAuthorisationService {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Replace the whole list.
    pub fn set(&self, list: &[RoamingAuthorisationInfo], now: DateTime<Utc>) -> ListOutcome {
        self.entries.clear();
        let outcome = self.merge(list, now);
        info!(stored = self.entries.len(), "🪪 Roaming authorisation list replaced");
        outcome
    }

    /// Add or replace individual entries.
    pub fn update(&self, list: &[RoamingAuthorisationInfo], now: DateTime<Utc>) -> ListOutcome {
        let outcome = self.merge(list, now);
        info!(stored = self.entries.len(), "🪪 Roaming authorisation list updated");
        outcome
    }

    fn merge(&self, list: &[RoamingAuthorisationInfo], now: DateTime<Utc>) -> ListOutcome {
        let (valid, refused): (Vec<_>, Vec<_>) =
            list.iter().cloned().partition(|info| !info.is_expired_at(now));

        for info in &refused {
            warn!(
                contract_id = %info.contract_id,
                expiry_date = %info.expiry_date,
                "Refusing expired roaming authorisation"
            );
        }

        let accepted = valid.len();
        for info in valid {
            self.entries.insert(info.emt_id.clone(), info);
        }

        ListOutcome {
            result: OchpResult::batch(accepted, list.len()),
            refused,
        }
    }

    /// Entry for a token, if present and not expired.
    pub fn lookup(&self, emt_id: &EmtId, now: DateTime<Utc>) -> Option<RoamingAuthorisationInfo> {
        self.entries
            .get(emt_id)
            .filter(|info| !info.is_expired_at(now))
            .map(|info| info.clone())
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for RoamingAuthorisationService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ResultCode;
    use crate::domain::{ContractId, TokenRepresentation, TokenType};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn info(instance: &str, expires_in_days: i64) -> RoamingAuthorisationInfo {
        RoamingAuthorisationInfo {
            emt_id: EmtId::rfid(instance, None).unwrap(),
            contract_id: ContractId::parse("DE-GDF-123456789-1").unwrap(),
            printed_number: None,
            expiry_date: t0() + Duration::days(expires_in_days),
        }
    }

    #[test]
    fn set_replaces_previous_entries() {
        let service = RoamingAuthorisationService::new();
        service.update(&[info("A", 1), info("B", 1)], t0());
        let outcome = service.set(&[info("C", 1)], t0());
        assert_eq!(outcome.result, OchpResult::ok());
        assert_eq!(service.count(), 1);
        assert!(service.lookup(&EmtId::rfid("C", None).unwrap(), t0()).is_some());
        assert!(service.lookup(&EmtId::rfid("A", None).unwrap(), t0()).is_none());
    }

    #[test]
    fn expired_entries_are_refused_and_returned() {
        let service = RoamingAuthorisationService::new();
        let outcome = service.update(&[info("A", 1), info("B", -1)], t0());
        assert_eq!(outcome.result.code, ResultCode::Partly);
        assert_eq!(outcome.refused.len(), 1);
        assert_eq!(outcome.refused[0].emt_id.instance, "B");

        let outcome = service.update(&[info("C", 0)], t0());
        assert_eq!(outcome.result.code, ResultCode::Format);
    }

    #[test]
    fn token_identity_includes_representation() {
        let service = RoamingAuthorisationService::new();
        service.update(&[info("04A1", 1)], t0());
        let hashed = EmtId::new("04A1", TokenRepresentation::Sha256, TokenType::Rfid, None).unwrap();
        assert!(service.lookup(&hashed, t0()).is_none());
    }

    #[test]
    fn lookup_hides_entries_that_expired_later() {
        let service = RoamingAuthorisationService::new();
        service.update(&[info("A", 1)], t0());
        let token = EmtId::rfid("A", None).unwrap();
        assert!(service.lookup(&token, t0() + Duration::days(2)).is_none());
    }
}
