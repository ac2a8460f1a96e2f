//! Roaming authorisation entries (token ↔ contract)

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::ids::{ContractId, EmtId};

/// Links a token to a contract until `expiry_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoamingAuthorisationInfo {
    pub emt_id: EmtId,
    pub contract_id: ContractId,
    pub printed_number: Option<String>,
    pub expiry_date: DateTime<Utc>,
}

impl RoamingAuthorisationInfo {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date <= now
    }
}
