//! EVSE and parking-spot status snapshots

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ids::{EvseId, ParkingId};
use crate::support::wire::wire_enum;

wire_enum! {
    /// Coarse EVSE state.
    pub enum EvseMajorStatus {
        Available => "available",
        NotAvailable => "not-available",
        Unknown => "unknown",
    }
}

wire_enum! {
    /// Fine-grained EVSE state.
    pub enum EvseMinorStatus {
        Available => "available",
        Reserved => "reserved",
        Charging => "charging",
        Blocked => "blocked",
        OutOfOrder => "outoforder",
        Unknown => "unknown",
    }
}

wire_enum! {
    pub enum ParkingStatusType {
        Available => "available",
        NotAvailable => "not-available",
        Unknown => "unknown",
    }
}

/// Major/minor pairs the protocol forbids.
const ILLEGAL_COMBINATIONS: &[(EvseMajorStatus, EvseMinorStatus)] = &[
    (EvseMajorStatus::Available, EvseMinorStatus::Charging),
    (EvseMajorStatus::NotAvailable, EvseMinorStatus::Available),
];

/// Whether `major` may be reported together with `minor`.
pub fn is_legal_combination(major: EvseMajorStatus, minor: Option<EvseMinorStatus>) -> bool {
    match minor {
        None => true,
        Some(minor) => !ILLEGAL_COMBINATIONS.contains(&(major, minor)),
    }
}

/// Status snapshot of one EVSE.
///
/// A status change is a new value. Equality includes the TTL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EvseStatus {
    evse_id: EvseId,
    major: EvseMajorStatus,
    minor: Option<EvseMinorStatus>,
    ttl: Option<DateTime<Utc>>,
}

impl EvseStatus {
    pub fn new(
        evse_id: EvseId,
        major: EvseMajorStatus,
        minor: Option<EvseMinorStatus>,
        ttl: Option<DateTime<Utc>>,
    ) -> DomainResult<Self> {
        if let Some(minor) = minor {
            if !is_legal_combination(major, Some(minor)) {
                return Err(DomainError::IllegalStatusCombination {
                    major: major.to_string(),
                    minor: minor.to_string(),
                });
            }
        }

        Ok(Self {
            evse_id,
            major,
            minor,
            ttl,
        })
    }

    /// Status with only a major state.
    pub fn major_only(evse_id: EvseId, major: EvseMajorStatus) -> Self {
        Self {
            evse_id,
            major,
            minor: None,
            ttl: None,
        }
    }

    pub fn evse_id(&self) -> &EvseId {
        &self.evse_id
    }

    pub fn major(&self) -> EvseMajorStatus {
        self.major
    }

    pub fn minor(&self) -> Option<EvseMinorStatus> {
        self.minor
    }

    pub fn ttl(&self) -> Option<DateTime<Utc>> {
        self.ttl
    }

    /// Copy of this status carrying `ttl` if it had none.
    pub fn with_default_ttl(&self, ttl: Option<DateTime<Utc>>) -> Self {
        Self {
            ttl: self.ttl.or(ttl),
            ..self.clone()
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.ttl.is_some_and(|ttl| ttl <= now)
    }
}

/// Status snapshot of one parking spot. Parking has no minor state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParkingStatus {
    parking_id: ParkingId,
    status: ParkingStatusType,
    ttl: Option<DateTime<Utc>>,
}

impl ParkingStatus {
    pub fn new(parking_id: ParkingId, status: ParkingStatusType, ttl: Option<DateTime<Utc>>) -> Self {
        Self {
            parking_id,
            status,
            ttl,
        }
    }

    pub fn parking_id(&self) -> &ParkingId {
        &self.parking_id
    }

    pub fn status(&self) -> ParkingStatusType {
        self.status
    }

    pub fn ttl(&self) -> Option<DateTime<Utc>> {
        self.ttl
    }

    pub fn with_default_ttl(&self, ttl: Option<DateTime<Utc>>) -> Self {
        Self {
            ttl: self.ttl.or(ttl),
            ..self.clone()
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.ttl.is_some_and(|ttl| ttl <= now)
    }
}
