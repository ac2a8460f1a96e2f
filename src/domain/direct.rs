//! OCHPdirect charging session entity
//!
//! State machine:
//!
//! ```text
//! Selected ──(ttl)──► Reserved ──inform──► Active ──release──► Released
//!     └──────────────inform──────────────────┘
//! any live state ──ttl elapsed──► Expired
//! ```
//!
//! Expiry is lazy: callers must run [`DirectSession::refresh`] before
//! reading or mutating a session.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ids::{ContractId, DirectId, EvseId};
use crate::support::wire::wire_enum;

wire_enum! {
    /// Operation carried by ControlEvse and InformProvider messages.
    pub enum DirectOperation {
        Start => "start",
        Change => "change",
        End => "end",
    }
}

wire_enum! {
    pub enum DirectSessionState {
        /// EVSE chosen, no reservation window.
        Selected => "selected",
        /// EVSE held until the session TTL.
        Reserved => "reserved",
        /// Charging, telemetry flowing.
        Active => "active",
        Released => "released",
        Expired => "expired",
    }
}

impl DirectSessionState {
    /// Terminal states accept no further updates.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Expired)
    }
}

wire_enum! {
    /// What a charging period is billed for.
    pub enum BillingItem {
        ParkingTime => "parkingtime",
        UsageTime => "usagetime",
        Energy => "energy",
        Power => "power",
        ServiceFee => "serviceFee",
        Departure => "departure",
        ReserveTime => "reserveTime",
    }
}

/// Limits requested by the provider for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChargingLimits {
    pub max_power: Option<Decimal>,
    pub max_current: Option<Decimal>,
    pub one_phase: Option<bool>,
    pub max_energy: Option<Decimal>,
    pub min_energy: Option<Decimal>,
    pub departure: Option<DateTime<Utc>>,
}

impl ChargingLimits {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the fields present in `other`.
    pub fn merge(&mut self, other: &ChargingLimits) {
        if other.max_power.is_some() {
            self.max_power = other.max_power;
        }
        if other.max_current.is_some() {
            self.max_current = other.max_current;
        }
        if other.one_phase.is_some() {
            self.one_phase = other.one_phase;
        }
        if other.max_energy.is_some() {
            self.max_energy = other.max_energy;
        }
        if other.min_energy.is_some() {
            self.min_energy = other.min_energy;
        }
        if other.departure.is_some() {
            self.departure = other.departure;
        }
    }
}

/// Meter value at a point in time (kWh).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeterReading {
    pub value: Decimal,
    pub time: DateTime<Utc>,
}

/// Battery state of charge in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StateOfCharge(u8);

impl StateOfCharge {
    pub fn new(percent: u8) -> DomainResult<Self> {
        if percent <= 100 {
            Ok(Self(percent))
        } else {
            Err(DomainError::Argument {
                name: "stateOfCharge",
                reason: "must be a percentage 0-100",
            })
        }
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

impl fmt::Display for StateOfCharge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currency code, held upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Currency(String);

impl Currency {
    pub fn parse(code: &str) -> DomainResult<Self> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(DomainError::format("currency", code, "expected an ISO 4217 code"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One billed period of a session. Never ends before it starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargingPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    pub billing_item: BillingItem,
    pub billing_value: Decimal,
    pub item_price: Decimal,
    pub period_cost: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
}

impl ChargingPeriod {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        billing_item: BillingItem,
        billing_value: Decimal,
        item_price: Decimal,
    ) -> DomainResult<Self> {
        if end < start {
            return Err(DomainError::Argument {
                name: "endDateTime",
                reason: "ends before startDateTime",
            });
        }
        Ok(Self {
            start,
            end,
            billing_item,
            billing_value,
            item_price,
            period_cost: None,
            tax_rate: None,
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Rolling telemetry reported by the operator while charging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionTelemetry {
    pub state_of_charge: Option<StateOfCharge>,
    pub limits: ChargingLimits,
    pub current_power: Option<Decimal>,
    pub charged_energy: Option<Decimal>,
    pub meter_reading: Option<MeterReading>,
    pub charging_periods: Vec<ChargingPeriod>,
    pub current_cost: Option<Decimal>,
    pub currency: Option<Currency>,
}

impl SessionTelemetry {
    /// Fold a newer update into the accumulated telemetry.
    pub fn merge(&mut self, update: &SessionTelemetry) {
        if update.state_of_charge.is_some() {
            self.state_of_charge = update.state_of_charge;
        }
        self.limits.merge(&update.limits);
        if update.current_power.is_some() {
            self.current_power = update.current_power;
        }
        if update.charged_energy.is_some() {
            self.charged_energy = update.charged_energy;
        }
        if update.meter_reading.is_some() {
            self.meter_reading = update.meter_reading.clone();
        }
        if !update.charging_periods.is_empty() {
            self.charging_periods = update.charging_periods.clone();
        }
        if update.current_cost.is_some() {
            self.current_cost = update.current_cost;
        }
        if update.currency.is_some() {
            self.currency = update.currency.clone();
        }
    }
}

/// Why a session refused a transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session {0} has expired")]
    Expired(DirectId),

    #[error("session {0} is already {1}")]
    Terminated(DirectId, DirectSessionState),

    #[error("ttl {0} is not in the future")]
    TtlNotInFuture(DateTime<Utc>),

    #[error("{field} does not match session {direct_id}")]
    Mismatch {
        direct_id: DirectId,
        field: &'static str,
    },
}

/// Outcome of a release request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    AlreadyReleased,
    AlreadyExpired,
}

/// An OCHPdirect charging session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectSession {
    direct_id: DirectId,
    evse_id: EvseId,
    /// Contract named at selection, if any.
    contract_id: Option<ContractId>,
    state: DirectSessionState,
    ttl: Option<DateTime<Utc>>,
    telemetry: SessionTelemetry,
    last_operation: Option<DirectOperation>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DirectSession {
    /// Open a session for a selected EVSE.
    ///
    /// With a TTL the session starts `Reserved`, otherwise `Selected`.
    pub fn select(
        direct_id: DirectId,
        evse_id: EvseId,
        contract_id: Option<ContractId>,
        ttl: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if let Some(ttl) = ttl {
            ensure_future(ttl, now)?;
        }

        let state = if ttl.is_some() {
            DirectSessionState::Reserved
        } else {
            DirectSessionState::Selected
        };

        Ok(Self {
            direct_id,
            evse_id,
            contract_id,
            state,
            ttl,
            telemetry: SessionTelemetry::default(),
            last_operation: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn direct_id(&self) -> &DirectId {
        &self.direct_id
    }

    pub fn evse_id(&self) -> &EvseId {
        &self.evse_id
    }

    pub fn contract_id(&self) -> Option<&ContractId> {
        self.contract_id.as_ref()
    }

    pub fn state(&self) -> DirectSessionState {
        self.state
    }

    pub fn ttl(&self) -> Option<DateTime<Utc>> {
        self.ttl
    }

    pub fn telemetry(&self) -> &SessionTelemetry {
        &self.telemetry
    }

    pub fn last_operation(&self) -> Option<DirectOperation> {
        self.last_operation
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply lazy expiry. Returns `true` when this call expired the session.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        match self.ttl {
            Some(ttl) if ttl <= now => {
                self.state = DirectSessionState::Expired;
                self.updated_at = now;
                true
            }
            _ => false,
        }
    }

    /// Provider-side control (start/change/end) of a live session.
    ///
    /// Limits are recorded; the state moves only on operator telemetry.
    pub fn apply_control(
        &mut self,
        operation: DirectOperation,
        limits: &ChargingLimits,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.ensure_live(now)?;
        self.telemetry.limits.merge(limits);
        self.last_operation = Some(operation);
        self.updated_at = now;
        Ok(())
    }

    /// Operator telemetry. The first update activates the session.
    ///
    /// An explicit `ttl` replaces the current one; otherwise the TTL is
    /// left untouched. The contract is checked only when one was named at
    /// selection.
    pub fn apply_inform(
        &mut self,
        operation: DirectOperation,
        evse_id: &EvseId,
        contract_id: &ContractId,
        ttl: Option<DateTime<Utc>>,
        telemetry: &SessionTelemetry,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.ensure_live(now)?;

        if evse_id != &self.evse_id {
            return Err(self.mismatch("evseId"));
        }
        if self.contract_id.as_ref().is_some_and(|own| own != contract_id) {
            return Err(self.mismatch("contractId"));
        }
        if let Some(ttl) = ttl {
            ensure_future(ttl, now)?;
            self.ttl = Some(ttl);
        }

        self.telemetry.merge(telemetry);
        self.state = DirectSessionState::Active;
        self.last_operation = Some(operation);
        self.updated_at = now;
        Ok(())
    }

    /// Release the EVSE. Safe to repeat.
    pub fn release(&mut self, now: DateTime<Utc>) -> ReleaseOutcome {
        self.refresh(now);
        match self.state {
            DirectSessionState::Released => ReleaseOutcome::AlreadyReleased,
            DirectSessionState::Expired => ReleaseOutcome::AlreadyExpired,
            _ => {
                self.state = DirectSessionState::Released;
                self.updated_at = now;
                ReleaseOutcome::Released
            }
        }
    }

    fn ensure_live(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.refresh(now);
        match self.state {
            DirectSessionState::Expired => Err(SessionError::Expired(self.direct_id.clone())),
            DirectSessionState::Released => Err(SessionError::Terminated(
                self.direct_id.clone(),
                self.state,
            )),
            _ => Ok(()),
        }
    }

    fn mismatch(&self, field: &'static str) -> SessionError {
        SessionError::Mismatch {
            direct_id: self.direct_id.clone(),
            field,
        }
    }
}

fn ensure_future(ttl: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), SessionError> {
    if ttl > now {
        Ok(())
    } else {
        Err(SessionError::TtlNotInFuture(ttl))
    }
}
