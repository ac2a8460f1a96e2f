//! OCHPdirect session service (operator side)
//!
//! Owns the session table. Every operation works on one entry under the
//! map's per-key write guard, so at most one transition runs per
//! `DirectId` at a time. Expiry is applied lazily on each touch.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::application::events::{
    DirectSessionActivatedEvent, DirectSessionExpiredEvent, DirectSessionReleasedEvent,
    DirectSessionSelectedEvent, Event, SharedEventBus,
};
use crate::codec::fields::format_timestamp;
use crate::codec::messages::{
    ControlEvseRequest, ControlEvseResponse, InformProviderRequest, InformProviderResponse,
    ReleaseEvseRequest, ReleaseEvseResponse, SelectEvseRequest, SelectEvseResponse,
};
use crate::codec::{OchpResponse, OchpResult};
use crate::domain::{
    DirectId, DirectSession, DirectSessionState, ReleaseOutcome, SessionError, StateOfCharge,
};

/// Reservation policy for new sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectSettings {
    /// Reservation window applied when a select carries no `reserveUntil`.
    pub default_reservation: Option<Duration>,
    /// Upper bound on any reservation window.
    pub max_reservation: Duration,
}

impl Default for DirectSettings {
    fn default() -> Self {
        Self {
            default_reservation: Some(Duration::minutes(5)),
            max_reservation: Duration::minutes(30),
        }
    }
}

/// Result of a housekeeping sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub evicted: usize,
}

pub struct DirectSessionService {
    sessions: DashMap<DirectId, DirectSession>,
    settings: DirectSettings,
    event_bus: Option<SharedEventBus>,
}

pub type SharedDirectSessionService = Arc<DirectSessionService>;

impl DirectSessionService {
    pub fn new(settings: DirectSettings) -> Self {
        Self {
            sessions: DashMap::new(),
            settings,
            event_bus: None,
        }
    }

    pub fn with_event_bus(settings: DirectSettings, event_bus: SharedEventBus) -> Self {
        Self {
            sessions: DashMap::new(),
            settings,
            event_bus: Some(event_bus),
        }
    }

    pub fn settings(&self) -> &DirectSettings {
        &self.settings
    }

    /// Allocate a session for the requested EVSE.
    pub fn select_evse(&self, request: &SelectEvseRequest, now: DateTime<Utc>) -> SelectEvseResponse {
        // `None` when the window runs past the representable range.
        let max_ttl = now.checked_add_signed(self.settings.max_reservation);
        let ttl = match request.reserve_until {
            Some(until) if until <= now => {
                warn!(
                    evse_id = %request.evse_id,
                    reserve_until = %format_timestamp(&until),
                    "SelectEvse reservation not in the future"
                );
                return SelectEvseResponse::from_result(OchpResult::format(format!(
                    "reserveUntil {} is not in the future",
                    format_timestamp(&until)
                )));
            }
            Some(until) => Some(max_ttl.map_or(until, |cap| until.min(cap))),
            None => self
                .settings
                .default_reservation
                .and_then(|window| now.checked_add_signed(window.min(self.settings.max_reservation))),
        };

        let direct_id = DirectId::generate();
        let session = match DirectSession::select(
            direct_id.clone(),
            request.evse_id.clone(),
            request.contract_id.clone(),
            ttl,
            now,
        ) {
            Ok(session) => session,
            Err(e) => return SelectEvseResponse::from_result(session_error_result(&e)),
        };

        match self.sessions.entry(direct_id.clone()) {
            Entry::Occupied(_) => {
                warn!(direct_id = %direct_id, "Generated direct id already in use");
                return SelectEvseResponse::from_result(OchpResult::server("direct id collision"));
            }
            Entry::Vacant(slot) => {
                slot.insert(session);
            }
        }

        info!(
            direct_id = %direct_id,
            evse_id = %request.evse_id,
            contract_id = ?request.contract_id.as_ref().map(ToString::to_string),
            ttl = ?ttl.map(|t| format_timestamp(&t)),
            "🔌 Direct session selected"
        );
        self.publish(Event::DirectSessionSelected(DirectSessionSelectedEvent {
            direct_id: direct_id.clone(),
            evse_id: request.evse_id.clone(),
            contract_id: request.contract_id.clone(),
            ttl,
            timestamp: now,
        }));

        SelectEvseResponse {
            result: OchpResult::ok(),
            direct_id: Some(direct_id),
            ttl,
        }
    }

    /// Record provider limits on a live session.
    pub fn control_evse(&self, request: &ControlEvseRequest, now: DateTime<Utc>) -> ControlEvseResponse {
        let Some(mut session) = self.sessions.get_mut(&request.direct_id) else {
            return ControlEvseResponse::from_result(unknown_session(&request.direct_id));
        };
        self.touch(&mut session, now);

        if let Err(e) = session.apply_control(request.operation, &request.limits, now) {
            warn!(direct_id = %request.direct_id, error = %e, "ControlEvse refused");
            return ControlEvseResponse::from_result(session_error_result(&e));
        }

        info!(
            direct_id = %request.direct_id,
            operation = %request.operation,
            "🎛️ Direct session controlled"
        );
        ControlEvseResponse {
            result: OchpResult::ok(),
            ttl: session.ttl(),
        }
    }

    /// Apply operator telemetry; the first update activates the session.
    pub fn inform_provider(
        &self,
        request: &InformProviderRequest,
        now: DateTime<Utc>,
    ) -> InformProviderResponse {
        let Some(mut session) = self.sessions.get_mut(&request.direct_id) else {
            return InformProviderResponse::from_result(unknown_session(&request.direct_id));
        };
        self.touch(&mut session, now);

        let was_active = session.state() == DirectSessionState::Active;
        if let Err(e) = session.apply_inform(
            request.message,
            &request.evse_id,
            &request.contract_id,
            request.ttl,
            &request.telemetry,
            now,
        ) {
            warn!(direct_id = %request.direct_id, error = %e, "InformProvider refused");
            return InformProviderResponse::from_result(session_error_result(&e));
        }

        if !was_active {
            info!(direct_id = %request.direct_id, evse_id = %request.evse_id, "⚡ Direct session active");
            self.publish(Event::DirectSessionActivated(DirectSessionActivatedEvent {
                direct_id: request.direct_id.clone(),
                evse_id: request.evse_id.clone(),
                timestamp: now,
            }));
        } else {
            debug!(
                direct_id = %request.direct_id,
                operation = %request.message,
                soc = ?session.telemetry().state_of_charge.map(StateOfCharge::percent),
                "Direct session telemetry"
            );
        }

        InformProviderResponse {
            result: OchpResult::ok(),
        }
    }

    /// Release the EVSE. Repeating the call, or releasing an expired
    /// session, is still `OK`.
    pub fn release_evse(&self, request: &ReleaseEvseRequest, now: DateTime<Utc>) -> ReleaseEvseResponse {
        let Some(mut session) = self.sessions.get_mut(&request.direct_id) else {
            return ReleaseEvseResponse::from_result(unknown_session(&request.direct_id));
        };
        self.touch(&mut session, now);

        match session.release(now) {
            ReleaseOutcome::Released => {
                info!(direct_id = %request.direct_id, "🔓 Direct session released");
                self.publish(Event::DirectSessionReleased(DirectSessionReleasedEvent {
                    direct_id: request.direct_id.clone(),
                    evse_id: session.evse_id().clone(),
                    timestamp: now,
                }));
            }
            outcome => {
                debug!(direct_id = %request.direct_id, ?outcome, "Release repeated");
            }
        }

        ReleaseEvseResponse {
            result: OchpResult::ok(),
        }
    }

    /// Snapshot of a session after applying lazy expiry.
    pub fn session(&self, direct_id: &DirectId, now: DateTime<Utc>) -> Option<DirectSession> {
        let mut session = self.sessions.get_mut(direct_id)?;
        self.touch(&mut session, now);
        Some(session.clone())
    }

    /// Expire overdue sessions and evict terminal ones idle for longer
    /// than `retention`.
    pub fn sweep(&self, now: DateTime<Utc>, retention: Duration) -> SweepReport {
        let mut report = SweepReport::default();

        for mut entry in self.sessions.iter_mut() {
            if self.touch(entry.value_mut(), now) {
                report.expired += 1;
            }
        }

        self.sessions.retain(|_, session| {
            let retained_until = session.updated_at().checked_add_signed(retention);
            let keep = !(session.state().is_terminal() && retained_until.is_some_and(|t| t <= now));
            if !keep {
                report.evicted += 1;
            }
            keep
        });

        if report.expired > 0 || report.evicted > 0 {
            info!(expired = report.expired, evicted = report.evicted, "🧹 Direct session sweep");
        }
        report
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Refresh expiry and publish the transition. Returns `true` when
    /// this call expired the session.
    fn touch(&self, session: &mut DirectSession, now: DateTime<Utc>) -> bool {
        if !session.refresh(now) {
            return false;
        }
        info!(direct_id = %session.direct_id(), "⌛ Direct session expired");
        self.publish(Event::DirectSessionExpired(DirectSessionExpiredEvent {
            direct_id: session.direct_id().clone(),
            evse_id: session.evse_id().clone(),
            ttl: session.ttl(),
            timestamp: now,
        }));
        true
    }

    fn publish(&self, event: Event) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

impl Default for DirectSessionService {
    fn default() -> Self {
        Self::new(DirectSettings::default())
    }
}

fn unknown_session(direct_id: &DirectId) -> OchpResult {
    OchpResult::invalid_id(format!("unknown direct id {}", direct_id))
}

/// Protocol result for a refused session transition.
fn session_error_result(error: &SessionError) -> OchpResult {
    match error {
        SessionError::TtlNotInFuture(_) => OchpResult::format(error.to_string()),
        SessionError::Expired(_) | SessionError::Terminated(..) | SessionError::Mismatch { .. } => {
            OchpResult::invalid_id(error.to_string())
        }
    }
}
