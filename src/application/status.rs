//! Latest-status store for EVSEs and parking spots

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::application::events::{Event, EvseStatusChangedEvent, SharedEventBus};
use crate::codec::messages::{GetEvseStatusResponse, GetStatusResponse, UpdateStatusRequest};
use crate::codec::OchpResult;
use crate::domain::{EvseId, EvseMajorStatus, EvseStatus, ParkingId, ParkingStatus};

#[derive(Debug, Clone)]
struct Stored<T> {
    status: T,
    received_at: DateTime<Utc>,
}

pub struct StatusService {
    evse: DashMap<EvseId, Stored<EvseStatus>>,
    parking: DashMap<ParkingId, Stored<ParkingStatus>>,
    event_bus: Option<SharedEventBus>,
}

pub type SharedStatusService = Arc<StatusService>;

impl StatusService {
    pub fn new() -> Self {
        Self {
            evse: DashMap::new(),
            parking: DashMap::new(),
            event_bus: None,
        }
    }

    pub fn with_event_bus(event_bus: SharedEventBus) -> Self {
        Self {
            event_bus: Some(event_bus),
            ..Self::new()
        }
    }

    /// Store a status batch. Entries already past their TTL (own or the
    /// request default) are refused, and stored entries that have expired
    /// are dropped first.
    pub fn update(&self, request: &UpdateStatusRequest, now: DateTime<Utc>) -> OchpResult {
        self.prune(now);
        let total = request.evse.len() + request.parking.len();
        let mut accepted = 0;

        for status in &request.evse {
            let status = status.with_default_ttl(request.ttl);
            if status.is_expired_at(now) {
                warn!(evse_id = %status.evse_id(), "Refusing EVSE status past its TTL");
                continue;
            }
            self.store_evse(status, now);
            accepted += 1;
        }

        for status in &request.parking {
            let status = status.with_default_ttl(request.ttl);
            if status.is_expired_at(now) {
                warn!(parking_id = %status.parking_id(), "Refusing parking status past its TTL");
                continue;
            }
            self.parking.insert(
                status.parking_id().clone(),
                Stored {
                    status,
                    received_at: now,
                },
            );
            accepted += 1;
        }

        info!(accepted, total, "📊 Status update processed");
        OchpResult::batch(accepted, total)
    }

    fn store_evse(&self, status: EvseStatus, now: DateTime<Utc>) {
        let changed = self
            .evse
            .get(status.evse_id())
            .map(|prev| prev.status.major() != status.major() || prev.status.minor() != status.minor())
            .unwrap_or(true);

        if changed {
            debug!(
                evse_id = %status.evse_id(),
                major = %status.major(),
                minor = ?status.minor(),
                "EVSE status changed"
            );
            if let Some(bus) = &self.event_bus {
                bus.publish(Event::EvseStatusChanged(EvseStatusChangedEvent {
                    evse_id: status.evse_id().clone(),
                    major: status.major(),
                    minor: status.minor(),
                    timestamp: now,
                }));
            }
        }

        self.evse.insert(
            status.evse_id().clone(),
            Stored {
                status,
                received_at: now,
            },
        );
    }

    /// Live statuses received at or after `since` (all when `None`),
    /// ordered by identifier.
    pub fn get_status(&self, since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> GetStatusResponse {
        let wanted = |received_at: DateTime<Utc>| since.map_or(true, |since| received_at >= since);

        let mut evse: Vec<EvseStatus> = self
            .evse
            .iter()
            .filter(|e| wanted(e.received_at) && !e.status.is_expired_at(now))
            .map(|e| e.status.clone())
            .collect();
        evse.sort_by(|a, b| a.evse_id().cmp(b.evse_id()));

        let mut parking: Vec<ParkingStatus> = self
            .parking
            .iter()
            .filter(|p| wanted(p.received_at) && !p.status.is_expired_at(now))
            .map(|p| p.status.clone())
            .collect();
        parking.sort_by(|a, b| a.parking_id().cmp(b.parking_id()));

        GetStatusResponse {
            result: OchpResult::ok(),
            evse,
            parking,
        }
    }

    /// Current status per requested EVSE; unknown or expired entries are
    /// reported as major `unknown`.
    pub fn evse_status(&self, evse_ids: &[EvseId], now: DateTime<Utc>) -> GetEvseStatusResponse {
        let evse = evse_ids
            .iter()
            .map(|id| {
                self.evse
                    .get(id)
                    .filter(|stored| !stored.status.is_expired_at(now))
                    .map(|stored| stored.status.clone())
                    .unwrap_or_else(|| EvseStatus::major_only(id.clone(), EvseMajorStatus::Unknown))
            })
            .collect();

        GetEvseStatusResponse {
            result: OchpResult::ok(),
            evse,
        }
    }

    /// Drop every stored status whose TTL has passed. Returns how many
    /// entries were removed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let before = self.evse.len() + self.parking.len();
        self.evse.retain(|_, stored| !stored.status.is_expired_at(now));
        self.parking.retain(|_, stored| !stored.status.is_expired_at(now));
        let removed = before.saturating_sub(self.evse.len() + self.parking.len());
        if removed > 0 {
            debug!(removed, "Expired statuses pruned");
        }
        removed
    }

    pub fn evse_count(&self) -> usize {
        self.evse.len()
    }

    pub fn parking_count(&self) -> usize {
        self.parking.len()
    }
}

impl Default for StatusService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ResultCode;
    use crate::domain::{EvseMinorStatus, ParkingStatusType};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn evse(id: &str, ttl: Option<DateTime<Utc>>) -> EvseStatus {
        EvseStatus::new(
            EvseId::parse(id).unwrap(),
            EvseMajorStatus::NotAvailable,
            Some(EvseMinorStatus::Charging),
            ttl,
        )
        .unwrap()
    }

    #[test]
    fn full_batch_is_ok() {
        let service = StatusService::new();
        let req = UpdateStatusRequest {
            evse: vec![evse("DE*GEF*E1", None)],
            parking: vec![ParkingStatus::new(
                ParkingId::parse("DE*GEF*P1").unwrap(),
                ParkingStatusType::Available,
                None,
            )],
            ttl: Some(t0() + Duration::minutes(10)),
        };
        assert_eq!(service.update(&req, t0()), OchpResult::ok());

        let all = service.get_status(None, t0());
        assert_eq!(all.evse.len(), 1);
        // request default applied
        assert_eq!(all.evse[0].ttl(), Some(t0() + Duration::minutes(10)));
        assert_eq!(all.parking.len(), 1);
    }

    #[test]
    fn stale_entries_make_the_batch_partly() {
        let service = StatusService::new();
        let req = UpdateStatusRequest {
            evse: vec![evse("DE*GEF*E1", Some(t0() - Duration::seconds(1))), evse("DE*GEF*E2", None)],
            ..Default::default()
        };
        let result = service.update(&req, t0());
        assert_eq!(result.code, ResultCode::Partly);
        assert_eq!(service.evse_count(), 1);
    }

    #[test]
    fn all_stale_is_format() {
        let service = StatusService::new();
        let req = UpdateStatusRequest {
            evse: vec![evse("DE*GEF*E1", Some(t0()))],
            ..Default::default()
        };
        assert_eq!(service.update(&req, t0()).code, ResultCode::Format);
    }

    #[test]
    fn get_status_filters_by_receive_time_and_ttl() {
        let service = StatusService::new();
        let first = UpdateStatusRequest {
            evse: vec![evse("DE*GEF*E1", Some(t0() + Duration::minutes(1)))],
            ..Default::default()
        };
        service.update(&first, t0());
        let second = UpdateStatusRequest {
            evse: vec![evse("DE*GEF*E2", None)],
            ..Default::default()
        };
        service.update(&second, t0() + Duration::minutes(5));

        let since = service.get_status(Some(t0() + Duration::minutes(5)), t0() + Duration::minutes(5));
        assert_eq!(since.evse.len(), 1);
        assert_eq!(since.evse[0].evse_id().to_string(), "DE*GEF*E2");

        // E1 has expired by now
        assert_eq!(service.get_status(None, t0() + Duration::minutes(5)).evse.len(), 1);
    }

    #[test]
    fn expired_statuses_are_pruned() {
        let service = StatusService::new();
        service.update(
            &UpdateStatusRequest {
                evse: vec![
                    evse("DE*GEF*E1", Some(t0() + Duration::minutes(1))),
                    evse("DE*GEF*E2", None),
                ],
                parking: vec![ParkingStatus::new(
                    ParkingId::parse("DE*GEF*P1").unwrap(),
                    ParkingStatusType::NotAvailable,
                    Some(t0() + Duration::minutes(1)),
                )],
                ttl: None,
            },
            t0(),
        );
        assert_eq!(service.evse_count(), 2);
        assert_eq!(service.parking_count(), 1);

        assert_eq!(service.prune(t0()), 0);
        assert_eq!(service.prune(t0() + Duration::minutes(1)), 2);
        assert_eq!(service.evse_count(), 1);
        assert_eq!(service.parking_count(), 0);
    }

    #[test]
    fn update_drops_entries_that_expired_meanwhile() {
        let service = StatusService::new();
        service.update(
            &UpdateStatusRequest {
                evse: vec![evse("DE*GEF*E1", Some(t0() + Duration::minutes(1)))],
                ..Default::default()
            },
            t0(),
        );
        service.update(
            &UpdateStatusRequest {
                evse: vec![evse("DE*GEF*E2", None)],
                ..Default::default()
            },
            t0() + Duration::minutes(2),
        );
        assert_eq!(service.evse_count(), 1);
    }

    #[test]
    fn evse_status_reports_unknown_for_missing_ids() {
        let service = StatusService::new();
        service.update(
            &UpdateStatusRequest {
                evse: vec![evse("DE*GEF*E1", None)],
                ..Default::default()
            },
            t0(),
        );
        let ids = vec![EvseId::parse("DE*GEF*E1").unwrap(), EvseId::parse("DE*GEF*E9").unwrap()];
        let resp = service.evse_status(&ids, t0());
        assert_eq!(resp.evse[0].major(), EvseMajorStatus::NotAvailable);
        assert_eq!(resp.evse[1].major(), EvseMajorStatus::Unknown);
    }
}
