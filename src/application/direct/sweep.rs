//! Background task that periodically sweeps the direct session table and
//! the status store.
//!
//! Expiry is already applied on every access; the sweep only makes
//! expiry observable for untouched sessions, evicts old terminal ones and
//! drops statuses past their TTL.

use chrono::Utc;
use tokio::time::Duration;
use tracing::info;

use super::service::SharedDirectSessionService;
use crate::application::status::SharedStatusService;
use crate::support::shutdown::ShutdownSignal;

/// Start the sweep task. Runs every `interval_secs` until shutdown.
pub fn start_session_sweep_task(
    service: SharedDirectSessionService,
    status: SharedStatusService,
    shutdown: ShutdownSignal,
    interval_secs: u64,
    retention: chrono::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval = interval_secs, "🧹 Direct session sweep task started");

        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        let stopped = shutdown.notified().wait();
        tokio::pin!(stopped);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = Utc::now();
                    service.sweep(now, retention);
                    status.prune(now);
                }
                _ = &mut stopped => {
                    info!("🧹 Direct session sweep task shutting down");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::direct::{DirectSessionService, DirectSettings};
    use crate::application::status::StatusService;
    use crate::codec::messages::{SelectEvseRequest, UpdateStatusRequest};
    use crate::domain::{ContractId, EvseId, EvseMajorStatus, EvseStatus};
    use std::sync::Arc;

    #[tokio::test]
    async fn sweep_task_stops_on_shutdown() {
        let service = Arc::new(DirectSessionService::new(DirectSettings {
            default_reservation: None,
            max_reservation: chrono::Duration::minutes(30),
        }));
        service.select_evse(
            &SelectEvseRequest {
                evse_id: EvseId::parse("DE*GEF*E1").unwrap(),
                contract_id: Some(ContractId::parse("DE-GDF-123456789-1").unwrap()),
                reserve_until: None,
            },
            Utc::now(),
        );

        let shutdown = ShutdownSignal::new();
        let handle = start_session_sweep_task(
            service.clone(),
            Arc::new(StatusService::new()),
            shutdown.clone(),
            1,
            chrono::Duration::zero(),
        );
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweep task did not stop")
            .unwrap();

        // live session without ttl survives any sweep
        assert_eq!(service.count(), 1);
    }

    #[tokio::test]
    async fn sweep_task_prunes_expired_statuses() {
        let status = Arc::new(StatusService::new());
        let now = Utc::now();
        let expiring = EvseStatus::new(
            EvseId::parse("DE*GEF*E1").unwrap(),
            EvseMajorStatus::Available,
            None,
            Some(now + chrono::Duration::milliseconds(200)),
        )
        .unwrap();
        status.update(
            &UpdateStatusRequest {
                evse: vec![expiring],
                ..Default::default()
            },
            now,
        );
        assert_eq!(status.evse_count(), 1);

        let shutdown = ShutdownSignal::new();
        let handle = start_session_sweep_task(
            Arc::new(DirectSessionService::default()),
            status.clone(),
            shutdown.clone(),
            1,
            chrono::Duration::zero(),
        );

        // first tick fires immediately, the second one a second later
        tokio::time::timeout(Duration::from_secs(5), async {
            while status.evse_count() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("expired status was not pruned");

        shutdown.trigger();
        handle.await.unwrap();
    }
}
