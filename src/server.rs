//! OCHP node runtime.
//!
//! [`ServerHandle`] owns the whole lifecycle: stores, event bus and event
//! log, endpoint preload, the HTTP server, the sweep task and graceful
//! shutdown.
//!
//! The node only answers inbound SOAP. Outbound OCHPdirect calls go through
//! [`DirectRouter`](crate::application::DirectRouter), which an embedder
//! builds from [`ServerHandle::handler`]'s endpoint registry and its own
//! [`OchpTransport`](crate::application::OchpTransport).

use std::sync::Arc;

use tracing::{error, info};

use crate::application::{
    create_event_bus, start_event_log_task, start_session_sweep_task, DirectSessionService,
    EndpointRegistry, OchpHandler, RoamingAuthorisationService, SharedEventBus, StatusService,
};
use crate::config::AppConfig;
use crate::interfaces::http::{create_router, AppState};
use crate::support::shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Handle to a running OCHP node.
pub struct ServerHandle {
    /// Shared event bus for session and status notifications.
    pub event_bus: SharedEventBus,
    pub handler: Arc<OchpHandler>,
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Port the HTTP server is listening on.
    pub port: u16,

    shutdown: ShutdownCoordinator,
    http_task: tokio::task::JoinHandle<()>,
    sweep_task: Option<tokio::task::JoinHandle<()>>,
    event_log_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Build the stores, register configured endpoints, bind the listener
    /// and spawn the background tasks.
    pub async fn start(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Starting OCHP service...");

        let event_bus = create_event_bus();
        info!("🔔 Event bus initialized");

        let endpoints = Arc::new(EndpointRegistry::with_event_bus(event_bus.clone()));
        for registration in config.endpoints.iter().cloned() {
            endpoints.upsert(registration);
        }
        info!(count = endpoints.count(), "Configured endpoints registered");

        let direct = Arc::new(DirectSessionService::with_event_bus(
            config.direct.settings(),
            event_bus.clone(),
        ));
        let status = Arc::new(StatusService::with_event_bus(event_bus.clone()));
        let handler = Arc::new(OchpHandler::new(
            status.clone(),
            Arc::new(RoamingAuthorisationService::new()),
            endpoints,
            direct.clone(),
            event_bus.clone(),
        ));

        // ── Shutdown coordinator ───────────────────────────────
        let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        // ── Background tasks ───────────────────────────────────
        let event_log_task = start_event_log_task(&event_bus, shutdown_signal.clone());

        let sweep_task = (config.direct.sweep_interval_secs > 0).then(|| {
            start_session_sweep_task(
                direct,
                status,
                shutdown_signal.clone(),
                config.direct.sweep_interval_secs,
                config.direct.retention(),
            )
        });

        // ── HTTP server ────────────────────────────────────────
        let router = create_router(AppState::new(handler.clone()));
        let addr = config.address();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();
        info!("OCHP SOAP endpoints listening on http://{}/ochp", addr);

        let http_shutdown = shutdown_signal.notified();
        let http_server = axum::serve(listener, router).with_graceful_shutdown(async move {
            http_shutdown.wait().await;
            info!("🛑 HTTP server received shutdown signal");
        });

        let http_task = tokio::spawn(async move {
            if let Err(e) = http_server.await {
                error!("HTTP server error: {}", e);
            }
        });

        info!("🚀 OCHP service started.");

        Ok(Self {
            event_bus,
            handler,
            config,
            port,
            shutdown,
            http_task,
            sweep_task,
            event_log_task,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for shutdown, then for the tasks to stop within the configured
    /// timeout.
    pub async fn wait(self) {
        let Self {
            shutdown,
            http_task,
            sweep_task,
            event_log_task,
            ..
        } = self;

        let drained = shutdown
            .shutdown_with_cleanup(async move {
                if let Err(e) = http_task.await {
                    error!("HTTP server task panicked: {}", e);
                }
                if let Some(task) = sweep_task {
                    if let Err(e) = task.await {
                        error!("Sweep task panicked: {}", e);
                    }
                }
                if let Err(e) = event_log_task.await {
                    error!("Event log task panicked: {}", e);
                }
            })
            .await;

        if drained {
            info!("👋 OCHP service shutdown complete");
        } else {
            error!("OCHP service stopped with tasks still running");
        }
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down OCHP service...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.http_task.is_finished()
    }
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup (before [`ServerHandle::start`]).
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use crate::application::{DirectRouter, OchpTransport, TransportError};
    use crate::codec::messages::SelectEvseRequest;
    use crate::domain::{EndpointRegistration, EndpointRole, EvseId};

    /// Hands envelopes straight to a local node.
    struct LoopbackTransport {
        handler: Arc<OchpHandler>,
    }

    #[async_trait]
    impl OchpTransport for LoopbackTransport {
        async fn send(
            &self,
            _endpoint: &EndpointRegistration,
            envelope: String,
        ) -> Result<String, TransportError> {
            Ok(self.handler.handle(&envelope, Utc::now()).envelope)
        }
    }

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".into();
        config.server.port = 0;
        config.server.shutdown_timeout = 5;
        config.endpoints.push(EndpointRegistration {
            role: EndpointRole::Operator,
            url: "https://cpo.example/direct".into(),
            namespace_url: "http://ochp.eu/1.4".into(),
            access_token: "t".into(),
            valid_date: Utc::now() + Duration::days(1),
            whitelist: vec!["DE*GEF".into()],
            blacklist: Vec::new(),
        });
        config
    }

    #[tokio::test]
    async fn starts_on_an_ephemeral_port_and_shuts_down() {
        let handle = ServerHandle::start(test_config()).await.unwrap();
        assert_ne!(handle.port, 0);
        assert!(handle.is_running());
        assert_eq!(handle.handler.endpoints.count(), 1);
        // the event log
        assert_eq!(handle.event_bus.subscriber_count(), 1);

        tokio::time::timeout(std::time::Duration::from_secs(10), handle.shutdown())
            .await
            .expect("shutdown should complete");
    }

    #[tokio::test]
    async fn embedder_routes_direct_messages_with_the_node_registry() {
        let handle = ServerHandle::start(test_config()).await.unwrap();
        let router = DirectRouter::new(
            handle.handler.endpoints.clone(),
            Arc::new(LoopbackTransport {
                handler: handle.handler.clone(),
            }),
        );

        let request = SelectEvseRequest {
            evse_id: EvseId::parse("DE*GEF*E1").unwrap(),
            contract_id: None,
            reserve_until: None,
        };
        let reply = router.select_evse(&request, Utc::now()).await;
        assert!(reply.result.is_ok());
        assert!(reply.direct_id.is_some());
        assert_eq!(handle.handler.direct.count(), 1);

        tokio::time::timeout(std::time::Duration::from_secs(10), handle.shutdown())
            .await
            .expect("shutdown should complete");
    }
}
