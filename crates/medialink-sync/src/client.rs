//! The dashboard client facade.
//!
//! Wires the connection manager, cache engine, rate limiter, and
//! orchestrator into the one object UI layers hold, and exposes the public
//! operations: `submit`, the admission read-side, the connection read-side,
//! `refresh_resource`, and `reconnect`.
//!
//! The facade owns its push-routing registrations and tears them down
//! symmetrically in [`DashboardClient::close`], so a discarded client never
//! leaves dangling handlers on the transport.

use std::path::Path;
use std::sync::Arc;

use medialink_core::errors::MedialinkError;
use medialink_core::state::{ConnectionQuality, ConnectionState};
use medialink_ledger::{JsonFileStore, LedgerStore, RateLimiter};
use medialink_transport::{
    ConnectionManager, Credentials, ManagerConfig, ObserverId, SubscriptionHandle, Transport,
    WsTransport,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{KeyedCache, MemoryCache};
use crate::config::ClientConfig;
use crate::engine::{CacheEngine, kind};
use crate::markers::UpdateMarkers;
use crate::orchestrator::{RequestOrchestrator, SubmitOutcome};
use crate::submit::{MediaRequest, SubmissionApi};

/// The realtime layer's public surface for UI components.
pub struct DashboardClient {
    manager: Arc<ConnectionManager>,
    engine: Arc<CacheEngine>,
    orchestrator: RequestOrchestrator,
    cache: Arc<dyn KeyedCache>,
    routes: Mutex<Vec<(&'static str, SubscriptionHandle)>>,
}

impl DashboardClient {
    /// Wire a client over explicit collaborators.
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        api: Arc<dyn SubmissionApi>,
        cache: Arc<dyn KeyedCache>,
        store: Arc<dyn LedgerStore>,
    ) -> Self {
        let manager = Arc::new(ConnectionManager::new(
            transport,
            ManagerConfig {
                policy: config.reconnect,
                credentials: credentials_from(config),
                probe_timeout_ms: config.probe_timeout_ms,
            },
        ));
        let engine = Arc::new(CacheEngine::new(
            cache.clone(),
            UpdateMarkers::new(config.marker_ttl_ms),
        ));

        // Route push updates through the engine. One registration per
        // resource channel; torn down in `close`.
        let mut routes = Vec::new();
        for event in [
            medialink_core::messages::event::SERVICE_STATUS,
            medialink_core::messages::event::REQUEST_STATUS,
        ] {
            let engine_for_route = Arc::clone(&engine);
            let handle = manager.on(event, move |message| engine_for_route.apply(message));
            routes.push((event, handle));
        }

        let limiter = RateLimiter::new(store);
        let orchestrator = RequestOrchestrator::new(
            api,
            limiter,
            cache.clone(),
            Arc::clone(&manager),
            config.request_limit,
            config.request_window_ms,
        );

        Self {
            manager,
            engine,
            orchestrator,
            cache,
            routes: Mutex::new(routes),
        }
    }

    /// Wire a client from configuration alone, using the WebSocket
    /// transport, a file-backed ledger under the data directory, and a
    /// fresh in-memory collection.
    pub fn from_config(
        config: &ClientConfig,
        api: Arc<dyn SubmissionApi>,
    ) -> Result<Self, MedialinkError> {
        let transport = Arc::new(WsTransport::new(&config.endpoint)?);
        let store = Arc::new(JsonFileStore::in_dir(Path::new(&config.data_dir)));
        let cache = MemoryCache::shared();
        Ok(Self::new(config, transport, api, cache, store))
    }

    // ── Connection ──────────────────────────────────────────────────────────

    /// Open the link. Idempotent.
    pub fn connect(&self) {
        self.manager.connect();
    }

    /// Explicit disconnect-then-reconnect with a short fixed delay.
    pub async fn reconnect(&self) {
        self.manager.reconnect().await;
    }

    /// Whether the link is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Latest probe-derived quality bucket.
    #[must_use]
    pub fn connection_quality(&self) -> ConnectionQuality {
        self.manager.connection_quality()
    }

    /// Run a round-trip probe and return the resulting bucket.
    pub async fn check_connection_quality(&self) -> ConnectionQuality {
        self.manager.check_connection_quality().await
    }

    /// Latest measured round trip in milliseconds.
    #[must_use]
    pub fn latency(&self) -> Option<u64> {
        self.manager.latency()
    }

    /// Register a connection-state observer.
    pub fn on_state_change(
        &self,
        observer: impl Fn(&ConnectionState) + Send + Sync + 'static,
    ) -> ObserverId {
        self.manager.on_state_change(observer)
    }

    /// Remove exactly the observer registered under `id`.
    pub fn remove_state_observer(&self, id: ObserverId) {
        self.manager.remove_state_observer(id);
    }

    // ── Requests ────────────────────────────────────────────────────────────

    /// Submit a media request through admission control.
    pub async fn submit(&self, request: &MediaRequest) -> Result<SubmitOutcome, MedialinkError> {
        self.orchestrator.submit(request).await
    }

    /// Ask the backend to re-push one resource.
    pub fn refresh_resource(&self, resource_id: &str) {
        self.orchestrator.refresh_resource(resource_id);
    }

    /// Stop following a tracked request's push updates.
    pub fn stop_tracking(&self, request_id: &str) {
        self.orchestrator.stop_tracking(request_id);
    }

    /// Whether one more submission would be admitted now.
    #[must_use]
    pub fn can_request(&self) -> bool {
        self.orchestrator.can_request()
    }

    /// Remaining quota in the current window.
    #[must_use]
    pub fn remaining_requests(&self) -> u32 {
        self.orchestrator.remaining_requests()
    }

    /// When the oldest counted admission leaves the window.
    #[must_use]
    pub fn reset_time(&self) -> Option<i64> {
        self.orchestrator.reset_time()
    }

    // ── Read cache ──────────────────────────────────────────────────────────

    /// The shared keyed collection UI layers read from.
    #[must_use]
    pub fn cache(&self) -> Arc<dyn KeyedCache> {
        self.cache.clone()
    }

    /// Whether a monitored service changed within the marker lifetime.
    #[must_use]
    pub fn is_service_recently_updated(&self, id: &str) -> bool {
        self.engine.is_recently_updated(kind::SERVICE, id)
    }

    /// Whether a media request changed within the marker lifetime.
    #[must_use]
    pub fn is_request_recently_updated(&self, id: &str) -> bool {
        self.engine.is_recently_updated(kind::REQUEST, id)
    }

    // ── Teardown ────────────────────────────────────────────────────────────

    /// Remove this client's push routes and tear down the link.
    ///
    /// Idempotent; also invoked on drop.
    pub fn close(&self) {
        let routes = std::mem::take(&mut *self.routes.lock());
        if !routes.is_empty() {
            debug!(count = routes.len(), "removing push routes");
        }
        for (event, handle) in routes {
            self.manager.off(event, handle);
        }
        self.manager.disconnect();
    }
}

impl Drop for DashboardClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn credentials_from(config: &ClientConfig) -> Option<Credentials> {
    match (&config.username, &config.password) {
        (Some(username), Some(password)) => Some(Credentials {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_require_both_halves() {
        let mut config = ClientConfig::default();
        assert!(credentials_from(&config).is_none());

        config.username = Some("admin".into());
        assert!(credentials_from(&config).is_none());

        config.password = Some("hunter2".into());
        let credentials = credentials_from(&config).unwrap();
        assert_eq!(credentials.username, "admin");
        assert_eq!(credentials.password, "hunter2");
    }

    #[test]
    fn from_config_rejects_bad_endpoint() {
        struct NoApi;
        #[async_trait::async_trait]
        impl SubmissionApi for NoApi {
            async fn submit_request(
                &self,
                _request: &MediaRequest,
            ) -> Result<crate::submit::SubmitReceipt, crate::submit::ApiError> {
                Err(crate::submit::ApiError("unused".into()))
            }
        }

        let config = ClientConfig {
            endpoint: "ftp://nope".into(),
            ..ClientConfig::default()
        };
        assert!(DashboardClient::from_config(&config, Arc::new(NoApi)).is_err());
    }
}
