use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::routes;
use crate::cache::ReleaseCache;
use crate::config::ServiceConfig;
use crate::message::ReleaseMessageBus;
use crate::message::ReleaseMessageListener;
use crate::message::ReleaseMessageScanner;
use crate::service::ConfigService;
use crate::watch::NotificationRegistry;
use crate::watch::NotificationService;
use crate::Error;
use crate::NamespaceRegistry;
use crate::ReleaseMessageStore;
use crate::ReleaseStore;
use crate::Result;

/// Assembles a [`ConfigServer`] from its store views.
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(());
/// let store = Arc::new(MemoryConfigStore::new());
/// let server = ConfigServerBuilder::new(config, shutdown_rx).with_store(store).build()?;
/// server.run().await?;
/// ```
pub struct ConfigServerBuilder {
    config: ServiceConfig,
    shutdown_signal: watch::Receiver<()>,
    release_store: Option<Arc<dyn ReleaseStore>>,
    message_store: Option<Arc<dyn ReleaseMessageStore>>,
    namespace_registry: Option<Arc<dyn NamespaceRegistry>>,
}

impl ConfigServerBuilder {
    pub fn new(
        config: ServiceConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            shutdown_signal,
            release_store: None,
            message_store: None,
            namespace_registry: None,
        }
    }

    /// Uses one backend for all three store views
    pub fn with_store<S>(
        self,
        store: Arc<S>,
    ) -> Self
    where
        S: ReleaseStore + ReleaseMessageStore + NamespaceRegistry,
    {
        self.with_release_store(store.clone())
            .with_release_message_store(store.clone())
            .with_namespace_registry(store)
    }

    pub fn with_release_store(
        mut self,
        store: Arc<dyn ReleaseStore>,
    ) -> Self {
        self.release_store = Some(store);
        self
    }

    pub fn with_release_message_store(
        mut self,
        store: Arc<dyn ReleaseMessageStore>,
    ) -> Self {
        self.message_store = Some(store);
        self
    }

    pub fn with_namespace_registry(
        mut self,
        registry: Arc<dyn NamespaceRegistry>,
    ) -> Self {
        self.namespace_registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<ConfigServer> {
        let release_store = self
            .release_store
            .ok_or_else(|| Error::InvalidConfig("release store not set".into()))?;
        let message_store = self
            .message_store
            .ok_or_else(|| Error::InvalidConfig("release message store not set".into()))?;
        let namespace_registry = self
            .namespace_registry
            .ok_or_else(|| Error::InvalidConfig("namespace registry not set".into()))?;

        let cache = ReleaseCache::new(release_store, message_store.clone(), &self.config.cache);
        let registry = NotificationRegistry::new(self.config.long_poll.clone());

        // cache first: clients woken by the registry must read the new release
        let bus = ReleaseMessageBus::new()
            .with_listener(Arc::new(cache.clone()) as Arc<dyn ReleaseMessageListener>)
            .with_listener(Arc::new(registry.clone()) as Arc<dyn ReleaseMessageListener>);

        let config_service = ConfigService::new(cache.clone(), namespace_registry.clone());
        let notification_service = NotificationService::new(registry, namespace_registry, message_store.clone());

        Ok(ConfigServer {
            config: self.config,
            shutdown_signal: self.shutdown_signal,
            cache,
            bus: Arc::new(bus),
            message_store,
            config_service,
            notification_service,
        })
    }
}

/// Config service process: HTTP routes plus the background tasks feeding them
pub struct ConfigServer {
    config: ServiceConfig,
    shutdown_signal: watch::Receiver<()>,
    cache: ReleaseCache,
    bus: Arc<ReleaseMessageBus>,
    message_store: Arc<dyn ReleaseMessageStore>,
    config_service: ConfigService,
    notification_service: NotificationService,
}

impl std::fmt::Debug for ConfigServer {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConfigServer")
            .field("config", &self.config)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl ConfigServer {
    /// Inbound side for an in-process publisher
    pub fn bus(&self) -> Arc<ReleaseMessageBus> {
        self.bus.clone()
    }

    pub fn cache(&self) -> &ReleaseCache {
        &self.cache
    }

    pub fn config_service(&self) -> &ConfigService {
        &self.config_service
    }

    pub fn notification_service(&self) -> &NotificationService {
        &self.notification_service
    }

    /// Starts the message scanner, the cache sweeper and the HTTP listener
    pub async fn start(self) -> Result<RunningServer> {
        let scanner = ReleaseMessageScanner::new(
            self.message_store.clone(),
            self.bus.clone(),
            self.config.message.clone(),
        )
        .await?;
        let scanner_handle = scanner.spawn(self.shutdown_signal.clone());

        let sweeper_handle = self
            .cache
            .spawn_sweeper(self.config.cache.sweep_interval(), self.shutdown_signal.clone());

        let routes = routes(self.config_service.clone(), self.notification_service.clone());
        let mut shutdown = self.shutdown_signal.clone();
        let (local_addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(self.config.server.listen_address, async move {
                let _ = shutdown.changed().await;
                debug!("http server received shutdown signal");
            })
            .map_err(|e| Error::Fatal(format!("failed to bind {}: {e}", self.config.server.listen_address)))?;

        info!(%local_addr, "config service listening");
        let http_handle = tokio::spawn(server);

        Ok(RunningServer {
            local_addr,
            http_handle,
            background: vec![scanner_handle, sweeper_handle],
        })
    }

    /// Serves until the shutdown signal fires
    pub async fn run(self) -> Result<()> {
        self.start().await?.wait().await
    }
}

/// Handle of a started [`ConfigServer`]
#[derive(Debug)]
pub struct RunningServer {
    local_addr: SocketAddr,
    http_handle: JoinHandle<()>,
    background: Vec<JoinHandle<()>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the listener and background tasks to stop
    pub async fn wait(self) -> Result<()> {
        if let Err(e) = self.http_handle.await {
            error!("http server task failed: {:?}", e);
            return Err(Error::Fatal(format!("http server task failed: {e}")));
        }
        for handle in self.background {
            if let Err(e) = handle.await {
                error!("background task failed: {:?}", e);
            }
        }
        info!("config service stopped");
        Ok(())
    }
}
