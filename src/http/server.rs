//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build every vhost and its middleware pipeline at startup
//! - Create the Axum Router dispatching on the `Host` header
//! - Wire up tower layers (timeout, tracing, request ID)
//! - Serve plain or TLS listeners with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    response::Response,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::GatewayConfig;
use crate::config::validation::ValidationError;
use crate::config::ConfigError;
use crate::error::GatewayError;
use crate::http::leaf::StaticLeaf;
use crate::http::middleware::{compose, BoxHandler, LeafHandler, PipelineParts, PreMiddleware, PIPELINE};
use crate::http::proxy::ProxyClient;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::vhost::context::VhostContext;
use crate::vhost::selector::VhostSelector;

/// A vhost together with its composed pipeline.
pub struct VhostPipeline {
    pub context: Arc<VhostContext>,
    pub handler: BoxHandler,
}

type Selector = Arc<VhostSelector<VhostPipeline>>;

/// Assembles a [`Gateway`] from configuration and optional extensions.
pub struct GatewayBuilder {
    config: GatewayConfig,
    pre: Vec<Arc<dyn PreMiddleware>>,
    leaf: Option<Arc<dyn LeafHandler>>,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            pre: Vec::new(),
            leaf: None,
        }
    }

    /// Append an operator middleware; they run in the order added.
    pub fn pre_middleware(mut self, middleware: impl PreMiddleware) -> Self {
        self.pre.push(Arc::new(middleware));
        self
    }

    /// Replace the default [`StaticLeaf`].
    pub fn leaf(mut self, leaf: impl LeafHandler) -> Self {
        self.leaf = Some(Arc::new(leaf));
        self
    }

    /// Build every vhost, reporting all defects in one [`GatewayError::Build`].
    pub fn build(self) -> Result<Gateway, GatewayError> {
        let mut contexts = Vec::with_capacity(self.config.vhosts.len());
        let mut errors = Vec::new();
        for (index, vhost) in self.config.vhosts.iter().enumerate() {
            match VhostContext::from_config(vhost) {
                Ok(ctx) => contexts.push(Arc::new(ctx)),
                Err(errs) => errors.push(GatewayError::Vhost { index, errors: errs }),
            }
        }
        GatewayError::check(errors)?;

        let leaf: Arc<dyn LeafHandler> = match self.leaf {
            Some(leaf) => leaf,
            None => {
                let connect = Duration::from_secs(self.config.timeouts.connect_secs);
                let client = ProxyClient::new(&self.config.proxy, connect)?;
                Arc::new(StaticLeaf::new(client))
            }
        };
        let pre: Arc<[Arc<dyn PreMiddleware>]> = self.pre.into();

        let pipelines = contexts.into_iter().map(|vhost| {
            let parts = PipelineParts {
                vhost: Arc::clone(&vhost),
                pre: Arc::clone(&pre),
                leaf: Arc::clone(&leaf),
            };
            let pipeline = VhostPipeline {
                handler: compose(&PIPELINE, &parts),
                context: vhost,
            };
            (pipeline.context.hostnames().to_vec(), pipeline)
        });
        let selector = VhostSelector::new(pipelines)
            .ok_or(ConfigError::Validation(vec![ValidationError::NoVhosts]))?;

        tracing::info!(
            vhosts = self.config.vhosts.len(),
            hostnames = selector.len(),
            middlewares = pre.len(),
            "Gateway built"
        );

        Ok(Gateway {
            selector: Arc::new(selector),
            config: self.config,
        })
    }
}

/// The composed file-serving gateway.
pub struct Gateway {
    selector: Selector,
    config: GatewayConfig,
}

impl Gateway {
    /// Build with the default leaf and no operator middlewares.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        GatewayBuilder::new(config).build()
    }

    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    /// The Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(Arc::clone(&self.selector))
            .layer(TimeoutLayer::new(Duration::from_secs(self.config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run a TLS listener; in-flight requests get `shutdown_secs` to finish.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let handle = axum_server::Handle::new();
        let grace = Duration::from_secs(self.config.timeouts.shutdown_secs);
        let signal = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!(grace_secs = grace.as_secs(), "Shutdown signal received");
            signal.graceful_shutdown(Some(grace));
        });

        tracing::info!(address = %addr, "HTTPS server starting");
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router().into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Select the vhost and run its pipeline.
async fn dispatch(State(selector): State<Selector>, request: Request<Body>) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().host())
        .map(str::to_owned);
    let vhost = selector.select(host.as_deref());
    (vhost.handler)(request).await
}
