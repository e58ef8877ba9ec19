//! Registry and Broker HTTP surfaces (§6), served over mutual TLS (§10.6).
//!
//! Generalizes this codebase's gRPC `ServerBuilder`/`GrpcServer` pair into a
//! TLS-terminating axum server: `rustls`/`tokio-rustls` do the handshake,
//! `hyper-util`'s auto builder drives the connection, and axum's `Router`
//! stays the actual request-handling surface.

pub mod identity;
pub mod routes_broker;
pub mod routes_registry;
pub mod tls;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Extension;
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tower::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::broker::DispatchEngine;
use crate::broker::SubscriptionTable;
use crate::error::InfraResult;
use crate::registry::RegistryStore;

use self::identity::{extract_client_identity, ClientIdentity};

pub struct AppState {
    pub registry: Arc<RegistryStore>,
    pub subscriptions: Arc<SubscriptionTable>,
    pub dispatch: Arc<DispatchEngine>,
}

/// `request_timeout` bounds every inbound request on the merged router;
/// callers pass `config.discovery.register_timeout_ms` (§5), the longest of
/// this contract's inbound timeouts.
pub fn build_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .merge(routes_registry::router())
        .merge(routes_broker::router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Accepts connections on `addr`, terminating TLS and serving `router` on
/// each one until `shutdown` is cancelled. Each connection gets the calling
/// instance's `clientIdentity` attached to every request it sends (§6).
pub async fn serve_mtls(
    addr: SocketAddr,
    tls_config: Arc<rustls::ServerConfig>,
    router: Router,
    shutdown: CancellationToken,
) -> InfraResult<()> {
    let acceptor = TlsAcceptor::from(tls_config);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "mTLS listener bound");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("server shutdown requested");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let acceptor = acceptor.clone();
                let router = router.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, acceptor, router).await {
                        tracing::debug!(%peer, error = %err, "connection ended with error");
                    }
                });
            }
        }
    }
    Ok(())
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    acceptor: TlsAcceptor,
    router: Router,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let tls_stream = acceptor.accept(stream).await?;
    let identity = tls_stream
        .get_ref()
        .1
        .peer_certificates()
        .and_then(|certs| certs.first())
        .and_then(extract_client_identity)
        .unwrap_or_else(|| ClientIdentity("unknown".into()));

    let service = router.layer(Extension(identity));
    let io = TokioIo::new(tls_stream);
    let hyper_service = TowerToHyperService::new(service);
    auto::Builder::new(TokioExecutor::new()).serve_connection(io, hyper_service).await?;
    Ok(())
}
