//! Shared harness for the end-to-end scenarios: a real mTLS listener per
//! test, backed by the same `rustls`/`tokio-rustls` stack the production
//! server uses, signed by a throwaway CA checked into `tests/fixtures`.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use mesh_control_plane::config::TlsConfig;
use tokio_util::sync::CancellationToken;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

/// Server-side TLS config, terminating on the cert/key pair in
/// `tests/fixtures`, trusting client certs signed by the same throwaway CA.
pub fn test_tls_config() -> TlsConfig {
    TlsConfig {
        server_cert_path: fixture("server-cert.pem"),
        server_key_path: fixture("server-key.pem"),
        client_cert_path: fixture("client-registry-cert.pem"),
        client_key_path: fixture("client-registry-key.pem"),
        ca_bundle_path: fixture("ca-cert.pem"),
        production: false,
    }
}

/// Builds an mTLS `reqwest::Client` presenting one of the two fixture client
/// identities (`"client-registry"` or `"client-subscriber"`).
pub fn test_mtls_client(identity: &str) -> reqwest::Client {
    mesh_control_plane::http_client::build_mtls_client(&mesh_control_plane::http_client::MtlsClientConfig {
        client_cert_path: fixture(&format!("{identity}-cert.pem")),
        client_key_path: fixture(&format!("{identity}-key.pem")),
        ca_bundle_path: fixture("ca-cert.pem"),
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
    })
    .expect("test mTLS client builds from fixture certs")
}

/// Starts `router` behind a real mTLS listener on `addr`, returning a
/// cancellation token the caller uses to tear it down. Each scenario test
/// picks its own fixed port to avoid needing ephemeral-port plumbing through
/// `serve_mtls`.
pub async fn spawn_stub_server(addr: &str, router: Router) -> CancellationToken {
    let socket: SocketAddr = addr.parse().expect("valid test socket addr");
    let tls_config = mesh_control_plane::server::tls::build_server_tls_config(&test_tls_config())
        .expect("test TLS config builds from fixture certs");
    let shutdown = CancellationToken::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = mesh_control_plane::server::serve_mtls(socket, tls_config, router, server_shutdown).await;
    });
    // give the listener a moment to bind before the test starts connecting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown
}
