//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use portal_server::features::FeatureRegistry;
use portal_server::lifecycle::startup::StartupReport;
use portal_server::{App, AppConfig, HttpServer, Shutdown};
use tokio::net::TcpListener;

/// Secret long enough for strict mode.
#[allow(dead_code)]
pub const STRONG_SECRET: &str = "integration-secret-0123456789abcdef";

/// A running server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub report: StartupReport,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Bootstrap `config` with `registry` and serve it on 127.0.0.1:0.
pub async fn spawn_server(config: AppConfig, registry: FeatureRegistry) -> TestServer {
    let app = App::builder(config)
        .features(registry)
        .metrics(portal_server::observability::metrics::detached_handle().ok())
        .build()
        .expect("bootstrap failed");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(&app);
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    // Wait until the listener answers.
    let client = client();
    for _ in 0..50 {
        if client.get(format!("http://{}/", addr)).send().await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    TestServer {
        addr,
        report: app.report().clone(),
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
