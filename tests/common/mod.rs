//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use pecan::{ServerHandle, WebServerBuilder};

/// A server bound to an ephemeral loopback port.
pub struct TestServer {
    pub handle: ServerHandle,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.handle.local_addr(), path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("server unreachable")
    }
}

/// Bind `builder` to 127.0.0.1 on a free port and start serving.
pub async fn start(builder: WebServerBuilder) -> TestServer {
    let handle = builder
        .listen_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .start()
        .await
        .expect("server failed to start");

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    TestServer { handle, client }
}
