//! In-process HTTP server for exercising the provider clients.

use std::net::SocketAddr;

use axum::Router;
use tokio::task::JoinHandle;

/// An axum app served on an ephemeral localhost port for the lifetime of
/// the value.
pub(crate) struct MockServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl MockServer {
    pub(crate) async fn start(router: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        let task = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        Self { addr, task }
    }

    /// Root URL; clients append their own API paths.
    pub(crate) fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[tokio::test]
    async fn serves_the_given_router() {
        let server = MockServer::start(Router::new().route("/ping", get(|| async { "pong" }))).await;
        let body = reqwest::get(format!("{}/ping", server.base_url()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "pong");
    }
}
