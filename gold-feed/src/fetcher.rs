use async_trait::async_trait;
use gold_core::{MonitorError, Result};
use reqwest::Client;
use serde_json::Value;
use std::{fmt::Debug, time::Duration};
use tracing::debug;

/// Source of upstream JSON documents.
#[async_trait]
pub trait JsonFetcher: Send + Sync + Debug {
    /// GET `url` and parse the body as JSON. The whole exchange, headers and
    /// body included, must finish within `timeout`.
    async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Value> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        debug!(%url, "fetching upstream JSON");

        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| MonitorError::Upstream(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(MonitorError::UpstreamHttp {
                    status: status.as_u16(),
                    body,
                });
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| MonitorError::Upstream(e.to_string()))?;

            serde_json::from_slice::<Value>(&bytes)
                .map_err(|e| MonitorError::UpstreamParse(e.to_string()))
        };

        // Dropping `exchange` on expiry aborts the in-flight connection.
        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| MonitorError::UpstreamTimeout(timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use std::net::SocketAddr;

    async fn spawn_upstream() -> SocketAddr {
        let app = Router::new()
            .route("/ok", get(|| async { r#"{"code":"0","data":[]}"# }))
            .route(
                "/unavailable",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
            )
            .route("/garbage", get(|| async { "<html>not json</html>" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "{}"
                }),
            )
            .route(
                "/echo-agent",
                get(|headers: axum::http::HeaderMap| async move {
                    let agent = headers
                        .get("user-agent")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    format!(r#"{{"agent":"{}"}}"#, agent)
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Client::new())
    }

    #[tokio::test]
    async fn test_parses_json_body() {
        let addr = spawn_upstream().await;
        let value = fetcher()
            .get_json(&format!("http://{}/ok", addr), &[], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(value["code"], "0");
    }

    #[tokio::test]
    async fn test_forwards_headers() {
        let addr = spawn_upstream().await;
        let value = fetcher()
            .get_json(
                &format!("http://{}/echo-agent", addr),
                &[("User-Agent", "GoldMonitor-test")],
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(value["agent"], "GoldMonitor-test");
    }

    #[tokio::test]
    async fn test_non_success_status_carries_code() {
        let addr = spawn_upstream().await;
        let err = fetcher()
            .get_json(
                &format!("http://{}/unavailable", addr),
                &[],
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        match err {
            MonitorError::UpstreamHttp { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let addr = spawn_upstream().await;
        let err = fetcher()
            .get_json(&format!("http://{}/garbage", addr), &[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::UpstreamParse(_)));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let addr = spawn_upstream().await;
        let started = std::time::Instant::now();
        let err = fetcher()
            .get_json(
                &format!("http://{}/slow", addr),
                &[],
                Duration::from_millis(100),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::UpstreamTimeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher()
            .get_json(&format!("http://{}/ok", addr), &[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::Upstream(_)));
    }
}
