use std::time::Duration;

use crate::config::ID_PLACEHOLDER;
use crate::error::NetworkError;

/// Thin GET wrapper over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    page_url_template: String,
}

impl Fetcher {
    pub fn new(client: reqwest::Client, page_url_template: impl Into<String>) -> Self {
        Fetcher {
            client,
            page_url_template: page_url_template.into(),
        }
    }

    /// Builds a client with an optional per-request timeout.
    pub fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    pub fn page_url(&self, id: u64) -> String {
        self.page_url_template
            .replace(ID_PLACEHOLDER, id.to_string().as_str())
    }

    pub async fn fetch_page(&self, id: u64) -> Result<String, NetworkError> {
        let url = self.page_url(id);
        let response = self.get(&url).await?;
        response
            .text()
            .await
            .map_err(|source| NetworkError::Request { url, source })
    }

    pub async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        let response = self.get(url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|source| NetworkError::Request {
                url: url.to_string(),
                source,
            })?;
        Ok(body.into())
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, NetworkError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| NetworkError::Request {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, extract::Path, http::StatusCode, routing::get};
    use tokio::net::TcpListener;

    async fn page_handler(Path(id): Path<u64>) -> Result<String, StatusCode> {
        if id == 404 {
            Err(StatusCode::NOT_FOUND)
        } else {
            Ok(format!("<html><title>page {}</title></html>", id))
        }
    }

    async fn start_mock_server() -> String {
        let app = Router::new()
            .route("/images/{id}/", get(page_handler))
            .route("/asset.bin", get(|| async { vec![1u8, 2, 3] }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_page_url_substitutes_id() {
        let fetcher = Fetcher::new(
            reqwest::Client::new(),
            "https://neurovault.org/images/{id}/",
        );
        assert_eq!(
            fetcher.page_url(40012),
            "https://neurovault.org/images/40012/"
        );
    }

    #[tokio::test]
    async fn test_fetch_page() {
        let base = start_mock_server().await;
        let fetcher = Fetcher::new(reqwest::Client::new(), format!("{}/images/{{id}}/", base));

        let body = fetcher.fetch_page(7).await.unwrap();
        assert!(body.contains("page 7"));
    }

    #[tokio::test]
    async fn test_fetch_page_not_found_is_status_error() {
        let base = start_mock_server().await;
        let fetcher = Fetcher::new(reqwest::Client::new(), format!("{}/images/{{id}}/", base));

        match fetcher.fetch_page(404).await {
            Err(NetworkError::Status { status, url }) => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
                assert!(url.ends_with("/images/404/"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_asset() {
        let base = start_mock_server().await;
        let fetcher = Fetcher::new(reqwest::Client::new(), format!("{}/images/{{id}}/", base));

        let body = fetcher
            .fetch_asset(&format!("{}/asset.bin", base))
            .await
            .unwrap();
        assert_eq!(body, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_error() {
        // Grab a free port, then close it so nothing is listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = Fetcher::new(
            reqwest::Client::new(),
            format!("http://{}/images/{{id}}/", addr),
        );
        assert!(matches!(
            fetcher.fetch_page(1).await,
            Err(NetworkError::Request { .. })
        ));
    }
}
