use std::time::Duration;

use crate::activity::{FeedFormat, FetchError};

/// Something that can produce the current activity index.
pub trait IndexSource {
    async fn fetch_index(&self) -> Result<f64, FetchError>;
}

/// Fetches the index over HTTP and parses it out of the feed body.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    url: String,
    format: FeedFormat,
}

impl FeedClient {
    pub fn new(url: String, format: FeedFormat, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url, format })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl IndexSource for FeedClient {
    async fn fetch_index(&self) -> Result<f64, FetchError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        self.format.parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response on a local port.
    async fn serve_once(status: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/3hrKuk.json")
    }

    fn client(url: String) -> FeedClient {
        FeedClient::new(url, FeedFormat::default(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn fetches_and_parses_the_feed() {
        let body = format!("header\n{}6.2YYY\n]\n", "X".repeat(57));
        let url = serve_once("200 OK", body).await;
        assert_eq!(client(url).fetch_index().await.unwrap(), 6.2);
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let url = serve_once("503 Service Unavailable", "down".into()).await;
        assert!(matches!(
            client(url).fetch_index().await,
            Err(FetchError::Status(503))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_an_http_error() {
        // Bind then drop so nothing listens on the port.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{port}/feed");
        assert!(matches!(
            client(url).fetch_index().await,
            Err(FetchError::Http(_))
        ));
    }
}
