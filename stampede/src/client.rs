//! The HTTP seam. The runner never speaks HTTP itself; it hands the [`RequestSpec`] to an
//! [`HttpClient`] and only looks at the status code, body size and latency it gets back.
use stampede_core::RequestSpec;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub latency: Duration,
}

/// A request which never produced a response. Recorded, never propagated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Other(String),
}

pub trait HttpClient: Send + Sync + 'static {
    fn send(
        &self,
        request: &RequestSpec,
    ) -> impl Future<Output = Result<HttpResponse, RequestError>> + Send;
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_client::ReqwestClient;

#[cfg(feature = "reqwest")]
mod reqwest_client {
    use super::*;
    use stampede_core::Method;
    use tokio::time::Instant;

    /// [`HttpClient`] backed by a shared `reqwest` connection pool.
    #[derive(Clone, Debug)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new(timeout: Duration) -> reqwest::Result<Self> {
            let client = reqwest::Client::builder().timeout(timeout).build()?;
            Ok(Self { client })
        }

        pub fn from_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl HttpClient for ReqwestClient {
        async fn send(&self, request: &RequestSpec) -> Result<HttpResponse, RequestError> {
            let mut builder = self.client.request(method(request.method), &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            let start = Instant::now();
            let response = builder.send().await.map_err(classify)?;
            let status = response.status().as_u16();
            // The body is drained so the connection can go back to the pool.
            let body = response.bytes().await.map_err(classify)?.to_vec();
            let latency = start.elapsed();

            Ok(HttpResponse {
                status,
                body,
                latency,
            })
        }
    }

    fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }

    fn classify(err: reqwest::Error) -> RequestError {
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_connect() {
            RequestError::Connect(err.to_string())
        } else {
            RequestError::Other(err.to_string())
        }
    }
}
