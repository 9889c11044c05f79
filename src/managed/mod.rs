//! Client for the managed backend service: REST table access, object storage
//! and access-token verification. Everything the clinic API persists lives
//! behind this client.

pub mod auth;
pub mod query_builder;
pub mod storage;

use reqwest::{RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ManagedConfig;

pub use auth::ManagedUser;
pub use query_builder::{Rows, TableQuery};

/// Errors from ManagedClient
#[derive(Debug, Error)]
pub enum ManagedError {
    #[error("Managed service not configured: {0} is not set")]
    NotConfigured(&'static str),

    #[error("Invalid managed service URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Managed service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Managed service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Unexpected response from managed service: {0}")]
    UnexpectedResponse(String),
}

struct Connection {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

/// Shared handle to the managed service. Cheap to clone.
///
/// A client built without URL or key still exists so the server can start;
/// every call then fails with [`ManagedError::NotConfigured`].
#[derive(Clone)]
pub struct ManagedClient {
    connection: Option<Arc<Connection>>,
    missing: &'static str,
}

impl ManagedClient {
    pub fn new(config: &ManagedConfig) -> Result<Self, ManagedError> {
        let (url, key) = match (&config.url, &config.service_role_key) {
            (Some(url), Some(key)) => (url, key),
            (None, _) => {
                warn!("SUPABASE_URL not set; managed service unavailable");
                return Ok(Self::unconfigured("SUPABASE_URL"));
            }
            (_, None) => {
                warn!("SUPABASE_SERVICE_ROLE_KEY not set; managed service unavailable");
                return Ok(Self::unconfigured("SUPABASE_SERVICE_ROLE_KEY"));
            }
        };

        let parsed = url::Url::parse(url).map_err(|_| ManagedError::InvalidUrl(url.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ManagedError::InvalidUrl(url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        info!("Managed service client configured for {}", parsed.host_str().unwrap_or("<unknown host>"));
        Ok(Self {
            connection: Some(Arc::new(Connection {
                http,
                base_url: url.trim_end_matches('/').to_string(),
                service_key: key.clone(),
            })),
            missing: "",
        })
    }

    fn unconfigured(missing: &'static str) -> Self {
        Self { connection: None, missing }
    }

    pub fn is_configured(&self) -> bool {
        self.connection.is_some()
    }

    /// Start a query against a table
    pub fn table(&self, name: impl Into<String>) -> TableQuery<'_> {
        TableQuery::new(self, name)
    }

    fn connection(&self) -> Result<&Connection, ManagedError> {
        self.connection
            .as_deref()
            .ok_or(ManagedError::NotConfigured(self.missing))
    }

    fn endpoint(&self, path: &str) -> Result<String, ManagedError> {
        let conn = self.connection()?;
        Ok(format!("{}/{}", conn.base_url, path.trim_start_matches('/')))
    }

    fn http(&self) -> Result<&reqwest::Client, ManagedError> {
        Ok(&self.connection()?.http)
    }

    /// Attach the service-role credentials
    fn with_service_key(&self, builder: RequestBuilder) -> Result<RequestBuilder, ManagedError> {
        let key = &self.connection()?.service_key;
        Ok(builder.header("apikey", key).bearer_auth(key))
    }
}

/// Turn a non-success status into [`ManagedError::Upstream`], keeping the body for logs.
async fn check_status(response: Response) -> Result<Response, ManagedError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ManagedError::Upstream { status: status.as_u16(), body })
}

fn is_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}
