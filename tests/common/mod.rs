#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::{
    matchers::{header as header_eq, method, path},
    Mock, MockServer, ResponseTemplate,
};

use clinic_api::{app, config::AppConfig, AppState};

pub const SERVICE_KEY: &str = "service-role-key";
pub const USER_TOKEN: &str = "user-access-token";
pub const USER_ID: &str = "2b7f0c9e-user";

/// Router wired to a mocked managed service
pub struct TestApp {
    pub router: Router,
    pub managed: MockServer,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let managed = MockServer::start().await;
        let state = AppState::new(AppConfig::for_managed(managed.uri(), SERVICE_KEY))
            .context("failed to build app state")?;
        Ok(Self { router: app(state), managed })
    }

    /// Router whose managed service has no URL configured
    pub fn unconfigured() -> Result<Router> {
        let mut config = AppConfig::for_managed("http://unused.invalid", SERVICE_KEY);
        config.managed.url = None;
        let state = AppState::new(config).context("failed to build app state")?;
        Ok(app(state))
    }

    pub async fn send(&self, request: Request<Body>) -> Result<Response> {
        Ok(self.router.clone().oneshot(request).await?)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = self.send(builder.body(Body::empty())?).await?;
        read_json(response).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: &Value) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = self.send(builder.body(Body::from(body.to_string()))?).await?;
        read_json(response).await
    }

    /// Accept `USER_TOKEN` as the identity `USER_ID`
    pub async fn accept_user_token(&self) {
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header_eq("authorization", format!("Bearer {}", USER_TOKEN).as_str()))
            .and(header_eq("apikey", SERVICE_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": USER_ID,
                "email": "doctor@clinic.test",
                "aud": "authenticated"
            })))
            .mount(&self.managed)
            .await;
    }

    /// Reject `token` the way the managed auth service does
    pub async fn reject_token(&self, token: &str) {
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header_eq("authorization", format!("Bearer {}", token).as_str()))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "msg": "invalid JWT"
            })))
            .mount(&self.managed)
            .await;
    }

    /// Requests the mocked managed service received for `path`
    pub async fn received(&self, request_path: &str) -> Vec<wiremock::Request> {
        self.managed
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == request_path)
            .collect()
    }
}

pub async fn read_json(response: Response) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).context("response body is not JSON")?
    };
    Ok((status, body))
}

/// Respond to a table read with `rows`
pub fn table_rows(rows: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(rows)
}
