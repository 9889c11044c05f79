use serde_json::Value;
use tracing::{debug, warn};

use super::{check_status, is_rejection, ManagedClient, ManagedError};

/// Identity the managed auth service returns for a valid access token
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedUser {
    pub id: String,
    pub email: Option<String>,
}

impl ManagedClient {
    /// Resolve an access token to its user.
    ///
    /// `Ok(None)` means the service rejected the token; transport and
    /// server failures come back as errors.
    pub async fn get_user(&self, access_token: &str) -> Result<Option<ManagedUser>, ManagedError> {
        let url = self.endpoint("auth/v1/user")?;
        let key = &self.connection()?.service_key;
        debug!("Validating access token {}...", token_prefix(access_token));

        let response = self
            .http()?
            .get(url)
            .header("apikey", key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if is_rejection(response.status()) {
            debug!("Managed auth rejected token with {}", response.status());
            return Ok(None);
        }
        let response = check_status(response).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| ManagedError::UnexpectedResponse(e.to_string()))?;

        let user = user_from_body(&body);
        if user.is_none() {
            warn!("Managed auth response carried no user id");
        }
        Ok(user)
    }
}

/// The user object may be at the top level or wrapped in `user` / `data.user`
fn user_from_body(body: &Value) -> Option<ManagedUser> {
    let candidates = [
        Some(body),
        body.get("user"),
        body.get("data").and_then(|d| d.get("user")),
    ];

    candidates.into_iter().flatten().find_map(|obj| {
        let id = match obj.get("id")? {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let email = obj.get("email").and_then(Value::as_str).map(str::to_string);
        Some(ManagedUser { id, email })
    })
}

fn token_prefix(token: &str) -> &str {
    let end = token.char_indices().nth(8).map(|(i, _)| i).unwrap_or(token.len());
    &token[..end]
}
