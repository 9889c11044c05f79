use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::managed::{ManagedClient, ManagedError};

const USERS_TABLE: &str = "users";

/// Roles a clinic user may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    Staff,
    Doctor,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Staff => "STAFF",
            StaffRole::Doctor => "DOCTOR",
        }
    }

    /// Only exact `STAFF` / `DOCTOR` are accepted
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "STAFF" => Some(StaffRole::Staff),
            "DOCTOR" => Some(StaffRole::Doctor),
            _ => None,
        }
    }
}

/// Result of making sure a users row exists for an authenticated identity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsureUserOutcome {
    pub success: bool,
    pub uuid: String,
    pub was_inaugural_login: bool,
}

impl EnsureUserOutcome {
    fn existing(uuid: impl Into<String>) -> Self {
        Self { success: true, uuid: uuid.into(), was_inaugural_login: false }
    }

    fn created(uuid: impl Into<String>) -> Self {
        Self { success: true, uuid: uuid.into(), was_inaugural_login: true }
    }
}

/// Profile fields a user may change after their first login
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub screenname: Option<String>,
    pub role: Option<StaffRole>,
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.screenname.is_none() && self.role.is_none() && self.email.is_none()
    }

    fn to_patch(&self) -> Value {
        let mut patch = Map::new();
        if let Some(screenname) = &self.screenname {
            patch.insert("screenname".into(), json!(screenname));
        }
        if let Some(role) = self.role {
            patch.insert("role".into(), json!(role.as_str()));
        }
        if let Some(email) = &self.email {
            patch.insert("email".into(), json!(email));
        }
        Value::Object(patch)
    }
}

/// Screen name used when none is supplied: email local part, else the uuid
pub fn default_screenname(email: Option<&str>, uuid: &str) -> String {
    email
        .and_then(|e| e.split_once('@'))
        .map(|(local, _)| local.to_string())
        .unwrap_or_else(|| uuid.to_string())
}

pub struct UserService<'a> {
    client: &'a ManagedClient,
}

impl<'a> UserService<'a> {
    pub fn new(client: &'a ManagedClient) -> Self {
        Self { client }
    }

    /// Full users row for a uuid
    pub async fn find_by_uuid(&self, uuid: &str) -> Result<Option<Value>, ManagedError> {
        let rows = self.client.table(USERS_TABLE).select("*").eq("uuid", uuid).fetch().await?;
        Ok(rows.data.into_iter().next())
    }

    async fn lookup(&self, column: &str, value: &str) -> Result<Option<Value>, ManagedError> {
        let rows = self
            .client
            .table(USERS_TABLE)
            .select("uuid,email")
            .eq(column, value)
            .limit(1)
            .fetch()
            .await?;
        Ok(rows.data.into_iter().next())
    }

    /// Lookup where a failure only means "unknown", for the idempotency pre-checks
    async fn lookup_or_none(&self, column: &str, value: &str) -> Option<Value> {
        match self.lookup(column, value).await {
            Ok(row) => row,
            Err(e) => {
                warn!("users lookup by {} failed: {}", column, e);
                None
            }
        }
    }

    /// Make sure a users row exists for `uuid`. Safe to call on every login.
    ///
    /// An existing row (by uuid, then by email) wins; otherwise a new STAFF row
    /// is inserted unapproved. A failed insert is re-checked once in case a
    /// concurrent request created the row first.
    pub async fn ensure_user(
        &self,
        uuid: &str,
        email: Option<&str>,
        screenname: Option<&str>,
    ) -> Result<EnsureUserOutcome, ManagedError> {
        if self.lookup_or_none("uuid", uuid).await.is_some() {
            return Ok(EnsureUserOutcome::existing(uuid));
        }

        if let Some(email) = email {
            if let Some(row) = self.lookup_or_none("email", email).await {
                let existing = row.get("uuid").and_then(Value::as_str).unwrap_or(uuid);
                return Ok(EnsureUserOutcome::existing(existing));
            }
        }

        let screenname = screenname
            .map(str::to_string)
            .unwrap_or_else(|| default_screenname(email, uuid));
        let payload = json!({
            "uuid": uuid,
            "email": email,
            "screenname": screenname,
            "role": StaffRole::Staff.as_str(),
            "approved": false,
        });

        match self.client.table(USERS_TABLE).insert(&payload).await {
            Ok(_) => {
                info!("Created users row for {}", uuid);
                Ok(EnsureUserOutcome::created(uuid))
            }
            Err(e) => {
                warn!("users insert for {} failed, re-checking: {}", uuid, e);
                if self.lookup_or_none("uuid", uuid).await.is_some() {
                    Ok(EnsureUserOutcome::existing(uuid))
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply a profile update, creating the row when it does not exist yet
    pub async fn upsert_profile(&self, uuid: &str, update: &ProfileUpdate) -> Result<(), ManagedError> {
        if self.lookup("uuid", uuid).await?.is_some() {
            self.client.table(USERS_TABLE).eq("uuid", uuid).update(&update.to_patch()).await?;
            return Ok(());
        }

        let screenname = update
            .screenname
            .clone()
            .unwrap_or_else(|| default_screenname(update.email.as_deref(), uuid));
        let payload = json!({
            "uuid": uuid,
            "email": update.email,
            "screenname": screenname,
            "role": update.role.unwrap_or(StaffRole::Staff).as_str(),
        });
        self.client.table(USERS_TABLE).insert(&payload).await?;
        Ok(())
    }
}
