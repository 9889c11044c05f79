use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::managed::{ManagedClient, ManagedError};

const DEFAULT_PER_PAGE: u64 = 20;
const UNKNOWN_USER: &str = "Unknown User";

/// Raw query-string parameters of `GET /api/activity-logs`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityLogParams {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub user_uuid: Option<String>,
}

/// Validated page request
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityLogQuery {
    pub page: u64,
    pub per_page: u64,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub user_uuid: Option<String>,
    rows: (u64, u64),
}

impl TryFrom<ActivityLogParams> for ActivityLogQuery {
    type Error = String;

    fn try_from(params: ActivityLogParams) -> Result<Self, Self::Error> {
        let page = parse_positive("page", params.page.as_deref(), 1)?;
        let per_page = parse_positive("per_page", params.per_page.as_deref(), DEFAULT_PER_PAGE)?;
        let rows = page_rows(page, per_page).ok_or_else(|| "page is out of range".to_string())?;
        Ok(Self {
            page,
            per_page,
            rows,
            date_from: parse_day("date_from", params.date_from.as_deref())?,
            date_to: parse_day("date_to", params.date_to.as_deref())?,
            user_uuid: params.user_uuid.filter(|u| !u.is_empty()),
        })
    }
}

fn parse_positive(name: &str, raw: Option<&str>, default: u64) -> Result<u64, String> {
    match raw {
        None => Ok(default),
        Some(v) => match v.trim().parse::<u64>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(format!("{} must be a positive integer", name)),
        },
    }
}

fn parse_day(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match raw.filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("{} must be a date (YYYY-MM-DD)", name)),
    }
}

/// Inclusive row range of a page; `None` when it does not fit a row offset
fn page_rows(page: u64, per_page: u64) -> Option<(u64, u64)> {
    let from = (page - 1).checked_mul(per_page)?;
    let to = from.checked_add(per_page - 1)?;
    (to <= i64::MAX as u64).then_some((from, to))
}

impl ActivityLogQuery {
    /// Inclusive row range of the requested page
    pub fn row_range(&self) -> (u64, u64) {
        self.rows
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityLogEntry {
    pub log_id: Value,
    pub action: Value,
    pub created_at: Value,
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityLogPage {
    pub logs: Vec<ActivityLogEntry>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Display name of a user row: screen name, else email
fn display_name(user: &Value) -> Option<String> {
    ["screenname", "email"]
        .iter()
        .filter_map(|field| user.get(*field).and_then(Value::as_str))
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

fn log_user(log: &Value) -> Option<&str> {
    log.get("user_uuid").and_then(Value::as_str).filter(|u| !u.is_empty())
}

/// Attach a readable user name to each log row
pub fn enrich_logs(logs: Vec<Value>, users: &HashMap<String, String>) -> Vec<ActivityLogEntry> {
    logs.into_iter()
        .map(|log| {
            let user_name = log_user(&log)
                .and_then(|uuid| users.get(uuid))
                .cloned()
                .unwrap_or_else(|| UNKNOWN_USER.to_string());
            let field = |name: &str| log.get(name).cloned().unwrap_or(Value::Null);
            ActivityLogEntry {
                log_id: field("log_id"),
                action: field("action"),
                created_at: field("created_at"),
                user_name,
            }
        })
        .collect()
}

pub struct ActivityService<'a> {
    client: &'a ManagedClient,
}

impl<'a> ActivityService<'a> {
    pub fn new(client: &'a ManagedClient) -> Self {
        Self { client }
    }

    /// One page of activity logs, newest first, with user names resolved
    pub async fn list(&self, query: &ActivityLogQuery) -> Result<ActivityLogPage, ManagedError> {
        let (from, to) = query.row_range();

        let mut request = self.client.table("activity_logs").select("*").count_exact();
        if let Some(day) = query.date_from {
            request = request.gte("created_at", format!("{}T00:00:00", day.format("%Y-%m-%d")));
        }
        if let Some(day) = query.date_to {
            request = request.lte("created_at", format!("{}T23:59:59", day.format("%Y-%m-%d")));
        }
        if let Some(uuid) = &query.user_uuid {
            request = request.eq("user_uuid", uuid);
        }
        let rows = request.order("created_at", true).range(from, to).fetch().await?;

        let user_uuids: BTreeSet<&str> = rows.data.iter().filter_map(log_user).collect();
        let users = self.user_names(&user_uuids).await?;

        Ok(ActivityLogPage {
            total: rows.count.unwrap_or(0),
            logs: enrich_logs(rows.data, &users),
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn user_names(&self, uuids: &BTreeSet<&str>) -> Result<HashMap<String, String>, ManagedError> {
        if uuids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = self
            .client
            .table("users")
            .select("uuid, screenname, email")
            .in_("uuid", uuids.iter())
            .fetch()
            .await?;

        Ok(rows
            .data
            .iter()
            .filter_map(|user| {
                let uuid = user.get("uuid").and_then(Value::as_str)?;
                Some((uuid.to_string(), display_name(user)?))
            })
            .collect())
    }
}
