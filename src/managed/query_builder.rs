use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{check_status, ManagedClient, ManagedError};

/// Rows returned by a table query, plus the exact total when it was requested.
#[derive(Debug, Default)]
pub struct Rows {
    pub data: Vec<Value>,
    pub count: Option<u64>,
}

/// Builder for a single REST call against one managed table.
///
/// Filters use the REST layer's operator syntax (`eq.`, `in.()`, `gte.`, `lte.`)
/// and are shared by `fetch` and `update`.
pub struct TableQuery<'a> {
    client: &'a ManagedClient,
    table_name: String,
    select_columns: Option<String>,
    filters: Vec<(String, String)>,
    order: Option<(String, bool)>,
    range: Option<(u64, u64)>,
    limit: Option<u64>,
    count_exact: bool,
}

impl<'a> TableQuery<'a> {
    pub(super) fn new(client: &'a ManagedClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            select_columns: None,
            filters: Vec::new(),
            order: None,
            range: None,
            limit: None,
            count_exact: false,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        // the REST layer rejects whitespace inside the column list
        let cleaned: Vec<&str> = columns.split(',').map(str::trim).filter(|c| !c.is_empty()).collect();
        self.select_columns = Some(cleaned.join(","));
        self
    }

    pub fn eq(mut self, column: &str, value: impl AsRef<str>) -> Self {
        self.filters.push((column.to_string(), format!("eq.{}", value.as_ref())));
        self
    }

    pub fn gte(mut self, column: &str, value: impl AsRef<str>) -> Self {
        self.filters.push((column.to_string(), format!("gte.{}", value.as_ref())));
        self
    }

    pub fn lte(mut self, column: &str, value: impl AsRef<str>) -> Self {
        self.filters.push((column.to_string(), format!("lte.{}", value.as_ref())));
        self
    }

    pub fn in_<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let quoted: Vec<String> = values.into_iter().map(|v| quote_value(v.as_ref())).collect();
        self.filters.push((column.to_string(), format!("in.({})", quoted.join(","))));
        self
    }

    pub fn order(mut self, column: &str, desc: bool) -> Self {
        self.order = Some((column.to_string(), desc));
        self
    }

    /// Inclusive row range, zero based
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.range = Some((from, to));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn count_exact(mut self) -> Self {
        self.count_exact = true;
        self
    }

    fn validate(&self) -> Result<(), ManagedError> {
        if !is_identifier(&self.table_name) {
            return Err(ManagedError::InvalidQuery(format!("invalid table name: {}", self.table_name)));
        }
        if let Some((from, to)) = self.range {
            if to < from {
                return Err(ManagedError::InvalidQuery(format!("invalid range {}-{}", from, to)));
            }
        }
        for (column, _) in &self.filters {
            if !is_identifier(column) {
                return Err(ManagedError::InvalidQuery(format!("invalid column name: {}", column)));
            }
        }
        Ok(())
    }

    fn filter_pairs(&self) -> Vec<(String, String)> {
        self.filters.clone()
    }

    /// Query-string pairs for a read
    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![(
            "select".to_string(),
            self.select_columns.clone().unwrap_or_else(|| "*".to_string()),
        )];
        pairs.extend(self.filter_pairs());
        if let Some((column, desc)) = &self.order {
            let dir = if *desc { "desc" } else { "asc" };
            pairs.push(("order".to_string(), format!("{}.{}", column, dir)));
        }
        match (self.range, self.limit) {
            (Some((from, to)), _) => {
                pairs.push(("offset".to_string(), from.to_string()));
                pairs.push(("limit".to_string(), (to - from + 1).to_string()));
            }
            (None, Some(limit)) => pairs.push(("limit".to_string(), limit.to_string())),
            (None, None) => {}
        }
        pairs
    }

    fn table_path(&self) -> String {
        format!("rest/v1/{}", self.table_name)
    }

    /// Read rows as untyped JSON objects
    pub async fn fetch(self) -> Result<Rows, ManagedError> {
        self.validate()?;
        let url = self.client.endpoint(&self.table_path())?;
        let mut request = self.client.http()?.get(url).query(&self.query_pairs());
        if self.count_exact {
            request = request.header("Prefer", "count=exact");
        }
        let response = check_status(self.client.with_service_key(request)?.send().await?).await?;

        let count = if self.count_exact { parse_content_range(response.headers()) } else { None };
        let body: Value = response
            .json()
            .await
            .map_err(|e| ManagedError::UnexpectedResponse(e.to_string()))?;
        match body {
            Value::Array(data) => Ok(Rows { data, count }),
            other => Err(ManagedError::UnexpectedResponse(format!(
                "expected an array of rows from '{}', got {}",
                self.table_name,
                json_kind(&other)
            ))),
        }
    }

    /// Read rows into a typed record
    pub async fn fetch_as<T: DeserializeOwned>(self) -> Result<Vec<T>, ManagedError> {
        let table = self.table_name.clone();
        let rows = self.fetch().await?;
        rows.data
            .into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    ManagedError::UnexpectedResponse(format!("malformed row in '{}': {}", table, e))
                })
            })
            .collect()
    }

    /// Insert one row (or an array of rows) and return what was stored
    pub async fn insert(self, payload: &Value) -> Result<Vec<Value>, ManagedError> {
        self.validate()?;
        let url = self.client.endpoint(&self.table_path())?;
        let request = self
            .client
            .http()?
            .post(url)
            .header("Prefer", "return=representation")
            .json(payload);
        let response = check_status(self.client.with_service_key(request)?.send().await?).await?;
        read_representation(response).await
    }

    /// Patch every row matching the filters
    pub async fn update(self, payload: &Value) -> Result<Vec<Value>, ManagedError> {
        self.validate()?;
        if self.filters.is_empty() {
            return Err(ManagedError::InvalidQuery("refusing to update without a filter".to_string()));
        }
        let url = self.client.endpoint(&self.table_path())?;
        let request = self
            .client
            .http()?
            .patch(url)
            .query(&self.filter_pairs())
            .header("Prefer", "return=representation")
            .json(payload);
        let response = check_status(self.client.with_service_key(request)?.send().await?).await?;
        read_representation(response).await
    }
}

async fn read_representation(response: reqwest::Response) -> Result<Vec<Value>, ManagedError> {
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(rows)) => Ok(rows),
        Ok(row @ Value::Object(_)) => Ok(vec![row]),
        Ok(other) => Err(ManagedError::UnexpectedResponse(format!("unexpected {} in write response", json_kind(&other)))),
        Err(e) => Err(ManagedError::UnexpectedResponse(e.to_string())),
    }
}

/// Total from a `Content-Range` header such as `0-19/123` or `*/0`
fn parse_content_range(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get("content-range")?.to_str().ok()?;
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

fn quote_value(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
