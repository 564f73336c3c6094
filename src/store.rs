use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row store unreachable")]
    Unavailable(#[source] reqwest::Error),
    #[error("row store rejected request: {status}")]
    Rejected { status: u16, detail: String },
    #[error("row store returned malformed data")]
    Malformed(#[source] serde_json::Error),
}

/// Single-column equality filter. The only filter shape the auth flows need.
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Remote table abstraction: rows are JSON objects, lookups are by
/// table + equality filter. Implemented by the hosted REST store in
/// production and by [`MemoryStore`] in tests.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, StoreError>;
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError>;
    async fn update(&self, table: &str, filter: &Filter, patch: Value) -> Result<(), StoreError>;
    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError>;
}

/// Client for a hosted row store speaking the `/rest/v1/{table}?col=eq.val`
/// dialect with api-key headers.
pub struct RestStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        // The underlying client has no default timeout; remote-call failures
        // must surface as errors, not hangs.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn expect_ok(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let detail = resp.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl RowStore for RestStore {
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let resp = self
            .authed(self.http.get(self.table_url(table)))
            .query(&[
                (filter.column.as_str(), format!("eq.{}", filter.value)),
                ("select", "*".to_string()),
            ])
            .send()
            .await
            .map_err(StoreError::Unavailable)?;
        let rows = Self::expect_ok(resp)
            .await?
            .json::<Vec<Value>>()
            .await
            .map_err(StoreError::Unavailable)?;
        debug!(table, column = %filter.column, count = rows.len(), "select");
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let resp = self
            .authed(self.http.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await
            .map_err(StoreError::Unavailable)?;
        let mut rows = Self::expect_ok(resp)
            .await?
            .json::<Vec<Value>>()
            .await
            .map_err(StoreError::Unavailable)?;
        debug!(table, "insert");
        if rows.is_empty() {
            return Err(StoreError::Rejected {
                status: 500,
                detail: "insert returned no representation".into(),
            });
        }
        Ok(rows.remove(0))
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Value) -> Result<(), StoreError> {
        let resp = self
            .authed(self.http.patch(self.table_url(table)))
            .query(&[(filter.column.as_str(), format!("eq.{}", filter.value))])
            .json(&patch)
            .send()
            .await
            .map_err(StoreError::Unavailable)?;
        Self::expect_ok(resp).await?;
        debug!(table, column = %filter.column, "update");
        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError> {
        let resp = self
            .authed(self.http.delete(self.table_url(table)))
            .query(&[(filter.column.as_str(), format!("eq.{}", filter.value))])
            .send()
            .await
            .map_err(StoreError::Unavailable)?;
        Self::expect_ok(resp).await?;
        debug!(table, column = %filter.column, "delete");
        Ok(())
    }
}

/// In-memory row store. Backs the test suite; all data is lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(row: &Value, filter: &Filter) -> bool {
        match row.get(&filter.column) {
            Some(Value::String(s)) => *s == filter.value,
            Some(other) => other.to_string() == filter.value,
            None => false,
        }
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        let rows = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| Self::matches(r, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let Value::Object(mut map) = row else {
            return Err(StoreError::Rejected {
                status: 400,
                detail: "row must be a JSON object".into(),
            });
        };
        // Mirror the hosted store: ids are assigned on insert when absent.
        map.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        let row = Value::Object(map);
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Value) -> Result<(), StoreError> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::Rejected {
                status: 400,
                detail: "patch must be a JSON object".into(),
            });
        };
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| Self::matches(r, filter)) {
                if let Value::Object(map) = row {
                    for (k, v) in &patch {
                        map.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|r| !Self::matches(r, filter));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_id_and_select_filters() {
        let store = MemoryStore::new();
        let row = store
            .insert("users", json!({"email": "a@b.com"}))
            .await
            .expect("insert");
        assert!(row.get("id").is_some());

        let hit = store
            .select("users", &Filter::eq("email", "a@b.com"))
            .await
            .expect("select");
        assert_eq!(hit.len(), 1);

        let miss = store
            .select("users", &Filter::eq("email", "x@y.com"))
            .await
            .expect("select");
        assert!(miss.is_empty());
    }

    #[tokio::test]
    async fn update_patches_matching_rows() {
        let store = MemoryStore::new();
        store
            .insert("users", json!({"email": "a@b.com", "name": "Alice"}))
            .await
            .expect("insert");
        store
            .update(
                "users",
                &Filter::eq("email", "a@b.com"),
                json!({"name": "Alicia"}),
            )
            .await
            .expect("update");
        let rows = store
            .select("users", &Filter::eq("email", "a@b.com"))
            .await
            .expect("select");
        assert_eq!(rows[0]["name"], "Alicia");
    }

    #[tokio::test]
    async fn delete_removes_only_matching_rows() {
        let store = MemoryStore::new();
        store
            .insert("resets", json!({"user_id": "u1"}))
            .await
            .expect("insert");
        store
            .insert("resets", json!({"user_id": "u2"}))
            .await
            .expect("insert");
        store
            .delete("resets", &Filter::eq("user_id", "u1"))
            .await
            .expect("delete");
        let left = store
            .select("resets", &Filter::eq("user_id", "u2"))
            .await
            .expect("select");
        assert_eq!(left.len(), 1);
        let gone = store
            .select("resets", &Filter::eq("user_id", "u1"))
            .await
            .expect("select");
        assert!(gone.is_empty());
    }
}
