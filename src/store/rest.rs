use chrono::Utc;
use reqwest::{Client, Method};
use serde_json::{Value, json};

use super::{RecordStore, StoreError};
use crate::core::record::{Order, RecordId, Row, Table};

/// Client for the hosted database's REST API.
///
/// Table access mirrors the server's row-level contract: every request
/// carries the owner filter, inserts ask for the created row back, and
/// updates stamp `updated_at` alongside the replaced info blob. The store
/// offers no compare-and-swap, so writes are last-write-wins.
#[derive(Clone)]
pub struct RestStore {
    base_url: String,
    api_key: String,
    access_token: String,
    http: Client,
}

impl RestStore {
    /// `access_token` is the signed-in user's token; when empty the anon
    /// api key doubles as the bearer credential.
    pub fn new(base_url: &str, api_key: &str, access_token: &str) -> Result<Self, StoreError> {
        let http = Client::builder()
            .build()
            .map_err(|e| StoreError::Request(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: if access_token.is_empty() {
                api_key.to_string()
            } else {
                access_token.to_string()
            },
            http,
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }

    fn select_url(&self, table: Table, owner: &str, order: Order) -> String {
        format!(
            "{}?select=*&user_id=eq.{}&order={}",
            self.table_url(table),
            owner,
            order.as_query()
        )
    }

    fn filter_url(&self, table: Table, id: RecordId, owner: &str) -> String {
        format!(
            "{}?id=eq.{}&user_id=eq.{}",
            self.table_url(table),
            id,
            owner
        )
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
    }

    fn decode_rows(table: Table, body: &str) -> Result<Vec<Row>, StoreError> {
        serde_json::from_str(body)
            .map_err(|e| StoreError::Decode(format!("rows from {}: {}", table.as_str(), e)))
    }
}

impl RecordStore for RestStore {
    async fn select(&self, table: Table, owner: &str, order: Order) -> Result<Vec<Row>, StoreError> {
        let url = self.select_url(table, owner, order);
        let resp = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|e| StoreError::Request(format!("GET {} failed: {}", table.as_str(), e)))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| StoreError::Request(format!("Failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Self::decode_rows(table, &body)
    }

    async fn insert(&self, table: Table, owner: &str, info: Value) -> Result<Row, StoreError> {
        let resp = self
            .request(Method::POST, &self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&json!({ "user_id": owner, "info": info }))
            .send()
            .await
            .map_err(|e| StoreError::Request(format!("POST {} failed: {}", table.as_str(), e)))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| StoreError::Request(format!("Failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // return=representation answers with the inserted rows as an array.
        Self::decode_rows(table, &body)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no row".to_string()))
    }

    async fn update(
        &self,
        table: Table,
        id: RecordId,
        owner: &str,
        info: Value,
    ) -> Result<(), StoreError> {
        let url = self.filter_url(table, id, owner);
        let resp = self
            .request(Method::PATCH, &url)
            .header("Prefer", "return=representation")
            .json(&json!({
                "info": info,
                "updated_at": Utc::now().to_rfc3339(),
            }))
            .send()
            .await
            .map_err(|e| StoreError::Request(format!("PATCH {} failed: {}", table.as_str(), e)))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| StoreError::Request(format!("Failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // A filter that matched nothing patches nothing; the empty
        // representation is the only way the API reports it.
        if Self::decode_rows(table, &body)?.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: RecordId, owner: &str) -> Result<(), StoreError> {
        let url = self.filter_url(table, id, owner);
        let resp = self
            .request(Method::DELETE, &url)
            .send()
            .await
            .map_err(|e| {
                StoreError::Request(format!("DELETE {} failed: {}", table.as_str(), e))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> RestStore {
        RestStore::new("https://db.example.com/", "anon-key", "user-token").unwrap()
    }

    #[test]
    fn urls_carry_owner_scope_and_order() {
        let s = store();
        assert_eq!(
            s.select_url(Table::Goals, "user-1", Order::CreatedDesc),
            "https://db.example.com/rest/v1/goals?select=*&user_id=eq.user-1&order=created_at.desc"
        );
        assert_eq!(
            s.filter_url(Table::Events, RecordId(7), "user-1"),
            "https://db.example.com/rest/v1/events?id=eq.7&user_id=eq.user-1"
        );
    }

    #[test]
    fn empty_access_token_falls_back_to_api_key() {
        let s = RestStore::new("https://db.example.com", "anon-key", "").unwrap();
        assert_eq!(s.access_token, "anon-key");
    }

    #[test]
    fn decode_rows_tolerates_string_ids() {
        let body = json!([{
            "id": "12",
            "user_id": "user-1",
            "info": {"title": "Read"},
            "created_at": "2026-03-01T10:00:00+00:00",
            "updated_at": null,
        }])
        .to_string();
        let rows = RestStore::decode_rows(Table::Goals, &body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, RecordId(12));
    }

    #[test]
    fn decode_rows_reports_malformed_bodies() {
        let err = RestStore::decode_rows(Table::Goals, "not json").unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
