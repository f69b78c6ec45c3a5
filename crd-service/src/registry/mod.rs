//! The record store adapter: a thin client over the hosted registry's
//! REST query interface. Records are created and destroyed by an
//! external intake process; this side only reads bounded snapshots and
//! applies single-field updates.

use std::future::Future;
use std::pin::Pin;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crd_sdk::records::{ClientRecord, FieldPatch};

use crate::config::RegistryConfig;
use crate::error::AppError;

/// Hard bound on rows fetched per search, regardless of configuration.
pub const ROW_CAP: u32 = 500;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Boundary trait for the external record store.
pub trait RecordStore: Send + Sync {
    /// Fetch up to `limit` records, newest-created first. A non-empty
    /// `filter` matches case-insensitively as a substring of first name,
    /// last name or phone.
    fn search(
        &self,
        filter: Option<&str>,
        limit: u32,
    ) -> BoxFuture<'_, Result<Vec<ClientRecord>, AppError>>;

    /// Apply exactly one field update to one record. The backend gives
    /// per-row per-column last-write-wins; no extra conflict handling
    /// happens here.
    fn update_field<'a>(
        &'a self,
        id: &'a str,
        patch: &'a FieldPatch,
    ) -> BoxFuture<'a, Result<(), AppError>>;
}

/// Columns requested from the hosted table, identity first.
const SELECT_COLUMNS: &str = "id,created_at,first_name,last_name,phone,email,\
CalledOn,BOP_Date,BOP_Status,Followup_Date,FollowUp_Status,Product,Issued,Comment,Remark";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// `RecordStore` over a PostgREST-style hosted API.
///
/// Constructed once at startup and injected wherever records are needed;
/// the connection handle is never process-global.
pub struct HostedRegistry {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl HostedRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self, AppError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| AppError::Config("registry.url is not set".into()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Config("registry.api_key is not set".into()))?;

        Ok(Self {
            client: Client::new(),
            base_url: url.trim_end_matches('/').to_string(),
            api_key,
            table: config.table.clone(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn fail_from(resp: reqwest::Response) -> AppError {
        let status = resp.status();
        let message = resp
            .json::<ErrorBody>()
            .await
            .map(|e| e.message)
            .unwrap_or_else(|_| "unknown error".to_string());
        AppError::Registry(format!("{status}: {message}"))
    }
}

/// Build the `or=(...)` disjunction for a contact search term.
///
/// PostgREST `ilike` patterns use `*` as the wildcard; `%`, `,` and
/// parens would change the filter grammar, so they are dropped from the
/// term rather than escaped.
fn contact_filter(term: &str) -> String {
    let cleaned: String = term
        .chars()
        .filter(|c| !matches!(c, '%' | ',' | '(' | ')' | '*'))
        .collect();
    format!(
        "(first_name.ilike.*{cleaned}*,last_name.ilike.*{cleaned}*,phone.ilike.*{cleaned}*)"
    )
}

impl RecordStore for HostedRegistry {
    fn search(
        &self,
        filter: Option<&str>,
        limit: u32,
    ) -> BoxFuture<'_, Result<Vec<ClientRecord>, AppError>> {
        let filter = filter.map(str::to_string);
        Box::pin(async move {
            let limit = limit.min(ROW_CAP).to_string();
            let mut req = self.client.get(self.table_url()).query(&[
                ("select", SELECT_COLUMNS),
                ("order", "created_at.desc"),
                ("limit", limit.as_str()),
            ]);

            if let Some(term) = filter.as_deref().map(str::trim)
                && !term.is_empty()
            {
                req = req.query(&[("or", contact_filter(term).as_str())]);
            }

            let resp = self
                .authed(req)
                .send()
                .await
                .map_err(|e| AppError::Registry(format!("search request failed: {e}")))?;

            if !resp.status().is_success() {
                return Err(Self::fail_from(resp).await);
            }

            let rows: Vec<ClientRecord> = resp
                .json()
                .await
                .map_err(|e| AppError::Registry(format!("invalid search response: {e}")))?;
            debug!(count = rows.len(), "registry search complete");
            Ok(rows)
        })
    }

    fn update_field<'a>(
        &'a self,
        id: &'a str,
        patch: &'a FieldPatch,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            // The body is exactly one field name and one value
            let mut body = serde_json::Map::new();
            body.insert(
                patch.field.wire_name().to_string(),
                match &patch.value {
                    Some(v) => serde_json::Value::String(v.clone()),
                    None => serde_json::Value::Null,
                },
            );

            let req = self
                .client
                .patch(self.table_url())
                .query(&[("id", format!("eq.{id}"))])
                .json(&body);

            let resp = self
                .authed(req)
                .send()
                .await
                .map_err(|e| AppError::Registry(format!("update request failed: {e}")))?;

            if !resp.status().is_success() {
                return Err(Self::fail_from(resp).await);
            }

            debug!(id, field = %patch.field, "registry field updated");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> RegistryConfig {
        RegistryConfig {
            url: Some(url.to_string()),
            api_key: Some("anon-key".to_string()),
            table: "client_registrations".to_string(),
            row_cap: 500,
        }
    }

    #[test]
    fn test_new_strips_trailing_slash() {
        let registry = HostedRegistry::new(&config("https://example.supabase.co/")).unwrap();
        assert_eq!(
            registry.table_url(),
            "https://example.supabase.co/rest/v1/client_registrations"
        );
    }

    #[test]
    fn test_new_requires_credentials() {
        let mut missing_url = config("https://example.supabase.co");
        missing_url.url = None;
        assert!(HostedRegistry::new(&missing_url).is_err());

        let mut missing_key = config("https://example.supabase.co");
        missing_key.api_key = None;
        assert!(HostedRegistry::new(&missing_key).is_err());
    }

    #[test]
    fn test_contact_filter_shape() {
        assert_eq!(
            contact_filter("smith"),
            "(first_name.ilike.*smith*,last_name.ilike.*smith*,phone.ilike.*smith*)"
        );
    }

    #[test]
    fn test_contact_filter_drops_grammar_characters() {
        assert_eq!(
            contact_filter("sm,it(h)%*"),
            "(first_name.ilike.*smith*,last_name.ilike.*smith*,phone.ilike.*smith*)"
        );
    }

    // ── RecordStore contract, exercised against an in-memory store ──

    use std::sync::Mutex;

    /// Test double with the same search/update semantics the hosted
    /// store provides.
    struct MemoryStore {
        rows: Mutex<Vec<ClientRecord>>,
    }

    fn ilike(haystack: &Option<String>, needle: &str) -> bool {
        haystack
            .as_deref()
            .is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
    }

    impl RecordStore for MemoryStore {
        fn search(
            &self,
            filter: Option<&str>,
            limit: u32,
        ) -> BoxFuture<'_, Result<Vec<ClientRecord>, AppError>> {
            let filter = filter.map(str::to_string);
            Box::pin(async move {
                let mut rows: Vec<ClientRecord> = self
                    .rows
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|r| match filter.as_deref() {
                        Some(term) if !term.is_empty() => {
                            ilike(&r.first_name, term)
                                || ilike(&r.last_name, term)
                                || ilike(&r.phone, term)
                        }
                        _ => true,
                    })
                    .cloned()
                    .collect();
                rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                rows.truncate(limit.min(ROW_CAP) as usize);
                Ok(rows)
            })
        }

        fn update_field<'a>(
            &'a self,
            id: &'a str,
            patch: &'a FieldPatch,
        ) -> BoxFuture<'a, Result<(), AppError>> {
            Box::pin(async move {
                let mut rows = self.rows.lock().unwrap();
                let row = rows
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or_else(|| AppError::Registry(format!("no row with id {id}")))?;
                row.set_field(patch.field, patch.value.clone());
                Ok(())
            })
        }
    }

    fn named(id: &str, first_name: &str, created_at: &str) -> ClientRecord {
        ClientRecord {
            id: id.to_string(),
            created_at: created_at.parse().unwrap(),
            first_name: Some(first_name.to_string()),
            last_name: None,
            phone: None,
            email: None,
            called_on: None,
            bop_date: None,
            bop_status: None,
            followup_date: None,
            follow_up_status: None,
            product: Some("Term Life".into()),
            issued: None,
            comment: None,
            remark: None,
        }
    }

    fn store_with(rows: Vec<ClientRecord>) -> MemoryStore {
        MemoryStore {
            rows: Mutex::new(rows),
        }
    }

    #[tokio::test]
    async fn test_search_matches_case_insensitive_substring() {
        let store = store_with(vec![
            named("r1", "Smith", "2024-01-01T00:00:00Z"),
            named("r2", "SMITHERS", "2024-01-02T00:00:00Z"),
            named("r3", "Jones", "2024-01-03T00:00:00Z"),
        ]);

        let hits = store.search(Some("smith"), 500).await.unwrap();
        let mut ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, ["r1", "r2"]);
    }

    #[tokio::test]
    async fn test_search_orders_newest_first_and_caps() {
        let store = store_with(vec![
            named("old", "Ada", "2024-01-01T00:00:00Z"),
            named("new", "Ada", "2024-01-03T00:00:00Z"),
            named("mid", "Ada", "2024-01-02T00:00:00Z"),
        ]);

        let hits = store.search(None, 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["new", "mid"]);
    }

    #[tokio::test]
    async fn test_update_touches_one_field_of_one_record() {
        let store = store_with(vec![
            named("r1", "Smith", "2024-01-01T00:00:00Z"),
            named("r2", "Jones", "2024-01-02T00:00:00Z"),
        ]);

        let patch = FieldPatch {
            field: crd_sdk::records::EditableField::BopStatus,
            value: Some("Confirmed".into()),
        };
        store.update_field("r1", &patch).await.unwrap();

        let rows = store.search(None, 500).await.unwrap();
        let r1 = rows.iter().find(|r| r.id == "r1").unwrap();
        let r2 = rows.iter().find(|r| r.id == "r2").unwrap();
        assert_eq!(r1.bop_status.as_deref(), Some("Confirmed"));
        assert_eq!(r1.product.as_deref(), Some("Term Life"));
        assert_eq!(r1.first_name.as_deref(), Some("Smith"));
        assert!(r2.bop_status.is_none());
    }
}
