use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use crd_sdk::records::ClientRecord;
use crd_sdk::weekly::WeekBucket;

/// HTTP client for the dashboard service API.
pub struct CrdClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

// ── Request / Response types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub session_id: String,
    pub access_token: String,
    pub access_expires_at: u64,
    pub refresh_token: String,
    pub refresh_expires_at: u64,
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub session_id: String,
    pub access_token: String,
    pub access_expires_at: u64,
}

#[derive(Debug, Deserialize)]
pub struct RecordListResponse {
    pub total: usize,
    pub records: Vec<ClientRecord>,
}

#[derive(Debug, Serialize)]
pub struct UpdateFieldRequest {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFieldResponse {
    pub id: String,
    pub field: String,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub count: usize,
    pub records: Vec<ClientRecord>,
}

#[derive(Debug, Deserialize)]
pub struct WeeklyResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub buckets: Vec<WeekBucket>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ── Client implementation ───────────────────────────────────────────

impl CrdClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Set the Bearer token for authenticated requests.
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Attach Bearer token to a request if one is set.
    fn with_auth(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// GET /health
    pub async fn health(&self) -> Result<HealthResponse, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Self::handle_response(resp).await
    }

    /// POST /auth/login
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, Box<dyn std::error::Error>> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&body)
            .send()
            .await?;
        Self::handle_response(resp).await
    }

    /// POST /auth/refresh
    pub async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshResponse, Box<dyn std::error::Error>> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        let resp = self
            .client
            .post(format!("{}/auth/refresh", self.base_url))
            .json(&body)
            .send()
            .await?;
        Self::handle_response(resp).await
    }

    /// POST /auth/logout
    pub async fn logout(&self) -> Result<(), Box<dyn std::error::Error>> {
        let req = self.client.post(format!("{}/auth/logout", self.base_url));
        let resp = self.with_auth(req).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_message(resp).await.into())
        }
    }

    /// GET /records
    pub async fn records(
        &self,
        filter: Option<&str>,
    ) -> Result<RecordListResponse, Box<dyn std::error::Error>> {
        let mut req = self.client.get(format!("{}/records", self.base_url));
        if let Some(q) = filter {
            req = req.query(&[("q", q)]);
        }
        let resp = self.with_auth(req).send().await?;
        Self::handle_response(resp).await
    }

    /// PATCH /records/{id}
    pub async fn update_field(
        &self,
        id: &str,
        field: &str,
        value: Option<&str>,
    ) -> Result<UpdateFieldResponse, Box<dyn std::error::Error>> {
        let body = UpdateFieldRequest {
            field: field.to_string(),
            value: value.map(str::to_string),
        };
        let req = self
            .client
            .patch(format!("{}/records/{}", self.base_url, id))
            .json(&body);
        let resp = self.with_auth(req).send().await?;
        Self::handle_response(resp).await
    }

    /// GET /reports/upcoming
    pub async fn upcoming(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<UpcomingResponse, Box<dyn std::error::Error>> {
        let req = self
            .client
            .get(format!("{}/reports/upcoming", self.base_url))
            .query(&[("start", start.to_string()), ("end", end.to_string())]);
        let resp = self.with_auth(req).send().await?;
        Self::handle_response(resp).await
    }

    /// GET /reports/weekly
    pub async fn weekly(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<WeeklyResponse, Box<dyn std::error::Error>> {
        let req = self
            .client
            .get(format!("{}/reports/weekly", self.base_url))
            .query(&[("start", start.to_string()), ("end", end.to_string())]);
        let resp = self.with_auth(req).send().await?;
        Self::handle_response(resp).await
    }

    /// GET /reports/export, returning the raw workbook bytes.
    pub async fn export(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let req = self
            .client
            .get(format!("{}/reports/export", self.base_url))
            .query(&[("start", start.to_string()), ("end", end.to_string())]);
        let resp = self.with_auth(req).send().await?;
        if resp.status().is_success() {
            Ok(resp.bytes().await?.to_vec())
        } else {
            Err(Self::error_message(resp).await.into())
        }
    }

    async fn error_message(resp: reqwest::Response) -> String {
        let status = resp.status();
        let body = resp
            .json::<ErrorResponse>()
            .await
            .map(|e| e.error)
            .unwrap_or_else(|_| "unknown error".to_string());
        format!("{status}: {body}")
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, Box<dyn std::error::Error>> {
        if resp.status().is_success() {
            Ok(resp.json::<T>().await?)
        } else {
            Err(Self::error_message(resp).await.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── CrdClient::new ──────────────────────────────────────────────

    #[test]
    fn test_new_strips_trailing_slash() {
        let client = CrdClient::new("http://localhost:8200/");
        assert_eq!(client.base_url(), "http://localhost:8200");
    }

    #[test]
    fn test_new_token_initially_none() {
        let client = CrdClient::new("http://example.com");
        assert!(client.token.is_none());
    }

    #[test]
    fn test_set_token() {
        let mut client = CrdClient::new("http://example.com");
        client.set_token("my-jwt".to_string());
        assert_eq!(client.token.as_deref(), Some("my-jwt"));
    }

    // ── Request/Response serialization ──────────────────────────────

    #[test]
    fn test_update_field_request_skips_none_value() {
        let req = UpdateFieldRequest {
            field: "BOP_Status".into(),
            value: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["field"], "BOP_Status");
        assert!(!json.as_object().unwrap().contains_key("value"));
    }

    #[test]
    fn test_login_response_deserialization() {
        let json = r#"{
            "sessionId": "s1",
            "accessToken": "jwt",
            "accessExpiresAt": 1700000900,
            "refreshToken": "tok",
            "refreshExpiresAt": 1700086400
        }"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.session_id, "s1");
        assert_eq!(resp.access_token, "jwt");
        assert_eq!(resp.refresh_expires_at, 1_700_086_400);
    }

    #[test]
    fn test_error_response_deserialization() {
        let json = r#"{"error":"registry error: 503: upstream down"}"#;
        let resp: ErrorResponse = serde_json::from_str(json).unwrap();
        assert!(resp.error.contains("upstream down"));
    }

    #[test]
    fn test_record_list_response_deserialization() {
        let json = r#"{"total":0,"records":[]}"#;
        let resp: RecordListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.total, 0);
        assert!(resp.records.is_empty());
    }

    #[test]
    fn test_weekly_response_deserialization() {
        let json = r#"{
            "start": "2024-01-01",
            "end": "2024-01-31",
            "buckets": [{"week_start": "2024-01-01", "count": 2}]
        }"#;
        let resp: WeeklyResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.buckets.len(), 1);
        assert_eq!(resp.buckets[0].count, 2);
        assert_eq!(resp.buckets[0].week_start.to_string(), "2024-01-01");
    }

    #[test]
    fn test_upcoming_response_deserialization() {
        let json = r#"{
            "start": "2024-01-01",
            "end": "2024-01-09",
            "count": 1,
            "records": [{
                "id": "r1",
                "created_at": "2024-01-01T08:30:00Z",
                "first_name": "Ada",
                "last_name": "Smith",
                "phone": null,
                "email": null,
                "CalledOn": null,
                "BOP_Date": "2024-01-02T10:00:00Z",
                "BOP_Status": null,
                "Followup_Date": null,
                "FollowUp_Status": null,
                "Product": null,
                "Issued": null,
                "Comment": null,
                "Remark": null
            }]
        }"#;
        let resp: UpcomingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.count, 1);
        assert_eq!(resp.records[0].bop_date.as_deref(), Some("2024-01-02T10:00:00Z"));
    }
}
