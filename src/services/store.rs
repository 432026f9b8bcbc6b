// Report Store
// Persistence of analyzed reports: Supabase PostgREST or in-memory

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewReport, Report};

const REPORTS_TABLE: &str = "reports";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Store error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Store returned no row")]
    MissingRow,
    #[error("Failed to decode store response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert(&self, report: NewReport) -> Result<Report, StoreError>;
    /// Fetch one report owned by `user_id`.
    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Report>, StoreError>;
    /// All reports owned by `user_id`, newest first.
    async fn list(&self, user_id: &str) -> Result<Vec<Report>, StoreError>;
    /// Store a rewrite on a report owned by `user_id`; `None` if no such report.
    async fn set_humanized(
        &self,
        user_id: &str,
        id: &str,
        humanized_text: &str,
    ) -> Result<Option<Report>, StoreError>;
}

// ============================================================================
// Supabase (PostgREST)
// ============================================================================

pub struct SupabaseStore {
    client: Client,
    table_url: String,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, service_key: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            table_url: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), REPORTS_TABLE),
            service_key: service_key.to_string(),
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    async fn rows(response: Response) -> Result<Vec<Report>, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }
        response
            .json::<Vec<Report>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ReportStore for SupabaseStore {
    async fn insert(&self, report: NewReport) -> Result<Report, StoreError> {
        let response = self
            .authorized(self.client.post(&self.table_url))
            .header("Prefer", "return=representation")
            .json(&report)
            .send()
            .await?;
        let inserted = Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::MissingRow)?;
        info!(report_id = %inserted.id, user_id = %inserted.user_id, "store.insert");
        Ok(inserted)
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Report>, StoreError> {
        let response = self
            .authorized(self.client.get(&self.table_url))
            .query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", user_id)),
            ])
            .send()
            .await?;
        Ok(Self::rows(response).await?.into_iter().next())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Report>, StoreError> {
        let response = self
            .authorized(self.client.get(&self.table_url))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn set_humanized(
        &self,
        user_id: &str,
        id: &str,
        humanized_text: &str,
    ) -> Result<Option<Report>, StoreError> {
        let response = self
            .authorized(self.client.patch(&self.table_url))
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", user_id)),
            ])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "humanized_text": humanized_text }))
            .send()
            .await?;
        let updated = Self::rows(response).await?.into_iter().next();
        if updated.is_some() {
            info!(report_id = %id, "store.set_humanized");
        }
        Ok(updated)
    }
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    reports: RwLock<HashMap<String, Report>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert(&self, report: NewReport) -> Result<Report, StoreError> {
        let row = Report {
            id: Uuid::new_v4().to_string(),
            user_id: report.user_id,
            file_name: report.file_name,
            file_url: report.file_url,
            original_text: report.original_text,
            human_score: report.human_score,
            ai_score: report.ai_score,
            confidence: report.confidence,
            ai_sentences: report.ai_sentences,
            analysis: report.analysis,
            humanized_text: report.humanized_text,
            created_at: Utc::now(),
        };
        self.reports.write().await.insert(row.id.clone(), row.clone());
        Ok(row)
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Report>, StoreError> {
        Ok(self
            .reports
            .read()
            .await
            .get(id)
            .filter(|r| r.user_id == user_id)
            .cloned())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Report>, StoreError> {
        let mut rows: Vec<Report> = self
            .reports
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn set_humanized(
        &self,
        user_id: &str,
        id: &str,
        humanized_text: &str,
    ) -> Result<Option<Report>, StoreError> {
        let mut reports = self.reports.write().await;
        Ok(reports
            .get_mut(id)
            .filter(|r| r.user_id == user_id)
            .map(|r| {
                r.humanized_text = Some(humanized_text.to_string());
                r.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_report(user: &str, text: &str) -> NewReport {
        NewReport {
            user_id: user.to_string(),
            original_text: text.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_memory_store_scopes_by_user() {
        let store = MemoryStore::new();
        let a = store.insert(new_report("alice", "A text")).await.unwrap();
        store.insert(new_report("bob", "B text")).await.unwrap();

        assert_eq!(store.get("alice", &a.id).await.unwrap().unwrap().original_text, "A text");
        assert!(store.get("bob", &a.id).await.unwrap().is_none());
        assert_eq!(store.list("alice").await.unwrap().len(), 1);
        assert!(store.list("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_set_humanized() {
        let store = MemoryStore::new();
        let a = store.insert(new_report("alice", "A text")).await.unwrap();

        assert!(store.set_humanized("bob", &a.id, "x").await.unwrap().is_none());
        let updated = store.set_humanized("alice", &a.id, "Rewritten").await.unwrap().unwrap();
        assert_eq!(updated.humanized_text.as_deref(), Some("Rewritten"));
        assert_eq!(updated.original_text, "A text");
        assert!(store.set_humanized("alice", "missing", "x").await.unwrap().is_none());
    }

    #[test]
    fn test_new_report_omits_absent_columns() {
        let v = serde_json::to_value(new_report("alice", "t")).unwrap();
        assert!(v.get("humanized_text").is_none());
        assert!(v.get("confidence").is_none());
        assert_eq!(v["ai_sentences"], serde_json::json!([]));
    }

    #[test]
    fn test_supabase_table_url() {
        let store = SupabaseStore::new("https://x.supabase.co/", "key", 5);
        assert_eq!(store.table_url, "https://x.supabase.co/rest/v1/reports");
    }
}
