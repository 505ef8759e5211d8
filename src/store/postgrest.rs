// src/store/postgrest.rs
//! Supabase (PostgREST) statistics store.
//!
//! Talks to `/rest/v1/` with the project's service key. Table layout:
//! `plans(id, root_block, notion_token, last_error)` and
//! `statistics(plan_id, block_cnt, word_cnt, created_at)`.

use super::StatisticsStore;
use crate::error::StoreError;
use crate::model::{PlanErrorState, PlanRow, StatisticsRecord, TraversalResult};
use crate::types::{PlanId, ValidatedUrl};
use reqwest::{header, Client, Method, Request, Response};
use serde::Deserialize;
use url::Url;

pub struct PostgrestStore {
    client: Client,
    rest_url: Url,
}

#[derive(Deserialize)]
struct CountsRow {
    block_cnt: u64,
    word_cnt: u64,
}

impl PostgrestStore {
    /// Creates a store for the Supabase project at `project_url`.
    pub fn new(project_url: &ValidatedUrl, service_key: &str) -> Result<Self, StoreError> {
        let mut base = project_url.as_str().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let rest_url = Url::parse(&base)?.join("rest/v1/")?;

        let client = Client::builder()
            .default_headers(Self::create_headers(service_key)?)
            .build()?;
        Ok(Self { client, rest_url })
    }

    fn create_headers(service_key: &str) -> Result<header::HeaderMap, StoreError> {
        let invalid = |e: header::InvalidHeaderValue| StoreError::Malformed(format!("service key: {}", e));
        let mut headers = header::HeaderMap::new();
        headers.insert("apikey", header::HeaderValue::from_str(service_key).map_err(invalid)?);
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", service_key)).map_err(invalid)?,
        );
        Ok(headers)
    }

    fn table(&self, name: &str) -> Result<Url, StoreError> {
        Ok(self.rest_url.join(name)?)
    }

    fn select_plans_request(&self) -> Result<Request, StoreError> {
        Ok(self
            .client
            .get(self.table("plans")?)
            .query(&[("select", "id,root_block,notion_token"), ("order", "id.asc")])
            .build()?)
    }

    fn latest_statistics_request(&self, plan: &PlanId) -> Result<Request, StoreError> {
        Ok(self
            .client
            .get(self.table("statistics")?)
            .query(&[
                ("select", "block_cnt,word_cnt".to_string()),
                ("plan_id", format!("eq.{}", plan)),
                ("order", "created_at.desc".to_string()),
                ("limit", "1".to_string()),
            ])
            .build()?)
    }

    fn insert_statistics_request(&self, record: &StatisticsRecord) -> Result<Request, StoreError> {
        Ok(self
            .client
            .request(Method::POST, self.table("statistics")?)
            .header("Prefer", "return=minimal")
            .json(record)
            .build()?)
    }

    fn update_plan_error_request(&self, state: &PlanErrorState) -> Result<Request, StoreError> {
        Ok(self
            .client
            .request(Method::PATCH, self.table("plans")?)
            .query(&[("id", format!("eq.{}", state.plan_id))])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "last_error": state.last_error }))
            .build()?)
    }

    async fn send(&self, operation: &'static str, request: Request) -> Result<Response, StoreError> {
        log::debug!("{} {} ({})", request.method(), request.url(), operation);
        let response = self.client.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            operation,
            status,
            body,
        })
    }
}

#[async_trait::async_trait]
impl StatisticsStore for PostgrestStore {
    async fn select_plans(&self) -> Result<Vec<PlanRow>, StoreError> {
        let response = self.send("select plans", self.select_plans_request()?).await?;
        Ok(response.json().await?)
    }

    async fn latest_statistics(&self, plan: &PlanId) -> Result<Option<TraversalResult>, StoreError> {
        let response = self
            .send("select statistics", self.latest_statistics_request(plan)?)
            .await?;
        let rows: Vec<CountsRow> = response.json().await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| TraversalResult::new(row.block_cnt, row.word_cnt)))
    }

    async fn insert_statistics(&self, record: &StatisticsRecord) -> Result<(), StoreError> {
        self.send("insert statistics", self.insert_statistics_request(record)?)
            .await?;
        Ok(())
    }

    async fn update_plan_error(&self, state: &PlanErrorState) -> Result<(), StoreError> {
        self.send("update plan", self.update_plan_error_request(state)?)
            .await?;
        Ok(())
    }
}
