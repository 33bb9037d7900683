//! Job listing endpoints

use reqwest::Method;
use serde_json::Value;
use url::form_urlencoded;

use crate::Result;
use crate::client::{FarmLinkClient, RequestOptions};

/// Filters for job listing queries
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    /// Region or district, e.g. `"Ashanti"`
    pub location: Option<String>,
    /// Job category, e.g. `"crop-production"`
    pub category: Option<String>,
    /// Engagement type, e.g. `"seasonal"` or `"full-time"`
    pub job_type: Option<String>,
    /// Free-text search over title and description
    pub search: Option<String>,
    /// Page number (1-based)
    pub page: Option<u32>,
    /// Page size
    pub per_page: Option<u32>,
}

impl JobFilter {
    /// Render the filter as a query string; empty when nothing is set
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(ref location) = self.location {
            query.append_pair("location", location);
        }
        if let Some(ref category) = self.category {
            query.append_pair("category", category);
        }
        if let Some(ref job_type) = self.job_type {
            query.append_pair("type", job_type);
        }
        if let Some(ref search) = self.search {
            query.append_pair("search", search);
        }
        if let Some(page) = self.page {
            query.append_pair("page", &page.to_string());
        }
        if let Some(per_page) = self.per_page {
            query.append_pair("per_page", &per_page.to_string());
        }
        query.finish()
    }
}

impl FarmLinkClient {
    /// List published jobs, optionally filtered
    pub async fn list_jobs(&self, filter: &JobFilter) -> Result<Value> {
        let endpoint = match filter.to_query() {
            query if query.is_empty() => "/api/jobs".to_string(),
            query => format!("/api/jobs?{query}"),
        };
        self.request(&endpoint, RequestOptions::new()).await
    }

    /// Fetch a single job by id
    pub async fn get_job(&self, id: &str) -> Result<Value> {
        self.request(&format!("/api/jobs/{id}"), RequestOptions::new())
            .await
    }

    /// Create a job posting (farm accounts)
    pub async fn create_job(&self, job: &Value) -> Result<Value> {
        let result = self
            .request(
                "/api/jobs",
                RequestOptions::new().method(Method::POST).json(job.clone()),
            )
            .await?;
        self.invalidate_cache("/api/jobs");
        Ok(result)
    }

    /// Update a job posting
    pub async fn update_job(&self, id: &str, changes: &Value) -> Result<Value> {
        let result = self
            .request(
                &format!("/api/jobs/{id}"),
                RequestOptions::new()
                    .method(Method::PATCH)
                    .json(changes.clone()),
            )
            .await?;
        self.invalidate_cache("/api/jobs");
        Ok(result)
    }

    /// Delete a job posting
    pub async fn delete_job(&self, id: &str) -> Result<Value> {
        let result = self
            .request(
                &format!("/api/jobs/{id}"),
                RequestOptions::new().method(Method::DELETE),
            )
            .await?;
        self.invalidate_cache("/api/jobs");
        Ok(result)
    }
}
