//! Job application endpoints

use reqwest::Method;
use serde_json::{Value, json};
use url::form_urlencoded;

use crate::Result;
use crate::client::{FarmLinkClient, RequestOptions};

/// Lifecycle states of a job application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    /// Submitted by the applicant, awaiting review
    Submitted,
    /// Shortlisted by the farm
    Shortlisted,
    /// Offer accepted
    Accepted,
    /// Rejected by the farm
    Rejected,
    /// Withdrawn by the applicant
    Withdrawn,
}

impl ApplicationStatus {
    /// Wire representation used by the backend
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Shortlisted => "shortlisted",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }
}

/// Filters for application listing queries
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    /// Restrict to applications for one job
    pub job_id: Option<String>,
    /// Restrict to one lifecycle state
    pub status: Option<ApplicationStatus>,
}

impl ApplicationFilter {
    /// Render the filter as a query string; empty when nothing is set
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(ref job_id) = self.job_id {
            query.append_pair("job_id", job_id);
        }
        if let Some(status) = self.status {
            query.append_pair("status", status.as_str());
        }
        query.finish()
    }
}

impl FarmLinkClient {
    /// Apply to a job (graduate, student and skilled-worker accounts)
    pub async fn apply_to_job(&self, job_id: &str, application: &Value) -> Result<Value> {
        let result = self
            .request(
                &format!("/api/jobs/{job_id}/applications"),
                RequestOptions::new()
                    .method(Method::POST)
                    .json(application.clone()),
            )
            .await?;
        self.invalidate_cache("/api/applications");
        Ok(result)
    }

    /// List applications visible to the current account
    pub async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Value> {
        let endpoint = match filter.to_query() {
            query if query.is_empty() => "/api/applications".to_string(),
            query => format!("/api/applications?{query}"),
        };
        self.request(&endpoint, RequestOptions::new()).await
    }

    /// Move an application to a new lifecycle state (farm accounts)
    pub async fn update_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Value> {
        let result = self
            .request(
                &format!("/api/applications/{id}/status"),
                RequestOptions::new()
                    .method(Method::PATCH)
                    .json(json!({ "status": status.as_str() })),
            )
            .await?;
        self.invalidate_cache("/api/applications");
        Ok(result)
    }

    /// Withdraw an application (applicant accounts)
    pub async fn withdraw_application(&self, id: &str) -> Result<Value> {
        let result = self
            .request(
                &format!("/api/applications/{id}"),
                RequestOptions::new().method(Method::DELETE),
            )
            .await?;
        self.invalidate_cache("/api/applications");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names_are_stable() {
        assert_eq!(ApplicationStatus::Submitted.as_str(), "submitted");
        assert_eq!(ApplicationStatus::Shortlisted.as_str(), "shortlisted");
        assert_eq!(ApplicationStatus::Withdrawn.as_str(), "withdrawn");
    }

    #[test]
    fn filter_renders_job_and_status() {
        let filter = ApplicationFilter {
            job_id: Some("job-7".to_string()),
            status: Some(ApplicationStatus::Shortlisted),
        };
        assert_eq!(filter.to_query(), "job_id=job-7&status=shortlisted");
    }
}
