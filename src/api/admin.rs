//! Admin endpoints
//!
//! All of these require an admin session; the backend enforces the role.

use reqwest::Method;
use serde_json::{Value, json};
use url::form_urlencoded;

use crate::Result;
use crate::client::{FarmLinkClient, RequestOptions};

/// Account roles on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    /// Farm account posting jobs
    Farm,
    /// Graduate job seeker
    Graduate,
    /// Student job seeker
    Student,
    /// Skilled-worker job seeker
    SkilledWorker,
    /// Platform administrator
    Admin,
}

impl UserRole {
    /// Wire representation used by the backend
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Farm => "farm",
            Self::Graduate => "graduate",
            Self::Student => "student",
            Self::SkilledWorker => "skilled_worker",
            Self::Admin => "admin",
        }
    }
}

/// Filters for the admin user listing
#[derive(Debug, Clone, Default)]
pub struct AdminUserFilter {
    /// Restrict to one account role
    pub role: Option<UserRole>,
    /// Restrict by verification state
    pub verified: Option<bool>,
    /// Free-text search over name and email
    pub search: Option<String>,
}

impl AdminUserFilter {
    /// Render the filter as a query string; empty when nothing is set
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(role) = self.role {
            query.append_pair("role", role.as_str());
        }
        if let Some(verified) = self.verified {
            query.append_pair("verified", if verified { "true" } else { "false" });
        }
        if let Some(ref search) = self.search {
            query.append_pair("search", search);
        }
        query.finish()
    }
}

impl FarmLinkClient {
    /// List user accounts
    pub async fn admin_list_users(&self, filter: &AdminUserFilter) -> Result<Value> {
        let endpoint = match filter.to_query() {
            query if query.is_empty() => "/api/admin/users".to_string(),
            query => format!("/api/admin/users?{query}"),
        };
        self.request(&endpoint, RequestOptions::new()).await
    }

    /// Approve or revoke a user's verification
    pub async fn admin_verify_user(&self, id: &str, verified: bool) -> Result<Value> {
        let result = self
            .request(
                &format!("/api/admin/users/{id}/verification"),
                RequestOptions::new()
                    .method(Method::PATCH)
                    .json(json!({ "verified": verified })),
            )
            .await?;
        self.invalidate_cache("/api/admin");
        Ok(result)
    }

    /// Delete a user account
    pub async fn admin_delete_user(&self, id: &str) -> Result<Value> {
        let result = self
            .request(
                &format!("/api/admin/users/{id}"),
                RequestOptions::new().method(Method::DELETE),
            )
            .await?;
        self.invalidate_cache("/api/admin");
        Ok(result)
    }

    /// Platform-wide placement statistics
    pub async fn admin_stats(&self) -> Result<Value> {
        self.request("/api/admin/stats", RequestOptions::new()).await
    }
}
