//! Profile endpoints

use reqwest::Method;
use serde_json::Value;

use crate::Result;
use crate::client::{FarmLinkClient, RequestOptions};

impl FarmLinkClient {
    /// Fetch the signed-in account's profile
    pub async fn get_my_profile(&self) -> Result<Value> {
        self.request("/api/profiles/me", RequestOptions::new()).await
    }

    /// Update the signed-in account's profile
    pub async fn update_my_profile(&self, changes: &Value) -> Result<Value> {
        let result = self
            .request(
                "/api/profiles/me",
                RequestOptions::new()
                    .method(Method::PATCH)
                    .json(changes.clone()),
            )
            .await?;
        self.invalidate_cache("/api/profiles");
        Ok(result)
    }

    /// Fetch another user's public profile
    pub async fn get_profile(&self, user_id: &str) -> Result<Value> {
        self.request(&format!("/api/profiles/{user_id}"), RequestOptions::new())
            .await
    }
}
