//! File upload endpoints
//!
//! Uploads go out as `multipart/form-data` through
//! [`FarmLinkClient::upload`], which bypasses the response cache and the
//! de-duplication map.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::Result;
use crate::client::FarmLinkClient;

/// Kinds of documents the platform accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// CV / resume (job seekers)
    Resume,
    /// Qualification or training certificate
    Certificate,
    /// Account profile photo
    ProfilePhoto,
    /// Farm photo shown on job postings
    FarmPhoto,
}

impl DocumentKind {
    /// Wire representation used by the upload endpoint's type discriminator
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::Certificate => "certificate",
            Self::ProfilePhoto => "profile_photo",
            Self::FarmPhoto => "farm_photo",
        }
    }
}

impl FarmLinkClient {
    /// Upload a document: the file plus its kind discriminator
    pub async fn upload_document(
        &self,
        file_name: &str,
        contents: Bytes,
        kind: DocumentKind,
    ) -> Result<Value> {
        let part = Part::bytes(contents.to_vec()).file_name(file_name.to_string());
        let form = Form::new()
            .part("file", part)
            .text("type", kind.as_str());
        self.upload("/api/uploads", form).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_kind_wire_names_are_stable() {
        assert_eq!(DocumentKind::Resume.as_str(), "resume");
        assert_eq!(DocumentKind::ProfilePhoto.as_str(), "profile_photo");
        assert_eq!(DocumentKind::FarmPhoto.as_str(), "farm_photo");
    }
}
