use crate::domain;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// DTO for a published terms of service document
#[derive(Serialize, ToSchema)]
pub struct TermsDocument {
    #[schema(example = "2")]
    pub id: String,
    #[schema(example = "1.1")]
    pub version: String,
    #[schema(example = "Terms of Service")]
    pub title: String,
    /// Markdown body
    pub content: String,
    pub effective_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<domain::terms::TermsDocument> for TermsDocument {
    fn from(value: domain::terms::TermsDocument) -> Self {
        TermsDocument {
            id: value.id,
            version: value.version,
            title: value.title,
            content: value.content,
            effective_date: value.effective_date,
            created_at: value.created_at,
            is_active: value.is_active,
        }
    }
}
