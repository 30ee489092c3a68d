use crate::domain::terms::driven_ports::TermsReader;
use crate::domain::terms::driving_ports::{TermsError, TermsPort};
use crate::external_connections::ExternalConnectivity;
use crate::persistence::db_terms_driven_ports::DbTermsReader;
use crate::routing_utils::{BasicErrorResponse, GenericErrorResponse, Json, NotFoundResponse};
use crate::{AppState, SharedData, domain, dto};
use axum::Router;
use axum::extract::State;
use axum::response::ErrorResponse;
use axum::routing::get;
use std::sync::Arc;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(paths(latest_terms, terms_history))]
pub struct TermsApi;

pub const TERMS_API_GROUP: &str = "Terms of Service";

/// Builds a router for the public routes under "/terms"
pub fn terms_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(|State(app_state): AppState| async move {
                let mut ext_cxn = app_state.ext_cxn.clone();

                latest_terms(&mut ext_cxn, &domain::terms::TermsService {}, &DbTermsReader).await
            }),
        )
        .route(
            "/history",
            get(|State(app_state): AppState| async move {
                let mut ext_cxn = app_state.ext_cxn.clone();

                terms_history(&mut ext_cxn, &domain::terms::TermsService {}, &DbTermsReader).await
            }),
        )
}

fn terms_error_response(err: TermsError) -> ErrorResponse {
    match err {
        TermsError::NoneFound => NotFoundResponse.into(),
        TermsError::PortError(cause) => GenericErrorResponse(cause).into(),
    }
}

#[utoipa::path(
    get,
    path = "/terms",
    tag = TERMS_API_GROUP,
    responses(
        (status = 200, description = "The terms of service currently in effect", body = dto::TermsDocument),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Returns the current terms of service
async fn latest_terms(
    ext_cxn: &mut impl ExternalConnectivity,
    terms_service: &impl TermsPort,
    terms_read: &impl TermsReader,
) -> Result<Json<dto::TermsDocument>, ErrorResponse> {
    let document = terms_service
        .latest_terms(ext_cxn, terms_read)
        .await
        .map_err(terms_error_response)?;

    Ok(Json(dto::TermsDocument::from(document)))
}

#[utoipa::path(
    get,
    path = "/terms/history",
    tag = TERMS_API_GROUP,
    responses(
        (status = 200, description = "Every published version, newest first", body = Vec<dto::TermsDocument>),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Returns every published version of the terms of service
async fn terms_history(
    ext_cxn: &mut impl ExternalConnectivity,
    terms_service: &impl TermsPort,
    terms_read: &impl TermsReader,
) -> Result<Json<Vec<dto::TermsDocument>>, ErrorResponse> {
    let documents = terms_service
        .terms_history(ext_cxn, terms_read)
        .await
        .map_err(terms_error_response)?;

    Ok(Json(
        documents.into_iter().map(dto::TermsDocument::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_util::{ErrorBody, status_and_body};
    use crate::domain::terms::TermsDocument;
    use crate::external_connections::test_util::FakeExternalConnectivity;
    use anyhow::anyhow;
    use axum::http::StatusCode;
    use chrono::{TimeZone, Utc};

    /// Reader returning a fixed set of documents, or failing when `documents` is None
    struct FixedTerms {
        documents: Option<Vec<TermsDocument>>,
    }

    impl TermsReader for FixedTerms {
        async fn all_documents(
            &self,
            _ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<TermsDocument>, anyhow::Error> {
            self.documents
                .clone()
                .ok_or_else(|| anyhow!("terms table unavailable"))
        }
    }

    fn document(version: &str, is_active: bool) -> TermsDocument {
        let created = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        TermsDocument {
            id: format!("tos-v{version}"),
            version: version.to_owned(),
            title: "Terms of Service".to_owned(),
            content: "Be excellent to each other.".to_owned(),
            effective_date: created,
            created_at: created,
            is_active,
        }
    }

    #[tokio::test]
    async fn latest_returns_document() {
        let mut ext_cxn = FakeExternalConnectivity::new();
        let reader = FixedTerms {
            documents: Some(vec![document("1.1", true)]),
        };

        let response = latest_terms(&mut ext_cxn, &domain::terms::TermsService {}, &reader).await;

        let (status, body): (StatusCode, serde_json::Value) = status_and_body(response).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(serde_json::json!("1.1"), body["version"]);
    }

    #[tokio::test]
    async fn latest_without_documents_is_not_found() {
        let mut ext_cxn = FakeExternalConnectivity::new();
        let reader = FixedTerms {
            documents: Some(Vec::new()),
        };

        let response = latest_terms(&mut ext_cxn, &domain::terms::TermsService {}, &reader).await;

        let (status, body): (StatusCode, ErrorBody) = status_and_body(response).await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert_eq!("not_found", body.error_code);
    }

    #[tokio::test]
    async fn history_failure_is_internal_error() {
        let mut ext_cxn = FakeExternalConnectivity::new();
        let reader = FixedTerms { documents: None };

        let response = terms_history(&mut ext_cxn, &domain::terms::TermsService {}, &reader).await;

        let (status, body): (StatusCode, ErrorBody) = status_and_body(response).await;
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, status);
        assert_eq!("internal_error", body.error_code);
    }
}
