use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_macros::{FromRequest, FromRequestParts};

use serde::Serialize;
use tracing::{debug, error};
use utoipa::openapi::{RefOr, Schema};
use utoipa::{openapi, ToResponse, ToSchema};

use validator::ValidationErrors;

/// Contains diagnostic information about an API failure
#[derive(Serialize, Debug, ToSchema, ToResponse)]
#[response(examples(
    ("Unauthorized" = (
        summary = "Missing, expired, or invalid session; or bad sign-in credentials (401)",
        value = json!({
            "error_code": "unauthorized",
            "error_description": "You must sign in to do that.",
            "extra_info": "the session has expired"
        })
    )),

    ("Not Found" = (
        summary = "Entity could not be found (404)",
        value = json!({
            "error_code": "not_found",
            "error_description": "The requested entity could not be found.",
            "extra_info": null
        })
    )),

    ("Internal Failure" = (
        summary = "Something unexpected went wrong inside the server (500)",
        value = json!({
            "error_code": "internal_error",
            "error_description": "Could not access data to complete your request",
            "extra_info": null
        })
    )),

    ("Invalid Input" = (
        summary = "Invalid request body was passed (400)",
        value = json!({
            "error_code": "invalid_input",
            "error_description": "Submitted data was invalid.",
            "extra_info": {
                "title": [
                    {
                        "code": "length",
                        "message": null,
                        "params": {
                            "value": "",
                            "min": 1,
                            "max": 255
                        }
                    }
                ]
            }
        })
    )),

    ("Malformed JSON" = (
        summary = "Invalid JSON passed to server (400)",
        value = json!({
            "error_code": "invalid_json",
            "error_description": "The passed request body contained malformed or unreadable JSON.",
            "extra_info": "Failed to deserialize the JSON body into the target type: status: unknown variant `archived`"
        })
    ))
))]
pub struct BasicErrorResponse {
    error_code: String,
    error_description: String,
    extra_info: Option<ExtraInfo>,
}

impl BasicErrorResponse {
    fn with_status(
        status: StatusCode,
        error_code: &str,
        error_description: &str,
        extra_info: Option<ExtraInfo>,
    ) -> Response {
        (
            status,
            axum::Json(BasicErrorResponse {
                error_code: error_code.into(),
                error_description: error_description.into(),
                extra_info,
            }),
        )
            .into_response()
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(untagged)]
pub enum ExtraInfo {
    ValidationIssues(ValidationErrorSchema),
    Message(String),
}

/// Stand-in OpenAPI schema for [ValidationErrors] which just provides an empty object
#[derive(Serialize, Debug)]
#[serde(transparent)]
pub struct ValidationErrorSchema(ValidationErrors);

impl<'schem> ToSchema<'schem> for ValidationErrorSchema {
    fn schema() -> (&'schem str, RefOr<Schema>) {
        (
            "ValidationErrorSchema",
            openapi::ObjectBuilder::new().into(),
        )
    }
}

/// Response type for failures the caller can't do anything about. Logs the cause and
/// hides it from the response body.
pub struct GenericErrorResponse(pub anyhow::Error);

impl IntoResponse for GenericErrorResponse {
    fn into_response(self) -> Response {
        error!("Internal failure: {:#}", self.0);
        BasicErrorResponse::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Could not access data to complete your request",
            None,
        )
    }
}

/// Response type for entities that don't exist, or that the caller isn't allowed to see
pub struct NotFoundResponse;

impl IntoResponse for NotFoundResponse {
    fn into_response(self) -> Response {
        BasicErrorResponse::with_status(
            StatusCode::NOT_FOUND,
            "not_found",
            "The requested entity could not be found.",
            None,
        )
    }
}

/// Response type for requests without a valid session, or with bad sign-in credentials
pub struct UnauthorizedResponse(pub String);

impl IntoResponse for UnauthorizedResponse {
    fn into_response(self) -> Response {
        BasicErrorResponse::with_status(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "You must sign in to do that.",
            Some(ExtraInfo::Message(self.0)),
        )
    }
}

/// Response type that wraps validation errors and turns them into [BasicErrorResponse]s
pub struct ValidationErrorResponse(ValidationErrors);

impl IntoResponse for ValidationErrorResponse {
    fn into_response(self) -> Response {
        BasicErrorResponse::with_status(
            StatusCode::BAD_REQUEST,
            "invalid_input",
            "Submitted data was invalid.",
            Some(ExtraInfo::ValidationIssues(ValidationErrorSchema(self.0))),
        )
    }
}

impl From<ValidationErrors> for ValidationErrorResponse {
    fn from(value: ValidationErrors) -> Self {
        Self(value)
    }
}

/// Wrapper for [axum::Json] which customizes the error response to use our
/// data structure for API errors
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(JsonErrorResponse))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Response type representing JSON parse errors
pub struct JsonErrorResponse {
    parse_problem: String,
}

impl From<JsonRejection> for JsonErrorResponse {
    fn from(value: JsonRejection) -> Self {
        JsonErrorResponse {
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for JsonErrorResponse {
    fn into_response(self) -> Response {
        BasicErrorResponse::with_status(
            StatusCode::BAD_REQUEST,
            "invalid_json",
            "The passed request body contained malformed or unreadable JSON.",
            Some(ExtraInfo::Message(self.parse_problem)),
        )
    }
}

/// Wrapper for [axum::extract::Query] which reports unparseable query strings with our
/// error body
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(QueryErrorResponse))]
pub struct Query<T>(pub T);

/// Response type representing query strings that could not be parsed
pub struct QueryErrorResponse {
    parse_problem: String,
}

impl From<QueryRejection> for QueryErrorResponse {
    fn from(value: QueryRejection) -> Self {
        QueryErrorResponse {
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for QueryErrorResponse {
    fn into_response(self) -> Response {
        BasicErrorResponse::with_status(
            StatusCode::BAD_REQUEST,
            "invalid_input",
            "Submitted data was invalid.",
            Some(ExtraInfo::Message(self.parse_problem)),
        )
    }
}

/// Wrapper for [axum::extract::Path]. An ID that can't be parsed can't name an existing
/// entity, so a bad path segment is reported as not found.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(PathErrorResponse))]
pub struct Path<T>(pub T);

pub struct PathErrorResponse;

impl From<PathRejection> for PathErrorResponse {
    fn from(value: PathRejection) -> Self {
        debug!("Rejected path parameters: {}", value.body_text());
        PathErrorResponse
    }
}

impl IntoResponse for PathErrorResponse {
    fn into_response(self) -> Response {
        NotFoundResponse.into_response()
    }
}
