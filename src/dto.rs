use utoipa::OpenApi;

mod auth;
mod task;
mod terms;
mod user;

pub use auth::*;
pub use task::*;
pub use terms::*;
pub use user::*;

use crate::routing_utils::{BasicErrorResponse, ExtraInfo, ValidationErrorSchema};

/// Registers every DTO with the OpenAPI document
#[derive(OpenApi)]
#[openapi(components(
    schemas(
        SignIn,
        SessionInfo,
        SessionUser,
        TaskStatus,
        TaskPriority,
        TaskRecord,
        NewTask,
        UpdateTask,
        DeletedTask,
        TaskStats,
        TermsDocument,
        BasicErrorResponse,
        ExtraInfo,
        ValidationErrorSchema,
    ),
    responses(BasicErrorResponse),
))]
pub struct OpenApiSchemas;
