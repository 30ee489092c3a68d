use crate::dto;
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::Components;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(info(
    title = "Task Tracker API",
    description = "Personal task lists behind a signed session token"
))]
struct TaskTrackerApi;

/// Registers the bearer session token referenced by `security(("session_token" = []))`
struct SessionTokenScheme;

impl Modify for SessionTokenScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Components::new);
        components.add_security_scheme(
            "session_token",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

fn api_docs() -> utoipa::openapi::OpenApi {
    let mut api_docs = TaskTrackerApi::openapi();
    api_docs.merge(dto::OpenApiSchemas::openapi());
    api_docs.merge(super::auth::AuthApi::openapi());
    api_docs.merge(super::task::TaskApi::openapi());
    api_docs.merge(super::terms::TermsApi::openapi());
    SessionTokenScheme.modify(&mut api_docs);

    api_docs
}

/// Constructs the route on the API that renders the swagger UI and returns the OpenAPI schema.
/// Merges in OpenAPI definitions from other locations in the app, such as the [dto] package
/// and submodules of [api][crate::api]
pub fn build_documentation() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_docs())
}
