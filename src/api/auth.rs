use crate::domain::auth::driven_ports::{CredentialVerifier, SessionCodec};
use crate::domain::auth::driving_ports::{AuthError, AuthPort};
use crate::domain::user::User;
use crate::domain::user::driven_ports::{UserReader, UserWriter};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{
    BasicErrorResponse, GenericErrorResponse, Json, UnauthorizedResponse, ValidationErrorResponse,
};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{ErrorResponse, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

/// Defines the OpenAPI spec for sign-in and session endpoints
#[derive(OpenApi)]
#[openapi(paths(sign_in, current_session))]
pub struct AuthApi;

/// Used to group auth endpoints together in the OpenAPI documentation
pub const AUTH_API_GROUP: &str = "Auth";

/// Builds a router for the routes under "/auth"
pub fn auth_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/signin",
            post(
                |State(app_state): AppState, Json(sign_in_data): Json<dto::SignIn>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let auth_service = domain::auth::AuthService {};
                    let user_write = persistence::db_user_driven_ports::DbWriteUsers;

                    sign_in(
                        sign_in_data,
                        &mut ext_cxn,
                        &auth_service,
                        &app_state.credential_verifier,
                        &user_write,
                        &app_state.sessions,
                    )
                    .await
                },
            ),
        )
        .route(
            "/session",
            get(
                |State(app_state): AppState, CurrentUser(user): CurrentUser| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let auth_service = domain::auth::AuthService {};
                    let user_read = persistence::db_user_driven_ports::DbReadUsers;

                    current_session(user.id, &mut ext_cxn, &auth_service, &user_read).await
                },
            ),
        )
}

/// The signed-in user, taken from the request's `Authorization: Bearer` session token.
/// Requests without a valid session are rejected with a 401.
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<Arc<SharedData>> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<SharedData>,
    ) -> Result<Self, Self::Rejection> {
        let auth_service = domain::auth::AuthService {};
        let user = authenticate_request(&parts.headers, &auth_service, &state.sessions)
            .map_err(|err| Err::<(), _>(err).into_response())?;

        Ok(CurrentUser(user))
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, UnauthorizedResponse> {
    let header_value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| UnauthorizedResponse("no session token was provided".to_owned()))?
        .to_str()
        .map_err(|_| UnauthorizedResponse("the Authorization header is unreadable".to_owned()))?;

    match header_value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(UnauthorizedResponse(
            "the Authorization header must use the Bearer scheme".to_owned(),
        )),
    }
}

fn authenticate_request(
    headers: &HeaderMap,
    auth_service: &impl AuthPort,
    sessions: &impl SessionCodec,
) -> Result<User, ErrorResponse> {
    let token = bearer_token(headers)?;

    auth_service
        .authenticate(token, sessions)
        .map_err(auth_error_response)
}

fn auth_error_response(err: AuthError) -> ErrorResponse {
    match err {
        AuthError::InvalidCredentials => UnauthorizedResponse(err.to_string()).into(),
        AuthError::InvalidSession(rejection) => UnauthorizedResponse(rejection.to_string()).into(),
        AuthError::PortError(cause) => GenericErrorResponse(cause).into(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/signin",
    tag = AUTH_API_GROUP,
    request_body = dto::SignIn,
    responses(
        (status = 200, description = "Signed in, session token issued", body = dto::SessionInfo),
        (status = 400, response = BasicErrorResponse),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Exchanges an email and password for a session token
async fn sign_in(
    sign_in_data: dto::SignIn,
    ext_cxn: &mut impl ExternalConnectivity,
    auth_service: &impl AuthPort,
    verifier: &impl CredentialVerifier,
    user_write: &impl UserWriter,
    sessions: &impl SessionCodec,
) -> Result<Json<dto::SessionInfo>, ErrorResponse> {
    info!("Sign-in attempt for {sign_in_data}");
    sign_in_data
        .validate()
        .map_err(ValidationErrorResponse::from)?;

    let session = auth_service
        .sign_in(&sign_in_data.into(), ext_cxn, verifier, user_write, sessions)
        .await
        .map_err(auth_error_response)?;

    Ok(Json(dto::SessionInfo::from(session)))
}

#[utoipa::path(
    get,
    path = "/auth/session",
    tag = AUTH_API_GROUP,
    security(("session_token" = [])),
    responses(
        (status = 200, description = "The signed-in user", body = dto::SessionUser),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Returns the user behind the current session
async fn current_session(
    user_id: Uuid,
    ext_cxn: &mut impl ExternalConnectivity,
    auth_service: &impl AuthPort,
    user_read: &impl UserReader,
) -> Result<Json<dto::SessionUser>, ErrorResponse> {
    let user = auth_service
        .current_user(user_id, ext_cxn, user_read)
        .await
        .map_err(auth_error_response)?;

    Ok(Json(dto::SessionUser::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_util::{ErrorBody, status_and_body};
    use crate::domain::auth::test_util::{InMemoryAccounts, MockAuthService, PlainTextSessions};
    use crate::domain::auth::{Credentials, IssuedSession, SessionRejection};
    use crate::domain::user::test_util::{InMemoryUserPersistence, lola};
    use crate::external_connections::test_util::FakeExternalConnectivity;
    use anyhow::anyhow;
    use axum::http::{HeaderValue, StatusCode};
    use chrono::{TimeZone, Utc};
    use speculoos::prelude::*;
    use std::sync::Mutex;

    fn headers_with_authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(value).expect("valid header value"),
        );
        headers
    }

    mod sign_in {
        use super::*;

        fn sign_in_data(email: &str, password: &str) -> dto::SignIn {
            dto::SignIn {
                email: email.to_owned(),
                password: password.to_owned(),
            }
        }

        #[tokio::test]
        async fn happy_path() {
            let mut auth_service_raw = MockAuthService::new();
            let expires_at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
            auth_service_raw.sign_in_result.set_returned_result(Ok(IssuedSession {
                token: "signed.session.token".to_owned(),
                expires_at,
                user: lola(),
            }));
            let auth_service = Mutex::new(auth_service_raw);
            let mut ext_cxn = FakeExternalConnectivity::new();

            let response = sign_in(
                sign_in_data("lola@mail.com", "password123"),
                &mut ext_cxn,
                &auth_service,
                &InMemoryAccounts::new(&[]),
                &InMemoryUserPersistence::new_locked(),
                &PlainTextSessions,
            )
            .await;

            let Ok(Json(session_info)) = response else {
                panic!("sign-in should have succeeded");
            };
            assert_eq!("signed.session.token", session_info.token);
            assert_eq!(expires_at, session_info.expires_at);
            assert_eq!(lola().id, session_info.user.id);

            let locked_auth_service = auth_service.lock().expect("mock auth service mutex poisoned");
            assert_that!(locked_auth_service.sign_in_result.calls()).is_equal_to(
                [Credentials {
                    email: "lola@mail.com".to_owned(),
                    password: "password123".to_owned(),
                }]
                .as_slice(),
            );
        }

        #[tokio::test]
        async fn bad_credentials_are_unauthorized() {
            let mut auth_service_raw = MockAuthService::new();
            auth_service_raw
                .sign_in_result
                .set_returned_result(Err(AuthError::InvalidCredentials));
            let auth_service = Mutex::new(auth_service_raw);
            let mut ext_cxn = FakeExternalConnectivity::new();

            let response = sign_in(
                sign_in_data("lola@mail.com", "wrong"),
                &mut ext_cxn,
                &auth_service,
                &InMemoryAccounts::new(&[]),
                &InMemoryUserPersistence::new_locked(),
                &PlainTextSessions,
            )
            .await;

            let (status, body): (StatusCode, ErrorBody) = status_and_body(response).await;
            assert_eq!(StatusCode::UNAUTHORIZED, status);
            assert_eq!("unauthorized", body.error_code);
        }

        #[tokio::test]
        async fn malformed_email_is_invalid_input() {
            let auth_service = Mutex::new(MockAuthService::new());
            let mut ext_cxn = FakeExternalConnectivity::new();

            let response = sign_in(
                sign_in_data("not-an-email", "password123"),
                &mut ext_cxn,
                &auth_service,
                &InMemoryAccounts::new(&[]),
                &InMemoryUserPersistence::new_locked(),
                &PlainTextSessions,
            )
            .await;

            let (status, body): (StatusCode, ErrorBody) = status_and_body(response).await;
            assert_eq!(StatusCode::BAD_REQUEST, status);
            assert_eq!("invalid_input", body.error_code);

            let locked_auth_service = auth_service.lock().expect("mock auth service mutex poisoned");
            assert!(locked_auth_service.sign_in_result.calls().is_empty());
        }

        #[tokio::test]
        async fn port_failure_is_internal_error() {
            let mut auth_service_raw = MockAuthService::new();
            auth_service_raw
                .sign_in_result
                .set_returned_result(Err(AuthError::PortError(anyhow!("auth service down"))));
            let auth_service = Mutex::new(auth_service_raw);
            let mut ext_cxn = FakeExternalConnectivity::new();

            let response = sign_in(
                sign_in_data("lola@mail.com", "password123"),
                &mut ext_cxn,
                &auth_service,
                &InMemoryAccounts::new(&[]),
                &InMemoryUserPersistence::new_locked(),
                &PlainTextSessions,
            )
            .await;

            let (status, body): (StatusCode, ErrorBody) = status_and_body(response).await;
            assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, status);
            assert_eq!("internal_error", body.error_code);
        }
    }

    mod authenticate_request {
        use super::*;

        #[test]
        fn accepts_bearer_token() {
            let user = lola();
            let headers = headers_with_authorization(&format!("Bearer {}", user.id));

            let authenticated = authenticate_request(
                &headers,
                &domain::auth::AuthService {},
                &PlainTextSessions,
            );
            assert_that!(authenticated.ok().map(|user| user.id)).is_equal_to(Some(user.id));
        }

        #[test]
        fn scheme_is_case_insensitive() {
            let headers = headers_with_authorization("bearer abc.def");
            assert_that!(bearer_token(&headers).ok()).is_equal_to(Some("abc.def"));
        }

        #[tokio::test]
        async fn missing_header_is_unauthorized() {
            let result = authenticate_request(
                &HeaderMap::new(),
                &domain::auth::AuthService {},
                &PlainTextSessions,
            );

            let (status, body): (StatusCode, ErrorBody) = status_and_body(result.map(|_| ())).await;
            assert_eq!(StatusCode::UNAUTHORIZED, status);
            assert_eq!("unauthorized", body.error_code);
        }

        #[tokio::test]
        async fn other_schemes_are_unauthorized() {
            let headers = headers_with_authorization("Basic bG9sYTpwYXNz");
            let result = authenticate_request(&headers, &domain::auth::AuthService {}, &PlainTextSessions);

            let (status, _): (StatusCode, ErrorBody) = status_and_body(result.map(|_| ())).await;
            assert_eq!(StatusCode::UNAUTHORIZED, status);
        }

        #[tokio::test]
        async fn expired_session_is_unauthorized() {
            let mut auth_service_raw = MockAuthService::new();
            auth_service_raw
                .authenticate_result
                .set_returned_result(Err(AuthError::InvalidSession(SessionRejection::Expired)));
            let auth_service = Mutex::new(auth_service_raw);
            let headers = headers_with_authorization("Bearer stale.token");

            let result = authenticate_request(&headers, &auth_service, &PlainTextSessions);

            let (status, _): (StatusCode, ErrorBody) = status_and_body(result.map(|_| ())).await;
            assert_eq!(StatusCode::UNAUTHORIZED, status);
            let locked_auth_service = auth_service.lock().expect("mock auth service mutex poisoned");
            assert_that!(locked_auth_service.authenticate_result.calls())
                .is_equal_to(["stale.token".to_owned()].as_slice());
        }
    }

    mod current_user_extractor {
        use super::*;
        use crate::persistence::ConfiguredCredentialVerifier;
        use crate::persistence::db_user_driven_ports::DbCredentialVerifier;
        use crate::session::SessionKeys;
        use axum::body::Body;
        use axum::http::Request;
        use sqlx::PgPool;
        use tower::ServiceExt;

        fn whoami_app() -> (Router, SessionKeys) {
            let sessions = SessionKeys::new(b"extractor-test-secret", chrono::Duration::hours(1));
            // Never connects; the extractor only needs the session keys
            let pool = PgPool::connect_lazy("postgres://unused@localhost/unused")
                .expect("lazy pool should build");
            let shared_data = SharedData {
                ext_cxn: persistence::ExternalConnectivity::new(pool).expect("HTTP client should build"),
                sessions: sessions.clone(),
                credential_verifier: ConfiguredCredentialVerifier::Database(DbCredentialVerifier),
            };
            let app = Router::new()
                .route(
                    "/whoami",
                    get(|CurrentUser(user): CurrentUser| async move { user.email }),
                )
                .with_state(Arc::new(shared_data));

            (app, sessions)
        }

        #[tokio::test]
        async fn missing_header_is_rejected_with_401() {
            let (app, _) = whoami_app();

            let response = app
                .oneshot(Request::get("/whoami").body(Body::empty()).expect("request should build"))
                .await
                .expect("router should respond");

            let (status, body): (StatusCode, ErrorBody) = status_and_body(response).await;
            assert_eq!(StatusCode::UNAUTHORIZED, status);
            assert_eq!("unauthorized", body.error_code);
        }

        #[tokio::test]
        async fn valid_token_reaches_the_handler() {
            let (app, sessions) = whoami_app();
            let (token, _) = sessions.issue(&lola(), Utc::now()).expect("issuing should succeed");

            let response = app
                .oneshot(
                    Request::get("/whoami")
                        .header(AUTHORIZATION, format!("Bearer {token}"))
                        .body(Body::empty())
                        .expect("request should build"),
                )
                .await
                .expect("router should respond");

            assert_eq!(StatusCode::OK, response.status());
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("body should be readable");
            assert_eq!(b"lola@mail.com".as_slice(), bytes.as_ref());
        }
    }

    mod current_session {
        use super::*;

        #[tokio::test]
        async fn returns_stored_user() {
            let mut auth_service_raw = MockAuthService::new();
            auth_service_raw.current_user_result.set_returned_result(Ok(lola()));
            let auth_service = Mutex::new(auth_service_raw);
            let mut ext_cxn = FakeExternalConnectivity::new();

            let response = current_session(
                lola().id,
                &mut ext_cxn,
                &auth_service,
                &InMemoryUserPersistence::new_locked(),
            )
            .await;

            let Ok(Json(session_user)) = response else {
                panic!("session lookup should have succeeded");
            };
            assert_eq!("lola@mail.com", session_user.email);
        }

        #[tokio::test]
        async fn vanished_user_is_unauthorized() {
            let mut auth_service_raw = MockAuthService::new();
            auth_service_raw
                .current_user_result
                .set_returned_result(Err(AuthError::InvalidSession(SessionRejection::Invalid(
                    "gone".to_owned(),
                ))));
            let auth_service = Mutex::new(auth_service_raw);
            let mut ext_cxn = FakeExternalConnectivity::new();

            let response = current_session(
                lola().id,
                &mut ext_cxn,
                &auth_service,
                &InMemoryUserPersistence::new_locked(),
            )
            .await;

            let (status, body): (StatusCode, ErrorBody) = status_and_body(response).await;
            assert_eq!(StatusCode::UNAUTHORIZED, status);
            assert_eq!("unauthorized", body.error_code);
        }
    }
}
