use axum::body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// The parts of an error body handler tests care about
#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    pub error_code: String,
}

/// Reads the whole response body and deserializes it, failing the test if either step fails
pub async fn deserialize_body<T: DeserializeOwned>(response_body: body::Body) -> T {
    let bytes = body::to_bytes(response_body, usize::MAX)
        .await
        .expect("response body should be readable");

    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        panic!("response body did not match the expected shape: {err}, body was {bytes:?}")
    })
}

/// Renders a handler result and returns its status plus the deserialized body
pub async fn status_and_body<T, R>(handler_result: R) -> (StatusCode, T)
where
    T: DeserializeOwned,
    R: IntoResponse,
{
    let response: Response = handler_result.into_response();
    let status = response.status();

    (status, deserialize_body(response.into_body()).await)
}
