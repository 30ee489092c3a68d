use crate::domain;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// DTO for the user behind a session
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(serde::Deserialize, PartialEq, Eq, Debug))]
pub struct SessionUser {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440001")]
    pub id: Uuid,
    #[schema(example = "lola@mail.com")]
    pub email: String,
    #[schema(example = "Lola")]
    pub name: String,
}

impl From<domain::user::User> for SessionUser {
    fn from(value: domain::user::User) -> Self {
        SessionUser {
            id: value.id,
            email: value.email,
            name: value.name,
        }
    }
}
