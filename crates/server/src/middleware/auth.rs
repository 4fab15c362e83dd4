//! Authentication extractors.
//!
//! Authentication itself lives upstream: the auth service terminates
//! credentials and forwards requests with trusted `x-user-id` and
//! `x-user-role` headers. These extractors read that identity; the core
//! never re-verifies credentials.

use std::str::FromStr;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use tiffinbox_core::{UserId, UserRole};

const USER_ID_HEADER: &str = "x-user-id";
const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated identity attached to a request.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: UserId,
    pub role: UserRole,
}

/// Error returned when a request carries no usable identity.
pub enum AuthRejection {
    /// No identity headers, or headers that do not parse.
    Unauthorized,
    /// An identity was present but lacks the required role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "User authentication required"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin access required"),
        };
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

fn identity_from_parts(parts: &Parts) -> Option<CurrentUser> {
    let id = parts
        .headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()?
        .parse::<i32>()
        .ok()?;

    let role = parts
        .headers
        .get(USER_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| UserRole::from_str(value).ok())
        .unwrap_or_default();

    Some(CurrentUser {
        id: UserId::new(id),
        role,
    })
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_parts(parts).ok_or(AuthRejection::Unauthorized)
    }
}

/// Extractor that additionally requires the admin role.
///
/// # Example
///
/// ```rust,ignore
/// async fn set_capacity(
///     RequireAdmin(admin): RequireAdmin,
/// ) -> impl IntoResponse {
///     // only admins get here
/// }
/// ```
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = identity_from_parts(parts).ok_or(AuthRejection::Unauthorized)?;
        if user.role != UserRole::Admin {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_headers(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/orders");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, ()) = builder.body(()).expect("valid request").into_parts();
        parts
    }

    #[test]
    fn test_identity_parsed_from_headers() {
        let parts = parts_with_headers(&[("x-user-id", "42"), ("x-user-role", "admin")]);
        let user = identity_from_parts(&parts).expect("identity");
        assert_eq!(user.id, UserId::new(42));
        assert_eq!(user.role, UserRole::Admin);
    }

    #[test]
    fn test_role_defaults_to_customer() {
        let parts = parts_with_headers(&[("x-user-id", "7")]);
        let user = identity_from_parts(&parts).expect("identity");
        assert_eq!(user.role, UserRole::Customer);
    }

    #[test]
    fn test_missing_identity() {
        let parts = parts_with_headers(&[]);
        assert!(identity_from_parts(&parts).is_none());
    }

    #[test]
    fn test_garbage_user_id_rejected() {
        let parts = parts_with_headers(&[("x-user-id", "not-a-number")]);
        assert!(identity_from_parts(&parts).is_none());
    }
}
