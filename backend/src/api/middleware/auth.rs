//! Bearer-token authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::api::SharedState;
use crate::error::AppError;
use crate::services::auth_service::AuthService;

/// Authenticated caller identity, inserted as a request extension for
/// downstream handlers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Middleware that requires a valid `Authorization: Bearer <jwt>` header.
pub async fn require_auth(
    State(state): State<SharedState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => {
            return AppError::Unauthorized("Missing bearer token".to_string()).into_response()
        }
    };

    let service = AuthService::new(state.db.clone(), &state.config);
    let claims = match service.verify_token(&token) {
        Ok(claims) => claims,
        Err(_) => {
            return AppError::Unauthorized("Invalid or expired token".to_string()).into_response()
        }
    };

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        email: claims.email,
    });

    next.run(request).await
}

fn bearer_token(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_auth(value: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/v1/analyses");
        if let Some(v) = value {
            builder = builder.header("authorization", v);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extracts_bearer_token() {
        let req = request_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_missing_header_is_none() {
        assert!(bearer_token(&request_with_auth(None)).is_none());
    }

    #[test]
    fn test_non_bearer_scheme_is_none() {
        assert!(bearer_token(&request_with_auth(Some("Basic dXNlcg=="))).is_none());
    }

    #[test]
    fn test_empty_bearer_is_none() {
        assert!(bearer_token(&request_with_auth(Some("Bearer "))).is_none());
    }
}
