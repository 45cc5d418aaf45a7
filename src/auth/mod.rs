//! Token verification and organization context resolution.
//!
//! Authentication (credential checks, token issuance UX) is an external
//! collaborator; this module only verifies bearer tokens and maps the
//! verified subject onto its organization. Organization ids are never
//! accepted from client input.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::entities::user::{self, Entity as UserEntity};
use crate::errors::ServiceError;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub email: Option<String>,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// Resolved request identity: the authenticated user and the single
/// organization every lookup is scoped to.
#[derive(Debug, Clone)]
pub struct OrgContext {
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(jwt_secret: String, db: Arc<DatabaseConnection>) -> Self {
        Self { jwt_secret, db }
    }

    /// Decodes and validates a raw bearer token.
    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("token expired".into())
            }
            _ => ServiceError::Unauthorized("invalid token".into()),
        })
    }

    /// Issues a short-lived token for the given user. Used by tests and the
    /// operator CLI; production tokens come from the external identity
    /// provider sharing the same secret.
    pub fn issue_token(&self, user_id: Uuid, email: Option<String>) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email,
            iat: now.timestamp(),
            exp: (now + ChronoDuration::hours(1)).timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("token encoding failed: {}", e)))
    }

    /// Maps verified claims onto the caller's organization. A principal
    /// without a resolvable organization is an authorization failure, not
    /// a 404.
    pub async fn resolve_org(&self, claims: &Claims) -> Result<OrgContext, ServiceError> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("malformed subject claim".into()))?;

        let user = UserEntity::find_by_id(user_id)
            .filter(user::Column::Active.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Forbidden("no organization context".into()))?;

        debug!(user_id = %user.id, organization_id = %user.organization_id, "resolved organization context");

        Ok(OrgContext {
            user_id: user.id,
            organization_id: user.organization_id,
        })
    }
}

/// Extracts a bearer token from the Authorization header.
fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Extracts the stream token: `token` query parameter first, then the
/// `access_token` cookie as a fallback for browser EventSource clients
/// that cannot set headers.
pub fn stream_token(query: Option<&str>, cookie_header: Option<&str>) -> Option<String> {
    if let Some(q) = query {
        for pair in q.split('&') {
            if let Some(value) = pair.strip_prefix("token=") {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    cookie_header.and_then(|cookies| {
        cookies.split(';').find_map(|cookie| {
            cookie
                .trim()
                .strip_prefix("access_token=")
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
    })
}

/// Axum middleware authenticating the request and injecting [`OrgContext`].
pub async fn require_org_context(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = bearer_token(&request)
        .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".into()))?;

    let claims = auth.verify_token(&token)?;
    let ctx = auth.resolve_org(&claims).await?;

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DatabaseConnection;

    fn service() -> AuthService {
        AuthService::new(
            "test_secret_key_for_testing_purposes_only_32chars".into(),
            Arc::new(DatabaseConnection::Disconnected),
        )
    }

    #[test]
    fn issued_token_verifies() {
        let auth = service();
        let user_id = Uuid::new_v4();
        let token = auth.issue_token(user_id, None).expect("issue");
        let claims = auth.verify_token(&token).expect("verify");
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let auth = service();
        assert!(matches!(
            auth.verify_token("not-a-jwt"),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn stream_token_prefers_query_param() {
        let token = stream_token(Some("limit=5&token=abc"), Some("access_token=def"));
        assert_eq!(token.as_deref(), Some("abc"));
    }

    #[test]
    fn stream_token_falls_back_to_cookie() {
        let token = stream_token(Some("limit=5"), Some("theme=dark; access_token=def"));
        assert_eq!(token.as_deref(), Some("def"));
    }

    #[test]
    fn stream_token_absent() {
        assert!(stream_token(None, None).is_none());
        assert!(stream_token(Some("token="), Some("access_token=")).is_none());
    }
}
