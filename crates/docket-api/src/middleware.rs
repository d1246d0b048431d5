use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::warn;

use docket_types::api::Claims;

use crate::auth::AppState;
use crate::error::AccessError;
use crate::permission::Principal;

/// Credential verifier: token in, principal out. No shared state.
pub fn verify_token(token: &str, secret: &str) -> Result<Principal, AccessError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        AccessError::Unauthorized
    })?;

    Ok(Principal::new(token_data.claims.sub, token_data.claims.role))
}

/// Extract and validate the bearer token, then stash the `Principal` in the
/// request extensions for the handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AccessError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(AccessError::Unauthorized)?;

    let principal = verify_token(token, &state.jwt_secret)?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::create_token;
    use docket_types::models::{Role, User};
    use uuid::Uuid;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            role,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn issued_token_yields_principal() {
        let user = user(Role::Admin);
        let token = create_token("secret", &user, chrono::Duration::hours(1)).unwrap();
        let principal = verify_token(&token, "secret").unwrap();
        assert_eq!(principal, Principal::new(user.id, Role::Admin));
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = create_token("secret", &user(Role::User), chrono::Duration::hours(1)).unwrap();
        assert!(matches!(
            verify_token(&token, "other"),
            Err(AccessError::Unauthorized)
        ));
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let token = create_token("secret", &user(Role::User), chrono::Duration::hours(-2)).unwrap();
        assert!(matches!(
            verify_token(&token, "secret"),
            Err(AccessError::Unauthorized)
        ));
    }

    #[test]
    fn garbage_is_unauthorized() {
        assert!(matches!(
            verify_token("not.a.jwt", "secret"),
            Err(AccessError::Unauthorized)
        ));
    }
}
