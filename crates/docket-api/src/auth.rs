use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use docket_db::Database;
use docket_db::queries::unique_violation;
use docket_db::models::UserRow;
use docket_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use docket_types::models::{Role, User};

use crate::error::AccessError;
use crate::extract::JsonBody;
use crate::repository::{now, user_from_row};
use crate::{run_blocking, validate};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, AccessError> {
    validate::registration(&req)?;

    // Hashing and the store round-trips both block
    let response = run_blocking(&state, move |state| {
        if state.db.get_user_by_username(&req.username)?.is_some() {
            return Err(AccessError::Conflict("username"));
        }
        if state.db.get_user_by_email(&req.email)?.is_some() {
            return Err(AccessError::Conflict("email"));
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
            .to_string();

        let row = UserRow {
            id: Uuid::new_v4().to_string(),
            username: req.username,
            email: req.email,
            password: password_hash,
            role: Role::User.as_str().to_string(),
            created_at: now(),
        };
        insert_new_user(&state.db, &row)?;
        info!("Registered user {} ({})", row.username, row.id);

        let user = user_from_row(row)?;
        let token = create_token(&state.jwt_secret, &user, state.token_ttl)?;
        Ok(AuthResponse { token, user })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AccessError> {
    let response = run_blocking(&state, move |state| {
        let row = state
            .db
            .get_user_by_identifier(&req.identifier)?
            .ok_or(AccessError::Unauthorized)?;

        let parsed_hash = PasswordHash::new(&row.password)
            .map_err(|e| anyhow::anyhow!("Corrupt password hash for user '{}': {}", row.id, e))?;

        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| {
                warn!("Failed login for {}", row.username);
                AccessError::Unauthorized
            })?;

        let user = user_from_row(row)?;
        let token = create_token(&state.jwt_secret, &user, state.token_ttl)?;
        Ok(AuthResponse { token, user })
    })
    .await?;

    Ok(Json(response))
}

/// A concurrent registration can slip past the lookups in `register`; the
/// UNIQUE constraints catch it here.
fn insert_new_user(db: &Database, row: &UserRow) -> Result<(), AccessError> {
    db.insert_user(row).map_err(|e| match unique_violation(&e) {
        Some(field) => AccessError::Conflict(field),
        None => AccessError::Store(e),
    })
}

pub fn create_token(secret: &str, user: &User, ttl: chrono::Duration) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
