use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;

/// JWT payload issued by the user service. `sub` carries the user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub is_barber: bool,
    pub exp: i64,
}

/// The authenticated party, resolved once at the transport boundary and
/// handed down explicitly. Handlers and the booking service never look
/// identity up ambiently.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub is_barber: bool,
}

impl Caller {
    /// Callers act on their own data; barbers act on behalf of anyone.
    pub fn can_act_for(&self, user_id: &str) -> bool {
        self.is_barber || self.user_id == user_id
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or(AppError::Unauthorized)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Caller, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    if data.claims.sub.is_empty() {
        return Err(AppError::Unauthorized);
    }

    Ok(Caller {
        user_id: data.claims.sub,
        is_barber: data.claims.is_barber,
    })
}

/// axum middleware: verifies the bearer token and stores the resulting
/// [`Caller`] as a request extension for the handlers.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let caller = verify_token(token, &state.config.jwt_secret)?;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
