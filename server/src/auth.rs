//! Bearer-token authentication.
//!
//! Tokens come from the `[auth.tokens]` config table and map to the actor
//! every audited action is attributed to.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use reclaim_core::types::{Actor, AuthConfig};
use std::collections::HashMap;

/// Authenticated request extension.
#[derive(Clone, Debug)]
pub struct AuthenticatedActor(pub Actor);

#[derive(Debug, Default)]
pub struct TokenTable {
    tokens: HashMap<String, Actor>,
}

impl TokenTable {
    pub fn from_config(auth: &AuthConfig) -> Self {
        let mut tokens = HashMap::new();
        for (token, actor) in &auth.tokens {
            match Actor::try_new(actor.as_str()) {
                Ok(actor) if !token.trim().is_empty() => {
                    tokens.insert(token.clone(), actor);
                }
                _ => tracing::warn!(actor = %actor, "ignoring invalid auth token entry"),
            }
        }
        Self { tokens }
    }

    pub fn resolve(&self, token: &str) -> Option<&Actor> {
        self.tokens.get(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Rejects requests without a known bearer token and attaches the caller's
/// [`AuthenticatedActor`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&req)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
    let actor = state
        .tokens
        .resolve(token)
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("unknown token".to_string()))?;

    tracing::debug!(actor = %actor, path = %req.uri().path(), "authenticated request");
    req.extensions_mut().insert(AuthenticatedActor(actor));
    Ok(next.run(req).await)
}
