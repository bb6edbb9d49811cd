// src/middleware/actor.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

// Cabeçalho com o usuário que está agindo. Não autentica nada:
// o valor só alimenta as checagens de permissão dos serviços.
pub const ACTOR_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub Option<Uuid>);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(ACTOR_HEADER) else {
            // Sem cabeçalho = anônimo
            return Ok(Actor(None));
        };

        let raw = value.to_str().map_err(|_| AppError::InvalidActorHeader)?;
        let user_id = Uuid::parse_str(raw.trim()).map_err(|_| AppError::InvalidActorHeader)?;
        Ok(Actor(Some(user_id)))
    }
}
