use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Erros "esperados" (não encontrado, sem permissão) NÃO passam por aqui nos serviços:
// eles voltam como Option / bool. Este enum cobre o que sobe até a borda HTTP.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Ingresso não encontrado")]
    TicketNotFound,

    #[error("Evento não encontrado")]
    EventNotFound,

    #[error("Participante não encontrado")]
    AttendeeNotFound,

    #[error("Campo desconhecido: '{0}'")]
    UnknownField(String),

    #[error("O campo '{0}' só pode ser alterado pelo motor de vendas")]
    ProtectedField(String),

    #[error("Valor inválido para o campo '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("Operador de custo inválido: '{0}'")]
    InvalidCostOperator(String),

    #[error("Valor inválido armazenado no banco: {0}")]
    InvalidStoredValue(String),

    #[error("Estoque insuficiente (disponível: {available})")]
    InsufficientStock { available: i64 },

    #[error("Permissão negada")]
    PermissionDenied,

    #[error("Cabeçalho x-user-id inválido")]
    InvalidActorHeader,

    #[error("Código de segurança já existe")]
    DuplicateSecurityCode,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de serialização: {0}")]
    SerializationError(#[from] serde_json::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::TicketNotFound | AppError::EventNotFound | AppError::AttendeeNotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::UnknownField(_)
            | AppError::ProtectedField(_)
            | AppError::InvalidFieldValue { .. }
            | AppError::InvalidCostOperator(_)
            | AppError::InvalidActorHeader => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InsufficientStock { .. } | AppError::DuplicateSecurityCode => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::PermissionDenied => (StatusCode::FORBIDDEN, self.to_string()),

            // Todo o resto (banco, serialização, interno) vira 500.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
