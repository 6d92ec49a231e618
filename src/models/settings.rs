// src/models/settings.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::auth::{User, UserRole};

// =============================================================================
//  PERFIL
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    #[schema(example = "Maria Souza")]
    pub nome: String,
    #[schema(example = "maria.souza@indicadores.local")]
    pub email: String,
    pub role: UserRole,
    pub role_label: &'static str,
    pub base_id: Option<Uuid>,
    pub equipe_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            nome: user.nome,
            email: user.email,
            role: user.role,
            role_label: user.role.label(),
            base_id: user.base_id,
            equipe_id: user.equipe_id,
            updated_at: user.updated_at,
        }
    }
}

// PUT /api/user/settings/profile
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    #[validate(length(min = 2, max = 120, message = "O nome deve ter entre 2 e 120 caracteres."))]
    pub nome: Option<String>,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "maria.souza@indicadores.local")]
    pub email: Option<String>,
}

// POST /api/user/settings/change-password
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_password_confirmation", skip_on_field_errors = false))]
pub struct ChangePasswordPayload {
    #[serde(alias = "current_password")]
    #[validate(length(min = 1, message = "Informe a senha atual."))]
    pub current_password: String,

    #[serde(alias = "new_password")]
    #[validate(length(min = 8, message = "A nova senha deve ter no mínimo 8 caracteres."))]
    pub new_password: String,

    #[serde(alias = "confirm_password")]
    pub confirm_password: String,
}

fn validate_password_confirmation(payload: &ChangePasswordPayload) -> Result<(), ValidationError> {
    if payload.new_password != payload.confirm_password {
        let mut err = ValidationError::new("password_mismatch");
        err.message = Some("A confirmação não confere com a nova senha.".into());
        return Err(err);
    }
    if payload.new_password == payload.current_password {
        let mut err = ValidationError::new("password_unchanged");
        err.message = Some("A nova senha deve ser diferente da atual.".into());
        return Err(err);
    }
    Ok(())
}

// =============================================================================
//  FEEDBACK
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "feedback_tipo", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTipo {
    Bug,
    Sugestao,
    Outros,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "feedback_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Pendente,
    EmAndamento,
    Resolvido,
    Fechado,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tipo: FeedbackTipo,
    pub mensagem: String,
    pub status: FeedbackStatus,
    pub resposta_suporte: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFeedbackPayload {
    pub tipo: FeedbackTipo,

    #[validate(custom(function = "validate_mensagem"))]
    #[schema(example = "O gráfico de ocorrências não carrega no celular.")]
    pub mensagem: String,
}

// Espaços não contam para o tamanho mínimo
fn validate_mensagem(mensagem: &str) -> Result<(), ValidationError> {
    let len = mensagem.trim().chars().count();
    if len < 10 || len > 2000 {
        let mut err = ValidationError::new("length");
        err.message = Some("A mensagem deve ter entre 10 e 2000 caracteres.".into());
        return Err(err);
    }
    Ok(())
}

// PUT /api/user/settings/feedback/{id}/status (suporte)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeedbackStatusPayload {
    pub status: FeedbackStatus,

    #[serde(alias = "resposta_suporte")]
    #[validate(length(max = 2000, message = "A resposta deve ter no máximo 2000 caracteres."))]
    pub resposta_suporte: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_rejects_malformed_email() {
        let payload = UpdateProfilePayload {
            nome: None,
            email: Some("invalid-email-format".into()),
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn feedback_message_minimum_ignores_whitespace() {
        let short = CreateFeedbackPayload {
            tipo: FeedbackTipo::Bug,
            mensagem: "   curta     ".into(),
        };
        assert!(short.validate().is_err());

        let ok = CreateFeedbackPayload {
            tipo: FeedbackTipo::Sugestao,
            mensagem: "Adicionar exportação em PDF".into(),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn change_password_requires_matching_confirmation() {
        let payload = ChangePasswordPayload {
            current_password: "senha-antiga".into(),
            new_password: "senha-nova-123".into(),
            confirm_password: "senha-nova-124".into(),
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.errors().contains_key("__all__"));
    }
}
