// src/models/users.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::common::error::FieldErrors;
use crate::models::auth::UserRole;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 2, max = 120, message = "O nome deve ter entre 2 e 120 caracteres."))]
    #[schema(example = "Maria Souza")]
    pub nome: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "maria.souza@indicadores.local")]
    pub email: String,

    #[validate(length(min = 8, message = "A senha deve ter no mínimo 8 caracteres."))]
    #[serde(skip_serializing)]
    pub password: String,

    pub role: UserRole,
    #[serde(alias = "base_id")]
    pub base_id: Option<Uuid>,
    #[serde(alias = "equipe_id")]
    pub equipe_id: Option<Uuid>,
}

impl CreateUserPayload {
    pub fn placement_errors(&self) -> FieldErrors {
        placement_errors(self.role, self.base_id, self.equipe_id)
    }
}

// POST /api/users/bulk
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkCreateUsersPayload {
    #[validate(length(min = 1, max = 200, message = "Envie entre 1 e 200 usuários."), nested)]
    pub users: Vec<CreateUserPayload>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(length(min = 2, max = 120, message = "O nome deve ter entre 2 e 120 caracteres."))]
    pub nome: Option<String>,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,

    #[validate(length(min = 8, message = "A senha deve ter no mínimo 8 caracteres."))]
    pub password: Option<String>,

    pub role: Option<UserRole>,
    #[serde(alias = "base_id")]
    pub base_id: Option<Uuid>,
    #[serde(alias = "equipe_id")]
    pub equipe_id: Option<Uuid>,
    pub ativo: Option<bool>,
}

// Aceita `base_id` e `baseId` na query string
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilters {
    #[serde(alias = "baseId")]
    pub base_id: Option<Uuid>,
    #[serde(alias = "equipeId")]
    pub equipe_id: Option<Uuid>,
    pub role: Option<UserRole>,
    pub ativo: Option<bool>,
}

/// Regras de lotação por papel:
/// `geral` não tem base nem equipe; `gerente_sci` tem só base; `chefe` e `auxiliar` têm ambas.
pub fn placement_errors(role: UserRole, base_id: Option<Uuid>, equipe_id: Option<Uuid>) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if role.requires_base() && base_id.is_none() {
        errors.add("baseId", "Base é obrigatória para este perfil.");
    }
    if !role.requires_base() && base_id.is_some() {
        errors.add("baseId", "Gerente Geral não pertence a uma base.");
    }
    if role.requires_equipe() && equipe_id.is_none() {
        errors.add("equipeId", "Equipe é obrigatória para este perfil.");
    }
    if !role.requires_equipe() && equipe_id.is_some() {
        errors.add("equipeId", "Este perfil não pertence a uma equipe.");
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_rules_per_role() {
        let base = Some(Uuid::new_v4());
        let equipe = Some(Uuid::new_v4());

        assert!(placement_errors(UserRole::Geral, None, None).is_empty());
        assert!(placement_errors(UserRole::Geral, base, None).contains("baseId"));

        assert!(placement_errors(UserRole::GerenteSci, base, None).is_empty());
        assert!(placement_errors(UserRole::GerenteSci, base, equipe).contains("equipeId"));

        assert!(placement_errors(UserRole::Chefe, base, equipe).is_empty());
        let errors = placement_errors(UserRole::Auxiliar, None, None);
        assert!(errors.contains("baseId"));
        assert!(errors.contains("equipeId"));
    }

    fn user(nome: &str) -> CreateUserPayload {
        CreateUserPayload {
            nome: nome.into(),
            email: format!("{}@indicadores.local", nome),
            password: "senha-segura-1".into(),
            role: UserRole::Geral,
            base_id: None,
            equipe_id: None,
        }
    }

    #[test]
    fn bulk_size_limits_are_validated() {
        let empty = BulkCreateUsersPayload { users: vec![] };
        assert!(empty.validate().is_err());

        let too_many = BulkCreateUsersPayload {
            users: (0..201).map(|i| user(&format!("usuario{}", i))).collect(),
        };
        assert!(too_many.validate().is_err());

        let ok = BulkCreateUsersPayload { users: vec![user("maria")] };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn password_never_serialized() {
        let value = serde_json::to_value(user("maria")).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["nome"], "maria");
    }
}
