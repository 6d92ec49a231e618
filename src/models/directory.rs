// src/models/directory.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// =============================================================================
//  BASES
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Base {
    pub id: Uuid,
    pub nome: String,
    pub localizacao: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBasePayload {
    #[validate(length(min = 2, max = 120, message = "O nome deve ter entre 2 e 120 caracteres."))]
    #[schema(example = "Base Teste API")]
    pub nome: String,

    #[validate(length(max = 200, message = "A localização deve ter no máximo 200 caracteres."))]
    #[schema(example = "Aeroporto de Goiânia (SBGO)")]
    pub localizacao: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBasePayload {
    #[validate(length(min = 2, max = 120, message = "O nome deve ter entre 2 e 120 caracteres."))]
    pub nome: Option<String>,

    #[validate(length(max = 200, message = "A localização deve ter no máximo 200 caracteres."))]
    pub localizacao: Option<String>,
}

// =============================================================================
//  EQUIPES
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Equipe {
    pub id: Uuid,
    pub nome: String,
    pub base_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEquipePayload {
    #[validate(length(min = 1, max = 120, message = "O nome deve ter entre 1 e 120 caracteres."))]
    #[schema(example = "Equipe Teste API")]
    pub nome: String,
    #[serde(alias = "base_id")]
    pub base_id: Uuid,
}

// A base de uma equipe não muda: os colaboradores dependem do par (equipe, base).
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEquipePayload {
    #[validate(length(min = 1, max = 120, message = "O nome deve ter entre 1 e 120 caracteres."))]
    pub nome: String,
}

// Aceita `base_id` e `baseId` na query string
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EquipeFilters {
    #[serde(alias = "baseId")]
    pub base_id: Option<Uuid>,
}

// =============================================================================
//  COLABORADORES
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Colaborador {
    pub id: Uuid,
    pub nome: String,
    pub email: Option<String>,
    pub base_id: Uuid,
    pub equipe_id: Uuid,
    /// Função operacional (ex: "BA-CE", "BA-LR"), sem relação com o perfil de acesso.
    pub funcao: Option<String>,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateColaboradorPayload {
    #[validate(length(min = 2, max = 120, message = "O nome deve ter entre 2 e 120 caracteres."))]
    #[schema(example = "Colaborador Teste API")]
    pub nome: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,

    #[serde(alias = "base_id")]
    pub base_id: Uuid,
    #[serde(alias = "equipe_id")]
    pub equipe_id: Uuid,

    #[validate(length(max = 60, message = "A função deve ter no máximo 60 caracteres."))]
    pub funcao: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BatchCreateColaboradoresPayload {
    #[validate(length(min = 1, max = 500, message = "Envie entre 1 e 500 colaboradores."), nested)]
    pub colaboradores: Vec<CreateColaboradorPayload>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateColaboradorPayload {
    #[validate(length(min = 2, max = 120, message = "O nome deve ter entre 2 e 120 caracteres."))]
    pub nome: Option<String>,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,

    #[serde(alias = "base_id")]
    pub base_id: Option<Uuid>,
    #[serde(alias = "equipe_id")]
    pub equipe_id: Option<Uuid>,

    #[validate(length(max = 60, message = "A função deve ter no máximo 60 caracteres."))]
    pub funcao: Option<String>,

    pub ativo: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BatchDeletePayload {
    #[validate(length(min = 1, max = 500, message = "Envie entre 1 e 500 ids."))]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ColaboradorFilters {
    #[serde(alias = "baseId")]
    pub base_id: Option<Uuid>,
    #[serde(alias = "equipeId")]
    pub equipe_id: Option<Uuid>,
    pub ativo: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResult {
    pub count: usize,
    pub ids: Vec<Uuid>,
}
