// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "audit_outcome", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    /// Barrado pelo controle de acesso.
    Denied,
    /// Recusado por validação, conflito ou integridade.
    Rejected,
    /// Erro inesperado durante a operação.
    Failed,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: Uuid,
    pub actor_user_id: Option<Uuid>,
    pub action: String,
    pub target_entity: String,
    pub target_id: Option<Uuid>,
    pub outcome: AuditOutcome,
    #[schema(value_type = Object)]
    pub detail: Value,
    pub created_at: DateTime<Utc>,
}

/// Registro a ser gravado. Montado pelos serviços e pelo middleware de autorização.
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub actor_user_id: Option<Uuid>,
    pub action: String,
    pub target_entity: String,
    pub target_id: Option<Uuid>,
    pub outcome: AuditOutcome,
    pub detail: Value,
}

impl NewAuditRecord {
    pub fn new(actor_user_id: Option<Uuid>, action: &str, target_entity: &str) -> Self {
        Self {
            actor_user_id,
            action: action.to_string(),
            target_entity: target_entity.to_string(),
            target_id: None,
            outcome: AuditOutcome::Success,
            detail: Value::Object(Default::default()),
        }
    }

    pub fn target(mut self, target_id: Option<Uuid>) -> Self {
        self.target_id = target_id;
        self
    }

    pub fn outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }
}

// GET /api/audit
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AuditQuery {
    pub actor: Option<Uuid>,
    pub action: Option<String>,
    pub target_entity: Option<String>,
    pub outcome: Option<AuditOutcome>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}
