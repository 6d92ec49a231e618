// src/common/error.rs

use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::common::i18n::{self, I18nStore};
use crate::middleware::i18n::Locale;

/// Erros de campo no formato `caminho -> mensagens`.
/// O caminho segue a notação usada pelo frontend: `conteudo.avaliados[0].tempo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Incorpora os erros de outro conjunto com um prefixo (ex: `rows[3]`).
    pub fn merge_prefixed(&mut self, prefix: &str, other: FieldErrors) {
        for (field, messages) in other.0 {
            let path = if prefix.is_empty() {
                field
            } else {
                format!("{}.{}", prefix, field)
            };
            self.0.entry(path).or_default().extend(messages);
        }
    }

    /// Converte `Ok(())` quando vazio, `Err(AppError::ValidationError)` caso contrário.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(self))
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        flatten_validation_errors(&mut out, "", &errors);
        out
    }
}

fn flatten_validation_errors(out: &mut FieldErrors, prefix: &str, errors: &ValidationErrors) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for e in field_errors {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    out.add(path.clone(), message);
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten_validation_errors(out, &path, inner),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(out, &format!("{}[{}]", path, index), inner);
                }
            }
        }
    }
}

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(FieldErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Conta desativada")]
    AccountInactive,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Token expirado")]
    ExpiredToken,

    #[error("Acesso negado a {resource}")]
    AccessDenied {
        resource: String,
        target_id: Option<Uuid>,
    },

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Integridade referencial: {0}")]
    ReferentialIntegrity(String),

    #[error("Conflito de edição: {0}")]
    Conflict(String),

    #[error("Tempo de espera esgotado: {0}")]
    Timeout(String),

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationError(errors.into())
    }
}

impl AppError {
    /// Atalho para um único erro de campo.
    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        AppError::ValidationError(errors)
    }

    pub fn denied(resource: &str, target_id: Option<Uuid>) -> Self {
        AppError::AccessDenied {
            resource: resource.to_string(),
            target_id,
        }
    }

    /// Classificação usada pela trilha de auditoria quando uma operação é recusada.
    pub fn audit_outcome(&self) -> crate::models::audit::AuditOutcome {
        use crate::models::audit::AuditOutcome;
        match self {
            AppError::AccessDenied { .. } => AuditOutcome::Denied,
            AppError::ValidationError(_)
            | AppError::EmailAlreadyExists
            | AppError::UniqueConstraintViolation(_)
            | AppError::ResourceNotFound(_)
            | AppError::UserNotFound
            | AppError::ReferentialIntegrity(_)
            | AppError::Conflict(_)
            | AppError::InvalidCredentials
            | AppError::AccountInactive => AuditOutcome::Rejected,
            _ => AuditOutcome::Failed,
        }
    }

    fn is_timeout(&self) -> bool {
        match self {
            AppError::Timeout(_) => true,
            AppError::DatabaseError(sqlx::Error::PoolTimedOut) => true,
            // 57014 = query_canceled (statement_timeout)
            AppError::DatabaseError(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some("57014")
            }
            _ => false,
        }
    }

    /// Traduz o erro de domínio para a resposta HTTP no idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let t = |key: &str| store.translate(lang, key).to_string();

        if self.is_timeout() {
            tracing::warn!("⏱️ Operação excedeu o tempo limite: {}", self);
            return ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "TIMEOUT", t("timeout"));
        }

        match self {
            AppError::ValidationError(errors) => {
                let details: BTreeMap<String, Vec<String>> = errors.0;
                ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", t("validation"))
                    .with_details(json!(details))
            }
            AppError::EmailAlreadyExists => {
                ApiError::new(StatusCode::CONFLICT, "EMAIL_ALREADY_EXISTS", t("email_exists"))
            }
            AppError::UniqueConstraintViolation(what) => {
                ApiError::new(StatusCode::CONFLICT, "UNIQUE_VIOLATION", t("unique_violation"))
                    .with_details(json!({ "constraint": what }))
            }
            AppError::InvalidCredentials => {
                ApiError::new(StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", t("invalid_credentials"))
            }
            AppError::AccountInactive => {
                ApiError::new(StatusCode::FORBIDDEN, "ACCOUNT_INACTIVE", t("account_inactive"))
            }
            AppError::InvalidToken => {
                ApiError::new(StatusCode::UNAUTHORIZED, "INVALID_TOKEN", t("invalid_token"))
            }
            AppError::ExpiredToken => {
                ApiError::new(StatusCode::UNAUTHORIZED, "EXPIRED_TOKEN", t("expired_token"))
            }
            // Nada além do recurso é devolvido: nenhum dado parcial vaza na negação
            AppError::AccessDenied { resource, .. } => {
                ApiError::new(StatusCode::FORBIDDEN, "ACCESS_DENIED", t("access_denied"))
                    .with_details(json!({ "resource": resource }))
            }
            AppError::UserNotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", t("user_not_found"))
            }
            AppError::ResourceNotFound(what) => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", t("not_found"))
                    .with_details(json!({ "resource": what }))
            }
            AppError::ReferentialIntegrity(reason) => {
                ApiError::new(StatusCode::CONFLICT, "REFERENTIAL_INTEGRITY", t("referential_integrity"))
                    .with_details(json!({ "reason": reason }))
            }
            AppError::Conflict(reason) => {
                ApiError::new(StatusCode::CONFLICT, "CONFLICT", t("conflict"))
                    .with_details(json!({ "reason": reason }))
            }

            // Todos os outros erros (DatabaseError, InternalServerError...) viram 500.
            // O detalhe fica só no log.
            ref e => {
                tracing::error!("🔥 Erro Interno do Servidor: {}", e);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", t("internal"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::global())
            .into_response()
    }
}

// ---
// ApiError: o que efetivamente vai para o cliente
// ---
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, error: impl Into<String>) -> Self {
        Self {
            status,
            code,
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.error,
            "code": self.code,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }

        let mut response = (self.status, Json(body)).into_response();
        if self.status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

// Corpo JSON malformado também é erro de validação, com corpo estruturado
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            i18n::fallback_message("validation"),
        )
        .with_details(json!({ "body": [rejection.body_text()] }))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            i18n::fallback_message("validation"),
        )
        .with_details(json!({ "query": [rejection.body_text()] }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Debug, Validate)]
    struct Inner {
        #[validate(length(min = 1, message = "Nome é obrigatório"))]
        nome: String,
    }

    #[derive(Debug, Validate)]
    struct Outer {
        #[validate(email(message = "E-mail inválido"))]
        email: String,
        #[validate(nested)]
        itens: Vec<Inner>,
    }

    #[test]
    fn flattens_nested_list_errors_into_paths() {
        let payload = Outer {
            email: "invalid-email-format".into(),
            itens: vec![
                Inner { nome: "ok".into() },
                Inner { nome: "".into() },
            ],
        };

        let errors: FieldErrors = payload.validate().unwrap_err().into();

        assert_eq!(errors.0.get("email"), Some(&vec!["E-mail inválido".to_string()]));
        assert_eq!(
            errors.0.get("itens[1].nome"),
            Some(&vec!["Nome é obrigatório".to_string()])
        );
        assert!(!errors.contains("itens[0].nome"));
    }

    #[test]
    fn merge_prefixed_builds_row_paths() {
        let mut row = FieldErrors::new();
        row.add("email", "E-mail inválido");

        let mut all = FieldErrors::new();
        all.merge_prefixed("colaboradores[2]", row);

        assert!(all.contains("colaboradores[2].email"));
    }

    #[test]
    fn access_denied_maps_to_403_without_target_details() {
        let store = I18nStore::new();
        let api = AppError::denied("colaboradores", Some(Uuid::new_v4()))
            .to_api_error(&Locale("pt".into()), &store);

        assert_eq!(api.status, StatusCode::FORBIDDEN);
        assert_eq!(api.code, "ACCESS_DENIED");
        assert_eq!(api.error, "Acesso negado");
        assert_eq!(api.details, Some(json!({ "resource": "colaboradores" })));
    }

    #[test]
    fn pool_timeout_maps_to_503() {
        let store = I18nStore::new();
        let api = AppError::DatabaseError(sqlx::Error::PoolTimedOut)
            .to_api_error(&Locale("en".into()), &store);

        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api.code, "TIMEOUT");
        let response = api.into_response();
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "1");
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let store = I18nStore::new();
        let api = AppError::InternalServerError(anyhow::anyhow!("senha do banco: hunter2"))
            .to_api_error(&Locale("pt".into()), &store);

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("hunter2"));
        assert!(api.details.is_none());
    }
}
