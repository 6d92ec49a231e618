// src/common/db_utils.rs

use sqlx::{Postgres, Transaction};

use crate::common::error::AppError;
use crate::config::AppState;
use crate::models::auth::User;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Abre uma transação e define as variáveis lidas pelas políticas RLS.
/// Os valores valem só dentro da transação (`set_config(..., true)`),
/// então a conexão volta limpa para a pool no commit ou rollback.
pub(crate) async fn begin_rls_transaction(
    app_state: &AppState,
    user: &User,
) -> Result<Transaction<'static, Postgres>, AppError> {
    // 1. Inicia Transação
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let mut tx = app_state.db_pool.begin().await?;

    // 2. Define identidade, escopo e limite de tempo de uma vez
    sqlx::query(
        r#"
        SELECT
            set_config('app.user_id', $1, true),
            set_config('app.role', $2, true),
            set_config('app.base_id', $3, true),
            set_config('app.equipe_id', $4, true),
            set_config('statement_timeout', $5, true)
        "#,
    )
    .bind(user.id.to_string())
    .bind(user.role.as_str())
    .bind(user.base_id.map(|id| id.to_string()).unwrap_or_default())
    .bind(user.equipe_id.map(|id| id.to_string()).unwrap_or_default())
    .bind(app_state.config.statement_timeout_ms().to_string())
    .execute(&mut *tx)
    .await?;

    // 3. Rebaixa para o papel sujeito às políticas RLS
    sqlx::query("SET LOCAL ROLE indicadores_scoped")
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

/// Transação sem usuário (login, bootstrap). As políticas RLS não se aplicam às tabelas usadas.
pub(crate) async fn begin_system_transaction(
    app_state: &AppState,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = app_state.db_pool.begin().await?;

    sqlx::query("SELECT set_config('statement_timeout', $1, true)")
        .bind(app_state.config.statement_timeout_ms().to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

// ---
// Tradução de violações de constraint para erros de domínio
// ---
/// Converte erros de constraint do Postgres nos erros de domínio equivalentes.
/// Demais erros seguem como `DatabaseError`.
pub(crate) fn map_constraint_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        let constraint = db_err.constraint().unwrap_or_default().to_string();

        if db_err.is_unique_violation() {
            return match constraint.as_str() {
                "users_email_key" => AppError::EmailAlreadyExists,
                _ => AppError::UniqueConstraintViolation(constraint),
            };
        }
        if db_err.is_foreign_key_violation() {
            return AppError::ReferentialIntegrity(constraint);
        }
        if db_err.is_check_violation() && constraint == "users_placement_check" {
            return AppError::field("role", "Base e equipe não conferem com o papel informado.");
        }
        // 42501 = insufficient_privilege (política RLS recusou a linha)
        if db_err.code().as_deref() == Some("42501") {
            let table = db_err.table().unwrap_or("registro").to_string();
            tracing::warn!("🛡️ RLS recusou escrita em {}", table);
            return AppError::denied(&table, None);
        }
    }
    e.into()
}
