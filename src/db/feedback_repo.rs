// src/db/feedback_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_constraint_error, error::AppError},
    models::settings::{Feedback, FeedbackStatus, FeedbackTipo},
};

const FEEDBACK_COLUMNS: &str = "id, user_id, tipo, mensagem, status, resposta_suporte, created_at, updated_at";

#[derive(Clone, Default)]
pub struct FeedbackRepository;

impl FeedbackRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<'e, E>(&self, executor: E, user_id: Uuid, tipo: FeedbackTipo, mensagem: &str) -> Result<Feedback, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Feedback>(&format!(
            "INSERT INTO feedbacks (user_id, tipo, mensagem) VALUES ($1, $2, $3) RETURNING {}",
            FEEDBACK_COLUMNS
        ))
        .bind(user_id)
        .bind(tipo)
        .bind(mensagem.trim())
        .fetch_one(executor)
        .await
        .map_err(map_constraint_error)
    }

    /// Feedbacks de um autor; `None` lista todos (visão do suporte).
    pub async fn list<'e, E>(&self, executor: E, user_id: Option<Uuid>) -> Result<Vec<Feedback>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let feedbacks = sqlx::query_as::<_, Feedback>(&format!(
            "SELECT {} FROM feedbacks WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC, id DESC",
            FEEDBACK_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(feedbacks)
    }

    pub async fn find<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Feedback>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let feedback = sqlx::query_as::<_, Feedback>(&format!("SELECT {} FROM feedbacks WHERE id = $1", FEEDBACK_COLUMNS))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(feedback)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: FeedbackStatus,
        resposta_suporte: Option<&str>,
    ) -> Result<Option<Feedback>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let feedback = sqlx::query_as::<_, Feedback>(&format!(
            r#"
            UPDATE feedbacks
            SET status = $2, resposta_suporte = COALESCE($3, resposta_suporte), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            FEEDBACK_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .bind(resposta_suporte)
        .fetch_optional(executor)
        .await?;
        Ok(feedback)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM feedbacks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
