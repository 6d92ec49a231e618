// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_constraint_error, error::AppError},
    models::{
        auth::{User, UserRole},
        users::UserFilters,
    },
};

const USER_COLUMNS: &str =
    "id, nome, email, password_hash, role, base_id, equipe_id, ativo, created_at, updated_at";

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu e-mail (sem diferenciar maiúsculas)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.find_by_id_in(&self.pool, id).await
    }

    pub async fn find_by_id_in<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maybe_user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(maybe_user)
    }

    // Cria um novo usuário. E-mail duplicado vira EmailAlreadyExists.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        nome: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
        base_id: Option<Uuid>,
        equipe_id: Option<Uuid>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (nome, email, password_hash, role, base_id, equipe_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(nome.trim())
        .bind(email.trim())
        .bind(password_hash)
        .bind(role)
        .bind(base_id)
        .bind(equipe_id)
        .fetch_one(executor)
        .await
        .map_err(map_constraint_error)
    }

    pub async fn list<'e, E>(&self, executor: E, filters: &UserFilters) -> Result<Vec<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM users u WHERE TRUE", USER_COLUMNS));

        if let Some(base_id) = filters.base_id {
            qb.push(" AND u.base_id = ").push_bind(base_id);
        }
        if let Some(equipe_id) = filters.equipe_id {
            qb.push(" AND u.equipe_id = ").push_bind(equipe_id);
        }
        if let Some(role) = filters.role {
            qb.push(" AND u.role = ").push_bind(role);
        }
        if let Some(ativo) = filters.ativo {
            qb.push(" AND u.ativo = ").push_bind(ativo);
        }
        qb.push(" ORDER BY u.nome ASC, u.id ASC");

        let users = qb.build_query_as::<User>().fetch_all(executor).await?;
        Ok(users)
    }

    /// Atualização completa (os valores finais já vêm resolvidos pelo serviço).
    #[allow(clippy::too_many_arguments)]
    pub async fn update_user<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        nome: &str,
        email: &str,
        role: UserRole,
        base_id: Option<Uuid>,
        equipe_id: Option<Uuid>,
        ativo: bool,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET nome = $2, email = $3, role = $4, base_id = $5, equipe_id = $6, ativo = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(nome.trim())
        .bind(email.trim())
        .bind(role)
        .bind(base_id)
        .bind(equipe_id)
        .bind(ativo)
        .fetch_optional(executor)
        .await
        .map_err(map_constraint_error)
    }

    pub async fn update_password<'e, E>(&self, executor: E, id: Uuid, password_hash: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Exclusão lógica: a linha fica para preservar autoria de lançamentos e auditoria.
    pub async fn deactivate<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET ativo = FALSE, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(user)
    }

    pub async fn any_admin(&self) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE role = 'geral' AND ativo)")
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
