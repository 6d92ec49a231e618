// src/services/user_service.rs

use std::collections::HashMap;

use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{AppError, FieldErrors},
    db::{DirectoryRepository, SessionRepository, UserRepository},
    models::{
        audit::NewAuditRecord,
        auth::User,
        directory::BatchResult,
        users::{placement_errors, BulkCreateUsersPayload, CreateUserPayload, UpdateUserPayload, UserFilters},
    },
    services::{
        access::{self, Operation, Resource},
        audit_service::AuditService,
        auth::hash_password,
    },
};

// Gestão de usuários: exclusiva do Gerente Geral
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    session_repo: SessionRepository,
    directory_repo: DirectoryRepository,
    audit_service: AuditService,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(
        user_repo: UserRepository,
        session_repo: SessionRepository,
        directory_repo: DirectoryRepository,
        audit_service: AuditService,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            directory_repo,
            audit_service,
            bcrypt_cost,
        }
    }

    pub async fn list_users(&self, conn: &mut PgConnection, actor: &User, filters: &UserFilters) -> Result<Vec<User>, AppError> {
        access::check(actor, Resource::Users, Operation::Read)?;
        self.user_repo.list(conn, filters).await
    }

    pub async fn get_user(&self, conn: &mut PgConnection, actor: &User, id: Uuid) -> Result<User, AppError> {
        access::check(actor, Resource::Users, Operation::Read)?;
        self.user_repo
            .find_by_id_in(conn, id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    // --- CREATE ---
    pub async fn create_user(&self, conn: &mut PgConnection, actor: &User, payload: CreateUserPayload) -> Result<User, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "users.create", "users")
            .detail(json!({ "email": payload.email, "role": payload.role }));
        let result = self.create_user_inner(&mut *conn, actor, &payload).await;
        self.audit_service.track(conn, record, result, |u| Some(u.id)).await
    }

    async fn create_user_inner(&self, conn: &mut PgConnection, actor: &User, payload: &CreateUserPayload) -> Result<User, AppError> {
        access::check(actor, Resource::Users, Operation::Create)?;

        // 1. Valida campos e lotação
        let mut errors: FieldErrors = payload.validate().err().map(Into::into).unwrap_or_default();
        errors.merge_prefixed("", payload.placement_errors());
        self.check_equipe_base(&mut *conn, payload.base_id, payload.equipe_id, "", &mut errors)
            .await?;
        errors.into_result()?;

        // 2. Hash e insert
        let password_hash = hash_password(&payload.password, self.bcrypt_cost).await?;
        let user = self
            .user_repo
            .create_user(conn, &payload.nome, &payload.email, &password_hash, payload.role, payload.base_id, payload.equipe_id)
            .await?;

        tracing::info!("👤 Usuário criado: {} ({})", user.email, user.role.as_str());
        Ok(user)
    }

    // --- BULK CREATE (tudo ou nada) ---
    pub async fn bulk_create_users(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        payload: BulkCreateUsersPayload,
    ) -> Result<BatchResult, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "users.bulk_create", "users")
            .detail(json!({ "rows": payload.users.len() }));
        let result = self.bulk_create_inner(&mut *conn, actor, &payload).await;
        self.audit_service.track(conn, record, result, |_| None).await
    }

    async fn bulk_create_inner(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        payload: &BulkCreateUsersPayload,
    ) -> Result<BatchResult, AppError> {
        access::check(actor, Resource::Users, Operation::Create)?;

        // 1. Valida todas as linhas antes de gravar qualquer uma
        let mut errors: FieldErrors = payload.validate().err().map(Into::into).unwrap_or_default();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (i, row) in payload.users.iter().enumerate() {
            let prefix = format!("users[{}]", i);
            errors.merge_prefixed(&prefix, row.placement_errors());
            self.check_equipe_base(&mut *conn, row.base_id, row.equipe_id, &prefix, &mut errors)
                .await?;

            let email = row.email.trim().to_lowercase();
            if let Some(first) = seen.insert(email, i) {
                errors.add(format!("{}.email", prefix), format!("E-mail repetido (linha {}).", first));
            }
        }
        errors.into_result()?;

        // 2. Grava tudo na mesma transação
        let mut ids = Vec::with_capacity(payload.users.len());
        for row in &payload.users {
            let password_hash = hash_password(&row.password, self.bcrypt_cost).await?;
            let user = self
                .user_repo
                .create_user(&mut *conn, &row.nome, &row.email, &password_hash, row.role, row.base_id, row.equipe_id)
                .await?;
            ids.push(user.id);
        }

        tracing::info!("👥 {} usuários criados em lote", ids.len());
        Ok(BatchResult { count: ids.len(), ids })
    }

    // --- UPDATE ---
    pub async fn update_user(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        id: Uuid,
        payload: UpdateUserPayload,
    ) -> Result<User, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "users.update", "users").target(Some(id));
        let result = self.update_user_inner(&mut *conn, actor, id, &payload).await;
        self.audit_service.track(conn, record, result, |u| Some(u.id)).await
    }

    async fn update_user_inner(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        id: Uuid,
        payload: &UpdateUserPayload,
    ) -> Result<User, AppError> {
        access::check(actor, Resource::Users, Operation::Update)?;
        payload.validate()?;

        let current = self
            .user_repo
            .find_by_id_in(&mut *conn, id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        // Mudou o papel: a lotação passa a ser a informada (ausente = sem lotação)
        let role = payload.role.unwrap_or(current.role);
        let (base_id, equipe_id) = if payload.role.is_some() {
            (payload.base_id, payload.equipe_id)
        } else {
            (payload.base_id.or(current.base_id), payload.equipe_id.or(current.equipe_id))
        };

        let mut errors = placement_errors(role, base_id, equipe_id);
        self.check_equipe_base(&mut *conn, base_id, equipe_id, "", &mut errors).await?;
        if actor.id == id && payload.ativo == Some(false) {
            errors.add("ativo", "Você não pode desativar a própria conta.");
        }
        errors.into_result()?;

        let ativo = payload.ativo.unwrap_or(current.ativo);
        let updated = self
            .user_repo
            .update_user(
                &mut *conn,
                id,
                payload.nome.as_deref().unwrap_or(&current.nome),
                payload.email.as_deref().unwrap_or(&current.email),
                role,
                base_id,
                equipe_id,
                ativo,
            )
            .await?
            .ok_or(AppError::UserNotFound)?;

        if let Some(password) = &payload.password {
            let password_hash = hash_password(password, self.bcrypt_cost).await?;
            self.user_repo.update_password(&mut *conn, id, &password_hash).await?;
        }

        // Desativação, troca de papel ou de senha derruba as sessões abertas
        if !ativo || payload.role.is_some() || payload.password.is_some() {
            let revoked = self.session_repo.revoke_all_for_user(&mut *conn, id, None).await?;
            tracing::info!("🔒 {} sessões revogadas para {}", revoked, updated.email);
        }

        Ok(updated)
    }

    // --- DELETE (lógico) ---
    pub async fn delete_user(&self, conn: &mut PgConnection, actor: &User, id: Uuid) -> Result<(), AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "users.delete", "users").target(Some(id));
        let result = self.delete_user_inner(&mut *conn, actor, id).await;
        self.audit_service.track(conn, record, result, |_| None).await
    }

    async fn delete_user_inner(&self, conn: &mut PgConnection, actor: &User, id: Uuid) -> Result<(), AppError> {
        access::check(actor, Resource::Users, Operation::Delete)?;
        if actor.id == id {
            return Err(AppError::field("id", "Você não pode excluir a própria conta."));
        }

        self.user_repo
            .deactivate(&mut *conn, id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        self.session_repo.revoke_all_for_user(conn, id, None).await?;
        Ok(())
    }

    /// A equipe precisa existir e pertencer à base informada.
    async fn check_equipe_base(
        &self,
        conn: &mut PgConnection,
        base_id: Option<Uuid>,
        equipe_id: Option<Uuid>,
        prefix: &str,
        errors: &mut FieldErrors,
    ) -> Result<(), AppError> {
        let (Some(base_id), Some(equipe_id)) = (base_id, equipe_id) else {
            return Ok(());
        };
        let pairs = self.directory_repo.equipe_bases(conn, &[equipe_id]).await?;

        let mut found = FieldErrors::new();
        match pairs.first() {
            None => found.add("equipeId", "Equipe não encontrada."),
            Some((_, equipe_base)) if *equipe_base != base_id => {
                found.add("equipeId", "A equipe não pertence à base informada.")
            }
            Some(_) => {}
        }
        errors.merge_prefixed(prefix, found);
        Ok(())
    }
}
