// src/services/settings_service.rs

use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{FeedbackRepository, SessionRepository, UserRepository},
    models::{
        audit::NewAuditRecord,
        auth::{User, UserRole},
        settings::{
            ChangePasswordPayload, CreateFeedbackPayload, Feedback, ProfileResponse, UpdateFeedbackStatusPayload,
            UpdateProfilePayload,
        },
    },
    services::{
        access::{self, Operation, Resource},
        audit_service::AuditService,
        auth::{hash_password, verify_password},
    },
};

// Configurações do próprio usuário: perfil, senha e feedback
#[derive(Clone)]
pub struct SettingsService {
    user_repo: UserRepository,
    session_repo: SessionRepository,
    feedback_repo: FeedbackRepository,
    audit_service: AuditService,
    bcrypt_cost: u32,
}

impl SettingsService {
    pub fn new(
        user_repo: UserRepository,
        session_repo: SessionRepository,
        feedback_repo: FeedbackRepository,
        audit_service: AuditService,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            feedback_repo,
            audit_service,
            bcrypt_cost,
        }
    }

    // =========================================================================
    //  PERFIL
    // =========================================================================

    pub async fn get_profile(&self, conn: &mut PgConnection, actor: &User) -> Result<ProfileResponse, AppError> {
        let user = self
            .user_repo
            .find_by_id_in(conn, actor.id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        Ok(user.into())
    }

    /// Nome e e-mail. Papel e lotação só mudam pela gestão de usuários.
    pub async fn update_profile(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        payload: UpdateProfilePayload,
    ) -> Result<ProfileResponse, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "profile.update", "users").target(Some(actor.id));
        let result: Result<User, AppError> = async {
            // 1. Nada é gravado se algum campo for inválido
            payload.validate()?;

            let current = self
                .user_repo
                .find_by_id_in(&mut *conn, actor.id)
                .await?
                .ok_or(AppError::UserNotFound)?;

            // 2. Unicidade do e-mail fica com a constraint (EmailAlreadyExists)
            self.user_repo
                .update_user(
                    &mut *conn,
                    current.id,
                    payload.nome.as_deref().unwrap_or(&current.nome),
                    payload.email.as_deref().unwrap_or(&current.email),
                    current.role,
                    current.base_id,
                    current.equipe_id,
                    current.ativo,
                )
                .await?
                .ok_or(AppError::UserNotFound)
        }
        .await;

        let user = self.audit_service.track(conn, record, result, |u| Some(u.id)).await?;
        Ok(user.into())
    }

    /// Troca a senha e encerra as demais sessões do usuário (a atual continua válida).
    pub async fn change_password(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        session_id: Uuid,
        payload: ChangePasswordPayload,
    ) -> Result<(), AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "profile.change_password", "users").target(Some(actor.id));
        let result: Result<(), AppError> = async {
            payload.validate()?;

            let current = self
                .user_repo
                .find_by_id_in(&mut *conn, actor.id)
                .await?
                .ok_or(AppError::UserNotFound)?;
            if !verify_password(&payload.current_password, &current.password_hash).await? {
                return Err(AppError::field("currentPassword", "A senha atual está incorreta."));
            }

            let password_hash = hash_password(&payload.new_password, self.bcrypt_cost).await?;
            self.user_repo.update_password(&mut *conn, actor.id, &password_hash).await?;

            let revoked = self
                .session_repo
                .revoke_all_for_user(&mut *conn, actor.id, Some(session_id))
                .await?;
            tracing::info!("🔒 Senha alterada por {}; {} outras sessões encerradas", current.email, revoked);
            Ok(())
        }
        .await;
        self.audit_service.track(conn, record, result, |_| None).await
    }

    // =========================================================================
    //  FEEDBACK
    // =========================================================================

    pub async fn create_feedback(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        payload: CreateFeedbackPayload,
    ) -> Result<Feedback, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "feedback.create", "feedbacks")
            .detail(json!({ "tipo": payload.tipo }));
        let result: Result<Feedback, AppError> = async {
            access::check(actor, Resource::Feedback, Operation::Create)?;
            payload.validate()?;
            self.feedback_repo
                .create(&mut *conn, actor.id, payload.tipo, payload.mensagem.trim())
                .await
        }
        .await;
        self.audit_service.track(conn, record, result, |f| Some(f.id)).await
    }

    /// O suporte (Gerente Geral) vê todos; os demais só os próprios.
    pub async fn list_feedback(&self, conn: &mut PgConnection, actor: &User) -> Result<Vec<Feedback>, AppError> {
        access::check(actor, Resource::Feedback, Operation::Read)?;
        let owner = (actor.role != UserRole::Geral).then_some(actor.id);
        self.feedback_repo.list(conn, owner).await
    }

    pub async fn delete_feedback(&self, conn: &mut PgConnection, actor: &User, id: Uuid) -> Result<(), AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "feedback.delete", "feedbacks").target(Some(id));
        let result: Result<(), AppError> = async {
            access::check(actor, Resource::Feedback, Operation::Delete)?;
            let feedback = self
                .feedback_repo
                .find(&mut *conn, id)
                .await?
                .ok_or_else(|| AppError::ResourceNotFound("feedbacks".into()))?;

            if feedback.user_id != actor.id && actor.role != UserRole::Geral {
                return Err(AppError::denied(Resource::Feedback.as_str(), Some(id)));
            }
            self.feedback_repo.delete(&mut *conn, id).await?;
            Ok(())
        }
        .await;
        self.audit_service.track(conn, record, result, |_| None).await
    }

    pub async fn update_feedback_status(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        id: Uuid,
        payload: UpdateFeedbackStatusPayload,
    ) -> Result<Feedback, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "feedback.update_status", "feedbacks")
            .target(Some(id))
            .detail(json!({ "status": payload.status }));
        let result: Result<Feedback, AppError> = async {
            access::check(actor, Resource::Feedback, Operation::Update)?;
            payload.validate()?;
            self.feedback_repo
                .update_status(&mut *conn, id, payload.status, payload.resposta_suporte.as_deref())
                .await?
                .ok_or_else(|| AppError::ResourceNotFound("feedbacks".into()))
        }
        .await;
        self.audit_service.track(conn, record, result, |f| Some(f.id)).await
    }
}
