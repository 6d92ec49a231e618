// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{SessionRepository, UserRepository},
    models::{
        audit::{AuditOutcome, NewAuditRecord},
        auth::{AuthResponse, Claims, SessionStatus, User, UserRole},
    },
    services::audit_service::AuditService,
};

// ---
// Senhas: bcrypt é custoso, então roda fora do executor assíncrono
// ---
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, cost))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(valid)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    session_repo: SessionRepository,
    audit_service: AuditService,
    pool: PgPool,
    jwt_secret: String,
    jwt_ttl_hours: i64,
    bcrypt_cost: u32,
    // Hash de referência para e-mails desconhecidos: o login custa o mesmo bcrypt
    dummy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        session_repo: SessionRepository,
        audit_service: AuditService,
        pool: PgPool,
        jwt_secret: String,
        jwt_ttl_hours: i64,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            audit_service,
            pool,
            jwt_secret,
            jwt_ttl_hours,
            bcrypt_cost,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    async fn burn_password_check(&self, password: &str) -> Result<(), AppError> {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| hash_password("indicadores-dummy-password", self.bcrypt_cost))
            .await?;
        verify_password(password, dummy).await?;
        Ok(())
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let rejected = |actor: Option<Uuid>, reason: &str| {
            NewAuditRecord::new(actor, "auth.login", "sessions")
                .outcome(AuditOutcome::Rejected)
                .detail(json!({ "email": email, "reason": reason }))
        };

        // 1. Usuário existe?
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            self.burn_password_check(password).await?;
            self.audit_service.record_detached(rejected(None, "unknown_email")).await;
            return Err(AppError::InvalidCredentials);
        };

        // 2. Senha confere?
        if !verify_password(password, &user.password_hash).await? {
            self.audit_service.record_detached(rejected(Some(user.id), "wrong_password")).await;
            return Err(AppError::InvalidCredentials);
        }

        // 3. Conta ativa?
        if !user.ativo {
            self.audit_service.record_detached(rejected(Some(user.id), "inactive")).await;
            return Err(AppError::AccountInactive);
        }

        // 4. Sessão + auditoria na mesma transação
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.jwt_ttl_hours);
        let session_id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;
        self.session_repo
            .create(&mut *tx, session_id, user.id, expires_at)
            .await?;
        self.audit_service
            .record(
                &mut tx,
                NewAuditRecord::new(Some(user.id), "auth.login", "sessions").target(Some(session_id)),
            )
            .await?;
        tx.commit().await?;

        tracing::info!("🔑 Login de {} ({})", user.email, user.role.as_str());

        let claims = Claims {
            sub: user.id,
            sid: session_id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(AuthResponse {
            access_token: self.encode_token(&claims)?,
            token_type: "Bearer",
            expires_at,
        })
    }

    /// Valida assinatura, expiração (sem tolerância), sessão e conta. Roda em toda requisição.
    pub async fn validate_token(&self, token: &str) -> Result<(User, Uuid), AppError> {
        let claims = self.decode_token(token)?;

        let session = self
            .session_repo
            .find(&self.pool, claims.sid)
            .await?
            .filter(|s| s.user_id == claims.sub)
            .ok_or(AppError::InvalidToken)?;

        match session.status(Utc::now()) {
            SessionStatus::Authenticated => {}
            SessionStatus::Expired => return Err(AppError::ExpiredToken),
            SessionStatus::LoggedOut => return Err(AppError::InvalidToken),
        }

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .filter(|u| u.ativo)
            .ok_or(AppError::InvalidToken)?;

        Ok((user, session.id))
    }

    /// Revoga a sessão do token. Basta a assinatura ser válida: token expirado ou sessão
    /// já revogada também resultam em sucesso, então repetir o logout não é erro.
    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        let claims = self.decode_signature_only(token)?;

        let mut tx = self.pool.begin().await?;
        let owned = self
            .session_repo
            .find(&mut *tx, claims.sid)
            .await?
            .is_some_and(|s| s.user_id == claims.sub);
        if owned && self.session_repo.revoke(&mut *tx, claims.sid).await? {
            self.audit_service
                .record(
                    &mut tx,
                    NewAuditRecord::new(Some(claims.sub), "auth.logout", "sessions").target(Some(claims.sid)),
                )
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Cria o primeiro Gerente Geral quando ainda não existe nenhum.
    pub async fn bootstrap_admin(&self, email: &str, password: &str, bcrypt_cost: u32) -> Result<bool, AppError> {
        if self.user_repo.any_admin().await? {
            return Ok(false);
        }

        let password_hash = hash_password(password, bcrypt_cost).await?;

        let mut tx = self.pool.begin().await?;
        let user = self
            .user_repo
            .create_user(&mut *tx, "Gerente Geral", email, &password_hash, UserRole::Geral, None, None)
            .await?;
        self.audit_service
            .record(
                &mut tx,
                NewAuditRecord::new(None, "users.bootstrap", "users").target(Some(user.id)),
            )
            .await?;
        tx.commit().await?;

        tracing::info!("👤 Gerente Geral inicial criado: {}", user.email);
        Ok(true)
    }

    fn encode_token(&self, claims: &Claims) -> Result<String, AppError> {
        Ok(encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        self.decode_with(token, &validation)
    }

    // Só a assinatura: expiração e revogação ficam de fora
    fn decode_signature_only(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        self.decode_with(token, &validation)
    }

    fn decode_with(&self, token: &str, validation: &Validation) -> Result<Claims, AppError> {
        decode::<Claims>(token, &DecodingKey::from_secret(self.jwt_secret.as_ref()), validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::AuditRepository;
    use sqlx::postgres::PgPoolOptions;

    fn service() -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/indicadores_test")
            .unwrap();
        AuthService::new(
            UserRepository::new(pool.clone()),
            SessionRepository::new(),
            AuditService::new(AuditRepository::new(), pool.clone()),
            pool,
            "segredo-de-teste-bem-longo".into(),
            12,
            4,
        )
    }

    fn claims(exp_offset_secs: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4(),
            sid: Uuid::new_v4(),
            role: UserRole::Chefe,
            exp: (now + exp_offset_secs) as usize,
            iat: now as usize,
        }
    }

    #[tokio::test]
    async fn token_round_trip_keeps_claims() {
        let auth = service();
        let original = claims(3600);
        let token = auth.encode_token(&original).unwrap();
        let decoded = auth.decode_token(&token).unwrap();
        assert_eq!(decoded.sub, original.sub);
        assert_eq!(decoded.sid, original.sid);
        assert_eq!(decoded.role, UserRole::Chefe);
    }

    #[tokio::test]
    async fn expired_token_has_no_grace_window() {
        let auth = service();
        let token = auth.encode_token(&claims(-5)).unwrap();
        assert!(matches!(auth.decode_token(&token), Err(AppError::ExpiredToken)));
    }

    #[tokio::test]
    async fn tampered_or_foreign_tokens_are_invalid() {
        let auth = service();
        assert!(matches!(auth.decode_token("nao.e.jwt"), Err(AppError::InvalidToken)));

        let mut other = service();
        other.jwt_secret = "outro-segredo-bem-longo-123".into();
        let token = other.encode_token(&claims(3600)).unwrap();
        assert!(matches!(auth.decode_token(&token), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn logout_decoding_ignores_expiry_but_not_signature() {
        let auth = service();
        let expired = auth.encode_token(&claims(-3600)).unwrap();
        assert!(auth.decode_signature_only(&expired).is_ok());

        let mut other = service();
        other.jwt_secret = "outro-segredo-bem-longo-123".into();
        let foreign = other.encode_token(&claims(3600)).unwrap();
        assert!(matches!(auth.decode_signature_only(&foreign), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn unknown_email_path_runs_bcrypt_once_per_service() {
        let auth = service();
        auth.burn_password_check("qualquer-senha").await.unwrap();
        let first = auth.dummy_hash.get().cloned().unwrap();

        auth.burn_password_check("outra-senha").await.unwrap();
        assert_eq!(auth.dummy_hash.get(), Some(&first));
        assert!(first.starts_with("$2"));
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hashed = hash_password("senha-segura-1", 4).await.unwrap();
        assert!(verify_password("senha-segura-1", &hashed).await.unwrap());
        assert!(!verify_password("senha-errada", &hashed).await.unwrap());
    }
}
