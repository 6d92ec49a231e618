// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Mapeia o ENUM 'user_role' do Postgres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Gerente Geral: acesso total, inclusive entre bases.
    Geral,
    /// Gerente de SCI: leitura da própria base.
    GerenteSci,
    /// Chefe de Equipe: escrita restrita à própria equipe.
    Chefe,
    /// Líder de Resgate: lança indicadores da própria equipe.
    Auxiliar,
}

impl UserRole {
    pub const ALL: [UserRole; 4] = [
        UserRole::Geral,
        UserRole::GerenteSci,
        UserRole::Chefe,
        UserRole::Auxiliar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Geral => "geral",
            UserRole::GerenteSci => "gerente_sci",
            UserRole::Chefe => "chefe",
            UserRole::Auxiliar => "auxiliar",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UserRole::Geral => "Gerente Geral",
            UserRole::GerenteSci => "Gerente de SCI",
            UserRole::Chefe => "Chefe de Equipe",
            UserRole::Auxiliar => "Líder de Resgate",
        }
    }

    /// Papéis presos a uma equipe precisam de base e equipe.
    pub fn requires_equipe(&self) -> bool {
        matches!(self, UserRole::Chefe | UserRole::Auxiliar)
    }

    pub fn requires_base(&self) -> bool {
        !matches!(self, UserRole::Geral)
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub nome: String,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub role: UserRole,
    pub base_id: Option<Uuid>,
    pub equipe_id: Option<Uuid>,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "gerente@indicadores.local")]
    pub email: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,      // Subject (ID do usuário)
    pub sid: Uuid,      // Sessão no servidor
    pub role: UserRole,
    pub exp: usize,     // Expiration time (quando o token expira)
    pub iat: usize,     // Issued At (quando o token foi criado)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserMetadata {
    pub role: UserRole,
    pub nome: String,
    pub base_id: Option<Uuid>,
    pub equipe_id: Option<Uuid>,
}

// GET /api/auth/user
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub id: Uuid,
    pub email: String,
    pub user_metadata: UserMetadata,
}

impl From<&User> for CurrentUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            user_metadata: UserMetadata {
                role: user.role,
                nome: user.nome.clone(),
                base_id: user.base_id,
                equipe_id: user.equipe_id,
            },
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Ciclo de vida de uma credencial: `Anonymous -> Authenticated -> Expired | LoggedOut`.
/// `Anonymous` é a ausência de sessão, por isso não aparece aqui.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Authenticated,
    Expired,
    LoggedOut,
}

impl Session {
    pub fn status(&self, now: DateTime<Utc>) -> SessionStatus {
        if self.revoked_at.is_some() {
            SessionStatus::LoggedOut
        } else if now >= self.expires_at {
            SessionStatus::Expired
        } else {
            SessionStatus::Authenticated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration, revoked: bool) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + expires_in,
            revoked_at: revoked.then_some(now),
        }
    }

    #[test]
    fn session_status_transitions() {
        let now = Utc::now();
        assert_eq!(session(Duration::hours(1), false).status(now), SessionStatus::Authenticated);
        assert_eq!(session(Duration::seconds(-1), false).status(now), SessionStatus::Expired);
        // Logout prevalece sobre expiração
        assert_eq!(session(Duration::seconds(-1), true).status(now), SessionStatus::LoggedOut);
    }

    #[test]
    fn role_placement_rules() {
        assert!(!UserRole::Geral.requires_base());
        assert!(UserRole::GerenteSci.requires_base());
        assert!(!UserRole::GerenteSci.requires_equipe());
        assert!(UserRole::Chefe.requires_equipe());
        assert!(UserRole::Auxiliar.requires_equipe());
    }
}
