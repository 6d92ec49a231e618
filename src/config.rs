// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, sync::Arc, time::Duration};

use crate::{
    common::i18n::I18nStore,
    db::{
        AuditRepository, DirectoryRepository, FeedbackRepository, LancamentoRepository,
        SessionRepository, UserRepository,
    },
    services::{
        analytics_service::AnalyticsService, audit_service::AuditService, auth::AuthService,
        directory_service::DirectoryService, indicator_service::IndicatorService,
        settings_service::SettingsService, user_service::UserService,
    },
};

/// Configuração lida do ambiente (com `.env` opcional).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub jwt_ttl_hours: i64,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Janela (em dias) em que um Chefe de Equipe pode editar lançamentos. `None` = sem limite.
    pub edit_window_days: Option<i64>,
    pub bcrypt_cost: u32,
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte chave/valor.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        if jwt_secret.len() < 16 {
            anyhow::bail!("JWT_SECRET deve ter pelo menos 16 caracteres");
        }

        let parse = |key: &str, default: &str| -> anyhow::Result<String> {
            Ok(lookup(key).unwrap_or_else(|| default.to_string()))
        };

        let jwt_ttl_hours = parse("JWT_TTL_HOURS", "12")?
            .parse::<i64>()
            .context("JWT_TTL_HOURS inválido")?;
        let db_max_connections = parse("DB_MAX_CONNECTIONS", "5")?
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS inválido")?;
        let db_acquire_timeout_secs = parse("DB_ACQUIRE_TIMEOUT_SECS", "3")?
            .parse::<u64>()
            .context("DB_ACQUIRE_TIMEOUT_SECS inválido")?;
        let request_timeout_secs = parse("REQUEST_TIMEOUT_SECS", "30")?
            .parse::<u64>()
            .context("REQUEST_TIMEOUT_SECS inválido")?;
        let bcrypt_cost = parse("BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string())?
            .parse::<u32>()
            .context("BCRYPT_COST inválido")?;

        let edit_window_days = match lookup("EDIT_WINDOW_DAYS") {
            Some(v) if !v.trim().is_empty() => {
                Some(v.trim().parse::<i64>().context("EDIT_WINDOW_DAYS inválido")?)
            }
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: parse("BIND_ADDR", "0.0.0.0:3000")?,
            jwt_ttl_hours,
            db_max_connections,
            db_acquire_timeout_secs,
            request_timeout_secs,
            edit_window_days,
            bcrypt_cost,
            bootstrap_admin_email: lookup("BOOTSTRAP_ADMIN_EMAIL"),
            bootstrap_admin_password: lookup("BOOTSTRAP_ADMIN_PASSWORD"),
        })
    }

    /// Limite aplicado ao `statement_timeout` de cada transação.
    pub fn statement_timeout_ms(&self) -> u64 {
        self.request_timeout_secs * 1000
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub i18n_store: Arc<I18nStore>,

    pub auth_service: AuthService,
    pub user_service: UserService,
    pub directory_service: DirectoryService,
    pub indicator_service: IndicatorService,
    pub analytics_service: AnalyticsService,
    pub audit_service: AuditService,
    pub settings_service: SettingsService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::with_pool(db_pool, config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_pool(db_pool: PgPool, config: Config) -> Self {
        let config = Arc::new(config);

        let user_repo = UserRepository::new(db_pool.clone());
        let session_repo = SessionRepository::new();
        let directory_repo = DirectoryRepository::new();
        let lancamento_repo = LancamentoRepository::new();
        let audit_repo = AuditRepository::new();
        let feedback_repo = FeedbackRepository::new();

        let audit_service = AuditService::new(audit_repo, db_pool.clone());
        let auth_service = AuthService::new(
            user_repo.clone(),
            session_repo.clone(),
            audit_service.clone(),
            db_pool.clone(),
            config.jwt_secret.clone(),
            config.jwt_ttl_hours,
            config.bcrypt_cost,
        );
        let user_service = UserService::new(
            user_repo.clone(),
            session_repo.clone(),
            directory_repo.clone(),
            audit_service.clone(),
            config.bcrypt_cost,
        );
        let directory_service = DirectoryService::new(directory_repo.clone(), audit_service.clone());
        let indicator_service = IndicatorService::new(
            lancamento_repo.clone(),
            directory_repo.clone(),
            audit_service.clone(),
            config.edit_window_days,
        );
        let analytics_service = AnalyticsService::new(lancamento_repo, directory_repo);
        let settings_service = SettingsService::new(
            user_repo,
            session_repo,
            feedback_repo,
            audit_service.clone(),
            config.bcrypt_cost,
        );

        Self {
            db_pool,
            config,
            i18n_store: Arc::new(I18nStore::new()),
            auth_service,
            user_service,
            directory_service,
            indicator_service,
            analytics_service,
            audit_service,
            settings_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn applies_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/indicadores"),
            ("JWT_SECRET", "segredo-muito-longo-123"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.jwt_ttl_hours, 12);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.statement_timeout_ms(), 30_000);
        assert_eq!(config.edit_window_days, None);
    }

    #[test]
    fn rejects_missing_database_url_and_short_secret() {
        assert!(Config::from_lookup(lookup_from(&[("JWT_SECRET", "segredo-muito-longo-123")])).is_err());
        assert!(
            Config::from_lookup(lookup_from(&[
                ("DATABASE_URL", "postgres://localhost/indicadores"),
                ("JWT_SECRET", "curto"),
            ]))
            .is_err()
        );
    }

    #[test]
    fn parses_edit_window() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/indicadores"),
            ("JWT_SECRET", "segredo-muito-longo-123"),
            ("EDIT_WINDOW_DAYS", "45"),
        ]))
        .unwrap();
        assert_eq!(config.edit_window_days, Some(45));
    }
}
