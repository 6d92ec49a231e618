// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::current_user,
        handlers::auth::logout,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::bulk_create_users,
        handlers::users::update_user,
        handlers::users::delete_user,

        // --- Directory ---
        handlers::directory::list_bases,
        handlers::directory::get_base,
        handlers::directory::create_base,
        handlers::directory::update_base,
        handlers::directory::delete_base,
        handlers::directory::list_equipes,
        handlers::directory::get_equipe,
        handlers::directory::create_equipe,
        handlers::directory::update_equipe,
        handlers::directory::delete_equipe,
        handlers::directory::list_colaboradores,
        handlers::directory::get_colaborador,
        handlers::directory::create_colaborador,
        handlers::directory::batch_create_colaboradores,
        handlers::directory::update_colaborador,
        handlers::directory::delete_colaborador,
        handlers::directory::batch_delete_colaboradores,

        // --- Lançamentos ---
        handlers::history::list_indicadores,
        handlers::lancamentos::submit_lancamento,
        handlers::lancamentos::get_lancamento,
        handlers::lancamentos::update_lancamento,
        handlers::lancamentos::delete_lancamento,

        // --- Histórico ---
        handlers::history::list_history,
        handlers::history::export_history,

        // --- Analytics ---
        handlers::analytics::get_dashboard,
        handlers::analytics::get_compliance,

        // --- Audit ---
        handlers::audit::list_audit,

        // --- Settings ---
        handlers::settings::get_profile,
        handlers::settings::update_profile,
        handlers::settings::change_password,
        handlers::settings::list_feedback,
        handlers::settings::create_feedback,
        handlers::settings::update_feedback_status,
        handlers::settings::delete_feedback,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::UserMetadata,
            models::auth::CurrentUserResponse,

            // --- Users ---
            models::users::CreateUserPayload,
            models::users::BulkCreateUsersPayload,
            models::users::UpdateUserPayload,

            // --- Directory ---
            models::directory::Base,
            models::directory::CreateBasePayload,
            models::directory::UpdateBasePayload,
            models::directory::Equipe,
            models::directory::CreateEquipePayload,
            models::directory::UpdateEquipePayload,
            models::directory::Colaborador,
            models::directory::CreateColaboradorPayload,
            models::directory::BatchCreateColaboradoresPayload,
            models::directory::UpdateColaboradorPayload,
            models::directory::BatchDeletePayload,
            models::directory::BatchResult,

            // --- Indicadores ---
            models::indicators::IndicatorType,
            models::indicators::ComplianceGroup,
            models::indicators::IndicatorInfo,
            models::indicators::Lancamento,
            models::indicators::LancamentoPayload,
            models::indicators::UpdateLancamentoPayload,
            models::indicators::HistoryRecord,
            models::indicators::CreatedResponse,

            // --- Analytics ---
            models::analytics::Period,
            models::analytics::Kpis,
            models::analytics::SeriesPoint,
            models::analytics::Charts,
            models::analytics::RankingEntry,
            models::analytics::AlertSeverity,
            models::analytics::Alert,
            models::analytics::DashboardAnalytics,
            models::analytics::ComplianceEntry,
            models::analytics::ComplianceReport,

            // --- Audit ---
            models::audit::AuditOutcome,
            models::audit::AuditRecord,

            // --- Settings ---
            models::settings::ProfileResponse,
            models::settings::UpdateProfilePayload,
            models::settings::ChangePasswordPayload,
            models::settings::FeedbackTipo,
            models::settings::FeedbackStatus,
            models::settings::Feedback,
            models::settings::CreateFeedbackPayload,
            models::settings::UpdateFeedbackStatusPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Login, sessão atual e logout"),
        (name = "Users", description = "Gestão de usuários (Gerente Geral)"),
        (name = "Directory", description = "Bases, equipes e colaboradores"),
        (name = "Lançamentos", description = "Envio e manutenção de lançamentos de indicadores"),
        (name = "Histórico", description = "Consulta e exportação de lançamentos"),
        (name = "Analytics", description = "Painel gerencial e conformidade de envio"),
        (name = "Audit", description = "Trilha de auditoria"),
        (name = "Settings", description = "Perfil, senha e feedback do usuário")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route_group() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        for path in [
            "/api/auth/login",
            "/api/users/bulk",
            "/api/colaboradores/batch-delete",
            "/api/lancamentos/{slug}",
            "/api/lancamentos/{id}",
            "/api/history/export",
            "/api/analytics/dashboard",
            "/api/audit",
            "/api/user/settings/feedback/{id}/status",
        ] {
            assert!(paths.contains_key(path), "rota ausente na documentação: {}", path);
        }

        let schemes = doc.components.as_ref().map(|c| c.security_schemes.contains_key("api_jwt"));
        assert_eq!(schemes, Some(true));
    }
}
