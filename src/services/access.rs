// src/services/access.rs

use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::{User, UserRole}};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Bases,
    Equipes,
    Colaboradores,
    Lancamentos,
    Analytics,
    Audit,
    Feedback,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Users,
        Resource::Bases,
        Resource::Equipes,
        Resource::Colaboradores,
        Resource::Lancamentos,
        Resource::Analytics,
        Resource::Audit,
        Resource::Feedback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Bases => "bases",
            Resource::Equipes => "equipes",
            Resource::Colaboradores => "colaboradores",
            Resource::Lancamentos => "lancamentos",
            Resource::Analytics => "analytics",
            Resource::Audit => "audit",
            Resource::Feedback => "feedback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

// =============================================================================
//  MATRIZ DE PERMISSÕES
// =============================================================================

/// Função pura de (papel, recurso, operação). O recorte de linhas fica com [`Scope`].
pub fn authorize(role: UserRole, resource: Resource, operation: Operation) -> Decision {
    use Operation::*;
    use Resource::*;

    let allowed = match (role, resource) {
        (UserRole::Geral, _) => !matches!((resource, operation), (Analytics | Audit, Create | Update | Delete)),

        // Cadastros básicos são só leitura fora da gerência geral
        (_, Bases | Equipes) => operation == Read,
        (_, Users | Audit) => false,
        (_, Analytics) => operation == Read,
        // Feedback: cada um cuida do seu; a troca de status é do suporte
        (_, Feedback) => matches!(operation, Read | Create | Delete),

        (UserRole::Chefe, Colaboradores | Lancamentos) => true,
        (UserRole::Auxiliar, Colaboradores) => operation == Read,
        (UserRole::Auxiliar, Lancamentos) => matches!(operation, Read | Create),
        (UserRole::GerenteSci, Colaboradores | Lancamentos) => operation == Read,
    };

    if allowed { Decision::Allow } else { Decision::Deny }
}

// =============================================================================
//  ESCOPO DE LINHAS
// =============================================================================

/// Recorte de linhas visível para um usuário, derivado do papel e da lotação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Base(Uuid),
    Team { base: Uuid, equipe: Uuid },
    Nothing,
}

impl Scope {
    pub fn for_user(user: &User) -> Self {
        match (user.role, user.base_id, user.equipe_id) {
            (UserRole::Geral, _, _) => Scope::All,
            (UserRole::GerenteSci, Some(base), _) => Scope::Base(base),
            (UserRole::Chefe | UserRole::Auxiliar, Some(base), Some(equipe)) => {
                Scope::Team { base, equipe }
            }
            // Lotação incompleta não enxerga nada
            _ => Scope::Nothing,
        }
    }

    pub fn permits(&self, base_id: Uuid, equipe_id: Uuid) -> bool {
        match self {
            Scope::All => true,
            Scope::Base(base) => *base == base_id,
            Scope::Team { base, equipe } => *base == base_id && *equipe == equipe_id,
            Scope::Nothing => false,
        }
    }

    pub fn permits_base(&self, base_id: Uuid) -> bool {
        match self {
            Scope::All => true,
            Scope::Base(base) | Scope::Team { base, .. } => *base == base_id,
            Scope::Nothing => false,
        }
    }

    /// Filtros explícitos da requisição (base/equipe) precisam caber no escopo.
    pub fn ensure_filter(
        &self,
        resource: Resource,
        base_id: Option<Uuid>,
        equipe_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let ok = match self {
            Scope::All => true,
            Scope::Base(base) => base_id.is_none_or(|b| b == *base),
            Scope::Team { base, equipe } => {
                base_id.is_none_or(|b| b == *base) && equipe_id.is_none_or(|e| e == *equipe)
            }
            Scope::Nothing => false,
        };

        if ok {
            Ok(())
        } else {
            Err(AppError::denied(resource.as_str(), equipe_id.or(base_id)))
        }
    }

    /// Acrescenta `AND <alias>.base_id = .. [AND <alias>.equipe_id = ..]` à consulta.
    pub fn push_predicate(&self, qb: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        match self {
            Scope::All => {}
            Scope::Base(base) => {
                qb.push(format!(" AND {}.base_id = ", alias)).push_bind(*base);
            }
            Scope::Team { base, equipe } => {
                qb.push(format!(" AND {}.base_id = ", alias)).push_bind(*base);
                qb.push(format!(" AND {}.equipe_id = ", alias)).push_bind(*equipe);
            }
            Scope::Nothing => {
                qb.push(" AND FALSE");
            }
        }
    }
}

/// Verifica a matriz e devolve o escopo de linhas do usuário.
pub fn check(user: &User, resource: Resource, operation: Operation) -> Result<Scope, AppError> {
    if !authorize(user.role, resource, operation).is_allowed() {
        return Err(AppError::denied(resource.as_str(), None));
    }
    Ok(Scope::for_user(user))
}

/// Verifica a matriz e se a linha alvo está no escopo do usuário.
pub fn check_row(
    user: &User,
    resource: Resource,
    operation: Operation,
    target_id: Uuid,
    base_id: Uuid,
    equipe_id: Uuid,
) -> Result<Scope, AppError> {
    let scope = check(user, resource, operation)
        .map_err(|_| AppError::denied(resource.as_str(), Some(target_id)))?;
    if !scope.permits(base_id, equipe_id) {
        return Err(AppError::denied(resource.as_str(), Some(target_id)));
    }
    Ok(scope)
}

// =============================================================================
//  LANÇAMENTOS: EDIÇÃO E EXCLUSÃO
// =============================================================================

/// Regra de edição/exclusão de um lançamento já existente.
/// Gerente Geral altera qualquer um; Chefe de Equipe só os da própria equipe
/// e, se houver janela configurada, só os de até `edit_window_days` dias atrás.
pub fn can_modify_lancamento(
    user: &User,
    operation: Operation,
    base_id: Uuid,
    equipe_id: Uuid,
    data_referencia: NaiveDate,
    today: NaiveDate,
    edit_window_days: Option<i64>,
) -> bool {
    if !authorize(user.role, Resource::Lancamentos, operation).is_allowed() {
        return false;
    }
    if !Scope::for_user(user).permits(base_id, equipe_id) {
        return false;
    }
    match (user.role, edit_window_days) {
        (UserRole::Geral, _) | (_, None) => true,
        (_, Some(days)) => (today - data_referencia).num_days() <= days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: UserRole, base: Option<Uuid>, equipe: Option<Uuid>) -> User {
        User {
            id: Uuid::new_v4(),
            nome: "Teste".into(),
            email: "teste@indicadores.local".into(),
            password_hash: String::new(),
            role,
            base_id: base,
            equipe_id: equipe,
            ativo: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn authorize_is_deterministic() {
        for role in UserRole::ALL {
            for resource in Resource::ALL {
                for operation in Operation::ALL {
                    let first = authorize(role, resource, operation);
                    for _ in 0..3 {
                        assert_eq!(authorize(role, resource, operation), first);
                    }
                }
            }
        }
    }

    #[test]
    fn matrix_matches_roles() {
        use Operation::*;
        use Resource::*;

        for op in Operation::ALL {
            assert!(authorize(UserRole::Geral, Users, op).is_allowed());
            assert!(authorize(UserRole::Geral, Colaboradores, op).is_allowed());
            assert!(!authorize(UserRole::Chefe, Users, op).is_allowed());
            assert!(authorize(UserRole::Chefe, Colaboradores, op).is_allowed());
        }

        assert!(authorize(UserRole::Geral, Audit, Read).is_allowed());
        assert!(!authorize(UserRole::Geral, Audit, Delete).is_allowed());
        assert!(!authorize(UserRole::Chefe, Audit, Read).is_allowed());

        assert!(authorize(UserRole::Auxiliar, Lancamentos, Create).is_allowed());
        assert!(!authorize(UserRole::Auxiliar, Lancamentos, Update).is_allowed());
        assert!(!authorize(UserRole::GerenteSci, Colaboradores, Create).is_allowed());
        assert!(!authorize(UserRole::Chefe, Bases, Create).is_allowed());
        assert!(!authorize(UserRole::Auxiliar, Feedback, Update).is_allowed());
    }

    #[test]
    fn scope_follows_placement() {
        let base = Uuid::new_v4();
        let equipe = Uuid::new_v4();
        let outra_equipe = Uuid::new_v4();

        let chefe = user(UserRole::Chefe, Some(base), Some(equipe));
        let scope = Scope::for_user(&chefe);
        assert!(scope.permits(base, equipe));
        assert!(!scope.permits(base, outra_equipe));

        let sci = user(UserRole::GerenteSci, Some(base), None);
        assert!(Scope::for_user(&sci).permits(base, outra_equipe));

        let sem_lotacao = user(UserRole::Chefe, Some(base), None);
        assert_eq!(Scope::for_user(&sem_lotacao), Scope::Nothing);
    }

    #[test]
    fn chefe_cannot_touch_other_team_row() {
        let base = Uuid::new_v4();
        let chefe = user(UserRole::Chefe, Some(base), Some(Uuid::new_v4()));
        let target = Uuid::new_v4();

        let err = check_row(&chefe, Resource::Colaboradores, Operation::Update, target, base, Uuid::new_v4())
            .unwrap_err();
        match err {
            AppError::AccessDenied { resource, target_id } => {
                assert_eq!(resource, "colaboradores");
                assert_eq!(target_id, Some(target));
            }
            other => panic!("esperava AccessDenied, veio {:?}", other),
        }
    }

    #[test]
    fn ensure_filter_rejects_foreign_team() {
        let base = Uuid::new_v4();
        let equipe = Uuid::new_v4();
        let scope = Scope::Team { base, equipe };

        assert!(scope.ensure_filter(Resource::Lancamentos, None, None).is_ok());
        assert!(scope.ensure_filter(Resource::Lancamentos, Some(base), Some(equipe)).is_ok());
        assert!(scope.ensure_filter(Resource::Lancamentos, None, Some(Uuid::new_v4())).is_err());
        assert!(scope.ensure_filter(Resource::Lancamentos, Some(Uuid::new_v4()), None).is_err());
        assert!(Scope::All.ensure_filter(Resource::Lancamentos, Some(Uuid::new_v4()), None).is_ok());
    }

    #[test]
    fn predicate_is_pushed_with_binds() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT l.id FROM lancamentos l WHERE TRUE");
        Scope::Team { base: Uuid::new_v4(), equipe: Uuid::new_v4() }.push_predicate(&mut qb, "l");
        assert_eq!(
            qb.sql(),
            "SELECT l.id FROM lancamentos l WHERE TRUE AND l.base_id = $1 AND l.equipe_id = $2"
        );

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        Scope::Nothing.push_predicate(&mut qb, "l");
        assert_eq!(qb.sql(), "SELECT 1 WHERE TRUE AND FALSE");
    }

    #[test]
    fn edit_window_applies_to_chefe_only() {
        let base = Uuid::new_v4();
        let equipe = Uuid::new_v4();
        let today = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let old = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

        let chefe = user(UserRole::Chefe, Some(base), Some(equipe));
        let geral = user(UserRole::Geral, None, None);
        let auxiliar = user(UserRole::Auxiliar, Some(base), Some(equipe));

        assert!(can_modify_lancamento(&chefe, Operation::Update, base, equipe, today, today, Some(30)));
        assert!(!can_modify_lancamento(&chefe, Operation::Update, base, equipe, old, today, Some(30)));
        assert!(can_modify_lancamento(&chefe, Operation::Delete, base, equipe, old, today, None));
        assert!(can_modify_lancamento(&geral, Operation::Delete, base, equipe, old, today, Some(30)));
        assert!(!can_modify_lancamento(&auxiliar, Operation::Update, base, equipe, today, today, None));
        assert!(!can_modify_lancamento(&chefe, Operation::Update, base, Uuid::new_v4(), today, today, None));
    }
}
