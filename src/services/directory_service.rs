// src/services/directory_service.rs

use std::collections::HashMap;

use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{AppError, FieldErrors},
    db::DirectoryRepository,
    models::{
        audit::NewAuditRecord,
        auth::User,
        directory::{
            Base, BatchCreateColaboradoresPayload, BatchDeletePayload, BatchResult, Colaborador,
            ColaboradorFilters, CreateBasePayload, CreateColaboradorPayload, CreateEquipePayload, Equipe,
            UpdateBasePayload, UpdateColaboradorPayload, UpdateEquipePayload,
        },
    },
    services::{
        access::{self, Operation, Resource},
        audit_service::AuditService,
    },
};

const EQUIPE_FORA_DA_BASE: &str = "colaboradores_equipe_fk";

#[derive(Clone)]
pub struct DirectoryService {
    directory_repo: DirectoryRepository,
    audit_service: AuditService,
}

impl DirectoryService {
    pub fn new(directory_repo: DirectoryRepository, audit_service: AuditService) -> Self {
        Self {
            directory_repo,
            audit_service,
        }
    }

    // =========================================================================
    //  BASES
    // =========================================================================

    pub async fn list_bases(&self, conn: &mut PgConnection, actor: &User) -> Result<Vec<Base>, AppError> {
        access::check(actor, Resource::Bases, Operation::Read)?;
        self.directory_repo.list_bases(conn).await
    }

    pub async fn get_base(&self, conn: &mut PgConnection, actor: &User, id: Uuid) -> Result<Base, AppError> {
        access::check(actor, Resource::Bases, Operation::Read)?;
        self.directory_repo
            .find_base(conn, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("bases".into()))
    }

    pub async fn create_base(&self, conn: &mut PgConnection, actor: &User, payload: CreateBasePayload) -> Result<Base, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "bases.create", "bases").detail(json!({ "nome": payload.nome }));
        let result: Result<Base, AppError> = async {
            access::check(actor, Resource::Bases, Operation::Create)?;
            payload.validate()?;
            self.directory_repo
                .create_base(&mut *conn, &payload.nome, payload.localizacao.as_deref())
                .await
        }
        .await;
        self.audit_service.track(conn, record, result, |b| Some(b.id)).await
    }

    pub async fn update_base(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        id: Uuid,
        payload: UpdateBasePayload,
    ) -> Result<Base, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "bases.update", "bases").target(Some(id));
        let result: Result<Base, AppError> = async {
            access::check(actor, Resource::Bases, Operation::Update)?;
            payload.validate()?;
            let current = self
                .directory_repo
                .find_base(&mut *conn, id)
                .await?
                .ok_or_else(|| AppError::ResourceNotFound("bases".into()))?;

            let nome = payload.nome.as_deref().unwrap_or(&current.nome);
            let localizacao = payload.localizacao.as_deref().or(current.localizacao.as_deref());
            self.directory_repo
                .update_base(&mut *conn, id, nome, localizacao)
                .await?
                .ok_or_else(|| AppError::ResourceNotFound("bases".into()))
        }
        .await;
        self.audit_service.track(conn, record, result, |b| Some(b.id)).await
    }

    pub async fn delete_base(&self, conn: &mut PgConnection, actor: &User, id: Uuid) -> Result<(), AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "bases.delete", "bases").target(Some(id));
        let result: Result<(), AppError> = async {
            access::check(actor, Resource::Bases, Operation::Delete)?;
            if !self.directory_repo.delete_base(&mut *conn, id).await? {
                return Err(AppError::ResourceNotFound("bases".into()));
            }
            Ok(())
        }
        .await;
        self.audit_service.track(conn, record, result, |_| None).await
    }

    // =========================================================================
    //  EQUIPES
    // =========================================================================

    pub async fn list_equipes(&self, conn: &mut PgConnection, actor: &User, base_id: Option<Uuid>) -> Result<Vec<Equipe>, AppError> {
        access::check(actor, Resource::Equipes, Operation::Read)?;
        self.directory_repo.list_equipes(conn, base_id).await
    }

    pub async fn get_equipe(&self, conn: &mut PgConnection, actor: &User, id: Uuid) -> Result<Equipe, AppError> {
        access::check(actor, Resource::Equipes, Operation::Read)?;
        self.directory_repo
            .find_equipe(conn, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("equipes".into()))
    }

    pub async fn create_equipe(&self, conn: &mut PgConnection, actor: &User, payload: CreateEquipePayload) -> Result<Equipe, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "equipes.create", "equipes")
            .detail(json!({ "nome": payload.nome, "baseId": payload.base_id }));
        let result: Result<Equipe, AppError> = async {
            access::check(actor, Resource::Equipes, Operation::Create)?;
            payload.validate()?;
            self.directory_repo
                .create_equipe(&mut *conn, &payload.nome, payload.base_id)
                .await
        }
        .await;
        self.audit_service.track(conn, record, result, |e| Some(e.id)).await
    }

    pub async fn update_equipe(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        id: Uuid,
        payload: UpdateEquipePayload,
    ) -> Result<Equipe, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "equipes.update", "equipes").target(Some(id));
        let result: Result<Equipe, AppError> = async {
            access::check(actor, Resource::Equipes, Operation::Update)?;
            payload.validate()?;
            self.directory_repo
                .update_equipe(&mut *conn, id, &payload.nome)
                .await?
                .ok_or_else(|| AppError::ResourceNotFound("equipes".into()))
        }
        .await;
        self.audit_service.track(conn, record, result, |e| Some(e.id)).await
    }

    pub async fn delete_equipe(&self, conn: &mut PgConnection, actor: &User, id: Uuid) -> Result<(), AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "equipes.delete", "equipes").target(Some(id));
        let result: Result<(), AppError> = async {
            access::check(actor, Resource::Equipes, Operation::Delete)?;
            if !self.directory_repo.delete_equipe(&mut *conn, id).await? {
                return Err(AppError::ResourceNotFound("equipes".into()));
            }
            Ok(())
        }
        .await;
        self.audit_service.track(conn, record, result, |_| None).await
    }

    // =========================================================================
    //  COLABORADORES
    // =========================================================================

    /// Localiza o colaborador e confere a lotação contra o escopo do usuário.
    /// Inexistente = 404; existe mas fora do escopo = 403.
    async fn authorize_colaborador(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        operation: Operation,
        id: Uuid,
    ) -> Result<(), AppError> {
        let (base_id, equipe_id) = self
            .directory_repo
            .colaborador_scope(conn, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("colaboradores".into()))?;
        access::check_row(actor, Resource::Colaboradores, operation, id, base_id, equipe_id)?;
        Ok(())
    }

    pub async fn list_colaboradores(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        filters: &ColaboradorFilters,
    ) -> Result<Vec<Colaborador>, AppError> {
        let scope = access::check(actor, Resource::Colaboradores, Operation::Read)?;
        scope.ensure_filter(Resource::Colaboradores, filters.base_id, filters.equipe_id)?;
        self.directory_repo.list_colaboradores(conn, &scope, filters).await
    }

    pub async fn get_colaborador(&self, conn: &mut PgConnection, actor: &User, id: Uuid) -> Result<Colaborador, AppError> {
        self.authorize_colaborador(&mut *conn, actor, Operation::Read, id).await?;
        self.directory_repo
            .find_colaborador(conn, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("colaboradores".into()))
    }

    pub async fn create_colaborador(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        payload: CreateColaboradorPayload,
    ) -> Result<Colaborador, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "colaboradores.create", "colaboradores")
            .detail(json!({ "baseId": payload.base_id, "equipeId": payload.equipe_id }));
        let result: Result<Colaborador, AppError> = async {
            let scope = access::check(actor, Resource::Colaboradores, Operation::Create)?;
            payload.validate()?;
            if !scope.permits(payload.base_id, payload.equipe_id) {
                return Err(AppError::denied(Resource::Colaboradores.as_str(), Some(payload.equipe_id)));
            }
            self.ensure_equipe_in_base(&mut *conn, payload.equipe_id, payload.base_id).await?;
            self.directory_repo.create_colaborador(&mut *conn, &payload).await
        }
        .await;
        self.audit_service.track(conn, record, result, |c| Some(c.id)).await
    }

    /// Criação em lote: valida todas as linhas e só grava se nenhuma tiver erro.
    pub async fn batch_create_colaboradores(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        payload: BatchCreateColaboradoresPayload,
    ) -> Result<BatchResult, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "colaboradores.batch_create", "colaboradores")
            .detail(json!({ "rows": payload.colaboradores.len() }));
        let result = self.batch_create_inner(&mut *conn, actor, &payload).await;
        self.audit_service.track(conn, record, result, |_| None).await
    }

    async fn batch_create_inner(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        payload: &BatchCreateColaboradoresPayload,
    ) -> Result<BatchResult, AppError> {
        let scope = access::check(actor, Resource::Colaboradores, Operation::Create)?;

        // 1. Campos de cada linha (colaboradores[i].campo)
        let mut errors: FieldErrors = payload.validate().err().map(Into::into).unwrap_or_default();

        // 2. Escopo e vínculo equipe/base de cada linha
        let equipe_ids: Vec<Uuid> = payload.colaboradores.iter().map(|c| c.equipe_id).collect();
        let equipes: HashMap<Uuid, Uuid> = self
            .directory_repo
            .equipe_bases(&mut *conn, &equipe_ids)
            .await?
            .into_iter()
            .collect();

        for (i, row) in payload.colaboradores.iter().enumerate() {
            let prefix = format!("colaboradores[{}]", i);
            if !scope.permits(row.base_id, row.equipe_id) {
                return Err(AppError::denied(Resource::Colaboradores.as_str(), Some(row.equipe_id)));
            }
            match equipes.get(&row.equipe_id) {
                None => errors.add(format!("{}.equipeId", prefix), "Equipe não encontrada."),
                Some(base) if *base != row.base_id => {
                    errors.add(format!("{}.equipeId", prefix), "A equipe não pertence à base informada.")
                }
                Some(_) => {}
            }
        }
        errors.into_result()?;

        // 3. Grava tudo na mesma transação
        let mut ids = Vec::with_capacity(payload.colaboradores.len());
        for row in &payload.colaboradores {
            ids.push(self.directory_repo.create_colaborador(&mut *conn, row).await?.id);
        }

        tracing::info!("👥 {} colaboradores criados em lote", ids.len());
        Ok(BatchResult { count: ids.len(), ids })
    }

    pub async fn update_colaborador(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        id: Uuid,
        payload: UpdateColaboradorPayload,
    ) -> Result<Colaborador, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "colaboradores.update", "colaboradores").target(Some(id));
        let result: Result<Colaborador, AppError> = async {
            self.authorize_colaborador(&mut *conn, actor, Operation::Update, id).await?;
            payload.validate()?;

            let mut colaborador = self
                .directory_repo
                .find_colaborador(&mut *conn, id)
                .await?
                .ok_or_else(|| AppError::ResourceNotFound("colaboradores".into()))?;

            if let Some(nome) = &payload.nome {
                colaborador.nome = nome.clone();
            }
            if let Some(email) = &payload.email {
                colaborador.email = Some(email.trim().to_string());
            }
            if let Some(funcao) = &payload.funcao {
                colaborador.funcao = Some(funcao.clone());
            }
            if let Some(ativo) = payload.ativo {
                colaborador.ativo = ativo;
            }
            colaborador.base_id = payload.base_id.unwrap_or(colaborador.base_id);
            colaborador.equipe_id = payload.equipe_id.unwrap_or(colaborador.equipe_id);

            // A nova lotação também precisa estar no escopo
            if !access::Scope::for_user(actor).permits(colaborador.base_id, colaborador.equipe_id) {
                return Err(AppError::denied(Resource::Colaboradores.as_str(), Some(id)));
            }
            self.ensure_equipe_in_base(&mut *conn, colaborador.equipe_id, colaborador.base_id)
                .await?;

            self.directory_repo
                .update_colaborador(&mut *conn, &colaborador)
                .await?
                .ok_or_else(|| AppError::ResourceNotFound("colaboradores".into()))
        }
        .await;
        self.audit_service.track(conn, record, result, |c| Some(c.id)).await
    }

    pub async fn delete_colaborador(&self, conn: &mut PgConnection, actor: &User, id: Uuid) -> Result<(), AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "colaboradores.delete", "colaboradores").target(Some(id));
        let result: Result<(), AppError> = async {
            self.authorize_colaborador(&mut *conn, actor, Operation::Delete, id).await?;
            if !self.directory_repo.delete_colaborador(&mut *conn, id).await? {
                return Err(AppError::ResourceNotFound("colaboradores".into()));
            }
            Ok(())
        }
        .await;
        self.audit_service.track(conn, record, result, |_| None).await
    }

    /// Exclusão em lote: tudo ou nada.
    pub async fn batch_delete_colaboradores(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        payload: BatchDeletePayload,
    ) -> Result<BatchResult, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "colaboradores.batch_delete", "colaboradores")
            .detail(json!({ "ids": payload.ids }));
        let result: Result<BatchResult, AppError> = async {
            access::check(actor, Resource::Colaboradores, Operation::Delete)?;
            payload.validate()?;

            let mut ids = payload.ids.clone();
            ids.sort();
            ids.dedup();
            for id in &ids {
                self.authorize_colaborador(&mut *conn, actor, Operation::Delete, *id).await?;
            }

            let deleted = self.directory_repo.delete_colaboradores(&mut *conn, &ids).await?;
            if deleted as usize != ids.len() {
                return Err(AppError::ResourceNotFound("colaboradores".into()));
            }
            Ok(BatchResult { count: ids.len(), ids })
        }
        .await;
        self.audit_service.track(conn, record, result, |_| None).await
    }

    async fn ensure_equipe_in_base(&self, conn: &mut PgConnection, equipe_id: Uuid, base_id: Uuid) -> Result<(), AppError> {
        let pairs = self.directory_repo.equipe_bases(conn, &[equipe_id]).await?;
        match pairs.first() {
            Some((_, equipe_base)) if *equipe_base == base_id => Ok(()),
            _ => Err(AppError::ReferentialIntegrity(EQUIPE_FORA_DA_BASE.into())),
        }
    }
}
