// tests/api_flow.rs
//
// Fluxos ponta a ponta contra um Postgres real.
// Rodam só quando TEST_DATABASE_URL está definida; sem ela cada teste é ignorado.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use indicadores_backend::{
    build_router,
    config::{AppState, Config},
};

const ADMIN_EMAIL: &str = "gerente.teste@indicadores.local";
const ADMIN_PASSWORD: &str = "senha-admin-teste";

struct TestApp {
    router: Router,
    admin_token: String,
}

async fn setup() -> Option<TestApp> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL não definida; teste ignorado");
        return None;
    };

    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some(database_url.clone()),
        "JWT_SECRET" => Some("segredo-de-teste-bem-longo".into()),
        "BCRYPT_COST" => Some("4".into()),
        "EDIT_WINDOW_DAYS" => Some("30".into()),
        _ => None,
    })
    .unwrap();
    let bcrypt_cost = config.bcrypt_cost;

    let app_state = AppState::new(config).await.unwrap();
    sqlx::migrate!().run(&app_state.db_pool).await.unwrap();

    // Testes paralelos podem disputar o bootstrap; quem perder só faz login
    let _ = app_state
        .auth_service
        .bootstrap_admin(ADMIN_EMAIL, ADMIN_PASSWORD, bcrypt_cost)
        .await;

    let router = build_router(app_state);
    let admin_token = login(&router, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    Some(TestApp { router, admin_token })
}

async fn call(router: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(router: &Router, email: &str, password: &str) -> String {
    let (status, body) = call(
        router,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login falhou: {}", body);
    body["access_token"].as_str().unwrap().to_string()
}

fn id_of(body: &Value) -> String {
    body["id"].as_str().unwrap().to_string()
}

fn unique(prefix: &str) -> String {
    format!("{} {}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

async fn create_base_and_equipe(app: &TestApp) -> (String, String) {
    let token = Some(app.admin_token.as_str());
    let (status, base) = call(
        &app.router,
        Method::POST,
        "/api/bases",
        token,
        Some(json!({ "nome": unique("Base"), "localizacao": "Aeroporto de teste" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", base);

    let (status, equipe) = call(
        &app.router,
        Method::POST,
        "/api/equipes",
        token,
        Some(json!({ "nome": unique("Equipe"), "baseId": base["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", equipe);

    (id_of(&base), id_of(&equipe))
}

fn days_ago(days: i64) -> String {
    (Utc::now().date_naive() - Duration::days(days)).format("%Y-%m-%d").to_string()
}

/// Cria um Chefe lotado na equipe e devolve (email, token).
async fn create_chefe(app: &TestApp, base_id: &str, equipe_id: &str) -> (String, String) {
    let email = format!("chefe.{}@indicadores.local", Uuid::new_v4().simple());
    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/users",
        Some(&app.admin_token),
        Some(json!({
            "nome": "Chefe de Teste",
            "email": email,
            "password": "senha-do-chefe",
            "role": "chefe",
            "baseId": base_id,
            "equipeId": equipe_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let token = login(&app.router, &email, "senha-do-chefe").await;
    (email, token)
}

async fn submit_trocas(app: &TestApp, token: &str, base_id: &str, equipe_id: &str, date: &str) -> String {
    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/lancamentos/controle_trocas",
        Some(token),
        Some(json!({
            "dataReferencia": date,
            "baseId": base_id,
            "equipeId": equipe_id,
            "conteudo": { "qtd_trocas": 2 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    id_of(&body)
}

#[tokio::test]
async fn directory_crud_round_trip() {
    let Some(app) = setup().await else { return };
    let token = Some(app.admin_token.as_str());
    let (base_id, equipe_id) = create_base_and_equipe(&app).await;

    // Cria
    let (status, colaborador) = call(
        &app.router,
        Method::POST,
        "/api/colaboradores",
        token,
        Some(json!({ "nome": "Ana Lima", "baseId": base_id, "equipeId": equipe_id, "funcao": "BA-CE" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", colaborador);
    let colaborador_id = id_of(&colaborador);

    // Atualiza
    let (status, updated) = call(
        &app.router,
        Method::PUT,
        &format!("/api/colaboradores/{}", colaborador_id),
        token,
        Some(json!({ "nome": "Ana Lima Souza", "email": "ana.souza@indicadores.local" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["nome"], "Ana Lima Souza");
    assert_eq!(updated["email"], "ana.souza@indicadores.local");

    // Lista filtrada por base e equipe
    let (status, list) = call(
        &app.router,
        Method::GET,
        &format!("/api/colaboradores?base_id={}&equipe_id={}", base_id, equipe_id),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = list.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["nome"], "Ana Lima Souza");
    assert_eq!(rows[0]["email"], "ana.souza@indicadores.local");
    assert_eq!(rows[0]["equipeId"], equipe_id.as_str());

    // Exclui e some
    let uri = format!("/api/colaboradores/{}", colaborador_id);
    let (status, _) = call(&app.router, Method::DELETE, &uri, token, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = call(&app.router, Method::GET, &uri, token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn batch_create_is_all_or_nothing() {
    let Some(app) = setup().await else { return };
    let token = Some(app.admin_token.as_str());
    let (base_id, equipe_id) = create_base_and_equipe(&app).await;

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/colaboradores/batch",
        token,
        Some(json!({ "colaboradores": [
            { "nome": "Bruno Costa", "baseId": base_id, "equipeId": equipe_id },
            { "nome": "C", "baseId": base_id, "equipeId": equipe_id },
            { "nome": "Daniela Reis", "baseId": base_id, "equipeId": equipe_id }
        ] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["details"]["colaboradores[1].nome"].is_array(), "{}", body);

    let (_, list) = call(
        &app.router,
        Method::GET,
        &format!("/api/colaboradores?base_id={}", base_id),
        token,
        None,
    )
    .await;
    assert_eq!(list.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn repeated_entries_are_kept_and_paginated_without_duplicates() {
    let Some(app) = setup().await else { return };
    let token = Some(app.admin_token.as_str());
    let (base_id, equipe_id) = create_base_and_equipe(&app).await;
    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();

    // Mesmo tipo, mesma data, mesma base: nada é sobrescrito
    for i in 0..25 {
        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/lancamentos/controle_trocas",
            token,
            Some(json!({
                "dataReferencia": today,
                "baseId": base_id,
                "equipeId": equipe_id,
                "conteudo": { "qtd_trocas": i }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    let history = |page: u32| {
        format!(
            "/api/history?indicator=controle_trocas&base={}&page={}&pageSize=20",
            base_id, page
        )
    };
    let (status, first) = call(&app.router, Method::GET, &history(1), token, None).await;
    assert_eq!(status, StatusCode::OK, "{}", first);
    assert_eq!(first["totalCount"], 25);
    assert!(first["nextCursor"].is_string());

    let (_, second) = call(&app.router, Method::GET, &history(2), token, None).await;

    let mut ids: Vec<String> = first["records"]
        .as_array()
        .unwrap()
        .iter()
        .chain(second["records"].as_array().unwrap())
        .map(id_of)
        .collect();
    assert_eq!(ids.len(), 25);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 25);

    // O painel conta todos os lançamentos repetidos
    let (status, dashboard) = call(
        &app.router,
        Method::GET,
        &format!("/api/analytics/dashboard?base={}", base_id),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", dashboard);
    assert_eq!(dashboard["kpis"]["totalLancamentos"], 25);
}

#[tokio::test]
async fn chefe_cannot_touch_another_team() {
    let Some(app) = setup().await else { return };
    let token = Some(app.admin_token.as_str());
    let (base_id, equipe_a) = create_base_and_equipe(&app).await;

    let (status, equipe_b) = call(
        &app.router,
        Method::POST,
        "/api/equipes",
        token,
        Some(json!({ "nome": unique("Equipe B"), "baseId": base_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let equipe_b = id_of(&equipe_b);

    let chefe_email = format!("chefe.{}@indicadores.local", Uuid::new_v4().simple());
    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/users",
        token,
        Some(json!({
            "nome": "Chefe Equipe A",
            "email": chefe_email,
            "password": "senha-do-chefe",
            "role": "chefe",
            "baseId": base_id,
            "equipeId": equipe_a
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, outsider) = call(
        &app.router,
        Method::POST,
        "/api/colaboradores",
        token,
        Some(json!({ "nome": "Eduardo Nunes", "baseId": base_id, "equipeId": equipe_b })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let outsider_id = id_of(&outsider);

    let (status, entry) = call(
        &app.router,
        Method::POST,
        "/api/lancamentos/controle_trocas",
        token,
        Some(json!({
            "dataReferencia": Utc::now().date_naive().format("%Y-%m-%d").to_string(),
            "baseId": base_id,
            "equipeId": equipe_b,
            "conteudo": { "qtd_trocas": 1 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", entry);
    let entry_id = id_of(&entry);

    let chefe_token = login(&app.router, &chefe_email, "senha-do-chefe").await;
    let chefe = Some(chefe_token.as_str());

    let (status, body) = call(
        &app.router,
        Method::PUT,
        &format!("/api/colaboradores/{}", outsider_id),
        chefe,
        Some(json!({ "nome": "Nome Alterado" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);
    assert_eq!(body["code"], "ACCESS_DENIED");

    let (status, _) = call(
        &app.router,
        Method::DELETE,
        &format!("/api/lancamentos/{}", entry_id),
        chefe,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Rotas exclusivas do Gerente Geral
    let (status, _) = call(&app.router, Method::GET, "/api/audit", chefe, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Nada mudou
    let (_, still) = call(
        &app.router,
        Method::GET,
        &format!("/api/colaboradores/{}", outsider_id),
        token,
        None,
    )
    .await;
    assert_eq!(still["nome"], "Eduardo Nunes");
}

#[tokio::test]
async fn invalid_profile_update_changes_nothing() {
    let Some(app) = setup().await else { return };
    let token = Some(app.admin_token.as_str());

    let (status, before) = call(&app.router, Method::GET, "/api/user/settings/profile", token, None).await;
    assert_eq!(status, StatusCode::OK, "{}", before);

    let (status, body) = call(
        &app.router,
        Method::PUT,
        "/api/user/settings/profile",
        token,
        Some(json!({ "nome": "Outro Nome", "email": "invalid-email-format" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert!(body["details"]["email"].is_array(), "{}", body);

    let (_, after) = call(&app.router, Method::GET, "/api/user/settings/profile", token, None).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let Some(app) = setup().await else { return };
    let token = login(&app.router, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, me) = call(&app.router, Method::GET, "/api/auth/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user_metadata"]["role"], "geral");

    let (status, _) = call(&app.router, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app.router, Method::GET, "/api/auth/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Repetir o logout com o mesmo token continua sendo sucesso
    let (status, body) = call(&app.router, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT, "{}", body);
}

#[tokio::test]
async fn huge_page_number_is_an_empty_page() {
    let Some(app) = setup().await else { return };
    let token = Some(app.admin_token.as_str());

    for uri in [
        format!("/api/history?page={}", i64::MAX),
        format!("/api/audit?page={}&pageSize=100", i64::MAX),
    ] {
        let (status, body) = call(&app.router, Method::GET, &uri, token, None).await;
        assert_eq!(status, StatusCode::OK, "{}: {}", uri, body);
        assert_eq!(body["records"].as_array().map(Vec::len), Some(0), "{}", body);
    }
}

#[tokio::test]
async fn stale_update_is_a_conflict() {
    let Some(app) = setup().await else { return };
    let token = app.admin_token.clone();
    let (base_id, equipe_id) = create_base_and_equipe(&app).await;
    let id = submit_trocas(&app, &token, &base_id, &equipe_id, &days_ago(1)).await;
    let uri = format!("/api/lancamentos/{}", id);

    let (status, read) = call(&app.router, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", read);
    let seen = read["updatedAt"].clone();

    // Primeira edição com a versão lida: aplica
    let (status, body) = call(
        &app.router,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "conteudo": { "qtd_trocas": 5 }, "expectedUpdatedAt": seen })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    // Segunda com a mesma versão: já está velha
    let (status, body) = call(
        &app.router,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "conteudo": { "qtd_trocas": 9 }, "expectedUpdatedAt": seen })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
    assert_eq!(body["code"], "CONFLICT");

    let (_, after) = call(&app.router, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(after["conteudo"]["qtd_trocas"], 5);
}

#[tokio::test]
async fn batch_delete_with_missing_id_deletes_nothing() {
    let Some(app) = setup().await else { return };
    let token = Some(app.admin_token.as_str());
    let (base_id, equipe_id) = create_base_and_equipe(&app).await;

    let (status, survivor) = call(
        &app.router,
        Method::POST,
        "/api/colaboradores",
        token,
        Some(json!({ "nome": "Fernanda Alves", "baseId": base_id, "equipeId": equipe_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", survivor);
    let survivor_id = id_of(&survivor);

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/colaboradores/batch-delete",
        token,
        Some(json!({ "ids": [survivor_id, Uuid::new_v4()] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{}", body);

    let (status, _) = call(
        &app.router,
        Method::GET,
        &format!("/api/colaboradores/{}", survivor_id),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn delete_with_dependents_is_blocked() {
    let Some(app) = setup().await else { return };
    let token = app.admin_token.clone();
    let (base_id, equipe_id) = create_base_and_equipe(&app).await;

    // Base com equipe
    let (status, body) = call(&app.router, Method::DELETE, &format!("/api/bases/{}", base_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
    assert_eq!(body["code"], "REFERENTIAL_INTEGRITY");

    // Colaborador citado num lançamento
    let (status, colaborador) = call(
        &app.router,
        Method::POST,
        "/api/colaboradores",
        Some(&token),
        Some(json!({ "nome": "Gustavo Rocha", "baseId": base_id, "equipeId": equipe_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", colaborador);
    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/lancamentos/controle_trocas",
        Some(&token),
        Some(json!({
            "dataReferencia": days_ago(0),
            "baseId": base_id,
            "equipeId": equipe_id,
            "colaboradorId": colaborador["id"],
            "conteudo": { "qtd_trocas": 1 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let uri = format!("/api/colaboradores/{}", id_of(&colaborador));
    let (status, body) = call(&app.router, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
    assert_eq!(body["code"], "REFERENTIAL_INTEGRITY");

    let (status, _) = call(&app.router, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn chefe_edits_only_inside_the_window() {
    let Some(app) = setup().await else { return };
    let admin = app.admin_token.clone();
    let (base_id, equipe_id) = create_base_and_equipe(&app).await;
    let (_, chefe) = create_chefe(&app, &base_id, &equipe_id).await;

    let recent = submit_trocas(&app, &admin, &base_id, &equipe_id, &days_ago(5)).await;
    let old = submit_trocas(&app, &admin, &base_id, &equipe_id, &days_ago(60)).await;
    let change = json!({ "conteudo": { "qtd_trocas": 7 } });

    let (status, body) = call(
        &app.router,
        Method::PUT,
        &format!("/api/lancamentos/{}", recent),
        Some(&chefe),
        Some(change.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = call(
        &app.router,
        Method::PUT,
        &format!("/api/lancamentos/{}", old),
        Some(&chefe),
        Some(change),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);
    assert_eq!(body["code"], "ACCESS_DENIED");

    // O Gerente Geral não tem janela
    let (status, _) = call(
        &app.router,
        Method::PUT,
        &format!("/api/lancamentos/{}", old),
        Some(&admin),
        Some(json!({ "conteudo": { "qtd_trocas": 8 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deactivated_user_cannot_log_in() {
    let Some(app) = setup().await else { return };
    let (base_id, equipe_id) = create_base_and_equipe(&app).await;
    let (email, chefe_token) = create_chefe(&app, &base_id, &equipe_id).await;

    let (_, me) = call(&app.router, Method::GET, "/api/auth/user", Some(&chefe_token), None).await;
    let (status, body) = call(
        &app.router,
        Method::PUT,
        &format!("/api/users/{}", id_of(&me)),
        Some(&app.admin_token),
        Some(json!({ "ativo": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "senha-do-chefe" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);
    assert_eq!(body["code"], "ACCOUNT_INACTIVE");

    // A sessão aberta antes da desativação também deixa de valer
    let (status, _) = call(&app.router, Method::GET, "/api/auth/user", Some(&chefe_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
