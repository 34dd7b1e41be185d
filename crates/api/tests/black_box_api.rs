use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use gateflow_api::app::services::AppServices;
use gateflow_approvals::TemplateRegistry;
use gateflow_auth::{JwtClaims, Role};
use gateflow_core::{TenantId, UserId};
use gateflow_infra::EngineSettings;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Same router as prod over in-memory services, bound to an ephemeral port.
        let services = AppServices::in_memory(TemplateRegistry::builtin(), EngineSettings::default());
        let app = gateflow_api::app::build_router(Arc::new(services), jwt_secret);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct User {
    id: UserId,
    token: String,
}

fn mint_jwt(jwt_secret: &str, tenant_id: TenantId, username: &str, roles: Vec<Role>) -> User {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        username: username.to_string(),
        tenant_id,
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt");

    User {
        id: claims.sub,
        token,
    }
}

async fn post(client: &reqwest::Client, url: String, user: &User, body: Value) -> reqwest::Response {
    client
        .post(url)
        .bearer_auth(&user.token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

const SECRET: &str = "test-secret";

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn(SECRET).await;

    let client = reqwest::Client::new();
    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Token signed with a different secret.
    let forged = mint_jwt("other-secret", TenantId::new(), "mallory", vec![Role::ADMIN]);
    let res = client
        .get(srv.url("/templates"))
        .bearer_auth(&forged.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tenant_context_is_derived_from_token() {
    let srv = TestServer::spawn(SECRET).await;

    let tenant_id = TenantId::new();
    let user = mint_jwt(SECRET, tenant_id, "ana.pop", vec![Role::ADMIN]);

    let client = reqwest::Client::new();
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["tenant_id"].as_str().unwrap(), tenant_id.to_string());
    assert_eq!(body["user_id"].as_str().unwrap(), user.id.to_string());
    assert_eq!(body["username"], "ana.pop");
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn templates_are_listed() {
    let srv = TestServer::spawn(SECRET).await;
    let user = mint_jwt(SECRET, TenantId::new(), "viewer", vec![]);
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/templates"))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 4);

    let res = client
        .get(srv.url("/templates/purchase_order"))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["checkpoints"].as_array().unwrap().len(), 3);

    let res = client
        .get(srv.url("/templates/nope"))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn purchase_order_lifecycle() {
    let srv = TestServer::spawn(SECRET).await;
    let tenant = TenantId::new();
    let manager = mint_jwt(SECRET, tenant, "manager", vec![Role::APPROVALS_MANAGER]);
    let economist = mint_jwt(SECRET, tenant, "economist", vec![Role::new("economist")]);
    let cfp = mint_jwt(SECRET, tenant, "cfp", vec![Role::new("cfp")]);
    let director = mint_jwt(SECRET, tenant, "director", vec![Role::new("director")]);
    let client = reqwest::Client::new();

    let create = json!({
        "object_type": "purchase_order",
        "object_id": "PO-2024-001",
        "config_slug": "purchase_order",
    });
    let res = post(&client, srv.url("/flows"), &manager, create.clone()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let flow: Value = res.json().await.unwrap();
    let id = flow["id"].as_str().unwrap().to_string();
    assert_eq!(flow["status"], "pending");
    assert_eq!(flow["active_checkpoint"], 1);

    // Creating again returns the same flow.
    let res = post(&client, srv.url("/flows"), &manager, create).await;
    assert_eq!(res.status(), StatusCode::OK);
    let again: Value = res.json().await.unwrap();
    assert_eq!(again["id"], flow["id"]);

    // The director cannot sign ahead of checkpoint A.
    let res = post(&client, srv.url(&format!("/flows/{id}/sign")), &director, json!({ "checkpoint": 3 })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "checkpoint_not_open");

    let res = client
        .post(srv.url(&format!("/flows/{id}/sign")))
        .bearer_auth(&economist.token)
        .header("x-forwarded-for", "10.1.2.3")
        .json(&json!({ "checkpoint": 1, "notes": "  prices checked  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let flow: Value = res.json().await.unwrap();
    assert_eq!(flow["status"], "in_progress");
    let sig = &flow["checkpoints"][0]["signatures"][0];
    assert_eq!(sig["notes"], "prices checked");
    assert_eq!(sig["username"], "economist");
    assert_eq!(sig["signature_hash"].as_str().unwrap().len(), 64);

    // Signing twice is rejected.
    let res = post(&client, srv.url(&format!("/flows/{id}/sign")), &economist, json!({ "checkpoint": 1 })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = post(&client, srv.url(&format!("/flows/{id}/sign")), &cfp, json!({ "checkpoint": 2 })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let flow: Value = res.json().await.unwrap();
    assert_eq!(flow["revert_shortcuts"], json!(["to_a", "to_b"]));

    let res = post(&client, srv.url(&format!("/flows/{id}/sign")), &director, json!({ "checkpoint": 3 })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let flow: Value = res.json().await.unwrap();
    assert_eq!(flow["status"], "completed");
    assert!(flow["completed_at"].is_string());

    let res = client
        .get(srv.url("/flows/by-object/purchase_order/PO-2024-001"))
        .bearer_auth(&economist.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/flows/{id}/audit")))
        .bearer_auth(&manager.token)
        .send()
        .await
        .unwrap();
    let audit: Value = res.json().await.unwrap();
    let items = audit["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["action"], "sign");
    assert_eq!(items[2]["resulting_status"], "completed");
}

#[tokio::test]
async fn revert_and_cancel_need_manager_role() {
    let srv = TestServer::spawn(SECRET).await;
    let tenant = TenantId::new();
    let manager = mint_jwt(SECRET, tenant, "manager", vec![Role::APPROVALS_MANAGER]);
    let economist = mint_jwt(SECRET, tenant, "economist", vec![Role::new("economist")]);
    let cfp = mint_jwt(SECRET, tenant, "cfp", vec![Role::new("cfp")]);
    let client = reqwest::Client::new();

    // Officers cannot start flows.
    let create = json!({
        "object_type": "purchase_order",
        "object_id": "PO-7",
        "config_slug": "purchase_order",
    });
    let res = post(&client, srv.url("/flows"), &economist, create.clone()).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = post(&client, srv.url("/flows"), &manager, create).await;
    let flow: Value = res.json().await.unwrap();
    let id = flow["id"].as_str().unwrap().to_string();

    post(&client, srv.url(&format!("/flows/{id}/sign")), &economist, json!({ "checkpoint": 1 })).await;
    post(&client, srv.url(&format!("/flows/{id}/sign")), &cfp, json!({ "checkpoint": 2 })).await;

    let res = post(&client, srv.url(&format!("/flows/{id}/revert/b")), &cfp, json!({ "reason": "typo" })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = post(&client, srv.url(&format!("/flows/{id}/revert")), &manager, json!({ "target_checkpoint": 1, "reason": "   " })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "reason_required");

    let res = post(&client, srv.url(&format!("/flows/{id}/revert/a")), &manager, json!({ "reason": "wrong supplier" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let flow: Value = res.json().await.unwrap();
    assert_eq!(flow["status"], "in_progress");
    assert_eq!(flow["active_checkpoint"], 2);
    assert!(flow["checkpoints"][1]["signatures"].as_array().unwrap().is_empty());

    let res = post(&client, srv.url(&format!("/flows/{id}/cancel")), &manager, json!({ "reason": "order withdrawn" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let flow: Value = res.json().await.unwrap();
    assert_eq!(flow["status"], "cancelled");
    assert_eq!(flow["cancellation"]["reason"], "order withdrawn");

    let res = post(&client, srv.url(&format!("/flows/{id}/sign")), &cfp, json!({ "checkpoint": 2 })).await;
    assert_eq!(res.status(), StatusCode::GONE);
}

#[tokio::test]
async fn only_admins_remove_signatures() {
    let srv = TestServer::spawn(SECRET).await;
    let tenant = TenantId::new();
    let admin = mint_jwt(SECRET, tenant, "admin", vec![Role::ADMIN]);
    let manager = mint_jwt(SECRET, tenant, "manager", vec![Role::APPROVALS_MANAGER]);
    let economist = mint_jwt(SECRET, tenant, "economist", vec![Role::new("economist")]);
    let client = reqwest::Client::new();

    let res = post(
        &client,
        srv.url("/flows"),
        &admin,
        json!({ "object_type": "purchase_order", "object_id": "PO-8", "config_slug": "purchase_order" }),
    )
    .await;
    let flow: Value = res.json().await.unwrap();
    let id = flow["id"].as_str().unwrap().to_string();
    post(&client, srv.url(&format!("/flows/{id}/sign")), &economist, json!({ "checkpoint": 1 })).await;

    let path = format!("/flows/{id}/checkpoints/1/signatures/{}", economist.id);
    let res = client
        .delete(srv.url(&path))
        .bearer_auth(&manager.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .delete(srv.url(&path))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let flow: Value = res.json().await.unwrap();
    assert_eq!(flow["status"], "pending");

    // Already gone.
    let res = client
        .delete(srv.url(&path))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tenant_isolation_blocks_cross_tenant_reads_and_writes() {
    let srv = TestServer::spawn(SECRET).await;
    let admin1 = mint_jwt(SECRET, TenantId::new(), "admin1", vec![Role::ADMIN]);
    let admin2 = mint_jwt(SECRET, TenantId::new(), "admin2", vec![Role::ADMIN]);
    let client = reqwest::Client::new();

    let res = post(
        &client,
        srv.url("/flows"),
        &admin1,
        json!({ "object_type": "requisition", "object_id": "R-1", "config_slug": "requisition" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let flow: Value = res.json().await.unwrap();
    let id = flow["id"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url(&format!("/flows/{id}")))
        .bearer_auth(&admin2.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = post(&client, srv.url(&format!("/flows/{id}/cancel")), &admin2, json!({ "reason": "mine now" })).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url("/flows/by-object/requisition/R-1"))
        .bearer_auth(&admin2.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url("/flows/not-a-uuid"))
        .bearer_auth(&admin1.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
