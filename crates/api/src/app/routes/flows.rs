use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
};

use gateflow_approvals::{ObjectRef, RevertShortcut, RevertTarget};
use gateflow_auth::Permission;
use gateflow_infra::SignRequest;

use crate::app::routes::common::{CmdAuth, actor_from, parse_flow_id, parse_user_id};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_flow))
        .route("/by-object/:object_type/:object_id", get(get_flow_by_object))
        .route("/:id", get(get_flow))
        .route("/:id/sign", post(sign))
        .route("/:id/revert", post(revert_to_checkpoint))
        .route("/:id/revert/previous", post(revert_to_previous))
        .route("/:id/revert/a", post(revert_to_a))
        .route("/:id/revert/b", post(revert_to_b))
        .route("/:id/cancel", post(cancel))
        .route(
            "/:id/checkpoints/:order/signatures/:user_id",
            delete(remove_signature),
        )
        .route("/:id/audit", get(audit_trail))
}

fn forbidden(e: gateflow_auth::AuthzError) -> axum::response::Response {
    errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
}

pub async fn create_flow(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateFlowRequest>,
) -> axum::response::Response {
    let cmd_auth = CmdAuth::new(body, Permission::FLOWS_CREATE);
    if let Err(e) =
        crate::authz::authorize_command(&tenant, &principal, services.policy(), &cmd_auth)
    {
        return forbidden(e);
    }
    let body = cmd_auth.inner;

    let object = ObjectRef::new(body.object_type, body.object_id);
    match services
        .engine()
        .create_flow(tenant.tenant_id(), object, &body.config_slug)
        .await
    {
        Ok(outcome) => {
            let status = if outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(dto::flow_to_json(&outcome.flow))).into_response()
        }
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_flow(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let flow_id = match parse_flow_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.engine().get_flow(tenant.tenant_id(), flow_id).await {
        Ok(flow) => (StatusCode::OK, Json(dto::flow_to_json(&flow))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_flow_by_object(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path((object_type, object_id)): Path<(String, String)>,
) -> axum::response::Response {
    let object = ObjectRef::new(object_type, object_id);
    match services
        .engine()
        .find_by_object(tenant.tenant_id(), &object)
        .await
    {
        Ok(Some(flow)) => (StatusCode::OK, Json(dto::flow_to_json(&flow))).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "flow_not_found",
            format!("document {object} has no approval flow"),
        ),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn sign(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<dto::SignRequest>,
) -> axum::response::Response {
    let flow_id = match parse_flow_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    // Signing needs no permission; officer eligibility is checked by the flow.
    let actor = actor_from(&principal, &headers);
    let request = SignRequest {
        checkpoint: body.checkpoint,
        notes: body.notes,
        substitute_confirmed: body.substitute_confirmed,
    };

    match services
        .engine()
        .sign(tenant.tenant_id(), flow_id, request, actor)
        .await
    {
        Ok(flow) => (StatusCode::OK, Json(dto::flow_to_json(&flow))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn revert_to_checkpoint(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<dto::RevertRequest>,
) -> axum::response::Response {
    let target = RevertTarget::Checkpoint(body.target_checkpoint);
    revert(services, tenant, principal, id, headers, target, body.reason).await
}

pub async fn revert_to_previous(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<dto::ReasonRequest>,
) -> axum::response::Response {
    revert(services, tenant, principal, id, headers, RevertTarget::Previous, body.reason).await
}

pub async fn revert_to_a(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<dto::ReasonRequest>,
) -> axum::response::Response {
    let target = RevertTarget::Shortcut(RevertShortcut::ToA);
    revert(services, tenant, principal, id, headers, target, body.reason).await
}

pub async fn revert_to_b(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<dto::ReasonRequest>,
) -> axum::response::Response {
    let target = RevertTarget::Shortcut(RevertShortcut::ToB);
    revert(services, tenant, principal, id, headers, target, body.reason).await
}

async fn revert(
    services: Arc<AppServices>,
    tenant: TenantContext,
    principal: PrincipalContext,
    id: String,
    headers: HeaderMap,
    target: RevertTarget,
    reason: String,
) -> axum::response::Response {
    let flow_id = match parse_flow_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    let cmd_auth = CmdAuth::new(target, Permission::FLOWS_REVERT);
    if let Err(e) =
        crate::authz::authorize_command(&tenant, &principal, services.policy(), &cmd_auth)
    {
        return forbidden(e);
    }

    let actor = actor_from(&principal, &headers);
    match services
        .engine()
        .revert(tenant.tenant_id(), flow_id, cmd_auth.inner, reason, actor)
        .await
    {
        Ok(flow) => (StatusCode::OK, Json(dto::flow_to_json(&flow))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn cancel(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<dto::ReasonRequest>,
) -> axum::response::Response {
    let flow_id = match parse_flow_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    let cmd_auth = CmdAuth::new(body, Permission::FLOWS_CANCEL);
    if let Err(e) =
        crate::authz::authorize_command(&tenant, &principal, services.policy(), &cmd_auth)
    {
        return forbidden(e);
    }

    let actor = actor_from(&principal, &headers);
    match services
        .engine()
        .cancel(tenant.tenant_id(), flow_id, cmd_auth.inner.reason, actor)
        .await
    {
        Ok(flow) => (StatusCode::OK, Json(dto::flow_to_json(&flow))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn remove_signature(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, order, user_id)): Path<(String, u32, String)>,
    headers: HeaderMap,
) -> axum::response::Response {
    let flow_id = match parse_flow_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let signer = match parse_user_id(&user_id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    let cmd_auth = CmdAuth::new(signer, Permission::SIGNATURES_REMOVE);
    if let Err(e) =
        crate::authz::authorize_command(&tenant, &principal, services.policy(), &cmd_auth)
    {
        return forbidden(e);
    }

    let actor = actor_from(&principal, &headers);
    match services
        .engine()
        .remove_signature(tenant.tenant_id(), flow_id, order, cmd_auth.inner, actor)
        .await
    {
        Ok(flow) => (StatusCode::OK, Json(dto::flow_to_json(&flow))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn audit_trail(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let flow_id = match parse_flow_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.engine().audit_trail(tenant.tenant_id(), flow_id).await {
        Ok(entries) => {
            let items = entries
                .iter()
                .map(dto::audit_entry_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::engine_error_to_response(e),
    }
}
