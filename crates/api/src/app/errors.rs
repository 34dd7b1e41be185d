use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use gateflow_approvals::ApprovalError;
use gateflow_core::{DomainError, ErrorKind};
use gateflow_infra::EngineError;

pub fn engine_error_to_response(err: EngineError) -> axum::response::Response {
    match err {
        EngineError::Rejected(e) => approval_error_to_response(e),
        EngineError::Conflict { .. } => {
            json_error(StatusCode::CONFLICT, "conflict", err.to_string())
        }
        EngineError::Timeout(_) => {
            json_error(StatusCode::GATEWAY_TIMEOUT, "timeout", err.to_string())
        }
        EngineError::Store(ref e) if err.kind() == Some(ErrorKind::NotFound) => {
            tracing::error!(error = %e, "tenant isolation violation");
            json_error(StatusCode::NOT_FOUND, "flow_not_found", "approval flow not found")
        }
        EngineError::Store(_) | EngineError::Audit(_) => {
            tracing::error!(error = %err, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal storage failure",
            )
        }
        EngineError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::TerminalState => StatusCode::GONE,
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let code = match err {
        DomainError::InvalidId(_) => "invalid_id",
    };
    json_error(status_for(err.kind()), code, err.to_string())
}

pub fn approval_error_to_response(err: ApprovalError) -> axum::response::Response {
    let status = status_for(err.kind());

    // The client needs to know whom it would be signing for.
    if let ApprovalError::ConfirmationRequired { on_behalf_of } = &err {
        return (
            status,
            axum::Json(json!({
                "error": err.code(),
                "message": err.to_string(),
                "on_behalf_of": on_behalf_of,
            })),
        )
            .into_response();
    }

    json_error(status, err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use gateflow_infra::flow_store::FlowStoreError;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (ApprovalError::ReasonRequired, StatusCode::BAD_REQUEST),
            (ApprovalError::NotAuthorized("x".into()), StatusCode::FORBIDDEN),
            (ApprovalError::FlowNotFound, StatusCode::NOT_FOUND),
            (ApprovalError::FlowAlreadyExists, StatusCode::CONFLICT),
            (ApprovalError::FlowCancelled, StatusCode::GONE),
        ];
        for (err, status) in cases {
            assert_eq!(engine_error_to_response(err.into()).status(), status);
        }
    }

    #[test]
    fn infrastructure_failures_are_opaque() {
        let res = engine_error_to_response(EngineError::Store(FlowStoreError::Backend(
            "password authentication failed".into(),
        )));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = engine_error_to_response(EngineError::Timeout(Duration::from_millis(5)));
        assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);

        let res = engine_error_to_response(EngineError::Conflict {
            attempts: 5,
            message: "stale".into(),
        });
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }
}
