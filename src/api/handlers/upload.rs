use super::ErrorBody;
use crate::{api::AppState, gate::origin::RequestInfo};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
};
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/files/upload",
    responses(
        (status = 401, description = "No session", body = ErrorBody),
        (status = 501, description = "Uploads are disabled in this deployment", body = ErrorBody)
    ),
    tag = "chat"
)]
pub async fn upload(
    uri: Uri,
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
) -> impl IntoResponse {
    let info = RequestInfo::from_parts(&uri, &headers);
    let secure = state.gate().config().secure_cookie(&info);

    if state.gate().verifier().verify(&headers, secure).is_none() {
        return (StatusCode::UNAUTHORIZED, Json(ErrorBody::new("Unauthorized")));
    }

    (
        StatusCode::NOT_IMPLEMENTED,
        Json(ErrorBody::new(
            "File uploads are not supported in this deployment",
        )),
    )
}
