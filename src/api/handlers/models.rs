use crate::catalog::{self, ChatModel, ProviderGroup};
use axum::{Json, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ModelCatalog {
    #[schema(value_type = String)]
    default_model: &'static str,
    #[schema(value_type = String)]
    title_model: &'static str,
    #[schema(value_type = String)]
    artifact_model: &'static str,
    models: Vec<ChatModel>,
    providers: Vec<ProviderGroup>,
}

#[utoipa::path(
    get,
    path = "/api/models",
    responses(
        (status = 200, description = "Available chat models", body = ModelCatalog)
    ),
    tag = "chat"
)]
pub async fn models() -> impl IntoResponse {
    Json(ModelCatalog {
        default_model: catalog::DEFAULT_CHAT_MODEL,
        title_model: catalog::TITLE_MODEL,
        artifact_model: catalog::ARTIFACT_MODEL,
        models: catalog::CHAT_MODELS.to_vec(),
        providers: catalog::by_provider(),
    })
}

#[cfg(test)]
mod tests {
    use super::models;
    use anyhow::Result;
    use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};

    #[tokio::test]
    async fn lists_catalog() -> Result<()> {
        let response = models().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(json["defaultModel"], "amazon.nova-lite-v1:0");
        assert_eq!(json["models"].as_array().map(Vec::len), Some(4));
        assert_eq!(json["providers"][0]["provider"], "anthropic");
        Ok(())
    }
}
