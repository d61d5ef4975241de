//! Chat model catalog.
//!
//! Static configuration only: the ids are inference-profile ids of the managed
//! model API and are handed to the UI as-is.

use serde::Serialize;
use utoipa::ToSchema;

pub const DEFAULT_CHAT_MODEL: &str = "amazon.nova-lite-v1:0";
pub const TITLE_MODEL: &str = "amazon.nova-lite-v1:0";
pub const ARTIFACT_MODEL: &str = "us.anthropic.claude-3-5-haiku-20241022-v1:0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChatModel {
    #[schema(value_type = String)]
    pub id: &'static str,
    #[schema(value_type = String)]
    pub name: &'static str,
    #[schema(value_type = String)]
    pub provider: &'static str,
    #[schema(value_type = String)]
    pub description: &'static str,
}

pub const CHAT_MODELS: [ChatModel; 4] = [
    ChatModel {
        id: "us.anthropic.claude-3-5-haiku-20241022-v1:0",
        name: "Claude 3.5 Haiku",
        provider: "anthropic",
        description: "Fast and affordable, great for everyday tasks",
    },
    ChatModel {
        id: "us.anthropic.claude-3-5-sonnet-20241022-v2:0",
        name: "Claude 3.5 Sonnet",
        provider: "anthropic",
        description: "Best balance of speed, intelligence, and cost",
    },
    ChatModel {
        id: "amazon.nova-lite-v1:0",
        name: "Amazon Nova Lite",
        provider: "amazon",
        description: "Fast and cost-effective for simple tasks",
    },
    ChatModel {
        id: "amazon.nova-pro-v1:0",
        name: "Amazon Nova Pro",
        provider: "amazon",
        description: "Capable Amazon model for complex tasks",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProviderGroup {
    #[schema(value_type = String)]
    pub provider: &'static str,
    pub models: Vec<ChatModel>,
}

#[must_use]
pub fn find(id: &str) -> Option<&'static ChatModel> {
    CHAT_MODELS.iter().find(|model| model.id == id)
}

/// Models grouped by provider, providers in first-seen order.
#[must_use]
pub fn by_provider() -> Vec<ProviderGroup> {
    let mut groups: Vec<ProviderGroup> = Vec::new();
    for model in CHAT_MODELS {
        match groups.iter_mut().find(|g| g.provider == model.provider) {
            Some(group) => group.models.push(model),
            None => groups.push(ProviderGroup {
                provider: model.provider,
                models: vec![model],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_models_are_in_catalog() {
        assert!(find(DEFAULT_CHAT_MODEL).is_some());
        assert!(find(TITLE_MODEL).is_some());
        assert!(find(ARTIFACT_MODEL).is_some());
        assert!(find("gpt-4").is_none());
    }

    #[test]
    fn ids_are_unique() {
        for (i, model) in CHAT_MODELS.iter().enumerate() {
            assert!(
                CHAT_MODELS[i + 1..].iter().all(|other| other.id != model.id),
                "duplicate id {}",
                model.id
            );
        }
    }

    #[test]
    fn grouping_keeps_order() {
        let groups = by_provider();
        let providers: Vec<_> = groups.iter().map(|g| g.provider).collect();
        assert_eq!(providers, vec!["anthropic", "amazon"]);
        assert_eq!(groups[0].models.len(), 2);
        assert_eq!(groups[1].models[0].id, "amazon.nova-lite-v1:0");
    }
}
