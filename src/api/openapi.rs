use super::handlers::{guest, health, models, upload};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Router for every documented endpoint.
///
/// Routes registered here through `routes!` are served and documented at
/// once. The gate itself and `OPTIONS /api/health` live outside the document.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(guest::guest))
        .routes(routes!(health::health))
        .routes(routes!(models::models))
        .routes(routes!(upload::upload));

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Guest session bootstrap".to_string());

    let mut chat_tag = Tag::new("chat");
    chat_tag.description = Some("Chat application edge endpoints".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Service health".to_string());

    router.get_openapi_mut().tags = Some(vec![auth_tag, chat_tag, health_tag]);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(non_empty(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact(env!("CARGO_PKG_AUTHORS"));
    info.license = non_empty(env!("CARGO_PKG_LICENSE")).map(|spdx| {
        let mut license = License::new(spdx);
        license.identifier = Some(spdx.to_string());
        license
    });

    OpenApiBuilder::new().info(info).build()
}

// Cargo joins authors with `:`; only the first one is published.
fn cargo_contact(authors: &str) -> Option<Contact> {
    let primary = non_empty(authors.split(':').next()?)?;

    let (name, email) = match primary.split_once('<') {
        Some((name, email)) => (non_empty(name), non_empty(email.trim_end_matches('>'))),
        None => (Some(primary), None),
    };
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Chatgate"));
            assert_eq!(contact.email.as_deref(), Some("team@chatgate.dev"));
        }

        let license = spec.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.identifier.as_deref(), Some("BSD-3-Clause"));
        }
    }

    #[test]
    fn openapi_tags_and_paths() {
        let spec = openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "auth"));
        for path in [
            "/api/auth/guest",
            "/api/health",
            "/api/models",
            "/api/files/upload",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn contact_without_email() {
        let contact = cargo_contact("Someone");
        assert_eq!(contact.and_then(|c| c.name).as_deref(), Some("Someone"));
        assert!(cargo_contact("   ").is_none());
    }
}
