use super::handlers::{account, health, root};
use axum::response::{IntoResponse, Json};
use utoipa::{
    OpenApi,
    openapi::{Contact, Info, InfoBuilder, License},
};

/// Every documented route. Add new handlers to `paths(...)` so they show up in `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        health::health,
        account::register_form,
        account::register,
        account::login_form,
        account::login,
        account::logout,
        account::access_denied,
        account::session,
    ),
    components(schemas(
        account::types::FormView,
        account::types::AccessDeniedView,
        account::types::SessionResponse,
        account::Claim,
        account::ClaimKind,
        health::Health,
        root::Landing,
    )),
    tags(
        (name = "turnstile", description = "Landing view"),
        (name = "account", description = "Registration, login and cookie sessions"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info = cargo_info();
    doc
}

pub async fn openapi_json() -> impl IntoResponse {
    Json(openapi())
}

fn cargo_info() -> Info {
    // Use Cargo.toml metadata instead of the utoipa crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();
    info
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            spec.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Turnstile"));
            assert_eq!(contact.email.as_deref(), Some("team@turnstile.dev"));
        }

        let license = spec.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.name, "BSD-3-Clause");
        }
    }

    #[test]
    fn openapi_tags_and_paths() {
        let spec = openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "account"));
        for path in [
            "/",
            "/health",
            "/account/register",
            "/account/login",
            "/account/logout",
            "/account/access-denied",
            "/account/session",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Jane Doe <jane@example.com>"),
            (Some("Jane Doe"), Some("jane@example.com"))
        );
        assert_eq!(parse_author("Jane Doe"), (Some("Jane Doe"), None));
        assert_eq!(parse_author("<jane@example.com>"), (None, Some("jane@example.com")));
    }
}
