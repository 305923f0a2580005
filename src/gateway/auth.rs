use axum::http::{HeaderMap, HeaderValue, header};
use axum_extra::headers::{self, HeaderMapExt};

use crate::{
    config::Environment,
    secret::{Credential, SecretError},
};

/// Headers for a provider request. `json_body` adds the content type.
pub fn authenticated_headers(
    environment: Environment,
    credential: &Credential,
    json_body: bool,
) -> Result<HeaderMap, SecretError> {
    let mut auth = HeaderValue::from_str(&format!("Basic {}", credential.expose()))
        .map_err(|_| SecretError::UnexpectedFormat(environment))?;
    auth.set_sensitive(true);

    let mut map = HeaderMap::new();
    map.insert(header::AUTHORIZATION, auth);
    map.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    if json_body {
        map.typed_insert(headers::ContentType::json());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_header() {
        let credential = Credential::parse(Environment::Sandbox, "bWVtYmVyOmtleQ==").unwrap();
        let headers = authenticated_headers(Environment::Sandbox, &credential, true).unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Basic bWVtYmVyOmtleQ==");
        assert_eq!(headers[header::ACCEPT], "application/json");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn no_content_type_without_body() {
        let credential = Credential::parse(Environment::Sandbox, "key").unwrap();
        let headers = authenticated_headers(Environment::Sandbox, &credential, false).unwrap();
        assert!(headers.get(header::CONTENT_TYPE).is_none());
    }
}
