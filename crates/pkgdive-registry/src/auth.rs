//! Registry authentication challenges.
//!
//! Registries answer anonymous requests with `401` and a `WWW-Authenticate`
//! header naming either a `Basic` realm or a `Bearer` token service.

use serde::Deserialize;

/// Parsed `WWW-Authenticate` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    /// HTTP basic authentication.
    Basic,
    /// Token authentication against `realm`.
    Bearer {
        /// Token endpoint URL.
        realm: String,
        /// Service the token is issued for.
        service: Option<String>,
        /// Requested access scope.
        scope: Option<String>,
    },
}

/// Credential the client currently presents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    /// No `Authorization` header.
    #[default]
    Anonymous,
    /// Configured username and password.
    Basic,
    /// Token obtained from a bearer realm.
    Bearer(String),
}

/// Token endpoint response; registries use either field name.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

impl TokenResponse {
    /// Returns the issued token, if any.
    #[must_use]
    pub fn into_token(self) -> Option<String> {
        self.token
            .or(self.access_token)
            .filter(|t| !t.is_empty())
    }
}

/// Parses a `WWW-Authenticate` header value.
///
/// Returns `None` for unknown schemes or a bearer challenge without realm.
#[must_use]
pub fn parse_challenge(header: &str) -> Option<Challenge> {
    let header = header.trim();
    let (scheme, params) = header.split_once(' ').unwrap_or((header, ""));

    if scheme.eq_ignore_ascii_case("basic") {
        return Some(Challenge::Basic);
    }
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let mut realm = None;
    let mut service = None;
    let mut scope = None;
    for (key, value) in parse_params(params) {
        match key.to_ascii_lowercase().as_str() {
            "realm" => realm = Some(value),
            "service" => service = Some(value),
            "scope" => scope = Some(value),
            _ => {}
        }
    }

    Some(Challenge::Bearer {
        realm: realm?,
        service,
        scope,
    })
}

/// Splits `key="value", key2=value2` pairs; commas inside quotes are kept.
fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
            let _ = chars.next();
        }
        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        if key.is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            let _ = chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => value.extend(chars.next()),
                    '"' => break,
                    other => value.push(other),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',') {
                value.push(c);
            }
        }
        params.push((key.trim().to_string(), value.trim().to_string()));
    }

    params
}
