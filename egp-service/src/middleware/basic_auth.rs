//! HTTP Basic authentication middleware
//!
//! Requests matching a permit rule pass straight through. Everything else
//! must carry `Authorization: Basic base64(user:password)` for the service
//! user, or is rejected with 401 and a `WWW-Authenticate` challenge.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use super::route_matcher::AccessRules;
use crate::auth::{PasswordHasher, Principal, ServiceUser};
use crate::config::SecurityConfig;
use crate::error::{Error, Result};

struct BasicAuthInner {
    realm: String,
    rules: AccessRules,
    user: ServiceUser,
    hasher: PasswordHasher,
}

/// Basic authentication middleware state
#[derive(Clone)]
pub struct BasicAuth {
    inner: Arc<BasicAuthInner>,
}

impl BasicAuth {
    /// Build the middleware from security configuration
    ///
    /// Compiles the permit list and hashes the service user's password.
    pub fn new(config: &SecurityConfig, hasher: PasswordHasher) -> Result<Self> {
        let rules = AccessRules::compile(config.permit.as_slice())?;
        let user = ServiceUser::from_config(&config.user, &hasher)?;

        tracing::debug!(
            realm = %config.realm,
            permit_rules = rules.len(),
            user = %user.name(),
            "Basic authentication configured"
        );

        Ok(Self {
            inner: Arc::new(BasicAuthInner {
                realm: config.realm.clone(),
                rules,
                user,
                hasher,
            }),
        })
    }

    /// Realm advertised in challenges
    pub fn realm(&self) -> &str {
        &self.inner.realm
    }

    /// Check credentials and produce the principal
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal> {
        let (username, password) = extract_basic_credentials(headers)
            .map_err(|reason| Error::unauthorized(&self.inner.realm, reason))?;

        // Argon2 verification is CPU-bound
        let auth = self.clone();
        let candidate = username.clone();
        let verified = tokio::task::spawn_blocking(move || {
            auth.inner
                .user
                .verify(&auth.inner.hasher, &candidate, &password)
        })
        .await??;

        if verified {
            Ok(Principal { username })
        } else {
            Err(Error::unauthorized(
                &self.inner.realm,
                format!("Bad credentials for '{}'", username),
            ))
        }
    }

    /// Middleware function for use with `axum::middleware::from_fn_with_state`
    pub async fn middleware(
        State(auth): State<Self>,
        mut request: Request<Body>,
        next: Next,
    ) -> Result<Response> {
        if let Some(rule) = auth
            .inner
            .rules
            .matching_rule(request.method(), request.uri().path())
        {
            tracing::trace!(path = %request.uri().path(), %rule, "Permitted without credentials");
            return Ok(next.run(request).await);
        }

        let principal = auth.authenticate(request.headers()).await?;
        request.extensions_mut().insert(principal);

        Ok(next.run(request).await)
    }
}

/// Extract `(username, password)` from a Basic `Authorization` header
///
/// The error is a reason for logs; callers turn it into a 401.
pub fn extract_basic_credentials(
    headers: &HeaderMap,
) -> std::result::Result<(String, String), &'static str> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or("Missing Authorization header")?;

    let (scheme, encoded) = auth_header
        .split_once(' ')
        .ok_or("Invalid Authorization header format")?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err("Authorization scheme is not Basic");
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| "Credentials are not valid base64")?;
    let decoded = String::from_utf8(decoded).map_err(|_| "Credentials are not valid UTF-8")?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or("Credentials are missing the ':' separator")?;

    Ok((username.to_string(), password.to_string()))
}

/// Encode a Basic `Authorization` header value
pub fn basic_header_value(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}
