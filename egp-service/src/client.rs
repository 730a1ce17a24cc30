//! Typed HTTP client for the users API
//!
//! # Example
//!
//! ```rust,ignore
//! use egp_service::client::UsersClient;
//! use egp_service::model::UserDto;
//!
//! let client = UsersClient::new("http://localhost:8080")?;
//! let created = client.create_user(&UserDto::new("ada", "ada@example.com")).await?;
//! let fetched = client.get_user(created.id.unwrap()).await?;
//! ```

use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

use crate::error::{Error, ErrorResponse, Result};
use crate::model::{UserDto, UserId};

/// Client for `/api/users`
#[derive(Debug, Clone)]
pub struct UsersClient {
    http: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl UsersClient {
    /// Create a client for a service root such as `http://localhost:8080`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self::with_client(http, base_url))
    }

    /// Use a preconfigured `reqwest::Client`
    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
        }
    }

    /// Send Basic credentials with every request
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/users{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((username, password)) => request.basic_auth(username, Some(password)),
            None => request,
        }
    }

    /// `GET /api/users`
    pub async fn list_users(&self) -> Result<Vec<UserDto>> {
        let response = self.authorize(self.http.get(self.url(""))).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// `GET /api/users/{id}`; `None` on 404
    pub async fn get_user(&self, id: UserId) -> Result<Option<UserDto>> {
        let response = self
            .authorize(self.http.get(self.url(&format!("/{}", id))))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response).await?.json().await?))
    }

    /// `POST /api/users`
    pub async fn create_user(&self, user: &UserDto) -> Result<UserDto> {
        let response = self
            .authorize(self.http.post(self.url("")))
            .json(user)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// `PUT /api/users/{id}`
    pub async fn update_user(&self, id: UserId, user: &UserDto) -> Result<UserDto> {
        let response = self
            .authorize(self.http.put(self.url(&format!("/{}", id))))
            .json(user)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// `DELETE /api/users/{id}`
    pub async fn delete_user(&self, id: UserId) -> Result<()> {
        let response = self
            .authorize(self.http.delete(self.url(&format!("/{}", id))))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Turn a non-success response into an error, keeping the server's message
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let realm = challenge_realm(response.headers());
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };

    Err(match status {
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::BAD_REQUEST => Error::BadRequest(message),
        StatusCode::UNPROCESSABLE_ENTITY => Error::ValidationError(message),
        StatusCode::UNAUTHORIZED => Error::unauthorized(realm, message),
        _ => Error::External(format!("{}: {}", status, message)),
    })
}

/// Realm named by a `WWW-Authenticate` challenge, empty when absent
fn challenge_realm(headers: &HeaderMap) -> String {
    headers
        .get(WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once("realm="))
        .and_then(|(_, rest)| match rest.trim_start().strip_prefix('"') {
            Some(quoted) => quoted.split('"').next(),
            None => rest.split(',').next(),
        })
        .map(|realm| realm.trim().to_string())
        .unwrap_or_default()
}
