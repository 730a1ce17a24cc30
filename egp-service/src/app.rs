//! Router assembly
//!
//! Every service gets `/health` and `/ready`; the users API is nested under
//! `/api`, the shell pages are merged at the root, and Basic authentication
//! wraps all of it including the fallback.

use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::auth::PasswordHasher;
use crate::config::{Config, StorageBackend};
use crate::error::Result;
use crate::middleware::BasicAuth;
use crate::model::{User, UserId};
use crate::repository::{InMemoryUserRepository, Repository};
use crate::server::Server;
use crate::service::UserService;
use crate::state::AppState;
use crate::{api, health, web};

/// Build the complete application router
pub fn router<R>(state: AppState<R>) -> Router
where
    R: Repository<UserId, User> + 'static,
{
    let mut app = Router::new()
        .route("/health", get(health::health::<R>))
        .route("/ready", get(health::readiness::<R>))
        .nest("/api", api::routes::<R>());

    if state.config().shell.enabled {
        app = app.merge(web::routes::<R>());
    }

    app.fallback(web::not_found::<R>)
        .layer(from_fn_with_state(
            state.auth().clone(),
            BasicAuth::middleware,
        ))
        .with_state(state)
}

/// Build state for the configured backend and serve until shutdown
pub async fn run(config: Config) -> Result<()> {
    let hasher = PasswordHasher::new(&config.security.password)?;
    let auth = BasicAuth::new(&config.security, hasher.clone())?;

    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory user storage");
            serve(config, InMemoryUserRepository::new(), hasher, auth).await
        }
        StorageBackend::Postgres => serve_postgres(config, hasher, auth).await,
    }
}

#[cfg(feature = "database")]
async fn serve_postgres(config: Config, hasher: PasswordHasher, auth: BasicAuth) -> Result<()> {
    use crate::repository::PgUserRepository;

    let db_config = config.database.clone().ok_or_else(|| {
        figment::Error::from(
            "storage.backend = \"postgres\" requires a [database] section".to_string(),
        )
    })?;

    let pool = crate::database::create_pool(&db_config).await?;
    let repository = PgUserRepository::new(pool);
    repository.initialize().await?;

    tracing::info!("Using PostgreSQL user storage");
    serve(config, repository, hasher, auth).await
}

#[cfg(not(feature = "database"))]
async fn serve_postgres(_config: Config, _hasher: PasswordHasher, _auth: BasicAuth) -> Result<()> {
    Err(figment::Error::from(
        "storage.backend = \"postgres\" requires building with the `database` feature".to_string(),
    )
    .into())
}

async fn serve<R>(
    config: Config,
    repository: R,
    hasher: PasswordHasher,
    auth: BasicAuth,
) -> Result<()>
where
    R: Repository<UserId, User> + 'static,
{
    let users = UserService::new(repository, hasher);
    let state = AppState::new(config.clone(), users, auth);
    Server::new(config).serve(router(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::basic_header_value;
    use crate::model::UserDto;
    use crate::repository::InMemoryUserRepository;
    use crate::state::testing::{self, PASSWORD, USER};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    fn app() -> (Router, AppState<InMemoryUserRepository>) {
        let state = testing::state();
        (router(state.clone()), state)
    }

    fn request(method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    fn authed(method: Method, uri: &str) -> axum::http::request::Builder {
        request(method, uri).header(header::AUTHORIZATION, basic_header_value(USER, PASSWORD))
    }

    fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        request(method, uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_api_reachable_without_credentials() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::GET, "/api/users").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_shell_requires_credentials() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::GET, "/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"egp\""
        );
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let (app, _) = app();
        let response = app
            .oneshot(
                request(Method::GET, "/about")
                    .header(header::AUTHORIZATION, basic_header_value(USER, "wrong-pass"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_home_page_with_credentials() {
        let (app, _) = app();
        let response = app
            .oneshot(authed(Method::GET, "/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Legacy EGP Application"));
        assert!(html.contains("Signed in as user"));
    }

    #[tokio::test]
    async fn test_about_page() {
        let (app, _) = app();
        let response = app
            .oneshot(authed(Method::GET, "/about").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("/api/users"));
    }

    #[tokio::test]
    async fn test_unknown_path_renders_not_found_page() {
        let (app, _) = app();
        let response = app
            .oneshot(
                authed(Method::GET, "/no/such/page")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let html = body_text(response).await;
        assert!(html.contains("404"));
        assert!(html.contains("/no/such/page"));
    }

    #[tokio::test]
    async fn test_disabled_shell_yields_bare_not_found() {
        let mut config = testing::config();
        config.shell.enabled = false;
        let app = router(testing::state_with(config));

        let response = app
            .clone()
            .oneshot(authed(Method::GET, "/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_health_and_ready_are_public() {
        let (app, _) = app();
        for uri in ["/health", "/ready"] {
            let response = app
                .clone()
                .oneshot(request(Method::GET, uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let (app, _) = app();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/users",
                serde_json::json!({
                    "username": "ada",
                    "email": "ada@example.com",
                    "displayName": "Ada",
                    "password": "correct-horse"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/api/users/1"
        );
        let created = body_json(response).await;
        assert_eq!(created["id"], 1);
        assert!(created.get("password").is_none());
        assert!(created.get("passwordHash").is_none());

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/users/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, created);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                "/api/users/1",
                serde_json::json!({"username": "ada2", "email": "ada2@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["username"], "ada2");

        let response = app
            .clone()
            .oneshot(request(Method::DELETE, "/api/users/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/users/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_absent_is_no_content() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::DELETE, "/api/users/77").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_put_upserts_unknown_id() {
        let (app, state) = app();
        let response = app
            .oneshot(json_request(
                Method::PUT,
                "/api/users/10",
                serde_json::json!({"id": 3, "username": "grace", "email": "g@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], 10);

        let next = state
            .users()
            .create_user(UserDto::new("next", "n@example.com"))
            .await
            .unwrap();
        assert_eq!(next.id, Some(UserId::new(11)));
    }

    #[tokio::test]
    async fn test_put_at_max_id_then_create_conflicts() {
        let (app, _) = app();
        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/users/{}", i64::MAX),
                serde_json::json!({"username": "last", "email": "last@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], i64::MAX);

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/users",
                serde_json::json!({"username": "next", "email": "next@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_malformed_id_rejected() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::GET, "/api/users/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_short_password_is_unprocessable() {
        let (app, _) = app();
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/users",
                serde_json::json!({"username": "a", "email": "a@b.c", "password": "short"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
