//! Server-rendered shell: home page, about page and the HTML 404
//!
//! Pages are compiled askama templates under `templates/`. None of these
//! routes sit under `/api`, so they require Basic authentication.

use askama::Template;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Extension, Router,
};

use crate::auth::Principal;
use crate::model::{User, UserId};
use crate::repository::Repository;
use crate::state::AppState;

/// A template rendered as an HTML response with a status code
pub struct HtmlPage<T: Template> {
    template: T,
    status: StatusCode,
}

impl<T: Template> HtmlPage<T> {
    /// Render with 200 OK
    pub fn new(template: T) -> Self {
        Self {
            template,
            status: StatusCode::OK,
        }
    }

    /// Override the status code
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T: Template> IntoResponse for HtmlPage<T> {
    fn into_response(self) -> Response {
        match self.template.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(err) => {
                tracing::error!("Template rendering error: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomePage<'a> {
    app_name: &'a str,
    username: &'a str,
}

#[derive(Template)]
#[template(path = "about.html")]
struct AboutPage<'a> {
    app_name: &'a str,
    version: &'a str,
}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundPage<'a> {
    app_name: &'a str,
    path: &'a str,
}

/// Shell page routes
pub fn routes<R>() -> Router<AppState<R>>
where
    R: Repository<UserId, User> + 'static,
{
    Router::new()
        .route("/", get(home::<R>))
        .route("/about", get(about::<R>))
}

async fn home<R>(
    State(state): State<AppState<R>>,
    principal: Option<Extension<Principal>>,
) -> Response
where
    R: Repository<UserId, User> + 'static,
{
    let username = principal
        .as_ref()
        .map(|Extension(p)| p.username.as_str())
        .unwrap_or("anonymous");

    HtmlPage::new(HomePage {
        app_name: &state.config().shell.app_name,
        username,
    })
    .into_response()
}

async fn about<R>(State(state): State<AppState<R>>) -> Response
where
    R: Repository<UserId, User> + 'static,
{
    HtmlPage::new(AboutPage {
        app_name: &state.config().shell.app_name,
        version: env!("CARGO_PKG_VERSION"),
    })
    .into_response()
}

/// Catch-all for unknown paths
///
/// Renders the 404 page when the shell is enabled, otherwise a bare 404.
pub async fn not_found<R>(State(state): State<AppState<R>>, uri: Uri) -> Response
where
    R: Repository<UserId, User> + 'static,
{
    if !state.config().shell.enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    tracing::debug!(path = %uri.path(), "No route matched");
    HtmlPage::new(NotFoundPage {
        app_name: &state.config().shell.app_name,
        path: uri.path(),
    })
    .with_status(StatusCode::NOT_FOUND)
    .into_response()
}
