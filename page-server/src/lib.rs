//! Minimal page server.
//!
//! # Routes
//! - `GET /time`: current local time as text.
//! - `GET /name?firstname=..&lastname=..`, `POST /name` (form body): echoes
//!   `"<firstname> <lastname>"`.
//! - `GET /{page}`: a file from the public directory if one matches,
//!   otherwise the `<page>.html` template from the views directory, sent
//!   verbatim.

pub mod config;

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::debug;

pub use config::Config;

/// Where pages are read from.
#[derive(Debug, Clone)]
pub struct Pages {
    pub views_dir: PathBuf,
    pub public_dir: PathBuf,
}

impl From<&Config> for Pages {
    fn from(config: &Config) -> Self {
        Self {
            views_dir: config.views_dir.clone(),
            public_dir: config.public_dir.clone(),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct NameForm {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

type Shared = Arc<Pages>;

pub fn app(pages: Pages) -> Router {
    Router::new()
        .route("/time", get(time))
        .route("/name", get(name_from_query).post(name_from_form))
        .route("/{page}", get(page))
        .with_state(Arc::new(pages))
}

pub async fn run(listener: TcpListener, pages: Pages) -> Result<(), std::io::Error> {
    axum::serve(listener, app(pages)).await
}

async fn time() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string()
}

async fn name_from_query(Query(form): Query<NameForm>) -> Result<String, StatusCode> {
    full_name(form)
}

async fn name_from_form(Form(form): Form<NameForm>) -> Result<String, StatusCode> {
    full_name(form)
}

fn full_name(form: NameForm) -> Result<String, StatusCode> {
    match (form.firstname, form.lastname) {
        (Some(first), Some(last)) => Ok(format!("{first} {last}")),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

async fn page(State(pages): State<Shared>, Path(page): Path<String>) -> Result<Response, StatusCode> {
    if !is_page_name(&page) {
        return Err(StatusCode::NOT_FOUND);
    }

    let public = pages.public_dir.join(&page);
    if is_file(&public).await {
        debug!(%page, "serving public file");
        let bytes = tokio::fs::read(&public)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        return Ok(([(header::CONTENT_TYPE, content_type(&public))], bytes).into_response());
    }

    let template = pages.views_dir.join(format!("{page}.html"));
    match tokio::fs::read_to_string(&template).await {
        Ok(body) => {
            debug!(%page, "rendering template");
            Ok(Html(body).into_response())
        }
        Err(_) => {
            debug!(%page, "no such page");
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// A single path segment of `[A-Za-z0-9_.-]`, not starting with a dot.
fn is_page_name(page: &str) -> bool {
    !page.is_empty()
        && !page.starts_with('.')
        && page
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}

async fn is_file(path: &FsPath) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn content_type(path: &FsPath) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
