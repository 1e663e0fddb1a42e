use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;
use tracing::info;

use crate::fetcher::FetchService;
use crate::loader::{FeedLoader, LoadError};
use crate::menu::MenuController;
use crate::registry::FeedDescriptor;

/// Header title shown before any feed has loaded.
const DEFAULT_TITLE: &str = "Feeds";

pub struct AppState<F> {
    pub loader: FeedLoader<F>,
    pub menu: RwLock<MenuController>,
}

impl<F: FetchService + 'static> AppState<F> {
    pub fn new(loader: FeedLoader<F>) -> Self {
        Self {
            loader,
            menu: RwLock::new(MenuController::new()),
        }
    }
}

pub fn router<F: FetchService + 'static>(state: Arc<AppState<F>>) -> Router {
    Router::new()
        .route("/", get(index::<F>))
        .route("/feed", get(feed_fragment::<F>))
        .route("/feeds/:index", post(select_feed::<F>))
        .route("/menu/toggle", post(toggle_menu::<F>))
        .route("/health", get(health))
        .with_state(state)
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub title: &'a str,
    pub body_class: Option<&'static str>,
    pub feeds: &'a [FeedDescriptor],
    pub feed_html: &'a str,
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<LoadError>().is_some() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, format!("Error: {}", self.0)).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

// Route handlers
pub async fn index<F: FetchService + 'static>(
    State(state): State<Arc<AppState<F>>>,
) -> Result<impl IntoResponse, AppError> {
    let body_class = state.menu.read().await.marker();
    let container = state.loader.container().read().await;

    let html = IndexTemplate {
        title: container.title().unwrap_or(DEFAULT_TITLE),
        body_class,
        feeds: state.loader.registry().feeds(),
        feed_html: container.html(),
    }
    .render()?;

    Ok(Html(html))
}

pub async fn feed_fragment<F: FetchService + 'static>(
    State(state): State<Arc<AppState<F>>>,
) -> impl IntoResponse {
    let container = state.loader.container().read().await;
    Html(container.html().to_string())
}

pub async fn select_feed<F: FetchService + 'static>(
    State(state): State<Arc<AppState<F>>>,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.loader.load_feed(index)?;
    state.menu.write().await.hide();

    let outcome = handle.wait().await;
    info!("Feed selection finished: {:?}", outcome);

    Ok(Redirect::to("/"))
}

pub async fn toggle_menu<F: FetchService + 'static>(
    State(state): State<Arc<AppState<F>>>,
) -> impl IntoResponse {
    let menu_state = state.menu.write().await.toggle();
    info!("Menu is now {:?}", menu_state);
    Redirect::to("/")
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
