//! HTTP server: Markdown routing in front of static files, with live reload

pub mod handler;
pub mod reload;

pub use handler::{MarkdownHandler, PageResponse, RoutePolicy, RENDER_NAMESPACE};
pub use reload::LiveReload;

use handler::GENERIC_ERROR;

use anyhow::Result;
use axum::{
    extract::{Request, State},
    handler::HandlerWithoutStateExt,
    http::{Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::Markfolio;

/// Shared state for the Markdown routes
pub struct ServerState {
    handler: MarkdownHandler,
    live_reload: Option<LiveReload>,
}

impl ServerState {
    fn respond(&self, page: PageResponse) -> Response {
        match &self.live_reload {
            Some(live) if page.is_ok() => {
                let body = live.inject(&page.body);
                PageResponse { body, ..page }.into_response()
            }
            _ => page.into_response(),
        }
    }
}

impl IntoResponse for PageResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status == StatusCode::OK {
            (status, Html(self.body)).into_response()
        } else {
            (status, self.body).into_response()
        }
    }
}

/// Router that tries Markdown documents first, then files under `public_dir`,
/// then answers 404
pub fn router(handler: MarkdownHandler, public_dir: &Path) -> Router {
    let state = Arc::new(ServerState {
        handler,
        live_reload: None,
    });
    build_router(state, public_dir)
}

/// Router where the Markdown handler is the only route and answers 404 itself
pub fn controller_router(handler: MarkdownHandler) -> Router {
    let state = Arc::new(ServerState {
        handler,
        live_reload: None,
    });
    Router::new()
        .fallback(markdown_controller)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_router(state: Arc<ServerState>, public_dir: &Path) -> Router {
    let static_files = ServeDir::new(public_dir).not_found_service(not_found.into_service());

    let mut app = Router::new();
    if state.live_reload.is_some() {
        app = app.route(reload::ROUTE, get(reload::socket_handler));
    }

    app.fallback_service(static_files)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            markdown_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(app: &Markfolio, ip: &str, port: u16, watch: bool) -> Result<()> {
    let handler = app.handler()?;
    let live_reload = watch.then(LiveReload::new);

    let state = Arc::new(ServerState {
        handler: handler.clone(),
        live_reload: live_reload.clone(),
    });
    let router = build_router(state, &app.public_dir);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Serving {} at http://{}:{}", app.content_dir.display(), ip, port);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if let Some(live) = live_reload {
        let dirs = vec![app.content_dir.clone(), app.views_dir.clone()];
        let repository = app.repository();
        std::thread::spawn(move || {
            let result = reload::watch(&dirs, |changed| {
                for path in changed {
                    println!("Changed: {}", path.display());
                }
                handler.clear_cache();
                repository.clear_cache();
                if let Err(e) = handler.views().reload() {
                    tracing::error!("Failed to reload views: {}", e);
                }
                let pages = live.notify();
                tracing::debug!("Reload sent to {} page(s)", pages);
            });
            if let Err(e) = result {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Middleware: answer with a Markdown page when one matches, otherwise pass on
async fn markdown_middleware(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return next.run(request).await;
    }

    let page = dispatch(&state.handler, request.uri().path()).await;
    match page {
        Some(page) => state.respond(page),
        None => next.run(request).await,
    }
}

/// Fallback handler that owns every path it is given
pub async fn markdown_controller(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    match dispatch(&state.handler, uri.path()).await {
        Some(page) => state.respond(page),
        None => PageResponse::not_found().into_response(),
    }
}

/// Decode the path and run the blocking handler off the async workers
async fn dispatch(handler: &MarkdownHandler, raw_path: &str) -> Option<PageResponse> {
    let path = match percent_decode_str(raw_path).decode_utf8() {
        Ok(path) => path.into_owned(),
        Err(e) => {
            tracing::debug!("Undecodable request path {}: {}", raw_path, e);
            return None;
        }
    };

    let worker = handler.clone();
    match tokio::task::spawn_blocking(move || worker.handle(&path)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Markdown handler panicked: {}", e);
            Some(PageResponse::error(GENERIC_ERROR))
        }
    }
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
