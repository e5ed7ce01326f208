//! Browser refresh for `serve --watch`
//!
//! A watcher thread reports changed documents and views, the server drops
//! its caches, and every open page is told to reload over a WebSocket.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use tokio::sync::broadcast::{self, error::RecvError};

use super::ServerState;

/// Route the client script connects to
pub const ROUTE: &str = "/__livereload";

const RELOAD_MESSAGE: &str = "reload";

/// Reconnecting client, inserted before `</body>`
const CLIENT_SCRIPT: &str = r#"<script>
(() => {
  const scheme = location.protocol === "https:" ? "wss" : "ws";
  const connect = () => {
    const socket = new WebSocket(`${scheme}://${location.host}/__livereload`);
    socket.addEventListener("message", (event) => {
      if (event.data === "reload") location.reload();
    });
    socket.addEventListener("close", () => setTimeout(connect, 1000));
  };
  connect();
})();
</script>
"#;

/// Fan-out of change notifications to connected pages
#[derive(Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<()>,
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    /// Tell every connected page to reload. Returns how many were listening.
    pub fn notify(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Add the client script to a rendered page
    pub fn inject(&self, html: &str) -> String {
        match html.rfind("</body>") {
            Some(pos) => {
                let mut out = String::with_capacity(html.len() + CLIENT_SCRIPT.len());
                out.push_str(&html[..pos]);
                out.push_str(CLIENT_SCRIPT);
                out.push_str(&html[pos..]);
                out
            }
            None => format!("{}{}", html, CLIENT_SCRIPT),
        }
    }
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

/// Upgrade `/__livereload` requests
pub async fn socket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> Response {
    match &state.live_reload {
        Some(live) => {
            let changes = live.subscribe();
            ws.on_upgrade(move |socket| forward_changes(socket, changes))
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Send a reload message per change until either side goes away
async fn forward_changes(mut socket: WebSocket, mut changes: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");
    loop {
        tokio::select! {
            change = changes.recv() => match change {
                // a burst of changes still needs only one reload
                Ok(()) | Err(RecvError::Lagged(_)) => {
                    if socket.send(Message::Text(RELOAD_MESSAGE.to_string())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!("Live reload client disconnected");
}

/// Whether a changed path can affect a rendered page: Markdown documents and
/// HTML views outside hidden directories, editor backups excluded
pub fn is_watched(path: &Path) -> bool {
    let hidden = path.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    });
    let relevant = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("html")
    );
    relevant && !hidden
}

/// Block on filesystem events under `dirs`, calling `on_change` with the
/// relevant paths of each debounced batch. Returns when the watcher stops.
pub fn watch<F>(dirs: &[PathBuf], mut on_change: F) -> Result<()>
where
    F: FnMut(&[PathBuf]),
{
    let (tx, rx) = std::sync::mpsc::channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(Duration::from_millis(300), tx)?;

    for dir in dirs.iter().filter(|d| d.is_dir()) {
        debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;
        tracing::debug!("Watching {:?}", dir);
    }

    for batch in rx {
        match batch {
            Ok(events) => {
                let changed: Vec<PathBuf> = events
                    .into_iter()
                    .map(|e| e.path)
                    .filter(|p| {
                        let rel = dirs.iter().find_map(|d| p.strip_prefix(d).ok());
                        is_watched(rel.unwrap_or(p))
                    })
                    .collect();
                if !changed.is_empty() {
                    on_change(&changed);
                }
            }
            Err(e) => tracing::warn!("Watch error: {:?}", e),
        }
    }

    Ok(())
}
