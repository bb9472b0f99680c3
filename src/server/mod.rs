//! Local server for the generated site

use anyhow::Result;
use axum::{extract::State, response::Redirect, routing::get, Router};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::helpers::url_for;
use crate::Spacetraveling;

/// Server state
struct ServerState {
    /// Where exit-preview sends the visitor
    home: String,
}

/// Build the router: the preview exit route plus the public directory
pub fn router(public_dir: &Path, home: String) -> Router {
    let state = Arc::new(ServerState { home });

    let files = ServeDir::new(public_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(public_dir.join("404.html")));

    Router::new()
        .route("/api/exit-preview", get(exit_preview_handler))
        .fallback_service(files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Leave preview mode and go back to the home page
async fn exit_preview_handler(State(state): State<Arc<ServerState>>) -> Redirect {
    tracing::debug!("Exiting preview");
    Redirect::temporary(&state.home)
}

/// Start the server
pub async fn start(app: &Spacetraveling, ip: &str, port: u16, open: bool) -> Result<()> {
    let router = router(&app.public_dir, url_for(&app.config, ""));

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
