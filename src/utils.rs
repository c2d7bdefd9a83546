use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tokio::signal;

use crate::templates;

/// Query string as ordered key/value pairs. Repeated keys are kept, so
/// `?a=1&a=2` is not a rejection; handlers read the first occurrence.
#[derive(serde::Deserialize, Debug, Default)]
#[serde(transparent)]
pub struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }
}

pub async fn handler_404() -> Response {
    match templates::page(StatusCode::NOT_FOUND, "not_found.html", &tera::Context::new()) {
        Ok(page) => page,
        Err(_) => (StatusCode::NOT_FOUND, "You've ventured beyond the horizon.").into_response(),
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl + C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Signal received, starting graceful shutdown");
}
