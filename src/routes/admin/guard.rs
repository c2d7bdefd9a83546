use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::SignedCookieJar;

use crate::session::Session;
use crate::startup::AppState;

/// Every admin route answers 503 when no identity provider is configured.
pub async fn require_identity_provider(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next<Body>,
) -> Response {
    match state.identity_provider() {
        Ok(_) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Let signed-in administrators through and send everybody else to the
/// sign-in flow. The administrator is handed to the handler as a request
/// extension.
pub async fn require_administrator(
    jar: SignedCookieJar,
    mut request: Request<Body>,
    next: Next<Body>,
) -> Response {
    match Session::from_jar(&jar).administrator {
        Some(administrator) => {
            request.extensions_mut().insert(administrator);
            next.run(request).await
        }
        None => Redirect::to("/admin/login").into_response(),
    }
}
