use anyhow::Context;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::SignedCookieJar;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::errors::AppError;
use crate::session::Session;
use crate::startup::AppState;

#[tracing::instrument(name = "Start administrator sign-in", skip(state, jar))]
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let provider = state.identity_provider()?;

    let (authorization_url, pending_login) =
        provider.authorization_request(&generate_login_state());
    let mut session = Session::from_jar(&jar);
    session.pending_login = Some(pending_login);
    let jar = session
        .store(jar)
        .context("Failed to store the session.")?;

    Ok((jar, Redirect::to(authorization_url.as_str())).into_response())
}

fn generate_login_state() -> String {
    let mut rng = thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(32)
        .collect()
}
