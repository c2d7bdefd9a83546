use anyhow::Context;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::SignedCookieJar;

use crate::errors::AppError;
use crate::session::Session;
use crate::startup::AppState;

#[derive(serde::Deserialize)]
pub struct CallbackParameters {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[tracing::instrument(
    name = "Complete administrator sign-in",
    skip(state, jar, parameters),
    fields(admin_email = tracing::field::Empty)
)]
pub async fn callback(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(parameters): Query<CallbackParameters>,
) -> Result<Response, AppError> {
    let provider = state.identity_provider()?;

    if let Some(error) = parameters.error {
        return Err(AppError::Unauthorized(format!(
            "The identity provider refused the sign-in: {}",
            error
        )));
    }

    let mut session = Session::from_jar(&jar);
    let pending_login = match (session.pending_login.take(), parameters.state) {
        (Some(pending), Some(received)) if pending.state == received => pending,
        _ => {
            return Err(AppError::BadRequest(
                "The sign-in response does not belong to this session.".into(),
            ))
        }
    };
    let code = parameters
        .code
        .ok_or_else(|| AppError::BadRequest("The sign-in response has no code.".into()))?;

    let administrator = provider
        .exchange_code(&code, &pending_login)
        .await
        .map_err(|e| {
            tracing::warn!(error.cause_chain = ?e, "Administrator sign-in failed");
            AppError::Unauthorized("The identity provider could not confirm who you are.".into())
        })?;
    tracing::Span::current().record(
        "admin_email",
        &tracing::field::display(&administrator.email),
    );
    tracing::info!("Administrator signed in");

    session.administrator = Some(administrator);
    let jar = session
        .store(jar)
        .context("Failed to store the session.")?;
    Ok((jar, Redirect::to("/admin")).into_response())
}
