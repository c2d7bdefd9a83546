use anyhow::Context;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::SignedCookieJar;

use crate::errors::AppError;
use crate::session::Session;

pub async fn logout(jar: SignedCookieJar) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar);
    session.administrator = None;
    session.pending_login = None;
    let jar = session
        .store(jar)
        .context("Failed to clear the session.")?;
    Ok((jar, Redirect::to("/")).into_response())
}
