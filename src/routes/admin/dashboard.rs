use anyhow::Context;
use axum::extract::State;
use axum::response::Response;
use axum::Extension;
use hyper::StatusCode;

use crate::errors::AppError;
use crate::session::Administrator;
use crate::startup::AppState;
use crate::templates;

#[tracing::instrument(name = "Render the admin dashboard", skip(state, administrator))]
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(administrator): Extension<Administrator>,
) -> Result<Response, AppError> {
    let member_count = state
        .store
        .member_count()
        .await
        .context("Failed to count enrolled members.")?;

    let mut context = tera::Context::new();
    context.insert("admin_name", &administrator.name);
    context.insert("admin_email", &administrator.email);
    context.insert("member_count", &member_count);
    Ok(templates::page(
        StatusCode::OK,
        "admin/index.html",
        &context,
    )?)
}
