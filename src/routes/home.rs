use anyhow::Context;
use axum::extract::{Query, State};
use axum::response::Response;
use axum_macros::debug_handler;
use hyper::StatusCode;

use crate::errors::AppError;
use crate::startup::AppState;
use crate::templates;
use crate::utils::QueryPairs;

#[tracing::instrument(name = "Render the index page", skip(state, parameters))]
#[debug_handler(state = AppState)]
pub async fn index(
    State(state): State<AppState>,
    Query(parameters): Query<QueryPairs>,
) -> Result<Response, AppError> {
    if let Some(page) = study_full_check(&state).await? {
        return Ok(page);
    }

    let mut context = tera::Context::new();
    // `?success=` counts as absent, the same as no parameter at all.
    let success = parameters.first("success").map_or(false, |s| !s.is_empty());
    context.insert("success", &success);
    context.insert("debugEmailUrl", &parameters.first("debug_email_url"));

    Ok(templates::page(StatusCode::OK, "index.html", &context)?)
}

pub async fn faq() -> Result<Response, AppError> {
    Ok(templates::page(
        StatusCode::OK,
        "faq.html",
        &tera::Context::new(),
    )?)
}

/// Renders the "study full" page instead of the requested one once
/// enrollment has reached its capacity.
async fn study_full_check(state: &AppState) -> Result<Option<Response>, AppError> {
    let capacity = match state.enrollment_capacity {
        Some(capacity) => capacity,
        None => return Ok(None),
    };
    let enrolled = state
        .store
        .member_count()
        .await
        .context("Failed to count enrolled members.")?;
    if enrolled < capacity {
        return Ok(None);
    }

    let mut context = tera::Context::new();
    context.insert("capacity", &capacity);
    Ok(Some(templates::page(
        StatusCode::OK,
        "study_full.html",
        &context,
    )?))
}
