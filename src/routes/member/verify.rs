use anyhow::Context;
use axum::extract::{Query, State};
use axum::response::Response;
use hyper::StatusCode;

use crate::errors::AppError;
use crate::member_store::VerifyOutcome;
use crate::startup::AppState;
use crate::templates;
use crate::utils::QueryPairs;

#[tracing::instrument(name = "Verify a member", skip(parameters, state))]
pub async fn verify(
    State(state): State<AppState>,
    Query(parameters): Query<QueryPairs>,
) -> Result<Response, AppError> {
    let token = parameters
        .first("token")
        .map(parse_verification_token)
        .ok_or_else(|| AppError::BadRequest("The verification link is missing its token.".into()))?;

    let outcome = if token.is_empty() {
        VerifyOutcome::UnknownToken
    } else {
        state
            .store
            .verify(&token)
            .await
            .context("Failed to verify the member.")?
    };

    let already_verified = match outcome {
        VerifyOutcome::UnknownToken => {
            return Err(AppError::Unauthorized(
                "This verification link is invalid.".into(),
            ))
        }
        VerifyOutcome::Verified => false,
        VerifyOutcome::AlreadyVerified => true,
    };

    let mut context = tera::Context::new();
    context.insert("already_verified", &already_verified);
    Ok(templates::page(
        StatusCode::OK,
        "member/verified.html",
        &context,
    )?)
}

fn parse_verification_token(token: &str) -> String {
    token.chars().filter(|ch| ch.is_ascii_alphanumeric()).collect()
}
