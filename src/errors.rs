use std::any::Any;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use hyper::StatusCode;
use tower_http::catch_panic::CatchPanicLayer;

use crate::configuration::Environment;
use crate::templates;

#[derive(thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// What went wrong while handling a request. Handlers never render error
/// pages themselves: they attach a report to the response and
/// `render_error_page` turns it into HTML on the way out.
#[derive(Clone, Debug)]
pub struct ErrorReport {
    pub message: String,
    pub chain: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Unexpected(e) => tracing::error!(error.cause_chain = ?e, "Server error"),
            _ => tracing::warn!(error.message = %self, "Request rejected"),
        }
        let report = ErrorReport {
            message: self.to_string(),
            chain: format!("{:?}", self),
        };

        let mut response = status.into_response();
        response.extensions_mut().insert(report);
        response
    }
}

impl From<tera::Error> for AppError {
    fn from(e: tera::Error) -> Self {
        Self::Unexpected(anyhow::Error::new(e).context("Failed to render template."))
    }
}

/// Tail middleware rendering `error.html` for every response that carries
/// an `ErrorReport`. The error chain is only shown in development.
pub async fn render_error_page(
    State(environment): State<Environment>,
    request: Request<Body>,
    next: Next<Body>,
) -> Response {
    let response = next.run(request).await;
    let report = match response.extensions().get::<ErrorReport>() {
        Some(report) => report.clone(),
        None => return response,
    };
    let status = response.status();

    let mut context = tera::Context::new();
    context.insert("message", &report.message);
    let stack = environment
        .is_development()
        .then_some(report.chain);
    context.insert("stack", &stack);

    match templates::page(status, "error.html", &context) {
        Ok(page) => page,
        Err(e) => {
            tracing::error!(error.cause_chain = ?e, "Failed to render the error page");
            (status, report.message).into_response()
        }
    }
}

/// Wrap `router` so that handler panics and `AppError`s leave as the
/// rendered error page.
pub fn with_error_pages<S>(router: Router<S>, environment: Environment) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(panic_report))
        .layer(middleware::from_fn_with_state(
            environment,
            render_error_page,
        ))
}

/// Turns a handler panic into a 500 carrying an `ErrorReport`.
pub fn panic_report(err: Box<dyn Any + Send + 'static>) -> hyper::Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic message".to_string()
    };
    tracing::error!(panic.message = %detail, "Handler panicked");

    let mut response = hyper::Response::new(Body::empty());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.extensions_mut().insert(ErrorReport {
        message: "Unexpected internal server error.".to_string(),
        chain: detail,
    });
    response
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
