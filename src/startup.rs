use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::FromRef,
    middleware,
    routing::{get, IntoMakeService},
    Router,
};
use axum_extra::extract::cookie::Key;
use hyper::{http::Request, server::conn::AddrIncoming, Body};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tower_request_id::RequestIdLayer;
use url::Url;

use crate::configuration::{DatabaseSettings, Environment, Settings};
use crate::email_client::EmailClient;
use crate::errors::{with_error_pages, AppError};
use crate::identity_provider::OidcClient;
use crate::member_store::{MemberStore, PgMemberStore};
use crate::reminders::ReminderSweeper;
use crate::routes::{
    callback, dashboard, faq, index, login, logout, require_administrator,
    require_identity_provider, verify,
};
use crate::security_headers::security_headers;
use crate::session::session_key;
use crate::telemetry::request_span;
use crate::utils::{handler_404, shutdown_signal};
use crate::verification::EmailVerification;

pub type AppServer = axum::Server<AddrIncoming, IntoMakeService<Router>>;

/// Everything a request handler may need. Built once per application, so
/// several applications with different dependencies can live side by side.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MemberStore>,
    pub environment: Environment,
    pub session_key: Key,
    pub identity_provider: Option<Arc<OidcClient>>,
    pub enrollment_capacity: Option<u64>,
}

impl AppState {
    pub fn identity_provider(&self) -> Result<&OidcClient, AppError> {
        self.identity_provider.as_deref().ok_or_else(|| {
            AppError::ServiceUnavailable("Administrator sign-in is not configured.".into())
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.session_key.clone()
    }
}

pub struct Application {
    port: u16,
    server: AppServer,
    sweeper: ReminderSweeper,
}

impl Application {
    /// Wire every dependency from `configuration`. Configuration mistakes and
    /// an unreachable identity provider surface here, before the listener
    /// accepts a single connection.
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let application = &configuration.application;
        let challenge_url = application
            .challenge_response_url()
            .context("Failed to build the challenge-response URL.")?;
        let session_key = session_key(&application.session_key)?;

        let identity_provider = match &configuration.identity_provider {
            Some(settings) => {
                let client = OidcClient::discover(settings, &application.public_address)
                    .await
                    .context("OIDC failed.")?;
                Some(Arc::new(client))
            }
            None => {
                tracing::warn!("No identity provider configured, administrator sign-in is disabled.");
                None
            }
        };

        let store: Arc<dyn MemberStore> = Arc::new(PgMemberStore::new(get_connection_pool(
            &configuration.database,
        )));

        let sender_email = configuration
            .email_client
            .sender()
            .map_err(anyhow::Error::msg)
            .context("Invalid sender email address.")?;
        let base_url = Url::parse(&configuration.email_client.base_url)
            .context("Failed to parse the email API URL.")?;
        let email_client = Arc::new(
            EmailClient::new(
                base_url,
                sender_email,
                configuration.email_client.authorization_token.clone(),
                configuration.email_client.timeout(),
            )
            .context("Failed to build the email client.")?,
        );

        let scheme = Arc::new(EmailVerification::new(
            Arc::clone(&store),
            email_client,
            configuration.reminders.reminder_interval(),
            configuration.reminders.max_concurrency,
        ));
        let sweeper = ReminderSweeper::new(
            scheme,
            challenge_url,
            configuration.reminders.check_period(),
        );

        let state = AppState {
            store,
            environment: application.environment,
            session_key,
            identity_provider,
            enrollment_capacity: configuration.enrollment.capacity,
        };

        let address = format!("{}:{}", application.host, application.port);
        let listener = TcpListener::bind(&address)
            .with_context(|| format!("Failed to bind {}", address))?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            state,
            &application.member_mount_point,
            &application.static_dir,
        )?;

        Ok(Self {
            port,
            server,
            sweeper,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT/SIGTERM. The reminder sweeper runs alongside the
    /// server and is cancelled on the way out.
    pub async fn run_until_stopped(self) -> Result<(), anyhow::Error> {
        let sweeper = self.sweeper.start();
        let outcome = self.server.with_graceful_shutdown(shutdown_signal()).await;
        sweeper.stop().await;
        outcome.context("The HTTP server failed.")
    }
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(configuration.with_db())
}

pub fn run(
    listener: TcpListener,
    state: AppState,
    member_mount_point: &str,
    static_dir: &str,
) -> Result<AppServer, hyper::Error> {
    let router = app_router(state, member_mount_point, static_dir);
    Ok(axum::Server::from_tcp(listener)?.serve(router.into_make_service()))
}

pub fn app_router(state: AppState, member_mount_point: &str, static_dir: &str) -> Router {
    let admin_routes = Router::new()
        .route("/", get(dashboard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_administrator,
        ))
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_identity_provider,
        ));
    let member_routes = Router::new().route("/verify", get(verify));

    let router = Router::new()
        .route("/", get(index))
        .route("/faq", get(faq))
        .nest("/admin", admin_routes);
    let router = match mount_path(member_mount_point) {
        Some(path) => router.nest(&path, member_routes),
        None => router.merge(member_routes),
    };

    let router = router
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(handler_404);
    let mut router = with_error_pages(router, state.environment);
    for (name, value) in security_headers() {
        router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }

    router
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            request_span(request)
        }))
        .layer(RequestIdLayer)
        .with_state(state)
}

/// `/member/`, `member` and `//member` all mount at `/member`; a mount point
/// made only of slashes means the root.
fn mount_path(member_mount_point: &str) -> Option<String> {
    let segments: Vec<&str> = member_mount_point
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(format!("/{}", segments.join("/")))
    }
}
