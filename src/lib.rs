pub mod configuration;
pub mod domain;
pub mod email_client;
pub mod errors;
pub mod identity_provider;
pub mod member_store;
pub mod reminders;
pub mod routes;
pub mod security_headers;
pub mod session;
pub mod startup;
pub mod telemetry;
pub mod templates;
pub mod utils;
pub mod verification;
